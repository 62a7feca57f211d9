//! CQL row to `Record` conversion

use rookery_common::Record;
use scylla::value::CqlValue;
use serde_json::{Number, Value};

/// Table columns whose canonical record field is not the plain camelCase form
const COLUMN_ALIASES: &[(&str, &str)] = &[
    ("culmen_length_mm", "culmenLength"),
    ("culmen_depth_mm", "culmenDepth"),
    ("flipper_length_mm", "flipperLength"),
    ("body_mass_g", "bodyMass"),
    ("delta_15_n", "delta15N"),
    ("delta_13_c", "delta13C"),
];

/// Canonical record field name for a table column
pub fn canonical_field(column: &str) -> String {
    COLUMN_ALIASES
        .iter()
        .find(|(name, _)| *name == column)
        .map(|(_, field)| field.to_string())
        .unwrap_or_else(|| snake_to_camel(column))
}

fn snake_to_camel(column: &str) -> String {
    let mut out = String::with_capacity(column.len());
    let mut upper = false;
    for ch in column.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

fn float(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

/// JSON scalar for a CQL cell
pub fn cql_to_json(value: CqlValue) -> Value {
    match value {
        CqlValue::Ascii(s) | CqlValue::Text(s) => Value::String(s),
        CqlValue::Boolean(b) => Value::Bool(b),
        CqlValue::TinyInt(v) => Value::from(v),
        CqlValue::SmallInt(v) => Value::from(v),
        CqlValue::Int(v) => Value::from(v),
        CqlValue::BigInt(v) => Value::from(v),
        CqlValue::Counter(c) => Value::from(c.0),
        CqlValue::Float(v) => float(f64::from(v)),
        CqlValue::Double(v) => float(v),
        CqlValue::Empty => Value::Null,
        CqlValue::List(items) | CqlValue::Set(items) => {
            Value::Array(items.into_iter().map(cql_to_json).collect())
        }
        other => Value::String(format!("{:?}", other)),
    }
}

/// Build a record from a row's cells, paired positionally with `fields`
pub fn row_to_record(fields: &[String], columns: Vec<Option<CqlValue>>) -> Record {
    fields
        .iter()
        .cloned()
        .zip(columns)
        .map(|(field, cell)| (field, cell.map(cql_to_json).unwrap_or(Value::Null)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_field_aliases() {
        assert_eq!(canonical_field("culmen_length_mm"), "culmenLength");
        assert_eq!(canonical_field("body_mass_g"), "bodyMass");
        assert_eq!(canonical_field("delta_15_n"), "delta15N");
    }

    #[test]
    fn test_canonical_field_camel_case() {
        assert_eq!(canonical_field("sample_number"), "sampleNumber");
        assert_eq!(canonical_field("study_name"), "studyName");
        assert_eq!(canonical_field("clutch_completion"), "clutchCompletion");
        assert_eq!(canonical_field("species"), "species");
    }

    #[test]
    fn test_row_to_record() {
        let fields = vec![
            "species".to_string(),
            "sampleNumber".to_string(),
            "culmenLength".to_string(),
            "sex".to_string(),
        ];
        let row = vec![
            Some(CqlValue::Text("Gentoo".to_string())),
            Some(CqlValue::Int(12)),
            Some(CqlValue::Double(46.1)),
            None,
        ];

        let record = row_to_record(&fields, row);
        assert_eq!(record.get("species"), Some(&json!("Gentoo")));
        assert_eq!(record.get("sampleNumber"), Some(&json!(12)));
        assert_eq!(record.get("culmenLength"), Some(&json!(46.1)));
        assert_eq!(record.get("sex"), Some(&Value::Null));
    }

    #[test]
    fn test_non_finite_double_becomes_null() {
        assert_eq!(cql_to_json(CqlValue::Double(f64::NAN)), Value::Null);
    }

    #[test]
    fn test_collections() {
        let value = cql_to_json(CqlValue::List(vec![CqlValue::Int(1), CqlValue::Int(2)]));
        assert_eq!(value, json!([1, 2]));
    }
}
