//! BSON document to `Record` conversion

use bson::{Bson, Document as BsonDocument};
use rookery_common::Record;

/// Server-assigned metadata that never belongs in a record
const METADATA_FIELDS: &[&str] = &["_id"];

/// Convert a fetched document into a record.
///
/// Values go through relaxed extended JSON, so numbers and strings come out as
/// plain JSON scalars and compare equal to the other backends' values.
pub fn document_to_record(document: BsonDocument) -> Record {
    document
        .into_iter()
        .filter(|(field, _)| !METADATA_FIELDS.contains(&field.as_str()))
        .map(|(field, value)| (field, value.into_relaxed_extjson()))
        .collect()
}

/// Read a numeric field as `u64`, whichever BSON number type the server chose
pub fn numeric_field(document: &BsonDocument, field: &str) -> u64 {
    match document.get(field) {
        Some(Bson::Int32(v)) => (*v).max(0) as u64,
        Some(Bson::Int64(v)) => (*v).max(0) as u64,
        Some(Bson::Double(v)) if v.is_finite() && *v > 0.0 => *v as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};
    use serde_json::json;

    #[test]
    fn test_document_to_record_drops_id() {
        let document = doc! {
            "_id": ObjectId::new(),
            "species": "Adelie",
            "sampleNumber": 1_i32,
            "culmenLength": 39.1,
            "sex": Bson::Null,
        };

        let record = document_to_record(document);
        assert!(record.get("_id").is_none());
        assert_eq!(record.get("species"), Some(&json!("Adelie")));
        assert_eq!(record.get("sampleNumber"), Some(&json!(1)));
        assert_eq!(record.get("culmenLength"), Some(&json!(39.1)));
        assert_eq!(record.get("sex"), Some(&json!(null)));
    }

    #[test]
    fn test_int64_and_int32_compare_equal() {
        let a = document_to_record(doc! { "bodyMass": 3750_i32 });
        let b = document_to_record(doc! { "bodyMass": 3750_i64 });
        assert_eq!(a, b);
    }

    #[test]
    fn test_numeric_field() {
        let stats = doc! { "count": 344_i32, "size": 98_765_i64, "avgObjSize": 287.5, "ns": "x" };
        assert_eq!(numeric_field(&stats, "count"), 344);
        assert_eq!(numeric_field(&stats, "size"), 98_765);
        assert_eq!(numeric_field(&stats, "avgObjSize"), 287);
        assert_eq!(numeric_field(&stats, "ns"), 0);
        assert_eq!(numeric_field(&stats, "missing"), 0);
    }
}
