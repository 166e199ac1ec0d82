//! Whole-document backup.
//!
//! Export is the document as pretty JSON. Import checks the shape first
//! (`supplements`, `slots` and `rules` arrays plus a `plans` object) and only
//! then deserializes, so a rejected file never produces a partial document.
//! A missing or non-array `appointments` imports as empty.

use crate::error::{Result, SupporgError};
use crate::model::{Document, DOCUMENT_VERSION};
use chrono::NaiveDate;
use serde_json::Value;

const SHAPE_ERROR: &str = "That file doesn't look like a valid backup for this app.";

pub fn export(doc: &Document) -> Result<String> {
    serde_json::to_string_pretty(doc).map_err(SupporgError::Serialization)
}

/// Suggested file name for an export made on `date`.
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("supplements-organizer-backup_{}.json", date)
}

pub fn import(raw: &str) -> Result<Document> {
    let mut value: Value = serde_json::from_str(raw).map_err(|_| {
        SupporgError::Import("Make sure you selected a valid JSON backup.".to_string())
    })?;

    let obj = value
        .as_object_mut()
        .ok_or_else(|| SupporgError::Import(SHAPE_ERROR.to_string()))?;
    let arrays_ok = ["supplements", "slots", "rules"]
        .iter()
        .all(|key| obj.get(*key).is_some_and(Value::is_array));
    let plans_ok = obj.get("plans").is_some_and(Value::is_object);
    if !arrays_ok || !plans_ok {
        return Err(SupporgError::Import(SHAPE_ERROR.to_string()));
    }
    if !obj.get("appointments").is_some_and(Value::is_array) {
        obj.insert("appointments".to_string(), Value::Array(Vec::new()));
    }

    let mut doc: Document =
        serde_json::from_value(value).map_err(|e| SupporgError::Import(e.to_string()))?;
    doc.version = DOCUMENT_VERSION;
    Ok(doc)
}
