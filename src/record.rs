//! Biodata record model and payload coercion
//!
//! Submissions arrive as untyped JSON objects. Before anything reaches the
//! store they are coerced into the typed [`BiodataFields`] shape: text fields
//! accept strings (numbers and booleans are stringified), `phone` accepts a
//! number or a numeric string. Unknown keys are dropped, which also keeps
//! clients from writing `_id` or the timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Raw JSON object as received from a client or produced by a processor
pub type Payload = Map<String, Value>;

/// Text-valued record fields, by their JSON name
pub const TEXT_FIELDS: [&str; 9] = [
    "name",
    "dob",
    "eid",
    "pid",
    "github",
    "linkedin",
    "leetcode",
    "leetcodeProblems",
    "languagesKnown",
];

/// The single numeric record field
pub const PHONE_FIELD: &str = "phone";

/// Opaque, store-assigned record identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A field value could not be coerced to its declared type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid value for field `{field}`: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// User-editable part of a biodata record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiodataFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leetcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leetcode_problems: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages_known: Option<String>,
}

impl BiodataFields {
    /// Build typed fields from an untyped payload
    pub fn from_payload(payload: &Payload) -> Result<Self, ValidationError> {
        let coerced = coerce_payload(payload)?;
        serde_json::from_value(Value::Object(coerced))
            .map_err(|e| ValidationError::new("payload", e.to_string()))
    }

    /// Merge a partial update into these fields.
    ///
    /// Keys absent from `patch` are left untouched, `null` clears a field.
    pub fn merge(&self, patch: &Payload) -> Result<Self, ValidationError> {
        let coerced = coerce_payload(patch)?;
        let mut current = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };

        for (key, value) in coerced {
            if value.is_null() {
                current.remove(&key);
            } else {
                current.insert(key, value);
            }
        }

        serde_json::from_value(Value::Object(current))
            .map_err(|e| ValidationError::new("payload", e.to_string()))
    }
}

/// A stored biodata record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiodataRecord {
    #[serde(rename = "_id")]
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: BiodataFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BiodataRecord {
    /// Create a record with a fresh identifier
    pub fn new(fields: BiodataFields) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::generate(),
            fields,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update, bumping `updated_at`
    pub fn apply_patch(&mut self, patch: &Payload) -> Result<(), ValidationError> {
        self.fields = self.fields.merge(patch)?;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Coerce every known field of a payload, dropping unknown keys
pub fn coerce_payload(payload: &Payload) -> Result<Payload, ValidationError> {
    let mut out = Map::new();

    for (key, value) in payload {
        let coerced = if key == PHONE_FIELD {
            coerce_phone(value)?
        } else if TEXT_FIELDS.contains(&key.as_str()) {
            coerce_text(key, value)?
        } else {
            continue;
        };
        out.insert(key.clone(), coerced);
    }

    Ok(out)
}

fn coerce_text(field: &str, value: &Value) -> Result<Value, ValidationError> {
    match value {
        Value::Null | Value::String(_) => Ok(value.clone()),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        Value::Array(_) | Value::Object(_) => {
            Err(ValidationError::new(field, "expected a string"))
        }
    }
}

fn coerce_phone(value: &Value) -> Result<Value, ValidationError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(Value::from(i));
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                    Ok(Value::from(f as i64))
                }
                _ => Err(ValidationError::new(
                    PHONE_FIELD,
                    format!("{} is not a whole number", n),
                )),
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(Value::Null);
            }
            trimmed.parse::<i64>().map(Value::from).map_err(|_| {
                ValidationError::new(PHONE_FIELD, format!("\"{}\" is not a number", s))
            })
        }
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
            Err(ValidationError::new(PHONE_FIELD, "expected a number"))
        }
    }
}
