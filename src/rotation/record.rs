//! Secret record: the JSON object stored in each secret version.

use crate::constants::{DB_INSTANCE_IDENTIFIER_FIELD, PASSWORD_FIELD};
use crate::error::RotationError;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Why a record could not be used. Converted into a [`RotationError`] once
/// the secret id is known.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("{0}")]
    Malformed(String),
    #[error("missing field '{0}'")]
    MissingField(&'static str),
}

impl RecordError {
    #[must_use]
    pub fn for_secret(self, secret_id: &str) -> RotationError {
        match self {
            Self::Malformed(reason) => RotationError::MalformedSecret {
                secret_id: secret_id.to_string(),
                reason,
            },
            Self::MissingField(field) => RotationError::MissingField {
                secret_id: secret_id.to_string(),
                field,
            },
        }
    }
}

/// Key-value credential record.
///
/// Fields other than `password` are carried through rotation untouched.
#[derive(Clone, PartialEq)]
pub struct SecretRecord {
    fields: Map<String, Value>,
}

impl SecretRecord {
    pub fn parse(secret_string: &str) -> Result<Self, RecordError> {
        let value: Value = serde_json::from_str(secret_string)
            .map_err(|e| RecordError::Malformed(format!("secret string is not valid JSON: {e}")))?;

        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(RecordError::Malformed(format!(
                "expected a JSON object, found {}",
                json_type_name(&other)
            ))),
        }
    }

    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn instance_identifier(&self) -> Result<&str, RecordError> {
        self.required_str(DB_INSTANCE_IDENTIFIER_FIELD)
    }

    pub fn password(&self) -> Result<&str, RecordError> {
        self.required_str(PASSWORD_FIELD)
    }

    /// Copy of this record with `password` replaced
    #[must_use]
    pub fn with_password(&self, password: &str) -> Self {
        let mut fields = self.fields.clone();
        fields.insert(PASSWORD_FIELD.to_string(), Value::from(password));
        Self { fields }
    }

    #[must_use]
    pub fn to_secret_string(&self) -> String {
        Value::Object(self.fields.clone()).to_string()
    }

    fn required_str(&self, field: &'static str) -> Result<&str, RecordError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Err(RecordError::MissingField(field)),
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(RecordError::Malformed(format!(
                "field '{field}' must be a string, found {}",
                json_type_name(other)
            ))),
        }
    }
}

impl fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.fields {
            if key == PASSWORD_FIELD {
                map.entry(key, &"<redacted>");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
