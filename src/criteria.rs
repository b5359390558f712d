//! Query criteria: which row(s) an operation targets, bound from query parameters or a body.

use crate::error::AppError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Where criteria fields come from.
#[derive(Clone, Copy, Debug)]
pub enum FieldSource<'a> {
    /// The single `id` query parameter, if present.
    Query(Option<&'a str>),
    /// Raw JSON request body.
    Json(&'a [u8]),
}

pub trait Criteria {
    /// Target identifier. `None` means "all rows" on read.
    fn identifier(&self) -> Option<&str>;

    /// Populate from inbound fields. Fails with [`AppError::MalformedInput`] when the
    /// source cannot fill the criteria's shape.
    fn bind_fields(&mut self, source: FieldSource<'_>) -> Result<(), AppError>;
}

/// Criteria selecting by `id`. Blank identifiers count as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ById {
    id: Option<String>,
}

impl ById {
    pub fn new(id: impl Into<String>) -> Self {
        ById {
            id: normalize(id.into()),
        }
    }

    pub fn all() -> Self {
        ById::default()
    }
}

fn normalize(id: String) -> Option<String> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl Criteria for ById {
    fn identifier(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn bind_fields(&mut self, source: FieldSource<'_>) -> Result<(), AppError> {
        match source {
            FieldSource::Query(param) => {
                self.id = param.map(str::to_string).and_then(normalize);
            }
            FieldSource::Json(bytes) => {
                let value: Value = serde_json::from_slice(bytes)
                    .map_err(|e| AppError::MalformedInput(format!("invalid JSON: {}", e)))?;
                let Value::Object(fields) = value else {
                    return Err(AppError::MalformedInput("body must be a JSON object".into()));
                };
                self.id = match fields.get("id") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => normalize(s.clone()),
                    Some(_) => return Err(AppError::MalformedInput("id must be a string".into())),
                };
            }
        }
        Ok(())
    }
}

/// Decode a request body into a resource value.
pub fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AppError> {
    if bytes.is_empty() {
        return Err(AppError::MalformedInput("request body is empty".into()));
    }
    serde_json::from_slice(bytes).map_err(|e| AppError::MalformedInput(e.to_string()))
}
