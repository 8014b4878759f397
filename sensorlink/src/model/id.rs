use crate::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Entity identifier. Which variant a deployment produces is decided by its `IdManager`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Long(i64),
    Text(String),
}

impl Id {
    pub fn to_json(&self) -> Value {
        match self {
            Id::Long(n) => Value::from(*n),
            Id::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Long(n) => write!(f, "{}", n),
            Id::Text(s) => f.write_str(s),
        }
    }
}

/// Turns the textual form of an identifier into an `Id`.
pub trait IdManager: Send + Sync {
    fn parse_id(&self, input: &str) -> Result<Id, AppError>;

    /// Text handed to `parse_id` for a raw JSON value: numbers as decimal text, strings verbatim.
    fn parse_json_id(&self, value: &Value) -> Result<Id, AppError> {
        match value {
            Value::Number(n) => self.parse_id(&n.to_string()),
            Value::String(s) => self.parse_id(s),
            other => Err(AppError::IdParse(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LongIdManager;

impl IdManager for LongIdManager {
    fn parse_id(&self, input: &str) -> Result<Id, AppError> {
        input.trim().parse::<i64>().map(Id::Long).map_err(|_| AppError::IdParse(input.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringIdManager;

impl IdManager for StringIdManager {
    fn parse_id(&self, input: &str) -> Result<Id, AppError> {
        if input.is_empty() {
            return Err(AppError::IdParse(input.to_string()));
        }
        Ok(Id::Text(input.to_string()))
    }
}
