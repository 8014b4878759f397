use std::sync::PoisonError;
use axum::extract::rejection::JsonRejection;
use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {

    #[error("Row {row} of group {group} has {actual} values but {expected} components are declared")]
    RowLength { group: usize, row: usize, expected: usize, actual: usize },

    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    #[error("Invalid argument for {component}: {reason}")]
    InvalidArgument { component: String, reason: String },

    #[error("{component} could not be parsed as {expected}: {value}")]
    TimeParse { component: String, expected: String, value: String },

    #[error("Invalid id: {0}")]
    IdParse(String),

    #[error("Malformed dataArray: {0}")]
    Malformed(String),

    #[error("serde error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Json rejection: {0}")]
    JsonRejection(#[from] JsonRejection),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::RowLength { .. }
            | AppError::UnknownComponent(_)
            | AppError::InvalidArgument { .. }
            | AppError::TimeParse { .. }
            | AppError::IdParse(_)
            | AppError::Malformed(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_)      => StatusCode::NOT_FOUND,
            AppError::JsonRejection(r) => r.status(),
            _                          => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn invalid_argument(component: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::InvalidArgument { component: component.into(), reason: reason.into() }
    }
}

impl<T> From<PoisonError<T>> for AppError
{
    fn from(e: PoisonError<T>) -> Self {
        AppError::Internal(format!("Poison error: {:?}", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_are_client_errors() {
        let errors = vec![
            AppError::RowLength { group: 0, row: 1, expected: 3, actual: 2 },
            AppError::UnknownComponent("bogus".to_string()),
            AppError::invalid_argument("parameters", "has to be an object"),
            AppError::IdParse("abc".to_string()),
            AppError::Malformed("missing components".to_string()),
        ];
        for err in errors {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST, "{}", err);
        }
        assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Internal("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(AppError::from(serde_err).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn row_length_message_names_position() {
        let err = AppError::RowLength { group: 2, row: 5, expected: 3, actual: 4 };
        assert_eq!(err.to_string(), "Row 5 of group 2 has 4 values but 3 components are declared");
    }
}
