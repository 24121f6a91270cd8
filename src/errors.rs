use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
///
/// Upload-boundary failures abort the request; per-row failures never reach
/// this type and are handled inside the pipeline.
#[derive(Debug)]
pub enum AppError {
    /// The multipart form could not be parsed or lacks the `file` field.
    FormParse(String),
    /// I/O failure on the input or output file.
    FileAccess(String),
    /// The uploaded content is not a decodable delimited file.
    CsvDecode(String),
    /// A record could not be written to the output file.
    OutputWrite(String),
    /// Internal server error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::FormParse(msg) => write!(f, "Form parse error: {}", msg),
            AppError::FileAccess(msg) => write!(f, "File access error: {}", msg),
            AppError::CsvDecode(msg) => write!(f, "CSV decode error: {}", msg),
            AppError::OutputWrite(msg) => write!(f, "Output write error: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Maps each error variant to an HTTP status code and JSON body.
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::FormParse(msg) => {
                tracing::warn!("Rejected upload form: {}", msg);
                (
                    StatusCode::BAD_REQUEST,
                    format!("Error parsing form: {}", msg),
                )
            }
            AppError::CsvDecode(msg) => {
                tracing::warn!("Rejected CSV upload: {}", msg);
                (
                    StatusCode::BAD_REQUEST,
                    format!("Error reading CSV file: {}", msg),
                )
            }
            AppError::FileAccess(msg) => {
                tracing::error!("File access error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Error accessing file: {}", msg),
                )
            }
            AppError::OutputWrite(msg) => {
                tracing::error!("Output write error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Error writing output file: {}", msg),
                )
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::WithContext { source, context } => {
                tracing::error!("Error with context: {} -> {}", context, source);
                return (*source).into_response();
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Failure of a single registry lookup. Never fatal to a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Network failure or timeout; no response was received.
    Transport(String),
    /// A response arrived with a non-success status code.
    Status(u16),
    /// The response body did not match the expected company shape.
    Decode(String),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::Transport(msg) => write!(f, "HTTP request failed: {}", msg),
            LookupError::Status(code) => write!(f, "status code not OK: {}", code),
            LookupError::Decode(msg) => write!(f, "failed to decode response: {}", msg),
        }
    }
}

impl std::error::Error for LookupError {}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// I/O errors surface as `FileAccess` with the given context.
impl<T> ResultExt<T> for Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::FileAccess(e.to_string())),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::FileAccess(e.to_string())),
            context: f(),
        })
    }
}
