use std::fmt;

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// Missing input column, invalid setting or unreadable input. Fatal.
    Configuration(String),
    /// A lookup produced no result at the requested quality.
    NotFound(String),
    /// The external service answered with an error status other than NOT_FOUND.
    ExternalApiError(String),
    /// Network or decode failure on a single call.
    RequestFailed(String),
    /// Filesystem failure while archiving or writing deliverables.
    Io(std::io::Error),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// True when the innermost error is a `NotFound`.
    pub fn is_not_found(&self) -> bool {
        match self {
            AppError::NotFound(_) => true,
            AppError::WithContext { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// True for failures that should abort the whole run rather than a single record.
    pub fn is_fatal(&self) -> bool {
        match self {
            AppError::Configuration(_) | AppError::Io(_) => true,
            AppError::WithContext { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ExternalApiError(msg) => write!(f, "External API error: {}", msg),
            AppError::RequestFailed(msg) => write!(f, "Request failed: {}", msg),
            AppError::Io(e) => write!(f, "I/O error: {}", e),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Io(e) => Some(e),
            AppError::WithContext { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::RequestFailed(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}

impl From<csv::Error> for AppError {
    /// CSV errors wrapping an I/O failure stay I/O errors; everything else is
    /// malformed input.
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            match err.into_kind() {
                csv::ErrorKind::Io(e) => AppError::Io(e),
                other => AppError::Configuration(format!("{:?}", other)),
            }
        } else {
            AppError::Configuration(format!("CSV error: {}", err))
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            AppError::Io(err.into())
        } else {
            AppError::RequestFailed(format!("Invalid JSON: {}", err))
        }
    }
}

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

/// Extension for std::io::Error to add context
impl<T> ResultExt<T> for Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::Io(e)),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::Io(e)),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_survives_context() {
        let err: Result<(), AppError> = Err(AppError::NotFound("no building".into()));
        let err = err.context("HIGH attempt").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "HIGH attempt: Not found: no building");
    }

    #[test]
    fn io_errors_are_fatal() {
        let err: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = err.context("writing deliverable").unwrap_err();
        assert!(err.is_fatal());
        assert!(!err.is_not_found());
    }

    #[test]
    fn request_failures_are_not_fatal() {
        assert!(!AppError::RequestFailed("timeout".into()).is_fatal());
        assert!(!AppError::ExternalApiError("PERMISSION_DENIED".into()).is_fatal());
    }
}
