use std::path::PathBuf;

use thiserror::Error;

/// Main library error type covering every stage of building and submitting a document
#[derive(Error, Debug)]
pub enum CxmlError {
    #[error("Invalid {entity}: \"{field}\" {reason}")]
    Validation {
        entity: &'static str,
        field: String,
        reason: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Rendered document is not well-formed XML: {details}")]
    MalformedDocument { details: String },

    #[error("Document does not match DTD {dtd}: {}", .errors.join("; "))]
    SchemaInvalid { dtd: String, errors: Vec<String> },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status error: {status} for {url} - {message}")]
    HttpStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Request timeout: {url} after {timeout_seconds} seconds")]
    Timeout { url: String, timeout_seconds: u64 },

    #[error("Render error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LibXML2 internal error: {details}")]
    LibXml2Internal { details: String },
}

impl CxmlError {
    pub(crate) fn validation(
        entity: &'static str,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CxmlError::Validation {
            entity,
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Field named by a validation failure, if this is one
    pub fn field(&self) -> Option<&str> {
        match self {
            CxmlError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CxmlError::Validation { .. })
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, CxmlError::Precondition(_))
    }

    /// Network failure, non-2xx reply or timeout
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CxmlError::Http(_) | CxmlError::HttpStatus { .. } | CxmlError::Timeout { .. }
        )
    }
}

/// Configuration-specific error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

/// LibXML2-specific error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibXml2Error {
    #[error("DTD parsing failed: {path}")]
    DtdParseFailed { path: PathBuf },

    #[error("DTD not found: {path}")]
    DtdNotFound { path: PathBuf },

    #[error("Validation context creation failed")]
    ValidationContextCreationFailed,

    #[error("Document too large for libxml2: {size} bytes")]
    DocumentTooLarge { size: usize },

    #[error("Invalid path for libxml2: {path}")]
    InvalidPath { path: PathBuf },
}

impl From<ConfigError> for CxmlError {
    fn from(err: ConfigError) -> Self {
        CxmlError::Config(err.to_string())
    }
}

impl From<LibXml2Error> for CxmlError {
    fn from(err: LibXml2Error) -> Self {
        CxmlError::LibXml2Internal {
            details: err.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CxmlError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// LibXML2 result type alias
pub type LibXml2Result<T> = std::result::Result<T, LibXml2Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let error = CxmlError::validation("order item", "quantity", "is required and must be numeric");
        assert_eq!(
            error.to_string(),
            "Invalid order item: \"quantity\" is required and must be numeric"
        );
        assert_eq!(error.field(), Some("quantity"));
        assert!(error.is_validation());
        assert!(!error.is_transport());
    }

    #[test]
    fn test_schema_invalid_joins_errors() {
        let error = CxmlError::SchemaInvalid {
            dtd: "InvoiceDetail.dtd".to_string(),
            errors: vec!["first".to_string(), "second".to_string()],
        };
        let display = error.to_string();
        assert!(display.contains("InvoiceDetail.dtd"));
        assert!(display.contains("first; second"));
    }

    #[test]
    fn test_transport_grouping() {
        let timeout = CxmlError::Timeout {
            url: "https://supplier.example.com/cxml".to_string(),
            timeout_seconds: 5,
        };
        assert!(timeout.is_transport());

        let status = CxmlError::HttpStatus {
            url: "https://supplier.example.com/cxml".to_string(),
            status: 500,
            message: "HTTP 500: Internal Server Error".to_string(),
        };
        assert!(status.is_transport());
        assert!(status.to_string().contains("500"));

        assert!(!CxmlError::Precondition("no items".to_string()).is_transport());
    }

    #[test]
    fn test_config_error_conversion() {
        let config_error = ConfigError::Validation("Timeout must be greater than 0".to_string());
        let error: CxmlError = config_error.into();

        match error {
            CxmlError::Config(message) => assert!(message.contains("Timeout")),
            other => panic!("Expected CxmlError::Config, got {:?}", other),
        }
    }

    #[test]
    fn test_libxml2_error_conversion() {
        let libxml2_error = LibXml2Error::DtdParseFailed {
            path: PathBuf::from("/dtds/cXML.dtd"),
        };
        let error: CxmlError = libxml2_error.into();

        match error {
            CxmlError::LibXml2Internal { details } => assert!(details.contains("cXML.dtd")),
            other => panic!("Expected LibXml2Internal, got {:?}", other),
        }
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;

        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error = CxmlError::Io(io_error);

        let source = error.source().unwrap();
        assert_eq!(source.to_string(), "File not found");
    }
}
