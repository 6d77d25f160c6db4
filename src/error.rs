/*!
 * Error types for the report gateway
 */

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Report file does not exist
    #[error("Report file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Path exists but is a directory or other non-file entry
    #[error("Not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    /// Report file has no content
    #[error("Report file is empty: {}", .0.display())]
    EmptyFile(PathBuf),

    /// File name cannot be sent as text
    #[error("File name is not valid UTF-8: {}", .0.display())]
    InvalidFileName(PathBuf),

    /// Reading a local file failed
    #[error("Cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Package name was empty or whitespace
    #[error("Package name must not be empty")]
    InvalidPackageName,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The server refused the credentials
    #[error("Authentication failed for user '{username}' on database '{database}'")]
    Authentication { database: String, username: String },

    /// Network or HTTP level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server raised while executing the call
    #[error("Remote fault {code}: {message}")]
    RemoteFault { code: i64, message: String },

    /// The server answered with something we could not interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The upload call completed but the server reported a failure status
    #[error("Server rejected {file_name}: {message}")]
    Rejected { file_name: String, message: String },
}

impl GatewayError {
    /// Wrap an I/O error with the path it happened on, mapping NotFound
    /// onto the dedicated variant.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            GatewayError::FileNotFound(path)
        } else {
            GatewayError::Io { path, source }
        }
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // Nothing was sent, or the server never let us in
            GatewayError::FileNotFound(_)
            | GatewayError::NotAFile(_)
            | GatewayError::EmptyFile(_)
            | GatewayError::InvalidFileName(_)
            | GatewayError::Io { .. }
            | GatewayError::InvalidPackageName
            | GatewayError::Config(_)
            | GatewayError::Authentication { .. } => EXIT_FATAL,
            GatewayError::Transport(_)
            | GatewayError::RemoteFault { .. }
            | GatewayError::InvalidResponse(_)
            | GatewayError::Rejected { .. } => EXIT_FAILED,
        }
    }

    /// Check if this error is transient (rerunning the job may succeed)
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Transport(_))
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            GatewayError::FileNotFound(_)
            | GatewayError::NotAFile(_)
            | GatewayError::EmptyFile(_)
            | GatewayError::InvalidFileName(_)
            | GatewayError::InvalidPackageName => ErrorCategory::Validation,
            GatewayError::Io { .. } => ErrorCategory::IoError,
            GatewayError::Config(_) => ErrorCategory::Configuration,
            GatewayError::Authentication { .. } => ErrorCategory::Security,
            GatewayError::Transport(_) => ErrorCategory::Network,
            GatewayError::RemoteFault { .. } | GatewayError::Rejected { .. } => {
                ErrorCategory::Remote
            }
            GatewayError::InvalidResponse(_) => ErrorCategory::Protocol,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Input validation errors (paths, package names)
    Validation,
    /// Local I/O errors
    IoError,
    /// Configuration errors
    Configuration,
    /// Authentication errors
    Security,
    /// Network and HTTP errors
    Network,
    /// Errors raised or reported by the ERP server
    Remote,
    /// Malformed responses
    Protocol,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::IoError => write!(f, "io"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Security => write!(f, "security"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Remote => write!(f, "remote"),
            ErrorCategory::Protocol => write!(f, "protocol"),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::InvalidResponse(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::InvalidResponse(format!("JSON parse error: {}", err))
    }
}
