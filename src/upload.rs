/*!
 * Report upload gateway
 *
 * Reads a finished report from disk, base64-encodes it and stores it in Odoo
 * through `report.file.create_from_analytics(package_name, file_name,
 * file_content_b64)`. The three values always travel as separate positional
 * arguments; the server-side method does not accept a single dict.
 */

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{GatewayError, Result};
use crate::rpc::{OdooClient, RpcTransport};

pub const REPORT_MODEL: &str = "report.file";
pub const CREATE_METHOD: &str = "create_from_analytics";

/// A report file plus the metadata identifying it, held for one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub package_name: String,
    pub file_name: String,
    pub content: Vec<u8>,
}

impl ReportArtifact {
    /// Read `path` into an artifact. Only reads; the file is left untouched.
    /// The package name is kept exactly as given.
    pub fn from_path(package_name: &str, path: &Path) -> Result<Self> {
        validate_package_name(package_name)?;
        let package_name = package_name.to_string();

        let metadata = fs::metadata(path).map_err(|e| GatewayError::io(path, e))?;
        if !metadata.is_file() {
            return Err(GatewayError::NotAFile(path.to_path_buf()));
        }

        let file_name = report_file_name(path)?;

        let content = fs::read(path).map_err(|e| GatewayError::io(path, e))?;
        if content.is_empty() {
            return Err(GatewayError::EmptyFile(path.to_path_buf()));
        }
        debug!(package = %package_name, file = %file_name, bytes = content.len(), "read report");

        Ok(Self {
            package_name,
            file_name,
            content,
        })
    }

    /// Standard base64 (with padding) of the file content
    pub fn encoded_content(&self) -> String {
        STANDARD.encode(&self.content)
    }

    /// The exact positional arguments for `create_from_analytics`
    pub fn positional_args(&self) -> [Value; 3] {
        [
            Value::String(self.package_name.clone()),
            Value::String(self.file_name.clone()),
            Value::String(self.encoded_content()),
        ]
    }
}

/// Blank or whitespace-only names are rejected
pub fn validate_package_name(package_name: &str) -> Result<()> {
    if package_name.trim().is_empty() {
        return Err(GatewayError::InvalidPackageName);
    }
    Ok(())
}

/// Final path component, which must be valid UTF-8 to travel as a string
pub fn report_file_name(path: &Path) -> Result<String> {
    let name = path
        .file_name()
        .ok_or_else(|| GatewayError::NotAFile(path.to_path_buf()))?;
    name.to_str()
        .map(str::to_string)
        .ok_or_else(|| GatewayError::InvalidFileName(path.to_path_buf()))
}

/// Upload the file at `file_path` on behalf of `package_name`.
///
/// The file is read and validated before the server is contacted, so a
/// missing file never results in a remote call. The server's return value is
/// handed back unchanged; see [`UploadStatus::from_response`] to interpret it.
pub fn upload_report<T: RpcTransport>(
    client: &OdooClient<T>,
    package_name: &str,
    file_path: &Path,
) -> Result<Value> {
    let artifact = ReportArtifact::from_path(package_name, file_path)?;
    upload_artifact(client, &artifact)
}

/// Upload an artifact that is already in memory
pub fn upload_artifact<T: RpcTransport>(
    client: &OdooClient<T>,
    artifact: &ReportArtifact,
) -> Result<Value> {
    info!(
        package = %artifact.package_name,
        file = %artifact.file_name,
        bytes = artifact.content.len(),
        "calling '{}' on {}", CREATE_METHOD, REPORT_MODEL
    );

    let args = Vec::from(artifact.positional_args());
    let response = client.execute_kw(REPORT_MODEL, CREATE_METHOD, args, None)?;

    debug!(response = %response, "upload response");
    Ok(response)
}

/// Verdict read from a `create_from_analytics` response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    /// `status == "success"`
    Success { message: Option<String> },
    /// Any other status
    Rejected { status: String, message: Option<String> },
    /// The response is not an object with a `status` field
    Unrecognized,
}

impl UploadStatus {
    pub fn from_response(response: &Value) -> Self {
        let Some(object) = response.as_object() else {
            return UploadStatus::Unrecognized;
        };
        let message = object
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);

        match object.get("status").and_then(Value::as_str) {
            Some("success") => UploadStatus::Success { message },
            Some(status) => UploadStatus::Rejected {
                status: status.to_string(),
                message,
            },
            None => UploadStatus::Unrecognized,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UploadStatus::Success { .. })
    }

    /// Turn a non-success verdict into an error for `file_name`
    pub fn into_result(self, file_name: &str, response: &Value) -> Result<Option<String>> {
        match self {
            UploadStatus::Success { message } => Ok(message),
            UploadStatus::Rejected { status, message } => {
                warn!(file = %file_name, %status, "server rejected report");
                Err(GatewayError::Rejected {
                    file_name: file_name.to_string(),
                    message: message.unwrap_or(status),
                })
            }
            UploadStatus::Unrecognized => Err(GatewayError::InvalidResponse(format!(
                "unexpected response to {}: {}",
                CREATE_METHOD, response
            ))),
        }
    }
}

/// Outcome of a full upload, as reported by the CLI
#[derive(Debug, Clone)]
pub struct UploadSummary {
    pub package_name: String,
    pub file_name: String,
    pub source: PathBuf,
    pub bytes: u64,
    pub message: Option<String>,
    pub response: Value,
}

/// Upload and insist on `status == "success"`
pub fn upload_and_confirm<T: RpcTransport>(
    client: &OdooClient<T>,
    package_name: &str,
    file_path: &Path,
) -> Result<UploadSummary> {
    let artifact = ReportArtifact::from_path(package_name, file_path)?;
    confirm_artifact(client, artifact, file_path)
}

/// [`upload_and_confirm`] for an artifact read earlier from `source`
pub fn confirm_artifact<T: RpcTransport>(
    client: &OdooClient<T>,
    artifact: ReportArtifact,
    source: &Path,
) -> Result<UploadSummary> {
    let response = upload_artifact(client, &artifact)?;
    let message = UploadStatus::from_response(&response).into_result(&artifact.file_name, &response)?;

    info!(file = %artifact.file_name, "report uploaded to Odoo");
    Ok(UploadSummary {
        package_name: artifact.package_name,
        file_name: artifact.file_name,
        source: source.to_path_buf(),
        bytes: artifact.content.len() as u64,
        message,
        response,
    })
}
