/*!
 * report-gateway - hand generated reports over to Odoo
 *
 * - Upload gateway: read a report, base64-encode it and store it through
 *   `report.file.create_from_analytics(package_name, file_name, content_b64)`
 * - Odoo external API client (JSON-RPC) with explicit connection profiles
 * - Connection checks for every configured server
 * - Output directory helpers with atomic report writes for producers
 */

pub mod check;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod paths;
pub mod rpc;
pub mod testing;
pub mod upload;

// Re-export commonly used types
pub use config::{ConnectionProfile, GatewayConfig};
pub use error::{GatewayError, Result};
pub use paths::OutputDir;
pub use rpc::{JsonRpcTransport, OdooClient, RpcTransport};
pub use upload::{upload_report, ReportArtifact, UploadStatus};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Authenticate against the server described by `profile` over JSON-RPC
pub fn connect(profile: ConnectionProfile) -> Result<OdooClient<JsonRpcTransport>> {
    let transport = JsonRpcTransport::new(&profile.url, profile.timeout)?;
    OdooClient::connect(profile, transport)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
