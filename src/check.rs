//! Connection check for configured Odoo servers.
//!
//! Mirrors what an operator does by hand before scheduling uploads: ask the
//! server for its version, log in, and make one harmless authenticated call.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::ConnectionProfile;
use crate::error::GatewayError;
use crate::rpc::{server_version, OdooClient, RpcTransport};

/// Model and operation used for the authenticated probe
pub const PROBE_MODEL: &str = "res.partner";
pub const PROBE_OPERATION: &str = "read";

/// Result of checking one server
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionReport {
    pub server: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub database: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_read_partners: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionReport {
    fn new(profile: &ConnectionProfile) -> Self {
        Self {
            server: profile.name.clone(),
            url: profile.url.clone(),
            database: profile.database.clone(),
            username: profile.username.clone(),
            server_version: None,
            uid: None,
            can_read_partners: None,
            error: None,
        }
    }

    /// A server whose profile or transport could not even be built
    pub fn unresolved(server: &str, err: &GatewayError) -> Self {
        warn!(server, category = %err.category(), "skipping connection test: {}", err);
        Self {
            server: server.to_string(),
            url: String::new(),
            database: String::new(),
            username: String::new(),
            server_version: None,
            uid: None,
            can_read_partners: None,
            error: Some(err.to_string()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// `version()` returns a dict; `server_version` is the human-readable part
fn describe_version(version: &Value) -> String {
    version
        .get("server_version")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| version.to_string())
}

/// Run version, authenticate and access-rights probes against one server.
/// Never returns an error; failures are recorded in the report.
pub fn check_connection<T: RpcTransport>(profile: ConnectionProfile, transport: T) -> ConnectionReport {
    let mut report = ConnectionReport::new(&profile);
    info!(server = %profile.name, url = %profile.url, db = %profile.database, user = %profile.username, "testing connection");

    match run_probes(profile, transport, &mut report) {
        Ok(()) => info!(server = %report.server, "connection test succeeded"),
        Err(e) => {
            warn!(server = %report.server, category = %e.category(), "connection test failed: {}", e);
            report.error = Some(e.to_string());
        }
    }
    report
}

fn run_probes<T: RpcTransport>(
    profile: ConnectionProfile,
    transport: T,
    report: &mut ConnectionReport,
) -> Result<(), GatewayError> {
    let version = server_version(&transport)?;
    let described = describe_version(&version);
    info!(server = %profile.name, version = %described, "reached common endpoint");
    report.server_version = Some(described);

    let client = OdooClient::connect(profile, transport)?;
    report.uid = Some(client.uid());

    let can_read = client.check_access_rights(PROBE_MODEL, PROBE_OPERATION)?;
    if !can_read {
        // Not fatal: the report user may legitimately lack partner access
        warn!(server = %report.server, "user lacks read access to {}", PROBE_MODEL);
    }
    report.can_read_partners = Some(can_read);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingTransport;
    use serde_json::json;

    fn profile() -> ConnectionProfile {
        ConnectionProfile::new("source", "http://erp.test", "prod", "bot", "pw")
    }

    #[test]
    fn test_successful_check() {
        let transport = RecordingTransport::authenticated(5);
        transport.respond("common", "version", json!({"server_version": "17.0", "protocol_version": 1}));
        transport.respond("object", "execute_kw", json!(true));

        let report = check_connection(profile(), &transport);
        assert!(report.succeeded());
        assert_eq!(report.server_version.as_deref(), Some("17.0"));
        assert_eq!(report.uid, Some(5));
        assert_eq!(report.can_read_partners, Some(true));

        let probe = transport.last_call().unwrap();
        assert_eq!(probe.target(), Some((PROBE_MODEL, "check_access_rights")));
    }

    #[test]
    fn test_missing_read_access_is_not_a_failure() {
        let transport = RecordingTransport::authenticated(5);
        transport.respond("common", "version", json!({"server_version": "16.0"}));
        transport.respond("object", "execute_kw", json!(false));

        let report = check_connection(profile(), &transport);
        assert!(report.succeeded());
        assert_eq!(report.can_read_partners, Some(false));
    }

    #[test]
    fn test_bad_credentials() {
        let transport = RecordingTransport::new();
        transport.respond("common", "version", json!({"server_version": "17.0"}));
        transport.respond("common", "authenticate", json!(false));

        let report = check_connection(profile(), &transport);
        assert!(!report.succeeded());
        assert!(report.uid.is_none());
        assert!(report.error.unwrap().contains("Authentication failed"));
        // never reached the object service
        assert!(transport.execute_kw_calls().is_empty());
    }

    #[test]
    fn test_unreachable_server() {
        let transport = RecordingTransport::new();
        transport.fail("common", "version", || {
            GatewayError::Transport("connection refused".to_string())
        });

        let report = check_connection(profile(), &transport);
        assert!(report.server_version.is_none());
        assert_eq!(report.error.as_deref(), Some("Transport error: connection refused"));
        assert_eq!(transport.call_count(), 1);
    }

    #[test]
    fn test_report_serialization_skips_empty_fields() {
        let report = ConnectionReport::new(&profile());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            json!({"server": "source", "url": "http://erp.test", "database": "prod", "username": "bot"})
        );
    }

    #[test]
    fn test_unresolved_profile_is_a_failed_report() {
        let err = GatewayError::Config("server 'aaa' has no password".to_string());
        let report = ConnectionReport::unresolved("aaa", &err);
        assert!(!report.succeeded());

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            json!({"server": "aaa", "error": "Configuration error: server 'aaa' has no password"})
        );
    }
}
