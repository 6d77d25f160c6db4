//! Odoo external API client
//!
//! Odoo exposes two services to outside callers:
//! - `common`: `version` and `authenticate`, no session required
//! - `object`: `execute_kw(db, uid, password, model, method, args[, kwargs])`
//!
//! [`RpcTransport`] moves one service call over the wire; [`OdooClient`]
//! layers authentication and the `execute_kw` calling convention on top.

mod jsonrpc;

pub use jsonrpc::JsonRpcTransport;

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::config::ConnectionProfile;
use crate::error::{GatewayError, Result};

pub const SERVICE_COMMON: &str = "common";
pub const SERVICE_OBJECT: &str = "object";

/// A blocking, single-shot call to one Odoo service method
pub trait RpcTransport {
    fn call(&self, service: &str, method: &str, args: Vec<Value>) -> Result<Value>;
}

impl<T: RpcTransport + ?Sized> RpcTransport for &T {
    fn call(&self, service: &str, method: &str, args: Vec<Value>) -> Result<Value> {
        (**self).call(service, method, args)
    }
}

/// Query `common.version` without authenticating
pub fn server_version<T: RpcTransport>(transport: &T) -> Result<Value> {
    transport.call(SERVICE_COMMON, "version", Vec::new())
}

/// An authenticated session against one Odoo database
#[derive(Debug)]
pub struct OdooClient<T> {
    transport: T,
    profile: ConnectionProfile,
    uid: i64,
}

impl<T: RpcTransport> OdooClient<T> {
    /// Authenticate and return a client bound to the resulting user id
    pub fn connect(profile: ConnectionProfile, transport: T) -> Result<Self> {
        debug!(server = %profile.name, url = %profile.url, db = %profile.database, "authenticating");

        let result = transport.call(
            SERVICE_COMMON,
            "authenticate",
            vec![
                json!(profile.database),
                json!(profile.username),
                json!(profile.password()),
                json!({}),
            ],
        )?;

        // Odoo answers `false` for bad credentials
        let uid = match result.as_i64() {
            Some(uid) if uid > 0 => uid,
            _ => {
                return Err(GatewayError::Authentication {
                    database: profile.database.clone(),
                    username: profile.username.clone(),
                })
            }
        };

        info!(server = %profile.name, uid, "connected to Odoo at {}", profile.url);
        Ok(Self {
            transport,
            profile,
            uid,
        })
    }

    pub fn uid(&self) -> i64 {
        self.uid
    }

    pub fn profile(&self) -> &ConnectionProfile {
        &self.profile
    }

    pub fn version(&self) -> Result<Value> {
        server_version(&self.transport)
    }

    /// Call `model.method(*args, **kwargs)`. `args` are positional and sent
    /// exactly as given; `kwargs` is only appended when present.
    pub fn execute_kw(
        &self,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Option<Map<String, Value>>,
    ) -> Result<Value> {
        let mut params = vec![
            json!(self.profile.database),
            json!(self.uid),
            json!(self.profile.password()),
            json!(model),
            json!(method),
            Value::Array(args),
        ];
        if let Some(kwargs) = kwargs {
            params.push(Value::Object(kwargs));
        }

        debug!(model, method, "execute_kw");
        self.transport.call(SERVICE_OBJECT, "execute_kw", params)
    }

    /// Whether the user may perform `operation` (read, write, create, unlink) on `model`
    pub fn check_access_rights(&self, model: &str, operation: &str) -> Result<bool> {
        let mut kwargs = Map::new();
        kwargs.insert("raise_exception".to_string(), Value::Bool(false));

        let result = self.execute_kw(
            model,
            "check_access_rights",
            vec![json!(operation)],
            Some(kwargs),
        )?;

        result.as_bool().ok_or_else(|| {
            GatewayError::InvalidResponse(format!(
                "check_access_rights returned {} instead of a boolean",
                result
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingTransport;

    fn profile() -> ConnectionProfile {
        ConnectionProfile::new("default", "http://erp.test", "prod", "bot", "pw")
    }

    #[test]
    fn test_connect_sends_credentials() {
        let transport = RecordingTransport::new();
        transport.respond("common", "authenticate", json!(7));

        let client = OdooClient::connect(profile(), &transport).unwrap();
        assert_eq!(client.uid(), 7);

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].service, "common");
        assert_eq!(calls[0].args, vec![json!("prod"), json!("bot"), json!("pw"), json!({})]);
    }

    #[test]
    fn test_connect_rejects_false_uid() {
        let transport = RecordingTransport::new();
        transport.respond("common", "authenticate", json!(false));

        let err = OdooClient::connect(profile(), &transport).unwrap_err();
        assert!(matches!(err, GatewayError::Authentication { .. }));
    }

    #[test]
    fn test_execute_kw_envelope() {
        let transport = RecordingTransport::authenticated(3);
        transport.respond("object", "execute_kw", json!([1, 2]));

        let client = OdooClient::connect(profile(), &transport).unwrap();
        let result = client
            .execute_kw("res.partner", "search", vec![json!([])], None)
            .unwrap();
        assert_eq!(result, json!([1, 2]));

        let call = transport.last_call().unwrap();
        assert_eq!(call.method, "execute_kw");
        assert_eq!(
            call.args,
            vec![
                json!("prod"),
                json!(3),
                json!("pw"),
                json!("res.partner"),
                json!("search"),
                json!([[]]),
            ]
        );
    }

    #[test]
    fn test_check_access_rights_passes_kwargs() {
        let transport = RecordingTransport::authenticated(3);
        transport.respond("object", "execute_kw", json!(true));

        let client = OdooClient::connect(profile(), &transport).unwrap();
        assert!(client.check_access_rights("res.partner", "read").unwrap());

        let call = transport.last_call().unwrap();
        assert_eq!(call.args.len(), 7);
        assert_eq!(call.args[5], json!(["read"]));
        assert_eq!(call.args[6], json!({"raise_exception": false}));
    }

    #[test]
    fn test_check_access_rights_non_bool() {
        let transport = RecordingTransport::authenticated(3);
        transport.respond("object", "execute_kw", json!("yes"));

        let client = OdooClient::connect(profile(), &transport).unwrap();
        let err = client.check_access_rights("res.partner", "read").unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse(_)));
    }
}
