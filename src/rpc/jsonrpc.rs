//! JSON-RPC transport for Odoo's `/jsonrpc` endpoint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use super::RpcTransport;
use crate::error::{GatewayError, Result};

const USER_AGENT_VALUE: &str = concat!("report-gateway/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct Request<'a> {
    jsonrpc: &'static str,
    method: &'static str,
    params: Params<'a>,
    id: u64,
}

#[derive(Debug, Serialize)]
struct Params<'a> {
    service: &'a str,
    method: &'a str,
    args: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<RpcErrorData>,
}

/// Odoo puts the Python exception text in `data.message`
#[derive(Debug, Deserialize)]
struct RpcErrorData {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl From<RpcError> for GatewayError {
    fn from(err: RpcError) -> Self {
        let detail = err.data.and_then(|d| match (d.message, d.name) {
            (Some(message), Some(name)) => Some(format!("{} ({})", message, name)),
            (Some(message), None) => Some(message),
            _ => None,
        });
        let message = match detail {
            Some(detail) if !err.message.is_empty() => format!("{}: {}", err.message, detail),
            Some(detail) => detail,
            None => err.message,
        };
        GatewayError::RemoteFault {
            code: err.code,
            message,
        }
    }
}

/// Blocking HTTP client speaking JSON-RPC 2.0 to `<base_url>/jsonrpc`
#[derive(Debug)]
pub struct JsonRpcTransport {
    client: Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl JsonRpcTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/jsonrpc", base_url.trim_end_matches('/')),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl RpcTransport for JsonRpcTransport {
    fn call(&self, service: &str, method: &str, args: Vec<Value>) -> Result<Value> {
        let request = Request {
            jsonrpc: "2.0",
            method: "call",
            params: Params {
                service,
                method,
                args,
            },
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        debug!(endpoint = %self.endpoint, service, method, id = request.id, "json-rpc call");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()?
            .error_for_status()?;

        let body = response.text()?;
        trace!(bytes = body.len(), "json-rpc response");
        let mut parsed: Value = serde_json::from_str(&body)?;
        let envelope = parsed.as_object_mut().ok_or_else(|| {
            GatewayError::InvalidResponse("response is not a JSON object".to_string())
        })?;

        if let Some(error) = envelope.remove("error").filter(|e| !e.is_null()) {
            let error: RpcError = serde_json::from_value(error)?;
            return Err(error.into());
        }
        // `null` is a legitimate result for methods returning None
        envelope.remove("result").ok_or_else(|| {
            GatewayError::InvalidResponse("response has neither result nor error".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let transport = JsonRpcTransport::new("https://erp.example.com/", Duration::from_secs(5)).unwrap();
        assert_eq!(transport.endpoint(), "https://erp.example.com/jsonrpc");
    }

    #[test]
    fn test_request_shape() {
        let request = Request {
            jsonrpc: "2.0",
            method: "call",
            params: Params {
                service: "object",
                method: "execute_kw",
                args: vec![Value::from("prod"), Value::from(2)],
            },
            id: 9,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "jsonrpc": "2.0",
                "method": "call",
                "params": {"service": "object", "method": "execute_kw", "args": ["prod", 2]},
                "id": 9
            })
        );
    }

    #[test]
    fn test_rpc_error_prefers_data_message() {
        let err: RpcError = serde_json::from_value(serde_json::json!({
            "code": 200,
            "message": "Odoo Server Error",
            "data": {"name": "odoo.exceptions.AccessError", "message": "You are not allowed"}
        }))
        .unwrap();

        match GatewayError::from(err) {
            GatewayError::RemoteFault { code, message } => {
                assert_eq!(code, 200);
                assert_eq!(
                    message,
                    "Odoo Server Error: You are not allowed (odoo.exceptions.AccessError)"
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rpc_error_without_data() {
        let err: RpcError =
            serde_json::from_value(serde_json::json!({"code": -32601, "message": "Method not found"}))
                .unwrap();
        assert_eq!(
            GatewayError::from(err).to_string(),
            "Remote fault -32601: Method not found"
        );
    }
}
