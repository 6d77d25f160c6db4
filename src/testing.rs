//! Test doubles for the RPC layer
//!
//! [`RecordingTransport`] answers calls from a table of canned responses and
//! records every call it receives, so tests can assert on the exact
//! positional arguments that would have gone over the wire.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::{GatewayError, Result};
use crate::rpc::RpcTransport;

/// One call as seen by the transport
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub service: String,
    pub method: String,
    pub args: Vec<Value>,
}

impl RecordedCall {
    /// For `object.execute_kw`: the `(model, method)` pair being invoked
    pub fn target(&self) -> Option<(&str, &str)> {
        match (self.args.get(3), self.args.get(4)) {
            (Some(Value::String(model)), Some(Value::String(method))) => {
                Some((model.as_str(), method.as_str()))
            }
            _ => None,
        }
    }

    /// For `object.execute_kw`: the positional argument list
    pub fn positional(&self) -> Option<&Vec<Value>> {
        self.args.get(5).and_then(Value::as_array)
    }
}

type Responder = Box<dyn Fn() -> Result<Value> + Send>;

/// In-memory transport that records calls and replays canned responses
#[derive(Clone, Default)]
pub struct RecordingTransport {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    responses: Arc<Mutex<HashMap<(String, String), Responder>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose `authenticate` already succeeds with `uid`
    pub fn authenticated(uid: i64) -> Self {
        let transport = Self::new();
        transport.respond("common", "authenticate", Value::from(uid));
        transport
    }

    /// Answer `service.method` with `value`
    pub fn respond(&self, service: &str, method: &str, value: Value) {
        self.respond_with(service, method, move || Ok(value.clone()));
    }

    /// Fail `service.method` with the error built by `make_error`
    pub fn fail<F>(&self, service: &str, method: &str, make_error: F)
    where
        F: Fn() -> GatewayError + Send + 'static,
    {
        self.respond_with(service, method, move || Err(make_error()));
    }

    fn respond_with<F>(&self, service: &str, method: &str, responder: F)
    where
        F: Fn() -> Result<Value> + Send + 'static,
    {
        self.responses
            .lock()
            .unwrap()
            .insert((service.to_string(), method.to_string()), Box::new(responder));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        self.calls.lock().unwrap().last().cloned()
    }

    /// Calls made through `object.execute_kw`
    pub fn execute_kw_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.service == "object" && c.method == "execute_kw")
            .collect()
    }
}

impl RpcTransport for RecordingTransport {
    fn call(&self, service: &str, method: &str, args: Vec<Value>) -> Result<Value> {
        self.calls.lock().unwrap().push(RecordedCall {
            service: service.to_string(),
            method: method.to_string(),
            args,
        });

        let responses = self.responses.lock().unwrap();
        match responses.get(&(service.to_string(), method.to_string())) {
            Some(responder) => responder(),
            None => Err(GatewayError::RemoteFault {
                code: -32601,
                message: format!("no canned response for {}.{}", service, method),
            }),
        }
    }
}

impl std::fmt::Debug for RecordingTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingTransport")
            .field("calls", &self.call_count())
            .finish()
    }
}
