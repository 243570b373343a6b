//! JSON-RPC 2.0 framing and response validation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{Result, RpcError};
use crate::metrics;

/// Protocol version carried by every request and required on every response.
pub const JSONRPC_VERSION: &str = "2.0";

/// A single JSON-RPC request.
///
/// Field order matches the wire format: `id, method, params, jsonrpc`.
/// Absent params are sent as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcRequest {
    pub id: u64,
    pub method: String,
    pub params: Option<Map<String, Value>>,
    pub jsonrpc: &'static str,
}

impl RpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Map<String, Value>>) -> Self {
        Self {
            id,
            method: method.into(),
            params,
            jsonrpc: JSONRPC_VERSION,
        }
    }

    pub fn to_vec(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| RpcError::Protocol(format!("failed to encode request: {}", e)))
    }
}

/// Raw response shape. Every field is optional so that missing fields are
/// reported as protocol violations rather than decode errors.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    jsonrpc: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// Classify a completed HTTP exchange.
///
/// Returns the `result` field (`Value::Null` when absent) on success,
/// `RpcError::Application` for error objects with a negative code, and
/// `RpcError::Protocol` when the body is not a JSON-RPC 2.0 response.
///
/// An error object with a non-negative code is not raised: it is logged and
/// the call yields `Value::Null`.
pub fn validate_response(status: u16, body: &[u8]) -> Result<Value> {
    let response: RpcResponse = match serde_json::from_slice(body) {
        Ok(response) => response,
        Err(_) if !(200..300).contains(&status) => {
            return Err(RpcError::HttpStatus {
                status,
                body: String::from_utf8_lossy(body).trim().to_string(),
            });
        }
        Err(e) => {
            return Err(RpcError::Protocol(format!(
                "invalid JSON-RPC response: {}",
                e
            )));
        }
    };

    match response.jsonrpc.as_ref() {
        Some(Value::String(version)) if version == JSONRPC_VERSION => {}
        Some(other) => {
            return Err(RpcError::Protocol(format!(
                "unsupported jsonrpc version {}",
                other
            )));
        }
        None => {
            return Err(RpcError::Protocol(
                "response is missing the jsonrpc version".to_string(),
            ));
        }
    }

    if let Some(error) = response.error {
        let code = error
            .get("code")
            .and_then(Value::as_i64)
            .ok_or_else(|| RpcError::Protocol(format!("malformed error object: {}", error)))?;
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if code < 0 {
            return Err(RpcError::Application { code, message });
        }

        warn!(
            code = code,
            message = %message,
            "Invalid error code, should be negative; treating response as empty"
        );
        metrics::record_anomalous_error(code);
        return Ok(Value::Null);
    }

    Ok(response.result.unwrap_or(Value::Null))
}
