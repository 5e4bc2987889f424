//! JSON-RPC 2.0 envelopes and the client used to talk to a single upstream
//! endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use url::Url;

#[cfg(test)]
mod tests;

/// Errors arising from a single call, either while validating the inbound
/// request or while querying one upstream endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RpcError {
    /// The upstream endpoint could not be reached.
    #[error("{0}")]
    Transport(String),
    /// The upstream endpoint answered with a JSON-RPC error object.
    #[error("JSON-RPC error (code {code}): {message}")]
    JsonRpc { code: i64, message: String },
    /// The upstream endpoint answered with something that does not decode
    /// into the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// A worker panicked while querying an upstream endpoint.
    #[error("panic: {0}")]
    Panic(String),
    /// The earliest block is completely different on different endpoints,
    /// so it is impossible to support it reliably.
    #[error("earliest tag is not supported")]
    UnsupportedBlockTag,
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("the method {0} does not exist/is not available")]
    MethodNotFound(String),
    /// No response class reached the required number of occurrences.
    #[error("not enough occurrences of the same response from RPC servers")]
    NotEnoughMatchingResponses,
    /// Two or more response classes tied at the maximum number of
    /// occurrences, so no single answer can be chosen.
    #[error("RPC servers returned different responses")]
    InconsistentResponses,
    /// Fewer numeric responses than required to compute a median.
    #[error("not enough responses from RPC servers")]
    NotEnoughResponses,
}

impl From<JsonRpcError> for RpcError {
    fn from(error: JsonRpcError) -> Self {
        RpcError::JsonRpc {
            code: error.code,
            message: error.message,
        }
    }
}

/// Narrow interface to a remote JSON-RPC endpoint: send one method call and
/// return the raw `result` value. The fan-out engine owns decoding the
/// result into the method's shape.
#[async_trait]
pub trait JsonRpcCaller: Send + Sync {
    async fn call(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value, RpcError>;
}

/// Body of a JSON-RPC request, see the
/// [specification](https://www.jsonrpc.org/specification).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonRpcRequestBody<T> {
    jsonrpc: String,
    method: String,
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    params: Option<T>,
}

impl<T> JsonRpcRequestBody<T> {
    pub fn new(method: impl Into<String>, params: T) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            id: Some(serde_json::Value::Number(0.into())),
            params: Some(params),
        }
    }

    pub fn set_id(&mut self, id: u64) {
        self.id = Some(serde_json::Value::Number(id.into()));
    }

    pub fn version(&self) -> &str {
        &self.jsonrpc
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn id(&self) -> Option<&serde_json::Value> {
        self.id.as_ref()
    }

    pub fn params(&self) -> Option<&T> {
        self.params.as_ref()
    }
}

pub type JsonRpcResult<T> = Result<T, JsonRpcError>;

/// Body of a JSON-RPC response.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponseBody<T> {
    jsonrpc: String,
    id: serde_json::Value,
    #[serde(flatten)]
    result: JsonRpcResultEnvelope<T>,
}

impl<T> JsonRpcResponseBody<T> {
    pub fn from_ok(id: serde_json::Value, result: T) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: JsonRpcResultEnvelope::Ok(result),
        }
    }

    pub fn from_error(id: serde_json::Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: JsonRpcResultEnvelope::Err(error),
        }
    }

    pub fn id(&self) -> &serde_json::Value {
        &self.id
    }

    pub fn into_result(self) -> JsonRpcResult<T> {
        match self.result {
            JsonRpcResultEnvelope::Ok(result) => Ok(result),
            JsonRpcResultEnvelope::Err(error) => Err(error),
        }
    }
}

/// An envelope for all JSON-RPC responses.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
enum JsonRpcResultEnvelope<T> {
    #[serde(rename = "result")]
    Ok(T),
    #[serde(rename = "error")]
    Err(JsonRpcError),
}

/// A JSON-RPC error object.
#[derive(Clone, Debug, Eq, PartialEq, Error, Serialize, Deserialize)]
#[error("JSON-RPC error (code: {code}): {message}")]
pub struct JsonRpcError {
    /// Indicates the error type that occurred.
    pub code: i64,
    /// Short description of the error.
    pub message: String,
    /// Additional information about the error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

/// A [`JsonRpcCaller`] speaking JSON-RPC 2.0 over HTTP(S).
///
/// The underlying [`reqwest::Client`] is shared between all endpoints so
/// that concurrent calls reuse one connection pool without serializing
/// unrelated requests behind each other.
#[derive(Clone, Debug)]
pub struct HttpJsonRpcClient {
    http: reqwest::Client,
    url: Url,
}

impl HttpJsonRpcClient {
    pub fn new(http: reqwest::Client, url: Url) -> Self {
        Self { http, url }
    }
}

#[async_trait]
impl JsonRpcCaller for HttpJsonRpcClient {
    async fn call(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value, RpcError> {
        let mut body = JsonRpcRequestBody::new(method, params);
        body.set_id(next_request_id());

        let response = self
            .http
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        // JSON-RPC responses over HTTP have a 2xx status code even if the
        // contained result is an error. An unavailable server will sometimes
        // answer with HTML that fails to parse as JSON.
        if !status.is_success() {
            return Err(RpcError::InvalidResponse(format!(
                "HTTP status {}: {}",
                status.as_u16(),
                String::from_utf8_lossy(&bytes)
            )));
        }
        let reply: JsonRpcResponseBody<serde_json::Value> = serde_json::from_slice(&bytes)
            .map_err(|e| {
                RpcError::InvalidResponse(format!(
                    "status {}, body: {}, parsing error: {e}",
                    status.as_u16(),
                    String::from_utf8_lossy(&bytes)
                ))
            })?;
        reply.into_result().map_err(RpcError::from)
    }
}
