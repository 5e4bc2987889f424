//! Inbound JSON-RPC 2.0 surface: hosts the splitter behind a plain HTTP
//! endpoint.

use crate::multi::RpcErrors;
use crate::rpc_client::{JsonRpcError, JsonRpcRequestBody, JsonRpcResponseBody, RpcError};
use crate::splitter::RpcSplitter;
use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;

#[cfg(test)]
mod tests;

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const SERVER_ERROR: i64 = -32000;

pub fn router(splitter: Arc<RpcSplitter>) -> Router {
    Router::new()
        .route("/", post(handle_request))
        .with_state(splitter)
}

type Response = Json<JsonRpcResponseBody<Value>>;

async fn handle_request(State(splitter): State<Arc<RpcSplitter>>, body: Bytes) -> Response {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => return error_response(Value::Null, PARSE_ERROR, format!("parse error: {e}")),
    };
    if raw.is_array() {
        return error_response(
            Value::Null,
            INVALID_REQUEST,
            "invalid request: batch requests are not supported",
        );
    }
    let request: JsonRpcRequestBody<Value> = match serde_json::from_value(raw) {
        Ok(request) => request,
        Err(e) => {
            return error_response(Value::Null, INVALID_REQUEST, format!("invalid request: {e}"))
        }
    };
    let id = request.id().cloned().unwrap_or(Value::Null);
    if request.version() != "2.0" {
        return error_response(
            id,
            INVALID_REQUEST,
            "invalid request: unsupported JSON-RPC version",
        );
    }
    let params = match request.params() {
        None => Vec::new(),
        Some(Value::Array(params)) => params.clone(),
        Some(_) => {
            return error_response(id, INVALID_REQUEST, "invalid request: params must be an array")
        }
    };

    match splitter.dispatch(request.method(), params).await {
        Ok(result) => Json(JsonRpcResponseBody::from_ok(id, result)),
        Err(errors) => Json(JsonRpcResponseBody::from_error(
            id,
            JsonRpcError::new(error_code(&errors), errors.to_string()),
        )),
    }
}

/// Request-side defects map to their standard JSON-RPC codes; everything
/// else surfaces as a generic server error carrying the accumulated error
/// rendering.
fn error_code(errors: &RpcErrors) -> i64 {
    match errors.as_slice() {
        [RpcError::MethodNotFound(_)] => METHOD_NOT_FOUND,
        [RpcError::InvalidParams(_)] => INVALID_PARAMS,
        _ => SERVER_ERROR,
    }
}

fn error_response(id: Value, code: i64, message: impl Into<String>) -> Response {
    Json(JsonRpcResponseBody::from_error(
        id,
        JsonRpcError::new(code, message),
    ))
}
