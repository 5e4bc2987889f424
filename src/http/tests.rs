use crate::http::router;
use crate::rpc_client::{JsonRpcCaller, RpcError};
use crate::splitter::{RpcSplitter, Upstream};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

/// Answers every method with the same canned value.
struct StaticCaller(serde_json::Value);

#[async_trait]
impl JsonRpcCaller for StaticCaller {
    async fn call(
        &self,
        _method: &str,
        _params: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value, RpcError> {
        Ok(self.0.clone())
    }
}

fn app(values: &[serde_json::Value]) -> axum::Router {
    let upstreams = values
        .iter()
        .enumerate()
        .map(|(n, value)| {
            Upstream::new(
                format!("rpc-{n}"),
                Arc::new(StaticCaller(value.clone())) as Arc<dyn JsonRpcCaller>,
            )
        })
        .collect();
    router(Arc::new(RpcSplitter::with_upstreams(upstreams)))
}

async fn send(app: axum::Router, body: &str) -> serde_json::Value {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn should_answer_with_aggregated_result() {
    let reply = send(
        app(&[json!("0x1"), json!("0x1")]),
        r#"{"jsonrpc":"2.0","id":1,"method":"eth_chainId","params":[]}"#,
    )
    .await;

    assert_eq!(reply, json!({"jsonrpc": "2.0", "id": 1, "result": "0x1"}));
}

#[tokio::test]
async fn should_echo_request_id() {
    let reply = send(
        app(&[json!("0x1")]),
        r#"{"jsonrpc":"2.0","id":"request-7","method":"eth_chainId"}"#,
    )
    .await;

    assert_eq!(reply["id"], json!("request-7"));
}

#[tokio::test]
async fn should_answer_parse_error_for_malformed_json() {
    let reply = send(app(&[json!("0x1")]), r#"{"jsonrpc":"2.0","#).await;

    assert_eq!(reply["id"], json!(null));
    assert_eq!(reply["error"]["code"], json!(-32700));
}

#[tokio::test]
async fn should_reject_batch_requests() {
    let reply = send(
        app(&[json!("0x1")]),
        r#"[{"jsonrpc":"2.0","id":1,"method":"eth_chainId"}]"#,
    )
    .await;

    assert_eq!(reply["error"]["code"], json!(-32600));
}

#[tokio::test]
async fn should_reject_non_array_params() {
    let reply = send(
        app(&[json!("0x1")]),
        r#"{"jsonrpc":"2.0","id":1,"method":"eth_chainId","params":{"a":1}}"#,
    )
    .await;

    assert_eq!(reply["error"]["code"], json!(-32600));
}

#[tokio::test]
async fn should_answer_method_not_found_for_unknown_method() {
    let reply = send(
        app(&[json!("0x1")]),
        r#"{"jsonrpc":"2.0","id":1,"method":"eth_newFilter","params":[]}"#,
    )
    .await;

    assert_eq!(
        reply["error"],
        json!({
            "code": -32601,
            "message": "the method eth_newFilter does not exist/is not available"
        })
    );
}

#[tokio::test]
async fn should_answer_invalid_params_for_undecodable_argument() {
    let reply = send(
        app(&[json!("0x1")]),
        r#"{"jsonrpc":"2.0","id":1,"method":"eth_getBalance","params":["nope","latest"]}"#,
    )
    .await;

    assert_eq!(reply["error"]["code"], json!(-32602));
}

#[tokio::test]
async fn should_answer_server_error_with_accumulated_rendering() {
    // an even split between two chain ids cannot reach the quorum of 3
    let reply = send(
        app(&[json!("0x1"), json!("0x1"), json!("0x3"), json!("0x3")]),
        r#"{"jsonrpc":"2.0","id":1,"method":"eth_chainId","params":[]}"#,
    )
    .await;

    assert_eq!(
        reply["error"],
        json!({
            "code": -32000,
            "message": "not enough occurrences of the same response from RPC servers"
        })
    );
}
