mod request_body {
    use crate::rpc_client::JsonRpcRequestBody;
    use serde_json::json;

    #[test]
    fn should_serialize_request_with_sequential_id() {
        let mut body = JsonRpcRequestBody::new("eth_getBalance", vec![json!("0x1"), json!("0x2")]);
        body.set_id(7);

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "method": "eth_getBalance",
                "id": 7,
                "params": ["0x1", "0x2"]
            })
        );
    }

    #[test]
    fn should_deserialize_request_without_params() {
        let body: JsonRpcRequestBody<serde_json::Value> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"method":"eth_blockNumber"}"#).unwrap();

        assert_eq!(body.version(), "2.0");
        assert_eq!(body.method(), "eth_blockNumber");
        assert_eq!(body.params(), None);
    }

    #[test]
    fn should_deserialize_request_without_id() {
        let body: JsonRpcRequestBody<serde_json::Value> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"eth_blockNumber","params":[]}"#)
                .unwrap();

        assert_eq!(body.id(), None);
    }
}

mod response_body {
    use crate::rpc_client::{JsonRpcError, JsonRpcResponseBody};
    use serde_json::json;

    #[test]
    fn should_deserialize_successful_response() {
        let body: JsonRpcResponseBody<serde_json::Value> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":"0x64"}"#).unwrap();

        assert_eq!(body.into_result(), Ok(json!("0x64")));
    }

    #[test]
    fn should_deserialize_null_result() {
        let body: JsonRpcResponseBody<serde_json::Value> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();

        assert_eq!(body.into_result(), Ok(serde_json::Value::Null));
    }

    #[test]
    fn should_deserialize_error_response() {
        let body: JsonRpcResponseBody<serde_json::Value> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"bad params"}}"#,
        )
        .unwrap();

        assert_eq!(
            body.into_result(),
            Err(JsonRpcError::new(-32602, "bad params"))
        );
    }

    #[test]
    fn should_serialize_error_response_without_data_field() {
        let body: JsonRpcResponseBody<serde_json::Value> = JsonRpcResponseBody::from_error(
            json!(3),
            JsonRpcError::new(-32601, "the method eth_foo does not exist/is not available"),
        );

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "id": 3,
                "error": {
                    "code": -32601,
                    "message": "the method eth_foo does not exist/is not available"
                }
            })
        );
    }
}

mod rpc_error {
    use crate::rpc_client::RpcError;

    #[test]
    fn should_render_stable_messages() {
        for (error, expected) in [
            (
                RpcError::UnsupportedBlockTag,
                "earliest tag is not supported",
            ),
            (
                RpcError::NotEnoughMatchingResponses,
                "not enough occurrences of the same response from RPC servers",
            ),
            (
                RpcError::InconsistentResponses,
                "RPC servers returned different responses",
            ),
            (
                RpcError::NotEnoughResponses,
                "not enough responses from RPC servers",
            ),
            (RpcError::Panic("boom".to_string()), "panic: boom"),
        ] {
            assert_eq!(error.to_string(), expected);
        }
    }
}
