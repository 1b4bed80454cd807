//! JSON-RPC 2.0 envelopes used by MCP.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use stepwise_core::error::ToolError;

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: i64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: i64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: i64, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id: Value::from(id),
            result: Some(result),
            error: None,
        }
    }

    /// Numeric request id, if the server echoed one.
    pub fn numeric_id(&self) -> Option<i64> {
        self.id.as_i64()
    }

    pub fn into_result(self) -> Result<Value, ToolError> {
        match (self.error, self.result) {
            (Some(error), _) => Err(ToolError::Protocol(format!("MCP error: {error}"))),
            (None, Some(result)) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}

/// Anything the server may send down the stream.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    Response(JsonRpcResponse),
    /// A request from the server (e.g. `ping`); carries the id to answer.
    Request { id: Value, method: String },
    Notification(JsonRpcNotification),
}

impl IncomingMessage {
    pub fn parse(raw: &str) -> Result<Self, ToolError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ToolError::Protocol(format!("invalid JSON-RPC payload: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ToolError> {
        let has_id = value.get("id").is_some_and(|id| !id.is_null());
        let method = value.get("method").and_then(Value::as_str).map(str::to_string);

        match (has_id, method) {
            (true, Some(method)) => Ok(Self::Request {
                id: value["id"].clone(),
                method,
            }),
            (false, Some(_)) => serde_json::from_value(value)
                .map(Self::Notification)
                .map_err(|e| ToolError::Protocol(format!("invalid notification: {e}"))),
            (true, None) => serde_json::from_value(value)
                .map(Self::Response)
                .map_err(|e| ToolError::Protocol(format!("invalid response: {e}"))),
            (false, None) => Err(ToolError::Protocol(
                "JSON-RPC message has neither id nor method".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serialization_omits_empty_params() {
        let req = JsonRpcRequest::new(7, "tools/list", None);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, json!({"jsonrpc": "2.0", "id": 7, "method": "tools/list"}));
    }

    #[test]
    fn classify_messages() {
        let resp = IncomingMessage::parse(r#"{"jsonrpc":"2.0","id":1,"result":{"tools":[]}}"#).unwrap();
        assert!(matches!(resp, IncomingMessage::Response(r) if r.numeric_id() == Some(1)));

        let ping = IncomingMessage::parse(r#"{"jsonrpc":"2.0","id":"p1","method":"ping"}"#).unwrap();
        assert!(matches!(ping, IncomingMessage::Request { method, .. } if method == "ping"));

        let note =
            IncomingMessage::parse(r#"{"jsonrpc":"2.0","method":"notifications/progress","params":{}}"#)
                .unwrap();
        assert!(matches!(note, IncomingMessage::Notification(_)));

        assert!(IncomingMessage::parse(r#"{"jsonrpc":"2.0"}"#).is_err());
        assert!(IncomingMessage::parse("not json").is_err());
    }

    #[test]
    fn error_response_becomes_protocol_error() {
        let resp: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "error": {"code": -32601, "message": "Method not found"}
        }))
        .unwrap();
        let err = resp.into_result().unwrap_err();
        assert!(matches!(err, ToolError::Protocol(_)));
        assert!(err.to_string().contains("Method not found"));
    }
}
