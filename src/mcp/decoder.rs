//! JSON-RPC payload decoding.
//!
//! Turns one frame into a [`JsonRpcRequest`]. Everything loosely typed about
//! the wire format is resolved here so the dispatcher only sees explicit
//! optional fields.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::protocol::{deserialize_present, JsonRpcRequest, RequestId};

/// Why a payload could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Payload is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload is valid JSON but not an object.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Result of decoding one frame.
#[derive(Debug)]
pub enum Decoded {
    /// A request or notification to dispatch.
    Request(JsonRpcRequest),
    /// An object without a string `method`; dropped without a reply.
    Ignored,
    /// Unparseable payload; answered with a parse error.
    Malformed(DecodeError),
}

/// Wire shape of an incoming message. Only the fields the server reads.
#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    method: Option<Value>,
    #[serde(default, deserialize_with = "deserialize_present")]
    id: Option<RequestId>,
    #[serde(default)]
    params: Option<Value>,
}

/// Decode a frame payload.
pub fn decode(payload: &[u8]) -> Decoded {
    let value: Value = match serde_json::from_slice(payload) {
        Ok(value) => value,
        Err(e) => return Decoded::Malformed(e.into()),
    };
    if !value.is_object() {
        return Decoded::Malformed(DecodeError::NotAnObject(json_kind(&value)));
    }

    let envelope: Envelope = match serde_json::from_value(value) {
        Ok(envelope) => envelope,
        Err(e) => return Decoded::Malformed(e.into()),
    };

    let Some(Value::String(method)) = envelope.method else {
        debug!("ignoring message without a string method");
        return Decoded::Ignored;
    };

    let params = match envelope.params {
        Some(Value::Object(map)) => map,
        None | Some(Value::Null) => Map::new(),
        Some(other) => {
            debug!(%method, kind = json_kind(&other), "treating non-object params as empty");
            Map::new()
        }
    };

    Decoded::Request(JsonRpcRequest { method, id: envelope.id, params })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(payload: &str) -> JsonRpcRequest {
        match decode(payload.as_bytes()) {
            Decoded::Request(req) => req,
            other => panic!("expected a request, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_request_with_params() {
        let req = request(
            r#"{"jsonrpc":"2.0","method":"tools/call","id":5,"params":{"name":"x","arguments":{}}}"#,
        );
        assert_eq!(req.method, "tools/call");
        assert_eq!(req.id, Some(RequestId::from(5)));
        assert_eq!(req.params["name"], "x");
    }

    #[test]
    fn test_absent_id_is_notification() {
        let req = request(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#);
        assert!(req.id.is_none());
        assert!(req.params.is_empty());
    }

    #[test]
    fn test_null_id_is_kept() {
        let req = request(r#"{"method":"initialize","id":null}"#);
        assert_eq!(req.id, Some(RequestId::Null));
            }

    #[test]
    fn test_string_and_structured_ids() {
        assert_eq!(request(r#"{"method":"m","id":"abc"}"#).id, Some(RequestId::from("abc")));
        assert_eq!(
            request(r#"{"method":"m","id":{"a":1}}"#).id,
            Some(RequestId::Other(json!({"a": 1})))
        );
    }

    #[test]
    fn test_non_object_params_become_empty() {
        let req = request(r#"{"method":"tools/list","id":1,"params":[1,2]}"#);
        assert!(req.params.is_empty());
        let req = request(r#"{"method":"tools/list","id":1,"params":null}"#);
        assert!(req.params.is_empty());
    }

    #[test]
    fn test_missing_or_non_string_method_is_ignored() {
        assert!(matches!(decode(br#"{"id":1}"#), Decoded::Ignored));
        assert!(matches!(decode(br#"{"method":42,"id":1}"#), Decoded::Ignored));
        assert!(matches!(decode(br#"{"method":null}"#), Decoded::Ignored));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        assert!(matches!(decode(b"{not json"), Decoded::Malformed(DecodeError::Json(_))));
        assert!(matches!(decode(b""), Decoded::Malformed(DecodeError::Json(_))));
        assert!(matches!(decode(b"\xff\xfe"), Decoded::Malformed(DecodeError::Json(_))));
    }

    #[test]
    fn test_non_object_json_is_malformed() {
        assert!(matches!(decode(b"[1,2]"), Decoded::Malformed(DecodeError::NotAnObject("array"))));
        assert!(matches!(decode(b"42"), Decoded::Malformed(DecodeError::NotAnObject("number"))));
    }
}
