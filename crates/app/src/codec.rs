//! JSON content codec.

use serde_json::Value;
use servient_domain::content::{Content, JSON, TEXT};
use servient_domain::error::CodecError;

use crate::ports::ContentCodec;

/// Encodes every value as `application/json`.
///
/// Decodes `application/json` and structured `+json` types, treats
/// `text/plain` bodies as JSON strings and empty bodies as `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ContentCodec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<Content, CodecError> {
        Ok(Content::new(JSON, serde_json::to_vec(value)?))
    }

    fn decode(&self, content: &Content) -> Result<Value, CodecError> {
        if content.is_empty() {
            return Ok(Value::Null);
        }
        let essence = content.essence();
        if essence == JSON || essence.ends_with("+json") {
            Ok(serde_json::from_slice(&content.body)?)
        } else if essence == TEXT {
            Ok(Value::String(String::from_utf8(content.body.clone())?))
        } else {
            Err(CodecError::UnsupportedMediaType(content.media_type.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use servient_domain::content::TD_JSON;

    #[test]
    fn should_encode_value_as_json() {
        let encoded = JsonCodec.encode(&json!({"count": 7})).unwrap();
        assert_eq!(encoded.media_type, JSON);
        assert_eq!(encoded.body, br#"{"count":7}"#.to_vec());
    }

    #[test]
    fn should_decode_json_with_charset_parameter() {
        let decoded = JsonCodec
            .decode(&Content::new("application/json; charset=utf-8", "[1,2]"))
            .unwrap();
        assert_eq!(decoded, json!([1, 2]));
    }

    #[test]
    fn should_decode_structured_json_suffix() {
        let decoded = JsonCodec
            .decode(&Content::new(TD_JSON, r#"{"title":"x"}"#))
            .unwrap();
        assert_eq!(decoded["title"], "x");
    }

    #[test]
    fn should_decode_plain_text_as_string() {
        let decoded = JsonCodec.decode(&Content::new(TEXT, "hello")).unwrap();
        assert_eq!(decoded, json!("hello"));
    }

    #[test]
    fn should_decode_empty_body_as_null() {
        let decoded = JsonCodec.decode(&Content::new(JSON, "")).unwrap();
        assert_eq!(decoded, Value::Null);
    }

    #[test]
    fn should_reject_unsupported_media_type() {
        let result = JsonCodec.decode(&Content::new("application/cbor", vec![0xa0]));
        assert!(matches!(result, Err(CodecError::UnsupportedMediaType(_))));
    }

    #[test]
    fn should_reject_malformed_json() {
        let result = JsonCodec.decode(&Content::new(JSON, "{nope"));
        assert!(matches!(result, Err(CodecError::Json(_))));
    }
}
