//! JSON codec: standard `serde_json` text, plus the non-standard
//! Base64-in-string escape used to carry [`Value::Blob`] payloads, see
//! `SPEC_FULL.md` §4.2.1.

use std::collections::HashSet;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::{DecoderError, EncoderError};
use crate::message::Message;
use crate::value::{Dict, List, Value};

pub const CODEC_ID: u8 = 1;

#[derive(Debug, Clone, Copy)]
pub struct JsonCodec {
    pub max_depth: usize,
    pub strict_duplicate_keys: bool,
}

impl Default for JsonCodec {
    fn default() -> JsonCodec {
        JsonCodec {
            max_depth: 128,
            strict_duplicate_keys: false,
        }
    }
}

impl JsonCodec {
    pub fn new(max_depth: usize, strict_duplicate_keys: bool) -> JsonCodec {
        JsonCodec {
            max_depth,
            strict_duplicate_keys,
        }
    }

    pub fn encode(&self, message: &Message, sink: &mut Vec<u8>) -> Result<(), EncoderError> {
        let tree = message_to_json(message)?;
        serde_json::to_writer(sink, &tree).map_err(|e| EncoderError::Io(e.to_string()))
    }

    pub fn decode(&self, source: &[u8]) -> Result<Message, DecoderError> {
        if source.is_empty() {
            return Err(DecoderError::EmptyInput);
        }
        let text = std::str::from_utf8(source).map_err(|_| DecoderError::BadUtf8)?;
        scan(text, self.max_depth, self.strict_duplicate_keys)?;
        serde_json::from_str::<Message>(text).map_err(|e| {
            if e.is_eof() {
                DecoderError::UnexpectedEnd
            } else {
                DecoderError::Syntax(e.to_string())
            }
        })
    }
}

/// Encodes a `Blob`'s bytes as the first-character-NUL, base64-following
/// JSON string convention.
pub(crate) fn encode_blob_escape(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() + 1);
    s.push('\u{0}');
    s.push_str(&BASE64.encode(bytes));
    s
}

/// Decodes the portion of a JSON string following the leading NUL back into
/// raw bytes.
pub(crate) fn decode_blob_escape(escaped: &str) -> Result<Vec<u8>, DecoderError> {
    BASE64.decode(escaped).map_err(|e| match e {
        base64::DecodeError::InvalidLength(_) => DecoderError::BadBase64Length,
        base64::DecodeError::InvalidByte(..) => DecoderError::BadBase64Char,
        base64::DecodeError::InvalidLastSymbol(..) => DecoderError::BadBase64Padding,
        base64::DecodeError::InvalidPadding => DecoderError::BadBase64Padding,
    })
}

fn encode_value(v: &Value) -> JsonValue {
    match *v {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(b),
        Value::Int(i) => JsonValue::from(i),
        Value::UInt(u) => JsonValue::from(u),
        Value::Real(f) => {
            if f.is_finite() {
                serde_json::Number::from_f64(f)
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null)
            } else {
                JsonValue::Null
            }
        }
        Value::String(ref s) => JsonValue::String(s.clone()),
        Value::Blob(ref b) => JsonValue::String(encode_blob_escape(b)),
        Value::List(ref l) => JsonValue::Array(l.iter().map(encode_value).collect()),
        Value::Dict(ref d) => {
            let mut map = JsonMap::new();
            for (k, v) in d {
                map.insert(k.clone(), encode_value(v));
            }
            JsonValue::Object(map)
        }
    }
}

fn encode_args(args: &Option<List>, kwargs: &Option<Dict>) -> Vec<JsonValue> {
    match (args, kwargs) {
        (Some(a), Some(k)) => vec![
            encode_value(&Value::List(a.clone())),
            encode_value(&Value::Dict(k.clone())),
        ],
        (Some(a), None) => vec![encode_value(&Value::List(a.clone()))],
        (None, Some(k)) => vec![
            JsonValue::Array(Vec::new()),
            encode_value(&Value::Dict(k.clone())),
        ],
        (None, None) => Vec::new(),
    }
}

fn json_of<T: Serialize>(v: &T) -> Result<JsonValue, EncoderError> {
    serde_json::to_value(v).map_err(|e| EncoderError::Io(e.to_string()))
}

/// Builds the JSON array form of a message directly (rather than going
/// through `Message`'s generic `Serialize` impl), so that `Blob` payloads
/// inside `args`/`kwargs` get the base64-in-string treatment instead of
/// `serde_json`'s default byte-array encoding.
fn message_to_json(message: &Message) -> Result<JsonValue, EncoderError> {
    let mut elems: Vec<JsonValue> = vec![JsonValue::from(message.type_code())];
    match *message {
        Message::Hello(ref realm, ref details) => {
            elems.push(json_of(realm)?);
            elems.push(json_of(details)?);
        }
        Message::Welcome(session, ref details) => {
            elems.push(JsonValue::from(session));
            elems.push(json_of(details)?);
        }
        Message::Abort(ref details, ref reason) => {
            elems.push(json_of(details)?);
            elems.push(json_of(reason)?);
        }
        Message::Challenge(ref method, ref extra) => {
            elems.push(JsonValue::String(method.clone()));
            elems.push(encode_value(&Value::Dict(extra.clone())));
        }
        Message::Authenticate(ref signature, ref extra) => {
            elems.push(JsonValue::String(signature.clone()));
            elems.push(encode_value(&Value::Dict(extra.clone())));
        }
        Message::Goodbye(ref details, ref reason) => {
            elems.push(json_of(details)?);
            elems.push(json_of(reason)?);
        }
        Message::Error(ty, id, ref details, ref reason, ref args, ref kwargs) => {
            elems.push(json_of(&ty)?);
            elems.push(JsonValue::from(id));
            elems.push(encode_value(&Value::Dict(details.clone())));
            elems.push(json_of(reason)?);
            elems.extend(encode_args(args, kwargs));
        }
        Message::Subscribe(id, ref options, ref topic) => {
            elems.push(JsonValue::from(id));
            elems.push(json_of(options)?);
            elems.push(json_of(topic)?);
        }
        Message::Subscribed(id, sub_id) => {
            elems.push(JsonValue::from(id));
            elems.push(JsonValue::from(sub_id));
        }
        Message::Unsubscribe(id, sub_id) => {
            elems.push(JsonValue::from(id));
            elems.push(JsonValue::from(sub_id));
        }
        Message::Unsubscribed(id) => elems.push(JsonValue::from(id)),
        Message::Publish(id, ref options, ref topic, ref args, ref kwargs) => {
            elems.push(JsonValue::from(id));
            elems.push(json_of(options)?);
            elems.push(json_of(topic)?);
            elems.extend(encode_args(args, kwargs));
        }
        Message::Published(id, pub_id) => {
            elems.push(JsonValue::from(id));
            elems.push(JsonValue::from(pub_id));
        }
        Message::Event(sub_id, pub_id, ref details, ref args, ref kwargs) => {
            elems.push(JsonValue::from(sub_id));
            elems.push(JsonValue::from(pub_id));
            elems.push(json_of(details)?);
            elems.extend(encode_args(args, kwargs));
        }
        Message::Register(id, ref options, ref procedure) => {
            elems.push(JsonValue::from(id));
            elems.push(json_of(options)?);
            elems.push(json_of(procedure)?);
        }
        Message::Registered(id, reg_id) => {
            elems.push(JsonValue::from(id));
            elems.push(JsonValue::from(reg_id));
        }
        Message::Unregister(id, reg_id) => {
            elems.push(JsonValue::from(id));
            elems.push(JsonValue::from(reg_id));
        }
        Message::Unregistered(id) => elems.push(JsonValue::from(id)),
        Message::Call(id, ref options, ref procedure, ref args, ref kwargs) => {
            elems.push(JsonValue::from(id));
            elems.push(json_of(options)?);
            elems.push(json_of(procedure)?);
            elems.extend(encode_args(args, kwargs));
        }
        Message::Cancel(id, ref options) => {
            elems.push(JsonValue::from(id));
            elems.push(json_of(options)?);
        }
        Message::Invocation(id, reg_id, ref details, ref args, ref kwargs) => {
            elems.push(JsonValue::from(id));
            elems.push(JsonValue::from(reg_id));
            elems.push(json_of(details)?);
            elems.extend(encode_args(args, kwargs));
        }
        Message::Interrupt(id, ref options) => {
            elems.push(JsonValue::from(id));
            elems.push(json_of(options)?);
        }
        Message::Yield(id, ref options, ref args, ref kwargs) => {
            elems.push(JsonValue::from(id));
            elems.push(json_of(options)?);
            elems.extend(encode_args(args, kwargs));
        }
        Message::Result(id, ref details, ref args, ref kwargs) => {
            elems.push(JsonValue::from(id));
            elems.push(json_of(details)?);
            elems.extend(encode_args(args, kwargs));
        }
    }
    Ok(JsonValue::Array(elems))
}

/// Single forward scan over the raw JSON text enforcing the configured
/// nesting depth and, when `strict`, rejecting duplicate object keys.
/// Done ahead of `serde_json::from_str` because `serde_json::Map` silently
/// keeps the last value for a repeated key, discarding the information a
/// strict decoder needs.
fn scan(text: &str, max_depth: usize, strict: bool) -> Result<(), DecoderError> {
    #[derive(Debug)]
    enum Frame {
        Object(HashSet<String>),
        Array,
    }

    let mut stack: Vec<Frame> = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut pending_key: Option<String> = None;

    while let Some((_, c)) = chars.next() {
        match c {
            '"' => {
                let mut s = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some((_, escaped)) = chars.next() {
                                s.push(escaped);
                            }
                        }
                        '"' => {
                            closed = true;
                            break;
                        }
                        other => s.push(other),
                    }
                }
                if !closed {
                    return Err(DecoderError::UnexpectedEnd);
                }
                // Peek past whitespace to see if this string is an object key.
                let mut lookahead = chars.clone();
                let mut is_key = false;
                while let Some(&(_, next)) = lookahead.peek() {
                    if next.is_whitespace() {
                        lookahead.next();
                        continue;
                    }
                    is_key = next == ':';
                    break;
                }
                if is_key && matches!(stack.last(), Some(Frame::Object(_))) {
                    pending_key = Some(s);
                } else if strict && pending_key.is_none() {
                    // a bare string value inside an object/array; nothing to track
                }
            }
            ':' => {
                if let (Some(Frame::Object(seen)), Some(key)) =
                    (stack.last_mut(), pending_key.take())
                {
                    if strict && !seen.insert(key) {
                        return Err(DecoderError::DuplicateKey);
                    }
                }
            }
            '{' => {
                stack.push(Frame::Object(HashSet::new()));
                if stack.len() > max_depth {
                    return Err(DecoderError::MaxDepth);
                }
            }
            '[' => {
                stack.push(Frame::Array);
                if stack.len() > max_depth {
                    return Err(DecoderError::MaxDepth);
                }
            }
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn blob_round_trips_through_the_escape() {
        let bytes = vec![0x00u8, 0xFFu8, 0x10u8];
        let escaped = encode_blob_escape(&bytes);
        assert_eq!(&escaped[..1], "\u{0}");
        let decoded = decode_blob_escape(&escaped[1..]).unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn depth_scan_rejects_overly_nested_input() {
        let text = "[[[[[1]]]]]";
        assert!(scan(text, 2, false).is_err());
        assert!(scan(text, 10, false).is_ok());
    }

    #[test]
    fn strict_scan_rejects_duplicate_keys() {
        let text = r#"{"a":1,"a":2}"#;
        assert_eq!(scan(text, 10, true), Err(DecoderError::DuplicateKey));
        assert!(scan(text, 10, false).is_ok());
    }

    #[test]
    fn non_finite_reals_encode_as_null() {
        let tree = encode_value(&Value::Real(f64::NAN));
        assert_eq!(tree, JsonValue::Null);
        let tree = encode_value(&Value::Real(f64::INFINITY));
        assert_eq!(tree, JsonValue::Null);
    }
}
