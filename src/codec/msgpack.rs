//! MsgPack codec built on `rmp`/`rmp-serde`, using [`StructMapWriter`] so
//! field-option structs encode as maps rather than bare arrays, see
//! `SPEC_FULL.md` §4.2.2.

use rmp::Marker;
use serde::{Deserialize, Serialize};

use crate::error::{DecoderError, EncoderError};
use crate::message::Message;
use crate::utils::StructMapWriter;

pub const CODEC_ID: u8 = 2;

#[derive(Debug, Default, Clone, Copy)]
pub struct MsgPackCodec;

impl MsgPackCodec {
    pub fn encode(&self, message: &Message, sink: &mut Vec<u8>) -> Result<(), EncoderError> {
        let mut serializer = rmp_serde::Serializer::with(sink, StructMapWriter);
        message
            .serialize(&mut serializer)
            .map_err(|e| EncoderError::Io(e.to_string()))
    }

    pub fn decode(&self, source: &[u8]) -> Result<Message, DecoderError> {
        if source.is_empty() {
            return Err(DecoderError::EmptyInput);
        }
        scan(source)?;
        let mut deserializer = rmp_serde::Deserializer::new(source);
        Message::deserialize(&mut deserializer).map_err(|e| {
            if source.len() < 2 {
                DecoderError::UnexpectedEnd
            } else {
                DecoderError::Syntax(e.to_string())
            }
        })
    }
}

/// Single forward walk over the raw MsgPack bytes rejecting what `serde`'s
/// generic map/any deserialization can't be made to reject itself: map keys
/// that aren't strings, and ext-type values, which this codec has no `Value`
/// alternative for. Mirrors `codec::json::scan`'s pre-validation-before-serde
/// approach.
fn scan(bytes: &[u8]) -> Result<(), DecoderError> {
    let mut cursor = bytes;
    scan_value(&mut cursor)
}

fn scan_value(cursor: &mut &[u8]) -> Result<(), DecoderError> {
    let marker = rmp::decode::read_marker(cursor).map_err(|_| DecoderError::UnexpectedEnd)?;
    match marker {
        Marker::FixPos(_) | Marker::FixNeg(_) | Marker::Null | Marker::True | Marker::False => Ok(()),
        Marker::U8 | Marker::I8 => skip(cursor, 1),
        Marker::U16 | Marker::I16 => skip(cursor, 2),
        Marker::U32 | Marker::I32 | Marker::F32 => skip(cursor, 4),
        Marker::U64 | Marker::I64 | Marker::F64 => skip(cursor, 8),
        Marker::FixStr(len) => skip(cursor, len as usize),
        Marker::Str8 | Marker::Bin8 => {
            let len = take_u8(cursor)? as usize;
            skip(cursor, len)
        }
        Marker::Str16 | Marker::Bin16 => {
            let len = take_u16(cursor)? as usize;
            skip(cursor, len)
        }
        Marker::Str32 | Marker::Bin32 => {
            let len = take_u32(cursor)? as usize;
            skip(cursor, len)
        }
        Marker::FixArray(len) => scan_elements(cursor, len as usize),
        Marker::Array16 => {
            let len = take_u16(cursor)? as usize;
            scan_elements(cursor, len)
        }
        Marker::Array32 => {
            let len = take_u32(cursor)? as usize;
            scan_elements(cursor, len)
        }
        Marker::FixMap(len) => scan_map(cursor, len as usize),
        Marker::Map16 => {
            let len = take_u16(cursor)? as usize;
            scan_map(cursor, len)
        }
        Marker::Map32 => {
            let len = take_u32(cursor)? as usize;
            scan_map(cursor, len)
        }
        Marker::FixExt1
        | Marker::FixExt2
        | Marker::FixExt4
        | Marker::FixExt8
        | Marker::FixExt16
        | Marker::Ext8
        | Marker::Ext16
        | Marker::Ext32 => Err(DecoderError::Unsupported),
        Marker::Reserved => Err(DecoderError::Syntax("reserved marker byte 0xc1".to_string())),
    }
}

fn scan_elements(cursor: &mut &[u8], len: usize) -> Result<(), DecoderError> {
    for _ in 0..len {
        scan_value(cursor)?;
    }
    Ok(())
}

fn scan_map(cursor: &mut &[u8], len: usize) -> Result<(), DecoderError> {
    for _ in 0..len {
        scan_key(cursor)?;
        scan_value(cursor)?;
    }
    Ok(())
}

fn scan_key(cursor: &mut &[u8]) -> Result<(), DecoderError> {
    let mut peek = *cursor;
    let marker = rmp::decode::read_marker(&mut peek).map_err(|_| DecoderError::UnexpectedEnd)?;
    match marker {
        Marker::FixStr(_) | Marker::Str8 | Marker::Str16 | Marker::Str32 => scan_value(cursor),
        _ => Err(DecoderError::NonStringKey),
    }
}

fn take_u8(cursor: &mut &[u8]) -> Result<u8, DecoderError> {
    let (&first, rest) = cursor.split_first().ok_or(DecoderError::UnexpectedEnd)?;
    *cursor = rest;
    Ok(first)
}

fn take_u16(cursor: &mut &[u8]) -> Result<u16, DecoderError> {
    if cursor.len() < 2 {
        return Err(DecoderError::UnexpectedEnd);
    }
    let (head, rest) = cursor.split_at(2);
    *cursor = rest;
    Ok(u16::from_be_bytes([head[0], head[1]]))
}

fn take_u32(cursor: &mut &[u8]) -> Result<u32, DecoderError> {
    if cursor.len() < 4 {
        return Err(DecoderError::UnexpectedEnd);
    }
    let (head, rest) = cursor.split_at(4);
    *cursor = rest;
    Ok(u32::from_be_bytes([head[0], head[1], head[2], head[3]]))
}

fn skip(cursor: &mut &[u8], len: usize) -> Result<(), DecoderError> {
    if cursor.len() < len {
        return Err(DecoderError::UnexpectedEnd);
    }
    *cursor = &cursor[len..];
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::message::types::WelcomeDetails;

    #[test]
    fn round_trips_a_simple_message() {
        let codec = MsgPackCodec;
        let message = Message::Unregistered(42);
        let mut buf = Vec::new();
        codec.encode(&message, &mut buf).unwrap();
        let decoded = codec.decode(&buf).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn round_trips_a_message_with_struct_options() {
        let codec = MsgPackCodec;
        let message = Message::Welcome(7, WelcomeDetails::default());
        let mut buf = Vec::new();
        codec.encode(&message, &mut buf).unwrap();
        let decoded = codec.decode(&buf).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn empty_input_is_rejected() {
        let codec = MsgPackCodec;
        assert_eq!(codec.decode(&[]), Err(DecoderError::EmptyInput));
    }

    #[test]
    fn non_string_map_key_is_rejected() {
        let codec = MsgPackCodec;
        // FixMap(len=1) { FixInt(1): FixInt(2) }
        let bytes = vec![0x81, 0x01, 0x02];
        assert_eq!(codec.decode(&bytes), Err(DecoderError::NonStringKey));
    }

    #[test]
    fn ext_type_is_rejected() {
        let codec = MsgPackCodec;
        // FixExt1, type tag 1, 1 byte of data
        let bytes = vec![0xd4, 0x01, 0x02];
        assert_eq!(codec.decode(&bytes), Err(DecoderError::Unsupported));
    }
}
