//! Pluggable wire codecs, selected by the numeric id negotiated over the
//! transport's WebSocket subprotocol (or configured directly for raw
//! transports), see `SPEC_FULL.md` §6.2.

pub mod cbor;
pub mod json;
pub mod msgpack;

use crate::error::CodecError;
use crate::message::Message;

pub use self::cbor::CborCodec;
pub use self::json::JsonCodec;
pub use self::msgpack::MsgPackCodec;

pub const JSON_CODEC_ID: u8 = json::CODEC_ID;
pub const MSGPACK_CODEC_ID: u8 = msgpack::CODEC_ID;
pub const CBOR_CODEC_ID: u8 = cbor::CODEC_ID;

/// One of the three wire codecs a session can be configured with.
#[derive(Debug, Clone)]
pub enum Codec {
    Json(JsonCodec),
    MsgPack(MsgPackCodec),
    Cbor(CborCodec),
}

impl Codec {
    pub fn for_id(id: u8) -> Option<Codec> {
        match id {
            JSON_CODEC_ID => Some(Codec::Json(JsonCodec::default())),
            MSGPACK_CODEC_ID => Some(Codec::MsgPack(MsgPackCodec)),
            CBOR_CODEC_ID => Some(Codec::Cbor(CborCodec)),
            _ => None,
        }
    }

    pub fn id(&self) -> u8 {
        match *self {
            Codec::Json(_) => JSON_CODEC_ID,
            Codec::MsgPack(_) => MSGPACK_CODEC_ID,
            Codec::Cbor(_) => CBOR_CODEC_ID,
        }
    }

    pub fn encode(&self, message: &Message) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::new();
        match *self {
            Codec::Json(ref c) => c.encode(message, &mut buf)?,
            Codec::MsgPack(ref c) => c.encode(message, &mut buf)?,
            Codec::Cbor(ref c) => c.encode(message, &mut buf)?,
        }
        Ok(buf)
    }

    pub fn decode(&self, source: &[u8]) -> Result<Message, CodecError> {
        let message = match *self {
            Codec::Json(ref c) => c.decode(source)?,
            Codec::MsgPack(ref c) => c.decode(source)?,
            Codec::Cbor(ref c) => c.decode(source)?,
        };
        Ok(message)
    }
}

impl Default for Codec {
    fn default() -> Codec {
        Codec::Json(JsonCodec::default())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::message::Message;

    #[test]
    fn for_id_rejects_unknown_ids() {
        assert!(Codec::for_id(0).is_none());
        assert!(Codec::for_id(99).is_none());
    }

    #[test]
    fn each_codec_round_trips_the_same_message() {
        let message = Message::Unregistered(9);
        for id in [JSON_CODEC_ID, MSGPACK_CODEC_ID, CBOR_CODEC_ID] {
            let codec = Codec::for_id(id).unwrap();
            let bytes = codec.encode(&message).unwrap();
            assert_eq!(codec.decode(&bytes).unwrap(), message);
        }
    }
}
