//! CBOR codec built on `ciborium`. Added to the codec set beyond what the
//! wire protocol strictly requires because `Value`'s native byte-string
//! support (`Blob`) and integer-width handling map onto CBOR without any
//! escaping, unlike JSON, see `SPEC_FULL.md` §4.2.3.

use crate::error::{DecoderError, EncoderError};
use crate::message::Message;

pub const CODEC_ID: u8 = 3;

#[derive(Debug, Default, Clone, Copy)]
pub struct CborCodec;

impl CborCodec {
    pub fn encode(&self, message: &Message, sink: &mut Vec<u8>) -> Result<(), EncoderError> {
        ciborium::ser::into_writer(message, sink).map_err(|e| EncoderError::Io(e.to_string()))
    }

    pub fn decode(&self, source: &[u8]) -> Result<Message, DecoderError> {
        if source.is_empty() {
            return Err(DecoderError::EmptyInput);
        }
        ciborium::de::from_reader(source).map_err(|e| match e {
            ciborium::de::Error::Io(_) => DecoderError::UnexpectedEnd,
            other => DecoderError::Syntax(other.to_string()),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::Value;

    #[test]
    fn round_trips_a_message_with_a_blob_argument() {
        let codec = CborCodec;
        let message = Message::Yield(
            1,
            Default::default(),
            Some(vec![Value::Blob(vec![0, 1, 2, 255])]),
            None,
        );
        let mut buf = Vec::new();
        codec.encode(&message, &mut buf).unwrap();
        let decoded = codec.decode(&buf).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn empty_input_is_rejected() {
        let codec = CborCodec;
        assert_eq!(codec.decode(&[]), Err(DecoderError::EmptyInput));
    }
}
