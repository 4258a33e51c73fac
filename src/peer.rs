//! Transport-agnostic framing and request correlation, generalized from the
//! teacher's `client.rs` `ConnectionInfo`/`MessageSender` (an `IntMap`-keyed
//! request table over a concrete `ws::Sender`) onto an abstract byte-frame
//! transport, see `SPEC_FULL.md` §6.1/§3.3.

use futures::future::BoxFuture;
use intmap::IntMap;
use log::debug;

use crate::codec::Codec;
use crate::error::{CodecError, Error, ErrorKind, TransportError, WampResult};
use crate::message::{CallError, Message, Reason, ID};
use crate::value::{Dict, List};

/// A byte-framed, message-oriented, ordered, reliable, bi-directional
/// channel to a WAMP router. Framing (one frame per WAMP message) is the
/// transport's concern; `Peer` only ever hands it whole frames.
pub trait Transport: Send {
    fn send(&mut self, frame: Vec<u8>) -> BoxFuture<'_, Result<(), TransportError>>;
    fn receive(&mut self) -> BoxFuture<'_, Result<Vec<u8>, TransportError>>;
    fn close(&mut self) -> BoxFuture<'_, Result<(), TransportError>>;
    /// 0 means "no limit known".
    fn max_length_hint(&self) -> usize;
}

/// Resolves a pending request with either its reply payload or a WAMP-level
/// error, mirroring the teacher's `Complete<T> = oneshot::Sender<Result<T, CallError>>`.
pub type Completion<T> = futures::channel::oneshot::Sender<Result<T, CallError>>;

/// A request awaiting a correlated reply, keyed by request id in [`Peer`]'s
/// pending table.
pub struct PendingRequest {
    pub completion: Completion<(Option<List>, Option<Dict>)>,
    /// Invoked for each non-terminal progressive `YIELD`/`RESULT`; the
    /// terminal one (no `progress` flag) still resolves `completion`.
    pub on_progress: Option<Box<dyn FnMut(Option<List>, Option<Dict>) + Send>>,
}

/// Owns the transport and wire codec; encodes/decodes whole messages and
/// keeps the table of requests awaiting a correlated reply. Does not itself
/// know WAMP semantics beyond "a request id correlates one reply" — that
/// belongs to [`crate::session::Session`].
pub struct Peer<T: Transport> {
    transport: T,
    codec: Codec,
    pending: IntMap<PendingRequest>,
}

impl<T: Transport> Peer<T> {
    pub fn new(transport: T, codec_id: u8) -> WampResult<Peer<T>> {
        let codec = Codec::for_id(codec_id).ok_or_else(|| Error::new(ErrorKind::UnsupportedCodec(codec_id)))?;
        Ok(Peer {
            transport,
            codec,
            pending: IntMap::new(),
        })
    }

    pub fn codec_id(&self) -> u8 {
        self.codec.id()
    }

    /// Encodes and writes a single message, rejecting it up front if it
    /// would exceed the transport's `max_length_hint`.
    pub async fn send(&mut self, message: &Message) -> WampResult<()> {
        let bytes = self
            .codec
            .encode(message)
            .map_err(|e: CodecError| Error::new(ErrorKind::Codec(e)))?;
        let limit = self.transport.max_length_hint();
        if limit > 0 && bytes.len() > limit {
            return Err(Error::new(ErrorKind::Transport(
                TransportError::PayloadSizeExceeded {
                    limit,
                    actual: bytes.len(),
                },
            )));
        }
        debug!("sending {:?} ({} bytes, codec {})", message, bytes.len(), self.codec.id());
        self.transport
            .send(bytes)
            .await
            .map_err(|e| Error::new(ErrorKind::Transport(e)))
    }

    /// Reads and decodes the next whole message from the transport.
    pub async fn receive(&mut self) -> WampResult<Message> {
        let bytes = self
            .transport
            .receive()
            .await
            .map_err(|e| Error::new(ErrorKind::Transport(e)))?;
        self.codec
            .decode(&bytes)
            .map_err(|e: CodecError| Error::new(ErrorKind::Codec(e)))
    }

    pub async fn close(&mut self) -> WampResult<()> {
        self.transport
            .close()
            .await
            .map_err(|e| Error::new(ErrorKind::Transport(e)))
    }

    pub fn register_pending(&mut self, request_id: ID, pending: PendingRequest) {
        self.pending.insert(request_id, pending);
    }

    pub fn take_pending(&mut self, request_id: ID) -> Option<PendingRequest> {
        self.pending.remove(request_id)
    }

    pub fn pending_mut(&mut self, request_id: ID) -> Option<&mut PendingRequest> {
        self.pending.get_mut(request_id)
    }

    pub fn has_pending(&self, request_id: ID) -> bool {
        self.pending.get(request_id).is_some()
    }

    /// Abandons every pending request with `reason`, mirroring the teacher's
    /// `cancel_future!`/`cancel_future_tuple!` macros in `client.rs`.
    pub fn cancel_all_pending(&mut self, reason: Reason) {
        for (_, pending) in self.pending.drain() {
            let _ = pending
                .completion
                .send(Err(CallError::new(reason.clone(), None, None)));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::ChannelTransport;

    #[tokio::test]
    async fn send_then_receive_round_trips_a_message() {
        let (a, b) = ChannelTransport::pair();
        let mut left = Peer::new(a, crate::codec::JSON_CODEC_ID).unwrap();
        let mut right = Peer::new(b, crate::codec::JSON_CODEC_ID).unwrap();

        left.send(&Message::Unregistered(7)).await.unwrap();
        let received = right.receive().await.unwrap();
        assert_eq!(received, Message::Unregistered(7));
    }

    #[tokio::test]
    async fn oversized_payload_is_rejected_before_the_transport_sees_it() {
        let (a, _b) = ChannelTransport::pair();
        let mut peer = Peer::new(a, crate::codec::JSON_CODEC_ID).unwrap();
        peer.transport.max_length = 4;
        let result = peer.send(&Message::Unregistered(123456789)).await;
        assert!(matches!(
            result,
            Err(Error {
                kind: ErrorKind::Transport(TransportError::PayloadSizeExceeded { .. })
            })
        ));
    }

    #[test]
    fn unknown_codec_id_is_rejected() {
        let (a, _b) = ChannelTransport::pair();
        let result = Peer::new(a, 99);
        assert!(matches!(
            result,
            Err(Error {
                kind: ErrorKind::UnsupportedCodec(99)
            })
        ));
    }
}
