//! An in-memory `Transport`, used by this crate's own peer/session tests
//! and exported so downstream integration tests don't need a real network
//! router, see `SPEC_FULL.md` §6.1 ("no concrete network transport ships
//! with this crate").

use futures::channel::mpsc;
use futures::future::BoxFuture;
use futures::{FutureExt, SinkExt, StreamExt};

use crate::error::TransportError;
use crate::peer::Transport;

/// One end of an in-process, paired byte-frame channel. `ChannelTransport::pair()`
/// returns both ends; each is a legal [`Transport`] for a [`crate::peer::Peer`].
pub struct ChannelTransport {
    outbox: mpsc::UnboundedSender<Vec<u8>>,
    inbox: mpsc::UnboundedReceiver<Vec<u8>>,
    /// 0 means "no limit"; tests can set this to exercise
    /// `TransportError::PayloadSizeExceeded`.
    pub max_length: usize,
}

impl ChannelTransport {
    /// Builds two transports whose `send`/`receive` are each other's mirror.
    pub fn pair() -> (ChannelTransport, ChannelTransport) {
        let (tx_a, rx_a) = mpsc::unbounded();
        let (tx_b, rx_b) = mpsc::unbounded();
        (
            ChannelTransport {
                outbox: tx_a,
                inbox: rx_b,
                max_length: 0,
            },
            ChannelTransport {
                outbox: tx_b,
                inbox: rx_a,
                max_length: 0,
            },
        )
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, frame: Vec<u8>) -> BoxFuture<'_, Result<(), TransportError>> {
        async move {
            self.outbox
                .send(frame)
                .await
                .map_err(|e| TransportError::WriteFailed(e.to_string()))
        }
        .boxed()
    }

    fn receive(&mut self) -> BoxFuture<'_, Result<Vec<u8>, TransportError>> {
        async move {
            self.inbox
                .next()
                .await
                .ok_or(TransportError::Disconnected)
        }
        .boxed()
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), TransportError>> {
        async move {
            self.outbox.close_channel();
            Ok(())
        }
        .boxed()
    }

    fn max_length_hint(&self) -> usize {
        self.max_length
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn pair_mirrors_sends_into_the_others_receive() {
        let (mut a, mut b) = ChannelTransport::pair();
        a.send(vec![1, 2, 3]).await.unwrap();
        assert_eq!(b.receive().await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn closing_the_sender_surfaces_as_disconnected_on_receive() {
        let (a, mut b) = ChannelTransport::pair();
        drop(a);
        assert!(matches!(
            b.receive().await,
            Err(TransportError::Disconnected)
        ));
    }
}
