//! Transport-agnostic core of a WAMP client: the dynamic value model, wire
//! codecs, URI pattern matching, and the session state machine. Bring your
//! own byte-framed [`peer::Transport`] (WebSocket, raw TCP, in-process) and
//! this crate handles HELLO/WELCOME, subscription/registration bookkeeping,
//! and call correlation on top of it.

pub mod codec;
pub mod error;
pub mod idgen;
pub mod message;
pub mod peer;
pub mod session;
pub mod trie;
pub mod unpack;
mod utils;
pub mod value;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{Error, ErrorKind, WampResult};
pub use message::{CallError, ID, MatchingPolicy, Reason};
pub use peer::{Peer, Transport};
pub use session::{
    CallOutcome, Registration, Session, SessionConfig, SessionHandle, SessionState, Subscription,
};
pub use value::{Dict, List, URI, Value};
