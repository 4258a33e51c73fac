//! WAMP message typing: the wire-level enum, its arity/direction table, and
//! the field-option/role/error types it carries.

use std::fmt;

use serde;

pub mod types;
pub use self::types::*;

use crate::value::{Dict, List, URI};

/// A WAMP identifier (session, request, subscription, registration,
/// publication): a positive integer below 2^53, see `SPEC_FULL.md` §3.2.
pub type ID = u64;

macro_rules! try_or {
    ($e:expr, $msg:expr) => {
        match $e? {
            Some(val) => val,
            None => return Err(serde::de::Error::custom($msg)),
        }
    };
}

#[derive(Debug, PartialEq)]
pub enum Message {
    Hello(URI, HelloDetails),
    Welcome(ID, WelcomeDetails),
    Abort(ErrorDetails, Reason),
    Challenge(String, Dict),
    Authenticate(String, Dict),
    Goodbye(ErrorDetails, Reason),
    Error(ErrorType, ID, Dict, Reason, Option<List>, Option<Dict>),
    Subscribe(ID, SubscribeOptions, URI),
    Subscribed(ID, ID),
    Unsubscribe(ID, ID),
    Unsubscribed(ID),
    Publish(ID, PublishOptions, URI, Option<List>, Option<Dict>),
    Published(ID, ID),
    Event(ID, ID, EventDetails, Option<List>, Option<Dict>),
    Register(ID, RegisterOptions, URI),
    Registered(ID, ID),
    Unregister(ID, ID),
    Unregistered(ID),
    Call(ID, CallOptions, URI, Option<List>, Option<Dict>),
    Cancel(ID, CancelOptions),
    Invocation(ID, ID, InvocationDetails, Option<List>, Option<Dict>),
    Interrupt(ID, InterruptOptions),
    Yield(ID, YieldOptions, Option<List>, Option<Dict>),
    Result(ID, ResultDetails, Option<List>, Option<Dict>),
}

/// Which peer(s) may legally send a given message type.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Direction {
    ClientToRouter,
    RouterToClient,
    Either,
}

impl Message {
    /// Numeric WAMP message type code.
    pub fn type_code(&self) -> u8 {
        match *self {
            Message::Hello(..) => 1,
            Message::Welcome(..) => 2,
            Message::Abort(..) => 3,
            Message::Challenge(..) => 4,
            Message::Authenticate(..) => 5,
            Message::Goodbye(..) => 6,
            Message::Error(..) => 8,
            Message::Publish(..) => 16,
            Message::Published(..) => 17,
            Message::Subscribe(..) => 32,
            Message::Subscribed(..) => 33,
            Message::Unsubscribe(..) => 34,
            Message::Unsubscribed(..) => 35,
            Message::Event(..) => 36,
            Message::Call(..) => 48,
            Message::Cancel(..) => 49,
            Message::Result(..) => 50,
            Message::Register(..) => 64,
            Message::Registered(..) => 65,
            Message::Unregister(..) => 66,
            Message::Unregistered(..) => 67,
            Message::Invocation(..) => 68,
            Message::Interrupt(..) => 69,
            Message::Yield(..) => 70,
        }
    }

    /// The direction(s) in which this message type may legally travel.
    pub fn direction(&self) -> Direction {
        match *self {
            Message::Hello(..)
            | Message::Authenticate(..)
            | Message::Subscribe(..)
            | Message::Unsubscribe(..)
            | Message::Publish(..)
            | Message::Register(..)
            | Message::Unregister(..)
            | Message::Call(..)
            | Message::Cancel(..)
            | Message::Yield(..) => Direction::ClientToRouter,
            Message::Welcome(..)
            | Message::Challenge(..)
            | Message::Subscribed(..)
            | Message::Unsubscribed(..)
            | Message::Published(..)
            | Message::Event(..)
            | Message::Registered(..)
            | Message::Unregistered(..)
            | Message::Invocation(..)
            | Message::Interrupt(..)
            | Message::Result(..) => Direction::RouterToClient,
            Message::Abort(..) | Message::Goodbye(..) | Message::Error(..) => Direction::Either,
        }
    }

    /// The `RequestId` this message carries for reply correlation, if any.
    pub fn request_id(&self) -> Option<ID> {
        match *self {
            Message::Error(_, id, ..)
            | Message::Subscribe(id, ..)
            | Message::Subscribed(id, ..)
            | Message::Unsubscribe(id, ..)
            | Message::Unsubscribed(id)
            | Message::Publish(id, ..)
            | Message::Published(id, ..)
            | Message::Register(id, ..)
            | Message::Registered(id, ..)
            | Message::Unregister(id, ..)
            | Message::Unregistered(id)
            | Message::Call(id, ..)
            | Message::Cancel(id, ..)
            | Message::Invocation(id, ..)
            | Message::Interrupt(id, ..)
            | Message::Yield(id, ..)
            | Message::Result(id, ..) => Some(id),
            _ => None,
        }
    }
}

macro_rules! serialize_with_args {
    ($args:expr, $kwargs:expr, $serializer:expr, $($item: expr),*) => (
        if let Some(ref kwargs) = *$kwargs {
                if let Some(ref args) =  *$args {
                    ( $($item,)* args, kwargs).serialize($serializer)
                } else {
                    ( $($item,)* Vec::<u8>::new(), kwargs).serialize($serializer)
                }
            } else {
                if let Some(ref args) = *$args {
                    ( $($item,)* args).serialize($serializer)
                } else {
                    ( $($item,)*).serialize($serializer)
                }

            }
    );
}

impl serde::Serialize for Message {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match *self {
            Message::Hello(ref realm, ref details) => (1, &realm, details).serialize(serializer),
            Message::Welcome(session, ref details) => {
                (2, session, details).serialize(serializer)
            }
            Message::Abort(ref details, ref reason) => (3, details, reason).serialize(serializer),
            Message::Challenge(ref method, ref extra) => {
                (4, method, extra).serialize(serializer)
            }
            Message::Authenticate(ref signature, ref extra) => {
                (5, signature, extra).serialize(serializer)
            }
            Message::Goodbye(ref details, ref reason) => (6, details, reason).serialize(serializer),
            Message::Error(ty, id, ref details, ref reason, ref args, ref kwargs) => {
                serialize_with_args!(args, kwargs, serializer, 8, ty, id, details, reason)
            }
            Message::Subscribe(request_id, ref options, ref topic) => {
                (32, request_id, options, topic).serialize(serializer)
            }
            Message::Subscribed(request_id, subscription_id) => {
                (33, request_id, subscription_id).serialize(serializer)
            }
            Message::Unsubscribe(request_id, subscription_id) => {
                (34, request_id, subscription_id).serialize(serializer)
            }
            Message::Unsubscribed(request_id) => (35, request_id).serialize(serializer),
            Message::Publish(id, ref details, ref topic, ref args, ref kwargs) => {
                serialize_with_args!(args, kwargs, serializer, 16, id, details, topic)
            }
            Message::Published(request_id, publication_id) => {
                (17, request_id, publication_id).serialize(serializer)
            }
            Message::Event(subscription_id, publication_id, ref details, ref args, ref kwargs) => {
                serialize_with_args!(
                    args,
                    kwargs,
                    serializer,
                    36,
                    subscription_id,
                    publication_id,
                    details
                )
            }
            Message::Register(request_id, ref options, ref procedure) => {
                (64, request_id, options, procedure).serialize(serializer)
            }
            Message::Registered(request_id, registration_id) => {
                (65, request_id, registration_id).serialize(serializer)
            }
            Message::Unregister(request_id, registration_id) => {
                (66, request_id, registration_id).serialize(serializer)
            }
            Message::Unregistered(request_id) => (67, request_id).serialize(serializer),
            Message::Call(id, ref options, ref topic, ref args, ref kwargs) => {
                serialize_with_args!(args, kwargs, serializer, 48, id, options, topic)
            }
            Message::Cancel(id, ref options) => (49, id, options).serialize(serializer),
            Message::Invocation(id, registration_id, ref details, ref args, ref kwargs) => {
                serialize_with_args!(args, kwargs, serializer, 68, id, registration_id, details)
            }
            Message::Interrupt(id, ref options) => (69, id, options).serialize(serializer),
            Message::Yield(id, ref options, ref args, ref kwargs) => {
                serialize_with_args!(args, kwargs, serializer, 70, id, options)
            }
            Message::Result(id, ref details, ref args, ref kwargs) => {
                serialize_with_args!(args, kwargs, serializer, 50, id, details)
            }
        }
    }
}

impl<'de> serde::Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Message, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(MessageVisitor)
    }
}

struct MessageVisitor;

impl MessageVisitor {
    fn visit_hello<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let uri = try_or!(visitor.next_element(), "hello message ended before realm uri");
        let details = try_or!(
            visitor.next_element(),
            "hello message ended before details dict"
        );
        Ok(Message::Hello(uri, details))
    }

    fn visit_welcome<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let session = try_or!(
            visitor.next_element(),
            "welcome message ended before session id"
        );
        let details = try_or!(
            visitor.next_element(),
            "welcome message ended before details dict"
        );
        Ok(Message::Welcome(session, details))
    }

    fn visit_abort<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let details = try_or!(
            visitor.next_element(),
            "abort message ended before details dict"
        );
        let reason = try_or!(
            visitor.next_element(),
            "abort message ended before reason uri"
        );
        Ok(Message::Abort(details, reason))
    }

    fn visit_challenge<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let method = try_or!(
            visitor.next_element(),
            "challenge message ended before auth method"
        );
        let extra = try_or!(
            visitor.next_element(),
            "challenge message ended before extra dict"
        );
        Ok(Message::Challenge(method, extra))
    }

    fn visit_authenticate<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let signature = try_or!(
            visitor.next_element(),
            "authenticate message ended before signature"
        );
        let extra = try_or!(
            visitor.next_element(),
            "authenticate message ended before extra dict"
        );
        Ok(Message::Authenticate(signature, extra))
    }

    fn visit_goodbye<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let details = try_or!(
            visitor.next_element(),
            "goodbye message ended before details dict"
        );
        let reason = try_or!(
            visitor.next_element(),
            "goodbye message ended before reason uri"
        );
        Ok(Message::Goodbye(details, reason))
    }

    fn visit_error<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let message_type = try_or!(
            visitor.next_element(),
            "error message ended before message type"
        );
        let id = try_or!(
            visitor.next_element(),
            "error message ended before session id"
        );
        let details = try_or!(
            visitor.next_element(),
            "error message ended before details dict"
        );
        let reason = try_or!(
            visitor.next_element(),
            "error message ended before reason uri"
        );
        let args = visitor.next_element()?;
        let kwargs = visitor.next_element()?;
        Ok(Message::Error(
            message_type,
            id,
            details,
            reason,
            args,
            kwargs,
        ))
    }

    fn visit_subscribe<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let request = try_or!(
            visitor.next_element(),
            "subscribe message ended before request id"
        );
        let options = try_or!(
            visitor.next_element(),
            "subscribe message ended before options dict"
        );
        let topic = try_or!(
            visitor.next_element(),
            "subscribe message ended before topic uri"
        );
        Ok(Message::Subscribe(request, options, topic))
    }

    fn visit_subscribed<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let request = try_or!(
            visitor.next_element(),
            "subscribed message ended before request id"
        );
        let subscription = try_or!(
            visitor.next_element(),
            "subscribed message ended before subscription id"
        );
        Ok(Message::Subscribed(request, subscription))
    }

    fn visit_unsubscribe<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let request = try_or!(
            visitor.next_element(),
            "unsubscribe message ended before request id"
        );
        let subscription = try_or!(
            visitor.next_element(),
            "unsubscribe message ended before subscription id"
        );
        Ok(Message::Unsubscribe(request, subscription))
    }

    fn visit_unsubscribed<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let request = try_or!(
            visitor.next_element(),
            "unsubscribed message ended before request id"
        );
        Ok(Message::Unsubscribed(request))
    }

    fn visit_publish<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let id = try_or!(
            visitor.next_element(),
            "publish message ended before session id"
        );
        let details = try_or!(
            visitor.next_element(),
            "publish message ended before details dict"
        );
        let topic = try_or!(
            visitor.next_element(),
            "publish message ended before topic uri"
        );
        let args = visitor.next_element()?;
        let kwargs = visitor.next_element()?;
        Ok(Message::Publish(id, details, topic, args, kwargs))
    }

    fn visit_published<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let request = try_or!(
            visitor.next_element(),
            "published message ended before request id"
        );
        let publication = try_or!(
            visitor.next_element(),
            "published message ended before publication id"
        );
        Ok(Message::Published(request, publication))
    }

    fn visit_event<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let subscription_id = try_or!(
            visitor.next_element(),
            "event message ended before subscription id"
        );
        let publication_id = try_or!(
            visitor.next_element(),
            "event message ended before publication id"
        );
        let details = try_or!(
            visitor.next_element(),
            "event message ended before details dict"
        );
        let args = visitor.next_element()?;
        let kwargs = visitor.next_element()?;
        Ok(Message::Event(
            subscription_id,
            publication_id,
            details,
            args,
            kwargs,
        ))
    }

    fn visit_register<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let request = try_or!(
            visitor.next_element(),
            "register message ended before request id"
        );
        let options = try_or!(
            visitor.next_element(),
            "register message ended before request options"
        );
        let procedure = try_or!(
            visitor.next_element(),
            "register message ended before procedure"
        );
        Ok(Message::Register(request, options, procedure))
    }

    fn visit_registered<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let request = try_or!(
            visitor.next_element(),
            "registered message ended before request id"
        );
        let registration_id = try_or!(
            visitor.next_element(),
            "registered message ended before registration id"
        );
        Ok(Message::Registered(request, registration_id))
    }

    fn visit_unregister<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let request = try_or!(
            visitor.next_element(),
            "unregister message ended before request id"
        );
        let registration_id = try_or!(
            visitor.next_element(),
            "unregister message ended before registration id"
        );
        Ok(Message::Unregister(request, registration_id))
    }

    fn visit_unregistered<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let request = try_or!(
            visitor.next_element(),
            "unregistered message ended before request id"
        );
        Ok(Message::Unregistered(request))
    }

    fn visit_call<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let id = try_or!(
            visitor.next_element(),
            "call message ended before session id"
        );
        let options = try_or!(
            visitor.next_element(),
            "call message ended before options dict"
        );
        let topic = try_or!(
            visitor.next_element(),
            "call message ended before procedure uri"
        );
        let args = visitor.next_element()?;
        let kwargs = visitor.next_element()?;
        Ok(Message::Call(id, options, topic, args, kwargs))
    }

    fn visit_cancel<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let id = try_or!(
            visitor.next_element(),
            "cancel message ended before request id"
        );
        let options = try_or!(
            visitor.next_element(),
            "cancel message ended before options dict"
        );
        Ok(Message::Cancel(id, options))
    }

    fn visit_invocation<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let id = try_or!(
            visitor.next_element(),
            "invocation message ended before session id"
        );
        let registration_id = try_or!(
            visitor.next_element(),
            "invocation message ended before registration id"
        );
        let details = try_or!(
            visitor.next_element(),
            "invocation message ended before details dict"
        );
        let args = visitor.next_element()?;
        let kwargs = visitor.next_element()?;
        Ok(Message::Invocation(
            id,
            registration_id,
            details,
            args,
            kwargs,
        ))
    }

    fn visit_interrupt<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let id = try_or!(
            visitor.next_element(),
            "interrupt message ended before request id"
        );
        let options = try_or!(
            visitor.next_element(),
            "interrupt message ended before options dict"
        );
        Ok(Message::Interrupt(id, options))
    }

    fn visit_yield<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let id = try_or!(
            visitor.next_element(),
            "yield message ended before session id"
        );
        let options = try_or!(
            visitor.next_element(),
            "yield message ended before options dict"
        );
        let args = visitor.next_element()?;
        let kwargs = visitor.next_element()?;
        Ok(Message::Yield(id, options, args, kwargs))
    }

    fn visit_result<'de, V>(&self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let id = try_or!(
            visitor.next_element(),
            "result message ended before session id"
        );
        let details = try_or!(
            visitor.next_element(),
            "result message ended before details dict"
        );
        let args = visitor.next_element()?;
        let kwargs = visitor.next_element()?;
        Ok(Message::Result(id, details, args, kwargs))
    }
}

impl<'de> serde::de::Visitor<'de> for MessageVisitor {
    type Value = Message;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a WAMP message")
    }

    fn visit_seq<V>(self, mut visitor: V) -> Result<Message, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let message_type: u64 = try_or!(visitor.next_element(), "no message type found");
        match message_type {
            1 => self.visit_hello(visitor),
            2 => self.visit_welcome(visitor),
            3 => self.visit_abort(visitor),
            4 => self.visit_challenge(visitor),
            5 => self.visit_authenticate(visitor),
            6 => self.visit_goodbye(visitor),
            8 => self.visit_error(visitor),
            32 => self.visit_subscribe(visitor),
            33 => self.visit_subscribed(visitor),
            34 => self.visit_unsubscribe(visitor),
            35 => self.visit_unsubscribed(visitor),
            16 => self.visit_publish(visitor),
            17 => self.visit_published(visitor),
            36 => self.visit_event(visitor),
            64 => self.visit_register(visitor),
            65 => self.visit_registered(visitor),
            66 => self.visit_unregister(visitor),
            67 => self.visit_unregistered(visitor),
            48 => self.visit_call(visitor),
            49 => self.visit_cancel(visitor),
            68 => self.visit_invocation(visitor),
            69 => self.visit_interrupt(visitor),
            70 => self.visit_yield(visitor),
            50 => self.visit_result(visitor),
            x => Err(serde::de::Error::custom(format!(
                "unknown message type: {}",
                x
            ))),
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use rmp_serde::Deserializer as RMPDeserializer;
    use rmp_serde::Serializer;
    use serde::{Deserialize, Serialize};
    use serde_json;

    use crate::utils::StructMapWriter;
    use crate::value::{URI, Value};

    use super::types::{
        CallOptions, CancelOptions, ClientRoles, ErrorDetails, ErrorType, EventDetails,
        HelloDetails, InterruptOptions, InvocationDetails, PublishOptions, Reason,
        RegisterOptions, ResultDetails, RouterRoles, SubscribeOptions, WelcomeDetails,
        YieldOptions, CallCancelMode,
    };
    use super::Message;

    macro_rules! two_way_test {
        ($message:expr, $s:expr) => {{
            let message = $message;
            assert_eq!(serde_json::to_string(&message).unwrap(), $s);
            assert_eq!(serde_json::from_str::<Message>($s).unwrap(), message);
            let mut buf: Vec<u8> = Vec::new();
            message
                .serialize(&mut Serializer::with(&mut buf, StructMapWriter))
                .unwrap();
            let mut de = RMPDeserializer::new(&buf[..]);
            let new_message: Message = Deserialize::deserialize(&mut de).unwrap();
            assert_eq!(new_message, message);
        }};
    }

    #[test]
    fn serialize_hello() {
        two_way_test!(
            Message::Hello(URI::new("ca.dal.wamp.test"), HelloDetails::new(ClientRoles::new_basic())),
            "[1,\"ca.dal.wamp.test\",{\"roles\":{\"publisher\":{\"features\":{}},\"subscriber\":{\"features\":{}},\"caller\":{\"features\":{}},\"callee\":{\"features\":{}}}}]"
        );
    }

    #[test]
    fn serialize_welcome() {
        two_way_test!(
            Message::Welcome(493782, WelcomeDetails::new(RouterRoles::new_basic())),
            "[2,493782,{\"roles\":{\"dealer\":{},\"broker\":{}}}]"
        );
    }

    #[test]
    fn serialize_abort() {
        two_way_test!(
            Message::Abort(ErrorDetails::new(), Reason::NoSuchRealm),
            "[3,{},\"wamp.error.no_such_realm\"]"
        );
    }

    #[test]
    fn serialize_challenge_and_authenticate() {
        two_way_test!(
            Message::Challenge("wampcra".to_string(), HashMap::new()),
            "[4,\"wampcra\",{}]"
        );
        two_way_test!(
            Message::Authenticate("signature".to_string(), HashMap::new()),
            "[5,\"signature\",{}]"
        );
    }

    #[test]
    fn serialize_goodbye() {
        two_way_test!(
            Message::Goodbye(ErrorDetails::new(), Reason::GoodbyeAndOut),
            "[6,{},\"wamp.error.goodbye_and_out\"]"
        );
    }

    #[test]
    fn serialize_error() {
        two_way_test!(
            Message::Error(
                ErrorType::Subscribe,
                713845233,
                HashMap::new(),
                Reason::NotAuthorized,
                None,
                None
            ),
            "[8,32,713845233,{},\"wamp.error.not_authorized\"]"
        );
    }

    #[test]
    fn serialize_subscribe() {
        two_way_test!(
            Message::Subscribe(
                58944,
                SubscribeOptions::new(),
                URI::new("ca.dal.test.the_sub")
            ),
            "[32,58944,{},\"ca.dal.test.the_sub\"]"
        )
    }

    #[test]
    fn serialize_publish_with_args() {
        two_way_test!(
            Message::Publish(
                23934583,
                PublishOptions::new(true),
                URI::new("ca.dal.test.topic2"),
                Some(vec![Value::String("a value".to_string())]),
                None
            ),
            "[16,23934583,{\"acknowledge\":true},\"ca.dal.test.topic2\",[\"a value\"]]"
        );
    }

    #[test]
    fn serialize_call_and_cancel() {
        two_way_test!(
            Message::Call(
                7814135,
                CallOptions::new(),
                URI::new("com.myapp.ping"),
                None,
                None
            ),
            "[48,7814135,{},\"com.myapp.ping\"]"
        );
        two_way_test!(
            Message::Cancel(7814135, CancelOptions::new(CallCancelMode::Kill)),
            "[49,7814135,{\"mode\":\"kill\"}]"
        );
    }

    #[test]
    fn serialize_invocation_and_interrupt() {
        two_way_test!(
            Message::Invocation(
                764346,
                9823526,
                InvocationDetails::new(),
                Some(vec![Value::String("a value".to_string())]),
                None
            ),
            "[68,764346,9823526,{},[\"a value\"]]"
        );
        two_way_test!(
            Message::Interrupt(764346, InterruptOptions::default()),
            "[69,764346,{\"mode\":\"kill\"}]"
        );
    }

    #[test]
    fn serialize_yield_with_progress() {
        let mut options = YieldOptions::new();
        options.progress = true;
        two_way_test!(
            Message::Yield(6131533, options, None, None),
            "[70,6131533,{\"progress\":true}]"
        );
    }

    #[test]
    fn serialize_result() {
        two_way_test!(
            Message::Result(7814135, ResultDetails::new(), None, None),
            "[50,7814135,{}]"
        );
    }

    #[test]
    fn request_id_extracts_correlation_id() {
        let m = Message::Call(42, CallOptions::new(), URI::new("a.b"), None, None);
        assert_eq!(m.request_id(), Some(42));
        let m = Message::Hello(URI::new("realm"), HelloDetails::default());
        assert_eq!(m.request_id(), None);
    }
}
