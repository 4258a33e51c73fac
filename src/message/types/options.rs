use serde::{Deserialize, Serialize};

use crate::value::URI;

use super::{is_not, CallCancelMode, ClientRoles, InvocationPolicy, MatchingPolicy, RouterRoles};

#[derive(Serialize, Deserialize, PartialEq, Debug, Default)]
pub struct HelloDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    agent: Option<String>,
    roles: ClientRoles,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Default)]
pub struct WelcomeDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    agent: Option<String>,
    roles: RouterRoles,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authrole: Option<String>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Default)]
pub struct ErrorDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Default)]
pub struct SubscribeOptions {
    #[serde(
        default,
        rename = "match",
        skip_serializing_if = "MatchingPolicy::is_strict"
    )]
    pub pattern_match: MatchingPolicy,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Default)]
pub struct PublishOptions {
    #[serde(default, skip_serializing_if = "is_not")]
    acknowledge: bool,

    #[serde(default, skip_serializing_if = "is_not", rename = "disclose_me")]
    pub disclose_me: bool,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Default)]
pub struct RegisterOptions {
    #[serde(
        default,
        rename = "match",
        skip_serializing_if = "MatchingPolicy::is_strict"
    )]
    pub pattern_match: MatchingPolicy,

    #[serde(
        default,
        rename = "invoke",
        skip_serializing_if = "InvocationPolicy::is_single"
    )]
    pub invocation_policy: InvocationPolicy,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Default)]
pub struct CallOptions {
    #[serde(default, skip_serializing_if = "is_not", rename = "disclose_me")]
    pub disclose_me: bool,

    #[serde(default, skip_serializing_if = "is_not", rename = "receive_progress")]
    pub receive_progress: bool,

    #[serde(default, skip_serializing_if = "Option::is_none", rename = "timeout")]
    pub timeout_ms: Option<u64>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Default)]
pub struct CancelOptions {
    #[serde(default, rename = "mode")]
    pub mode: CallCancelMode,
}

#[derive(PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct InterruptOptions {
    #[serde(default, rename = "mode")]
    pub mode: CallCancelMode,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Default)]
pub struct YieldOptions {
    #[serde(default, skip_serializing_if = "is_not")]
    pub progress: bool,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Default)]
pub struct EventDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    publisher: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    trustlevel: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<URI>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Default)]
pub struct InvocationDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure: Option<URI>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller: Option<u64>,

    #[serde(default, skip_serializing_if = "is_not", rename = "receive_progress")]
    pub receive_progress: bool,
}

#[derive(PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct ResultDetails {
    #[serde(default, skip_serializing_if = "is_not")]
    pub progress: bool,
}

impl HelloDetails {
    pub fn new(roles: ClientRoles) -> HelloDetails {
        HelloDetails { roles, agent: None }
    }

    pub fn new_with_agent(roles: ClientRoles, agent: &str) -> HelloDetails {
        HelloDetails {
            roles,
            agent: Some(agent.to_string()),
        }
    }
}

impl WelcomeDetails {
    pub fn new(roles: RouterRoles) -> WelcomeDetails {
        WelcomeDetails {
            roles,
            agent: None,
            authrole: None,
        }
    }

    pub fn new_with_agent(roles: RouterRoles, agent: &str) -> WelcomeDetails {
        WelcomeDetails {
            roles,
            agent: Some(agent.to_string()),
            authrole: None,
        }
    }
}

impl ErrorDetails {
    pub fn new() -> ErrorDetails {
        ErrorDetails { message: None }
    }

    pub fn new_with_message(message: &str) -> ErrorDetails {
        ErrorDetails {
            message: Some(message.to_string()),
        }
    }
}

impl SubscribeOptions {
    pub fn new() -> SubscribeOptions {
        SubscribeOptions {
            pattern_match: MatchingPolicy::Strict,
        }
    }
}

impl PublishOptions {
    pub fn new(acknowledge: bool) -> PublishOptions {
        PublishOptions {
            acknowledge,
            disclose_me: false,
        }
    }

    pub fn should_acknowledge(&self) -> bool {
        self.acknowledge
    }
}

impl RegisterOptions {
    pub fn new() -> RegisterOptions {
        RegisterOptions {
            pattern_match: MatchingPolicy::Strict,
            invocation_policy: InvocationPolicy::Single,
        }
    }
}

impl CallOptions {
    pub fn new() -> CallOptions {
        CallOptions::default()
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> CallOptions {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

impl CancelOptions {
    pub fn new(mode: CallCancelMode) -> CancelOptions {
        CancelOptions { mode }
    }
}

impl YieldOptions {
    pub fn new() -> YieldOptions {
        YieldOptions::default()
    }
}

impl EventDetails {
    pub fn new() -> EventDetails {
        EventDetails {
            publisher: None,
            trustlevel: None,
            topic: None,
        }
    }

    pub fn new_with_topic(topic: URI) -> EventDetails {
        EventDetails {
            publisher: None,
            trustlevel: None,
            topic: Some(topic),
        }
    }
}

impl InvocationDetails {
    pub fn new() -> InvocationDetails {
        InvocationDetails::default()
    }
}

impl ResultDetails {
    pub fn new() -> ResultDetails {
        ResultDetails::default()
    }
}
