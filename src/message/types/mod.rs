use std::fmt;

mod error;
pub use self::error::*;

mod options;
pub use self::options::*;

mod roles;
pub use self::roles::*;

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_not(b: &bool) -> bool {
    !*b
}

//  Structs

/// The policies that can be used for matching a uri pattern.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum MatchingPolicy {
    /// The given pattern matches any URI that has it as a prefix
    Prefix,
    /// The given pattern contains at least one 'wildcard' segment which can match any segment at the same location
    Wildcard,
    /// The given pattern only matches URIs that are identical.
    Strict,
}

/// The policies that dictate how invocations are distributed amongst shared registrations
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum InvocationPolicy {
    // Only one registration per uri (the default)
    Single,
    // Callee selected sequentially from the list of registrants
    RoundRobin,
    // Callee selected randomly from the list of registrants
    Random,
    // First callee (in order of registration) is called
    First,
    // Last callee (in order of registration) is called
    Last,
}

/// Call cancellation modes, see `SPEC_FULL.md` §4.3.3.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum CallCancelMode {
    /// Router relays INTERRUPT to the callee; caller waits for the final reply.
    Kill,
    /// Router relays INTERRUPT; caller completes immediately with an error.
    KillNoWait,
    /// Router returns an error without contacting the callee.
    Skip,
}

/// Disclosure composition policy, see `SPEC_FULL.md` §4.3.4.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Disclosure {
    Preset,
    Producer,
    Consumer,
    Either,
    Both,
    Reveal,
    Conceal,
}

impl Disclosure {
    /// Computes the effective disclosure bit given a producer-requested bit,
    /// a consumer-requested bit, and (for `Preset`) the realm's outer preset.
    /// Grounded on cppwamp's `DisclosureMode::compute`.
    pub fn compute(self, producer_disclosure: bool, consumer_disclosure: bool) -> bool {
        match self {
            Disclosure::Preset => producer_disclosure,
            Disclosure::Producer => producer_disclosure,
            Disclosure::Consumer => consumer_disclosure,
            Disclosure::Either => producer_disclosure || consumer_disclosure,
            Disclosure::Both => producer_disclosure && consumer_disclosure,
            Disclosure::Reveal => true,
            Disclosure::Conceal => false,
        }
    }

    /// Overload used when this policy is itself the realm's outer preset for
    /// a nested `Disclosure::Preset` request.
    pub fn compute_with_preset(
        self,
        producer_disclosure: bool,
        consumer_disclosure: bool,
        preset: Disclosure,
    ) -> bool {
        match self {
            Disclosure::Preset => preset.compute(producer_disclosure, consumer_disclosure),
            other => other.compute(producer_disclosure, consumer_disclosure),
        }
    }
}

// Visitors

struct MatchingPolicyVisitor;
struct InvocationPolicyVisitor;
struct CallCancelModeVisitor;

impl MatchingPolicy {
    #[allow(clippy::trivially_copy_pass_by_ref)]
    #[inline]
    fn is_strict(&self) -> bool {
        *self == MatchingPolicy::Strict
    }
}

impl InvocationPolicy {
    #[allow(clippy::trivially_copy_pass_by_ref)]
    #[inline]
    fn is_single(&self) -> bool {
        *self == InvocationPolicy::Single
    }
}

impl Default for MatchingPolicy {
    #[inline]
    fn default() -> MatchingPolicy {
        MatchingPolicy::Strict
    }
}

impl Default for InvocationPolicy {
    #[inline]
    fn default() -> InvocationPolicy {
        InvocationPolicy::Single
    }
}

impl Default for CallCancelMode {
    #[inline]
    fn default() -> CallCancelMode {
        CallCancelMode::Kill
    }
}

// MatchingPolicy

impl serde::Serialize for MatchingPolicy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let ser_str = match *self {
            MatchingPolicy::Prefix => "prefix",
            MatchingPolicy::Wildcard => "wildcard",
            MatchingPolicy::Strict => "",
        };
        serializer.serialize_str(ser_str)
    }
}

impl<'de> serde::Deserialize<'de> for MatchingPolicy {
    fn deserialize<D>(deserializer: D) -> Result<MatchingPolicy, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(MatchingPolicyVisitor)
    }
}

impl<'de> serde::de::Visitor<'de> for MatchingPolicyVisitor {
    type Value = MatchingPolicy;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("matching policy for registration")
    }

    #[inline]
    fn visit_str<E>(self, value: &str) -> Result<MatchingPolicy, E>
    where
        E: serde::de::Error,
    {
        match value {
            "prefix" => Ok(MatchingPolicy::Prefix),
            "wildcard" => Ok(MatchingPolicy::Wildcard),
            "" => Ok(MatchingPolicy::Strict),
            x => Err(serde::de::Error::custom(format!(
                "invalid matching policy: {}",
                x
            ))),
        }
    }
}

impl serde::Serialize for InvocationPolicy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let ser_str = match *self {
            InvocationPolicy::Single => "single",
            InvocationPolicy::RoundRobin => "roundrobin",
            InvocationPolicy::Random => "random",
            InvocationPolicy::First => "first",
            InvocationPolicy::Last => "last",
        };
        serializer.serialize_str(ser_str)
    }
}

impl<'de> serde::Deserialize<'de> for InvocationPolicy {
    fn deserialize<D>(deserializer: D) -> Result<InvocationPolicy, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(InvocationPolicyVisitor)
    }
}

impl<'de> serde::de::Visitor<'de> for InvocationPolicyVisitor {
    type Value = InvocationPolicy;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("invocation policy for a procedure")
    }

    #[inline]
    fn visit_str<E>(self, value: &str) -> Result<InvocationPolicy, E>
    where
        E: serde::de::Error,
    {
        match value {
            "single" => Ok(InvocationPolicy::Single),
            "roundrobin" => Ok(InvocationPolicy::RoundRobin),
            "random" => Ok(InvocationPolicy::Random),
            "first" => Ok(InvocationPolicy::First),
            "last" => Ok(InvocationPolicy::Last),
            x => Err(serde::de::Error::custom(format!(
                "invalid invocation policy: {}",
                x
            ))),
        }
    }
}

impl serde::Serialize for CallCancelMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let ser_str = match *self {
            CallCancelMode::Kill => "kill",
            CallCancelMode::KillNoWait => "killnowait",
            CallCancelMode::Skip => "skip",
        };
        serializer.serialize_str(ser_str)
    }
}

impl<'de> serde::Deserialize<'de> for CallCancelMode {
    fn deserialize<D>(deserializer: D) -> Result<CallCancelMode, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(CallCancelModeVisitor)
    }
}

impl<'de> serde::de::Visitor<'de> for CallCancelModeVisitor {
    type Value = CallCancelMode;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("call cancellation mode")
    }

    #[inline]
    fn visit_str<E>(self, value: &str) -> Result<CallCancelMode, E>
    where
        E: serde::de::Error,
    {
        match value {
            "kill" => Ok(CallCancelMode::Kill),
            "killnowait" => Ok(CallCancelMode::KillNoWait),
            "skip" => Ok(CallCancelMode::Skip),
            x => Err(serde::de::Error::custom(format!(
                "invalid cancel mode: {}",
                x
            ))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn disclosure_either_is_or() {
        assert!(Disclosure::Either.compute(true, false));
        assert!(Disclosure::Either.compute(false, true));
        assert!(!Disclosure::Either.compute(false, false));
    }

    #[test]
    fn disclosure_both_is_and() {
        assert!(Disclosure::Both.compute(true, true));
        assert!(!Disclosure::Both.compute(true, false));
    }

    #[test]
    fn disclosure_reveal_conceal_are_constant() {
        assert!(Disclosure::Reveal.compute(false, false));
        assert!(!Disclosure::Conceal.compute(true, true));
    }

    #[test]
    fn disclosure_preset_defers_to_outer_preset() {
        assert!(Disclosure::Preset.compute_with_preset(false, false, Disclosure::Reveal));
        assert!(!Disclosure::Preset.compute_with_preset(false, false, Disclosure::Conceal));
    }
}
