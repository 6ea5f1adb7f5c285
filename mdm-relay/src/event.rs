//! Classification of MicroMDM webhook events
//!
//! MicroMDM posts every event as a JSON object with a `topic` and a nested
//! object whose shape depends on the topic:
//!
//! ```text
//! { "topic": "mdm.Authenticate", "checkin_event":     { "udid": "...", ... } }
//! { "topic": "mdm.Connect",      "acknowledge_event": { "udid": "...", "raw_payload": "<base64>", ... } }
//! ```
//!
//! [`classify`] turns such a value into a typed [`Event`] without touching any
//! state.

use serde_json::Value;

use crate::error::EventError;

/// Device is installing the MDM payload
pub const TOPIC_AUTHENTICATE: &str = "mdm.Authenticate";
/// Device push token, push magic or unlock token changed
pub const TOPIC_TOKEN_UPDATE: &str = "mdm.TokenUpdate";
/// Device is answering a previously queued command
pub const TOPIC_CONNECT: &str = "mdm.Connect";
/// MDM profile was removed from the device
pub const TOPIC_CHECK_OUT: &str = "mdm.CheckOut";

const CHECKIN_EVENT: &str = "checkin_event";
const ACKNOWLEDGE_EVENT: &str = "acknowledge_event";

/// The semantic kind of a webhook event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Authenticate,
    TokenUpdate,
    Connect,
    CheckOut,
    Unrecognized,
}

impl EventKind {
    /// Map a topic string to its kind; unknown topics are `Unrecognized`
    pub fn from_topic(topic: &str) -> Self {
        match topic {
            TOPIC_AUTHENTICATE => EventKind::Authenticate,
            TOPIC_TOKEN_UPDATE => EventKind::TokenUpdate,
            TOPIC_CONNECT => EventKind::Connect,
            TOPIC_CHECK_OUT => EventKind::CheckOut,
            _ => EventKind::Unrecognized,
        }
    }

    /// The topic string for a recognized kind
    pub fn topic(&self) -> Option<&'static str> {
        match self {
            EventKind::Authenticate => Some(TOPIC_AUTHENTICATE),
            EventKind::TokenUpdate => Some(TOPIC_TOKEN_UPDATE),
            EventKind::Connect => Some(TOPIC_CONNECT),
            EventKind::CheckOut => Some(TOPIC_CHECK_OUT),
            EventKind::Unrecognized => None,
        }
    }
}

/// A device's answer to a command, carried by `mdm.Connect`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgement {
    /// Responding device, if the payload names it
    pub udid: Option<String>,
    /// Command status reported by the device (`Acknowledged`, `Error`, ...)
    pub status: Option<String>,
    /// UUID of the command being answered
    pub command_uuid: Option<String>,
    /// Base64-encoded plist response, still encoded
    pub raw_payload: String,
}

/// A classified webhook event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Authenticate { udid: String },
    TokenUpdate { udid: String },
    Connect(Acknowledgement),
    CheckOut { udid: String },
    Unrecognized { topic: Option<String> },
}

impl Event {
    /// The kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Authenticate { .. } => EventKind::Authenticate,
            Event::TokenUpdate { .. } => EventKind::TokenUpdate,
            Event::Connect(_) => EventKind::Connect,
            Event::CheckOut { .. } => EventKind::CheckOut,
            Event::Unrecognized { .. } => EventKind::Unrecognized,
        }
    }

    /// The device this event is about, when known
    pub fn udid(&self) -> Option<&str> {
        match self {
            Event::Authenticate { udid } | Event::TokenUpdate { udid } | Event::CheckOut { udid } => {
                Some(udid.as_str())
            }
            Event::Connect(ack) => ack.udid.as_deref(),
            Event::Unrecognized { .. } => None,
        }
    }
}

/// Classify a parsed webhook body
///
/// A missing or non-string `topic`, or any topic outside the four known ones,
/// yields `Event::Unrecognized`. A recognized topic whose required nested
/// field is absent, not a string, or empty yields
/// `EventError::MalformedPayload`.
pub fn classify(payload: &Value) -> Result<Event, EventError> {
    let topic = payload.get("topic").and_then(Value::as_str);

    let kind = match topic {
        Some(topic) => EventKind::from_topic(topic),
        None => EventKind::Unrecognized,
    };

    let event = match kind {
        EventKind::Authenticate => Event::Authenticate {
            udid: checkin_udid(payload, TOPIC_AUTHENTICATE)?,
        },
        EventKind::TokenUpdate => Event::TokenUpdate {
            udid: checkin_udid(payload, TOPIC_TOKEN_UPDATE)?,
        },
        EventKind::CheckOut => Event::CheckOut {
            udid: checkin_udid(payload, TOPIC_CHECK_OUT)?,
        },
        EventKind::Connect => Event::Connect(acknowledgement(payload)?),
        EventKind::Unrecognized => Event::Unrecognized {
            topic: topic.map(str::to_string),
        },
    };

    Ok(event)
}

fn checkin_udid(payload: &Value, topic: &'static str) -> Result<String, EventError> {
    let checkin = nested_object(payload, CHECKIN_EVENT, topic)?;
    required_str(checkin, "udid", topic)
}

fn acknowledgement(payload: &Value) -> Result<Acknowledgement, EventError> {
    let ack = nested_object(payload, ACKNOWLEDGE_EVENT, TOPIC_CONNECT)?;

    Ok(Acknowledgement {
        udid: optional_str(ack, "udid"),
        status: optional_str(ack, "status"),
        command_uuid: optional_str(ack, "command_uuid"),
        raw_payload: required_str(ack, "raw_payload", TOPIC_CONNECT)?,
    })
}

fn nested_object<'a>(
    payload: &'a Value,
    key: &str,
    topic: &'static str,
) -> Result<&'a Value, EventError> {
    match payload.get(key) {
        Some(value) if value.is_object() => Ok(value),
        Some(_) => Err(EventError::malformed(topic, format!("`{key}` is not an object"))),
        None => Err(EventError::malformed(topic, format!("missing `{key}`"))),
    }
}

fn required_str(object: &Value, key: &str, topic: &'static str) -> Result<String, EventError> {
    match object.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(EventError::malformed(topic, format!("`{key}` is empty"))),
        Some(_) => Err(EventError::malformed(topic, format!("`{key}` is not a string"))),
        None => Err(EventError::malformed(topic, format!("missing `{key}`"))),
    }
}

fn optional_str(object: &Value, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
