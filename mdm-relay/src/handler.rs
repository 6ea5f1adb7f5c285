//! Applying classified events to device state
//!
//! Each event drives one transition for one device:
//!
//! | Event          | Registry                  | Side effect                          |
//! |----------------|---------------------------|--------------------------------------|
//! | Authenticate   | upsert `enrolled = true`  | log new enrollment / re-enrollment   |
//! | TokenUpdate    | upsert `enrolled = true`  | dispatch `InstalledApplicationList`  |
//! | Connect        | none                      | log app list responses               |
//! | CheckOut       | upsert `enrolled = false` | none                                 |
//! | Unrecognized   | none                      | none                                 |
//!
//! Malformed events are rejected before any of this happens, so they never
//! leave a partial change behind.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use command_client::Command;
use device_registry::DeviceRegistry;
use serde_json::Value;

use crate::dispatch::CommandSink;
use crate::error::EventError;
use crate::event::{classify, Acknowledgement, Event, TOPIC_CONNECT};

/// Request type queued for every device that sends a token update
pub const INSTALLED_APPLICATION_LIST: &str = "InstalledApplicationList";

/// What handling an event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Device (re-)installed the MDM payload
    Authenticated { udid: String, re_enrollment: bool },
    /// Device confirmed its push channel; an app list request was dispatched
    TokenUpdated { udid: String },
    /// Device answered a command; `response` holds the decoded payload when
    /// it is an installed application list
    Connected {
        udid: Option<String>,
        response: Option<String>,
    },
    /// MDM profile was removed
    CheckedOut { udid: String },
    /// Topic is not one we act on
    Ignored { topic: Option<String> },
}

/// Applies webhook events to a [`DeviceRegistry`] and dispatches follow-up
/// commands through a [`CommandSink`].
pub struct EventHandler {
    registry: DeviceRegistry,
    commands: Arc<dyn CommandSink>,
}

impl EventHandler {
    pub fn new(registry: DeviceRegistry, commands: Arc<dyn CommandSink>) -> Self {
        Self { registry, commands }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Handle a raw webhook body, logging and dropping malformed events
    ///
    /// This is the entry point used by the event worker; it never fails.
    pub fn process(&self, payload: &Value) -> Option<Outcome> {
        match self.handle(payload) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::warn!("Dropping webhook event: {}", e);
                None
            }
        }
    }

    /// Classify a raw webhook body and apply it
    pub fn handle(&self, payload: &Value) -> Result<Outcome, EventError> {
        let event = classify(payload)?;
        self.apply(event)
    }

    /// Apply an already classified event
    pub fn apply(&self, event: Event) -> Result<Outcome, EventError> {
        let outcome = match event {
            Event::Authenticate { udid } => self.authenticate(udid),
            Event::TokenUpdate { udid } => self.token_update(udid),
            Event::Connect(ack) => self.connect(ack)?,
            Event::CheckOut { udid } => self.check_out(udid),
            Event::Unrecognized { topic } => {
                tracing::debug!(topic = ?topic, "Ignoring unrecognized webhook topic");
                Outcome::Ignored { topic }
            }
        };

        Ok(outcome)
    }

    fn authenticate(&self, udid: String) -> Outcome {
        let re_enrollment = !self.registry.upsert(&udid, true).is_insert();

        if re_enrollment {
            tracing::info!(udid = %udid, "re-enrolling device");
        } else {
            tracing::info!(udid = %udid, "enrolling new device");
        }

        Outcome::Authenticated {
            udid,
            re_enrollment,
        }
    }

    fn token_update(&self, udid: String) -> Outcome {
        self.registry.upsert(&udid, true);

        tracing::info!(
            udid = %udid,
            request_type = INSTALLED_APPLICATION_LIST,
            "Token updated, requesting installed applications"
        );
        self.commands
            .dispatch(Command::new(udid.clone(), INSTALLED_APPLICATION_LIST));

        Outcome::TokenUpdated { udid }
    }

    fn connect(&self, ack: Acknowledgement) -> Result<Outcome, EventError> {
        let decoded = STANDARD
            .decode(ack.raw_payload.as_bytes())
            .map_err(|e| {
                EventError::malformed(TOPIC_CONNECT, format!("`raw_payload` is not base64: {e}"))
            })?;
        let text = String::from_utf8_lossy(&decoded);

        let response = if text.contains(INSTALLED_APPLICATION_LIST) {
            tracing::info!(
                udid = ?ack.udid,
                status = ?ack.status,
                command_uuid = ?ack.command_uuid,
                "Installed application list response:\n{}",
                text
            );
            Some(text.into_owned())
        } else {
            tracing::debug!(
                udid = ?ack.udid,
                status = ?ack.status,
                command_uuid = ?ack.command_uuid,
                "Command response received"
            );
            None
        };

        Ok(Outcome::Connected {
            udid: ack.udid,
            response,
        })
    }

    fn check_out(&self, udid: String) -> Outcome {
        self.registry.upsert(&udid, false);
        tracing::info!(udid = %udid, "Device checked out");
        Outcome::CheckedOut { udid }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::RecordingSink;
    use device_registry::Device;
    use serde_json::json;

    fn handler() -> (EventHandler, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let handler = EventHandler::new(DeviceRegistry::new(), sink.clone());
        (handler, sink)
    }

    fn checkin(topic: &str, udid: &str) -> Value {
        json!({
            "topic": topic,
            "event_id": "d1c2b3a4-0000-0000-0000-000000000000",
            "checkin_event": { "udid": udid, "url_params": null }
        })
    }

    fn connect(raw_payload: &str) -> Value {
        json!({
            "topic": "mdm.Connect",
            "acknowledge_event": {
                "udid": "A1",
                "status": "Acknowledged",
                "command_uuid": "7b0e6a3c-1111-2222-3333-444455556666",
                "raw_payload": raw_payload
            }
        })
    }

    #[test]
    fn test_authenticate_new_then_re_enrollment() {
        let (handler, sink) = handler();

        let first = handler.handle(&checkin("mdm.Authenticate", "A1")).unwrap();
        assert_eq!(
            first,
            Outcome::Authenticated {
                udid: "A1".to_string(),
                re_enrollment: false
            }
        );
        assert_eq!(handler.registry().devices(), vec![Device::new("A1", true)]);

        let second = handler.handle(&checkin("mdm.Authenticate", "A1")).unwrap();
        assert_eq!(
            second,
            Outcome::Authenticated {
                udid: "A1".to_string(),
                re_enrollment: true
            }
        );
        assert_eq!(handler.registry().devices(), vec![Device::new("A1", true)]);
        assert!(sink.commands().is_empty());
    }

    #[test]
    fn test_token_update_dispatches_exactly_one_command() {
        let (handler, sink) = handler();

        let outcome = handler.handle(&checkin("mdm.TokenUpdate", "A1")).unwrap();

        assert_eq!(outcome, Outcome::TokenUpdated { udid: "A1".to_string() });
        assert_eq!(handler.registry().devices(), vec![Device::new("A1", true)]);
        assert_eq!(
            sink.commands(),
            vec![Command::new("A1", "InstalledApplicationList")]
        );
    }

    #[test]
    fn test_token_update_dispatches_regardless_of_prior_state() {
        let (handler, sink) = handler();

        handler.handle(&checkin("mdm.CheckOut", "A1")).unwrap();
        handler.handle(&checkin("mdm.TokenUpdate", "A1")).unwrap();
        handler.handle(&checkin("mdm.TokenUpdate", "A1")).unwrap();

        assert_eq!(sink.commands().len(), 2);
        assert!(sink.commands().iter().all(|c| c.udid == "A1"));
        assert_eq!(handler.registry().get("A1"), Some(Device::new("A1", true)));
    }

    #[test]
    fn test_connect_with_app_list_is_surfaced() {
        let (handler, sink) = handler();
        handler.handle(&checkin("mdm.Authenticate", "A1")).unwrap();
        let before = handler.registry().devices();

        let plist = "<plist><dict><key>InstalledApplicationList</key><array/></dict></plist>";
        let outcome = handler.handle(&connect(&STANDARD.encode(plist))).unwrap();

        assert_eq!(
            outcome,
            Outcome::Connected {
                udid: Some("A1".to_string()),
                response: Some(plist.to_string())
            }
        );
        assert_eq!(handler.registry().devices(), before);
        assert!(sink.commands().is_empty());
    }

    #[test]
    fn test_connect_without_app_list_surfaces_nothing() {
        let (handler, _sink) = handler();

        let plist = "<plist><dict><key>DeviceInformation</key></dict></plist>";
        let outcome = handler.handle(&connect(&STANDARD.encode(plist))).unwrap();

        assert_eq!(
            outcome,
            Outcome::Connected {
                udid: Some("A1".to_string()),
                response: None
            }
        );
        assert!(handler.registry().is_empty());
    }

    #[test]
    fn test_connect_with_invalid_base64_is_malformed() {
        let (handler, _sink) = handler();

        let result = handler.handle(&connect("!!! not base64 !!!"));
        assert!(matches!(
            result,
            Err(EventError::MalformedPayload { topic: "mdm.Connect", .. })
        ));
        assert!(handler.registry().is_empty());
    }

    #[test]
    fn test_check_out_known_and_unknown_devices() {
        let (handler, _sink) = handler();

        handler.handle(&checkin("mdm.Authenticate", "A1")).unwrap();
        let outcome = handler.handle(&checkin("mdm.CheckOut", "A1")).unwrap();
        assert_eq!(outcome, Outcome::CheckedOut { udid: "A1".to_string() });
        assert_eq!(handler.registry().get("A1"), Some(Device::new("A1", false)));

        // Never seen before: still recorded, not an error
        handler.handle(&checkin("mdm.CheckOut", "B2")).unwrap();
        assert_eq!(handler.registry().get("B2"), Some(Device::new("B2", false)));
    }

    #[test]
    fn test_unknown_topic_is_a_no_op() {
        let (handler, sink) = handler();

        let outcome = handler
            .handle(&json!({ "topic": "mdm.Unknown", "checkin_event": { "udid": "A1" } }))
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Ignored {
                topic: Some("mdm.Unknown".to_string())
            }
        );
        assert!(handler.registry().is_empty());
        assert!(sink.commands().is_empty());
    }

    #[test]
    fn test_malformed_event_leaves_no_trace() {
        let (handler, sink) = handler();

        let payload = json!({ "topic": "mdm.TokenUpdate", "checkin_event": {} });
        assert!(handler.handle(&payload).is_err());
        assert!(handler.process(&payload).is_none());

        assert!(handler.registry().is_empty());
        assert!(sink.commands().is_empty());
    }
}
