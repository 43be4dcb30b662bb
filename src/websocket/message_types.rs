use serde::{Deserialize, Serialize};

/// Body of a relayed chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub sender: String,
    pub message: String,
}

/// Outbound WebSocket events from server to client
///
/// Inbound frames carry no envelope: the raw text is the message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsOutboundEvent {
    /// Sent once to a newly opened connection only.
    #[serde(rename = "welcome")]
    Welcome { message: String },

    /// Full roster replacement, rebuilt from the presence set at send time.
    #[serde(rename = "clients")]
    Clients { clients: Vec<String> },

    /// Chat message relayed through the bus to every connection.
    #[serde(rename = "message")]
    Message { data: ChatPayload },
}

impl WsOutboundEvent {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn welcome_wire_shape() {
        let event = WsOutboundEvent::Welcome {
            message: "Welcome to the chat, alice!".to_string(),
        };
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "welcome", "message": "Welcome to the chat, alice!"})
        );
    }

    #[test]
    fn clients_wire_shape() {
        let event = WsOutboundEvent::Clients {
            clients: vec!["alice".to_string(), "bob".to_string()],
        };
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"type": "clients", "clients": ["alice", "bob"]}));
    }

    #[test]
    fn message_wire_shape() {
        let event = WsOutboundEvent::Message {
            data: ChatPayload {
                sender: "alice".to_string(),
                message: "hello".to_string(),
            },
        };
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "message", "data": {"sender": "alice", "message": "hello"}})
        );
    }

    #[test]
    fn chat_envelope_round_trips_unchanged() {
        let raw = r#"{"type":"message","data":{"sender":"bob","message":""}}"#;
        let event = WsOutboundEvent::from_json(raw).unwrap();
        assert_eq!(
            event,
            WsOutboundEvent::Message {
                data: ChatPayload {
                    sender: "bob".to_string(),
                    message: String::new(),
                }
            }
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(WsOutboundEvent::from_json(r#"{"type":"presence","users":[]}"#).is_err());
        assert!(WsOutboundEvent::from_json("not json").is_err());
    }
}
