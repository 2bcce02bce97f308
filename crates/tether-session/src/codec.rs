//! Wire messages.
//!
//! JSON text frames tagged by `"type"`. Component references inside values
//! travel as `{"comp_id": ID}`; components themselves never cross the wire.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::change::ChangeSet;
use crate::error::SessionResult;

/// Process-unique component identity.
pub type ComponentId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Make a compiled view definition available under its reference.
    #[serde(rename = "class")]
    RegisterType {
        #[serde(rename = "clss")]
        view_ref: String,
        name: String,
        #[serde(rename = "defn")]
        source: String,
    },

    /// Construct a mirror instance.
    #[serde(rename = "new")]
    Instantiate {
        comp_id: ComponentId,
        #[serde(rename = "clss")]
        view_ref: String,
    },

    /// Merge a change set into a mirror instance.
    #[serde(rename = "state_change")]
    Apply {
        comp_id: ComponentId,
        #[serde(rename = "state_change")]
        changes: ChangeSet,
    },

    #[serde(rename = "delete")]
    Destroy { comp_id: ComponentId },

    /// Mirror → backend: the mirror asks for a backend-side mutation.
    #[serde(rename = "user_event")]
    Request {
        comp_id: ComponentId,
        #[serde(rename = "user_event")]
        payload: Value,
    },
}

impl Message {
    /// The wire tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::RegisterType { .. } => "class",
            Message::Instantiate { .. } => "new",
            Message::Apply { .. } => "state_change",
            Message::Destroy { .. } => "delete",
            Message::Request { .. } => "user_event",
        }
    }

    pub fn encode(&self) -> SessionResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> SessionResult<Message> {
        Ok(serde_json::from_str(text)?)
    }
}

/// The opaque reference to a component used inside values.
pub fn component_ref(id: ComponentId) -> Value {
    json!({ "comp_id": id })
}

/// The id in a `{"comp_id": ID}` reference, if `value` is one.
pub fn decode_component_ref(value: &Value) -> Option<ComponentId> {
    match value.as_object() {
        Some(object) if object.len() == 1 => object.get("comp_id")?.as_u64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_type_wire_shape() {
        let message = Message::RegisterType {
            view_ref: "app::Label".into(),
            name: "Label".into(),
            source: "class Label {\n}".into(),
        };
        let text = message.encode().expect("encodes");
        assert_eq!(
            text,
            r#"{"type":"class","clss":"app::Label","name":"Label","defn":"class Label {\n}"}"#
        );
    }

    #[test]
    fn apply_keeps_change_order() {
        let mut changes = ChangeSet::new();
        changes.insert("z".into(), json!(1));
        changes.insert("a".into(), component_ref(7));
        let text = Message::Apply { comp_id: 3, changes }
            .encode()
            .expect("encodes");
        assert_eq!(
            text,
            r#"{"type":"state_change","comp_id":3,"state_change":{"z":1,"a":{"comp_id":7}}}"#
        );
    }

    #[test]
    fn decode_request() {
        let message =
            Message::decode(r#"{"type":"user_event","comp_id":5,"user_event":{"value":3}}"#)
                .expect("decodes");
        assert_eq!(
            message,
            Message::Request {
                comp_id: 5,
                payload: json!({"value": 3})
            }
        );
        assert_eq!(message.kind(), "user_event");
    }

    #[test]
    fn decode_rejects_unknown_tag() {
        assert!(Message::decode(r#"{"type":"explode","comp_id":1}"#).is_err());
        assert!(Message::decode("not json").is_err());
    }

    #[test]
    fn component_refs() {
        assert_eq!(decode_component_ref(&component_ref(9)), Some(9));
        assert_eq!(decode_component_ref(&json!({"comp_id": 9, "x": 1})), None);
        assert_eq!(decode_component_ref(&json!(9)), None);
    }
}
