//! Envelopes and bodies.
//!
//! The runtime only needs three things from a body: its `type`, its
//! `msg_id` and its `in_reply_to`. Everything else is kept as a JSON map
//! and interpreted by whichever handler owns the message kind.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{WireError, WireResult};
use crate::ids::{MsgId, NodeId};

/// A routed message: who sent it, who it is for, and what it says.
///
/// Envelopes are immutable once built. They are created, encoded onto a
/// single line, and dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The sender.
    pub src: NodeId,

    /// The intended recipient.
    pub dest: NodeId,

    /// The message body.
    pub body: Body,
}

impl Envelope {
    pub fn new(src: impl Into<NodeId>, dest: impl Into<NodeId>, body: Body) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
            body,
        }
    }

    /// Returns the body's `type`.
    pub fn kind(&self) -> &str {
        &self.body.kind
    }
}

/// A message body discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Message kind, e.g. `"broadcast"` or `"read_ok"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Sender-unique id. Bodies without one cannot be replied to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<MsgId>,

    /// The `msg_id` of the request this body answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<MsgId>,

    /// Kind-specific fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Body {
    /// Creates a body with no payload fields.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            msg_id: None,
            in_reply_to: None,
            fields: Map::new(),
        }
    }

    /// Builds a body from a payload tagged with `#[serde(tag = "type")]`.
    ///
    /// ```
    /// use gossamer_wire::Body;
    /// use serde::Serialize;
    ///
    /// #[derive(Serialize)]
    /// #[serde(tag = "type", rename_all = "snake_case")]
    /// enum Payload {
    ///     Broadcast { message: i64 },
    /// }
    ///
    /// let body = Body::from_payload(&Payload::Broadcast { message: 7 }).unwrap();
    /// assert_eq!(body.kind, "broadcast");
    /// assert_eq!(body.fields["message"], 7);
    /// ```
    pub fn from_payload<P: Serialize>(payload: &P) -> WireResult<Self> {
        let Value::Object(mut fields) = serde_json::to_value(payload).map_err(WireError::Encode)?
        else {
            return Err(WireError::NotAnObject);
        };

        let kind = match fields.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => return Err(WireError::MissingType),
        };

        Ok(Self {
            kind,
            msg_id: None,
            in_reply_to: None,
            fields,
        })
    }

    /// Interprets this body as the typed payload `P`.
    ///
    /// The `type` field is fed back in so tagged enums resolve their variant.
    pub fn decode<P: DeserializeOwned>(&self) -> WireResult<P> {
        let mut object = self.fields.clone();
        object.insert("type".to_string(), Value::String(self.kind.clone()));

        serde_json::from_value(Value::Object(object)).map_err(|source| WireError::Payload {
            kind: self.kind.clone(),
            source,
        })
    }

    pub fn with_msg_id(mut self, msg_id: MsgId) -> Self {
        self.msg_id = Some(msg_id);
        self
    }

    pub fn with_in_reply_to(mut self, in_reply_to: MsgId) -> Self {
        self.in_reply_to = Some(in_reply_to);
        self
    }

    /// Adds or replaces a single payload field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}
