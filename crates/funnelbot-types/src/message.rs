//! Transport-facing message types.

use serde::{Deserialize, Serialize};

use std::fmt;

/// Suffix the chat transport uses for group chat identifiers.
pub const GROUP_SUFFIX: &str = "@g.us";
/// Identifier of the status broadcast pseudo-chat.
pub const STATUS_BROADCAST: &str = "status@broadcast";

/// Inbound message event delivered by the chat transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub user_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub has_media: bool,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: i64,
    /// Echo of a message this account sent itself.
    #[serde(default)]
    pub from_me: bool,
    /// Display name reported by the transport, if any.
    #[serde(default)]
    pub sender_name: Option<String>,
}

impl InboundMessage {
    pub fn text(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
            has_media: false,
            timestamp: 0,
            from_me: false,
            sender_name: None,
        }
    }

    pub fn media(user_id: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            has_media: true,
            ..Self::text(user_id, caption)
        }
    }

    pub fn is_group(&self) -> bool {
        self.user_id.ends_with(GROUP_SUFFIX)
    }

    pub fn is_broadcast(&self) -> bool {
        self.user_id == STATUS_BROADCAST
    }

    /// Whether the dispatcher should see this message at all.
    pub fn is_dispatchable(&self) -> bool {
        !self.user_id.trim().is_empty() && !self.from_me && !self.is_group() && !self.is_broadcast()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundKind {
    /// Primary reply to the inbound message.
    Reply,
    /// Second part of a multi-part reply, sent after a short delay.
    FollowUp,
    /// Scheduled message cancelled by the user's next inbound message.
    Deferred,
    /// Summary addressed to the human attendant.
    Handoff,
}

impl fmt::Display for OutboundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutboundKind::Reply => write!(f, "reply"),
            OutboundKind::FollowUp => write!(f, "follow_up"),
            OutboundKind::Deferred => write!(f, "deferred"),
            OutboundKind::Handoff => write!(f, "handoff"),
        }
    }
}

/// Message the core asks the transport to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub user_id: String,
    pub text: String,
    pub kind: OutboundKind,
    /// Delay before sending, relative to the previous message of the turn.
    pub delay_ms: u64,
    /// Automated turn in which the message was composed.
    pub turn: u32,
}

impl OutboundMessage {
    pub fn reply(user_id: impl Into<String>, text: impl Into<String>, turn: u32) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
            kind: OutboundKind::Reply,
            delay_ms: 0,
            turn,
        }
    }

    pub fn follow_up(user_id: impl Into<String>, text: impl Into<String>, delay_ms: u64, turn: u32) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
            kind: OutboundKind::FollowUp,
            delay_ms,
            turn,
        }
    }

    pub fn deferred(user_id: impl Into<String>, text: impl Into<String>, delay_ms: u64, turn: u32) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
            kind: OutboundKind::Deferred,
            delay_ms,
            turn,
        }
    }

    pub fn handoff(attendant_id: impl Into<String>, text: impl Into<String>, turn: u32) -> Self {
        Self {
            user_id: attendant_id.into(),
            text: text.into(),
            kind: OutboundKind::Handoff,
            delay_ms: 0,
            turn,
        }
    }
}

/// Connection lifecycle and message events from the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Ready,
    Disconnected { reason: String },
    Message(InboundMessage),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_groups_broadcasts_and_echoes() {
        assert!(InboundMessage::text("5511999990000@c.us", "oi").is_dispatchable());
        assert!(!InboundMessage::text("120363000000@g.us", "oi").is_dispatchable());
        assert!(!InboundMessage::text(STATUS_BROADCAST, "oi").is_dispatchable());
        assert!(!InboundMessage::text("  ", "oi").is_dispatchable());

        let mut echo = InboundMessage::text("5511999990000@c.us", "oi");
        echo.from_me = true;
        assert!(!echo.is_dispatchable());
    }

    #[test]
    fn inbound_deserializes_camel_case_with_defaults() {
        let json = r#"{"userId":"5511@c.us","text":"oi","hasMedia":true,"timestamp":1700000000000}"#;
        let msg: InboundMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.user_id, "5511@c.us");
        assert!(msg.has_media);
        assert!(!msg.from_me);
        assert!(msg.sender_name.is_none());
    }
}
