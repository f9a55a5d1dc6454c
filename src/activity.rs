//! Activities — the unit of exchange between a channel and a bot.
//!
//! The JSON shape follows the Bot Framework activity schema closely enough
//! that emulator-style payloads deserialize (`type`, `from`, `recipient`,
//! `conversation.id`, `membersAdded`, `valueType`, `value`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityKind {
    Message,
    ConversationUpdate,
    Event,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Message => "message",
            ActivityKind::ConversationUpdate => "conversationUpdate",
            ActivityKind::Event => "event",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChannelAccount {
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self { id: id.into(), name: name.map(str::to_string) }
    }

    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationAccount {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub channel_id: String,
    pub conversation: ConversationAccount,
    pub from: ChannelAccount,
    pub recipient: ChannelAccount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members_added: Vec<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Activity {
    fn base(
        kind: ActivityKind,
        channel_id: &str,
        conversation_id: &str,
        from: ChannelAccount,
        recipient: ChannelAccount,
    ) -> Self {
        Self {
            kind,
            id: Some(uuid::Uuid::new_v4().to_string()),
            channel_id: channel_id.to_string(),
            conversation: ConversationAccount { id: conversation_id.to_string() },
            from,
            recipient,
            text: None,
            members_added: Vec::new(),
            value_type: None,
            value: None,
        }
    }

    /// Inbound user message.
    pub fn message(
        channel_id: &str,
        conversation_id: &str,
        from: ChannelAccount,
        recipient: ChannelAccount,
        text: impl Into<String>,
    ) -> Self {
        let mut a = Self::base(ActivityKind::Message, channel_id, conversation_id, from, recipient);
        a.text = Some(text.into());
        a
    }

    /// Inbound conversation update announcing `members` joined.
    pub fn members_added(
        channel_id: &str,
        conversation_id: &str,
        from: ChannelAccount,
        recipient: ChannelAccount,
        members: Vec<ChannelAccount>,
    ) -> Self {
        let mut a = Self::base(ActivityKind::ConversationUpdate, channel_id, conversation_id, from, recipient);
        a.members_added = members;
        a
    }

    /// Inbound named event.
    pub fn event(
        channel_id: &str,
        conversation_id: &str,
        from: ChannelAccount,
        recipient: ChannelAccount,
        value_type: impl Into<String>,
        value: Option<Value>,
    ) -> Self {
        let mut a = Self::base(ActivityKind::Event, channel_id, conversation_id, from, recipient);
        a.value_type = Some(value_type.into());
        a.value = value;
        a
    }

    /// Outbound activity addressed back to whoever sent `self`.
    pub fn reply(&self, kind: ActivityKind) -> Self {
        Self::base(
            kind,
            &self.channel_id,
            &self.conversation.id,
            self.recipient.clone(),
            self.from.clone(),
        )
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn is_message(&self) -> bool {
        self.kind == ActivityKind::Message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> ChannelAccount {
        ChannelAccount::new("u1", Some("Ada"))
    }

    fn bot() -> ChannelAccount {
        ChannelAccount::new("bot", None)
    }

    #[test]
    fn reply_swaps_accounts() {
        let inbound = Activity::message("pty", "c1", user(), bot(), "hi");
        let out = inbound.reply(ActivityKind::Message);
        assert_eq!(out.from.id, "bot");
        assert_eq!(out.recipient.id, "u1");
        assert_eq!(out.conversation.id, "c1");
        assert!(out.text.is_none());
    }

    #[test]
    fn display_name_falls_back_to_id() {
        assert_eq!(bot().display_name(), "bot");
        assert_eq!(user().display_name(), "Ada");
    }

    #[test]
    fn deserializes_emulator_payload() {
        let json = r#"{
            "type": "conversationUpdate",
            "channelId": "emulator",
            "conversation": { "id": "conv-1" },
            "from": { "id": "user-1", "name": "User" },
            "recipient": { "id": "bot-1", "name": "Bot" },
            "membersAdded": [ { "id": "user-1", "name": "User" } ]
        }"#;
        let a: Activity = serde_json::from_str(json).unwrap();
        assert_eq!(a.kind, ActivityKind::ConversationUpdate);
        assert_eq!(a.members_added.len(), 1);
        assert!(a.id.is_none());
    }

    #[test]
    fn event_serializes_value_type() {
        let a = Activity::event("web", "c", user(), bot(), "location", Some(serde_json::json!([1.0, 2.0])));
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["type"], "event");
        assert_eq!(v["valueType"], "location");
        assert_eq!(v["value"][1], 2.0);
        assert!(v.get("membersAdded").is_none());
    }
}
