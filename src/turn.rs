//! Per-turn context: the inbound activity plus everything sent in reply.

use serde_json::Value;

use crate::activity::{Activity, ActivityKind};

pub struct TurnContext {
    activity: Activity,
    replies: Vec<Activity>,
}

impl TurnContext {
    pub fn new(activity: Activity) -> Self {
        Self { activity, replies: Vec::new() }
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    /// Send a plain text message back to the user.
    pub fn send_text(&mut self, text: impl Into<String>) {
        let mut reply = self.activity.reply(ActivityKind::Message);
        reply.text = Some(text.into());
        self.replies.push(reply);
    }

    /// Send a named event back to the client (e.g. `location`, `location.saved`).
    pub fn send_event(&mut self, value_type: impl Into<String>, value: Option<Value>) {
        let mut reply = self.activity.reply(ActivityKind::Event);
        reply.value_type = Some(value_type.into());
        reply.value = value;
        self.replies.push(reply);
    }

    pub fn send(&mut self, activity: Activity) {
        self.replies.push(activity);
    }

    /// `true` once anything has been sent during this turn.
    pub fn responded(&self) -> bool {
        !self.replies.is_empty()
    }

    pub fn replies(&self) -> &[Activity] {
        &self.replies
    }

    pub fn into_replies(self) -> Vec<Activity> {
        self.replies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ChannelAccount;

    #[test]
    fn responded_tracks_sends() {
        let inbound = Activity::message(
            "pty",
            "c",
            ChannelAccount::new("u", None),
            ChannelAccount::new("b", None),
            "hello",
        );
        let mut ctx = TurnContext::new(inbound);
        assert!(!ctx.responded());
        ctx.send_text("one");
        ctx.send_event("location", None);
        assert!(ctx.responded());

        let replies = ctx.into_replies();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].text(), "one");
        assert_eq!(replies[1].kind, ActivityKind::Event);
        assert_eq!(replies[1].recipient.id, "u");
    }
}
