//! Waterfall dialogs with a per-conversation dialog stack.
//!
//! A [`Dialog`] is a fixed, ordered list of steps. Each step either moves on
//! ([`StepOutcome::Next`]), asks the user something and suspends until the
//! next message ([`StepOutcome::Prompt`]), starts a child dialog
//! ([`StepOutcome::Begin`]) or finishes ([`StepOutcome::End`]). When a child
//! ends, its parent resumes at the following step with the child's result.
//!
//! The stack lives in conversation state under the property the
//! [`DialogSet`] was created with, so a suspended waterfall survives across
//! turns (and restarts, with file storage).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::AppError;
use crate::state::TurnState;
use crate::turn::TurnContext;

/// Upper bound on steps executed in a single turn; trips on dialogs that
/// begin each other forever.
const MAX_STEPS_PER_TURN: usize = 64;

// ── Step API ──────────────────────────────────────────────────────────────────

/// What a step wants the engine to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Run the next step with this result.
    Next(Option<Value>),
    /// Send `text` and wait; the reply becomes the next step's result.
    Prompt(String),
    /// Send `text` and wait on the previous prompt again; the reply re-runs
    /// the current step.
    Reprompt(String),
    /// Push `dialog`; this dialog resumes at its next step when the child ends.
    Begin { dialog: String, options: Value },
    /// Pop this dialog and hand `result` to the parent.
    End(Option<Value>),
}

/// Everything a step can see and touch.
pub struct StepContext<'a> {
    pub turn: &'a mut TurnContext,
    pub state: &'a mut TurnState,
    /// Options the dialog was begun with (`Value::Null` when none).
    pub options: Value,
    /// Result handed over by the previous step, a finished child dialog, or
    /// the user's reply to a prompt.
    pub result: Option<Value>,
}

impl StepContext<'_> {
    /// The previous result as text, when it is a JSON string.
    pub fn result_text(&self) -> Option<&str> {
        self.result.as_ref().and_then(Value::as_str)
    }
}

#[async_trait]
pub trait Dialog: Send + Sync {
    fn id(&self) -> &str;

    fn step_count(&self) -> usize;

    async fn run_step(
        &self,
        index: usize,
        step: &mut StepContext<'_>,
    ) -> Result<StepOutcome, AppError>;
}

// ── Stack ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogInstance {
    pub id: String,
    pub step: usize,
    #[serde(default)]
    pub options: Value,
    /// Suspended on a prompt issued by `step`.
    #[serde(default)]
    pub waiting: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogTurnStatus {
    /// No dialog was active.
    Empty,
    /// A dialog is suspended waiting on the user.
    Waiting,
    /// The stack emptied during this turn.
    Complete,
}

// ── DialogSet ─────────────────────────────────────────────────────────────────

pub struct DialogSet {
    stack_property: String,
    dialogs: HashMap<String, Arc<dyn Dialog>>,
}

impl DialogSet {
    pub fn new(stack_property: impl Into<String>) -> Self {
        Self { stack_property: stack_property.into(), dialogs: HashMap::new() }
    }

    /// Register a dialog under its own id.
    pub fn add(mut self, dialog: impl Dialog + 'static) -> Self {
        self.dialogs.insert(dialog.id().to_string(), Arc::new(dialog));
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.dialogs.contains_key(id)
    }

    /// Id of the innermost active dialog, if any.
    pub fn active_dialog(&self, state: &TurnState) -> Result<Option<String>, AppError> {
        Ok(self.load_stack(state)?.last().map(|i| i.id.clone()))
    }

    /// Drop every active dialog for this conversation.
    pub fn cancel_all(&self, state: &mut TurnState) {
        state.conversation.delete(&self.stack_property);
    }

    /// Resume the active dialog with the user's message, if one is waiting.
    pub async fn continue_dialog(
        &self,
        turn: &mut TurnContext,
        state: &mut TurnState,
    ) -> Result<DialogTurnStatus, AppError> {
        let mut stack = self.load_stack(state)?;
        let Some(top) = stack.last_mut() else {
            return Ok(DialogTurnStatus::Empty);
        };

        let result = if top.waiting {
            top.waiting = false;
            top.step += 1;
            Some(Value::String(turn.activity().text().to_string()))
        } else {
            None
        };
        debug!(dialog = %top.id, step = top.step, "continuing dialog");

        let status = self.drive(&mut stack, result, turn, state).await;
        self.store_stack(state, &stack)?;
        status
    }

    /// Push `id` onto the stack and run its first step.
    pub async fn begin_dialog(
        &self,
        id: &str,
        options: Value,
        turn: &mut TurnContext,
        state: &mut TurnState,
    ) -> Result<DialogTurnStatus, AppError> {
        self.find(id)?;
        let mut stack = self.load_stack(state)?;
        debug!(dialog = %id, depth = stack.len(), "beginning dialog");
        stack.push(DialogInstance { id: id.to_string(), step: 0, options, waiting: false });

        let status = self.drive(&mut stack, None, turn, state).await;
        self.store_stack(state, &stack)?;
        status
    }

    async fn drive(
        &self,
        stack: &mut Vec<DialogInstance>,
        mut result: Option<Value>,
        turn: &mut TurnContext,
        state: &mut TurnState,
    ) -> Result<DialogTurnStatus, AppError> {
        for _ in 0..MAX_STEPS_PER_TURN {
            let Some(top) = stack.last_mut() else {
                return Ok(DialogTurnStatus::Complete);
            };
            let dialog = self.find(&top.id)?;

            // Ran past the last step: end with whatever the last step produced.
            if top.step >= dialog.step_count() {
                trace!(dialog = %top.id, "waterfall exhausted");
                stack.pop();
                match stack.last_mut() {
                    None => return Ok(DialogTurnStatus::Complete),
                    Some(parent) => parent.step += 1,
                }
                continue;
            }

            let index = top.step;
            let mut ctx = StepContext {
                turn: &mut *turn,
                state: &mut *state,
                options: top.options.clone(),
                result: result.take(),
            };
            trace!(dialog = %top.id, step = index, "running step");
            let outcome = dialog.run_step(index, &mut ctx).await?;

            match outcome {
                StepOutcome::Next(next) => {
                    top.step += 1;
                    result = next;
                }
                StepOutcome::Prompt(text) => {
                    turn.send_text(text);
                    top.waiting = true;
                    return Ok(DialogTurnStatus::Waiting);
                }
                StepOutcome::Reprompt(text) => {
                    turn.send_text(text);
                    top.step = index.saturating_sub(1);
                    top.waiting = true;
                    return Ok(DialogTurnStatus::Waiting);
                }
                StepOutcome::Begin { dialog: child, options } => {
                    self.find(&child)?;
                    stack.push(DialogInstance { id: child, step: 0, options, waiting: false });
                }
                StepOutcome::End(value) => {
                    stack.pop();
                    match stack.last_mut() {
                        None => return Ok(DialogTurnStatus::Complete),
                        Some(parent) => {
                            parent.step += 1;
                            result = value;
                        }
                    }
                }
            }
        }

        Err(AppError::Dialog(format!(
            "dialog stack did not settle within {MAX_STEPS_PER_TURN} steps"
        )))
    }

    fn find(&self, id: &str) -> Result<Arc<dyn Dialog>, AppError> {
        self.dialogs
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::Dialog(format!("unknown dialog: {id}")))
    }

    fn load_stack(&self, state: &TurnState) -> Result<Vec<DialogInstance>, AppError> {
        Ok(state.conversation.get(&self.stack_property)?.unwrap_or_default())
    }

    fn store_stack(&self, state: &mut TurnState, stack: &[DialogInstance]) -> Result<(), AppError> {
        if stack.is_empty() {
            state.conversation.delete(&self.stack_property);
            Ok(())
        } else {
            state.conversation.set(&self.stack_property, &stack)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{Activity, ChannelAccount};

    /// Asks for a colour, then ends with it.
    struct ColourDialog;

    #[async_trait]
    impl Dialog for ColourDialog {
        fn id(&self) -> &str { "colour" }
        fn step_count(&self) -> usize { 2 }

        async fn run_step(&self, index: usize, step: &mut StepContext<'_>) -> Result<StepOutcome, AppError> {
            match index {
                0 => Ok(StepOutcome::Prompt("Favourite colour?".into())),
                _ => match step.result_text() {
                    Some("") | None => Ok(StepOutcome::Reprompt("Please name a colour.".into())),
                    Some(c) => Ok(StepOutcome::End(Some(Value::String(c.to_uppercase())))),
                },
            }
        }
    }

    /// Begins `colour`, then reports the child's result.
    struct ParentDialog;

    #[async_trait]
    impl Dialog for ParentDialog {
        fn id(&self) -> &str { "parent" }
        fn step_count(&self) -> usize { 2 }

        async fn run_step(&self, index: usize, step: &mut StepContext<'_>) -> Result<StepOutcome, AppError> {
            match index {
                0 => Ok(StepOutcome::Begin { dialog: "colour".into(), options: Value::Null }),
                _ => {
                    let colour = step.result_text().unwrap_or("?").to_string();
                    step.turn.send_text(format!("You chose {colour}"));
                    Ok(StepOutcome::Next(None))
                }
            }
        }
    }

    /// Begins itself forever.
    struct LoopDialog;

    #[async_trait]
    impl Dialog for LoopDialog {
        fn id(&self) -> &str { "loop" }
        fn step_count(&self) -> usize { 1 }

        async fn run_step(&self, _index: usize, _step: &mut StepContext<'_>) -> Result<StepOutcome, AppError> {
            Ok(StepOutcome::Begin { dialog: "loop".into(), options: Value::Null })
        }
    }

    fn turn(text: &str) -> TurnContext {
        TurnContext::new(Activity::message(
            "test",
            "c",
            ChannelAccount::new("u", None),
            ChannelAccount::new("b", None),
            text,
        ))
    }

    fn set() -> DialogSet {
        DialogSet::new("dialogState").add(ParentDialog).add(ColourDialog).add(LoopDialog)
    }

    #[tokio::test]
    async fn continue_without_stack_is_empty() {
        let mut state = TurnState::default();
        let mut t = turn("hello");
        let status = set().continue_dialog(&mut t, &mut state).await.unwrap();
        assert_eq!(status, DialogTurnStatus::Empty);
        assert!(!t.responded());
    }

    #[tokio::test]
    async fn prompt_suspends_and_child_result_reaches_parent() {
        let dialogs = set();
        let mut state = TurnState::default();

        let mut t1 = turn("start");
        let status = dialogs.begin_dialog("parent", Value::Null, &mut t1, &mut state).await.unwrap();
        assert_eq!(status, DialogTurnStatus::Waiting);
        assert_eq!(t1.replies()[0].text(), "Favourite colour?");
        assert_eq!(dialogs.active_dialog(&state).unwrap().as_deref(), Some("colour"));

        let mut t2 = turn("teal");
        let status = dialogs.continue_dialog(&mut t2, &mut state).await.unwrap();
        assert_eq!(status, DialogTurnStatus::Complete);
        assert_eq!(t2.replies()[0].text(), "You chose TEAL");
        assert!(dialogs.active_dialog(&state).unwrap().is_none());
    }

    #[tokio::test]
    async fn reprompt_waits_on_same_capture_step() {
        let dialogs = set();
        let mut state = TurnState::default();

        dialogs.begin_dialog("colour", Value::Null, &mut turn("x"), &mut state).await.unwrap();

        let mut t = turn("");
        let status = dialogs.continue_dialog(&mut t, &mut state).await.unwrap();
        assert_eq!(status, DialogTurnStatus::Waiting);
        assert_eq!(t.replies()[0].text(), "Please name a colour.");

        let status = dialogs.continue_dialog(&mut turn("red"), &mut state).await.unwrap();
        assert_eq!(status, DialogTurnStatus::Complete);
    }

    #[tokio::test]
    async fn unknown_dialog_errors() {
        let mut state = TurnState::default();
        let err = set().begin_dialog("nope", Value::Null, &mut turn("x"), &mut state).await.unwrap_err();
        assert!(err.to_string().contains("unknown dialog: nope"));
    }

    #[tokio::test]
    async fn runaway_dialog_errors() {
        let mut state = TurnState::default();
        let err = set().begin_dialog("loop", Value::Null, &mut turn("x"), &mut state).await.unwrap_err();
        assert!(err.to_string().contains("did not settle"));
    }

    #[tokio::test]
    async fn cancel_all_clears_stack() {
        let dialogs = set();
        let mut state = TurnState::default();
        dialogs.begin_dialog("colour", Value::Null, &mut turn("x"), &mut state).await.unwrap();
        assert!(dialogs.active_dialog(&state).unwrap().is_some());
        dialogs.cancel_all(&mut state);
        assert!(dialogs.active_dialog(&state).unwrap().is_none());
    }
}
