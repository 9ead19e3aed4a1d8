//! Pending-action store for two-step confirmation
//!
//! One slot per category key ("delete", ...). Saving again for the same key
//! replaces the previous action; there is no queue.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::fuzzy::clean_for_matching;

/// An action waiting for a yes/no reply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingAction {
    pub intent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,
    pub description: String,
    pub saved_at: DateTime<Utc>,
}

impl PendingAction {
    pub fn new(intent: &str, payload: Option<Map<String, Value>>, description: &str) -> Self {
        Self {
            intent: intent.to_string(),
            payload,
            description: description.to_string(),
            saved_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfirmReason {
    MissingContext,
    EmptyResponse,
    Rejected,
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfirmationResult {
    pub confirmed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ConfirmReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<PendingAction>,
}

impl ConfirmationResult {
    fn declined(reason: ConfirmReason, action: Option<PendingAction>) -> Self {
        Self {
            confirmed: false,
            reason: Some(reason),
            action,
        }
    }

    /// Whether the slot was consumed by this reply
    pub fn resolved(&self) -> bool {
        self.confirmed || self.reason == Some(ConfirmReason::Rejected)
    }
}

// Entries are folded and punctuation-free, like the cleaned reply
const AFFIRMATIVE: &[&str] = &[
    "yes",
    "si",
    "claro",
    "confirm",
    "confirma",
    "confirmo",
    "confirmalo",
    "confirmala",
    "eliminalo",
    "eliminala",
    "borrala",
    "borralo",
    "dale",
    "adelante",
    "sure",
    "yep",
    "delete it",
    "confirm it",
];

const NEGATIVE: &[&str] = &[
    "no",
    "nope",
    "cancel",
    "cancela",
    "cancelar",
    "cancelala",
    "rechaza",
    "rechazar",
    "stop",
    "no gracias",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Affirmative,
    Negative,
    Unrecognized,
}

/// Classify a cleaned reply against the yes/no lexicons
///
/// A negative word anywhere wins, so "claro que no" is a rejection.
pub fn classify_reply(cleaned: &str) -> Reply {
    let negated = cleaned.split_whitespace().any(|word| NEGATIVE.contains(&word));
    if negated || NEGATIVE.contains(&cleaned) {
        return Reply::Negative;
    }
    if AFFIRMATIVE.contains(&cleaned) {
        return Reply::Affirmative;
    }
    let first = cleaned.split_whitespace().next().unwrap_or("");
    if AFFIRMATIVE.contains(&first) {
        Reply::Affirmative
    } else {
        Reply::Unrecognized
    }
}

#[derive(Debug, Default)]
pub struct ContextManager {
    pending: HashMap<String, PendingAction>,
}

impl ContextManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_action(&mut self, key: &str, mut action: PendingAction) {
        action.saved_at = Utc::now();
        info!(key, intent = %action.intent, description = %action.description, "pending action saved");
        self.pending.insert(key.to_string(), action);
    }

    pub fn action(&self, key: &str) -> Option<&PendingAction> {
        self.pending.get(key)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn clear_action(&mut self, key: &str) -> Option<PendingAction> {
        let cleared = self.pending.remove(key);
        if cleared.is_some() {
            debug!(key, "pending action cleared");
        }
        cleared
    }

    /// Check a reply against the pending action for `key`
    pub fn maybe_confirm(&mut self, key: &str, utterance: &str) -> ConfirmationResult {
        let Some(action) = self.pending.get(key) else {
            return ConfirmationResult::declined(ConfirmReason::MissingContext, None);
        };

        let cleaned = clean_for_matching(utterance);
        if cleaned.is_empty() {
            return ConfirmationResult::declined(
                ConfirmReason::EmptyResponse,
                Some(action.clone()),
            );
        }

        match classify_reply(&cleaned) {
            Reply::Affirmative => self.confirm(key),
            Reply::Negative => self.cancel(key),
            Reply::Unrecognized => {
                ConfirmationResult::declined(ConfirmReason::Unrecognized, Some(action.clone()))
            }
        }
    }

    /// Classify a reply to the action under `key` without consuming it
    pub fn preview(&self, key: &str, utterance: &str) -> Option<Reply> {
        self.pending.get(key)?;
        match classify_reply(&clean_for_matching(utterance)) {
            Reply::Unrecognized => None,
            reply => Some(reply),
        }
    }

    /// Confirm without a spoken reply
    pub fn confirm(&mut self, key: &str) -> ConfirmationResult {
        match self.clear_action(key) {
            Some(action) => {
                info!(key, intent = %action.intent, "pending action confirmed");
                ConfirmationResult {
                    confirmed: true,
                    reason: None,
                    action: Some(action),
                }
            }
            None => ConfirmationResult::declined(ConfirmReason::MissingContext, None),
        }
    }

    /// Reject without a spoken reply
    pub fn cancel(&mut self, key: &str) -> ConfirmationResult {
        match self.clear_action(key) {
            Some(action) => {
                info!(key, intent = %action.intent, "pending action rejected");
                ConfirmationResult::declined(ConfirmReason::Rejected, Some(action))
            }
            None => ConfirmationResult::declined(ConfirmReason::MissingContext, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn delete_action(id: i64) -> PendingAction {
        let payload = json!({ "id": id }).as_object().cloned();
        PendingAction::new("delete::order", payload, &format!("Delete order {}", id))
    }

    #[test]
    fn test_missing_context() {
        let mut ctx = ContextManager::new();
        let result = ctx.maybe_confirm("delete", "sí");
        assert!(!result.confirmed);
        assert_eq!(result.reason, Some(ConfirmReason::MissingContext));
        assert!(result.action.is_none());
    }

    #[test]
    fn test_affirmative_clears() {
        let mut ctx = ContextManager::new();
        ctx.save_action("delete", delete_action(15));
        let result = ctx.maybe_confirm("delete", "Sí, elimínala");
        assert!(result.confirmed);
        assert_eq!(result.action.unwrap().description, "Delete order 15");
        assert!(ctx.action("delete").is_none());
    }

    #[test]
    fn test_negative_clears() {
        let mut ctx = ContextManager::new();
        ctx.save_action("delete", delete_action(3));
        let result = ctx.maybe_confirm("delete", "no gracias");
        assert!(!result.confirmed);
        assert_eq!(result.reason, Some(ConfirmReason::Rejected));
        assert!(result.resolved());
        assert!(ctx.action("delete").is_none());
    }

    #[test]
    fn test_empty_and_unrecognized_retain() {
        let mut ctx = ContextManager::new();
        ctx.save_action("delete", delete_action(3));

        let result = ctx.maybe_confirm("delete", "  ¿? ");
        assert_eq!(result.reason, Some(ConfirmReason::EmptyResponse));
        assert!(result.action.is_some());

        let result = ctx.maybe_confirm("delete", "abre el menú");
        assert_eq!(result.reason, Some(ConfirmReason::Unrecognized));
        assert!(!result.resolved());
        assert!(ctx.action("delete").is_some());
    }

    #[test]
    fn test_cleared_exactly_once() {
        let mut ctx = ContextManager::new();
        ctx.save_action("delete", delete_action(3));
        assert!(ctx.maybe_confirm("delete", "yes").confirmed);
        let again = ctx.maybe_confirm("delete", "yes");
        assert!(!again.confirmed);
        assert_eq!(again.reason, Some(ConfirmReason::MissingContext));
    }

    #[test]
    fn test_save_overwrites() {
        let mut ctx = ContextManager::new();
        ctx.save_action("delete", delete_action(3));
        ctx.save_action("delete", delete_action(4));
        assert_eq!(ctx.action("delete").unwrap().description, "Delete order 4");
    }

    #[test]
    fn test_keys_are_independent() {
        let mut ctx = ContextManager::new();
        ctx.save_action("delete", delete_action(3));
        assert_eq!(
            ctx.maybe_confirm("update", "yes").reason,
            Some(ConfirmReason::MissingContext)
        );
        assert!(ctx.action("delete").is_some());
    }

    #[test]
    fn test_button_confirm_and_cancel() {
        let mut ctx = ContextManager::new();
        ctx.save_action("delete", delete_action(3));
        assert!(ctx.confirm("delete").confirmed);
        assert!(!ctx.has_pending());

        ctx.save_action("delete", delete_action(5));
        assert_eq!(ctx.cancel("delete").reason, Some(ConfirmReason::Rejected));
        assert_eq!(
            ctx.cancel("delete").reason,
            Some(ConfirmReason::MissingContext)
        );
    }

    #[test]
    fn test_classify_reply() {
        assert_eq!(classify_reply("si"), Reply::Affirmative);
        assert_eq!(classify_reply("confirm it"), Reply::Affirmative);
        assert_eq!(classify_reply("claro que si"), Reply::Affirmative);
        assert_eq!(classify_reply("no gracias"), Reply::Negative);
        assert_eq!(classify_reply("cancela eso"), Reply::Negative);
        assert_eq!(classify_reply("ok nura abre"), Reply::Unrecognized);
        assert_eq!(classify_reply("delete order 3"), Reply::Unrecognized);
        assert_eq!(classify_reply("claro que no"), Reply::Negative);
        assert_eq!(classify_reply("yes no wait"), Reply::Negative);
    }

    #[test]
    fn test_negated_affirmative_rejects() {
        let mut ctx = ContextManager::new();
        ctx.save_action("delete", delete_action(15));
        let result = ctx.maybe_confirm("delete", "claro que no");
        assert!(!result.confirmed);
        assert_eq!(result.reason, Some(ConfirmReason::Rejected));

        ctx.save_action("delete", delete_action(15));
        let result = ctx.maybe_confirm("delete", "Yes, no wait!");
        assert!(!result.confirmed);
        assert!(ctx.action("delete").is_none());
    }

    #[test]
    fn test_preview_keeps_slot() {
        let mut ctx = ContextManager::new();
        assert_eq!(ctx.preview("delete", "yes"), None);
        ctx.save_action("delete", delete_action(3));
        assert_eq!(ctx.preview("delete", "sí"), Some(Reply::Affirmative));
        assert_eq!(ctx.preview("delete", "cancela"), Some(Reply::Negative));
        assert_eq!(ctx.preview("delete", "abre el menú"), None);
        assert!(ctx.action("delete").is_some());
    }
}
