//! Command resolution - turns one utterance into a resolved intent
//!
//! Utterances are processed in this order:
//! 1. Pending confirmation - a yes/no reply to a saved action short-circuits
//! 2. Wake phrase - stripped, and required when configured
//! 3. Locale and spoken numerals
//! 4. Intent matching against the catalog, then the fallback rules
//! 5. Side-effects - console events and pending-action registration
//!
//! In explain mode step 5 is skipped and step 1 only reports the reply, so an
//! utterance can be inspected without touching the console. Explain toggles
//! still apply.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::catalog::{default_catalog, intents};
use crate::config::{Config, ConfigError};
use crate::context::{ConfirmationResult, ContextManager, PendingAction, Reply};
use crate::events::{ConsoleEvent, EventBus, EventLog};
use crate::locale::{Locale, LocaleSetting, detect_locale};
use crate::matcher::{
    FuzzyStrategy, IntentCandidate, IntentMatcher, MatchOutcome, MatchedBy, MatcherError,
    default_rules,
};
use crate::numerals::NumeralExtractor;
use crate::wake::{WakeVia, WakeWordStripper};

/// Context key for actions awaiting a delete confirmation
pub const DELETE_KEY: &str = "delete";

const CONFIRM_CONFIDENCE: f32 = 0.95;
const CANCEL_CONFIDENCE: f32 = 0.9;

/// Final classification of one utterance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedIntent {
    pub intent: String,
    pub confidence: f32,
    pub via: WakeVia,
    pub matched_by: MatchedBy,
    pub locale: Locale,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,
    pub utterance: String,
    /// Unix milliseconds
    pub timestamp: i64,
}

impl ResolvedIntent {
    pub fn is_match(&self) -> bool {
        self.matched_by != MatchedBy::None
    }

    fn confirmation(
        intent: &str,
        confidence: f32,
        result: ConfirmationResult,
        utterance: &str,
        locale: Locale,
    ) -> Self {
        Self {
            intent: intent.to_string(),
            confidence,
            via: WakeVia::None,
            matched_by: MatchedBy::Plugin,
            locale,
            payload: result.action.and_then(|a| a.payload),
            utterance: utterance.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Name and notes spoken along with an order command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderDetails {
    pub name: Option<String>,
    pub notes: Option<String>,
}

static CREATE_ORDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:agrega|añade|anade|add)\s+(?:la\s+|una\s+|the\s+|an?\s+)?(?:orden|order)\b(.*)$",
    )
    .expect("valid create-order regex")
});

static UPDATE_ORDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:modifica|actualiza|update)\s+(?:la\s+|the\s+)?(?:orden|order)\b(.*)$")
        .expect("valid update-order regex")
});

static NOTES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:con\s+notas?|con\s+comentarios?|with\s+notes?)\s+|\s+(?:nota|note):\s*")
        .expect("valid notes regex")
});

static RENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:\S+\s+)?(?:a|to)\s+(.+)$").expect("valid rename regex")
});

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn non_empty(text: &str) -> Option<&str> {
    let text = text.trim().trim_end_matches(['.', '!', '?']).trim();
    (!text.is_empty()).then_some(text)
}

/// Split "<name> con nota <notes>" style text
fn split_notes(rest: &str) -> OrderDetails {
    let padded = format!(" {} ", rest);
    match NOTES_RE.find(&padded) {
        Some(sep) => OrderDetails {
            name: non_empty(&padded[..sep.start()]).map(title_case),
            notes: non_empty(&padded[sep.end()..]).map(capitalize),
        },
        None => OrderDetails {
            name: non_empty(&padded).map(title_case),
            notes: None,
        },
    }
}

/// "agrega la orden pizza grande con nota sin cebolla"
pub fn parse_create_order(command: &str) -> OrderDetails {
    match CREATE_ORDER_RE.captures(command) {
        Some(caps) => split_notes(&caps[1]),
        None => OrderDetails::default(),
    }
}

/// "modifica la orden 3 a pizza grande", "update order 3 note: extra cheese"
pub fn parse_update_order(command: &str) -> OrderDetails {
    let Some(caps) = UPDATE_ORDER_RE.captures(command) else {
        return OrderDetails::default();
    };
    let rest = format!(" {} ", &caps[1]);

    if let Some(sep) = NOTES_RE.find(&rest) {
        return OrderDetails {
            name: None,
            notes: non_empty(&rest[sep.end()..]).map(capitalize),
        };
    }

    OrderDetails {
        name: RENAME_RE
            .captures(&rest)
            .and_then(|c| non_empty(c.get(1).map_or("", |m| m.as_str())).map(title_case)),
        notes: None,
    }
}

/// Resolver pipeline with its runtime settings and console side-effects
pub struct CommandResolver {
    wake: WakeWordStripper,
    wake_required: bool,
    numerals: NumeralExtractor,
    matcher: IntentMatcher,
    context: ContextManager,
    events: EventBus,
    locale: LocaleSetting,
    explain: bool,
}

impl CommandResolver {
    pub fn new(
        config: &Config,
        event_tx: Option<mpsc::UnboundedSender<ConsoleEvent>>,
    ) -> Result<Self, MatcherError> {
        let catalog = config.catalog.clone().unwrap_or_else(default_catalog);
        Ok(Self {
            wake: WakeWordStripper::from_config(&config.wake),
            wake_required: config.wake.required,
            numerals: NumeralExtractor::new()?,
            matcher: IntentMatcher::new(
                catalog,
                default_rules()?,
                config.strategy,
                config.threshold,
            ),
            context: ContextManager::new(),
            events: EventBus::new(event_tx),
            locale: config.locale,
            explain: config.explain,
        })
    }

    pub fn threshold(&self) -> f32 {
        self.matcher.threshold()
    }

    pub fn set_threshold(&mut self, threshold: f32) -> Result<(), ConfigError> {
        self.matcher.set_threshold(threshold)
    }

    pub fn strategy(&self) -> FuzzyStrategy {
        self.matcher.strategy()
    }

    pub fn set_strategy(&mut self, strategy: FuzzyStrategy) {
        self.matcher.set_strategy(strategy);
    }

    pub fn locale_setting(&self) -> LocaleSetting {
        self.locale
    }

    pub fn set_locale(&mut self, locale: LocaleSetting) {
        self.locale = locale;
    }

    pub fn explain(&self) -> bool {
        self.explain
    }

    pub fn set_explain(&mut self, enabled: bool) {
        self.explain = enabled;
    }

    pub fn wake_required(&self) -> bool {
        self.wake_required
    }

    pub fn set_wake_required(&mut self, required: bool) {
        self.wake_required = required;
    }

    pub fn last_ranking(&self) -> &[IntentCandidate] {
        self.matcher.last_ranking()
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.context.action(DELETE_KEY)
    }

    pub fn events(&self) -> &EventLog {
        self.events.log()
    }

    pub fn matcher_mut(&mut self) -> &mut IntentMatcher {
        &mut self.matcher
    }

    pub fn resolve(&mut self, utterance: &str) -> ResolvedIntent {
        if let Some(resolved) = self.check_pending(utterance, utterance, WakeVia::None) {
            return resolved;
        }

        let wake = self.wake.strip(utterance);
        let locale = detect_locale(self.locale, &wake.command);

        if self.wake_required && !wake.matched {
            debug!("wake phrase required, ignoring utterance");
            return self.build(utterance, locale, &wake.via, MatchOutcome::none(), None);
        }

        if wake.matched && !self.explain {
            self.events.emit(ConsoleEvent::WakeDetected {
                via: wake.via,
                wake_word: wake.wake_word.clone().unwrap_or_default(),
                confidence: wake.confidence,
            });
        }

        // "ok nura sí" only reads as a reply once the wake phrase is gone
        if wake.matched {
            if let Some(resolved) = self.check_pending(&wake.command, utterance, wake.via) {
                return resolved;
            }
        }

        let extraction = self.numerals.extract(&wake.command, locale);
        let mut outcome = self.matcher.classify(&extraction.cleaned);
        if wake.via == WakeVia::Phonetic {
            outcome.confidence = outcome.confidence.min(wake.confidence);
        }

        let mut payload = Map::new();
        if let Some(id) = extraction.id() {
            payload.insert("id".to_string(), Value::from(id));
        }
        let details = match outcome.intent.as_str() {
            intents::CREATE_ORDER => parse_create_order(&wake.command),
            intents::UPDATE_ORDER => parse_update_order(&wake.command),
            _ => OrderDetails::default(),
        };
        if let Some(name) = details.name {
            payload.insert("name".to_string(), Value::from(name));
        }
        if let Some(notes) = details.notes {
            payload.insert("notes".to_string(), Value::from(notes));
        }
        let payload = (!payload.is_empty()).then_some(payload);

        let resolved = self.build(utterance, locale, &wake.via, outcome, payload);
        info!(
            intent = %resolved.intent,
            confidence = resolved.confidence,
            matched_by = ?resolved.matched_by,
            locale = %resolved.locale,
            explain = self.explain,
            "utterance resolved"
        );

        self.dispatch(&resolved);
        resolved
    }

    /// Confirm the pending action without a spoken reply
    pub fn confirm_pending(&mut self) -> Option<ResolvedIntent> {
        let result = self.context.confirm(DELETE_KEY);
        if !result.confirmed {
            return None;
        }
        Some(self.finish_confirmation(result, "", Locale::DEFAULT))
    }

    /// Cancel the pending action without a spoken reply
    pub fn cancel_pending(&mut self) -> Option<ResolvedIntent> {
        let result = self.context.cancel(DELETE_KEY);
        if !result.resolved() {
            return None;
        }
        Some(self.finish_confirmation(result, "", Locale::DEFAULT))
    }

    /// Treat `reply` as an answer to the pending action, if there is one.
    /// Explain mode reports the answer but leaves the slot alone.
    fn check_pending(
        &mut self,
        reply: &str,
        utterance: &str,
        via: WakeVia,
    ) -> Option<ResolvedIntent> {
        if !self.context.has_pending() {
            return None;
        }
        let locale = detect_locale(self.locale, reply);

        let mut resolved = if self.explain {
            let (intent, confidence) = match self.context.preview(DELETE_KEY, reply)? {
                Reply::Affirmative => (intents::CONFIRM_LAST, CONFIRM_CONFIDENCE),
                _ => (intents::CANCEL_LAST, CANCEL_CONFIDENCE),
            };
            ResolvedIntent {
                intent: intent.to_string(),
                confidence,
                via,
                matched_by: MatchedBy::Plugin,
                locale,
                payload: self.pending().and_then(|a| a.payload.clone()),
                utterance: utterance.to_string(),
                timestamp: Utc::now().timestamp_millis(),
            }
        } else {
            let result = self.context.maybe_confirm(DELETE_KEY, reply);
            if !result.resolved() {
                debug!(reason = ?result.reason, "reply did not resolve pending action");
                return None;
            }
            self.finish_confirmation(result, utterance, locale)
        };

        resolved.via = via;
        Some(resolved)
    }

    fn build(
        &self,
        utterance: &str,
        locale: Locale,
        via: &WakeVia,
        outcome: MatchOutcome,
        payload: Option<Map<String, Value>>,
    ) -> ResolvedIntent {
        ResolvedIntent {
            intent: outcome.intent,
            confidence: outcome.confidence.clamp(0.0, 1.0),
            via: *via,
            matched_by: outcome.matched_by,
            locale,
            payload,
            utterance: utterance.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    fn finish_confirmation(
        &mut self,
        result: ConfirmationResult,
        utterance: &str,
        locale: Locale,
    ) -> ResolvedIntent {
        let Some(action) = result.action.clone() else {
            return self.build(utterance, locale, &WakeVia::None, MatchOutcome::none(), None);
        };

        if result.confirmed {
            self.events.emit(ConsoleEvent::Confirmed {
                intent: action.intent.clone(),
                payload: action.payload.clone(),
            });
            if action.intent == intents::DELETE_ORDER {
                let id = action
                    .payload
                    .as_ref()
                    .and_then(|p| p.get("id"))
                    .and_then(Value::as_i64);
                self.events.emit(ConsoleEvent::DeleteOrder { id });
            }
            ResolvedIntent::confirmation(
                intents::CONFIRM_LAST,
                CONFIRM_CONFIDENCE,
                result,
                utterance,
                locale,
            )
        } else {
            self.events.emit(ConsoleEvent::Cancelled {
                intent: action.intent.clone(),
                payload: action.payload.clone(),
                description: action.description.clone(),
            });
            ResolvedIntent::confirmation(
                intents::CANCEL_LAST,
                CANCEL_CONFIDENCE,
                result,
                utterance,
                locale,
            )
        }
    }

    fn dispatch(&mut self, resolved: &ResolvedIntent) {
        let payload = resolved.payload.as_ref();
        let field_i64 = |key: &str| payload.and_then(|p| p.get(key)).and_then(Value::as_i64);
        let field_str = |key: &str| {
            payload
                .and_then(|p| p.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        // Explain toggles apply even while explaining
        match resolved.intent.as_str() {
            intents::EXPLAIN_ON | intents::EXPLAIN_OFF => {
                let enabled = resolved.intent == intents::EXPLAIN_ON;
                self.explain = enabled;
                self.events.emit(ConsoleEvent::ToggleExplain { enabled });
                return;
            }
            _ => {}
        }

        if self.explain {
            return;
        }

        let event = match resolved.intent.as_str() {
            intents::OPEN_MENU => ConsoleEvent::OpenMenu {
                menu: "orders".to_string(),
            },
            intents::CREATE_ORDER => ConsoleEvent::CreateOrder {
                name: field_str("name"),
                notes: field_str("notes"),
            },
            intents::UPDATE_ORDER => ConsoleEvent::UpdateOrder {
                id: field_i64("id"),
                name: field_str("name"),
                notes: field_str("notes"),
            },
            intents::DELETE_ORDER => {
                let description = match field_i64("id") {
                    Some(id) => format!("Delete order {}", id),
                    None => "Delete last referenced order".to_string(),
                };
                let action =
                    PendingAction::new(intents::DELETE_ORDER, payload.cloned(), &description);
                self.context.save_action(DELETE_KEY, action);
                ConsoleEvent::PendingConfirmation {
                    intent: intents::DELETE_ORDER.to_string(),
                    payload: payload.cloned(),
                    description,
                }
            }
            intents::SHOW_CAPABILITIES => ConsoleEvent::ShowCapabilities,
            intents::OPEN_TELEMETRY => ConsoleEvent::OpenTelemetry,
            intents::CONNECT_GATEWAY => ConsoleEvent::ConnectGateway,
            intents::LIST_RESOURCES => ConsoleEvent::ListResources,
            intents::LIST_TOOLS => ConsoleEvent::ListTools,
            _ => return,
        };
        self.events.emit(event);
    }
}

/// Result of a console slash command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Command was handled, with text to show
    Handled(String),
    /// A pending action was settled from the console
    Resolved(ResolvedIntent),
    /// Request application shutdown
    Shutdown,
}

const HELP: &str = "\
Commands:
  /threshold <0-1> - Set the match threshold
  /strategy <name> - damerau, soundex, double-metaphone or hybrid
  /locale <name> - auto, es, en or es-419
  /explain - Toggle explain mode (classify without side-effects)
  /ranking - Show the ranking from the last utterance
  /pending - Show the action awaiting confirmation
  /confirm - Confirm the pending action
  /cancel - Cancel the pending action
  /events - Show recent console events
  /status - Show current settings
  /quit - Exit
  /help - Show this help

Anything else is resolved as an utterance, e.g. 'ok nura abre el menú de órdenes'";

/// Check if input is a slash command (keyboard input)
pub fn process_slash_command(input: &str, resolver: &mut CommandResolver) -> Option<CommandResult> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, char::is_whitespace);
    let cmd = parts.next().unwrap_or("").to_lowercase();
    let arg = parts.next().map(str::trim).unwrap_or("");

    let handled = |text: String| Some(CommandResult::Handled(text));

    match cmd.as_str() {
        "threshold" => match arg.parse::<f32>() {
            Ok(value) => match resolver.set_threshold(value) {
                Ok(()) => handled(format!("Threshold set to {:.2}", value)),
                Err(e) => handled(e.to_string()),
            },
            Err(_) => handled(format!("Threshold: {:.2}", resolver.threshold())),
        },
        "strategy" => {
            if arg.is_empty() {
                return handled(format!("Strategy: {}", resolver.strategy()));
            }
            match arg.parse::<FuzzyStrategy>() {
                Ok(strategy) => {
                    resolver.set_strategy(strategy);
                    handled(format!("Strategy set to {}", strategy))
                }
                Err(e) => handled(e.to_string()),
            }
        }
        "locale" => {
            if arg.is_empty() {
                return handled(format!("Locale: {}", resolver.locale_setting()));
            }
            match arg.parse::<LocaleSetting>() {
                Ok(locale) => {
                    resolver.set_locale(locale);
                    handled(format!("Locale set to {}", locale))
                }
                Err(e) => handled(e.to_string()),
            }
        }
        "explain" => {
            let enabled = !resolver.explain();
            resolver.set_explain(enabled);
            handled(format!(
                "Explain mode {}",
                if enabled { "enabled" } else { "disabled" }
            ))
        }
        "ranking" => {
            let ranking = resolver.last_ranking();
            if ranking.is_empty() {
                return handled("No ranking yet".to_string());
            }
            let lines: Vec<String> = ranking
                .iter()
                .take(5)
                .map(|c| format!("  {:.3}  {:<24} {}", c.score, c.intent, c.pattern))
                .collect();
            handled(lines.join("\n"))
        }
        "pending" => match resolver.pending() {
            Some(action) => handled(format!("{} ({})", action.description, action.intent)),
            None => handled("Nothing pending".to_string()),
        },
        "confirm" | "yes" => match resolver.confirm_pending() {
            Some(resolved) => Some(CommandResult::Resolved(resolved)),
            None => handled("Nothing pending".to_string()),
        },
        "cancel" | "no" => match resolver.cancel_pending() {
            Some(resolved) => Some(CommandResult::Resolved(resolved)),
            None => handled("Nothing pending".to_string()),
        },
        "events" => {
            let lines: Vec<String> = resolver
                .events()
                .recent(10)
                .map(|logged| {
                    let json = serde_json::to_string(&logged.event).unwrap_or_default();
                    format!("  {} {}", logged.at.format("%H:%M:%S"), json)
                })
                .collect();
            if lines.is_empty() {
                handled("No events yet".to_string())
            } else {
                handled(lines.join("\n"))
            }
        }
        "status" => handled(format!(
            "Threshold: {:.2}, Strategy: {}, Locale: {}, Explain: {}, Wake: {}, Pending: {}",
            resolver.threshold(),
            resolver.strategy(),
            resolver.locale_setting(),
            if resolver.explain() { "on" } else { "off" },
            if resolver.wake_required() { "required" } else { "optional" },
            resolver.pending().map_or("none", |a| a.description.as_str()),
        )),
        "help" | "commands" => handled(HELP.to_string()),
        "quit" | "exit" => Some(CommandResult::Shutdown),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> CommandResolver {
        CommandResolver::new(&Config::default(), None).unwrap()
    }

    fn event_names(resolver: &CommandResolver) -> Vec<&'static str> {
        resolver.events().iter().map(|e| e.event.name()).collect()
    }

    #[test]
    fn test_open_menu() {
        let mut r = resolver();
        let resolved = r.resolve("ok nura abre el menú de órdenes");
        assert_eq!(resolved.intent, intents::OPEN_MENU);
        assert_eq!(resolved.matched_by, MatchedBy::Plugin);
        assert_eq!(resolved.via, WakeVia::Exact);
        assert_eq!(resolved.confidence, 1.0);
        assert_eq!(resolved.locale, Locale::Es);
        assert_eq!(event_names(&r), vec!["wake-detected", "open-menu"]);
    }

    #[test]
    fn test_delete_registers_pending() {
        let mut r = resolver();
        let resolved = r.resolve("ok nura borra la orden quince");
        assert_eq!(resolved.intent, intents::DELETE_ORDER);
        assert_eq!(resolved.payload.unwrap()["id"], 15);
        assert_eq!(r.pending().unwrap().description, "Delete order 15");
        assert_eq!(event_names(&r), vec!["wake-detected", "pending-confirmation"]);
    }

    #[test]
    fn test_confirm_pending_delete() {
        let mut r = resolver();
        r.resolve("borra la orden quince");
        let resolved = r.resolve("sí, elimínala");
        assert_eq!(resolved.intent, intents::CONFIRM_LAST);
        assert_eq!(resolved.confidence, 0.95);
        assert_eq!(resolved.matched_by, MatchedBy::Plugin);
        assert_eq!(resolved.payload.unwrap()["id"], 15);
        assert!(r.pending().is_none());

        let events: Vec<_> = r.events().iter().map(|e| e.event.clone()).collect();
        assert_eq!(events.last(), Some(&ConsoleEvent::DeleteOrder { id: Some(15) }));
    }

    #[test]
    fn test_cancel_pending_delete() {
        let mut r = resolver();
        r.resolve("delete order 4");
        let resolved = r.resolve("no");
        assert_eq!(resolved.intent, intents::CANCEL_LAST);
        assert_eq!(resolved.confidence, 0.9);
        assert!(r.pending().is_none());
        assert_eq!(event_names(&r).last(), Some(&"cancelled"));
    }

    #[test]
    fn test_unrecognized_reply_falls_through() {
        let mut r = resolver();
        r.resolve("borra la orden 2");
        let resolved = r.resolve("abre el menú de órdenes");
        assert_eq!(resolved.intent, intents::OPEN_MENU);
        assert!(r.pending().is_some());
    }

    #[test]
    fn test_confirm_after_wake_phrase() {
        let mut r = resolver();
        r.resolve("ok nura borra la orden quince");
        let resolved = r.resolve("ok nura sí, elimínala");
        assert_eq!(resolved.intent, intents::CONFIRM_LAST);
        assert_eq!(resolved.via, WakeVia::Exact);
        assert_eq!(resolved.payload.unwrap()["id"], 15);
        assert!(r.pending().is_none());
        assert_eq!(
            event_names(&r),
            vec![
                "wake-detected",
                "pending-confirmation",
                "wake-detected",
                "confirmed",
                "delete-order"
            ]
        );
    }

    #[test]
    fn test_negated_reply_cancels() {
        let mut r = resolver();
        r.resolve("borra la orden quince");
        let resolved = r.resolve("claro que no");
        assert_eq!(resolved.intent, intents::CANCEL_LAST);
        assert!(r.pending().is_none());
        assert_eq!(event_names(&r).last(), Some(&"cancelled"));
    }

    #[test]
    fn test_explain_mode_reports_pending_reply() {
        let mut r = resolver();
        r.resolve("borra la orden quince");
        r.set_explain(true);
        let before = r.events().len();

        let resolved = r.resolve("yes");
        assert_eq!(resolved.intent, intents::CONFIRM_LAST);
        assert_eq!(resolved.payload.unwrap()["id"], 15);
        assert!(r.pending().is_some());
        assert_eq!(r.events().len(), before);

        let resolved = r.resolve("ok nura cancela");
        assert_eq!(resolved.intent, intents::CANCEL_LAST);
        assert!(r.pending().is_some());
    }

    #[test]
    fn test_delete_without_id() {
        let mut r = resolver();
        let resolved = r.resolve("delete order");
        assert!(resolved.payload.is_none());
        assert_eq!(r.pending().unwrap().description, "Delete last referenced order");
    }

    #[test]
    fn test_phonetic_wake_caps_confidence() {
        let mut r = resolver();
        let resolved = r.resolve("ok nora abre el menú de órdenes");
        assert_eq!(resolved.via, WakeVia::Phonetic);
        assert_eq!(resolved.intent, intents::OPEN_MENU);
        assert!(resolved.confidence < 1.0);
        assert!((resolved.confidence - (1.0 - 1.0 / 7.0)).abs() < 1e-6);
    }

    #[test]
    fn test_wake_required() {
        let mut config = Config::default();
        config.wake.required = true;
        let mut r = CommandResolver::new(&config, None).unwrap();
        let resolved = r.resolve("abre el menú de órdenes");
        assert_eq!(resolved.matched_by, MatchedBy::None);
        assert!(r.events().is_empty());

        let resolved = r.resolve("ok nura abre el menú de órdenes");
        assert_eq!(resolved.intent, intents::OPEN_MENU);
    }

    #[test]
    fn test_explain_mode_has_no_side_effects() {
        let mut r = resolver();
        r.set_explain(true);
        let resolved = r.resolve("ok nura borra la orden quince");
        assert_eq!(resolved.intent, intents::DELETE_ORDER);
        assert!(r.pending().is_none());
        assert!(r.events().is_empty());
        assert!(!r.last_ranking().is_empty());
    }

    #[test]
    fn test_explain_toggle_intents() {
        let mut r = resolver();
        r.resolve("activa modo explain");
        assert!(r.explain());
        r.resolve("desactiva modo explain");
        assert!(!r.explain());
        assert_eq!(event_names(&r), vec!["toggle-explain", "toggle-explain"]);
    }

    #[test]
    fn test_no_match() {
        let mut r = resolver();
        let resolved = r.resolve("qué tiempo hace hoy");
        assert!(!resolved.is_match());
        assert_eq!(resolved.intent, "");
        assert_eq!(resolved.confidence, 0.0);
        assert!(r.events().is_empty());
    }

    #[test]
    fn test_events_reach_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut r = CommandResolver::new(&Config::default(), Some(tx)).unwrap();
        r.resolve("list tools");
        assert_eq!(rx.try_recv().unwrap(), ConsoleEvent::ListTools);
    }

    #[test]
    fn test_parse_create_order() {
        let details = parse_create_order("agrega la orden pizza grande con nota sin cebolla");
        assert_eq!(details.name.as_deref(), Some("Pizza Grande"));
        assert_eq!(details.notes.as_deref(), Some("Sin cebolla"));

        let details = parse_create_order("add order veggie burger note: no pickles");
        assert_eq!(details.name.as_deref(), Some("Veggie Burger"));
        assert_eq!(details.notes.as_deref(), Some("No pickles"));

        let details = parse_create_order("add order");
        assert_eq!(details, OrderDetails::default());
    }

    #[test]
    fn test_parse_update_order() {
        let details = parse_update_order("modifica la orden 3 a pizza familiar");
        assert_eq!(details.name.as_deref(), Some("Pizza Familiar"));
        assert!(details.notes.is_none());

        let details = parse_update_order("update order 7 with note extra cheese");
        assert!(details.name.is_none());
        assert_eq!(details.notes.as_deref(), Some("Extra cheese"));
    }

    #[test]
    fn test_create_order_payload() {
        let mut r = resolver();
        let resolved = r.resolve("ok nura agrega la orden tacos al pastor con nota sin cilantro");
        assert_eq!(resolved.intent, intents::CREATE_ORDER);
        let payload = resolved.payload.unwrap();
        assert_eq!(payload["name"], "Tacos Al Pastor");
        assert_eq!(payload["notes"], "Sin cilantro");
    }

    #[test]
    fn test_slash_commands() {
        let mut r = resolver();

        assert!(matches!(
            process_slash_command("/threshold 0.5", &mut r),
            Some(CommandResult::Handled(_))
        ));
        assert_eq!(r.threshold(), 0.5);

        process_slash_command("/threshold 3", &mut r);
        assert_eq!(r.threshold(), 0.5);

        process_slash_command("/strategy damerau", &mut r);
        assert_eq!(r.strategy(), FuzzyStrategy::Damerau);

        process_slash_command("/locale en", &mut r);
        assert_eq!(r.locale_setting(), LocaleSetting::En);

        process_slash_command("/explain", &mut r);
        assert!(r.explain());

        assert!(process_slash_command("/status", &mut r).is_some());
        assert!(matches!(
            process_slash_command("/quit", &mut r),
            Some(CommandResult::Shutdown)
        ));
        assert!(process_slash_command("/unknown", &mut r).is_none());
        assert!(process_slash_command("not a command", &mut r).is_none());
    }

    #[test]
    fn test_slash_confirm() {
        let mut r = resolver();
        assert_eq!(
            process_slash_command("/confirm", &mut r),
            Some(CommandResult::Handled("Nothing pending".to_string()))
        );

        r.resolve("borra la orden 9");
        match process_slash_command("/confirm", &mut r) {
            Some(CommandResult::Resolved(resolved)) => {
                assert_eq!(resolved.intent, intents::CONFIRM_LAST)
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(r.pending().is_none());
    }
}
