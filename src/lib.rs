//! nura - voice/text intent console core
//!
//! Resolves free-text utterances into confidence-scored intents, coordinates
//! yes/no confirmation for destructive commands, and runs an
//! Intent -> Approval -> Execute session lifecycle.

pub mod catalog;
pub mod command;
pub mod config;
pub mod context;
pub mod events;
pub mod fuzzy;
pub mod locale;
pub mod matcher;
pub mod numerals;
pub mod repl;
pub mod session;
pub mod wake;

pub use command::{CommandResolver, ResolvedIntent};
pub use config::{Config, ConfigError};
pub use context::{ConfirmationResult, ContextManager, PendingAction};
pub use events::ConsoleEvent;
pub use locale::{Locale, LocaleSetting};
pub use matcher::{FuzzyStrategy, IntentCandidate, IntentMatcher, MatchedBy};
pub use session::{Approval, IntentExecutor, IntentSession, IntentValidator, SessionError};
pub use wake::{WakeMatch, WakeVia, WakeWordStripper};
