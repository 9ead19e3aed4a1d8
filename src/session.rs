//! Intent session - Intent -> Approval -> Execute lifecycle
//!
//! A session holds one intent at a time. `start` validates the payload and asks
//! the validator for approval; a denied intent parks in `approval` until the
//! caller approves or rejects it. Execution only happens with approval.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid intent payload: {0}")]
    InvalidPayload(String),
    #[error("no active intent")]
    NoActiveIntent,
    #[error("session is not awaiting approval (status: {status})")]
    InvalidState { status: SessionStatus },
    #[error("execution failed: {0}")]
    Execution(anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Pending,
    Approval,
    Executing,
    Done,
    Rejected,
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Pending => "pending",
            SessionStatus::Approval => "approval",
            SessionStatus::Executing => "executing",
            SessionStatus::Done => "done",
            SessionStatus::Rejected => "rejected",
            SessionStatus::Error => "error",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated intent request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentPayload {
    pub intent: String,
    pub parameters: Map<String, Value>,
    pub locale: String,
    pub metadata: Map<String, Value>,
}

impl IntentPayload {
    pub const DEFAULT_LOCALE: &'static str = "en-US";

    pub fn from_value(value: Value) -> Result<Self, SessionError> {
        let Value::Object(mut fields) = value else {
            return Err(SessionError::InvalidPayload(
                "payload must be an object".to_string(),
            ));
        };

        let intent = match fields.remove("intent") {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            _ => {
                return Err(SessionError::InvalidPayload(
                    "intent must be a non-empty string".to_string(),
                ));
            }
        };

        let parameters = match fields.remove("parameters") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(SessionError::InvalidPayload(
                    "parameters must be an object".to_string(),
                ));
            }
        };

        let locale = match fields.remove("locale") {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            _ => Self::DEFAULT_LOCALE.to_string(),
        };

        let metadata = match fields.remove("metadata") {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };

        Ok(Self {
            intent,
            parameters,
            locale,
            metadata,
        })
    }
}

/// Validator verdict
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Approval {
    Approved {
        metadata: Map<String, Value>,
    },
    Denied {
        reason: String,
        metadata: Map<String, Value>,
    },
}

impl Approval {
    pub fn approved() -> Self {
        Approval::Approved {
            metadata: Map::new(),
        }
    }

    pub fn denied(reason: &str) -> Self {
        Approval::Denied {
            reason: reason.to_string(),
            metadata: Map::new(),
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Approval::Approved { .. })
    }
}

/// `true` approves outright, `false` asks for manual approval
impl From<bool> for Approval {
    fn from(approved: bool) -> Self {
        if approved {
            Approval::approved()
        } else {
            Approval::denied("manual")
        }
    }
}

#[async_trait]
pub trait IntentValidator: Send + Sync {
    async fn validate(&self, intent: &IntentPayload) -> Approval;
}

#[async_trait]
pub trait IntentExecutor: Send + Sync {
    async fn execute(&self, intent: &IntentPayload, approval: &Approval) -> anyhow::Result<Value>;
}

#[async_trait]
impl<F> IntentValidator for F
where
    F: Fn(&IntentPayload) -> Approval + Send + Sync,
{
    async fn validate(&self, intent: &IntentPayload) -> Approval {
        self(intent)
    }
}

/// Executor used when none is injected
pub struct AcknowledgeExecutor;

#[async_trait]
impl IntentExecutor for AcknowledgeExecutor {
    async fn execute(&self, _intent: &IntentPayload, _approval: &Approval) -> anyhow::Result<Value> {
        Ok(json!({ "ok": true }))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntentSessionState {
    pub status: SessionStatus,
    pub intent: Option<IntentPayload>,
    pub approval: Option<Approval>,
    pub result: Option<Value>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionEventKind {
    IntentReceived,
    ApprovalRequired,
    ApprovalGranted,
    ExecutionStarted,
    Executed,
    Rejected,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionEvent {
    #[serde(rename = "type")]
    pub kind: SessionEventKind,
    pub timestamp: i64,
    pub payload: Value,
    pub state: IntentSessionState,
}

pub type Listener = Box<dyn Fn(&SessionEvent) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub struct IntentSession {
    state: IntentSessionState,
    validator: Option<Arc<dyn IntentValidator>>,
    executor: Arc<dyn IntentExecutor>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl Default for IntentSession {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentSession {
    /// Session with no validator (every intent needs manual approval) and the
    /// acknowledging executor
    pub fn new() -> Self {
        Self {
            state: IntentSessionState::default(),
            validator: None,
            executor: Arc::new(AcknowledgeExecutor),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn IntentValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn IntentExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn state(&self) -> &IntentSessionState {
        &self.state
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: Fn(&SessionEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if the id was not subscribed
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub async fn start(&mut self, payload: Value) -> Result<IntentSessionState, SessionError> {
        let intent = IntentPayload::from_value(payload)?;
        info!(intent = %intent.intent, locale = %intent.locale, "intent received");

        self.state = IntentSessionState {
            status: SessionStatus::Pending,
            intent: Some(intent.clone()),
            ..Default::default()
        };
        self.emit(SessionEventKind::IntentReceived, json!({ "intent": intent }));

        let approval = match &self.validator {
            Some(validator) => validator.validate(&intent).await,
            None => Approval::denied("manual"),
        };
        self.state.approval = Some(approval.clone());

        if approval.is_approved() {
            self.emit(
                SessionEventKind::ApprovalGranted,
                json!({ "approval": approval }),
            );
            self.execute().await?;
        } else {
            self.set_status(SessionStatus::Approval);
            self.emit(
                SessionEventKind::ApprovalRequired,
                json!({ "approval": approval }),
            );
        }

        Ok(self.state.clone())
    }

    pub async fn approve(
        &mut self,
        metadata: Option<Map<String, Value>>,
    ) -> Result<IntentSessionState, SessionError> {
        self.ensure_awaiting_approval()?;

        let approval = Approval::Approved {
            metadata: metadata.unwrap_or_default(),
        };
        self.state.approval = Some(approval.clone());
        self.emit(
            SessionEventKind::ApprovalGranted,
            json!({ "approval": approval }),
        );
        self.execute().await?;

        Ok(self.state.clone())
    }

    pub fn reject(&mut self, reason: Option<&str>) -> Result<IntentSessionState, SessionError> {
        self.ensure_awaiting_approval()?;

        let reason = reason.unwrap_or("rejected-by-user");
        self.state.approval = Some(Approval::denied(reason));
        self.set_status(SessionStatus::Rejected);
        self.emit(SessionEventKind::Rejected, json!({ "reason": reason }));

        Ok(self.state.clone())
    }

    fn ensure_awaiting_approval(&self) -> Result<(), SessionError> {
        if self.state.intent.is_none() {
            return Err(SessionError::NoActiveIntent);
        }
        if self.state.status != SessionStatus::Approval {
            return Err(SessionError::InvalidState {
                status: self.state.status,
            });
        }
        Ok(())
    }

    async fn execute(&mut self) -> Result<(), SessionError> {
        let (Some(intent), Some(approval)) = (self.state.intent.clone(), self.state.approval.clone())
        else {
            return Err(SessionError::NoActiveIntent);
        };
        if !approval.is_approved() {
            return Err(SessionError::InvalidState {
                status: self.state.status,
            });
        }

        self.set_status(SessionStatus::Executing);
        self.emit(
            SessionEventKind::ExecutionStarted,
            json!({ "intent": intent.intent }),
        );

        match self.executor.execute(&intent, &approval).await {
            Ok(result) => {
                self.state.result = Some(result.clone());
                self.set_status(SessionStatus::Done);
                self.emit(SessionEventKind::Executed, json!({ "result": result }));
                Ok(())
            }
            Err(e) => {
                warn!(intent = %intent.intent, "execution failed: {:#}", e);
                self.state.error = Some(e.to_string());
                self.set_status(SessionStatus::Error);
                self.emit(SessionEventKind::Error, json!({ "error": e.to_string() }));
                Err(SessionError::Execution(e))
            }
        }
    }

    fn set_status(&mut self, status: SessionStatus) {
        debug!(from = %self.state.status, to = %status, "session transition");
        self.state.status = status;
    }

    fn emit(&self, kind: SessionEventKind, payload: Value) {
        let event = SessionEvent {
            kind,
            timestamp: Utc::now().timestamp_millis(),
            payload,
            state: self.state.clone(),
        };

        for (id, listener) in &self.listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(listener = id.0, ?kind, "session listener failed: {:#}", e),
                Err(_) => warn!(listener = id.0, ?kind, "session listener panicked"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder(session: &mut IntentSession) -> Arc<Mutex<Vec<SessionEventKind>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        session.subscribe(move |event| {
            sink.lock().unwrap().push(event.kind);
            Ok(())
        });
        seen
    }

    struct FailingExecutor;

    #[async_trait]
    impl IntentExecutor for FailingExecutor {
        async fn execute(&self, _: &IntentPayload, _: &Approval) -> anyhow::Result<Value> {
            anyhow::bail!("gateway unreachable")
        }
    }

    #[test]
    fn test_payload_defaults() {
        let payload = IntentPayload::from_value(json!({ "intent": "open::menu:orders" })).unwrap();
        assert_eq!(payload.locale, "en-US");
        assert!(payload.parameters.is_empty());
        assert!(payload.metadata.is_empty());
    }

    #[test]
    fn test_payload_validation() {
        assert!(IntentPayload::from_value(json!("open")).is_err());
        assert!(IntentPayload::from_value(json!({ "intent": "" })).is_err());
        assert!(IntentPayload::from_value(json!({ "intent": 3 })).is_err());
        assert!(
            IntentPayload::from_value(json!({ "intent": "x", "parameters": [1, 2] })).is_err()
        );
    }

    #[tokio::test]
    async fn test_manual_approval_flow() {
        let mut session = IntentSession::new();
        let seen = recorder(&mut session);

        let state = session
            .start(json!({ "intent": "delete::order", "parameters": { "id": 15 } }))
            .await
            .unwrap();
        assert_eq!(state.status, SessionStatus::Approval);
        assert_eq!(state.approval, Some(Approval::denied("manual")));

        let state = session.approve(None).await.unwrap();
        assert_eq!(state.status, SessionStatus::Done);
        assert_eq!(state.result, Some(json!({ "ok": true })));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                SessionEventKind::IntentReceived,
                SessionEventKind::ApprovalRequired,
                SessionEventKind::ApprovalGranted,
                SessionEventKind::ExecutionStarted,
                SessionEventKind::Executed,
            ]
        );
    }

    #[tokio::test]
    async fn test_auto_approval_executes() {
        let validator = |_: &IntentPayload| Approval::from(true);
        let mut session = IntentSession::new().with_validator(Arc::new(validator));
        let state = session.start(json!({ "intent": "open::telemetry" })).await.unwrap();
        assert_eq!(state.status, SessionStatus::Done);
    }

    #[tokio::test]
    async fn test_reject() {
        let mut session = IntentSession::new();
        let seen = recorder(&mut session);
        session.start(json!({ "intent": "delete::order" })).await.unwrap();

        let state = session.reject(None).unwrap();
        assert_eq!(state.status, SessionStatus::Rejected);
        assert_eq!(state.approval, Some(Approval::denied("rejected-by-user")));
        assert!(state.result.is_none());
        assert_eq!(seen.lock().unwrap().last(), Some(&SessionEventKind::Rejected));

        // terminal: no second decision
        assert!(matches!(
            session.approve(None).await,
            Err(SessionError::InvalidState {
                status: SessionStatus::Rejected
            })
        ));
    }

    #[tokio::test]
    async fn test_approve_without_intent() {
        let mut session = IntentSession::new();
        assert!(matches!(
            session.approve(None).await,
            Err(SessionError::NoActiveIntent)
        ));
        assert!(matches!(session.reject(None), Err(SessionError::NoActiveIntent)));
    }

    #[tokio::test]
    async fn test_execution_error() {
        let mut session = IntentSession::new().with_executor(Arc::new(FailingExecutor));
        let seen = recorder(&mut session);
        session.start(json!({ "intent": "mcp::connect" })).await.unwrap();

        let result = session.approve(None).await;
        assert!(matches!(result, Err(SessionError::Execution(_))));
        assert_eq!(session.state().status, SessionStatus::Error);
        assert_eq!(
            session.state().error.as_deref(),
            Some("gateway unreachable")
        );
        assert_eq!(seen.lock().unwrap().last(), Some(&SessionEventKind::Error));
    }

    #[tokio::test]
    async fn test_listener_failures_are_isolated() {
        let mut session = IntentSession::new();
        session.subscribe(|_| anyhow::bail!("listener broke"));
        session.subscribe(|_| panic!("listener panicked"));
        let seen = recorder(&mut session);

        let state = session.start(json!({ "intent": "list" })).await.unwrap();
        assert_eq!(state.status, SessionStatus::Approval);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let mut session = IntentSession::new();
        let seen = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&seen);
        let id = session.subscribe(move |_| {
            *sink.lock().unwrap() += 1;
            Ok(())
        });
        assert!(session.unsubscribe(id));
        assert!(!session.unsubscribe(id));

        session.start(json!({ "intent": "list" })).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_events_carry_state_snapshot() {
        let mut session = IntentSession::new();
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&statuses);
        session.subscribe(move |event| {
            sink.lock().unwrap().push(event.state.status);
            Ok(())
        });
        session.start(json!({ "intent": "x" })).await.unwrap();
        assert_eq!(
            *statuses.lock().unwrap(),
            vec![SessionStatus::Pending, SessionStatus::Approval]
        );
    }
}
