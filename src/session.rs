//! Assistant chat session: transcript ownership and the exchange cycle.
//!
//! One [`AssistantSession`] serves one chat screen. Each accepted
//! [`AssistantSession::submit`] appends the user's turn, calls the provider
//! once, and appends exactly one assistant turn: the reply, or
//! [`APOLOGY_TEXT`] when anything about the call failed. At most one exchange
//! is in flight; a second submit during an exchange is rejected rather than
//! queued.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AssistantConfig;
use crate::profile::{SelectedCountry, SessionContext};
use crate::prompt;
use crate::providers::{CompletionRequest, LlmProvider, Message, ProviderError};

/// Assistant turn text used for every failed exchange.
pub const APOLOGY_TEXT: &str = "Sorry, I encountered an error. Please try again.";

const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// Who wrote a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person chatting.
    User,
    /// The model, or the apology standing in for it.
    Assistant,
}

/// One message in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Zero-based position in the transcript.
    pub position: usize,
    /// Author.
    pub sender: Sender,
    /// Message text, verbatim.
    pub text: String,
    /// When the turn was appended.
    pub sent_at: DateTime<Utc>,
}

/// Append-only, insertion-ordered list of turns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// All turns in order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether nothing has been said yet.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn append(&mut self, sender: Sender, text: String) -> Turn {
        let turn = Turn {
            position: self.turns.len(),
            sender,
            text,
            sent_at: Utc::now(),
        };
        self.turns.push(turn.clone());
        turn
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Exchange state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Ready to accept a message.
    Idle,
    /// A provider call is outstanding.
    AwaitingResponse,
}

/// Why a submission was not accepted. Nothing is recorded in either case.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// The text was empty after trimming.
    #[error("message is empty")]
    EmptyInput,
    /// Another exchange has not finished yet.
    #[error("an exchange is already in flight")]
    ExchangeInFlight,
    /// The requested suggestion does not exist.
    #[error("no suggested question at index {index}")]
    UnknownSuggestion {
        /// Requested index.
        index: usize,
    },
}

/// Per-session tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Upper bound on one provider call.
    pub timeout: Duration,
    /// Optional cap on reply length.
    pub max_tokens: Option<u32>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_EXCHANGE_TIMEOUT,
            max_tokens: None,
        }
    }
}

impl From<&AssistantConfig> for SessionOptions {
    fn from(config: &AssistantConfig) -> Self {
        Self {
            timeout: config.timeout(),
            max_tokens: config.max_tokens,
        }
    }
}

#[derive(Debug)]
struct SessionInner {
    context: SessionContext,
    transcript: Transcript,
    state: SessionState,
}

/// A chat session with the expatriation assistant.
///
/// `Send + Sync`; share it behind an `Arc` if the presentation layer drives
/// it from several tasks. The internal lock is never held across an
/// `.await`, so accessors are synchronous.
pub struct AssistantSession {
    id: Uuid,
    provider: Arc<dyn LlmProvider>,
    options: SessionOptions,
    inner: Mutex<SessionInner>,
}

impl std::fmt::Debug for AssistantSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantSession")
            .field("id", &self.id)
            .field("model", &self.provider.model_id())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl AssistantSession {
    /// Start a session with an empty transcript.
    pub fn new(
        context: SessionContext,
        provider: Arc<dyn LlmProvider>,
        options: SessionOptions,
    ) -> Self {
        let id = Uuid::new_v4();
        info!(
            session_id = %id,
            model = provider.model_id(),
            country = context.country.as_ref().map(|c| c.code.as_str()),
            category = context.category.as_ref().map(|c| c.key.as_str()),
            "assistant session started"
        );
        Self {
            id,
            provider,
            options,
            inner: Mutex::new(SessionInner {
                context,
                transcript: Transcript::default(),
                state: SessionState::Idle,
            }),
        }
    }

    /// Session identifier used in logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Send one user message and wait for the assistant's turn.
    ///
    /// Returns the appended assistant turn. Provider failures are not errors
    /// here: they produce an [`APOLOGY_TEXT`] turn.
    ///
    /// # Errors
    ///
    /// [`SubmitError::EmptyInput`] for blank text and
    /// [`SubmitError::ExchangeInFlight`] while another exchange is running.
    /// Neither changes the transcript.
    pub async fn submit(&self, text: &str) -> Result<Turn, SubmitError> {
        if text.trim().is_empty() {
            debug!(session_id = %self.id, "ignoring empty submission");
            return Err(SubmitError::EmptyInput);
        }

        let system = {
            let mut inner = self.lock_inner();
            if inner.state == SessionState::AwaitingResponse {
                warn!(session_id = %self.id, "submission rejected, exchange in flight");
                return Err(SubmitError::ExchangeInFlight);
            }
            inner.transcript.append(Sender::User, text.to_owned());
            inner.state = SessionState::AwaitingResponse;
            prompt::build_for_context(&inner.context)
        };

        let mut in_flight = InFlight {
            session: self,
            armed: true,
        };

        let request = CompletionRequest {
            system: Some(system),
            messages: vec![Message::user(text)],
            max_tokens: self.options.max_tokens,
        };

        let started = Instant::now();
        let outcome = match tokio::time::timeout(
            self.options.timeout,
            self.provider.complete(request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                secs: self.options.timeout.as_secs(),
            }),
        };
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let reply = match outcome {
            Ok(response) => {
                debug!(
                    session_id = %self.id,
                    elapsed_ms,
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    finish_reason = response.finish_reason.as_deref(),
                    "exchange completed"
                );
                response.text
            }
            Err(e) => {
                warn!(
                    session_id = %self.id,
                    elapsed_ms,
                    kind = e.kind(),
                    error = %e,
                    "exchange failed, replying with apology"
                );
                APOLOGY_TEXT.to_owned()
            }
        };

        in_flight.armed = false;
        let mut inner = self.lock_inner();
        let turn = inner.transcript.append(Sender::Assistant, reply);
        inner.state = SessionState::Idle;
        Ok(turn)
    }

    /// Submit the suggestion at `index` of [`Self::suggested_questions`].
    ///
    /// # Errors
    ///
    /// [`SubmitError::UnknownSuggestion`] for an out-of-range index, otherwise
    /// as [`Self::submit`].
    pub async fn submit_suggestion(&self, index: usize) -> Result<Turn, SubmitError> {
        let question = self
            .suggested_questions()
            .into_iter()
            .nth(index)
            .ok_or(SubmitError::UnknownSuggestion { index })?;
        self.submit(&question).await
    }

    /// Suggestion shortcuts for the active topic, or the generic fallback.
    pub fn suggested_questions(&self) -> Vec<String> {
        let inner = self.lock_inner();
        prompt::suggested_questions(inner.context.category.as_ref())
    }

    /// Change destination for the rest of the session.
    ///
    /// The transcript is kept; the next exchange's prompt names the new
    /// country. An exchange already in flight keeps the prompt it was sent
    /// with.
    pub fn switch_country(&self, country: SelectedCountry) {
        let mut inner = self.lock_inner();
        info!(
            session_id = %self.id,
            from = inner.context.country.as_ref().map(|c| c.code.as_str()),
            to = %country.code,
            "switching country"
        );
        inner.context.country = Some(country);
    }

    /// Snapshot of the transcript.
    pub fn transcript(&self) -> Transcript {
        self.lock_inner().transcript.clone()
    }

    /// Current exchange state.
    pub fn state(&self) -> SessionState {
        self.lock_inner().state
    }

    /// Snapshot of the session context.
    pub fn context(&self) -> SessionContext {
        self.lock_inner().context.clone()
    }

    /// The system prompt the next exchange would send.
    pub fn system_prompt(&self) -> String {
        prompt::build_for_context(&self.lock_inner().context)
    }

    /// The guarded state stays consistent at every unlock, so a poisoned
    /// lock is recovered rather than propagated.
    fn lock_inner(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Closes an exchange whose `submit` future was dropped before the provider
/// answered, so the transcript still pairs every user turn with one
/// assistant turn.
struct InFlight<'a> {
    session: &'a AssistantSession,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.session.lock_inner();
        inner
            .transcript
            .append(Sender::Assistant, APOLOGY_TEXT.to_owned());
        inner.state = SessionState::Idle;
        warn!(session_id = %self.session.id, "exchange abandoned before completion");
    }
}
