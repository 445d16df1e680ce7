//! Message-intent processing pipeline.
//!
//! One inbound message flows through a fixed sequence: resolve the user,
//! classify intent, then branch into recording a ledger entry, running a
//! report cycle, both, or just greeting, and reply. Stages are strictly sequential
//! because each depends on the previous stage's output.
//!
//! The orchestrator owns two guarantees:
//! - exactly one outbound reply per inbound message, success or failure;
//! - no error ever propagates past [`Pipeline::handle_message`].

use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::aggregate;
use crate::extract::{self, ExtractError};
use crate::messaging::OutboundMessenger;
use crate::prompts;
use crate::providers::{LlmProvider, ProviderError};
use crate::query::{self, QueryRejected};
use crate::store::{LedgerStore, StoreError};
use crate::types::{InboundMessage, RecordedEntry, ReportRow, TransactionDraft, UserIntent};

/// Fixed apology sent in place of the intended reply when any stage fails.
pub const APOLOGY_REPLY: &str = "Sorry, something went wrong on my side and I \
couldn't handle that message. Please try again in a moment.";

/// Everything that can go wrong between receiving a message and composing
/// its reply. Each variant converts to the same apology at the boundary;
/// the distinction exists for logging and for the write-conflict retry.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Store failure: unavailable, conflicted write, or rejected query.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Oracle transport failure, including timeouts.
    #[error("oracle call failed: {0}")]
    Oracle(#[from] ProviderError),

    /// Oracle output could not be parsed into the expected structure.
    #[error(transparent)]
    MalformedOutput(#[from] ExtractError),

    /// Synthesized query failed safety validation; it was never executed.
    #[error(transparent)]
    UnsafeQuery(#[from] QueryRejected),
}

/// Processing stage of one message, for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    ResolvingUser,
    Classifying,
    Writing,
    Querying,
    Greeting,
    Responding,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Self::ResolvingUser => "resolving_user",
            Self::Classifying => "classifying",
            Self::Writing => "writing",
            Self::Querying => "querying",
            Self::Greeting => "greeting",
            Self::Responding => "responding",
        }
    }
}

fn enter_stage(trace_id: Uuid, stage: Stage) {
    info!(%trace_id, stage = stage.as_str(), "stage entered");
}

/// The pipeline orchestrator.
///
/// Stateless across messages; every dependency is shared behind an `Arc`
/// and constructed once at startup. Independent messages run through
/// independent tokio tasks with no coordination.
pub struct Pipeline {
    store: Arc<dyn LedgerStore>,
    oracle: Arc<dyn LlmProvider>,
    messenger: Arc<dyn OutboundMessenger>,
}

impl Pipeline {
    /// Wire up a pipeline from its three collaborators.
    pub fn new(
        store: Arc<dyn LedgerStore>,
        oracle: Arc<dyn LlmProvider>,
        messenger: Arc<dyn OutboundMessenger>,
    ) -> Self {
        Self {
            store,
            oracle,
            messenger,
        }
    }

    /// Process one inbound message end to end.
    ///
    /// Infallible by construction: any stage failure is converted into the
    /// fixed apology reply, and a failed delivery of that reply is logged
    /// and swallowed. Exactly one send is attempted per call.
    pub async fn handle_message(&self, message: InboundMessage) {
        let trace_id = Uuid::new_v4();
        info!(
            %trace_id,
            handle = %message.contact_handle,
            chars = message.text.len(),
            "processing inbound message"
        );

        let reply = match self.process(trace_id, &message).await {
            Ok(text) => text,
            Err(e) => {
                error!(%trace_id, error = %e, stage = "failed", "pipeline stage failed, replying with apology");
                APOLOGY_REPLY.to_owned()
            }
        };

        match self.messenger.send_text(&message.contact_handle, &reply).await {
            Ok(()) => info!(%trace_id, stage = "done", "reply delivered"),
            Err(e) => {
                // At-most-once delivery: no retry, nothing propagates.
                warn!(%trace_id, error = %e, "reply delivery failed, dropping");
            }
        }
    }

    /// Run the stages for one message and compose the reply text.
    async fn process(
        &self,
        trace_id: Uuid,
        message: &InboundMessage,
    ) -> Result<String, PipelineError> {
        enter_stage(trace_id, Stage::ResolvingUser);
        let user_id = self
            .store
            .find_or_create_user(&message.contact_handle)
            .await?;

        enter_stage(trace_id, Stage::Classifying);
        let oracle_text = self
            .oracle
            .generate(&prompts::intent_classification(&message.text))
            .await?;
        let intent = extract::parse_intent(&oracle_text)?;

        match intent {
            UserIntent::Create(draft) => {
                enter_stage(trace_id, Stage::Writing);
                let entry = self.record_with_retry(trace_id, user_id, &draft).await?;

                enter_stage(trace_id, Stage::Responding);
                Ok(acknowledgement(&entry))
            }
            UserIntent::Read => {
                enter_stage(trace_id, Stage::Querying);
                let rows = self.report_cycle(user_id, &message.text).await?;

                enter_stage(trace_id, Stage::Responding);
                self.narrate(&rows, &message.text, None).await
            }
            UserIntent::Both(draft) => {
                enter_stage(trace_id, Stage::Writing);
                let entry = self.record_with_retry(trace_id, user_id, &draft).await?;

                // The question is embedded somewhere in the full message;
                // the synthesizer sees all of it.
                enter_stage(trace_id, Stage::Querying);
                let rows = self.report_cycle(user_id, &message.text).await?;

                enter_stage(trace_id, Stage::Responding);
                self.narrate(&rows, &message.text, Some(&entry)).await
            }
            UserIntent::Other => {
                enter_stage(trace_id, Stage::Greeting);
                enter_stage(trace_id, Stage::Responding);
                let reply = self
                    .oracle
                    .generate(&prompts::introduction(&message.text))
                    .await?;
                Ok(reply.trim().to_owned())
            }
        }
    }

    /// Record a ledger entry, retrying a write conflict exactly once.
    async fn record_with_retry(
        &self,
        trace_id: Uuid,
        user_id: i64,
        draft: &TransactionDraft,
    ) -> Result<RecordedEntry, PipelineError> {
        match self.store.record_entry(user_id, draft).await {
            Ok(entry) => Ok(entry),
            Err(StoreError::WriteConflict(first)) => {
                warn!(%trace_id, error = %first, "write conflict, retrying once");
                self.store
                    .record_entry(user_id, draft)
                    .await
                    .map_err(Into::into)
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Synthesize, validate, execute, and reconcile one report query.
    async fn report_cycle(
        &self,
        user_id: i64,
        question: &str,
    ) -> Result<Vec<ReportRow>, PipelineError> {
        let oracle_text = self
            .oracle
            .generate(&prompts::report_query(question, user_id))
            .await?;
        let report = query::parse_report_query(&oracle_text)?;
        query::validate_report_query(&report, user_id)?;

        let rows = self.store.run_report(&report, user_id).await?;
        Ok(aggregate::reconcile(rows, question))
    }

    /// Turn rows (and an optional write acknowledgement) into reply text.
    async fn narrate(
        &self,
        rows: &[ReportRow],
        question: &str,
        ack: Option<&RecordedEntry>,
    ) -> Result<String, PipelineError> {
        let reply = self
            .oracle
            .generate(&prompts::narrate_report(rows, question, ack))
            .await?;
        Ok(reply.trim().to_owned())
    }
}

/// Fixed acknowledgement for a recorded entry; no oracle round trip.
fn acknowledgement(entry: &RecordedEntry) -> String {
    match &entry.description {
        Some(description) => format!(
            "Got it! Recorded your {} of ₹{} ({}).",
            entry.kind.as_str(),
            entry.total_amount,
            description
        ),
        None => format!(
            "Got it! Recorded your {} of ₹{}.",
            entry.kind.as_str(),
            entry.total_amount
        ),
    }
}
