//! Upload workflow
//!
//! ```text
//! Idle -> Validating -> Encrypting -> Submitting -> Confirming -> Succeeded
//!   ^         |             |             |             |            |
//!   |         v             +-------------+-------------+--> Failed  |
//!   +---- (message) <----------------- status timer <----------------+
//! ```
//!
//! [`transition`] is the pure state machine: it maps (state, event) to
//! (next state, effects) and performs no I/O. [`UploadWorkflow`] is the runner
//! that executes the effects against the collaborators and feeds the results
//! back in as events. Only one upload may be in flight per session; a submit
//! is accepted only from `Idle`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::config::WorkflowConfig;
use crate::domain::{
    CreateRecordRequest, EncryptedScore, HistoryAction, HistoryLog, RecordId, Score, TxReceipt,
};
use crate::gateway::EncryptionGateway;
use crate::infra::{AuditError, LedgerWriter, PendingTransaction, RecordStore, MSG_UPLOAD_FAILED};

pub const MSG_ENCRYPTING: &str = "Encrypting code with FHE...";
pub const MSG_UPLOADING: &str = "Uploading encrypted audit...";
pub const MSG_UPLOAD_SUCCEEDED: &str = "Audit uploaded successfully!";
pub const MSG_CONNECT_FIRST: &str = "Please connect wallet first";
pub const MSG_NAME_REQUIRED: &str = "Project name is required";

/// Phase of the upload state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadPhase {
    Idle,
    Validating,
    Encrypting,
    Submitting,
    Confirming,
    Succeeded,
    Failed,
}

impl UploadPhase {
    /// Between accepting a submit and reaching a terminal phase
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            UploadPhase::Validating
                | UploadPhase::Encrypting
                | UploadPhase::Submitting
                | UploadPhase::Confirming
        )
    }
}

/// User input for a new record.
///
/// Scores are clamped on assignment, so only the name can be invalid.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UploadForm {
    pub name: String,
    pub description: String,
    pub complexity: Score,
    pub vulnerability_score: Score,
}

impl UploadForm {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_complexity(mut self, value: i64) -> Self {
        self.complexity = Score::clamped(value);
        self
    }

    pub fn with_vulnerability_score(mut self, value: i64) -> Self {
        self.vulnerability_score = Score::clamped(value);
        self
    }

    pub fn set_complexity(&mut self, value: i64) {
        self.complexity = Score::clamped(value);
    }

    pub fn set_vulnerability_score(&mut self, value: i64) {
        self.vulnerability_score = Score::clamped(value);
    }
}

/// Banner kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Pending,
    Success,
    Error,
}

/// User-visible transaction banner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStatus {
    pub kind: StatusKind,
    pub message: String,
}

impl TransactionStatus {
    pub fn pending(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Pending,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            message: message.into(),
        }
    }
}

/// Full state of the upload state machine
#[derive(Debug, Clone, PartialEq)]
pub struct UploadState {
    pub phase: UploadPhase,
    pub form: UploadForm,
    pub form_open: bool,
    pub status: Option<TransactionStatus>,
    /// Bumped on every status change; stale clear timers carry an old value
    pub status_token: u64,
    pub record_id: Option<RecordId>,
    pub submitter: Option<Address>,
    pub tx_hash: Option<TxHash>,
    pub success_clear_delay: Duration,
    pub error_clear_delay: Duration,
}

impl UploadState {
    pub fn new(config: &WorkflowConfig) -> Self {
        Self {
            phase: UploadPhase::Idle,
            form: UploadForm::default(),
            form_open: false,
            status: None,
            status_token: 0,
            record_id: None,
            submitter: None,
            tx_hash: None,
            success_clear_delay: config.success_clear_delay,
            error_clear_delay: config.error_clear_delay,
        }
    }

    pub fn is_uploading(&self) -> bool {
        self.phase.is_in_flight()
    }

    fn show_status(&mut self, status: TransactionStatus) -> u64 {
        self.status = Some(status);
        self.status_token += 1;
        self.status_token
    }

    fn fail(&mut self, error: &AuditError) -> Vec<UploadEffect> {
        self.phase = UploadPhase::Failed;
        let token = self.show_status(TransactionStatus::error(error.user_message()));
        vec![UploadEffect::ScheduleStatusClear {
            token,
            after: self.error_clear_delay,
        }]
    }

    fn reset_upload(&mut self) {
        self.record_id = None;
        self.submitter = None;
        self.tx_hash = None;
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    OpenForm,
    CloseForm,
    EditForm(UploadForm),
    Submit {
        record_id: RecordId,
        submitter: Option<Address>,
    },
    Validated,
    ValidationFailed(String),
    Encrypted(EncryptedScore),
    EncryptionFailed(AuditError),
    Submitted { tx_hash: TxHash },
    SubmissionFailed(AuditError),
    Confirmed(TxReceipt),
    ConfirmationFailed(AuditError),
    StatusElapsed { token: u64 },
}

/// Work the runner must perform
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEffect {
    Validate {
        form: UploadForm,
        submitter: Option<Address>,
    },
    Encrypt {
        submitter: Address,
        score: Score,
    },
    SubmitCreate(CreateRecordRequest),
    AwaitConfirmation,
    AppendHistory(HistoryAction),
    RefreshRecords,
    ScheduleStatusClear { token: u64, after: Duration },
}

/// Pure transition of the upload state machine.
///
/// Events that do not apply to the current phase leave the state unchanged
/// and produce no effects.
pub fn transition(state: &UploadState, event: UploadEvent) -> (UploadState, Vec<UploadEffect>) {
    let mut next = state.clone();
    let effects = match (state.phase, event) {
        (_, UploadEvent::OpenForm) => {
            next.form_open = true;
            vec![]
        }
        (_, UploadEvent::CloseForm) => {
            next.form_open = false;
            vec![]
        }
        (phase, UploadEvent::EditForm(form)) if !phase.is_in_flight() => {
            next.form = form;
            vec![]
        }
        (UploadPhase::Idle, UploadEvent::Submit {
            record_id,
            submitter,
        }) => {
            next.phase = UploadPhase::Validating;
            next.record_id = Some(record_id);
            next.submitter = submitter;
            vec![UploadEffect::Validate {
                form: next.form.clone(),
                submitter,
            }]
        }
        (UploadPhase::Validating, UploadEvent::Validated) => match next.submitter {
            Some(submitter) => {
                next.phase = UploadPhase::Encrypting;
                next.show_status(TransactionStatus::pending(MSG_ENCRYPTING));
                vec![UploadEffect::Encrypt {
                    submitter,
                    score: next.form.vulnerability_score,
                }]
            }
            None => reject_input(&mut next, MSG_CONNECT_FIRST),
        },
        (UploadPhase::Validating, UploadEvent::ValidationFailed(message)) => {
            reject_input(&mut next, &message)
        }
        (UploadPhase::Encrypting, UploadEvent::Encrypted(encrypted)) => match next.record_id.clone() {
            Some(id) => {
                next.phase = UploadPhase::Submitting;
                next.show_status(TransactionStatus::pending(MSG_UPLOADING));
                vec![UploadEffect::SubmitCreate(CreateRecordRequest {
                    id,
                    name: next.form.name.clone(),
                    description: next.form.description.clone(),
                    public_vulnerability_score: next.form.vulnerability_score,
                    public_complexity: next.form.complexity,
                    encrypted,
                })]
            }
            None => next.fail(&AuditError::Internal("upload has no record id".into())),
        },
        (UploadPhase::Encrypting, UploadEvent::EncryptionFailed(err)) => next.fail(&err),
        (UploadPhase::Submitting, UploadEvent::Submitted { tx_hash }) => {
            next.phase = UploadPhase::Confirming;
            next.tx_hash = Some(tx_hash);
            vec![UploadEffect::AwaitConfirmation]
        }
        (UploadPhase::Submitting, UploadEvent::SubmissionFailed(err)) => next.fail(&err),
        (UploadPhase::Confirming, UploadEvent::Confirmed(_receipt)) => {
            next.phase = UploadPhase::Succeeded;
            let token = next.show_status(TransactionStatus::success(MSG_UPLOAD_SUCCEEDED));
            vec![
                UploadEffect::AppendHistory(HistoryAction::Uploaded {
                    name: next.form.name.clone(),
                }),
                UploadEffect::RefreshRecords,
                UploadEffect::ScheduleStatusClear {
                    token,
                    after: next.success_clear_delay,
                },
            ]
        }
        (UploadPhase::Confirming, UploadEvent::ConfirmationFailed(err)) => next.fail(&err),
        (phase, UploadEvent::StatusElapsed { token }) if token == state.status_token => {
            match phase {
                UploadPhase::Succeeded => {
                    next.form = UploadForm::default();
                    next.form_open = false;
                    next.phase = UploadPhase::Idle;
                    next.reset_upload();
                }
                UploadPhase::Failed => {
                    next.phase = UploadPhase::Idle;
                    next.reset_upload();
                }
                _ => {}
            }
            if !phase.is_in_flight() {
                next.status = None;
            }
            vec![]
        }
        _ => return (next, vec![]),
    };
    (next, effects)
}

/// Validation failure: back to idle with a message, nothing sent anywhere
fn reject_input(next: &mut UploadState, message: &str) -> Vec<UploadEffect> {
    next.phase = UploadPhase::Idle;
    next.reset_upload();
    let token = next.show_status(TransactionStatus::error(message));
    vec![UploadEffect::ScheduleStatusClear {
        token,
        after: next.error_clear_delay,
    }]
}

/// Check the user input before anything leaves the client
pub fn validate_upload(form: &UploadForm, submitter: Option<Address>) -> Result<(), AuditError> {
    if submitter.is_none() {
        return Err(AuditError::Validation(MSG_CONNECT_FIRST.into()));
    }
    if form.name.trim().is_empty() {
        return Err(AuditError::Validation(MSG_NAME_REQUIRED.into()));
    }
    Ok(())
}

/// How a call to [`UploadWorkflow::submit`] ended
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// The record is confirmed on-ledger
    Succeeded {
        record_id: RecordId,
        receipt: TxReceipt,
    },
    /// Input was rejected before any external call
    Invalid { message: String },
    /// An external call failed; `message` is what the user sees
    Failed { message: String, error: AuditError },
    /// Another upload is in flight or its status is still displayed
    Busy,
}

/// Runner executing the upload state machine against the collaborators
pub struct UploadWorkflow {
    state: Arc<RwLock<UploadState>>,
    contract: Address,
    encryption: EncryptionGateway,
    writer: Arc<dyn LedgerWriter>,
    store: Arc<RecordStore>,
    history: Arc<HistoryLog>,
}

impl UploadWorkflow {
    pub fn new(
        config: &WorkflowConfig,
        contract: Address,
        encryption: EncryptionGateway,
        writer: Arc<dyn LedgerWriter>,
        store: Arc<RecordStore>,
        history: Arc<HistoryLog>,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(UploadState::new(config))),
            contract,
            encryption,
            writer,
            store,
            history,
        }
    }

    /// Snapshot of the state machine
    pub async fn state(&self) -> UploadState {
        self.state.read().await.clone()
    }

    pub async fn is_uploading(&self) -> bool {
        self.state.read().await.is_uploading()
    }

    pub async fn open_form(&self) {
        self.dispatch(UploadEvent::OpenForm).await;
    }

    pub async fn close_form(&self) {
        self.dispatch(UploadEvent::CloseForm).await;
    }

    /// Replace the form contents; ignored while an upload is in flight
    pub async fn edit_form(&self, form: UploadForm) {
        self.dispatch(UploadEvent::EditForm(form)).await;
    }

    /// Run one upload of the current form on behalf of `submitter`.
    ///
    /// Never fails: every failure ends up as a status message and an
    /// [`UploadOutcome`].
    #[instrument(skip(self, submitter), fields(contract = %self.contract))]
    pub async fn submit(&self, submitter: Option<Address>) -> UploadOutcome {
        let record_id = RecordId::generate();
        let effects = {
            let mut state = self.state.write().await;
            if state.phase != UploadPhase::Idle {
                warn!(phase = ?state.phase, "Upload rejected: another upload is active");
                return UploadOutcome::Busy;
            }
            let (next, effects) = transition(
                &state,
                UploadEvent::Submit {
                    record_id: record_id.clone(),
                    submitter,
                },
            );
            *state = next;
            effects
        };

        info!(record_id = %record_id, "Upload started");

        let mut queue: VecDeque<UploadEffect> = effects.into();
        let mut pending: Option<Box<dyn PendingTransaction>> = None;
        let mut outcome = UploadOutcome::Failed {
            message: MSG_UPLOAD_FAILED.to_string(),
            error: AuditError::Internal("upload ended without a terminal event".into()),
        };

        while let Some(effect) = queue.pop_front() {
            let Some(event) = self.run_effect(effect, &mut pending).await else {
                continue;
            };
            if let Some(terminal) = terminal_outcome(&record_id, &event) {
                outcome = terminal;
            }
            queue.extend(self.dispatch(event).await);
        }

        match &outcome {
            UploadOutcome::Succeeded { receipt, .. } => {
                info!(record_id = %record_id, tx_hash = %receipt.tx_hash, "Upload confirmed")
            }
            UploadOutcome::Invalid { message } => debug!(%message, "Upload input rejected"),
            UploadOutcome::Failed { error, .. } => {
                error!(record_id = %record_id, error_kind = error.kind(), error = %error, "Upload failed")
            }
            UploadOutcome::Busy => {}
        }
        outcome
    }

    async fn dispatch(&self, event: UploadEvent) -> Vec<UploadEffect> {
        let mut state = self.state.write().await;
        let (next, effects) = transition(&state, event);
        *state = next;
        effects
    }

    async fn run_effect(
        &self,
        effect: UploadEffect,
        pending: &mut Option<Box<dyn PendingTransaction>>,
    ) -> Option<UploadEvent> {
        match effect {
            UploadEffect::Validate { form, submitter } => Some(match validate_upload(&form, submitter) {
                Ok(()) => UploadEvent::Validated,
                Err(AuditError::Validation(message)) => UploadEvent::ValidationFailed(message),
                Err(other) => UploadEvent::ValidationFailed(other.to_string()),
            }),
            UploadEffect::Encrypt { submitter, score } => Some(
                match self
                    .encryption
                    .encrypt_score(self.contract, submitter, score)
                    .await
                {
                    Ok(encrypted) => UploadEvent::Encrypted(encrypted),
                    Err(e) => UploadEvent::EncryptionFailed(e),
                },
            ),
            UploadEffect::SubmitCreate(request) => Some(match self.writer.create_record(request).await {
                Ok(tx) => {
                    let tx_hash = tx.tx_hash();
                    debug!(%tx_hash, "Creation transaction sent");
                    *pending = Some(tx);
                    UploadEvent::Submitted { tx_hash }
                }
                Err(e) => UploadEvent::SubmissionFailed(e),
            }),
            UploadEffect::AwaitConfirmation => Some(match pending.take() {
                Some(mut tx) => match tx.await_confirmation().await {
                    Ok(receipt) => UploadEvent::Confirmed(receipt),
                    Err(e) => UploadEvent::ConfirmationFailed(e),
                },
                None => UploadEvent::ConfirmationFailed(AuditError::Internal(
                    "no pending transaction to confirm".into(),
                )),
            }),
            UploadEffect::AppendHistory(action) => {
                self.history.append(action).await;
                None
            }
            UploadEffect::RefreshRecords => {
                if let Err(e) = self.store.load_all().await {
                    warn!(error = %e, "Record refresh after upload failed");
                }
                None
            }
            UploadEffect::ScheduleStatusClear { token, after } => {
                let state = Arc::clone(&self.state);
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let mut state = state.write().await;
                    let (next, _) = transition(&state, UploadEvent::StatusElapsed { token });
                    *state = next;
                });
                None
            }
        }
    }
}

fn terminal_outcome(record_id: &RecordId, event: &UploadEvent) -> Option<UploadOutcome> {
    match event {
        UploadEvent::Confirmed(receipt) => Some(UploadOutcome::Succeeded {
            record_id: record_id.clone(),
            receipt: *receipt,
        }),
        UploadEvent::ValidationFailed(message) => Some(UploadOutcome::Invalid {
            message: message.clone(),
        }),
        UploadEvent::EncryptionFailed(error)
        | UploadEvent::SubmissionFailed(error)
        | UploadEvent::ConfirmationFailed(error) => Some(UploadOutcome::Failed {
            message: error.user_message().to_string(),
            error: error.clone(),
        }),
        _ => None,
    }
}
