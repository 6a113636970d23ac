//! Audit session
//!
//! The application state container: one record snapshot, one history log and
//! the two workflows, plus the view state (search term, risk filter,
//! selected record) and the availability banner.

use std::sync::Arc;

use alloy::primitives::Address;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::chain::ChainClient;
use crate::config::{ClientConfig, WorkflowConfig};
use crate::domain::{
    compute_stats, filter_records, AuditRecord, HistoryEntry, HistoryLog, RecordId, RiskFilter,
    RiskStatistics,
};
use crate::gateway::{EncryptionGateway, VerificationGateway};
use crate::infra::{
    AuditError, DecryptionOracle, EncryptionOracle, IdentityProvider, LedgerReader, LedgerWriter,
    RecordStore, Result,
};
use crate::workflow::{
    DecryptWorkflow, TransactionStatus, UploadForm, UploadOutcome, UploadState, UploadWorkflow,
};

pub const MSG_SYSTEM_AVAILABLE: &str = "FHE system available!";

/// External collaborators a session is wired to
#[derive(Clone)]
pub struct Collaborators {
    pub reader: Arc<dyn LedgerReader>,
    pub writer: Arc<dyn LedgerWriter>,
    pub encryption: Arc<dyn EncryptionOracle>,
    pub decryption: Arc<dyn DecryptionOracle>,
    pub identity: Arc<dyn IdentityProvider>,
}

#[derive(Debug, Default)]
struct ViewState {
    search_term: String,
    risk_filter: RiskFilter,
    selected: Option<RecordId>,
}

#[derive(Debug, Default)]
struct Banner {
    status: Option<TransactionStatus>,
    token: u64,
}

/// Client session over one audit contract
pub struct AuditSession {
    config: WorkflowConfig,
    reader: Arc<dyn LedgerReader>,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<RecordStore>,
    history: Arc<HistoryLog>,
    upload: UploadWorkflow,
    decrypt: DecryptWorkflow,
    view: RwLock<ViewState>,
    banner: Arc<RwLock<Banner>>,
}

impl AuditSession {
    pub fn new(config: WorkflowConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            reader,
            writer,
            encryption,
            decryption,
            identity,
        } = collaborators;

        let store = Arc::new(RecordStore::new(Arc::clone(&reader)));
        let history = Arc::new(HistoryLog::new());

        let upload = UploadWorkflow::new(
            &config,
            reader.contract_address(),
            EncryptionGateway::new(encryption),
            Arc::clone(&writer),
            Arc::clone(&store),
            Arc::clone(&history),
        );
        let decrypt = DecryptWorkflow::new(
            Arc::clone(&reader),
            writer,
            Arc::clone(&identity),
            VerificationGateway::new(decryption),
            Arc::clone(&store),
            Arc::clone(&history),
        );

        Self {
            config,
            reader,
            identity,
            store,
            history,
            upload,
            decrypt,
            view: RwLock::new(ViewState::default()),
            banner: Arc::new(RwLock::new(Banner::default())),
        }
    }

    /// Build a session over the configured EVM chain.
    ///
    /// The FHE oracles are supplied by the caller; the local signing key
    /// doubles as ledger writer and identity.
    pub fn connect(
        config: &ClientConfig,
        encryption: Arc<dyn EncryptionOracle>,
        decryption: Arc<dyn DecryptionOracle>,
    ) -> Result<Self> {
        let chain_config = config.chain.clone().ok_or_else(|| {
            AuditError::Configuration("no chain configured".to_string())
        })?;
        let client = Arc::new(ChainClient::new(
            chain_config,
            config.workflow.confirmation_poll_interval,
        )?);
        info!(
            contract = %client.contract_address(),
            chain_id = client.chain_id(),
            "Connecting audit session"
        );

        let identity = Arc::new(client.identity());
        Ok(Self::new(
            config.workflow.clone(),
            Collaborators {
                reader: client.clone(),
                writer: client,
                encryption,
                decryption,
                identity,
            },
        ))
    }

    pub fn current_address(&self) -> Option<Address> {
        self.identity.current_address()
    }

    /// Refresh the record snapshot from the ledger.
    ///
    /// Without a connected identity the snapshot is emptied and the ledger is
    /// not contacted.
    #[instrument(skip(self))]
    pub async fn load_records(&self) -> Result<Vec<AuditRecord>> {
        if !self.identity.is_connected() {
            debug!("Not connected, clearing records");
            self.store.clear().await;
            return Ok(Vec::new());
        }
        self.store.load_all().await
    }

    pub async fn records(&self) -> Vec<AuditRecord> {
        self.store.records().await
    }

    /// Records passing the current search term and risk filter
    pub async fn visible_records(&self) -> Vec<AuditRecord> {
        let records = self.store.records().await;
        let view = self.view.read().await;
        filter_records(&records, &view.search_term, view.risk_filter)
    }

    /// Statistics over the full snapshot, independent of the view filters
    pub async fn stats(&self) -> RiskStatistics {
        compute_stats(&self.store.records().await)
    }

    pub async fn recent_history(&self) -> Vec<HistoryEntry> {
        self.history.recent(self.config.history_display_limit).await
    }

    pub async fn set_search_term(&self, term: impl Into<String>) {
        self.view.write().await.search_term = term.into();
    }

    pub async fn search_term(&self) -> String {
        self.view.read().await.search_term.clone()
    }

    pub async fn set_risk_filter(&self, filter: RiskFilter) {
        self.view.write().await.risk_filter = filter;
    }

    pub async fn risk_filter(&self) -> RiskFilter {
        self.view.read().await.risk_filter
    }

    pub async fn select_record(&self, id: Option<RecordId>) {
        self.view.write().await.selected = id;
    }

    /// The selected record, if it is still in the snapshot
    pub async fn selected_record(&self) -> Option<AuditRecord> {
        let selected = self.view.read().await.selected.clone()?;
        self.store.get(&selected).await
    }

    pub fn upload(&self) -> &UploadWorkflow {
        &self.upload
    }

    pub async fn upload_state(&self) -> UploadState {
        self.upload.state().await
    }

    pub async fn open_upload_form(&self) {
        self.upload.open_form().await;
    }

    pub async fn close_upload_form(&self) {
        self.upload.close_form().await;
    }

    pub async fn edit_upload_form(&self, form: UploadForm) {
        self.upload.edit_form(form).await;
    }

    /// Upload the current form as the connected identity
    pub async fn submit_upload(&self) -> UploadOutcome {
        self.upload.submit(self.identity.current_address()).await
    }

    pub async fn decrypt(&self, id: &RecordId) -> Option<u32> {
        self.decrypt.decrypt(id).await
    }

    /// Banner currently displayed: the upload status first, then the
    /// availability notice.
    pub async fn status(&self) -> Option<TransactionStatus> {
        match self.upload.state().await.status {
            Some(status) => Some(status),
            None => self.banner.read().await.status.clone(),
        }
    }

    /// Probe the contract. Any answer shows the success banner; only a failed
    /// call shows nothing. Returns what the contract answered.
    #[instrument(skip(self))]
    pub async fn check_availability(&self) -> bool {
        match self.reader.is_available().await {
            Ok(available) => {
                if available {
                    info!("FHE system available");
                } else {
                    warn!("Contract answered but reports FHE system unavailable");
                }
                self.show_banner(TransactionStatus::success(MSG_SYSTEM_AVAILABLE))
                    .await;
                available
            }
            Err(e) => {
                error!(error_kind = e.kind(), error = %e, "Availability check failed");
                false
            }
        }
    }

    async fn show_banner(&self, status: TransactionStatus) {
        let token = {
            let mut banner = self.banner.write().await;
            banner.token += 1;
            banner.status = Some(status);
            banner.token
        };

        let banner = Arc::clone(&self.banner);
        let after = self.config.success_clear_delay;
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let mut banner = banner.write().await;
            if banner.token == token {
                banner.status = None;
            }
        });
    }
}
