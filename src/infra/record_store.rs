//! Record store
//!
//! Holds the last full snapshot of audit records read from the ledger. Every
//! load is a full refresh; records are never patched in place. Loads may
//! overlap: each takes a generation ticket when it starts, and a load only
//! publishes its snapshot if no newer load (or clear) has been published.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::domain::{AuditRecord, RecordId};

use super::{AuditError, LedgerReader, Result};

#[derive(Debug, Default)]
struct Snapshot {
    generation: u64,
    records: Vec<AuditRecord>,
}

/// In-memory snapshot of the ledger's audit records
pub struct RecordStore {
    reader: Arc<dyn LedgerReader>,
    next_generation: AtomicU64,
    snapshot: RwLock<Snapshot>,
}

impl RecordStore {
    pub fn new(reader: Arc<dyn LedgerReader>) -> Self {
        Self {
            reader,
            next_generation: AtomicU64::new(0),
            snapshot: RwLock::new(Snapshot::default()),
        }
    }

    fn ticket(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Re-read every record from the ledger and replace the snapshot.
    ///
    /// Fails with [`AuditError::Read`] only if the id list cannot be read.
    /// A record that fails to load or decode is logged and left out.
    ///
    /// If a load that started later has already been published, this load's
    /// result is discarded and the newer snapshot is returned instead.
    #[instrument(skip(self))]
    pub async fn load_all(&self) -> Result<Vec<AuditRecord>> {
        let generation = self.ticket();
        let ids = self
            .reader
            .get_all_record_ids()
            .await
            .map_err(|e| AuditError::Read(format!("failed to list record ids: {}", e)))?;

        let mut loaded = Vec::with_capacity(ids.len());
        for id in ids {
            let fields = match self.reader.get_record(&id).await {
                Ok(fields) => fields,
                Err(e) => {
                    warn!(record_id = %id, error = %e, "Skipping record that failed to load");
                    continue;
                }
            };
            match AuditRecord::from_fields(id, fields) {
                Ok(record) => loaded.push(record),
                Err(e) => warn!(error = %e, "Skipping record that failed to decode"),
            }
        }

        let mut snapshot = self.snapshot.write().await;
        if snapshot.generation > generation {
            debug!(
                generation,
                published = snapshot.generation,
                "Discarding stale record load"
            );
            return Ok(snapshot.records.clone());
        }
        info!(count = loaded.len(), generation, "Loaded audit records");
        snapshot.generation = generation;
        snapshot.records = loaded.clone();
        Ok(loaded)
    }

    /// Drop the snapshot, e.g. when the identity disconnects.
    ///
    /// Loads still in flight when this is called are discarded.
    pub async fn clear(&self) {
        debug!("Clearing record snapshot");
        let generation = self.ticket();
        let mut snapshot = self.snapshot.write().await;
        snapshot.generation = generation;
        snapshot.records.clear();
    }

    /// Current snapshot, in ledger order
    pub async fn records(&self) -> Vec<AuditRecord> {
        self.snapshot.read().await.records.clone()
    }

    pub async fn get(&self, id: &RecordId) -> Option<AuditRecord> {
        self.snapshot
            .read()
            .await
            .records
            .iter()
            .find(|r| &r.id == id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.snapshot.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshot.read().await.records.is_empty()
    }
}
