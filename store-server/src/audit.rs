//! Audit log
//!
//! Append-only activity record keyed by actor, action and description.
//! Writes go through an mpsc channel to a background worker so the
//! transactional paths never block on audit persistence; queries read the
//! storage directly. There is no update or delete surface.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared::util::now_millis;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Audited operation types (enum, not free text)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // ═══ Orders (financially critical) ═══
    OrderCreated,
    OrderStatusChanged,
    OrderPaymentStateChanged,
    RefundProcessed,

    // ═══ Payments ═══
    PaymentInitiated,
    PaymentReconciled,
    NotificationRejected,
    NotificationDuplicate,

    // ═══ Carts ═══
    CartConverted,
    CartsMerged,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Immutable audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Globally increasing sequence number
    pub id: u64,
    /// Unix millis
    pub timestamp: i64,
    pub action: AuditAction,
    /// Who triggered the operation ("user:42", "gateway", "system")
    pub actor: String,
    pub description: String,
    /// Structured context (order id, txn id, amounts)
    pub details: serde_json::Value,
}

/// Log request sent to the worker
pub struct AuditLogRequest {
    pub action: AuditAction,
    pub actor: String,
    pub description: String,
    pub details: serde_json::Value,
}

/// Append-only in-memory audit storage
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: RwLock<Vec<AuditEntry>>,
    seq: AtomicU64,
}

impl AuditLog {
    fn append(&self, req: AuditLogRequest) {
        let entry = AuditEntry {
            id: self.seq.fetch_add(1, Ordering::SeqCst) + 1,
            timestamp: now_millis(),
            action: req.action,
            actor: req.actor,
            description: req.description,
            details: req.details,
        };
        self.entries.write().push(entry);
    }

    /// All entries, oldest first
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().clone()
    }

    /// Entries for one action type
    pub fn by_action(&self, action: AuditAction) -> Vec<AuditEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.action == action)
            .cloned()
            .collect()
    }
}

/// Audit log service
///
/// Cloneable handle around the mpsc sender plus the backing storage for
/// queries. Logging is fire-and-forget: a full buffer drops the entry with
/// a warning rather than stalling a checkout.
pub struct AuditService {
    tx: mpsc::Sender<AuditLogRequest>,
    log: Arc<AuditLog>,
}

impl std::fmt::Debug for AuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditService").finish_non_exhaustive()
    }
}

impl AuditService {
    /// Create the service and its worker. The caller decides where the
    /// worker runs (see [`AuditService::spawn`] for the common case).
    pub fn new(buffer_size: usize) -> (Arc<Self>, AuditWorker) {
        let (tx, rx) = mpsc::channel(buffer_size);
        let log = Arc::new(AuditLog::default());
        let service = Arc::new(Self {
            tx,
            log: Arc::clone(&log),
        });
        (service, AuditWorker { rx, log })
    }

    /// Create the service and run its worker on the current runtime
    pub fn spawn(buffer_size: usize) -> Arc<Self> {
        let (service, worker) = Self::new(buffer_size);
        tokio::spawn(worker.run());
        service
    }

    /// Record an entry (non-blocking)
    pub fn log(
        &self,
        action: AuditAction,
        actor: impl Into<String>,
        description: impl Into<String>,
        details: serde_json::Value,
    ) {
        let req = AuditLogRequest {
            action,
            actor: actor.into(),
            description: description.into(),
            details,
        };
        if let Err(e) = self.tx.try_send(req) {
            tracing::warn!("audit log buffer full, entry dropped: {e}");
        }
    }

    /// Query access to the append-only storage
    pub fn storage(&self) -> &Arc<AuditLog> {
        &self.log
    }
}

/// Background worker draining log requests into storage
pub struct AuditWorker {
    rx: mpsc::Receiver<AuditLogRequest>,
    log: Arc<AuditLog>,
}

impl AuditWorker {
    pub async fn run(mut self) {
        while let Some(req) = self.rx.recv().await {
            self.log.append(req);
        }
        tracing::debug!("audit worker stopped");
    }
}
