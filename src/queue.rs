//! Creation job queue
//!
//! Decouples an inbound creation request from the on-chain submission. Many
//! producers may enqueue concurrently; a single worker drains jobs one at a
//! time, so at most one creation attempt is ever in flight. A failed job
//! records its error in the terminal state and the loop moves on — nothing
//! is rethrown, nothing is retried here.
//!
//! The queue is an explicit service object constructed once at startup and
//! passed by reference to whatever feeds it; there is no module-level
//! singleton.

use dashmap::DashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::{mpsc, Notify};
use tracing::{error, info, instrument, warn};

use crate::config::TokenCreationRequest;
use crate::errors::{LaunchError, LaunchResult};
use crate::launcher::{LaunchOrchestrator, LaunchOutcome};
use crate::metadata::MetadataUploader;

/// Job lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Active,
    Completed(LaunchOutcome),
    Failed(String),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }
}

/// One queued creation request with its lifecycle state
#[derive(Debug, Clone)]
pub struct Job {
    pub id: u64,
    pub request: TokenCreationRequest,
    pub state: JobState,
}

/// Handle returned to the producer at enqueue time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobHandle {
    pub id: u64,
}

/// Shared job records; state transitions are serialized per entry
type JobStore = Arc<DashMap<u64, Job>>;

/// Producer side of the creation queue
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::UnboundedSender<u64>,
    jobs: JobStore,
    next_id: Arc<AtomicU64>,
    /// Signalled on every terminal transition, for status waiters
    terminal: Arc<Notify>,
}

impl JobQueue {
    /// Create the queue and its paired worker
    pub fn new(
        orchestrator: LaunchOrchestrator,
        uploader: Arc<dyn MetadataUploader>,
    ) -> (Self, Worker) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let jobs: JobStore = Arc::new(DashMap::new());
        let terminal = Arc::new(Notify::new());
        let queue = Self {
            sender,
            jobs: Arc::clone(&jobs),
            next_id: Arc::new(AtomicU64::new(1)),
            terminal: Arc::clone(&terminal),
        };
        let worker = Worker {
            receiver,
            jobs,
            orchestrator,
            uploader,
            terminal,
        };
        (queue, worker)
    }

    /// Validate and enqueue a creation request
    ///
    /// Rejects requests with no image attached; everything else about the
    /// request is validated by the worker at processing time.
    pub fn enqueue(&self, request: TokenCreationRequest) -> LaunchResult<JobHandle> {
        if request.image.bytes.is_empty() {
            return Err(LaunchError::Validation("no file uploaded".to_string()));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.jobs.insert(
            id,
            Job {
                id,
                request,
                state: JobState::Queued,
            },
        );
        self.sender
            .send(id)
            .map_err(|_| LaunchError::Validation("queue is shut down".to_string()))?;
        info!(job_id = id, "Creation job enqueued");
        Ok(JobHandle { id })
    }

    /// Snapshot a job's current record
    pub fn status(&self, id: u64) -> Option<Job> {
        self.jobs.get(&id).map(|entry| entry.clone())
    }

    /// Wait until the given job reaches a terminal state
    pub async fn wait_terminal(&self, id: u64) -> Option<Job> {
        loop {
            let notified = self.terminal.notified();
            match self.status(id) {
                Some(job) if job.state.is_terminal() => return Some(job),
                Some(_) => notified.await,
                None => return None,
            }
        }
    }
}

/// Single consumer that drains the queue in delivery order
pub struct Worker {
    receiver: mpsc::UnboundedReceiver<u64>,
    jobs: JobStore,
    orchestrator: LaunchOrchestrator,
    uploader: Arc<dyn MetadataUploader>,
    terminal: Arc<Notify>,
}

impl Worker {
    /// Drain jobs until every producer handle is dropped
    pub async fn run(mut self) {
        info!("Creation worker started");
        while let Some(id) = self.receiver.recv().await {
            self.process(id).await;
        }
        info!("Creation worker stopped");
    }

    /// Run one job to its terminal state
    ///
    /// Errors end up in the job record, never back in the loop.
    #[instrument(skip(self), fields(job_id = id))]
    async fn process(&self, id: u64) {
        let request = match self.jobs.get_mut(&id) {
            Some(mut entry) => {
                entry.state = JobState::Active;
                entry.request.clone()
            }
            None => {
                warn!(job_id = id, "Job record missing, skipping");
                return;
            }
        };

        let result = self.execute(&request).await;
        let state = match result {
            Ok(outcome) => JobState::Completed(outcome),
            Err(e) => {
                error!(job_id = id, category = e.category(), error = %e, "Job failed");
                JobState::Failed(e.to_string())
            }
        };
        if let Some(mut entry) = self.jobs.get_mut(&id) {
            entry.state = state;
        }
        self.terminal.notify_waiters();
    }

    async fn execute(&self, request: &TokenCreationRequest) -> LaunchResult<LaunchOutcome> {
        let metadata_uri = self
            .uploader
            .upload(&request.metadata, &request.image)
            .await
            .map_err(LaunchError::rpc)?;
        self.orchestrator.create_token(request, &metadata_uri).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ImageBlob, TokenMetadata};

    fn request(image_bytes: Vec<u8>) -> TokenCreationRequest {
        TokenCreationRequest {
            metadata: TokenMetadata {
                name: "Test".to_string(),
                symbol: "TST".to_string(),
                description: String::new(),
                twitter: None,
                telegram: None,
                website: None,
            },
            image: ImageBlob {
                bytes: image_bytes,
                mime_type: "image/png".to_string(),
            },
            wallet: "[1,2,3]".to_string(),
            mint: "random".to_string(),
            buy_amount_sol: 0.1,
            slippage_bps: 100,
            priority_fee: 100_000,
            tip_sol: 0.001,
        }
    }

    fn queue_without_worker() -> (JobQueue, Worker) {
        use crate::rpc::{BundleRelay, LedgerRpc};
        use crate::submitter::Submitter;
        use async_trait::async_trait;
        use solana_sdk::{
            account::Account, hash::Hash, pubkey::Pubkey, signature::Signature,
            transaction::VersionedTransaction,
        };

        struct Unreachable;

        #[async_trait]
        impl LedgerRpc for Unreachable {
            async fn get_balance(&self, _: &Pubkey) -> anyhow::Result<u64> {
                unreachable!()
            }
            async fn get_account(&self, _: &Pubkey) -> anyhow::Result<Option<Account>> {
                unreachable!()
            }
            async fn get_token_balance(
                &self,
                _: &Pubkey,
            ) -> anyhow::Result<Option<crate::rpc::TokenBalance>> {
                unreachable!()
            }
            async fn latest_blockhash(&self) -> anyhow::Result<Hash> {
                unreachable!()
            }
            async fn send_transaction(
                &self,
                _: &VersionedTransaction,
            ) -> anyhow::Result<Signature> {
                unreachable!()
            }
        }

        #[async_trait]
        impl BundleRelay for Unreachable {
            async fn submit_bundle(
                &self,
                _: &[VersionedTransaction],
                _: crate::rpc::Region,
            ) -> anyhow::Result<String> {
                unreachable!()
            }
        }

        #[async_trait]
        impl MetadataUploader for Unreachable {
            async fn upload(
                &self,
                _: &TokenMetadata,
                _: &ImageBlob,
            ) -> anyhow::Result<String> {
                unreachable!()
            }
        }

        let rpc: Arc<Unreachable> = Arc::new(Unreachable);
        let orchestrator = LaunchOrchestrator::new(
            rpc.clone(),
            Submitter::new(rpc.clone(), Arc::new(Unreachable)),
        );
        JobQueue::new(orchestrator, Arc::new(Unreachable))
    }

    #[tokio::test]
    async fn test_enqueue_without_image_rejected() {
        let (queue, _worker) = queue_without_worker();
        let err = queue.enqueue(request(Vec::new())).unwrap_err();
        assert!(matches!(err, LaunchError::Validation(_)));
    }

    #[tokio::test]
    async fn test_enqueue_assigns_monotonic_ids() {
        let (queue, _worker) = queue_without_worker();
        let a = queue.enqueue(request(vec![1])).unwrap();
        let b = queue.enqueue(request(vec![2])).unwrap();
        assert!(b.id > a.id);
        assert_eq!(queue.status(a.id).unwrap().state, JobState::Queued);
        assert!(queue.status(999).is_none());
    }
}
