use std::sync::Arc;

use thiserror::Error;
use tokio::{
    sync::{Mutex, broadcast, mpsc, oneshot},
    time::{Duration, Instant, sleep_until},
};
use tracing::{debug, error};

use crate::{
    contact::{ContactDraft, ContactRecord},
    core::store::{ContactStore, StoreError, StoreSnapshotV1},
    op::StoredOp,
    persist::{OpSink, PersistError, PersistResult},
    types::{ContactId, OpSeq},
};

use super::events::DirectoryEvent;

/// Failures surfaced by [`DirectoryHandle`] calls.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The store rejected the operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// Persistence failed or pushed back.
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    /// The runtime task or a reply channel is gone.
    #[error("directory runtime channel closed")]
    ChannelClosed,
}

/// Tuning knobs for the runtime and its persistence worker.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Flush the journal batch after every write op.
    pub flush_on_write: bool,
    /// Max ops buffered before a forced batch append.
    pub batch_max_ops: usize,
    /// Max time an op may sit in the batch buffer.
    pub batch_max_latency_ms: u64,
    /// Bound of the runtime-to-worker persistence queue.
    pub persist_queue_bound: usize,
    /// Ops between automatic snapshots; 0 disables them.
    pub snapshot_every_ops: usize,
    /// Delete journaled ops once a snapshot covers them.
    pub compact_after_snapshot: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            flush_on_write: true,
            batch_max_ops: 32,
            batch_max_latency_ms: 75,
            persist_queue_bound: 64,
            snapshot_every_ops: 2000,
            compact_after_snapshot: false,
        }
    }
}

/// Cloneable handle to the single-writer directory task.
#[derive(Clone)]
pub struct DirectoryHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<DirectoryEvent>,
}

enum Command {
    Create {
        draft: ContactDraft,
        resp: oneshot::Sender<Result<ContactRecord, RuntimeError>>,
    },
    Update {
        id: ContactId,
        draft: ContactDraft,
        resp: oneshot::Sender<Result<ContactRecord, RuntimeError>>,
    },
    Delete {
        id: ContactId,
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Get {
        id: ContactId,
        resp: oneshot::Sender<Option<ContactRecord>>,
    },
    List {
        resp: oneshot::Sender<Vec<ContactRecord>>,
    },
    Flush {
        resp: oneshot::Sender<Result<OpSeq, RuntimeError>>,
    },
    Checkpoint {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Shutdown {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
}

enum PersistMsg {
    Append(StoredOp),
    Flush {
        reply: oneshot::Sender<PersistResult<OpSeq>>,
    },
    Checkpoint {
        snapshot: StoreSnapshotV1,
        last_seq: OpSeq,
        compact: bool,
        reply: oneshot::Sender<PersistResult<()>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Spawns the directory task over `store`, journaling to `sink` when one
/// is given, and returns a cloneable handle to it.
pub fn spawn_directory(
    store: ContactStore,
    sink: Option<Box<dyn OpSink>>,
    config: RuntimeConfig,
) -> DirectoryHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(256);
    let (events_tx, _) = broadcast::channel(1024);

    let mut persist_tx = None;
    let mut durable_rx = None;
    if let Some(sink) = sink {
        let (tx, rx) = mpsc::channel(config.persist_queue_bound);
        let (feedback_tx, feedback_rx) = mpsc::unbounded_channel();
        PersistWorker::spawn(sink, rx, feedback_tx, config.clone());
        persist_tx = Some(tx);
        durable_rx = Some(feedback_rx);
    }

    let task = DirectoryTask {
        store,
        events_tx: events_tx.clone(),
        persist_tx,
        config,
        ops_since_snapshot: 0,
    };
    tokio::spawn(task.run(cmd_rx, durable_rx));

    DirectoryHandle { cmd_tx, events_tx }
}

impl DirectoryHandle {
    /// Subscribes to the runtime event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<DirectoryEvent> {
        self.events_tx.subscribe()
    }

    /// Creates a contact from `draft`, returning the record with its
    /// assigned id.
    pub async fn create(&self, draft: ContactDraft) -> Result<ContactRecord, RuntimeError> {
        self.call(|resp| Command::Create { draft, resp }).await?
    }

    /// Replaces every field of the contact under `id`.
    pub async fn update(
        &self,
        id: ContactId,
        draft: ContactDraft,
    ) -> Result<ContactRecord, RuntimeError> {
        self.call(|resp| Command::Update { id, draft, resp }).await?
    }

    /// Deletes the contact under `id`.
    pub async fn delete(&self, id: ContactId) -> Result<(), RuntimeError> {
        self.call(|resp| Command::Delete { id, resp }).await?
    }

    /// Fetches a single contact, if present.
    pub async fn get(&self, id: ContactId) -> Result<Option<ContactRecord>, RuntimeError> {
        self.call(|resp| Command::Get { id, resp }).await
    }

    /// Fetches all contacts in insertion order.
    pub async fn list(&self) -> Result<Vec<ContactRecord>, RuntimeError> {
        self.call(|resp| Command::List { resp }).await
    }

    /// Forces pending journal writes out, returning the durable seq.
    pub async fn flush(&self) -> Result<OpSeq, RuntimeError> {
        self.call(|resp| Command::Flush { resp }).await?
    }

    /// Writes a full-state snapshot now.
    pub async fn checkpoint(&self) -> Result<(), RuntimeError> {
        self.call(|resp| Command::Checkpoint { resp }).await?
    }

    /// Flushes and stops the runtime; later calls fail with
    /// [`RuntimeError::ChannelClosed`].
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.call(|resp| Command::Shutdown { resp }).await?
    }

    /// Ships a command to the task and waits for its reply.
    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }
}

/// State owned by the spawned directory task.
struct DirectoryTask {
    store: ContactStore,
    events_tx: broadcast::Sender<DirectoryEvent>,
    persist_tx: Option<mpsc::Sender<PersistMsg>>,
    config: RuntimeConfig,
    ops_since_snapshot: usize,
}

impl DirectoryTask {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<Command>,
        durable_rx: Option<mpsc::UnboundedReceiver<PersistResult<OpSeq>>>,
    ) {
        match durable_rx {
            Some(feedback) => self.run_with_feedback(cmd_rx, feedback).await,
            None => {
                while let Some(cmd) = cmd_rx.recv().await {
                    if self.handle(cmd).await {
                        break;
                    }
                }
            }
        }
    }

    async fn run_with_feedback(
        &mut self,
        mut cmd_rx: mpsc::Receiver<Command>,
        mut feedback: mpsc::UnboundedReceiver<PersistResult<OpSeq>>,
    ) {
        let mut feedback_open = true;
        loop {
            let cmd = if feedback_open {
                tokio::select! {
                    cmd = cmd_rx.recv() => cmd,
                    durable = feedback.recv() => {
                        match durable {
                            Some(Ok(op_seq)) => {
                                let _ = self
                                    .events_tx
                                    .send(DirectoryEvent::DurableUpTo { op_seq });
                            }
                            // Append failures already went to the log.
                            Some(Err(_)) => {}
                            None => feedback_open = false,
                        }
                        continue;
                    }
                }
            } else {
                cmd_rx.recv().await
            };

            let Some(cmd) = cmd else { break };
            if self.handle(cmd).await {
                break;
            }
        }
    }

    /// Runs one command; returns `true` once the task should stop.
    async fn handle(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Create { draft, resp } => {
                let res = self.mutate(|store| store.create(draft));
                if let Ok(contact) = res.as_ref() {
                    let _ = self
                        .events_tx
                        .send(DirectoryEvent::Created { id: contact.id });
                }
                self.after_mutation(res.is_ok()).await;
                let _ = resp.send(res);
            }
            Command::Update { id, draft, resp } => {
                let res = self.mutate(|store| store.replace(id, draft));
                if res.is_ok() {
                    let _ = self.events_tx.send(DirectoryEvent::Updated { id });
                }
                self.after_mutation(res.is_ok()).await;
                let _ = resp.send(res);
            }
            Command::Delete { id, resp } => {
                let res = self.mutate(|store| store.remove(id)).map(|_removed| ());
                if res.is_ok() {
                    let _ = self.events_tx.send(DirectoryEvent::Deleted { id });
                }
                self.after_mutation(res.is_ok()).await;
                let _ = resp.send(res);
            }
            Command::Get { id, resp } => {
                let _ = resp.send(self.store.get_cloned(id));
            }
            Command::List { resp } => {
                let _ = resp.send(self.store.all_cloned());
            }
            Command::Flush { resp } => {
                let out = match self.persist_tx.as_ref() {
                    Some(tx) => round_trip(tx, |reply| PersistMsg::Flush { reply })
                        .await
                        .and_then(|r| r.map_err(RuntimeError::from)),
                    None => Ok(self.store.latest_op_seq()),
                };
                let _ = resp.send(out);
            }
            Command::Checkpoint { resp } => {
                let out = match self.persist_tx.as_ref() {
                    Some(tx) => {
                        let snapshot = self.store.export_snapshot();
                        let last_seq = self.store.latest_op_seq();
                        let compact = self.config.compact_after_snapshot;
                        round_trip(tx, move |reply| PersistMsg::Checkpoint {
                            snapshot,
                            last_seq,
                            compact,
                            reply,
                        })
                        .await
                        .and_then(|r| r.map_err(RuntimeError::from))
                    }
                    None => Ok(()),
                };
                let _ = resp.send(out);
            }
            Command::Shutdown { resp } => {
                let out = match self.persist_tx.as_ref() {
                    Some(tx) => round_trip(tx, |reply| PersistMsg::Shutdown { reply }).await,
                    None => Ok(()),
                };
                let _ = resp.send(out);
                return true;
            }
        }

        false
    }

    /// Applies one store mutation behind a reserved journal slot.
    ///
    /// The slot is taken first so a full persistence queue rejects the
    /// command before any state changes; with the permit in hand, handing
    /// the op to the worker cannot fail afterwards.
    fn mutate<T>(
        &mut self,
        apply: impl FnOnce(&mut ContactStore) -> Result<(T, StoredOp), StoreError>,
    ) -> Result<T, RuntimeError> {
        let permit = reserve_slot(self.persist_tx.as_ref())?;
        let (value, stored) = apply(&mut self.store)?;
        match permit {
            Some(permit) => permit.send(PersistMsg::Append(stored)),
            None => {
                // Without a journal every applied op is durable at once.
                let _ = self.events_tx.send(DirectoryEvent::DurableUpTo {
                    op_seq: self.store.latest_op_seq(),
                });
            }
        }
        Ok(value)
    }

    async fn after_mutation(&mut self, applied: bool) {
        if !applied {
            return;
        }
        self.ops_since_snapshot += 1;
        if self.config.snapshot_every_ops == 0
            || self.ops_since_snapshot < self.config.snapshot_every_ops
        {
            return;
        }
        let Some(tx) = self.persist_tx.as_ref() else {
            return;
        };

        let snapshot = self.store.export_snapshot();
        let last_seq = self.store.latest_op_seq();
        let compact = self.config.compact_after_snapshot;
        debug!(last_seq, "automatic snapshot requested");
        let outcome = round_trip(tx, move |reply| PersistMsg::Checkpoint {
            snapshot,
            last_seq,
            compact,
            reply,
        })
        .await;
        if let Ok(result) = outcome {
            if let Err(err) = result {
                error!(error = %err, "automatic snapshot failed");
            }
            self.ops_since_snapshot = 0;
        }
    }
}

/// Asks the persistence worker for something and waits for the answer.
async fn round_trip<T>(
    tx: &mpsc::Sender<PersistMsg>,
    make: impl FnOnce(oneshot::Sender<T>) -> PersistMsg,
) -> Result<T, RuntimeError> {
    let (reply_tx, reply_rx) = oneshot::channel();
    tx.send(make(reply_tx))
        .await
        .map_err(|_| RuntimeError::ChannelClosed)?;
    reply_rx.await.map_err(|_| RuntimeError::ChannelClosed)
}

fn reserve_slot(
    tx: Option<&mpsc::Sender<PersistMsg>>,
) -> Result<Option<mpsc::Permit<'_, PersistMsg>>, RuntimeError> {
    match tx {
        Some(tx) => tx.try_reserve().map(Some).map_err(|err| {
            RuntimeError::Persist(PersistError::Message(format!("persist queue error: {err}")))
        }),
        None => Ok(None),
    }
}

/// Owns the [`OpSink`] and turns queued ops into batched appends.
struct PersistWorker {
    sink: Arc<Mutex<Box<dyn OpSink>>>,
    durable_tx: mpsc::UnboundedSender<PersistResult<OpSeq>>,
    config: RuntimeConfig,
    buf: Vec<StoredOp>,
    last_durable: OpSeq,
    deadline: Instant,
}

impl PersistWorker {
    fn spawn(
        sink: Box<dyn OpSink>,
        rx: mpsc::Receiver<PersistMsg>,
        durable_tx: mpsc::UnboundedSender<PersistResult<OpSeq>>,
        config: RuntimeConfig,
    ) {
        let deadline = Instant::now() + Duration::from_millis(config.batch_max_latency_ms);
        let worker = Self {
            sink: Arc::new(Mutex::new(sink)),
            durable_tx,
            config,
            buf: Vec::new(),
            last_durable: 0,
            deadline,
        };
        tokio::spawn(worker.run(rx));
    }

    async fn run(mut self, mut rx: mpsc::Receiver<PersistMsg>) {
        loop {
            tokio::select! {
                msg = rx.recv() => {
                    match msg {
                        Some(msg) => {
                            if self.dispatch(msg).await {
                                break;
                            }
                        }
                        None => {
                            // Runtime went away without a shutdown command.
                            let _ = self.flush(true).await;
                            break;
                        }
                    }
                }
                _ = sleep_until(self.deadline), if !self.buf.is_empty() => {
                    let _ = self.flush(false).await;
                }
            }
        }
    }

    async fn dispatch(&mut self, msg: PersistMsg) -> bool {
        match msg {
            PersistMsg::Append(stored) => {
                self.buf.push(stored);
                if self.buf.len() >= self.config.batch_max_ops || self.config.flush_on_write {
                    let _ = self.flush(true).await;
                }
            }
            PersistMsg::Flush { reply } => {
                let result = self.flush(true).await.map(|()| self.last_durable);
                let _ = reply.send(result);
            }
            PersistMsg::Checkpoint {
                snapshot,
                last_seq,
                compact,
                reply,
            } => {
                let result = self.write_checkpoint(snapshot, last_seq, compact).await;
                let _ = reply.send(result);
            }
            PersistMsg::Shutdown { reply } => {
                let _ = self.flush(true).await;
                let _ = reply.send(());
                return true;
            }
        }

        false
    }

    /// Appends the buffered ops, syncing the sink when `sync` is set,
    /// and reports the new durable high-water mark on success.
    async fn flush(&mut self, sync: bool) -> PersistResult<()> {
        let outcome = self.flush_inner(sync).await;
        self.deadline = Instant::now() + Duration::from_millis(self.config.batch_max_latency_ms);
        outcome
    }

    async fn flush_inner(&mut self, sync: bool) -> PersistResult<()> {
        if self.buf.is_empty() {
            if sync {
                self.with_sink(|sink| sink.flush()).await?;
            }
            return Ok(());
        }

        let ops = std::mem::take(&mut self.buf);
        let appended = self
            .with_sink(move |sink| {
                let seq = sink.append_ops(&ops)?;
                if sync {
                    sink.flush()?;
                }
                Ok(seq)
            })
            .await;

        match appended {
            Ok(seq) => {
                self.last_durable = self.last_durable.max(seq);
                let _ = self.durable_tx.send(Ok(self.last_durable));
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "journal append failed");
                let _ = self
                    .durable_tx
                    .send(Err(PersistError::Message(format!("append failed: {err}"))));
                Err(err)
            }
        }
    }

    async fn write_checkpoint(
        &mut self,
        snapshot: StoreSnapshotV1,
        last_seq: OpSeq,
        compact: bool,
    ) -> PersistResult<()> {
        self.flush(true).await?;
        self.with_sink(move |sink| {
            sink.write_snapshot(&snapshot, last_seq)?;
            if compact {
                sink.compact_through(last_seq)?;
            }
            Ok(())
        })
        .await
    }

    /// Runs `work` against the sink on the blocking pool.
    async fn with_sink<T>(
        &self,
        work: impl FnOnce(&mut dyn OpSink) -> PersistResult<T> + Send + 'static,
    ) -> PersistResult<T>
    where
        T: Send + 'static,
    {
        let sink = Arc::clone(&self.sink);
        tokio::task::spawn_blocking(move || {
            let mut guard = sink.blocking_lock();
            work(guard.as_mut())
        })
        .await
        .map_err(|err| PersistError::Message(format!("sink worker gone: {err}")))?
    }
}
