use std::sync::Arc;

use tokio::{
    sync::{Mutex, broadcast, mpsc, oneshot},
    time::{Duration, Instant},
};

use crate::{
    core::store::{StoreError, SwapStore},
    op::{Op, StoredOp},
    persist::{OpSink, PersistError},
    slot::{SlotDraft, SlotRecord, SwappableSlotView},
    swap::{SwapRequestRecord, SwapRequestView},
    types::{OpSeq, RequestId, SlotId, SlotStatus, UserId},
};

use super::events::SwapEvent;

#[derive(Debug)]
pub enum RuntimeError {
    Store(StoreError),
    Persist(PersistError),
    /// Command could not enter the writer loop within the submit budget.
    /// No state was touched.
    Timeout,
    ChannelClosed,
}

impl From<StoreError> for RuntimeError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<PersistError> for RuntimeError {
    fn from(value: PersistError) -> Self {
        Self::Persist(value)
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Flush the journal eagerly when a swap commit (propose/resolve) lands.
    pub flush_on_commit: bool,
    pub batch_max_ops: usize,
    pub batch_max_latency_ms: u64,
    pub persist_queue_bound: usize,
    pub snapshot_every_ops: usize,
    pub compact_after_snapshot: bool,
    /// Budget for enqueueing a command into the writer loop.
    pub submit_timeout_ms: u64,
    /// Bounded automatic retries when a commit loses a conditional write.
    pub conflict_retries: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            flush_on_commit: true,
            batch_max_ops: 32,
            batch_max_latency_ms: 75,
            persist_queue_bound: 64,
            snapshot_every_ops: 2000,
            compact_after_snapshot: false,
            submit_timeout_ms: 1000,
            conflict_retries: 2,
        }
    }
}

pub struct SlotSwapHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<SwapEvent>,
    submit_timeout: Duration,
    conflict_retries: u32,
}

impl Clone for SlotSwapHandle {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            events_tx: self.events_tx.clone(),
            submit_timeout: self.submit_timeout,
            conflict_retries: self.conflict_retries,
        }
    }
}

enum Command {
    RegisterUser {
        name: String,
        resp: oneshot::Sender<Result<UserId, RuntimeError>>,
    },
    CreateSlot {
        draft: SlotDraft,
        resp: oneshot::Sender<Result<SlotId, RuntimeError>>,
    },
    SetSlotStatus {
        slot: SlotId,
        acting: UserId,
        target: SlotStatus,
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Propose {
        offered: SlotId,
        requested: SlotId,
        requester: UserId,
        resp: oneshot::Sender<Result<SwapRequestRecord, RuntimeError>>,
    },
    Resolve {
        request: RequestId,
        acting: UserId,
        accepted: bool,
        resp: oneshot::Sender<Result<SwapRequestRecord, RuntimeError>>,
    },
    GetSlot {
        id: SlotId,
        resp: oneshot::Sender<Option<SlotRecord>>,
    },
    GetRequest {
        id: RequestId,
        resp: oneshot::Sender<Option<SwapRequestRecord>>,
    },
    SlotsForUser {
        user: UserId,
        resp: oneshot::Sender<Vec<SlotRecord>>,
    },
    SwappableSlots {
        excluding: UserId,
        resp: oneshot::Sender<Vec<SwappableSlotView>>,
    },
    ListForUser {
        user: UserId,
        resp: oneshot::Sender<(Vec<SwapRequestView>, Vec<SwapRequestView>)>,
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
    Op(StoredOp),
    Flush {
        resp: oneshot::Sender<Result<OpSeq, PersistError>>,
    },
    Checkpoint {
        snapshot: crate::core::store::StoreSnapshotV1,
        last_seq: OpSeq,
        compact: bool,
        resp: oneshot::Sender<Result<(), PersistError>>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

/// Spawns the single-writer loop that owns `store`.
///
/// All mutations and consistent reads are serialized through the returned
/// handle, so at most one propose/accept/reject touching a given slot runs
/// at a time and readers never observe a half-applied swap.
pub fn spawn_slotswap(
    store: SwapStore,
    sink: Option<Box<dyn OpSink>>,
    config: RuntimeConfig,
) -> SlotSwapHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(256);
    let (events_tx, _) = broadcast::channel::<SwapEvent>(1024);

    let (persist_tx_opt, mut durable_rx) = if let Some(sink) = sink {
        let (persist_tx, persist_rx) = mpsc::channel::<PersistMsg>(config.persist_queue_bound);
        let (durable_tx, durable_rx) = mpsc::unbounded_channel::<Result<OpSeq, PersistError>>();
        spawn_persistence_worker(sink, persist_rx, durable_tx, config.clone());
        (Some(persist_tx), Some(durable_rx))
    } else {
        (None, None)
    };

    let events_tx_loop = events_tx.clone();
    let submit_timeout = Duration::from_millis(config.submit_timeout_ms);
    let conflict_retries = config.conflict_retries;

    tokio::spawn(async move {
        let mut store = store;
        let mut ops_since_snapshot = 0usize;

        loop {
            if let Some(rx) = durable_rx.as_mut() {
                tokio::select! {
                    cmd = cmd_rx.recv() => {
                        let Some(cmd) = cmd else { break; };
                        let done = handle_command(
                            cmd,
                            &mut store,
                            &events_tx_loop,
                            persist_tx_opt.as_ref(),
                            &config,
                            &mut ops_since_snapshot,
                        ).await;

                        if done {
                            break;
                        }
                    }
                    durable = rx.recv() => {
                        if let Some(Ok(op_seq)) = durable {
                            let _ = events_tx_loop.send(SwapEvent::DurableUpTo { op_seq });
                        }
                    }
                }
            } else {
                let Some(cmd) = cmd_rx.recv().await else { break; };
                let done = handle_command(
                    cmd,
                    &mut store,
                    &events_tx_loop,
                    persist_tx_opt.as_ref(),
                    &config,
                    &mut ops_since_snapshot,
                ).await;
                if done {
                    break;
                }
            }
        }
    });

    SlotSwapHandle {
        cmd_tx,
        events_tx,
        submit_timeout,
        conflict_retries,
    }
}

impl SlotSwapHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<SwapEvent> {
        self.events_tx.subscribe()
    }

    pub async fn register_user(&self, name: impl Into<String>) -> Result<UserId, RuntimeError> {
        let name = name.into();
        let (tx, rx) = oneshot::channel();
        self.submit(Command::RegisterUser { name, resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn create_slot(&self, draft: SlotDraft) -> Result<SlotId, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.submit(Command::CreateSlot { draft, resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn set_slot_status(
        &self,
        slot: SlotId,
        acting: UserId,
        target: SlotStatus,
    ) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.submit(Command::SetSlotStatus {
            slot,
            acting,
            target,
            resp: tx,
        })
        .await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Proposes a swap. Conditional-write losses are retried up to the
    /// configured bound before surfacing as `Conflict`.
    pub async fn propose(
        &self,
        offered: SlotId,
        requested: SlotId,
        requester: UserId,
    ) -> Result<SwapRequestRecord, RuntimeError> {
        let mut attempt = 0u32;
        loop {
            let (tx, rx) = oneshot::channel();
            self.submit(Command::Propose {
                offered,
                requested,
                requester,
                resp: tx,
            })
            .await?;
            let res = rx.await.map_err(|_| RuntimeError::ChannelClosed)?;
            match res {
                Err(RuntimeError::Store(StoreError::Conflict { .. }))
                    if attempt < self.conflict_retries =>
                {
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    pub async fn accept(
        &self,
        request: RequestId,
        acting: UserId,
    ) -> Result<SwapRequestRecord, RuntimeError> {
        self.resolve(request, acting, true).await
    }

    pub async fn reject(
        &self,
        request: RequestId,
        acting: UserId,
    ) -> Result<SwapRequestRecord, RuntimeError> {
        self.resolve(request, acting, false).await
    }

    async fn resolve(
        &self,
        request: RequestId,
        acting: UserId,
        accepted: bool,
    ) -> Result<SwapRequestRecord, RuntimeError> {
        let mut attempt = 0u32;
        loop {
            let (tx, rx) = oneshot::channel();
            self.submit(Command::Resolve {
                request,
                acting,
                accepted,
                resp: tx,
            })
            .await?;
            let res = rx.await.map_err(|_| RuntimeError::ChannelClosed)?;
            match res {
                Err(RuntimeError::Store(StoreError::Conflict { .. }))
                    if attempt < self.conflict_retries =>
                {
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    pub async fn get_slot(&self, id: SlotId) -> Result<Option<SlotRecord>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.submit(Command::GetSlot { id, resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    pub async fn get_request(
        &self,
        id: RequestId,
    ) -> Result<Option<SwapRequestRecord>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.submit(Command::GetRequest { id, resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    pub async fn slots_for_user(&self, user: UserId) -> Result<Vec<SlotRecord>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.submit(Command::SlotsForUser { user, resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    pub async fn swappable_slots(
        &self,
        excluding: UserId,
    ) -> Result<Vec<SwappableSlotView>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.submit(Command::SwappableSlots {
            excluding,
            resp: tx,
        })
        .await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Pending requests involving `user`, split into (outgoing, incoming),
    /// newest-first.
    pub async fn list_for_user(
        &self,
        user: UserId,
    ) -> Result<(Vec<SwapRequestView>, Vec<SwapRequestView>), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.submit(Command::ListForUser { user, resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    pub async fn flush(&self) -> Result<OpSeq, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.submit(Command::Flush { resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn checkpoint(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.submit(Command::Checkpoint { resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.submit(Command::Shutdown { resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    async fn submit(&self, cmd: Command) -> Result<(), RuntimeError> {
        self.cmd_tx
            .send_timeout(cmd, self.submit_timeout)
            .await
            .map_err(|err| match err {
                mpsc::error::SendTimeoutError::Timeout(_) => RuntimeError::Timeout,
                mpsc::error::SendTimeoutError::Closed(_) => RuntimeError::ChannelClosed,
            })
    }
}

async fn handle_command(
    cmd: Command,
    store: &mut SwapStore,
    events_tx: &broadcast::Sender<SwapEvent>,
    persist_tx: Option<&mpsc::Sender<PersistMsg>>,
    config: &RuntimeConfig,
    ops_since_snapshot: &mut usize,
) -> bool {
    match cmd {
        Command::RegisterUser { name, resp } => {
            let res = match store.register_user(name) {
                Ok((id, stored)) => commit(stored, store, events_tx, persist_tx)
                    .await
                    .map(|()| {
                        let _ = events_tx.send(SwapEvent::UserRegistered { id });
                        id
                    }),
                Err(err) => Err(RuntimeError::from(err)),
            };
            after_mutation(res.is_ok(), store, persist_tx, config, ops_since_snapshot).await;
            let _ = resp.send(res);
        }
        Command::CreateSlot { draft, resp } => {
            let res = match store.create_slot(draft) {
                Ok((id, stored)) => commit(stored, store, events_tx, persist_tx)
                    .await
                    .map(|()| {
                        let _ = events_tx.send(SwapEvent::SlotCreated { id });
                        id
                    }),
                Err(err) => Err(RuntimeError::from(err)),
            };
            after_mutation(res.is_ok(), store, persist_tx, config, ops_since_snapshot).await;
            let _ = resp.send(res);
        }
        Command::SetSlotStatus {
            slot,
            acting,
            target,
            resp,
        } => {
            let res = match store.set_slot_status(slot, acting, target) {
                Ok((_, stored)) => commit(stored, store, events_tx, persist_tx)
                    .await
                    .map(|()| {
                        let _ = events_tx.send(SwapEvent::SlotStatusChanged {
                            slot,
                            status: target,
                        });
                    }),
                Err(err) => Err(RuntimeError::from(err)),
            };
            after_mutation(res.is_ok(), store, persist_tx, config, ops_since_snapshot).await;
            let _ = resp.send(res);
        }
        Command::Propose {
            offered,
            requested,
            requester,
            resp,
        } => {
            let res = match store.propose(offered, requested, requester) {
                Ok((request, stored)) => commit(stored, store, events_tx, persist_tx)
                    .await
                    .map(|()| {
                        let _ = events_tx.send(SwapEvent::Proposed {
                            request: request.id,
                        });
                        request
                    }),
                Err(err) => Err(RuntimeError::from(err)),
            };
            after_mutation(res.is_ok(), store, persist_tx, config, ops_since_snapshot).await;
            let _ = resp.send(res);
        }
        Command::Resolve {
            request,
            acting,
            accepted,
            resp,
        } => {
            let res = if accepted {
                store.accept(request, acting)
            } else {
                store.reject(request, acting)
            };
            let res = match res {
                Ok((rec, stored)) => commit(stored, store, events_tx, persist_tx)
                    .await
                    .map(|()| {
                        let event = if accepted {
                            SwapEvent::Accepted { request: rec.id }
                        } else {
                            SwapEvent::Rejected { request: rec.id }
                        };
                        let _ = events_tx.send(event);
                        rec
                    }),
                Err(err) => Err(RuntimeError::from(err)),
            };
            after_mutation(res.is_ok(), store, persist_tx, config, ops_since_snapshot).await;
            let _ = resp.send(res);
        }
        Command::GetSlot { id, resp } => {
            let _ = resp.send(store.get_slot_cloned(id));
        }
        Command::GetRequest { id, resp } => {
            let _ = resp.send(store.get_request_cloned(id));
        }
        Command::SlotsForUser { user, resp } => {
            let _ = resp.send(store.slots_for_user(user));
        }
        Command::SwappableSlots { excluding, resp } => {
            let _ = resp.send(store.swappable_slots(excluding));
        }
        Command::ListForUser { user, resp } => {
            let _ = resp.send(store.list_for_user(user));
        }
        Command::Flush { resp } => {
            let out = if let Some(tx) = persist_tx {
                let (flush_tx, flush_rx) = oneshot::channel();
                if tx.send(PersistMsg::Flush { resp: flush_tx }).await.is_err() {
                    Err(RuntimeError::ChannelClosed)
                } else {
                    flush_rx
                        .await
                        .map_err(|_| RuntimeError::ChannelClosed)
                        .and_then(|r| r.map_err(RuntimeError::from))
                }
            } else {
                Ok(store.latest_op_seq())
            };
            let _ = resp.send(out);
        }
        Command::Checkpoint { resp } => {
            let out = if let Some(tx) = persist_tx {
                let snapshot = store.export_snapshot();
                let last_seq = store.latest_op_seq();
                let (cp_tx, cp_rx) = oneshot::channel();
                if tx
                    .send(PersistMsg::Checkpoint {
                        snapshot,
                        last_seq,
                        compact: config.compact_after_snapshot,
                        resp: cp_tx,
                    })
                    .await
                    .is_err()
                {
                    Err(RuntimeError::ChannelClosed)
                } else {
                    cp_rx
                        .await
                        .map_err(|_| RuntimeError::ChannelClosed)
                        .and_then(|r| r.map_err(RuntimeError::from))
                }
            } else {
                Ok(())
            };
            let _ = resp.send(out);
        }
        Command::Shutdown { resp } => {
            let out = if let Some(tx) = persist_tx {
                let (done_tx, done_rx) = oneshot::channel();
                if tx.send(PersistMsg::Shutdown { resp: done_tx }).await.is_err() {
                    Err(RuntimeError::ChannelClosed)
                } else {
                    done_rx.await.map_err(|_| RuntimeError::ChannelClosed)
                }
            } else {
                Ok(())
            };
            let _ = resp.send(out);
            return true;
        }
    }

    false
}

async fn commit(
    stored: StoredOp,
    store: &mut SwapStore,
    events_tx: &broadcast::Sender<SwapEvent>,
    persist_tx: Option<&mpsc::Sender<PersistMsg>>,
) -> Result<(), RuntimeError> {
    // The store buffers ops for standalone use; the runtime forwards the
    // stored op itself, so the buffer must not keep growing here.
    let _ = store.drain_pending_ops();
    if let Some(tx) = persist_tx {
        // A full queue slows the writer loop down until the persistence
        // worker drains; a committed op is never dropped from the journal.
        tx.send(PersistMsg::Op(stored)).await.map_err(|_| {
            RuntimeError::Persist(PersistError::Message(
                "persistence worker stopped".to_string(),
            ))
        })?;
    } else {
        let _ = events_tx.send(SwapEvent::DurableUpTo {
            op_seq: store.latest_op_seq(),
        });
    }
    Ok(())
}

async fn after_mutation(
    committed: bool,
    store: &SwapStore,
    persist_tx: Option<&mpsc::Sender<PersistMsg>>,
    config: &RuntimeConfig,
    ops_since_snapshot: &mut usize,
) {
    if !committed {
        return;
    }
    *ops_since_snapshot += 1;
    maybe_auto_checkpoint(store, persist_tx, config, ops_since_snapshot).await;
}

fn spawn_persistence_worker(
    sink: Box<dyn OpSink>,
    mut rx: mpsc::Receiver<PersistMsg>,
    durable_tx: mpsc::UnboundedSender<Result<OpSeq, PersistError>>,
    config: RuntimeConfig,
) {
    let sink = Arc::new(Mutex::new(sink));
    tokio::spawn(async move {
        let mut buf = Vec::<StoredOp>::new();
        let mut deadline = Instant::now() + Duration::from_millis(config.batch_max_latency_ms);
        let mut last_durable: OpSeq = 0;

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else {
                        let _ = flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, true).await;
                        break;
                    };

                    match msg {
                        PersistMsg::Op(stored) => {
                            let is_commit = matches!(stored.op, Op::Propose { .. } | Op::Resolve { .. });
                            buf.push(stored);

                            if buf.len() >= config.batch_max_ops || (config.flush_on_commit && is_commit) {
                                let _ = flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, true).await;
                                deadline = Instant::now() + Duration::from_millis(config.batch_max_latency_ms);
                            }
                        }
                        PersistMsg::Flush { resp } => {
                            let result = flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, true).await;
                            let _ = resp.send(result.map(|_| last_durable));
                            deadline = Instant::now() + Duration::from_millis(config.batch_max_latency_ms);
                        }
                        PersistMsg::Checkpoint { snapshot, last_seq, compact, resp } => {
                            let flush_result = flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, true).await;
                            let result = if let Err(err) = flush_result {
                                Err(err)
                            } else {
                                let sink_ref = Arc::clone(&sink);
                                match tokio::task::spawn_blocking(move || {
                                    let mut sink = sink_ref.blocking_lock();
                                    sink.write_snapshot(&snapshot, last_seq)?;
                                    if compact {
                                        let _ = sink.compact_through(last_seq)?;
                                    }
                                    Result::<(), PersistError>::Ok(())
                                }).await {
                                    Ok(inner) => inner,
                                    Err(e) => Err(PersistError::Message(format!("join error: {e}"))),
                                }
                            };
                            let _ = resp.send(result);
                            deadline = Instant::now() + Duration::from_millis(config.batch_max_latency_ms);
                        }
                        PersistMsg::Shutdown { resp } => {
                            let _ = flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, true).await;
                            let _ = resp.send(());
                            break;
                        }
                    }
                }
                _ = tokio::time::sleep_until(deadline), if !buf.is_empty() => {
                    let _ = flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, false).await;
                    deadline = Instant::now() + Duration::from_millis(config.batch_max_latency_ms);
                }
            }
        }
    });
}

async fn flush_buf(
    sink: &Arc<Mutex<Box<dyn OpSink>>>,
    buf: &mut Vec<StoredOp>,
    last_durable: &mut OpSeq,
    durable_tx: &mpsc::UnboundedSender<Result<OpSeq, PersistError>>,
    call_flush: bool,
) -> Result<(), PersistError> {
    if buf.is_empty() {
        if call_flush {
            let sink_ref = Arc::clone(sink);
            tokio::task::spawn_blocking(move || {
                let mut sink = sink_ref.blocking_lock();
                sink.flush()
            })
            .await
            .map_err(|e| PersistError::Message(format!("join error: {e}")))??;
        }
        return Ok(());
    }

    let ops = std::mem::take(buf);
    let sink_ref = Arc::clone(sink);
    let append_res: Result<OpSeq, PersistError> = tokio::task::spawn_blocking(move || {
        let mut sink = sink_ref.blocking_lock();
        let seq = sink.append_ops(&ops)?;
        if call_flush {
            sink.flush()?;
        }
        Ok(seq)
    })
    .await
    .map_err(|e| PersistError::Message(format!("join error: {e}")))?;

    match append_res {
        Ok(seq) => {
            *last_durable = (*last_durable).max(seq);
            let _ = durable_tx.send(Ok(*last_durable));
            Ok(())
        }
        Err(err) => {
            let _ = durable_tx.send(Err(PersistError::Message(format!("append failed: {err:?}"))));
            Err(err)
        }
    }
}

async fn maybe_auto_checkpoint(
    store: &SwapStore,
    persist_tx: Option<&mpsc::Sender<PersistMsg>>,
    config: &RuntimeConfig,
    ops_since_snapshot: &mut usize,
) {
    if config.snapshot_every_ops == 0 || *ops_since_snapshot < config.snapshot_every_ops {
        return;
    }

    let Some(tx) = persist_tx else {
        return;
    };

    let snapshot = store.export_snapshot();
    let last_seq = store.latest_op_seq();
    let (cp_tx, cp_rx) = oneshot::channel();
    if tx
        .send(PersistMsg::Checkpoint {
            snapshot,
            last_seq,
            compact: config.compact_after_snapshot,
            resp: cp_tx,
        })
        .await
        .is_ok()
    {
        let _ = cp_rx.await;
        *ops_since_snapshot = 0;
    }
}
