//! Async runtime around a [`Store`].
//!
//! One task owns the store and drains a command channel. Every fetch intent a
//! transition emits is handed to its own task calling [`Fetcher::fetch`]; the
//! outcome comes back through the same channel as a completion, so store
//! transitions never interleave.

use crate::action::{Action, Dispatch};
use crate::error::{Result, StateError};
use crate::store::{RootState, Store};
use async_trait::async_trait;
use portal_protocol::{FetchCompletion, FetchIntent, FetchOutcome};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// The network side: turns an intent into an outcome. Failures are outcomes,
/// not errors.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn fetch(&self, intent: &FetchIntent) -> FetchOutcome;
}

/// What subscribers see after each processed command.
#[derive(Debug, Clone, Default)]
pub struct DriverSnapshot {
    pub root: Arc<RootState>,
    pub in_flight: usize,
    pub revision: u64,
}

enum DriverCommand {
    Dispatch {
        action: Action,
        reply: oneshot::Sender<Result<Dispatch>>,
    },
    Bootstrap {
        reply: oneshot::Sender<usize>,
    },
    Completed(FetchCompletion),
    Shutdown,
}

pub struct StoreDriver {
    command_tx: mpsc::Sender<DriverCommand>,
    snapshot_rx: watch::Receiver<DriverSnapshot>,
    task: Option<JoinHandle<Store>>,
}

impl StoreDriver {
    /// Spawn the driver loop on the current tokio runtime.
    pub fn start<F: Fetcher>(store: Store, fetcher: Arc<F>) -> Self {
        let (command_tx, command_rx) = mpsc::channel(256);
        let (snapshot_tx, snapshot_rx) = watch::channel(DriverSnapshot {
            root: Arc::new(store.snapshot()),
            in_flight: 0,
            revision: 0,
        });

        let task = tokio::spawn(run_loop(
            store,
            fetcher,
            command_rx,
            command_tx.clone(),
            snapshot_tx,
        ));

        Self {
            command_tx,
            snapshot_rx,
            task: Some(task),
        }
    }

    /// Dispatch one action and wait for the transition it caused.
    pub async fn send(&self, action: Action) -> Result<Dispatch> {
        let (reply, response) = oneshot::channel();
        self.command_tx
            .send(DriverCommand::Dispatch { action, reply })
            .await
            .map_err(|_| StateError::DriverClosed)?;
        response.await.map_err(|_| StateError::DriverClosed)?
    }

    /// Dispatch every perspective's initial load. Returns the number of
    /// fetches started.
    pub async fn bootstrap(&self) -> Result<usize> {
        let (reply, response) = oneshot::channel();
        self.command_tx
            .send(DriverCommand::Bootstrap { reply })
            .await
            .map_err(|_| StateError::DriverClosed)?;
        response.await.map_err(|_| StateError::DriverClosed)
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DriverSnapshot> {
        self.snapshot_rx.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> DriverSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Wait until no fetch is outstanding and return that snapshot.
    pub async fn settled(&self) -> Result<DriverSnapshot> {
        let mut rx = self.snapshot_rx.clone();
        let snapshot = rx
            .wait_for(|snapshot| snapshot.in_flight == 0)
            .await
            .map_err(|_| StateError::DriverClosed)?;
        Ok(snapshot.clone())
    }

    /// Stop the loop and hand the store back. Completions still in flight
    /// are dropped.
    pub async fn shutdown(mut self) -> Result<Store> {
        let _ = self.command_tx.send(DriverCommand::Shutdown).await;
        let task = self.task.take().ok_or(StateError::DriverClosed)?;
        task.await.map_err(|_| StateError::DriverClosed)
    }
}

impl Drop for StoreDriver {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.command_tx.try_send(DriverCommand::Shutdown);
        }
    }
}

struct LoopState<F> {
    fetcher: Arc<F>,
    command_tx: mpsc::Sender<DriverCommand>,
    in_flight: usize,
}

impl<F: Fetcher> LoopState<F> {
    fn spawn_fetches(&mut self, intents: Vec<FetchIntent>) {
        for intent in intents {
            self.in_flight += 1;
            let fetcher = Arc::clone(&self.fetcher);
            let command_tx = self.command_tx.clone();
            tokio::spawn(async move {
                let outcome = fetcher.fetch(&intent).await;
                let completion = intent.complete(outcome);
                if command_tx
                    .send(DriverCommand::Completed(completion))
                    .await
                    .is_err()
                {
                    log::debug!("Driver stopped before completion of {}", intent.token);
                }
            });
        }
    }

    fn apply(&mut self, store: &mut Store, action: &Action) -> Result<Dispatch> {
        let dispatch = store.dispatch(action)?;
        self.spawn_fetches(dispatch.intents().to_vec());
        Ok(dispatch)
    }
}

fn publish(
    snapshot_tx: &watch::Sender<DriverSnapshot>,
    store: &Store,
    in_flight: usize,
    revision: &mut u64,
) {
    *revision += 1;
    snapshot_tx.send_replace(DriverSnapshot {
        root: Arc::new(store.snapshot()),
        in_flight,
        revision: *revision,
    });
}

async fn run_loop<F: Fetcher>(
    mut store: Store,
    fetcher: Arc<F>,
    mut command_rx: mpsc::Receiver<DriverCommand>,
    command_tx: mpsc::Sender<DriverCommand>,
    snapshot_tx: watch::Sender<DriverSnapshot>,
) -> Store {
    let mut state = LoopState {
        fetcher,
        command_tx,
        in_flight: 0,
    };
    let mut revision = 0u64;

    while let Some(command) = command_rx.recv().await {
        match command {
            DriverCommand::Shutdown => break,
            DriverCommand::Dispatch { action, reply } => {
                let result = state.apply(&mut store, &action);
                if let Err(err) = &result {
                    log::warn!("Rejected {action:?}: {err}");
                }
                publish(&snapshot_tx, &store, state.in_flight, &mut revision);
                let _ = reply.send(result);
            }
            DriverCommand::Bootstrap { reply } => {
                let mut started = 0;
                for action in store.initial_actions() {
                    match state.apply(&mut store, &action) {
                        Ok(dispatch) => started += dispatch.intents().len(),
                        Err(err) => log::warn!("Initial load failed for {action:?}: {err}"),
                    }
                }
                log::info!("Bootstrapped store with {started} fetch(es)");
                publish(&snapshot_tx, &store, state.in_flight, &mut revision);
                let _ = reply.send(started);
            }
            DriverCommand::Completed(completion) => {
                state.in_flight = state.in_flight.saturating_sub(1);
                let action = Action::from_completion(completion);
                if let Err(err) = state.apply(&mut store, &action) {
                    log::warn!("Completion rejected: {err}");
                }
                publish(&snapshot_tx, &store, state.in_flight, &mut revision);
            }
        }
    }

    log::debug!("Store driver stopped after {revision} update(s)");
    store
}
