use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::error::LeaderboardError;
use crate::leaderboard::{LeaderboardQuery, LeaderboardStore, RaceResult};

#[derive(Debug, Clone)]
pub enum LeaderboardCommand {
    /// Insert a result, then refresh with `refresh` if the insert succeeded.
    Save {
        result: RaceResult,
        refresh: LeaderboardQuery,
    },
    Refresh(LeaderboardQuery),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LeaderboardReply {
    Refreshed {
        query: LeaderboardQuery,
        entries: Vec<RaceResult>,
    },
}

/// Fire-and-forget access to the leaderboard. Commands never block the
/// caller; replies are picked up later with [`LeaderboardClient::try_recv`].
pub trait LeaderboardClient {
    fn send(&self, command: LeaderboardCommand) -> Result<(), LeaderboardError>;
    fn try_recv(&self) -> Option<LeaderboardReply>;
}

/// Owns the leaderboard store on a background thread.
pub struct LeaderboardWorker {
    tx: Option<Sender<LeaderboardCommand>>,
    rx: Receiver<LeaderboardReply>,
    handle: Option<JoinHandle<()>>,
}

impl LeaderboardWorker {
    pub fn spawn<S>(store: S) -> Self
    where
        S: LeaderboardStore + Send + 'static,
    {
        Self::spawn_with(move || Ok(store))
    }

    /// Opens the store on the worker thread. If opening fails every later
    /// command is logged and dropped.
    pub fn spawn_with<S, F>(open: F) -> Self
    where
        S: LeaderboardStore + 'static,
        F: FnOnce() -> Result<S, LeaderboardError> + Send + 'static,
    {
        let (tx, cmd_rx) = mpsc::channel();
        let (reply_tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let mut store = match open() {
                Ok(store) => Some(store),
                Err(e) => {
                    error!(error = %e, "leaderboard unavailable");
                    None
                }
            };
            run(&mut store, cmd_rx, reply_tx);
        });

        Self {
            tx: Some(tx),
            rx,
            handle: Some(handle),
        }
    }

    /// Blocks up to `timeout` for the next reply.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<LeaderboardReply> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Processes every queued command, then stops the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("leaderboard worker panicked");
            }
        }
    }
}

impl Drop for LeaderboardWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl LeaderboardClient for LeaderboardWorker {
    fn send(&self, command: LeaderboardCommand) -> Result<(), LeaderboardError> {
        let tx = self.tx.as_ref().ok_or(LeaderboardError::WorkerGone)?;
        tx.send(command).map_err(|_| LeaderboardError::WorkerGone)
    }

    fn try_recv(&self) -> Option<LeaderboardReply> {
        self.rx.try_recv().ok()
    }
}

fn run<S: LeaderboardStore>(
    store: &mut Option<S>,
    commands: Receiver<LeaderboardCommand>,
    replies: Sender<LeaderboardReply>,
) {
    for command in commands {
        let Some(store) = store.as_mut() else {
            error!(?command, "dropping leaderboard command, store unavailable");
            continue;
        };

        let refresh = match command {
            LeaderboardCommand::Save { result, refresh } => {
                if let Err(e) = store.insert_race_result(&result) {
                    error!(error = %e, player = %result.player_name, "error saving race result");
                    continue;
                }
                info!(player = %result.player_name, wpm = result.wpm, "race result saved");
                refresh
            }
            LeaderboardCommand::Refresh(query) => query,
        };

        match store.query_top_results(&refresh) {
            Ok(entries) => {
                debug!(rows = entries.len(), "leaderboard loaded");
                let reply = LeaderboardReply::Refreshed {
                    query: refresh,
                    entries,
                };
                if replies.send(reply).is_err() {
                    break;
                }
            }
            Err(e) => error!(error = %e, "error loading leaderboard"),
        }
    }
}
