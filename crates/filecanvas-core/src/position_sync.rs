//! Fire-and-forget confirmation of committed moves.
//!
//! The local store is updated before anything here runs. Confirmations go
//! out on background threads and their outcomes come back over a channel
//! that the owner drains from its loop. Failures are logged, never rolled
//! back: positions are soft state that heals on the next refresh or
//! broadcast.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use crate::api::FileApi;
use crate::file::FileId;

/// Result of one confirmation request.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    pub id: FileId,
    pub x: f64,
    pub y: f64,
    /// `Err` carries the failure message.
    pub result: Result<(), String>,
}

/// Dispatches position confirmations to the server.
pub struct PositionSync {
    api: Arc<dyn FileApi>,
    tx: Sender<SyncOutcome>,
    rx: Receiver<SyncOutcome>,
    in_flight: usize,
}

impl PositionSync {
    pub fn new(api: Arc<dyn FileApi>) -> Self {
        let (tx, rx) = channel();
        Self {
            api,
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Send the new coordinates of `id` without waiting for the answer.
    pub fn confirm(&mut self, id: FileId, x: f64, y: f64) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        self.in_flight += 1;
        let spawned = thread::Builder::new()
            .name(format!("position-sync-{}", id))
            .spawn(move || {
                let result = api.update_position(id, x, y).map_err(|e| e.to_string());
                // The receiver is gone after teardown; nobody cares anymore.
                let _ = tx.send(SyncOutcome { id, x, y, result });
            });
        if let Err(e) = spawned {
            self.in_flight -= 1;
            log::warn!("Could not dispatch position confirmation for file {}: {}", id, e);
        }
    }

    /// Number of confirmations that have not reported back yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Collect finished confirmations, logging failures.
    pub fn drain(&mut self) -> Vec<SyncOutcome> {
        let outcomes: Vec<SyncOutcome> = self.rx.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(outcomes.len());
        for outcome in &outcomes {
            match outcome.result {
                Ok(()) => log::debug!("Position of file {} confirmed", outcome.id),
                Err(ref e) => log::warn!(
                    "Position confirmation for file {} at ({:.1}, {:.1}) failed: {}",
                    outcome.id,
                    outcome.x,
                    outcome.y,
                    e
                ),
            }
        }
        outcomes
    }
}
