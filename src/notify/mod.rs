//! Change notification for standings
//!
//! The store publishes a [`ChangeEvent`] after every mutation. Consumers that
//! keep a live points table subscribe per tournament and re-rank on each
//! event. A [`Subscription`] releases its slot when dropped.

pub mod broadcast;

pub use broadcast::BroadcastChangeNotifier;

use crate::types::{StandingId, TournamentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tracing::{debug, warn};

/// What kind of mutation produced a change event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Registered,
    Upserted,
    CountersUpdated,
    GroupChanged,
    GroupsAssigned,
    PositionsUpdated,
    Removed,
    /// Events were dropped for a slow subscriber; consumers should reload
    Resync,
}

/// Signal that standings of a tournament changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub tournament_id: TournamentId,
    pub kind: ChangeKind,
    pub standing_ids: Vec<StandingId>,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(tournament_id: TournamentId, kind: ChangeKind, standing_ids: Vec<StandingId>) -> Self {
        Self {
            tournament_id,
            kind,
            standing_ids,
            timestamp: Utc::now(),
        }
    }

    /// Event telling a lagging subscriber to reload everything
    pub fn resync(tournament_id: TournamentId) -> Self {
        Self::new(tournament_id, ChangeKind::Resync, Vec::new())
    }
}

/// Trait for publishing and subscribing to standings changes
pub trait ChangeNotifier: Send + Sync {
    /// Publish a change to every subscriber of the event's tournament
    fn notify(&self, event: ChangeEvent);

    /// Subscribe to changes of one tournament
    fn subscribe(&self, tournament_id: TournamentId) -> Subscription;

    /// Number of live subscriptions for a tournament
    fn subscriber_count(&self, tournament_id: TournamentId) -> usize;
}

/// Scoped subscription to one tournament's change events
pub struct Subscription {
    tournament_id: TournamentId,
    receiver: Receiver<ChangeEvent>,
    on_release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Wrap a receiver; `on_release` runs exactly once when the subscription is dropped
    pub fn new(
        tournament_id: TournamentId,
        receiver: Receiver<ChangeEvent>,
        on_release: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            tournament_id,
            receiver,
            on_release: Some(Box::new(on_release)),
        }
    }

    /// Tournament this subscription listens to
    pub fn tournament_id(&self) -> TournamentId {
        self.tournament_id
    }

    /// Wait for the next change event.
    ///
    /// Returns `None` once the notifier side is gone. A lagging subscriber
    /// receives a single [`ChangeKind::Resync`] event in place of the events
    /// it missed.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(RecvError::Lagged(skipped)) => {
                warn!(
                    "Subscription for tournament {} lagged, skipped {} events",
                    self.tournament_id, skipped
                );
                Some(ChangeEvent::resync(self.tournament_id))
            }
            Err(RecvError::Closed) => None,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("tournament_id", &self.tournament_id)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.on_release.take() {
            debug!("Releasing subscription for tournament {}", self.tournament_id);
            release();
        }
    }
}
