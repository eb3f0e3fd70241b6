//! In-process change notifier backed by tokio broadcast channels

use crate::notify::{ChangeEvent, ChangeNotifier, Subscription};
use crate::types::TournamentId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::broadcast;
use tracing::{debug, error, info};

/// Default number of buffered events per tournament
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

struct TournamentChannel {
    generation: u64,
    sender: broadcast::Sender<ChangeEvent>,
    subscribers: usize,
}

type ChannelMap = Mutex<HashMap<TournamentId, TournamentChannel>>;

/// Notifier keeping one broadcast channel per subscribed tournament.
///
/// Channels are created on first subscription and removed when the last
/// subscription is dropped.
pub struct BroadcastChangeNotifier {
    channels: Arc<ChannelMap>,
    capacity: usize,
    next_generation: AtomicU64,
}

impl BroadcastChangeNotifier {
    /// Create a notifier buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Drop a tournament's channel, ending every subscription to it
    pub fn close(&self, tournament_id: TournamentId) {
        match self.channels.lock() {
            Ok(mut channels) => {
                if channels.remove(&tournament_id).is_some() {
                    info!("Closed change channel for tournament {}", tournament_id);
                }
            }
            Err(_) => error!("Failed to acquire change channel lock"),
        }
    }

    /// Drop every channel, ending all subscriptions
    pub fn close_all(&self) {
        match self.channels.lock() {
            Ok(mut channels) => {
                let closed = channels.len();
                channels.clear();
                info!("Closed {} change channels", closed);
            }
            Err(_) => error!("Failed to acquire change channel lock"),
        }
    }

    fn release(channels: &Weak<ChannelMap>, tournament_id: TournamentId, generation: u64) {
        let Some(channels) = channels.upgrade() else {
            return;
        };
        let Ok(mut channels) = channels.lock() else {
            error!("Failed to acquire change channel lock on release");
            return;
        };

        if let Some(channel) = channels.get_mut(&tournament_id) {
            if channel.generation != generation {
                return;
            }
            channel.subscribers = channel.subscribers.saturating_sub(1);
            if channel.subscribers == 0 {
                channels.remove(&tournament_id);
                debug!("Removed idle change channel for tournament {}", tournament_id);
            }
        }
    }
}

impl Default for BroadcastChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl ChangeNotifier for BroadcastChangeNotifier {
    fn notify(&self, event: ChangeEvent) {
        let Ok(channels) = self.channels.lock() else {
            error!("Failed to acquire change channel lock");
            return;
        };

        match channels.get(&event.tournament_id) {
            Some(channel) => {
                let tournament_id = event.tournament_id;
                let kind = event.kind;
                match channel.sender.send(event) {
                    Ok(receivers) => debug!(
                        "Sent {:?} change for tournament {} to {} subscribers",
                        kind, tournament_id, receivers
                    ),
                    Err(_) => debug!(
                        "No live receivers for tournament {} change",
                        tournament_id
                    ),
                }
            }
            None => debug!(
                "No subscribers for tournament {}, dropping {:?} change",
                event.tournament_id, event.kind
            ),
        }
    }

    fn subscribe(&self, tournament_id: TournamentId) -> Subscription {
        let mut channels = match self.channels.lock() {
            Ok(channels) => channels,
            Err(poisoned) => {
                error!("Change channel lock poisoned, recovering");
                poisoned.into_inner()
            }
        };

        let capacity = self.capacity;
        let channel = channels.entry(tournament_id).or_insert_with(|| {
            let (sender, _) = broadcast::channel(capacity);
            TournamentChannel {
                generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
                sender,
                subscribers: 0,
            }
        });
        channel.subscribers += 1;

        let receiver = channel.sender.subscribe();
        let generation = channel.generation;
        let weak = Arc::downgrade(&self.channels);

        debug!(
            "New subscription for tournament {} ({} active)",
            tournament_id, channel.subscribers
        );

        Subscription::new(tournament_id, receiver, move || {
            Self::release(&weak, tournament_id, generation)
        })
    }

    fn subscriber_count(&self, tournament_id: TournamentId) -> usize {
        self.channels
            .lock()
            .ok()
            .and_then(|channels| channels.get(&tournament_id).map(|c| c.subscribers))
            .unwrap_or(0)
    }
}
