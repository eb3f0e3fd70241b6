//! Test fixtures and recording collaborators for integration testing

#![allow(dead_code)]

use standings_ranker::config::RankingSettings;
use standings_ranker::notify::{
    BroadcastChangeNotifier, ChangeEvent, ChangeKind, ChangeNotifier, Subscription,
};
use standings_ranker::service::StandingsService;
use standings_ranker::store::InMemoryRecordStore;
use standings_ranker::types::{TeamSize, TeamStanding, TournamentId};
use std::sync::{Arc, Mutex};

/// Notifier that records every event before forwarding it to a broadcast notifier
#[derive(Default)]
pub struct RecordingNotifier {
    inner: BroadcastChangeNotifier,
    events: Mutex<Vec<ChangeEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded events (for testing)
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Count events of a specific kind
    pub fn count_events_of_kind(&self, kind: ChangeKind) -> usize {
        self.events().iter().filter(|event| event.kind == kind).count()
    }

    pub fn close(&self, tournament_id: TournamentId) {
        self.inner.close(tournament_id);
    }
}

impl ChangeNotifier for RecordingNotifier {
    fn notify(&self, event: ChangeEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
        self.inner.notify(event);
    }

    fn subscribe(&self, tournament_id: TournamentId) -> Subscription {
        self.inner.subscribe(tournament_id)
    }

    fn subscriber_count(&self, tournament_id: TournamentId) -> usize {
        self.inner.subscriber_count(tournament_id)
    }
}

/// A complete service wired to an in-memory store and a recording notifier
pub struct TestSystem {
    pub service: Arc<StandingsService>,
    pub store: Arc<InMemoryRecordStore>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn create_test_system() -> TestSystem {
    let notifier = Arc::new(RecordingNotifier::new());
    let store = Arc::new(InMemoryRecordStore::with_notifier(notifier.clone()));
    let service = Arc::new(StandingsService::new(
        store.clone(),
        notifier.clone(),
        RankingSettings::default(),
    ));

    TestSystem {
        service,
        store,
        notifier,
    }
}

/// Standing with the given counters and no group
pub fn standing(
    tournament_id: TournamentId,
    name: &str,
    points: i64,
    kills: i64,
    wins: i64,
) -> TeamStanding {
    TeamStanding::new(tournament_id, name, TeamSize::Squad).with_counters(points, kills, wins)
}

/// Standing with the given counters in `group`
pub fn grouped_standing(
    tournament_id: TournamentId,
    name: &str,
    group: &str,
    points: i64,
    kills: i64,
    wins: i64,
) -> TeamStanding {
    standing(tournament_id, name, points, kills, wins).with_group(group)
}

/// Team names of a ranked list, in order
pub fn names(standings: &[TeamStanding]) -> Vec<String> {
    standings.iter().map(|s| s.team_name.clone()).collect()
}
