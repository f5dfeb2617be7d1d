// Process-wide map of live draft sessions.
//
// A constructed object, not a global: whoever owns connection handling gets
// a registry handle injected, and tests build isolated instances.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::info;

use super::session::DraftSession;

#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<i64, Arc<DraftSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the live session for a league, if any.
    pub fn get(&self, league_id: i64) -> Option<Arc<DraftSession>> {
        self.lock().get(&league_id).cloned()
    }

    /// Fetch the live session or create one with `create`. Idempotent:
    /// starting a draft that already has a session returns the existing
    /// one and `create` is never called. A created session is reaped from
    /// the registry automatically once it finishes.
    pub fn get_or_create<F>(&self, league_id: i64, create: F) -> Arc<DraftSession>
    where
        F: FnOnce() -> Arc<DraftSession>,
    {
        let mut guard = self.lock();
        if let Some(existing) = guard.get(&league_id) {
            return Arc::clone(existing);
        }
        let session = create();
        guard.insert(league_id, Arc::clone(&session));
        drop(guard);

        let registry = self.clone();
        let watched = Arc::clone(&session);
        tokio::spawn(async move {
            watched.finished().await;
            registry.destroy(league_id);
        });

        session
    }

    /// Drop the registry entry for a league. The session itself keeps
    /// running until its driver finishes; this only removes the handle.
    pub fn destroy(&self, league_id: i64) {
        if self.lock().remove(&league_id).is_some() {
            info!(league_id, "draft session removed from registry");
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i64, Arc<DraftSession>>> {
        self.inner.lock().expect("registry lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DraftCatalog;
    use crate::db::Database;
    use crate::draft::order::build_order;
    use crate::draft::session::SessionConfig;
    use crate::hub::BroadcastHub;
    use crate::model::{Movie, MovieStatus};
    use crate::scoring::projection::BudgetHeuristic;
    use std::time::Duration;

    fn spawn_session(league_id: i64) -> Arc<DraftSession> {
        let movies: Vec<Movie> = (1..=4)
            .map(|id| Movie {
                id,
                tmdb_id: id * 1000,
                title: format!("Movie {id}"),
                release_date: None,
                poster_url: String::new(),
                budget: 10_000_000.0 * id as f64,
                domestic_gross: 0.0,
                worldwide_gross: 0.0,
                opening_weekend_gross: 0.0,
                rt_score: 0.0,
                number_one_opening: false,
                status: MovieStatus::Upcoming,
            })
            .collect();
        DraftSession::spawn(
            SessionConfig {
                league_id,
                pick_window: Duration::from_secs(600),
            },
            build_order(&[10, 20], 1),
            DraftCatalog::from_movies(&movies, &BudgetHeuristic),
            Arc::new(Database::open(":memory:").unwrap()),
            BroadcastHub::new(16),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn get_or_create_is_idempotent() {
        let registry = SessionRegistry::new();
        let first = registry.get_or_create(1, || spawn_session(1));
        let second = registry.get_or_create(1, || panic!("must not create a second session"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_are_isolated_per_league() {
        let registry = SessionRegistry::new();
        let a = registry.get_or_create(1, || spawn_session(1));
        let b = registry.get_or_create(2, || spawn_session(2));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn get_returns_none_for_unknown_league() {
        let registry = SessionRegistry::new();
        assert!(registry.get(42).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn destroy_removes_the_entry() {
        let registry = SessionRegistry::new();
        registry.get_or_create(1, || spawn_session(1));
        registry.destroy(1);
        assert!(registry.get(1).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn finished_session_is_reaped() {
        let registry = SessionRegistry::new();
        let session = registry.get_or_create(1, || spawn_session(1));

        session.make_pick(10, 1).await.unwrap();
        session.make_pick(20, 2).await.unwrap();
        session.finished().await;

        // Give the reaper task a turn.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(registry.get(1).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn isolated_registries_do_not_share_sessions() {
        let registry_a = SessionRegistry::new();
        let registry_b = SessionRegistry::new();
        registry_a.get_or_create(1, || spawn_session(1));
        assert!(registry_b.get(1).is_none());
    }
}
