// Box-office data ingestion.
//
// The one collaborator allowed to mutate Movie facts. Fetches remote
// details per movie, applies release transitions and the critical-score
// proxy, detects opening weekends on the upcoming -> released edge, then
// triggers settlement. The draft engine never calls into this module.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::IngestConfig;
use crate::db::Database;
use crate::model::{Movie, MovieStatus};
use crate::scoring::settle;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Remote movie details, shaped like the TMDB movie endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFacts {
    #[serde(default)]
    pub budget: f64,
    /// Worldwide revenue to date.
    #[serde(default)]
    pub revenue: f64,
    /// Domestic split when the source provides one; falls back to revenue.
    #[serde(default)]
    pub domestic_revenue: Option<f64>,
    /// 0-10 vote average, proxied onto the 0-100 critical scale.
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub release_date: Option<String>,
}

/// Seam for the remote movie API so sync logic is testable offline.
#[async_trait]
pub trait MovieDataSource: Send + Sync {
    async fn fetch(&self, tmdb_id: i64) -> Result<RemoteFacts, IngestError>;
}

/// HTTP implementation against a TMDB-shaped API.
pub struct HttpDataSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpDataSource {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        HttpDataSource {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl MovieDataSource for HttpDataSource {
    async fn fetch(&self, tmdb_id: i64) -> Result<RemoteFacts, IngestError> {
        let url = format!("{}/movie/{}", self.base_url, tmdb_id);
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

/// Ingestion client assembled from config. Disabled (a no-op) when no base
/// URL is configured, so a dev instance runs without network access.
pub enum IngestClient {
    Active(Arc<dyn MovieDataSource>),
    Disabled,
}

impl IngestClient {
    pub fn from_config(config: &IngestConfig) -> Self {
        if config.base_url.is_empty() {
            IngestClient::Disabled
        } else {
            IngestClient::Active(Arc::new(HttpDataSource::new(
                &config.base_url,
                &config.api_key,
            )))
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SyncReport {
    pub synced: usize,
    pub failed: usize,
    pub released_transitions: usize,
}

/// Apply remote facts to a stored movie. Pure; `today` decides whether the
/// movie counts as released.
pub fn apply_facts(movie: &Movie, facts: &RemoteFacts, today: NaiveDate) -> Movie {
    let mut updated = movie.clone();

    if facts.budget > 0.0 {
        updated.budget = facts.budget;
    }

    let release_date = facts
        .release_date
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .or(movie.release_date);
    updated.release_date = release_date;

    let released = release_date.map(|d| d <= today).unwrap_or(false);
    if released {
        updated.worldwide_gross = facts.revenue;
        updated.domestic_gross = facts.domestic_revenue.unwrap_or(facts.revenue);

        // Opening weekend detection: the first nonzero revenue seen on the
        // upcoming -> released transition is the opening weekend figure.
        if movie.status == MovieStatus::Upcoming
            && facts.revenue > 0.0
            && movie.opening_weekend_gross == 0.0
        {
            updated.opening_weekend_gross = facts.revenue;
        }

        // Free agents stay free agents; everything else becomes released.
        if movie.status != MovieStatus::FreeAgent {
            updated.status = MovieStatus::Released;
        }
    }

    updated.rt_score = (facts.vote_average * 10.0).clamp(0.0, 100.0);

    updated
}

/// Refresh every catalog movie from the remote source, then settle scores.
pub async fn sync_catalog(
    db: &Database,
    source: &dyn MovieDataSource,
    today: NaiveDate,
) -> Result<SyncReport, IngestError> {
    let movies = db.all_movies().map_err(|e| IngestError::Storage(format!("{e:#}")))?;
    let mut report = SyncReport::default();

    for movie in &movies {
        let facts = match source.fetch(movie.tmdb_id).await {
            Ok(facts) => facts,
            Err(e) => {
                warn!(tmdb_id = movie.tmdb_id, "sync fetch failed: {e}");
                report.failed += 1;
                continue;
            }
        };

        let updated = apply_facts(movie, &facts, today);
        if movie.status == MovieStatus::Upcoming && updated.status == MovieStatus::Released {
            info!(
                movie_id = movie.id,
                title = %movie.title,
                opening = updated.opening_weekend_gross,
                "movie released"
            );
            report.released_transitions += 1;
        }
        db.update_movie_facts(&updated)
            .map_err(|e| IngestError::Storage(format!("{e:#}")))?;
        report.synced += 1;
    }

    settle::recalculate_scores(db).map_err(|e| IngestError::Storage(format!("{e:#}")))?;

    info!(
        synced = report.synced,
        failed = report.failed,
        released = report.released_transitions,
        "catalog sync complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn upcoming(tmdb_id: i64) -> Movie {
        Movie {
            id: 0,
            tmdb_id,
            title: format!("Movie {tmdb_id}"),
            release_date: NaiveDate::from_ymd_opt(2025, 7, 11),
            poster_url: String::new(),
            budget: 100_000_000.0,
            domestic_gross: 0.0,
            worldwide_gross: 0.0,
            opening_weekend_gross: 0.0,
            rt_score: 0.0,
            number_one_opening: false,
            status: MovieStatus::Upcoming,
        }
    }

    fn facts(revenue: f64, vote: f64, release: &str) -> RemoteFacts {
        RemoteFacts {
            budget: 0.0,
            revenue,
            domestic_revenue: None,
            vote_average: vote,
            release_date: Some(release.to_string()),
        }
    }

    struct MapSource(HashMap<i64, RemoteFacts>);

    #[async_trait]
    impl MovieDataSource for MapSource {
        async fn fetch(&self, tmdb_id: i64) -> Result<RemoteFacts, IngestError> {
            self.0.get(&tmdb_id).cloned().ok_or(IngestError::Storage(
                format!("no fixture for {tmdb_id}"),
            ))
        }
    }

    #[test]
    fn release_transition_sets_gross_and_opening() {
        let movie = upcoming(1);
        let today = NaiveDate::from_ymd_opt(2025, 7, 14).unwrap();
        let updated = apply_facts(&movie, &facts(125_000_000.0, 7.8, "2025-07-11"), today);

        assert_eq!(updated.status, MovieStatus::Released);
        assert_eq!(updated.worldwide_gross, 125_000_000.0);
        assert_eq!(updated.domestic_gross, 125_000_000.0);
        // First nonzero revenue on the transition is the opening weekend.
        assert_eq!(updated.opening_weekend_gross, 125_000_000.0);
        assert_eq!(updated.rt_score, 78.0);
    }

    #[test]
    fn future_release_date_stays_upcoming() {
        let movie = upcoming(1);
        let today = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let updated = apply_facts(&movie, &facts(0.0, 6.0, "2025-07-11"), today);
        assert_eq!(updated.status, MovieStatus::Upcoming);
        assert_eq!(updated.worldwide_gross, 0.0);
        assert_eq!(updated.opening_weekend_gross, 0.0);
    }

    #[test]
    fn opening_weekend_is_not_overwritten_on_later_syncs() {
        let mut movie = upcoming(1);
        movie.status = MovieStatus::Released;
        movie.opening_weekend_gross = 80_000_000.0;

        let today = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        let updated = apply_facts(&movie, &facts(300_000_000.0, 7.0, "2025-07-11"), today);
        assert_eq!(updated.opening_weekend_gross, 80_000_000.0);
        assert_eq!(updated.worldwide_gross, 300_000_000.0);
    }

    #[test]
    fn free_agents_keep_their_status() {
        let mut movie = upcoming(1);
        movie.status = MovieStatus::FreeAgent;
        let today = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        let updated = apply_facts(&movie, &facts(50_000_000.0, 5.0, "2025-07-11"), today);
        assert_eq!(updated.status, MovieStatus::FreeAgent);
    }

    #[test]
    fn vote_average_is_clamped_to_scale() {
        let movie = upcoming(1);
        let today = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        let updated = apply_facts(&movie, &facts(1.0, 11.2, "2025-07-11"), today);
        assert_eq!(updated.rt_score, 100.0);
    }

    #[test]
    fn domestic_split_used_when_present() {
        let movie = upcoming(1);
        let today = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        let mut remote = facts(500_000_000.0, 7.0, "2025-07-11");
        remote.domestic_revenue = Some(200_000_000.0);
        let updated = apply_facts(&movie, &remote, today);
        assert_eq!(updated.domestic_gross, 200_000_000.0);
        assert_eq!(updated.worldwide_gross, 500_000_000.0);
    }

    #[tokio::test]
    async fn sync_updates_store_and_settles() {
        let db = Database::open(":memory:").unwrap();
        let a = db.insert_movie(&upcoming(1)).unwrap();
        let b = db.insert_movie(&upcoming(2)).unwrap();

        let mut fixtures = HashMap::new();
        // Movie 1 released with revenue and a fresh vote; movie 2 is still
        // a year out.
        fixtures.insert(1, facts(240_000_000.0, 8.0, "2025-07-11"));
        fixtures.insert(2, facts(0.0, 0.0, "2026-01-01"));

        let today = NaiveDate::from_ymd_opt(2025, 7, 14).unwrap();
        let source = MapSource(fixtures);
        let report = sync_catalog(&db, &source, today).await.unwrap();

        assert_eq!(report.synced, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(report.released_transitions, 1);

        let released = db.movie(a).unwrap().unwrap();
        assert_eq!(released.status, MovieStatus::Released);
        assert!(db.movie_points(a).unwrap() > 0.0);

        let still_upcoming = db.movie(b).unwrap().unwrap();
        assert_eq!(still_upcoming.status, MovieStatus::Upcoming);
        assert_eq!(db.movie_points(b).unwrap(), 0.0);
    }

    #[tokio::test]
    async fn sync_counts_fetch_failures_without_aborting() {
        let db = Database::open(":memory:").unwrap();
        db.insert_movie(&upcoming(1)).unwrap();
        db.insert_movie(&upcoming(7)).unwrap();

        let mut fixtures = HashMap::new();
        fixtures.insert(1, facts(10_000_000.0, 5.0, "2026-01-01"));
        let source = MapSource(fixtures);

        let today = NaiveDate::from_ymd_opt(2025, 7, 14).unwrap();
        let report = sync_catalog(&db, &source, today).await.unwrap();
        assert_eq!(report.synced, 1);
        assert_eq!(report.failed, 1);
    }
}
