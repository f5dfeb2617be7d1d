// Draft control surface.
//
// `DraftService` is what an HTTP layer (out of scope here) would call into:
// start draft, status, make pick, projections, trade analysis, waiver
// claims. Everything is dependency-injected so tests construct isolated
// instances; there is no module-level state.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::catalog::DraftCatalog;
use crate::config::Config;
use crate::db::Database;
use crate::draft::order::build_order;
use crate::draft::registry::SessionRegistry;
use crate::draft::session::{DraftSession, DraftSnapshot, LedgerEntry, SessionConfig, SessionPhase};
use crate::draft::DraftError;
use crate::hub::BroadcastHub;
use crate::model::{AcquisitionType, LeagueStatus, Movie, MovieStatus};
use crate::scoring::engine::{score_movie, ScoreError};
use crate::scoring::projection::{
    league_baseline, project_movie, Projection, ProjectionStrategy,
};
use crate::scoring::trade::{analyze_trade, TradeAnalysis};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl ApiError {
    fn storage(e: anyhow::Error) -> Self {
        ApiError::Storage(format!("{e:#}"))
    }
}

/// Projection payload for the movie projections endpoint. The probabilistic
/// projection sits beside the actuals so a client can show both without
/// ever conflating them.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectionReport {
    pub movie_id: i64,
    pub title: String,
    pub status: MovieStatus,
    /// Realized score so far; 0 until release.
    pub current_points: f64,
    pub projection: Projection,
    pub actual_domestic: f64,
    pub actual_worldwide: f64,
    pub actual_opening: f64,
}

pub struct DraftService {
    db: Arc<Database>,
    registry: SessionRegistry,
    hub: BroadcastHub,
    strategy: Arc<dyn ProjectionStrategy>,
    pick_window: Duration,
    rounds: u32,
    trade_threshold: f64,
}

impl DraftService {
    pub fn new(
        db: Arc<Database>,
        registry: SessionRegistry,
        hub: BroadcastHub,
        strategy: Arc<dyn ProjectionStrategy>,
        config: &Config,
    ) -> Self {
        DraftService {
            db,
            registry,
            hub,
            strategy,
            pick_window: config.pick_duration(),
            rounds: config.draft.rounds,
            trade_threshold: config.trade.threshold,
        }
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    // -----------------------------------------------------------------------
    // Draft control
    // -----------------------------------------------------------------------

    /// Start a league's draft: freeze the team order, build the snake
    /// order, persist the pick skeleton, flip the league to drafting, and
    /// spawn the session.
    pub async fn start_draft(&self, league_id: i64) -> Result<Arc<DraftSession>, ApiError> {
        if self.registry.get(league_id).is_some() {
            return Err(DraftError::AlreadyDrafting { league_id }.into());
        }

        let league = self
            .db
            .league(league_id)
            .map_err(ApiError::storage)?
            .ok_or_else(|| ApiError::NotFound(format!("league {league_id}")))?;
        if league.status != LeagueStatus::Pending {
            return Err(DraftError::AlreadyDrafting { league_id }.into());
        }

        let teams = self.db.league_teams(league_id).map_err(ApiError::storage)?;
        if teams.len() < 2 {
            return Err(DraftError::TooFewTeams { count: teams.len() }.into());
        }

        let upcoming = self
            .db
            .movies_with_status(MovieStatus::Upcoming)
            .map_err(ApiError::storage)?;
        let required = teams.len() * self.rounds as usize;
        if upcoming.len() < required {
            return Err(DraftError::InsufficientMovies {
                available: upcoming.len(),
                required,
            }
            .into());
        }

        // Team order is the league's insertion order, frozen here.
        let team_ids: Vec<i64> = teams.iter().map(|t| t.id).collect();
        let slots = build_order(&team_ids, self.rounds);

        self.db
            .insert_pick_slots(league_id, &slots)
            .map_err(ApiError::storage)?;
        self.db
            .set_league_status(league_id, LeagueStatus::Drafting)
            .map_err(ApiError::storage)?;

        let catalog = DraftCatalog::from_movies(
            &self.db.all_movies().map_err(ApiError::storage)?,
            self.strategy.as_ref(),
        );

        let db = Arc::clone(&self.db);
        let hub = self.hub.clone();
        let pick_window = self.pick_window;
        let session = self.registry.get_or_create(league_id, move || {
            DraftSession::spawn(
                SessionConfig {
                    league_id,
                    pick_window,
                },
                slots,
                catalog,
                db,
                hub,
            )
        });

        // Don't hand the session back until its clock is armed and the
        // first snapshot is out; callers read status immediately.
        session.started().await;

        info!(
            league_id,
            teams = teams.len(),
            rounds = self.rounds,
            total_picks = required,
            "draft started"
        );
        Ok(session)
    }

    /// Full draft status: live snapshot when a session exists, otherwise
    /// reconstructed from the store.
    pub fn draft_status(&self, league_id: i64) -> Result<DraftSnapshot, ApiError> {
        if let Some(session) = self.registry.get(league_id) {
            return Ok((*session.snapshot()).clone());
        }
        self.status_from_store(league_id)
    }

    /// Make a pick on behalf of `team_id` (already resolved from caller
    /// identity). This is the authoritative commit path; the WebSocket
    /// `pick` message funnels into it too.
    pub async fn make_pick(
        &self,
        league_id: i64,
        team_id: i64,
        movie_id: i64,
    ) -> Result<LedgerEntry, ApiError> {
        if movie_id <= 0 {
            return Err(DraftError::Validation(format!("invalid movie id {movie_id}")).into());
        }
        let session = self
            .registry
            .get(league_id)
            .ok_or(DraftError::DraftNotActive { league_id })?;
        Ok(session.make_pick(team_id, movie_id).await?)
    }

    /// Abort a league's live draft. Returns false when there was nothing
    /// to abort.
    pub async fn abort_draft(&self, league_id: i64) -> Result<bool, ApiError> {
        match self.registry.get(league_id) {
            Some(session) => Ok(session.abort().await),
            None => Err(DraftError::DraftNotActive { league_id }.into()),
        }
    }

    fn status_from_store(&self, league_id: i64) -> Result<DraftSnapshot, ApiError> {
        let league = self
            .db
            .league(league_id)
            .map_err(ApiError::storage)?
            .ok_or_else(|| ApiError::NotFound(format!("league {league_id}")))?;

        let picks = self.db.league_picks(league_id).map_err(ApiError::storage)?;
        let movies = self.db.all_movies().map_err(ApiError::storage)?;
        let title_of = |id: i64| movies.iter().find(|m| m.id == id);

        let ledger: Vec<LedgerEntry> = picks
            .iter()
            .filter_map(|p| {
                let fulfilled_at = p.fulfilled_at?;
                let movie = p.movie_id.and_then(title_of);
                Some(LedgerEntry {
                    pick_number: p.pick_number,
                    round: p.round,
                    team_id: p.team_id,
                    movie_id: p.movie_id,
                    movie_title: movie.map(|m| m.title.clone()),
                    poster_url: movie.map(|m| m.poster_url.clone()),
                    acquisition: p.acquisition_type.unwrap_or(AcquisitionType::Draft),
                    skipped: p.skipped,
                    fulfilled_at,
                })
            })
            .collect();

        let open = picks.iter().find(|p| p.fulfilled_at.is_none());
        let phase = match league.status {
            LeagueStatus::Pending => SessionPhase::Waiting,
            // A drafting league with no live session is a dead draft.
            LeagueStatus::Drafting => SessionPhase::Aborted,
            LeagueStatus::Active | LeagueStatus::Completed => SessionPhase::Completed,
        };

        Ok(DraftSnapshot {
            league_id,
            phase,
            current_pick_number: open.map(|p| p.pick_number),
            on_clock_team: open.map(|p| p.team_id),
            deadline: None,
            total_picks: picks.len() as u32,
            ledger,
        })
    }

    // -----------------------------------------------------------------------
    // Scoring and valuation
    // -----------------------------------------------------------------------

    /// Probabilistic projection for one movie, with actuals alongside.
    pub fn movie_projection(&self, movie_id: i64) -> Result<ProjectionReport, ApiError> {
        let movie = self
            .db
            .movie(movie_id)
            .map_err(ApiError::storage)?
            .ok_or_else(|| ApiError::NotFound(format!("movie {movie_id}")))?;

        let upcoming = self
            .db
            .movies_with_status(MovieStatus::Upcoming)
            .map_err(ApiError::storage)?;
        let baseline = league_baseline(self.strategy.as_ref(), &upcoming);
        let projection = project_movie(self.strategy.as_ref(), &movie, baseline);

        let current_points = if movie.status == MovieStatus::Upcoming {
            0.0
        } else {
            score_movie(&movie)?.total
        };

        Ok(ProjectionReport {
            movie_id: movie.id,
            title: movie.title.clone(),
            status: movie.status,
            current_points,
            projection,
            actual_domestic: movie.domestic_gross,
            actual_worldwide: movie.worldwide_gross,
            actual_opening: movie.opening_weekend_gross,
        })
    }

    /// Compare two proposed movie sets for a trade.
    pub fn trade_analysis(
        &self,
        give_ids: &[i64],
        receive_ids: &[i64],
    ) -> Result<TradeAnalysis, ApiError> {
        let give = self.load_movies(give_ids)?;
        let receive = self.load_movies(receive_ids)?;
        Ok(analyze_trade(
            self.strategy.as_ref(),
            &give,
            &receive,
            self.trade_threshold,
        )?)
    }

    /// Claim a free agent onto a roster. Upcoming movies must go through
    /// the draft; anything already owned in the league is off limits.
    pub fn claim_waiver(
        &self,
        league_id: i64,
        team_id: i64,
        movie_id: i64,
    ) -> Result<(), ApiError> {
        let movie = self
            .db
            .movie(movie_id)
            .map_err(ApiError::storage)?
            .ok_or_else(|| ApiError::NotFound(format!("movie {movie_id}")))?;
        if movie.status == MovieStatus::Upcoming {
            return Err(DraftError::MovieUnavailable { movie_id }.into());
        }

        let teams = self.db.league_teams(league_id).map_err(ApiError::storage)?;
        if !teams.iter().any(|t| t.id == team_id) {
            return Err(DraftError::Validation(format!(
                "team {team_id} is not in league {league_id}"
            ))
            .into());
        }

        if self
            .db
            .movie_rostered_in_league(league_id, movie_id)
            .map_err(ApiError::storage)?
        {
            return Err(DraftError::MovieUnavailable { movie_id }.into());
        }

        self.db
            .add_to_roster(league_id, team_id, movie_id, AcquisitionType::Waiver)
            .map_err(ApiError::storage)?;
        info!(league_id, team_id, movie_id, "waiver claim recorded");
        Ok(())
    }

    fn load_movies(&self, ids: &[i64]) -> Result<Vec<Movie>, ApiError> {
        ids.iter()
            .map(|&id| {
                self.db
                    .movie(id)
                    .map_err(ApiError::storage)?
                    .ok_or_else(|| ApiError::NotFound(format!("movie {id}")))
            })
            .collect()
    }
}
