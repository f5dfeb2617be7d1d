// Draft engine: snake order, per-pick clock, session state machine, and
// the process-wide session registry.

pub mod clock;
pub mod order;
pub mod registry;
pub mod session;

use thiserror::Error;

/// Errors surfaced by the draft engine. Everything except
/// `InsufficientMovies` is client-recoverable: the request is rejected and
/// session state is untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DraftError {
    /// The session is not accepting picks (waiting, completed, or aborted).
    #[error("draft is not active for league {league_id}")]
    DraftNotActive { league_id: i64 },

    /// A team tried to pick out of turn, or lost the race against the
    /// auto-pick for the same slot.
    #[error("team {team_id} is not on the clock")]
    NotOnClock { team_id: i64 },

    /// The movie is already drafted or rostered, or is not an upcoming
    /// release.
    #[error("movie {movie_id} is not available")]
    MovieUnavailable { movie_id: i64 },

    /// The league already has a draft underway or finished.
    #[error("league {league_id} is not accepting a draft start")]
    AlreadyDrafting { league_id: i64 },

    /// A draft needs at least two teams.
    #[error("league has {count} team(s); at least 2 are required")]
    TooFewTeams { count: usize },

    /// The catalog cannot cover every pick slot.
    #[error("catalog has {available} upcoming movies but the draft needs {required}")]
    InsufficientMovies { available: usize, required: usize },

    /// Malformed request, rejected before touching session state.
    #[error("invalid input: {0}")]
    Validation(String),
}
