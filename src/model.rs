// Core domain types shared across the draft and scoring engines.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a movie in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovieStatus {
    /// Not yet released; gross and critical fields are still zero.
    Upcoming,
    /// Released; box-office facts may arrive from the ingestion sync.
    Released,
    /// Released and unowned, eligible for waiver claims.
    FreeAgent,
}

impl MovieStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovieStatus::Upcoming => "upcoming",
            MovieStatus::Released => "released",
            MovieStatus::FreeAgent => "free_agent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upcoming" => Some(MovieStatus::Upcoming),
            "released" => Some(MovieStatus::Released),
            "free_agent" => Some(MovieStatus::FreeAgent),
            _ => None,
        }
    }
}

/// Immutable catalog facts for one movie.
///
/// Financial and critical fields are zero until release data arrives; they
/// are mutated only by the ingestion collaborator, never by the draft or
/// scoring engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    /// External catalog identifier (TMDB).
    pub tmdb_id: i64,
    pub title: String,
    pub release_date: Option<NaiveDate>,
    pub poster_url: String,
    /// Production budget in dollars.
    pub budget: f64,
    pub domestic_gross: f64,
    pub worldwide_gross: f64,
    pub opening_weekend_gross: f64,
    /// Critical score on a 0-100 scale.
    pub rt_score: f64,
    /// Whether the movie opened at #1 on its opening weekend.
    pub number_one_opening: bool,
    pub status: MovieStatus,
}

impl Movie {
    /// True when the movie can still be claimed in a draft.
    pub fn is_draftable(&self) -> bool {
        self.status == MovieStatus::Upcoming
    }
}

/// How a movie arrived on a team's roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionType {
    Draft,
    Auto,
    Waiver,
    Trade,
}

impl AcquisitionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcquisitionType::Draft => "draft",
            AcquisitionType::Auto => "auto",
            AcquisitionType::Waiver => "waiver",
            AcquisitionType::Trade => "trade",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(AcquisitionType::Draft),
            "auto" => Some(AcquisitionType::Auto),
            "waiver" => Some(AcquisitionType::Waiver),
            "trade" => Some(AcquisitionType::Trade),
            _ => None,
        }
    }
}

/// One movie owned by one team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub team_id: i64,
    pub movie_id: i64,
    pub acquired_at: DateTime<Utc>,
    pub acquisition_type: AcquisitionType,
}

/// A team within a league. `total_points` is the only persisted score
/// aggregate; settlement keeps it equal to the sum of its roster's
/// breakdown totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub league_id: i64,
    pub name: String,
    pub total_points: f64,
}

/// League lifecycle. Transitions are one-directional:
/// pending -> drafting -> active -> completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeagueStatus {
    Pending,
    Drafting,
    Active,
    Completed,
}

impl LeagueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeagueStatus::Pending => "pending",
            LeagueStatus::Drafting => "drafting",
            LeagueStatus::Active => "active",
            LeagueStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(LeagueStatus::Pending),
            "drafting" => Some(LeagueStatus::Drafting),
            "active" => Some(LeagueStatus::Active),
            "completed" => Some(LeagueStatus::Completed),
            _ => None,
        }
    }

    /// Whether `next` is a legal forward transition from `self`.
    pub fn can_transition_to(&self, next: LeagueStatus) -> bool {
        matches!(
            (self, next),
            (LeagueStatus::Pending, LeagueStatus::Drafting)
                | (LeagueStatus::Drafting, LeagueStatus::Active)
                | (LeagueStatus::Active, LeagueStatus::Completed)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct League {
    pub id: i64,
    pub name: String,
    pub season_year: i32,
    pub status: LeagueStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            MovieStatus::Upcoming,
            MovieStatus::Released,
            MovieStatus::FreeAgent,
        ] {
            assert_eq!(MovieStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(MovieStatus::parse("bogus"), None);

        for status in [
            LeagueStatus::Pending,
            LeagueStatus::Drafting,
            LeagueStatus::Active,
            LeagueStatus::Completed,
        ] {
            assert_eq!(LeagueStatus::parse(status.as_str()), Some(status));
        }

        for acq in [
            AcquisitionType::Draft,
            AcquisitionType::Auto,
            AcquisitionType::Waiver,
            AcquisitionType::Trade,
        ] {
            assert_eq!(AcquisitionType::parse(acq.as_str()), Some(acq));
        }
    }

    #[test]
    fn league_transitions_are_one_directional() {
        assert!(LeagueStatus::Pending.can_transition_to(LeagueStatus::Drafting));
        assert!(LeagueStatus::Drafting.can_transition_to(LeagueStatus::Active));
        assert!(LeagueStatus::Active.can_transition_to(LeagueStatus::Completed));

        assert!(!LeagueStatus::Drafting.can_transition_to(LeagueStatus::Pending));
        assert!(!LeagueStatus::Pending.can_transition_to(LeagueStatus::Active));
        assert!(!LeagueStatus::Completed.can_transition_to(LeagueStatus::Active));
    }

    #[test]
    fn only_upcoming_movies_are_draftable() {
        let mut movie = Movie {
            id: 1,
            tmdb_id: 100,
            title: "Test".into(),
            release_date: None,
            poster_url: String::new(),
            budget: 0.0,
            domestic_gross: 0.0,
            worldwide_gross: 0.0,
            opening_weekend_gross: 0.0,
            rt_score: 0.0,
            number_one_opening: false,
            status: MovieStatus::Upcoming,
        };
        assert!(movie.is_draftable());
        movie.status = MovieStatus::Released;
        assert!(!movie.is_draftable());
        movie.status = MovieStatus::FreeAgent;
        assert!(!movie.is_draftable());
    }
}
