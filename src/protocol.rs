// Wire protocol for the real-time draft channel.
//
// Server events fan out through the BroadcastHub; client messages arrive on
// the WebSocket. The REST-shaped `api::DraftService` is the authoritative
// commit path — a client `pick` message is forwarded there as an intent,
// never trusted on its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::draft::session::{DraftSnapshot, LedgerEntry, SessionPhase};

/// Events pushed server -> client on a league's draft channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A pick was committed (explicit or auto).
    PickMade {
        pick_number: u32,
        round: u32,
        team_id: i64,
        movie_id: Option<i64>,
        movie_title: Option<String>,
        poster_url: Option<String>,
        auto: bool,
        /// True when the auto-pick found no available movie.
        skipped: bool,
        next_pick_number: Option<u32>,
        next_team_id: Option<i64>,
        deadline: Option<DateTime<Utc>>,
    },
    /// Countdown for the pick currently on the clock.
    TimerUpdate { seconds_remaining: u64 },
    /// Every slot is fulfilled; final rosters are fixed.
    DraftComplete { league_id: i64 },
    /// Full state for (re)sync. Clients must request this on reconnect
    /// rather than trusting buffered deltas.
    StatusUpdate { state: DraftSnapshot },
    /// Request-scoped failure, delivered only to the offending connection.
    Error { message: String },
}

impl ServerEvent {
    pub fn pick_made(entry: &LedgerEntry, next: Option<(u32, i64)>, deadline: Option<DateTime<Utc>>) -> Self {
        ServerEvent::PickMade {
            pick_number: entry.pick_number,
            round: entry.round,
            team_id: entry.team_id,
            movie_id: entry.movie_id,
            movie_title: entry.movie_title.clone(),
            poster_url: entry.poster_url.clone(),
            auto: entry.acquisition == crate::model::AcquisitionType::Auto,
            skipped: entry.skipped,
            next_pick_number: next.map(|(n, _)| n),
            next_team_id: next.map(|(_, t)| t),
            deadline,
        }
    }
}

/// Messages a client may send on the draft channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Enter a league's draft room. Must be the first message on the
    /// connection; identity arrives as an already-resolved team id.
    Join { league_id: i64, team_id: i64 },
    /// Pick intent for the joined team.
    Pick { movie_id: i64 },
}

/// Minimal client-side replay of the draft channel, used to verify that a
/// `status_update` resync reproduces the server's view.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientDraftView {
    pub phase: SessionPhase,
    pub current_pick_number: Option<u32>,
    pub ledger_len: usize,
}

impl ClientDraftView {
    pub fn new() -> Self {
        ClientDraftView {
            phase: SessionPhase::Waiting,
            current_pick_number: None,
            ledger_len: 0,
        }
    }

    /// Apply one event the way a client UI would.
    pub fn apply(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::StatusUpdate { state } => {
                self.phase = state.phase;
                self.current_pick_number = state.current_pick_number;
                self.ledger_len = state.ledger.len();
            }
            ServerEvent::PickMade {
                next_pick_number, ..
            } => {
                self.ledger_len += 1;
                self.current_pick_number = *next_pick_number;
            }
            ServerEvent::DraftComplete { .. } => {
                self.phase = SessionPhase::Completed;
            }
            ServerEvent::TimerUpdate { .. } | ServerEvent::Error { .. } => {}
        }
    }
}

impl Default for ClientDraftView {
    fn default() -> Self {
        Self::new()
    }
}
