// Snake draft order.

use serde::{Deserialize, Serialize};

/// One unfulfilled slot in the draft order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickSlot {
    /// 1-based, strictly increasing across the whole draft.
    pub pick_number: u32,
    /// 1-based round.
    pub round: u32,
    pub team_id: i64,
}

/// Build the full snake order for `rounds` rounds over `team_ids`.
///
/// Round r uses the team order forward when r is odd and reversed when r is
/// even. `team_ids` is the league's frozen insertion order at draft start.
/// pick_number = (round - 1) * team_count + position_in_round.
pub fn build_order(team_ids: &[i64], rounds: u32) -> Vec<PickSlot> {
    let mut slots = Vec::with_capacity(team_ids.len() * rounds as usize);
    let mut pick_number = 1u32;

    for round in 1..=rounds {
        let forward = round % 2 == 1;
        let round_order: Vec<i64> = if forward {
            team_ids.to_vec()
        } else {
            team_ids.iter().rev().copied().collect()
        };
        for team_id in round_order {
            slots.push(PickSlot {
                pick_number,
                round,
                team_id,
            });
            pick_number += 1;
        }
    }

    slots
}
