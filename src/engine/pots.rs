//! Side-pot layering.
//!
//! Pots are recomputed from per-hand contributions after every chip
//! movement rather than tracked incrementally. Tier caps come from the
//! distinct contribution levels of players still contesting the hand;
//! folded contributions stay in whatever tiers they reach, and the top
//! tier is uncapped so every committed chip lands in exactly one pot.

use super::player::Player;
use super::types::{Chips, PlayerId, PotInfo};

/// Compute the main pot and side pots from the given seat-ordered players.
/// Eligibility lists preserve seat order.
pub fn layered_pots(players: &[&Player]) -> Vec<PotInfo> {
    let mut levels: Vec<Chips> = players
        .iter()
        .filter(|p| p.in_hand() && p.total_bet > 0)
        .map(|p| p.total_bet)
        .collect();
    levels.sort_unstable();
    levels.dedup();

    if levels.is_empty() {
        // Nothing committed by anyone still in the hand. Sweep whatever
        // folded chips exist into a single pot.
        let amount: Chips = players.iter().map(|p| p.total_bet).sum();
        let eligible: Vec<PlayerId> = players
            .iter()
            .filter(|p| p.in_hand())
            .map(|p| p.player_id)
            .collect();
        return vec![PotInfo {
            amount,
            eligible_players: eligible,
        }];
    }

    let mut pots = Vec::with_capacity(levels.len());
    let mut prev: Chips = 0;
    let last = levels.len() - 1;
    for (i, cap) in levels.iter().copied().enumerate() {
        let tier = cap - prev;
        let mut amount: Chips = 0;
        for p in players {
            let above_prev = p.total_bet.saturating_sub(prev);
            amount += if i == last {
                above_prev
            } else {
                above_prev.min(tier)
            };
        }
        let eligible: Vec<PlayerId> = players
            .iter()
            .filter(|p| p.in_hand() && p.total_bet >= cap)
            .map(|p| p.player_id)
            .collect();
        pots.push(PotInfo {
            amount,
            eligible_players: eligible,
        });
        prev = cap;
    }
    pots
}
