use std::collections::HashMap;

use uuid::Uuid;

use super::player::Player;
use super::types::{
    ActionRecord, BettingRound, Chips, GamePhase, HandWinner, PlayerId, PotInfo, TableId,
};
use crate::cards::Card;

/// Complete per-table game state. Seat-ordered traversal always goes
/// through `player_order`; the map is never iterated directly.
#[derive(Clone, Debug)]
pub struct GameState {
    pub game_id: Uuid,
    pub table_id: TableId,
    pub hand_number: u64,
    pub phase: GamePhase,
    pub betting_round: BettingRound,

    pub players: HashMap<PlayerId, Player>,
    pub player_order: Vec<PlayerId>,

    pub community_cards: Vec<Card>,
    pub pots: Vec<PotInfo>,

    pub current_player_id: Option<PlayerId>,
    /// Index into the seats that were active at hand start.
    pub dealer_position: usize,

    pub small_blind: Chips,
    pub big_blind: Chips,
    /// Highest per-round commitment to match.
    pub current_bet: Chips,
    /// Minimum raise increment for this round.
    pub min_raise: Chips,
    pub last_raiser_id: Option<PlayerId>,

    pub action_history: Vec<ActionRecord>,
    pub hand_winners: Vec<HandWinner>,
}

impl GameState {
    pub fn new(table_id: TableId, small_blind: Chips, big_blind: Chips) -> GameState {
        GameState {
            game_id: Uuid::new_v4(),
            table_id,
            hand_number: 0,
            phase: GamePhase::Waiting,
            betting_round: BettingRound::Preflop,
            players: HashMap::new(),
            player_order: Vec::new(),
            community_cards: Vec::new(),
            pots: vec![PotInfo::default()],
            current_player_id: None,
            dealer_position: 0,
            small_blind,
            big_blind,
            current_bet: 0,
            min_raise: big_blind,
            last_raiser_id: None,
            action_history: Vec::new(),
            hand_winners: Vec::new(),
        }
    }

    pub fn player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.get(player_id)
    }

    /// Players still contesting the hand, in seat order.
    pub fn players_in_hand(&self) -> Vec<&Player> {
        self.player_order
            .iter()
            .filter_map(|pid| self.players.get(pid))
            .filter(|p| p.in_hand())
            .collect()
    }

    /// Players who can still act this round, in seat order.
    pub fn players_to_act(&self) -> Vec<&Player> {
        self.player_order
            .iter()
            .filter_map(|pid| self.players.get(pid))
            .filter(|p| p.can_act())
            .collect()
    }

    pub fn total_pot(&self) -> Chips {
        self.pots.iter().map(|p| p.amount).sum()
    }

    /// Next player able to act strictly after `from` in seat order,
    /// wrapping around the table.
    pub fn next_to_act_after(&self, from: &PlayerId) -> Option<PlayerId> {
        let start = self.player_order.iter().position(|pid| pid == from)?;
        let n = self.player_order.len();
        (1..=n)
            .map(|step| &self.player_order[(start + step) % n])
            .find(|pid| self.players.get(*pid).map(|p| p.can_act()).unwrap_or(false))
            .copied()
    }

    /// Seat order rotated to start one seat left of the dealer. Used for
    /// deterministic odd-chip distribution.
    pub fn seats_from_dealer_left(&self) -> Vec<PlayerId> {
        let dealer_idx = self
            .player_order
            .iter()
            .position(|pid| {
                self.players
                    .get(pid)
                    .map(|p| p.is_dealer)
                    .unwrap_or(false)
            })
            .unwrap_or(0);
        let n = self.player_order.len();
        (1..=n)
            .map(|step| self.player_order[(dealer_idx + step) % n])
            .collect()
    }
}
