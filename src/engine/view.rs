//! Serializable snapshots of table state. The public view hides every
//! hole card; the private view reveals only the caller's.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use super::player::Player;
use super::state::GameState;
use super::types::{
    ActionRecord, BettingRound, Chips, GamePhase, HandWinner, PlayerId, PlayerStatus, PotInfo,
    TableId,
};
use crate::cards::Card;

const HISTORY_WINDOW: usize = 10;

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub player_id: PlayerId,
    pub username: String,
    pub chips: Chips,
    pub current_bet: Chips,
    pub total_bet: Chips,
    pub status: PlayerStatus,
    pub seat_position: usize,
    pub is_dealer: bool,
    pub is_small_blind: bool,
    pub is_big_blind: bool,
    pub last_action: Option<String>,
    pub hole_cards: Vec<Card>,
}

impl PlayerView {
    fn public(player: &Player) -> PlayerView {
        PlayerView {
            player_id: player.player_id,
            username: player.username.clone(),
            chips: player.chips,
            current_bet: player.current_bet,
            total_bet: player.total_bet,
            status: player.status,
            seat_position: player.seat,
            is_dealer: player.is_dealer,
            is_small_blind: player.is_small_blind,
            is_big_blind: player.is_big_blind,
            last_action: player.last_action.clone(),
            hole_cards: Vec::new(),
        }
    }

    fn private(player: &Player) -> PlayerView {
        let mut view = PlayerView::public(player);
        view.hole_cards = player.hole_cards.clone();
        view
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TableView {
    pub game_id: Uuid,
    pub table_id: TableId,
    pub hand_number: u64,
    pub phase: GamePhase,
    pub betting_round: BettingRound,
    pub players: HashMap<PlayerId, PlayerView>,
    pub player_order: Vec<PlayerId>,
    pub community_cards: Vec<Card>,
    pub pots: Vec<PotInfo>,
    pub current_player_id: Option<PlayerId>,
    pub dealer_position: usize,
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub current_bet: Chips,
    pub min_raise: Chips,
    pub total_pot: Chips,
    pub action_history: Vec<ActionRecord>,
    pub hand_winners: Vec<HandWinner>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub your_hole_cards: Option<Vec<Card>>,
}

impl GameState {
    pub fn public_view(&self) -> TableView {
        let history_start = self.action_history.len().saturating_sub(HISTORY_WINDOW);
        TableView {
            game_id: self.game_id,
            table_id: self.table_id,
            hand_number: self.hand_number,
            phase: self.phase,
            betting_round: self.betting_round,
            players: self
                .players
                .iter()
                .map(|(pid, p)| (*pid, PlayerView::public(p)))
                .collect(),
            player_order: self.player_order.clone(),
            community_cards: self.community_cards.clone(),
            pots: self.pots.clone(),
            current_player_id: self.current_player_id,
            dealer_position: self.dealer_position,
            small_blind: self.small_blind,
            big_blind: self.big_blind,
            current_bet: self.current_bet,
            min_raise: self.min_raise,
            total_pot: self.total_pot(),
            action_history: self.action_history[history_start..].to_vec(),
            hand_winners: self.hand_winners.clone(),
            your_hole_cards: None,
        }
    }

    /// Public view plus the caller's own hole cards.
    pub fn player_view(&self, player_id: &PlayerId) -> TableView {
        let mut view = self.public_view();
        if let Some(player) = self.players.get(player_id) {
            view.players
                .insert(*player_id, PlayerView::private(player));
            view.your_hole_cards = Some(player.hole_cards.clone());
        }
        view
    }
}
