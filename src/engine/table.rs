//! Per-table hand lifecycle: dealing, betting rounds, showdown, pot
//! distribution. Single-threaded over its own state; the coordinator is
//! the only caller and serializes access.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};
use uuid::Uuid;

use super::actions::{ActionType, AppliedAction, PlayerAction};
use super::errors::{EngineError, TableError};
use super::player::Player;
use super::pots::layered_pots;
use super::rules::{self, ValidAction};
use super::state::GameState;
use super::types::{
    BettingRound, Chips, GamePhase, HandWinner, PlayerId, PlayerStatus, PotInfo, TableId,
};
use super::view::TableView;
use crate::cards::{Card, Deck};
use crate::eval::{best_of_seven, winner_indices, HandScore};

const LOG_TARGET: &str = "engine::table";

pub struct TableEngine {
    state: GameState,
    deck: Deck,
    rng: StdRng,
    /// Deck override consumed by the next `start_hand`; test injection.
    stacked_next: Option<Vec<Card>>,
    /// Chips in play this hand; checked after every mutation.
    hand_total: Chips,
}

impl TableEngine {
    pub fn new(table_id: TableId, small_blind: Chips, big_blind: Chips) -> TableEngine {
        Self::with_rng(table_id, small_blind, big_blind, StdRng::from_entropy())
    }

    pub fn with_rng(
        table_id: TableId,
        small_blind: Chips,
        big_blind: Chips,
        mut rng: StdRng,
    ) -> TableEngine {
        let deck = Deck::new(&mut rng);
        TableEngine {
            state: GameState::new(table_id, small_blind, big_blind),
            deck,
            rng,
            stacked_next: None,
            hand_total: 0,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn table_id(&self) -> TableId {
        self.state.table_id
    }

    pub fn hand_complete(&self) -> bool {
        self.state.phase == GamePhase::HandComplete
    }

    pub fn current_player(&self) -> Option<PlayerId> {
        self.state.current_player_id
    }

    /// Use this exact card order for the next hand instead of shuffling.
    pub fn stack_next_deal(&mut self, cards: Vec<Card>) {
        self.stacked_next = Some(cards);
    }

    pub fn set_blinds(&mut self, small_blind: Chips, big_blind: Chips) {
        self.state.small_blind = small_blind;
        self.state.big_blind = big_blind;
    }

    /// Seat a player. Returns false if the id is already seated.
    pub fn add_player(&mut self, player_id: PlayerId, username: &str, chips: Chips) -> bool {
        if self.state.players.contains_key(&player_id) {
            return false;
        }
        let seat = self
            .state
            .players
            .values()
            .map(|p| p.seat + 1)
            .max()
            .unwrap_or(0);
        self.state.players.insert(
            player_id,
            Player::new(player_id, username.to_string(), chips, seat),
        );
        self.state.player_order.push(player_id);
        let players = &self.state.players;
        self.state.player_order.sort_by_key(|pid| players[pid].seat);
        self.hand_total += chips;
        true
    }

    pub fn valid_actions(&self, player_id: &PlayerId) -> Vec<ValidAction> {
        rules::valid_actions(&self.state, player_id)
    }

    pub fn public_view(&self) -> TableView {
        self.state.public_view()
    }

    pub fn player_view(&self, player_id: &PlayerId) -> TableView {
        self.state.player_view(player_id)
    }

    /// Begin the next hand. Returns false (without touching state) when
    /// fewer than two seated players can be dealt in.
    pub fn start_hand(&mut self) -> Result<bool, EngineError> {
        let eligible = self
            .state
            .player_order
            .iter()
            .filter_map(|pid| self.state.players.get(pid))
            .filter(|p| p.chips > 0 && p.status != PlayerStatus::Disconnected)
            .count();
        if eligible < 2 {
            return Ok(false);
        }

        let s = &mut self.state;
        s.hand_number += 1;
        s.game_id = Uuid::new_v4();
        s.phase = GamePhase::Dealing;
        s.betting_round = BettingRound::Preflop;
        s.community_cards.clear();
        s.pots = vec![PotInfo::default()];
        s.current_bet = 0;
        s.min_raise = s.big_blind;
        s.last_raiser_id = None;
        s.action_history.clear();
        s.hand_winners.clear();
        for p in s.players.values_mut() {
            p.reset_for_hand();
        }
        let players = &s.players;
        s.player_order
            .retain(|pid| players[pid].status != PlayerStatus::Eliminated);

        self.rotate_dealer();

        match self.stacked_next.take() {
            Some(cards) => self.deck = Deck::stacked(cards),
            None => self.deck.reset(&mut self.rng),
        }
        self.deal_hole_cards()?;

        self.hand_total = self.state.players.values().map(|p| p.chips).sum();
        self.post_blinds();
        self.refresh_pots();
        self.state.phase = GamePhase::Betting;

        // First to act preflop: left of the big blind (heads-up this is
        // the dealer/small blind).
        let big_blind = self
            .state
            .player_order
            .iter()
            .find(|pid| self.state.players[*pid].is_big_blind)
            .copied();
        self.state.current_player_id =
            big_blind.and_then(|pid| self.state.next_to_act_after(&pid));

        // Blinds can put everyone all-in; run the board out immediately.
        if rules::betting_round_complete(&self.state) {
            self.resolve_round_state(None)?;
        }
        self.check_conservation()?;

        info!(
            target: LOG_TARGET,
            table = %self.state.table_id,
            hand = self.state.hand_number,
            dealer_position = self.state.dealer_position,
            "hand started"
        );
        Ok(true)
    }

    /// Validate and apply one action, advancing the round or the hand as
    /// far as it can go without further input.
    pub fn process_action(
        &mut self,
        player_id: &PlayerId,
        action: &PlayerAction,
    ) -> Result<AppliedAction, TableError> {
        let amount = rules::validate(&self.state, player_id, action)?;
        self.apply(*player_id, action.action_type, amount);
        self.refresh_pots();
        self.resolve_round_state(Some(*player_id))
            .map_err(TableError::Fatal)?;
        self.check_conservation().map_err(TableError::Fatal)?;
        Ok(AppliedAction {
            player_id: *player_id,
            action_type: action.action_type,
            amount,
        })
    }

    /// Flip busted seats to `Eliminated` between hands, so views and the
    /// coordinator see final statuses before the next deal does it.
    pub fn mark_busted_eliminated(&mut self) {
        if self.state.phase != GamePhase::HandComplete {
            return;
        }
        for p in self.state.players.values_mut() {
            if p.chips == 0 && p.status != PlayerStatus::Eliminated {
                p.status = PlayerStatus::Eliminated;
            }
        }
    }

    /// Admin removal: forfeit the stack and fold the seat. If the kicked
    /// player was due to act, the hand advances as if they folded.
    pub fn kick_player(&mut self, player_id: &PlayerId) -> Result<(), EngineError> {
        let Some(p) = self.state.players.get_mut(player_id) else {
            return Ok(());
        };
        let forfeited = p.chips;
        p.chips = 0;
        p.status = PlayerStatus::Folded;
        self.hand_total -= forfeited;
        self.refresh_pots();

        if self.state.phase == GamePhase::Betting {
            if self.state.current_player_id.as_ref() == Some(player_id) {
                self.resolve_round_state(Some(*player_id))?;
            } else if rules::betting_round_complete(&self.state) {
                self.resolve_round_state(None)?;
            }
        }
        self.check_conservation()
    }

    fn rotate_dealer(&mut self) {
        let active: Vec<PlayerId> = self
            .state
            .player_order
            .iter()
            .filter(|pid| self.state.players[*pid].status == PlayerStatus::Active)
            .copied()
            .collect();
        if active.is_empty() {
            return;
        }
        let n = active.len();
        self.state.dealer_position = (self.state.dealer_position + 1) % n;
        let dealer_idx = self.state.dealer_position;

        // Heads-up: the dealer posts the small blind.
        let (sb_idx, bb_idx) = if n == 2 {
            (dealer_idx, (dealer_idx + 1) % n)
        } else {
            ((dealer_idx + 1) % n, (dealer_idx + 2) % n)
        };

        if let Some(p) = self.state.players.get_mut(&active[dealer_idx]) {
            p.is_dealer = true;
        }
        if let Some(p) = self.state.players.get_mut(&active[sb_idx]) {
            p.is_small_blind = true;
        }
        if let Some(p) = self.state.players.get_mut(&active[bb_idx]) {
            p.is_big_blind = true;
        }
    }

    /// Two passes of one card each, around the table in seat order.
    fn deal_hole_cards(&mut self) -> Result<(), EngineError> {
        let active: Vec<PlayerId> = self
            .state
            .player_order
            .iter()
            .filter(|pid| self.state.players[*pid].status == PlayerStatus::Active)
            .copied()
            .collect();
        for _ in 0..2 {
            for pid in &active {
                let card = self.deck.deal_one()?;
                if let Some(p) = self.state.players.get_mut(pid) {
                    p.hole_cards.push(card);
                }
            }
        }
        Ok(())
    }

    fn post_blinds(&mut self) {
        let order = self.state.player_order.clone();
        for pid in order {
            let small_blind = self.state.small_blind;
            let big_blind = self.state.big_blind;
            let Some(p) = self.state.players.get_mut(&pid) else {
                continue;
            };
            if p.is_small_blind {
                let paid = small_blind.min(p.chips);
                p.chips -= paid;
                p.current_bet = paid;
                p.total_bet = paid;
                if p.chips == 0 {
                    p.status = PlayerStatus::AllIn;
                }
                let username = p.username.clone();
                self.push_history(pid, username, "small_blind", paid);
            } else if p.is_big_blind {
                let paid = big_blind.min(p.chips);
                p.chips -= paid;
                p.current_bet = paid;
                p.total_bet = paid;
                if p.chips == 0 {
                    p.status = PlayerStatus::AllIn;
                }
                // The table bet is whatever the big blind actually posted,
                // short or not.
                self.state.current_bet = paid;
                let username = p.username.clone();
                self.push_history(pid, username, "big_blind", paid);
            }
        }
    }

    fn apply(&mut self, player_id: PlayerId, action_type: ActionType, amount: Chips) {
        let to_act: Vec<PlayerId> = self
            .state
            .players_to_act()
            .iter()
            .map(|p| p.player_id)
            .collect();
        let table_bet = self.state.current_bet;
        let min_raise = self.state.min_raise;

        let Some(p) = self.state.players.get_mut(&player_id) else {
            return;
        };
        let username = p.username.clone();

        let mut reopen = false;
        match action_type {
            ActionType::Fold => {
                p.status = PlayerStatus::Folded;
                p.last_action = Some("fold".to_string());
            }
            ActionType::Check => {
                p.last_action = Some("check".to_string());
            }
            ActionType::Call => {
                p.chips -= amount;
                p.current_bet += amount;
                p.total_bet += amount;
                if p.chips == 0 {
                    p.status = PlayerStatus::AllIn;
                }
                p.last_action = Some(format!("call {amount}"));
            }
            ActionType::Bet => {
                p.chips -= amount;
                p.current_bet = amount;
                p.total_bet += amount;
                if p.chips == 0 {
                    p.status = PlayerStatus::AllIn;
                }
                p.last_action = Some(format!("bet {amount}"));
                self.state.current_bet = amount;
                self.state.min_raise = min_raise.max(amount);
                self.state.last_raiser_id = Some(player_id);
                reopen = true;
            }
            ActionType::Raise | ActionType::AllIn => {
                let new_total = p.current_bet + amount;
                p.chips -= amount;
                p.current_bet = new_total;
                p.total_bet += amount;
                if p.chips == 0 {
                    p.status = PlayerStatus::AllIn;
                }
                p.last_action = Some(match action_type {
                    ActionType::AllIn => format!("all-in {amount}"),
                    _ => format!("raise to {new_total}"),
                });
                if new_total > table_bet {
                    self.state.current_bet = new_total;
                    let increment = new_total - table_bet;
                    // Short all-in raises lift the bet to match but do not
                    // reopen action or grow the minimum raise.
                    if increment >= min_raise {
                        self.state.min_raise = min_raise.max(increment);
                        self.state.last_raiser_id = Some(player_id);
                        reopen = true;
                    }
                }
            }
        }

        if reopen {
            for pid in &to_act {
                if *pid != player_id {
                    if let Some(other) = self.state.players.get_mut(pid) {
                        other.has_acted = false;
                    }
                }
            }
        }
        if let Some(p) = self.state.players.get_mut(&player_id) {
            p.has_acted = true;
        }
        self.push_history(player_id, username, &action_type.to_string(), amount);
    }

    fn push_history(&mut self, player_id: PlayerId, username: String, action: &str, amount: Chips) {
        self.state.action_history.push(super::types::ActionRecord {
            player_id,
            username,
            action: action.to_string(),
            amount,
            round: self.state.betting_round,
            timestamp: Utc::now(),
        });
    }

    fn refresh_pots(&mut self) {
        let players: Vec<&Player> = self
            .state
            .player_order
            .iter()
            .filter_map(|pid| self.state.players.get(pid))
            .collect();
        self.state.pots = layered_pots(&players);
    }

    /// After a mutation: either hand the turn to the next player, or close
    /// the round and advance the hand.
    fn resolve_round_state(&mut self, acted: Option<PlayerId>) -> Result<(), EngineError> {
        if !rules::betting_round_complete(&self.state) {
            if let Some(from) = acted {
                self.state.current_player_id = self.state.next_to_act_after(&from);
            }
            return Ok(());
        }
        if self.state.players_in_hand().len() <= 1 {
            return self.end_hand();
        }
        self.advance_betting_round()
    }

    fn advance_betting_round(&mut self) -> Result<(), EngineError> {
        for p in self.state.players.values_mut() {
            p.reset_for_betting_round();
        }
        self.state.current_bet = 0;
        self.state.min_raise = self.state.big_blind;
        self.state.last_raiser_id = None;

        let next = match self.state.betting_round {
            BettingRound::Preflop => {
                let cards = self.deck.deal(3)?;
                self.state.community_cards.extend(cards);
                BettingRound::Flop
            }
            BettingRound::Flop => {
                self.state.community_cards.push(self.deck.deal_one()?);
                BettingRound::Turn
            }
            BettingRound::Turn => {
                self.state.community_cards.push(self.deck.deal_one()?);
                BettingRound::River
            }
            BettingRound::River | BettingRound::Showdown => {
                return self.end_hand();
            }
        };
        self.state.betting_round = next;

        // First to act post-flop: first seat still able to act, clockwise
        // from the dealer.
        let dealer = self
            .state
            .player_order
            .iter()
            .find(|pid| self.state.players[*pid].is_dealer)
            .copied();
        self.state.current_player_id = dealer.and_then(|pid| self.state.next_to_act_after(&pid));

        // With at most one player able to act there is no more betting;
        // keep dealing streets.
        if self.state.players_to_act().len() <= 1 {
            return self.advance_betting_round();
        }
        Ok(())
    }

    fn end_hand(&mut self) -> Result<(), EngineError> {
        self.state.phase = GamePhase::Showdown;
        self.state.betting_round = BettingRound::Showdown;
        self.state.current_player_id = None;
        self.refresh_pots();

        let contenders: Vec<PlayerId> = self
            .state
            .players_in_hand()
            .iter()
            .map(|p| p.player_id)
            .collect();

        if contenders.len() == 1 {
            let total = self.state.total_pot();
            let winner = contenders[0];
            if let Some(p) = self.state.players.get_mut(&winner) {
                p.chips += total;
                self.state.hand_winners = vec![HandWinner {
                    player_id: winner,
                    username: p.username.clone(),
                    amount: total,
                    hand: "uncontested".to_string(),
                    cards: Vec::new(),
                }];
            }
        } else {
            self.settle_showdown(&contenders);
        }

        for pot in &mut self.state.pots {
            pot.amount = 0;
        }
        self.state.phase = GamePhase::HandComplete;
        self.check_conservation()?;

        info!(
            target: LOG_TARGET,
            table = %self.state.table_id,
            hand = self.state.hand_number,
            winners = self.state.hand_winners.len(),
            "hand complete"
        );
        Ok(())
    }

    /// Evaluate every contender and split each pot among its co-winners.
    /// Odd chips go one at a time in seat order starting left of the
    /// dealer.
    fn settle_showdown(&mut self, contenders: &[PlayerId]) {
        let community = self.state.community_cards.clone();
        let scored: Vec<(PlayerId, HandScore, Vec<Card>)> = contenders
            .iter()
            .filter_map(|pid| self.state.players.get(pid))
            .map(|p| {
                let mut cards = p.hole_cards.clone();
                cards.extend(community.iter().copied());
                let (score, best_five) = best_of_seven(&cards);
                (p.player_id, score, best_five)
            })
            .collect();

        let rotation = self.state.seats_from_dealer_left();
        let pots = self.state.pots.clone();
        let mut won: Vec<(PlayerId, Chips)> = Vec::new();

        for pot in &pots {
            if pot.amount == 0 {
                continue;
            }
            let mut in_pot: Vec<&(PlayerId, HandScore, Vec<Card>)> = scored
                .iter()
                .filter(|(pid, _, _)| pot.eligible_players.contains(pid))
                .collect();
            if in_pot.is_empty() {
                warn!(
                    target: LOG_TARGET,
                    table = %self.state.table_id,
                    amount = pot.amount,
                    "pot with no eligible contender, splitting among all"
                );
                in_pot = scored.iter().collect();
            }
            let scores: Vec<HandScore> = in_pot.iter().map(|(_, s, _)| s.clone()).collect();
            let mut winners: Vec<PlayerId> = winner_indices(&scores)
                .into_iter()
                .map(|i| in_pot[i].0)
                .collect();
            winners.sort_by_key(|pid| rotation.iter().position(|r| r == pid).unwrap_or(usize::MAX));

            let share = pot.amount / winners.len() as Chips;
            let remainder = pot.amount % winners.len() as Chips;
            for (k, pid) in winners.iter().enumerate() {
                let amount = share + if (k as Chips) < remainder { 1 } else { 0 };
                if let Some(p) = self.state.players.get_mut(pid) {
                    p.chips += amount;
                }
                match won.iter_mut().find(|(w, _)| w == pid) {
                    Some((_, total)) => *total += amount,
                    None => won.push((*pid, amount)),
                }
            }
        }

        self.state.hand_winners = self
            .state
            .player_order
            .iter()
            .filter_map(|pid| {
                let amount = won.iter().find(|(w, _)| w == pid).map(|(_, a)| *a)?;
                let (_, score, best_five) = scored.iter().find(|(s, _, _)| s == pid)?;
                let p = self.state.players.get(pid)?;
                Some(HandWinner {
                    player_id: *pid,
                    username: p.username.clone(),
                    amount,
                    hand: score.name().to_string(),
                    cards: best_five.clone(),
                })
            })
            .collect();
    }

    fn check_conservation(&self) -> Result<(), EngineError> {
        let found: Chips =
            self.state.players.values().map(|p| p.chips).sum::<Chips>() + self.state.total_pot();
        if found != self.hand_total {
            return Err(EngineError::ChipLeak {
                table_id: self.state.table_id,
                expected: self.hand_total,
                found,
            });
        }
        Ok(())
    }
}

