use super::types::{Chips, PlayerId, PlayerStatus};
use crate::cards::Card;

/// Per-table player state. Reset per hand and per betting round; the
/// `Eliminated` transition is permanent for the tournament instance.
#[derive(Clone, Debug)]
pub struct Player {
    pub player_id: PlayerId,
    pub username: String,
    pub chips: Chips,
    pub hole_cards: Vec<Card>,
    /// Committed this betting round.
    pub current_bet: Chips,
    /// Committed this hand.
    pub total_bet: Chips,
    pub status: PlayerStatus,
    pub seat: usize,
    pub is_dealer: bool,
    pub is_small_blind: bool,
    pub is_big_blind: bool,
    pub has_acted: bool,
    pub last_action: Option<String>,
}

impl Player {
    pub fn new(player_id: PlayerId, username: String, chips: Chips, seat: usize) -> Player {
        Player {
            player_id,
            username,
            chips,
            hole_cards: Vec::new(),
            current_bet: 0,
            total_bet: 0,
            status: PlayerStatus::Waiting,
            seat,
            is_dealer: false,
            is_small_blind: false,
            is_big_blind: false,
            has_acted: false,
            last_action: None,
        }
    }

    pub fn reset_for_hand(&mut self) {
        self.hole_cards.clear();
        self.current_bet = 0;
        self.total_bet = 0;
        self.has_acted = false;
        self.last_action = None;
        self.is_dealer = false;
        self.is_small_blind = false;
        self.is_big_blind = false;
        if self.chips == 0 {
            self.status = PlayerStatus::Eliminated;
        } else if self.status != PlayerStatus::Disconnected {
            self.status = PlayerStatus::Active;
        }
    }

    pub fn reset_for_betting_round(&mut self) {
        self.current_bet = 0;
        self.has_acted = false;
    }

    /// Can take an action this round.
    pub fn can_act(&self) -> bool {
        self.status == PlayerStatus::Active
    }

    /// Still contesting the hand (eligible to win a pot).
    pub fn in_hand(&self) -> bool {
        matches!(self.status, PlayerStatus::Active | PlayerStatus::AllIn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_for_hand_activates_funded_players() {
        let mut p = Player::new(PlayerId::new(), "ada".into(), 500, 0);
        p.reset_for_hand();
        assert_eq!(p.status, PlayerStatus::Active);
    }

    #[test]
    fn reset_for_hand_eliminates_busted_players() {
        let mut p = Player::new(PlayerId::new(), "bob".into(), 0, 1);
        p.status = PlayerStatus::Folded;
        p.reset_for_hand();
        assert_eq!(p.status, PlayerStatus::Eliminated);
    }

    #[test]
    fn reset_for_hand_leaves_disconnected_players_out() {
        let mut p = Player::new(PlayerId::new(), "cam".into(), 500, 2);
        p.status = PlayerStatus::Disconnected;
        p.reset_for_hand();
        assert_eq!(p.status, PlayerStatus::Disconnected);
    }

    #[test]
    fn round_reset_clears_round_fields_only() {
        let mut p = Player::new(PlayerId::new(), "dee".into(), 500, 3);
        p.current_bet = 40;
        p.total_bet = 90;
        p.has_acted = true;
        p.reset_for_betting_round();
        assert_eq!(p.current_bet, 0);
        assert_eq!(p.total_bet, 90);
        assert!(!p.has_acted);
    }
}
