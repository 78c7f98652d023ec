//! Betting legality. Pure predicates over a state snapshot; nothing in
//! here mutates anything.

use serde::Serialize;

use super::actions::{ActionType, PlayerAction};
use super::errors::ActionError;
use super::player::Player;
use super::state::GameState;
use super::types::{Chips, GamePhase, PlayerId};

/// Chips the player must add to match the table bet.
pub fn to_call(state: &GameState, player: &Player) -> Chips {
    state.current_bet.saturating_sub(player.current_bet)
}

/// Validate a proposed action and normalize its amount to the chip delta
/// the player will actually commit.
pub fn validate(
    state: &GameState,
    player_id: &PlayerId,
    action: &PlayerAction,
) -> Result<Chips, ActionError> {
    if state.current_player_id.as_ref() != Some(player_id) {
        return Err(ActionError::NotYourTurn);
    }
    if state.phase != GamePhase::Betting {
        return Err(ActionError::WrongPhase { phase: state.phase });
    }
    let player = state.player(player_id).ok_or(ActionError::UnknownPlayer)?;
    if !player.can_act() {
        return Err(ActionError::CannotAct {
            status: player.status,
        });
    }

    let owed = to_call(state, player);
    match action.action_type {
        ActionType::Fold => Ok(0),
        ActionType::Check => {
            if owed > 0 {
                return Err(ActionError::CheckFacingBet { to_call: owed });
            }
            Ok(0)
        }
        ActionType::Call => {
            if owed == 0 {
                return Err(ActionError::NothingToCall);
            }
            // Short call goes all-in for less.
            Ok(owed.min(player.chips))
        }
        ActionType::Bet => {
            let amount = action
                .amount
                .ok_or(ActionError::AmountRequired { action: "bet" })?;
            if state.current_bet > 0 {
                return Err(ActionError::BetWhenOpened);
            }
            if amount < state.big_blind {
                return Err(ActionError::BetBelowMinimum {
                    min: state.big_blind,
                });
            }
            if amount > player.chips {
                return Err(ActionError::InsufficientChips {
                    chips: player.chips,
                });
            }
            Ok(amount)
        }
        ActionType::Raise => {
            // `target` is the total bet the player wants to reach.
            let target = action
                .amount
                .ok_or(ActionError::AmountRequired { action: "raise" })?;
            if state.current_bet == 0 {
                return Err(ActionError::RaiseWithoutBet);
            }
            let add = target.saturating_sub(player.current_bet);
            if add > player.chips {
                return Err(ActionError::InsufficientChips {
                    chips: player.chips,
                });
            }
            let full_increment =
                target >= state.current_bet && target - state.current_bet >= state.min_raise;
            // Below-minimum raises are only legal as whole-stack commits.
            if !full_increment && add < player.chips {
                return Err(ActionError::RaiseBelowMinimum {
                    min_to: state.current_bet + state.min_raise,
                });
            }
            Ok(add)
        }
        ActionType::AllIn => {
            if player.chips == 0 {
                return Err(ActionError::NoChips);
            }
            Ok(player.chips)
        }
    }
}

/// One legal action with its inclusive amount range, so clients can build
/// decisions without re-implementing the rules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidAction {
    pub action_type: ActionType,
    pub min_amount: Chips,
    pub max_amount: Chips,
}

/// The complete legal action set for `player_id`, empty when it is not
/// their turn or they cannot act.
pub fn valid_actions(state: &GameState, player_id: &PlayerId) -> Vec<ValidAction> {
    let Some(player) = state.player(player_id) else {
        return vec![];
    };
    if !player.can_act()
        || state.phase != GamePhase::Betting
        || state.current_player_id.as_ref() != Some(player_id)
    {
        return vec![];
    }

    let mut actions = Vec::new();
    let owed = to_call(state, player);

    actions.push(ValidAction {
        action_type: ActionType::Fold,
        min_amount: 0,
        max_amount: 0,
    });

    if owed == 0 {
        actions.push(ValidAction {
            action_type: ActionType::Check,
            min_amount: 0,
            max_amount: 0,
        });
        if state.current_bet == 0 && player.chips >= state.big_blind {
            actions.push(ValidAction {
                action_type: ActionType::Bet,
                min_amount: state.big_blind,
                max_amount: player.chips,
            });
        } else if state.current_bet > 0
            && player.chips > 0
            && player.chips + player.current_bet > state.current_bet
        {
            // Big-blind option: the bet is matched but was never raised, so
            // raising is still open to the blind poster.
            let min_raise_to = state.current_bet + state.min_raise;
            let max_raise_to = player.chips + player.current_bet;
            actions.push(ValidAction {
                action_type: ActionType::Raise,
                min_amount: min_raise_to.min(max_raise_to),
                max_amount: max_raise_to,
            });
        }
    } else {
        let call_amount = owed.min(player.chips);
        actions.push(ValidAction {
            action_type: ActionType::Call,
            min_amount: call_amount,
            max_amount: call_amount,
        });
        if player.chips > owed {
            let min_raise_to = state.current_bet + state.min_raise;
            let max_raise_to = player.chips + player.current_bet;
            actions.push(ValidAction {
                action_type: ActionType::Raise,
                min_amount: min_raise_to.min(max_raise_to),
                max_amount: max_raise_to,
            });
        }
    }

    if player.chips > 0 {
        actions.push(ValidAction {
            action_type: ActionType::AllIn,
            min_amount: player.chips,
            max_amount: player.chips,
        });
    }

    actions
}

/// A betting round is over when at most one player is still contesting
/// the hand, or when every player who can act has acted and matches the
/// table bet. A raise re-opens the round by clearing `has_acted` on the
/// other players, so the loop naturally returns to the raiser.
pub fn betting_round_complete(state: &GameState) -> bool {
    if state.players_in_hand().len() <= 1 {
        return true;
    }
    state
        .players_to_act()
        .iter()
        .all(|p| p.has_acted && p.current_bet >= state.current_bet)
}
