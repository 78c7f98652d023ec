use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::{Chips, PlayerId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Fold,
    Check,
    Call,
    Bet,
    Raise,
    AllIn,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionType::Fold => "fold",
            ActionType::Check => "check",
            ActionType::Call => "call",
            ActionType::Bet => "bet",
            ActionType::Raise => "raise",
            ActionType::AllIn => "all_in",
        };
        f.write_str(s)
    }
}

/// Action as submitted by a client. For RAISE the amount is the target
/// total bet, not the increment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAction {
    pub action_type: ActionType,
    #[serde(default)]
    pub amount: Option<Chips>,
}

impl PlayerAction {
    pub fn of(action_type: ActionType) -> PlayerAction {
        PlayerAction {
            action_type,
            amount: None,
        }
    }

    pub fn with_amount(action_type: ActionType, amount: Chips) -> PlayerAction {
        PlayerAction {
            action_type,
            amount: Some(amount),
        }
    }
}

/// Validated and applied action, with the normalized chip delta.
#[derive(Clone, Debug, Serialize)]
pub struct AppliedAction {
    pub player_id: PlayerId,
    pub action_type: ActionType,
    pub amount: Chips,
}
