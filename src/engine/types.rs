use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cards::Card;

pub type Chips = u64;

/// Opaque player identity, minted at registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(Uuid);

impl PlayerId {
    pub fn new() -> PlayerId {
        PlayerId(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Table identity. Ordered so "lowest table id" is a well-defined
/// rebalancing tiebreak.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table_{}", self.0)
    }
}

impl Serialize for TableId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Waiting,
    Dealing,
    Betting,
    Showdown,
    HandComplete,
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GamePhase::Waiting => "waiting",
            GamePhase::Dealing => "dealing",
            GamePhase::Betting => "betting",
            GamePhase::Showdown => "showdown",
            GamePhase::HandComplete => "hand_complete",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BettingRound {
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Waiting,
    Active,
    Folded,
    AllIn,
    Eliminated,
    Disconnected,
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlayerStatus::Waiting => "waiting",
            PlayerStatus::Active => "active",
            PlayerStatus::Folded => "folded",
            PlayerStatus::AllIn => "all_in",
            PlayerStatus::Eliminated => "eliminated",
            PlayerStatus::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// One pot: the main pot or a side pot layered on top of it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PotInfo {
    pub amount: Chips,
    pub eligible_players: Vec<PlayerId>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ActionRecord {
    pub player_id: PlayerId,
    pub username: String,
    pub action: String,
    pub amount: Chips,
    pub round: BettingRound,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct HandWinner {
    pub player_id: PlayerId,
    pub username: String,
    pub amount: Chips,
    pub hand: String,
    pub cards: Vec<Card>,
}
