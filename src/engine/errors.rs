use thiserror::Error;

use super::types::{Chips, GamePhase, PlayerStatus, TableId};
use crate::cards::DeckError;

/// Rejections of a proposed action. Client errors: the table state is
/// untouched when one of these is returned.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("not your turn")]
    NotYourTurn,
    #[error("cannot act during {phase} phase")]
    WrongPhase { phase: GamePhase },
    #[error("player not seated at this table")]
    UnknownPlayer,
    #[error("cannot act with status {status}")]
    CannotAct { status: PlayerStatus },
    #[error("cannot check, {to_call} to call")]
    CheckFacingBet { to_call: Chips },
    #[error("nothing to call, check instead")]
    NothingToCall,
    #[error("cannot bet over an existing bet, raise instead")]
    BetWhenOpened,
    #[error("cannot raise when there is no bet, bet instead")]
    RaiseWithoutBet,
    #[error("minimum bet is {min}")]
    BetBelowMinimum { min: Chips },
    #[error("minimum raise is to {min_to}")]
    RaiseBelowMinimum { min_to: Chips },
    #[error("{action} requires an amount")]
    AmountRequired { action: &'static str },
    #[error("not enough chips: have {chips}")]
    InsufficientChips { chips: Chips },
    #[error("cannot go all-in with no chips")]
    NoChips,
}

/// Implementer bugs surfaced by the runtime checks. Fatal for the table.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("chip conservation violated at {table_id}: expected {expected}, found {found}")]
    ChipLeak {
        table_id: TableId,
        expected: Chips,
        found: Chips,
    },
    #[error(transparent)]
    Deck(#[from] DeckError),
}

#[derive(Debug, Error)]
pub enum TableError {
    /// Client error; state unchanged, caller may retry.
    #[error(transparent)]
    Rejected(#[from] ActionError),
    /// Invariant violation; the table must be aborted.
    #[error(transparent)]
    Fatal(#[from] EngineError),
}
