pub mod actions;
pub mod errors;
pub mod player;
pub mod pots;
pub mod rules;
pub mod state;
pub mod table;
pub mod types;
pub mod view;

pub use actions::{ActionType, AppliedAction, PlayerAction};
pub use errors::{ActionError, EngineError, TableError};
pub use player::Player;
pub use rules::ValidAction;
pub use state::GameState;
pub use table::TableEngine;
pub use types::{
    BettingRound, Chips, GamePhase, HandWinner, PlayerId, PlayerStatus, PotInfo, TableId,
};
pub use view::{PlayerView, TableView};

#[cfg(test)]
mod tests;
