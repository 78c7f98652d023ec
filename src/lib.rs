pub mod api;
pub mod cards;
pub mod engine;
pub mod eval;
pub mod logging;
pub mod sink;
pub mod tournament;

pub use engine::types::{Chips, PlayerId, TableId};
pub use sink::ConnectionSink;
pub use tournament::{TournamentConfig, TournamentHandle};
