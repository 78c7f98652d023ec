use std::fmt;

use serde::{Deserialize, Serialize};

pub mod config;
pub mod coordinator;
pub mod error;

pub use config::{ConfigError, TournamentConfig};
pub use coordinator::{spawn, spawn_with_rng, Registered, StartSummary, TournamentHandle};
pub use error::TournamentError;


#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    Registration,
    Running,
    Paused,
    Finished,
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TournamentStatus::Registration => "registration",
            TournamentStatus::Running => "running",
            TournamentStatus::Paused => "paused",
            TournamentStatus::Finished => "finished",
        };
        f.write_str(s)
    }
}
