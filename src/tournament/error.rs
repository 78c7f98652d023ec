use thiserror::Error;

use super::TournamentStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TournamentError {
    #[error("registration closed, tournament status: {status}")]
    RegistrationClosed { status: TournamentStatus },
    #[error("username '{0}' is already taken")]
    UsernameTaken(String),
    #[error("cannot start, tournament status: {status}")]
    NotInRegistration { status: TournamentStatus },
    #[error("not enough players: need at least {need}, have {have}")]
    NotEnoughPlayers { need: usize, have: usize },
    #[error("tournament is not running, status: {status}")]
    NotRunning { status: TournamentStatus },
    #[error("tournament is not paused, status: {status}")]
    NotPaused { status: TournamentStatus },
    #[error("player not found")]
    UnknownPlayer,
    #[error("coordinator is no longer running")]
    Closed,
}
