use std::time::Duration;

use thiserror::Error;

use crate::engine::Chips;

/// Tournament parameters. The config-loading layer (environment, files)
/// lives outside this crate and hands a finished value in.
#[derive(Clone, Debug)]
pub struct TournamentConfig {
    pub name: String,
    pub starting_chips: Chips,
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub min_players: usize,
    pub max_players_per_table: usize,
    /// Per-decision budget; `None` disables auto-fold timeouts.
    pub action_timeout: Option<Duration>,
    /// Hands between blind levels; 0 disables escalation.
    pub blind_increase_interval_hands: u64,
    /// Geometric factor applied to both blinds per level.
    pub blind_increase_multiplier: f64,
    /// Pause between a hand completing and the next one starting.
    pub settle_delay: Duration,
    /// HTTP Basic secret, consumed by the admin transport layer.
    pub admin_password: String,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        TournamentConfig {
            name: "Arena Championship".to_string(),
            starting_chips: 1_000,
            small_blind: 10,
            big_blind: 20,
            min_players: 2,
            max_players_per_table: 6,
            action_timeout: Some(Duration::from_secs(30)),
            blind_increase_interval_hands: 20,
            blind_increase_multiplier: 1.5,
            settle_delay: Duration::from_secs(3),
            admin_password: "admin123".to_string(),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("blinds must satisfy big_blind >= 2 * small_blind > 0 (got {small_blind}/{big_blind})")]
    BadBlinds { small_blind: Chips, big_blind: Chips },
    #[error("starting_chips must be positive")]
    NoStartingChips,
    #[error("max_players_per_table must be at least 2")]
    TableTooSmall,
    #[error("min_players must be at least 2")]
    MinPlayersTooSmall,
    #[error("blind_increase_multiplier must be at least 1.0")]
    ShrinkingBlinds,
}

impl TournamentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.small_blind == 0 || self.big_blind < 2 * self.small_blind {
            return Err(ConfigError::BadBlinds {
                small_blind: self.small_blind,
                big_blind: self.big_blind,
            });
        }
        if self.starting_chips == 0 {
            return Err(ConfigError::NoStartingChips);
        }
        if self.max_players_per_table < 2 {
            return Err(ConfigError::TableTooSmall);
        }
        if self.min_players < 2 {
            return Err(ConfigError::MinPlayersTooSmall);
        }
        if self.blind_increase_multiplier < 1.0 {
            return Err(ConfigError::ShrinkingBlinds);
        }
        Ok(())
    }
}
