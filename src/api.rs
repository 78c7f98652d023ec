//! Boundary types for the external transport layer.
//!
//! The HTTP/WebSocket server (not part of this crate) speaks these shapes
//! and nothing else: requests are parsed into them once at the edge, and
//! everything the core emits goes out as a [`ServerMessage`] envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{
    ActionType, AppliedAction, Chips, PlayerId, PlayerStatus, TableId, TableView, ValidAction,
};
use crate::tournament::TournamentStatus;

#[derive(Clone, Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub team_name: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    pub message: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ActionRequest {
    pub action_type: ActionType,
    #[serde(default)]
    pub amount: Option<Chips>,
}

impl From<ActionRequest> for crate::engine::PlayerAction {
    fn from(request: ActionRequest) -> Self {
        crate::engine::PlayerAction {
            action_type: request.action_type,
            amount: request.amount,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<AppliedAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_state: Option<TableView>,
    /// On a rejection: what the caller could legally have done.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_actions: Option<Vec<ValidAction>>,
}

/// `GET /bot/state` payload.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StateResponse {
    /// Not seated anywhere (yet, or anymore).
    Waiting {
        message: String,
        tournament_status: TournamentStatus,
    },
    Active {
        game_state: Box<TableView>,
        valid_actions: Vec<ValidAction>,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct ValidActionsResponse {
    pub is_your_turn: bool,
    pub valid_actions: Vec<ValidAction>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BlindLevel {
    pub small: Chips,
    pub big: Chips,
    pub level: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct EliminationRecord {
    pub player_id: PlayerId,
    pub username: String,
    /// Finish position: first bust-out gets the last place.
    pub position: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_id: Option<TableId>,
    pub eliminated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Admin status endpoint payload.
#[derive(Clone, Debug, Serialize)]
pub struct TournamentStatusReport {
    pub tournament_id: Uuid,
    pub status: TournamentStatus,
    pub registered_players: usize,
    pub remaining_players: usize,
    pub active_tables: usize,
    pub hands_played: u64,
    pub current_blinds: BlindLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    pub recent_eliminations: Vec<EliminationRecord>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerSummary {
    pub player_id: PlayerId,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    pub registered_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chips: Option<Chips>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_id: Option<TableId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PlayerStatus>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Standing {
    pub position: usize,
    pub player_id: PlayerId,
    pub username: String,
    pub chips: Chips,
}

/// Outbound `{type, data}` envelope for every audience.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected {
        player_id: PlayerId,
        tournament_status: TournamentStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        game_state: Option<Box<TableView>>,
    },
    GameState(Box<TableView>),
    ActionResult(Box<ActionResponse>),
    Elimination {
        eliminated: Vec<String>,
        remaining_players: usize,
    },
    Kicked {
        reason: String,
    },
    TournamentComplete {
        #[serde(skip_serializing_if = "Option::is_none")]
        winner: Option<Standing>,
        standings: Vec<Standing>,
        total_hands: u64,
        duration_seconds: i64,
    },
    TableChange {
        new_table_id: TableId,
        message: String,
    },
    Announcement {
        message: String,
    },
    Pong,
    Error {
        message: String,
    },
}

/// Inbound `{type, data}` envelope from bot WebSockets.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    Action(ActionRequest),
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_envelope_shape() {
        let msg = ServerMessage::Kicked {
            reason: "conduct".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "kicked", "data": {"reason": "conduct"}})
        );

        let pong = serde_json::to_value(ServerMessage::Pong).unwrap();
        assert_eq!(pong, serde_json::json!({"type": "pong"}));
    }

    #[test]
    fn client_message_parses_action_and_ping() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type": "action", "data": {"action_type": "raise", "amount": 120}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::Action(req) => {
                assert_eq!(req.action_type, ActionType::Raise);
                assert_eq!(req.amount, Some(120));
            }
            other => panic!("unexpected parse: {other:?}"),
        }

        let ping: ClientMessage = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(ping, ClientMessage::Ping));
    }

    #[test]
    fn malformed_client_payloads_are_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type": "dance"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(
            r#"{"type": "action", "data": {"action_type": "moonshot"}}"#
        )
        .is_err());
    }
}
