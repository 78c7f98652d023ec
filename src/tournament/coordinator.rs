//! Tournament coordination: registration, table creation and rebalancing,
//! blind escalation, action timeouts, elimination ordering.
//!
//! The coordinator is one tokio task owning every table engine, driven by
//! a command channel. That single serial context is what serializes both
//! per-table mutations and cross-table state; timers and the inter-hand
//! settling delay are spawned sleeps that send commands back into the
//! channel, stamped with a generation (timers) or epoch (lifecycle) that
//! is re-checked on receipt. A stale stamp means the wake lost its race
//! with a real event and is dropped, so a player action and its timeout
//! can never both take effect.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use super::config::TournamentConfig;
use super::error::TournamentError;
use super::TournamentStatus;
use crate::api::{
    ActionResponse, BlindLevel, EliminationRecord, PlayerSummary, ServerMessage, Standing,
    StateResponse, TournamentStatusReport, ValidActionsResponse,
};
use crate::engine::{
    ActionType, Chips, GamePhase, PlayerAction, PlayerId, TableEngine, TableError, TableId,
    TableView,
};
use crate::sink::ConnectionSink;

const LOG_TARGET: &str = "tournament::coordinator";

/// Successful registration: the id and credential handed back to the bot.
#[derive(Clone, Debug)]
pub struct Registered {
    pub player_id: PlayerId,
    pub credential: String,
}

#[derive(Clone, Copy, Debug)]
pub struct StartSummary {
    pub players: usize,
    pub tables: usize,
}

enum Command {
    Register {
        username: String,
        team_name: Option<String>,
        reply: oneshot::Sender<Result<Registered, TournamentError>>,
    },
    Authenticate {
        credential: String,
        reply: oneshot::Sender<Option<PlayerId>>,
    },
    Start {
        reply: oneshot::Sender<Result<StartSummary, TournamentError>>,
    },
    Action {
        player_id: PlayerId,
        action: PlayerAction,
        reply: oneshot::Sender<ActionResponse>,
    },
    TimeoutFired {
        table_id: TableId,
        generation: u64,
    },
    NextHandDue {
        table_id: TableId,
        epoch: u64,
    },
    Pause {
        reply: oneshot::Sender<Result<(), TournamentError>>,
    },
    Resume {
        reply: oneshot::Sender<Result<(), TournamentError>>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    Kick {
        player_id: PlayerId,
        reason: String,
        reply: oneshot::Sender<Result<(), TournamentError>>,
    },
    Announce {
        message: String,
        reply: oneshot::Sender<()>,
    },
    Status {
        reply: oneshot::Sender<TournamentStatusReport>,
    },
    Players {
        reply: oneshot::Sender<Vec<PlayerSummary>>,
    },
    Tables {
        reply: oneshot::Sender<Vec<TableView>>,
    },
    PlayerState {
        player_id: PlayerId,
        reply: oneshot::Sender<StateResponse>,
    },
    ValidActions {
        player_id: PlayerId,
        reply: oneshot::Sender<ValidActionsResponse>,
    },
}

/// Cloneable async facade over the coordinator task. This is the surface
/// an HTTP/WebSocket layer calls into.
#[derive(Clone)]
pub struct TournamentHandle {
    tx: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
}

pub fn spawn(
    config: TournamentConfig,
    sink: Arc<dyn ConnectionSink>,
) -> anyhow::Result<TournamentHandle> {
    spawn_with_rng(config, sink, StdRng::from_entropy())
}

/// Like [`spawn`] but with a caller-provided RNG, so tests get
/// deterministic seating and decks.
pub fn spawn_with_rng(
    config: TournamentConfig,
    sink: Arc<dyn ConnectionSink>,
    rng: StdRng,
) -> anyhow::Result<TournamentHandle> {
    config.validate().context("invalid tournament config")?;
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let coordinator = Coordinator::new(config, sink, tx.clone(), cancel.clone(), rng);
    let span = tracing::info_span!("task", task_name = "tournament-coordinator");
    tokio::spawn(coordinator.run(rx).instrument(span));
    Ok(TournamentHandle { tx, cancel })
}

impl TournamentHandle {
    pub async fn register(
        &self,
        username: impl Into<String>,
        team_name: Option<String>,
    ) -> Result<Registered, TournamentError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Register {
                username: username.into(),
                team_name,
                reply,
            })
            .map_err(|_| TournamentError::Closed)?;
        rx.await.map_err(|_| TournamentError::Closed)?
    }

    pub async fn authenticate(&self, credential: &str) -> Result<Option<PlayerId>, TournamentError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Authenticate {
                credential: credential.to_string(),
                reply,
            })
            .map_err(|_| TournamentError::Closed)?;
        rx.await.map_err(|_| TournamentError::Closed)
    }

    pub async fn start(&self) -> Result<StartSummary, TournamentError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Start { reply })
            .map_err(|_| TournamentError::Closed)?;
        rx.await.map_err(|_| TournamentError::Closed)?
    }

    /// Submit an action on behalf of a player. Failures are reported in
    /// the response body, mirroring what a bot sees on the wire.
    pub async fn action(
        &self,
        player_id: PlayerId,
        action: PlayerAction,
    ) -> Result<ActionResponse, TournamentError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Action {
                player_id,
                action,
                reply,
            })
            .map_err(|_| TournamentError::Closed)?;
        rx.await.map_err(|_| TournamentError::Closed)
    }

    pub async fn pause(&self) -> Result<(), TournamentError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Pause { reply })
            .map_err(|_| TournamentError::Closed)?;
        rx.await.map_err(|_| TournamentError::Closed)?
    }

    pub async fn resume(&self) -> Result<(), TournamentError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Resume { reply })
            .map_err(|_| TournamentError::Closed)?;
        rx.await.map_err(|_| TournamentError::Closed)?
    }

    pub async fn reset(&self) -> Result<(), TournamentError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Reset { reply })
            .map_err(|_| TournamentError::Closed)?;
        rx.await.map_err(|_| TournamentError::Closed)
    }

    pub async fn kick(
        &self,
        player_id: PlayerId,
        reason: impl Into<String>,
    ) -> Result<(), TournamentError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Kick {
                player_id,
                reason: reason.into(),
                reply,
            })
            .map_err(|_| TournamentError::Closed)?;
        rx.await.map_err(|_| TournamentError::Closed)?
    }

    pub async fn announce(&self, message: impl Into<String>) -> Result<(), TournamentError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Announce {
                message: message.into(),
                reply,
            })
            .map_err(|_| TournamentError::Closed)?;
        rx.await.map_err(|_| TournamentError::Closed)
    }

    pub async fn status(&self) -> Result<TournamentStatusReport, TournamentError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Status { reply })
            .map_err(|_| TournamentError::Closed)?;
        rx.await.map_err(|_| TournamentError::Closed)
    }

    pub async fn players(&self) -> Result<Vec<PlayerSummary>, TournamentError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Players { reply })
            .map_err(|_| TournamentError::Closed)?;
        rx.await.map_err(|_| TournamentError::Closed)
    }

    pub async fn tables(&self) -> Result<Vec<TableView>, TournamentError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Tables { reply })
            .map_err(|_| TournamentError::Closed)?;
        rx.await.map_err(|_| TournamentError::Closed)
    }

    pub async fn player_state(&self, player_id: PlayerId) -> Result<StateResponse, TournamentError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::PlayerState { player_id, reply })
            .map_err(|_| TournamentError::Closed)?;
        rx.await.map_err(|_| TournamentError::Closed)
    }

    pub async fn valid_actions(
        &self,
        player_id: PlayerId,
    ) -> Result<ValidActionsResponse, TournamentError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::ValidActions { player_id, reply })
            .map_err(|_| TournamentError::Closed)?;
        rx.await.map_err(|_| TournamentError::Closed)
    }

    /// Stop the coordinator task. Pending timers are discarded.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

struct PlayerRecord {
    username: String,
    team_name: Option<String>,
    credential: String,
    registered_at: DateTime<Utc>,
}

struct TimerState {
    generation: u64,
    task: JoinHandle<()>,
}

struct Coordinator {
    tournament_id: Uuid,
    config: TournamentConfig,
    status: TournamentStatus,

    registered: HashMap<PlayerId, PlayerRecord>,
    credentials: HashMap<String, PlayerId>,

    tables: HashMap<TableId, TableEngine>,
    seat_map: HashMap<PlayerId, TableId>,
    next_table_seq: u32,

    eliminations: Vec<EliminationRecord>,
    hands_played: u64,
    blind_level: u32,
    small_blind: Chips,
    big_blind: Chips,
    started_at: Option<DateTime<Utc>>,

    timers: HashMap<TableId, TimerState>,
    timer_seq: u64,
    /// Bumped on reset and tournament end; orphans pending wakeups.
    epoch: u64,

    sink: Arc<dyn ConnectionSink>,
    self_tx: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
    rng: StdRng,
}

impl Coordinator {
    fn new(
        config: TournamentConfig,
        sink: Arc<dyn ConnectionSink>,
        self_tx: mpsc::UnboundedSender<Command>,
        cancel: CancellationToken,
        rng: StdRng,
    ) -> Coordinator {
        let small_blind = config.small_blind;
        let big_blind = config.big_blind;
        Coordinator {
            tournament_id: Uuid::new_v4(),
            config,
            status: TournamentStatus::Registration,
            registered: HashMap::new(),
            credentials: HashMap::new(),
            tables: HashMap::new(),
            seat_map: HashMap::new(),
            next_table_seq: 1,
            eliminations: Vec::new(),
            hands_played: 0,
            blind_level: 1,
            small_blind,
            big_blind,
            started_at: None,
            timers: HashMap::new(),
            timer_seq: 0,
            epoch: 0,
            sink,
            self_tx,
            cancel,
            rng,
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        info!(
            target: LOG_TARGET,
            tournament = %self.tournament_id,
            name = %self.config.name,
            "coordinator started"
        );
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                command = rx.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }
        self.disarm_all_timers();
        info!(target: LOG_TARGET, tournament = %self.tournament_id, "coordinator stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Register {
                username,
                team_name,
                reply,
            } => {
                let _ = reply.send(self.register(username, team_name));
            }
            Command::Authenticate { credential, reply } => {
                let _ = reply.send(self.credentials.get(&credential).copied());
            }
            Command::Start { reply } => {
                let _ = reply.send(self.start());
            }
            Command::Action {
                player_id,
                action,
                reply,
            } => {
                let _ = reply.send(self.process_action(player_id, &action));
            }
            Command::TimeoutFired {
                table_id,
                generation,
            } => self.on_timeout_fired(table_id, generation),
            Command::NextHandDue { table_id, epoch } => self.on_next_hand_due(table_id, epoch),
            Command::Pause { reply } => {
                let _ = reply.send(self.pause());
            }
            Command::Resume { reply } => {
                let _ = reply.send(self.resume());
            }
            Command::Reset { reply } => {
                self.reset();
                let _ = reply.send(());
            }
            Command::Kick {
                player_id,
                reason,
                reply,
            } => {
                let _ = reply.send(self.kick(player_id, reason));
            }
            Command::Announce { message, reply } => {
                self.announce(&message);
                let _ = reply.send(());
            }
            Command::Status { reply } => {
                let _ = reply.send(self.status_report());
            }
            Command::Players { reply } => {
                let _ = reply.send(self.player_summaries());
            }
            Command::Tables { reply } => {
                let _ = reply.send(self.table_views());
            }
            Command::PlayerState { player_id, reply } => {
                let _ = reply.send(self.player_state(&player_id));
            }
            Command::ValidActions { player_id, reply } => {
                let _ = reply.send(self.player_valid_actions(&player_id));
            }
        }
    }

    // --- registration ---

    fn register(
        &mut self,
        username: String,
        team_name: Option<String>,
    ) -> Result<Registered, TournamentError> {
        if self.status != TournamentStatus::Registration {
            return Err(TournamentError::RegistrationClosed {
                status: self.status,
            });
        }
        let wanted = username.to_lowercase();
        if self
            .registered
            .values()
            .any(|r| r.username.to_lowercase() == wanted)
        {
            return Err(TournamentError::UsernameTaken(username));
        }

        let player_id = PlayerId::new();
        let mut secret = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut secret);
        let credential = hex::encode(secret);

        self.registered.insert(
            player_id,
            PlayerRecord {
                username: username.clone(),
                team_name,
                credential: credential.clone(),
                registered_at: Utc::now(),
            },
        );
        self.credentials.insert(credential.clone(), player_id);

        info!(
            target: LOG_TARGET,
            player = %player_id,
            %username,
            total = self.registered.len(),
            "player registered"
        );
        Ok(Registered {
            player_id,
            credential,
        })
    }

    // --- tournament start ---

    fn start(&mut self) -> Result<StartSummary, TournamentError> {
        if self.status != TournamentStatus::Registration {
            return Err(TournamentError::NotInRegistration {
                status: self.status,
            });
        }
        let player_count = self.registered.len();
        if player_count < self.config.min_players {
            return Err(TournamentError::NotEnoughPlayers {
                need: self.config.min_players,
                have: player_count,
            });
        }

        self.status = TournamentStatus::Running;
        self.started_at = Some(Utc::now());
        self.create_tables();

        let table_ids: Vec<TableId> = self.tables.keys().copied().collect();
        for table_id in table_ids {
            self.start_hand_on(table_id);
        }

        info!(
            target: LOG_TARGET,
            players = player_count,
            tables = self.tables.len(),
            "tournament started"
        );
        Ok(StartSummary {
            players: player_count,
            tables: self.tables.len(),
        })
    }

    /// Shuffle the field and split it round-robin into tables whose sizes
    /// differ by at most one.
    fn create_tables(&mut self) {
        let mut player_ids: Vec<PlayerId> = self.registered.keys().copied().collect();
        // Fixed base order before the shuffle keeps seeded runs reproducible.
        player_ids.sort_by(|a, b| self.registered[a].username.cmp(&self.registered[b].username));
        player_ids.shuffle(&mut self.rng);

        let per_table = self.config.max_players_per_table;
        let table_count = player_ids.len().div_ceil(per_table);
        let mut assignments: Vec<Vec<PlayerId>> = vec![Vec::new(); table_count];
        for (i, player_id) in player_ids.iter().enumerate() {
            assignments[i % table_count].push(*player_id);
        }

        for group in assignments {
            if group.len() < 2 {
                // Only reachable with a table cap of 2 and an odd field.
                warn!(
                    target: LOG_TARGET,
                    players = group.len(),
                    "cannot seat a table with fewer than two players"
                );
                continue;
            }
            let table_id = TableId(self.next_table_seq);
            self.next_table_seq += 1;
            let engine_rng = StdRng::seed_from_u64(self.rng.gen());
            let mut engine =
                TableEngine::with_rng(table_id, self.small_blind, self.big_blind, engine_rng);
            for player_id in &group {
                let username = self.registered[player_id].username.clone();
                engine.add_player(*player_id, &username, self.config.starting_chips);
                self.seat_map.insert(*player_id, table_id);
            }
            info!(
                target: LOG_TARGET,
                table = %table_id,
                seats = group.len(),
                "table created"
            );
            self.tables.insert(table_id, engine);
        }
    }

    fn start_hand_on(&mut self, table_id: TableId) {
        let outcome = match self.tables.get_mut(&table_id) {
            Some(engine) => engine.start_hand(),
            None => return,
        };
        match outcome {
            Ok(true) => self.after_table_mutation(table_id),
            Ok(false) => warn!(
                target: LOG_TARGET,
                table = %table_id,
                "not enough players to deal a hand"
            ),
            Err(err) => self.abort_table(table_id, err.into()),
        }
    }

    // --- action dispatch ---

    fn process_action(&mut self, player_id: PlayerId, action: &PlayerAction) -> ActionResponse {
        if self.status != TournamentStatus::Running {
            return reject(format!(
                "tournament is not running, status: {}",
                self.status
            ));
        }
        let Some(table_id) = self.seat_map.get(&player_id).copied() else {
            return reject("player not assigned to any table".to_string());
        };
        if !self.tables.contains_key(&table_id) {
            return reject("table not found".to_string());
        }

        self.disarm_timeout(table_id);
        let result = match self.tables.get_mut(&table_id) {
            Some(engine) => engine.process_action(&player_id, action),
            None => return reject("table not found".to_string()),
        };

        match result {
            Ok(applied) => {
                let game_state = self
                    .tables
                    .get(&table_id)
                    .map(|t| t.player_view(&player_id));
                self.after_table_mutation(table_id);
                ActionResponse {
                    success: true,
                    message: format!("action accepted: {}", applied.action_type),
                    action: Some(applied),
                    game_state,
                    valid_actions: None,
                }
            }
            Err(TableError::Rejected(err)) => {
                // The obligation is unchanged: rearm for the same player.
                let valid_actions = self
                    .tables
                    .get(&table_id)
                    .map(|t| t.valid_actions(&player_id));
                self.arm_timeout(table_id);
                ActionResponse {
                    success: false,
                    message: err.to_string(),
                    action: None,
                    game_state: None,
                    valid_actions,
                }
            }
            Err(TableError::Fatal(err)) => {
                self.abort_table(table_id, err.into());
                reject("internal error, table aborted".to_string())
            }
        }
    }

    /// Broadcast the new state, then either continue the hand (arm the
    /// next timeout) or run the between-hands sequence.
    fn after_table_mutation(&mut self, table_id: TableId) {
        self.broadcast_table_state(table_id);
        let complete = self
            .tables
            .get(&table_id)
            .map(|t| t.hand_complete())
            .unwrap_or(false);
        if complete {
            self.handle_hand_complete(table_id);
        } else {
            self.arm_timeout(table_id);
        }
    }

    // --- between hands ---

    fn handle_hand_complete(&mut self, table_id: TableId) {
        self.hands_played += 1;

        let mut busted: Vec<(PlayerId, String)> = Vec::new();
        if let Some(engine) = self.tables.get_mut(&table_id) {
            engine.mark_busted_eliminated();
            for player in engine.state().players.values() {
                if player.chips == 0 && self.seat_map.contains_key(&player.player_id) {
                    busted.push((player.player_id, player.username.clone()));
                }
            }
        }

        for (player_id, username) in &busted {
            self.seat_map.remove(player_id);
            let position = self.registered.len() - self.eliminations.len();
            self.eliminations.push(EliminationRecord {
                player_id: *player_id,
                username: username.clone(),
                position,
                table_id: Some(table_id),
                eliminated_at: Utc::now(),
                reason: None,
            });
            info!(
                target: LOG_TARGET,
                player = %player_id,
                %username,
                position,
                "player eliminated"
            );
        }
        if !busted.is_empty() {
            let notice = ServerMessage::Elimination {
                eliminated: busted.iter().map(|(_, name)| name.clone()).collect(),
                remaining_players: self.remaining_player_count(),
            };
            self.sink.broadcast_to_viewers(&notice);
            self.sink.broadcast_to_admins(&notice);
        }

        if self.remaining_player_count() <= 1 {
            self.end_tournament(None);
            return;
        }

        let funded_here = self
            .tables
            .get(&table_id)
            .map(|t| t.state().players.values().filter(|p| p.chips > 0).count())
            .unwrap_or(0);
        if funded_here < 2 {
            self.close_table(table_id);
            return;
        }

        self.check_blind_increase();
        self.schedule_next_hand(table_id);
    }

    fn schedule_next_hand(&mut self, table_id: TableId) {
        let epoch = self.epoch;
        let delay = self.config.settle_delay;
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Command::NextHandDue { table_id, epoch });
        });
    }

    fn on_next_hand_due(&mut self, table_id: TableId, epoch: u64) {
        if epoch != self.epoch || self.status != TournamentStatus::Running {
            return;
        }
        let Some(engine) = self.tables.get(&table_id) else {
            return;
        };
        // A duplicate wakeup while a hand is live is a no-op.
        let phase = engine.state().phase;
        if phase != GamePhase::HandComplete && phase != GamePhase::Waiting {
            return;
        }
        self.start_hand_on(table_id);
    }

    // --- table closure & rebalancing ---

    fn close_table(&mut self, table_id: TableId) {
        self.disarm_timeout(table_id);
        let Some(engine) = self.tables.remove(&table_id) else {
            return;
        };
        info!(target: LOG_TARGET, table = %table_id, "table closed");

        let survivors: Vec<(PlayerId, String, Chips)> = engine
            .state()
            .player_order
            .iter()
            .filter_map(|pid| engine.state().players.get(pid))
            .filter(|p| p.chips > 0)
            .map(|p| (p.player_id, p.username.clone(), p.chips))
            .collect();

        if self.tables.is_empty() {
            let fallback = survivors.first().map(|(pid, name, chips)| Standing {
                position: 1,
                player_id: *pid,
                username: name.clone(),
                chips: *chips,
            });
            self.end_tournament(fallback);
            return;
        }

        let mut touched: Vec<TableId> = Vec::new();
        for (player_id, username, chips) in survivors {
            let Some(destination) = self
                .tables
                .iter()
                .map(|(tid, t)| {
                    let seated = t.state().players.values().filter(|p| p.chips > 0).count();
                    (seated, *tid)
                })
                .min()
                .map(|(_, tid)| tid)
            else {
                break;
            };
            if let Some(engine) = self.tables.get_mut(&destination) {
                engine.add_player(player_id, &username, chips);
            }
            self.seat_map.insert(player_id, destination);
            touched.push(destination);
            self.sink.send_to_player(
                &player_id,
                &ServerMessage::TableChange {
                    new_table_id: destination,
                    message: "you have been moved to a new table".to_string(),
                },
            );
            info!(
                target: LOG_TARGET,
                player = %player_id,
                %username,
                from = %table_id,
                to = %destination,
                chips,
                "player rebalanced"
            );
        }

        // A destination sitting between hands may have been waiting for
        // exactly this arrival.
        touched.sort_unstable();
        touched.dedup();
        for destination in touched {
            let idle = self
                .tables
                .get(&destination)
                .map(|t| {
                    let phase = t.state().phase;
                    phase == GamePhase::HandComplete || phase == GamePhase::Waiting
                })
                .unwrap_or(false);
            if idle {
                self.schedule_next_hand(destination);
            }
        }
    }

    // --- blind escalation ---

    fn check_blind_increase(&mut self) {
        let interval = self.config.blind_increase_interval_hands;
        if interval == 0 {
            return;
        }
        let expected = (self.hands_played / interval) as u32 + 1;
        if expected <= self.blind_level {
            return;
        }
        self.blind_level = expected;
        let factor = self
            .config
            .blind_increase_multiplier
            .powi(expected as i32 - 1);
        self.small_blind = (self.config.small_blind as f64 * factor) as Chips;
        self.big_blind = (self.config.big_blind as f64 * factor) as Chips;
        for engine in self.tables.values_mut() {
            engine.set_blinds(self.small_blind, self.big_blind);
        }
        info!(
            target: LOG_TARGET,
            level = self.blind_level,
            small_blind = self.small_blind,
            big_blind = self.big_blind,
            "blinds increased"
        );
    }

    // --- timeout scheduler ---

    fn arm_timeout(&mut self, table_id: TableId) {
        self.disarm_timeout(table_id);
        let Some(timeout) = self.config.action_timeout else {
            return;
        };
        if self.status != TournamentStatus::Running {
            return;
        }
        let Some(current) = self.tables.get(&table_id).and_then(|t| t.current_player()) else {
            return;
        };

        self.timer_seq += 1;
        let generation = self.timer_seq;
        let tx = self.self_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx.send(Command::TimeoutFired {
                table_id,
                generation,
            });
        });
        self.timers.insert(table_id, TimerState { generation, task });
        tracing::debug!(
            target: LOG_TARGET,
            table = %table_id,
            player = %current,
            "action timeout armed"
        );
    }

    fn disarm_timeout(&mut self, table_id: TableId) {
        if let Some(timer) = self.timers.remove(&table_id) {
            timer.task.abort();
        }
    }

    fn disarm_all_timers(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.task.abort();
        }
    }

    fn on_timeout_fired(&mut self, table_id: TableId, generation: u64) {
        if self.status != TournamentStatus::Running {
            return;
        }
        // Stale wakeups lost the race against a real action.
        match self.timers.get(&table_id) {
            Some(timer) if timer.generation == generation => {}
            _ => return,
        }
        self.timers.remove(&table_id);

        let Some(current) = self.tables.get(&table_id).and_then(|t| t.current_player()) else {
            return;
        };
        warn!(
            target: LOG_TARGET,
            table = %table_id,
            player = %current,
            "action timeout, auto-folding"
        );
        let response = self.process_action(current, &PlayerAction::of(ActionType::Fold));
        if !response.success {
            error!(
                target: LOG_TARGET,
                table = %table_id,
                player = %current,
                message = %response.message,
                "auto-fold rejected"
            );
        }
    }

    // --- pause / resume / reset / kick ---

    fn pause(&mut self) -> Result<(), TournamentError> {
        if self.status != TournamentStatus::Running {
            return Err(TournamentError::NotRunning {
                status: self.status,
            });
        }
        self.status = TournamentStatus::Paused;
        self.disarm_all_timers();
        info!(target: LOG_TARGET, "tournament paused");
        Ok(())
    }

    fn resume(&mut self) -> Result<(), TournamentError> {
        if self.status != TournamentStatus::Paused {
            return Err(TournamentError::NotPaused {
                status: self.status,
            });
        }
        self.status = TournamentStatus::Running;
        let table_ids: Vec<TableId> = self.tables.keys().copied().collect();
        for table_id in table_ids {
            let idle = self
                .tables
                .get(&table_id)
                .map(|t| t.hand_complete())
                .unwrap_or(false);
            if idle {
                // The pending wakeup was dropped while paused.
                self.schedule_next_hand(table_id);
            } else {
                self.arm_timeout(table_id);
            }
        }
        info!(target: LOG_TARGET, "tournament resumed");
        Ok(())
    }

    fn reset(&mut self) {
        self.epoch += 1;
        self.disarm_all_timers();
        self.status = TournamentStatus::Registration;
        self.tables.clear();
        self.seat_map.clear();
        self.eliminations.clear();
        self.hands_played = 0;
        self.started_at = None;
        self.blind_level = 1;
        self.small_blind = self.config.small_blind;
        self.big_blind = self.config.big_blind;
        info!(target: LOG_TARGET, "tournament reset, roster retained");
    }

    fn kick(&mut self, player_id: PlayerId, reason: String) -> Result<(), TournamentError> {
        let Some(record) = self.registered.get(&player_id) else {
            return Err(TournamentError::UnknownPlayer);
        };
        let username = record.username.clone();
        self.sink.send_to_player(
            &player_id,
            &ServerMessage::Kicked {
                reason: reason.clone(),
            },
        );

        let table_id = self.seat_map.remove(&player_id);
        let position = self.registered.len() - self.eliminations.len();
        self.eliminations.push(EliminationRecord {
            player_id,
            username: username.clone(),
            position,
            table_id,
            eliminated_at: Utc::now(),
            reason: Some("kicked".to_string()),
        });
        warn!(
            target: LOG_TARGET,
            player = %player_id,
            %username,
            %reason,
            "player kicked"
        );

        if let Some(table_id) = table_id {
            let outcome = match self.tables.get_mut(&table_id) {
                Some(engine) => engine.kick_player(&player_id),
                None => Ok(()),
            };
            match outcome {
                Ok(()) => self.after_table_mutation(table_id),
                Err(err) => self.abort_table(table_id, err.into()),
            }
        }
        Ok(())
    }

    fn announce(&self, message: &str) {
        let envelope = ServerMessage::Announcement {
            message: message.to_string(),
        };
        for player_id in self.registered.keys() {
            self.sink.send_to_player(player_id, &envelope);
        }
        self.sink.broadcast_to_viewers(&envelope);
        self.sink.broadcast_to_admins(&envelope);
    }

    // --- tournament end ---

    fn end_tournament(&mut self, fallback_winner: Option<Standing>) {
        self.epoch += 1;
        self.disarm_all_timers();
        self.status = TournamentStatus::Finished;

        let mut winner = fallback_winner;
        if winner.is_none() {
            'tables: for engine in self.tables.values() {
                for pid in &engine.state().player_order {
                    if let Some(p) = engine.state().players.get(pid) {
                        if p.chips > 0 {
                            winner = Some(Standing {
                                position: 1,
                                player_id: p.player_id,
                                username: p.username.clone(),
                                chips: p.chips,
                            });
                            break 'tables;
                        }
                    }
                }
            }
        }

        let mut standings = Vec::with_capacity(self.eliminations.len() + 1);
        if let Some(w) = &winner {
            standings.push(w.clone());
        }
        for (i, elimination) in self.eliminations.iter().rev().enumerate() {
            standings.push(Standing {
                position: i + 2,
                player_id: elimination.player_id,
                username: elimination.username.clone(),
                chips: 0,
            });
        }

        let duration_seconds = self
            .started_at
            .map(|t| (Utc::now() - t).num_seconds())
            .unwrap_or(0);
        let message = ServerMessage::TournamentComplete {
            winner: winner.clone(),
            standings,
            total_hands: self.hands_played,
            duration_seconds,
        };
        self.sink.broadcast_to_viewers(&message);
        self.sink.broadcast_to_admins(&message);
        for player_id in self.registered.keys() {
            self.sink.send_to_player(player_id, &message);
        }

        info!(
            target: LOG_TARGET,
            winner = winner.as_ref().map(|w| w.username.as_str()).unwrap_or("none"),
            hands = self.hands_played,
            "tournament complete"
        );
    }

    // --- broadcast & fatal handling ---

    fn broadcast_table_state(&self, table_id: TableId) {
        let Some(engine) = self.tables.get(&table_id) else {
            return;
        };
        for player_id in &engine.state().player_order {
            let view = engine.player_view(player_id);
            self.sink
                .send_to_player(player_id, &ServerMessage::GameState(Box::new(view)));
        }
        let public = ServerMessage::GameState(Box::new(engine.public_view()));
        self.sink.broadcast_to_viewers(&public);
        self.sink.broadcast_to_admins(&public);
    }

    fn abort_table(&mut self, table_id: TableId, err: anyhow::Error) {
        error!(
            target: LOG_TARGET,
            table = %table_id,
            error = %err,
            "invariant violation, aborting table"
        );
        self.disarm_timeout(table_id);
        if let Some(engine) = self.tables.remove(&table_id) {
            for pid in engine.state().players.keys() {
                self.seat_map.remove(pid);
            }
        }
        self.sink.broadcast_to_admins(&ServerMessage::Error {
            message: format!("{table_id} aborted: {err}"),
        });
    }

    // --- queries ---

    fn remaining_player_count(&self) -> usize {
        self.tables
            .values()
            .flat_map(|t| t.state().players.values())
            .filter(|p| p.chips > 0)
            .count()
    }

    fn status_report(&self) -> TournamentStatusReport {
        let remaining = if self.status == TournamentStatus::Registration {
            self.registered.len()
        } else {
            self.remaining_player_count()
        };
        let recent_start = self.eliminations.len().saturating_sub(10);
        TournamentStatusReport {
            tournament_id: self.tournament_id,
            status: self.status,
            registered_players: self.registered.len(),
            remaining_players: remaining,
            active_tables: self.tables.len(),
            hands_played: self.hands_played,
            current_blinds: BlindLevel {
                small: self.small_blind,
                big: self.big_blind,
                level: self.blind_level,
            },
            started_at: self.started_at,
            recent_eliminations: self.eliminations[recent_start..].to_vec(),
        }
    }

    fn player_summaries(&self) -> Vec<PlayerSummary> {
        let mut summaries: Vec<PlayerSummary> = self
            .registered
            .iter()
            .map(|(player_id, record)| {
                let seat = self
                    .seat_map
                    .get(player_id)
                    .and_then(|tid| self.tables.get(tid).map(|t| (*tid, t)));
                let player = seat.and_then(|(_, t)| t.state().players.get(player_id));
                PlayerSummary {
                    player_id: *player_id,
                    username: record.username.clone(),
                    team_name: record.team_name.clone(),
                    registered_at: record.registered_at,
                    chips: player.map(|p| p.chips),
                    table_id: seat.map(|(tid, _)| tid),
                    status: player.map(|p| p.status),
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.username.cmp(&b.username));
        summaries
    }

    fn table_views(&self) -> Vec<TableView> {
        let mut ids: Vec<TableId> = self.tables.keys().copied().collect();
        ids.sort_unstable();
        ids.iter()
            .filter_map(|tid| self.tables.get(tid))
            .map(|t| t.public_view())
            .collect()
    }

    fn player_state(&self, player_id: &PlayerId) -> StateResponse {
        let engine = self
            .seat_map
            .get(player_id)
            .and_then(|tid| self.tables.get(tid));
        match engine {
            Some(engine) => StateResponse::Active {
                game_state: Box::new(engine.player_view(player_id)),
                valid_actions: engine.valid_actions(player_id),
            },
            None => StateResponse::Waiting {
                message: "not currently seated at a table".to_string(),
                tournament_status: self.status,
            },
        }
    }

    fn player_valid_actions(&self, player_id: &PlayerId) -> ValidActionsResponse {
        let engine = self
            .seat_map
            .get(player_id)
            .and_then(|tid| self.tables.get(tid));
        match engine {
            Some(engine) => ValidActionsResponse {
                is_your_turn: engine.current_player() == Some(*player_id),
                valid_actions: engine.valid_actions(player_id),
            },
            None => ValidActionsResponse {
                is_your_turn: false,
                valid_actions: Vec::new(),
            },
        }
    }
}

fn reject(message: String) -> ActionResponse {
    ActionResponse {
        success: false,
        message,
        action: None,
        game_state: None,
        valid_actions: None,
    }
}
