//! WebSocket Game Server
//!
//! Async WebSocket server for the shared snake game.
//! Every connection feeds inputs into one controller and receives
//! snapshots through its own outbound queue.

use futures_util::{SinkExt, StreamExt};
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, RwLock, Semaphore};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::core::rng::derive_seed;
use crate::game::food::FoodPolicy;
use crate::game::state::{GameConfig, GameConfigError};
use crate::game::step::Simulation;
use crate::network::broadcast::{ClientHub, ClientId};
use crate::network::protocol::{ErrorClass, InputMessage, ProtocolError, StateSnapshot};
use crate::network::sync::{SyncConfig, SyncController, SyncMode};
use crate::DEFAULT_PORT;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Capacity of each client's outbound queue.
    pub outbound_queue: usize,
    /// Playfield and snake setup.
    pub game: GameConfig,
    /// Catch-up policy and stepping mode.
    pub sync: SyncConfig,
    /// Fixed RNG seed; derived from the clock when unset.
    pub seed: Option<u64>,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_connections: 1000,
            outbound_queue: 64,
            game: GameConfig::default(),
            sync: SyncConfig::default(),
            seed: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Invalid startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        /// Variable name
        name: &'static str,
        /// Raw value
        value: String,
        /// Parse failure
        reason: String,
    },

    /// The resulting game setup is unusable.
    #[error("invalid game config: {0}")]
    Game(#[from] GameConfigError),
}

impl ServerConfig {
    /// Build from process environment variables.
    ///
    /// | Variable                | Meaning                                  |
    /// |-------------------------|------------------------------------------|
    /// | `PORT`                  | listen port on 0.0.0.0 (default 3000)    |
    /// | `SNAKE_MAX_CATCH_UP`    | steps allowed per message (default 600)  |
    /// | `SNAKE_SEED`            | fixed RNG seed                           |
    /// | `SNAKE_TICK_MS`         | enables server-clock mode at this period |
    /// | `SNAKE_FOOD_POLICY`     | `avoid` or `uniform`                     |
    /// | `SNAKE_MAX_CONNECTIONS` | connection limit                         |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = parse_var::<u16, _>(&lookup, "PORT")? {
            config.bind_addr.set_port(port);
        }
        if let Some(max) = parse_var::<u32, _>(&lookup, "SNAKE_MAX_CATCH_UP")? {
            config.sync.max_catch_up_steps = max;
        }
        config.seed = parse_var::<u64, _>(&lookup, "SNAKE_SEED")?;
        if let Some(ms) = parse_var::<u64, _>(&lookup, "SNAKE_TICK_MS")? {
            if ms == 0 {
                return Err(ConfigError::InvalidValue {
                    name: "SNAKE_TICK_MS",
                    value: ms.to_string(),
                    reason: "tick period must be positive".to_string(),
                });
            }
            config.sync.mode = SyncMode::ServerClock {
                interval: Duration::from_millis(ms),
            };
        }
        if let Some(policy) = parse_var::<FoodPolicy, _>(&lookup, "SNAKE_FOOD_POLICY")? {
            config.game.food_policy = policy;
        }
        if let Some(max) = parse_var::<usize, _>(&lookup, "SNAKE_MAX_CONNECTIONS")? {
            config.max_connections = max;
        }

        config.game.validate()?;
        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                name,
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// The controller and the client registry, locked together so each
/// event's steps and broadcasts finish before the next event starts.
#[derive(Debug)]
pub struct SharedGame {
    /// Authoritative game
    pub controller: SyncController,
    /// Live client channels
    pub hub: ClientHub,
}

type Shared = Arc<RwLock<SharedGame>>;

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Game and clients.
    game: Shared,
    /// One permit per live connection.
    connection_slots: Arc<Semaphore>,
    /// Shutdown flag. Stays set, so tasks started later still see it.
    shutdown_tx: watch::Sender<bool>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        let seed = config.seed.unwrap_or_else(clock_seed);
        let sim = Simulation::new(config.game, seed);
        info!(
            "Game seeded with {:#018x}, initial state {}",
            seed,
            hex::encode(&sim.state().compute_hash()[..8])
        );

        let game = SharedGame {
            controller: SyncController::new(sim, config.sync),
            hub: ClientHub::new(),
        };

        Self {
            connection_slots: Arc::new(Semaphore::new(
                config.max_connections.min(Semaphore::MAX_PERMITS),
            )),
            config,
            game: Arc::new(RwLock::new(game)),
            shutdown_tx,
        }
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener, GameServerError> {
        Ok(TcpListener::bind(&self.config.bind_addr).await?)
    }

    /// Bind and run until shutdown.
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = self.bind().await?;
        self.run_with_listener(listener).await
    }

    /// Run on an already bound listener until shutdown.
    #[instrument(skip(self, listener))]
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!(
            "Game server v{} listening on {}",
            self.config.version,
            listener.local_addr()?
        );

        let clock_handle = match self.config.sync.mode {
            SyncMode::ServerClock { interval } => {
                info!("Server clock enabled, stepping every {:?}", interval);
                let game = self.game.clone();
                let shutdown_rx = self.shutdown_tx.subscribe();
                Some(tokio::spawn(async move {
                    Self::run_clock_loop(game, interval, shutdown_rx).await;
                }))
            }
            SyncMode::ClientFrames => {
                info!(
                    "Client-frame sync, catch-up limit {} steps",
                    self.config.sync.max_catch_up_steps
                );
                None
            }
        };

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            // Taken at accept time so handshakes in flight count too.
                            let slots = self.connection_slots.clone();
                            let Ok(permit) = slots.try_acquire_owned() else {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            };

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr, permit);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = async { shutdown_rx.wait_for(|stop| *stop).await.map(|_| ()) } => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        if let Some(handle) = clock_handle {
            handle.abort();
        }

        Ok(())
    }

    /// Spawn the task that owns one WebSocket connection.
    ///
    /// The connection slot is released when the task ends.
    fn handle_connection(
        &self,
        stream: TcpStream,
        addr: SocketAddr,
        permit: OwnedSemaphorePermit,
    ) {
        let game = self.game.clone();
        let queue = self.config.outbound_queue;
        let turn_only = matches!(self.config.sync.mode, SyncMode::ServerClock { .. });
        let shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let _permit = permit;
            let served = Self::serve_client(stream, addr, game, queue, turn_only, shutdown_rx);
            if let Err(e) = served.await {
                warn!("Connection {} ended with error: {}", addr, e);
            }
        });
    }

    async fn serve_client(
        stream: TcpStream,
        addr: SocketAddr,
        game: Shared,
        queue: usize,
        turn_only: bool,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<(), GameServerError> {
        let ws_stream = accept_async(stream).await?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (msg_tx, mut msg_rx) = mpsc::channel::<StateSnapshot>(queue);
        let client = ClientId::random();

        // Register, then reset the shared game; the reset broadcast is
        // also this client's initial snapshot.
        {
            let mut guard = game.write().await;
            let shared = &mut *guard;
            shared.hub.register(client, msg_tx);
            shared.controller.connect(client, &shared.hub);
        }
        debug!("Client {} is {}", addr, client);

        // Spawn message sender task
        let mut sender_shutdown = shutdown_rx.clone();
        let sender_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = msg_rx.recv() => {
                        let Some(snapshot) = msg else { break };
                        let text = match snapshot.to_json() {
                            Ok(t) => t,
                            Err(e) => {
                                error!("Failed to serialize snapshot: {}", e);
                                continue;
                            }
                        };
                        if ws_sender.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    _ = async { sender_shutdown.wait_for(|stop| *stop).await.map(|_| ()) } => {
                        let _ = ws_sender.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        });

        let mut shutting_down = false;
        let mut outcome = Ok(());

        loop {
            tokio::select! {
                msg = ws_receiver.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_text(client, &text, turn_only, &game).await;
                        }
                        Some(Ok(Message::Binary(_))) => {
                            debug!("Dropped frame from {}: {}", client, ProtocolError::BinaryFrame);
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            debug!("Client {} disconnected", client);
                            break;
                        }
                        Some(Err(e)) => {
                            outcome = Err(e.into());
                            break;
                        }
                        _ => {}
                    }
                }
                _ = async { shutdown_rx.wait_for(|stop| *stop).await.map(|_| ()) } => {
                    shutting_down = true;
                    break;
                }
            }
        }

        {
            let mut guard = game.write().await;
            guard.hub.unregister(&client);
            guard.controller.disconnect(client);
        }

        if shutting_down {
            let _ = sender_task.await;
        } else {
            sender_task.abort();
        }

        info!("Client {} cleaned up", client);
        outcome
    }

    /// Decode one text frame and apply it.
    ///
    /// With `turn_only` the frame counter and timestamp may be omitted.
    async fn handle_text(client: ClientId, text: &str, turn_only: bool, game: &Shared) {
        let decoded = if turn_only {
            InputMessage::from_json_turn(text)
        } else {
            InputMessage::from_json(text)
        };
        let msg = match decoded {
            Ok(m) => m,
            Err(e) => {
                match e.class() {
                    ErrorClass::Decode => debug!("Dropped frame from {}: {}", client, e),
                    ErrorClass::Violation => warn!("Protocol violation from {}: {}", client, e),
                }
                return;
            }
        };

        let mut guard = game.write().await;
        let shared = &mut *guard;
        match shared.controller.handle_input(client, &msg, &shared.hub) {
            Ok(report) => {
                if report.resets > 0 || report.foods > 0 {
                    debug!(
                        "Frame {} from {}: {} steps, {} resets, {} food",
                        msg.frame, client, report.steps_run, report.resets, report.foods
                    );
                }
            }
            Err(e) => warn!("Input from {} rejected: {}", client, e),
        }
    }

    /// Fixed-interval stepping for server-clock mode.
    async fn run_clock_loop(
        game: Shared,
        period: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let mut guard = game.write().await;
                    let shared = &mut *guard;
                    shared.controller.advance_clock(&shared.hub);
                }
                _ = async { shutdown_rx.wait_for(|stop| *stop).await.map(|_| ()) } => break,
            }
        }
    }

    /// Shutdown the server.
    ///
    /// Takes effect even if `run` has not started yet.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Get connection count.
    pub async fn connection_count(&self) -> usize {
        self.game.read().await.hub.len()
    }

    /// Current state as clients would see it after a reset.
    pub async fn snapshot(&self) -> StateSnapshot {
        self.game.read().await.controller.snapshot(true)
    }
}

fn clock_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    derive_seed(&nanos.to_le_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::sync::DEFAULT_MAX_CATCH_UP_STEPS;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 3000);
        assert!(config.bind_addr.ip().is_unspecified());
        assert_eq!(config.sync.max_catch_up_steps, DEFAULT_MAX_CATCH_UP_STEPS);
        assert_eq!(config.sync.mode, SyncMode::ClientFrames);
    }

    #[test]
    fn test_config_from_vars() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PORT", "8081"),
            ("SNAKE_MAX_CATCH_UP", "120"),
            ("SNAKE_SEED", "77"),
            ("SNAKE_TICK_MS", "100"),
            ("SNAKE_FOOD_POLICY", "uniform"),
            ("SNAKE_MAX_CONNECTIONS", "8"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 8081);
        assert_eq!(config.sync.max_catch_up_steps, 120);
        assert_eq!(config.seed, Some(77));
        assert_eq!(config.sync.mode, SyncMode::classic_clock());
        assert_eq!(config.game.food_policy, FoodPolicy::Uniform);
        assert_eq!(config.max_connections, 8);
    }

    #[test]
    fn test_config_empty_env_is_default() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr, ServerConfig::default().bind_addr);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        for (name, value) in [
            ("PORT", "http"),
            ("PORT", "70000"),
            ("SNAKE_MAX_CATCH_UP", "-1"),
            ("SNAKE_TICK_MS", "0"),
            ("SNAKE_FOOD_POLICY", "spiral"),
        ] {
            let err = ServerConfig::from_lookup(lookup(&[(name, value)])).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue { name: n, .. } if n == name),
                "{name}={value}"
            );
        }
    }

    #[tokio::test]
    async fn test_server_creation() {
        let config = ServerConfig {
            seed: Some(5),
            ..ServerConfig::default()
        };
        let server = GameServer::new(config);

        assert_eq!(server.connection_count().await, 0);
        let snapshot = server.snapshot().await;
        assert_eq!(snapshot.snake.map(|s| s.len()), Some(5));
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let server = GameServer::new(ServerConfig::default());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let run = server.run_with_listener(listener);
        tokio::pin!(run);
        tokio::select! {
            _ = &mut run => panic!("server exited without a shutdown signal"),
            _ = tokio::time::sleep(Duration::from_millis(20)) => {}
        }
        server.shutdown();
        run.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_before_run_is_kept() {
        let server = GameServer::new(ServerConfig {
            sync: SyncConfig {
                mode: SyncMode::classic_clock(),
                ..SyncConfig::default()
            },
            ..ServerConfig::default()
        });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        server.shutdown();

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            server.run_with_listener(listener),
        )
        .await
        .expect("run ignored a shutdown requested before it started");
        assert!(result.is_ok());
    }
}
