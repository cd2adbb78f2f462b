//! Live WebSocket feed
//!
//! Frames are folded into the fleet store as they arrive. A lost or failed
//! connection is retried after a fixed delay until shutdown is signalled.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fleet_protocol::{ClientCommand, WsMessage};
use fleet_state::{FleetAction, FleetState, Store};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::ClientError;

/// Folds server frames into a fleet store
pub struct LiveFeed {
    config: ClientConfig,
    fleet: Arc<Store<FleetState>>,
}

/// Handle to a running feed
pub struct LiveFeedHandle {
    commands: mpsc::UnboundedSender<ClientCommand>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl LiveFeedHandle {
    /// Send `start_tracking` for one vehicle or `"all"`
    pub fn start_tracking(&self, vehicle_id: &str) -> bool {
        self.command(ClientCommand::StartTracking {
            vehicle_id: vehicle_id.to_string(),
        })
    }

    pub fn stop_tracking(&self, vehicle_id: &str) -> bool {
        self.command(ClientCommand::StopTracking {
            vehicle_id: vehicle_id.to_string(),
        })
    }

    pub fn request_tracking_update(&self) -> bool {
        self.command(ClientCommand::RequestTrackingUpdate)
    }

    /// Queue a command; false once the feed has stopped
    pub fn command(&self, command: ClientCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Stop reconnecting, close the socket, and wait for the task
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            warn!(error = %err, "Live feed task panicked");
        }
    }
}

/// Apply one text frame to the store. Unparseable frames are logged and dropped.
pub(crate) fn apply_frame(fleet: &Store<FleetState>, text: &str) {
    match WsMessage::from_json(text) {
        Ok(message) => {
            debug!(kind = ?message.kind, vehicle = ?message.vehicle_id, "Frame received");
            fleet.update(|state| state.apply_message(&message, Utc::now()));
        }
        Err(err) => warn!(error = %err, "Failed to parse WebSocket message"),
    }
}

enum Exit {
    Shutdown,
    Disconnected,
}

impl LiveFeed {
    pub fn new(config: ClientConfig, fleet: Arc<Store<FleetState>>) -> Self {
        Self { config, fleet }
    }

    /// Start the feed with `token` on a background task
    pub fn spawn(self, token: String) -> LiveFeedHandle {
        let (commands, rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(token, rx, shutdown_rx));
        LiveFeedHandle {
            commands,
            shutdown,
            task,
        }
    }

    async fn run(
        self,
        token: String,
        mut commands: mpsc::UnboundedReceiver<ClientCommand>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let url = self.config.ws_url(&token);
        loop {
            match self.connect_once(&url, &mut commands, &mut shutdown).await {
                Ok(Exit::Shutdown) => break,
                Ok(Exit::Disconnected) => info!("Live feed disconnected"),
                Err(err) => warn!(error = %err, "Live feed connection failed"),
            }
            self.fleet.dispatch(FleetAction::SetConnectionStatus(false));

            // Fixed delay, no backoff, no retry limit
            let stopped = tokio::select! {
                _ = tokio::time::sleep(self.config.reconnect_delay) => false,
                changed = shutdown.changed() => changed.is_err(),
            };
            if stopped || *shutdown.borrow() {
                break;
            }
            debug!("Reconnecting live feed");
        }
        self.fleet.dispatch(FleetAction::SetConnectionStatus(false));
        debug!("Live feed stopped");
    }

    async fn connect_once(
        &self,
        url: &str,
        commands: &mut mpsc::UnboundedReceiver<ClientCommand>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Exit, ClientError> {
        let (mut socket, _) = connect_async(url).await?;
        info!("Live feed connected");
        self.fleet.dispatch(FleetAction::SetConnectionStatus(true));

        let interval = Duration::from_secs(self.fleet.snapshot().tracking_interval_secs.max(1));
        let mut poll = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);

        loop {
            tokio::select! {
                frame = socket.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => apply_frame(&self.fleet, &text),
                        Some(Ok(Message::Ping(payload))) => socket.send(Message::Pong(payload)).await?,
                        Some(Ok(Message::Close(_))) | None => return Ok(Exit::Disconnected),
                        Some(Ok(_)) => {}
                        Some(Err(err)) => return Err(err.into()),
                    }
                }
                command = commands.recv() => {
                    // Handle dropped
                    let Some(command) = command else {
                        let _ = socket.close(None).await;
                        return Ok(Exit::Shutdown);
                    };
                    socket.send(Message::Text(command.to_json()?)).await?;
                }
                _ = poll.tick() => {
                    socket.send(Message::Text(ClientCommand::RequestTrackingUpdate.to_json()?)).await?;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        let _ = socket.close(None).await;
                        return Ok(Exit::Shutdown);
                    }
                }
            }
        }
    }
}
