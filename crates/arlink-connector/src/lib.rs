//! Polling-style consumer over the telemetry server, shaped after the
//! `start()` / `get_latest_data()` API of motion-capture connector
//! libraries. The connector hosts the WebSocket server itself and caches
//! the most recent telemetry for synchronous reads.

use std::sync::Arc;

use arlink_core::TelemetryMessage;
use arlink_server::{start, ServerConfig, ServerHandle};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;

/// Connector configuration.
pub struct ConnectorConfig {
    /// Port for the embedded server. 0 picks a random free port.
    pub port: u16,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self { port: 9999 }
    }
}

/// Snapshot of the most recent telemetry.
///
/// `button` is a press latch: it reads true once after a button press and
/// clears on read, since the wire carries press events rather than a held
/// state.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LatestData {
    pub position: [f64; 3],
    /// Roll, pitch, yaw in degrees.
    pub rotation: [f64; 3],
    pub scale: f64,
    pub button: bool,
    pub toggle: bool,
}

#[derive(Default)]
struct Cache {
    data: LatestData,
}

impl Cache {
    fn apply(&mut self, message: &TelemetryMessage) {
        match message {
            TelemetryMessage::Pose(pose) | TelemetryMessage::LegacyPose(pose) => {
                self.data.position = [pose.x, pose.y, pose.z];
                self.data.rotation = [pose.roll, pose.pitch, pose.yaw];
                self.data.scale = pose.scale;
                self.data.toggle = pose.toggle_active;
            }
            TelemetryMessage::Toggle { active } => self.data.toggle = *active,
            TelemetryMessage::Button => self.data.button = true,
            TelemetryMessage::Reset => {
                self.data.position = [0.0; 3];
                self.data.rotation = [0.0; 3];
            }
            TelemetryMessage::Unknown { .. } => {}
        }
    }

    fn take_snapshot(&mut self) -> LatestData {
        let snapshot = self.data.clone();
        self.data.button = false;
        snapshot
    }
}

/// Receives AR telemetry and exposes the latest values for polling.
pub struct MocapConnector {
    config: ConnectorConfig,
    cache: Arc<Mutex<Cache>>,
    handle: Option<ServerHandle>,
    consumer: Option<tokio::task::JoinHandle<()>>,
}

impl MocapConnector {
    pub fn new(config: ConnectorConfig) -> Self {
        Self {
            config,
            cache: Arc::new(Mutex::new(Cache::default())),
            handle: None,
            consumer: None,
        }
    }

    /// Boot the embedded server and begin caching telemetry.
    pub async fn start(&mut self) -> Result<(), std::io::Error> {
        let handle = start(ServerConfig {
            port: self.config.port,
            ..Default::default()
        })
        .await?;

        let rx = handle.subscribe();
        self.consumer = Some(spawn_consumer(Arc::clone(&self.cache), rx));
        tracing::info!(port = handle.port, "Connector ready, waiting for device");
        self.handle = Some(handle);
        Ok(())
    }

    /// Port the embedded server is listening on. Meaningful after `start`.
    pub fn port(&self) -> Option<u16> {
        self.handle.as_ref().map(|h| h.port)
    }

    /// Latest cached telemetry. Clears the button press latch.
    pub fn get_latest_data(&self) -> LatestData {
        self.cache.lock().take_snapshot()
    }

    /// Stop the embedded server and the cache task.
    pub fn stop(&mut self) {
        if let Some(consumer) = self.consumer.take() {
            consumer.abort();
        }
        if let Some(handle) = self.handle.take() {
            handle.shutdown();
        }
    }
}

impl Drop for MocapConnector {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_consumer(
    cache: Arc<Mutex<Cache>>,
    mut rx: broadcast::Receiver<TelemetryMessage>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(message) => cache.lock().apply(&message),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Connector lagged, dropped telemetry");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
