//! Common test utilities for stego-client integration tests

#![allow(dead_code)]

use std::time::Duration;
use stego_client::{Config, Event, MediaAsset, MediaKind, TransferOrchestrator};
use tempfile::TempDir;
use tokio::sync::broadcast;
use wiremock::MockServer;

/// A mock service plus a scratch download directory
pub struct Harness {
    pub server: MockServer,
    pub downloads: TempDir,
}

impl Harness {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            downloads: TempDir::new().expect("create download dir"),
        }
    }

    /// Configuration pointing at the mock service with short budgets
    pub fn config(&self) -> Config {
        let mut config = Config::new(self.server.uri());
        config.download.download_dir = self.downloads.path().to_path_buf();
        config.timeouts.encode = Duration::from_secs(5);
        config.timeouts.decode = Duration::from_secs(5);
        config.timeouts.video_encode = Duration::from_secs(5);
        config.timeouts.video_decode = Duration::from_secs(5);
        config.timeouts.download = Duration::from_secs(5);
        config
    }

    pub fn orchestrator(&self) -> TransferOrchestrator {
        TransferOrchestrator::new(self.config()).expect("valid test config")
    }

    /// Names of the files currently in the download directory, sorted
    pub fn downloaded(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.downloads.path())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

/// A PNG carrier of `size` bytes
pub fn png(size: usize) -> MediaAsset {
    MediaAsset::new(MediaKind::Image, "cover.png", "image/png", vec![b'p'; size])
}

/// Everything already sitting in an event receiver
pub fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
