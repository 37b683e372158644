//! Per-symbol alert cooldowns

use crate::config::CooldownConfig;
use crate::symbol::AlertKind;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

type CooldownKey = (String, AlertKind);

/// Suppresses repeat alerts of the same kind for the same symbol within a window
pub struct AlertCooldownTracker {
    windows: CooldownConfig,
    last_sent: RwLock<HashMap<CooldownKey, DateTime<Utc>>>,
}

impl AlertCooldownTracker {
    /// Create a tracker with per-kind windows
    pub fn new(windows: CooldownConfig) -> Self {
        Self {
            windows,
            last_sent: RwLock::new(HashMap::new()),
        }
    }

    /// Cooldown window for an alert kind
    pub fn window(&self, kind: AlertKind) -> Duration {
        self.windows.window(kind)
    }

    /// True when nothing was sent for (symbol, kind) or the window has fully elapsed
    pub async fn should_send(&self, symbol: &str, kind: AlertKind, now: DateTime<Utc>) -> bool {
        let last_sent = self.last_sent.read().await;
        match last_sent.get(&(symbol.to_string(), kind)) {
            None => true,
            // A clock that went backwards reads as no time elapsed
            Some(last) => match (now - *last).to_std() {
                Ok(elapsed) => elapsed > self.window(kind),
                Err(_) => false,
            },
        }
    }

    /// Record a dispatched alert. Call once per alert actually handed to dispatch.
    pub async fn record_sent(&self, symbol: &str, kind: AlertKind, now: DateTime<Utc>) {
        let mut last_sent = self.last_sent.write().await;
        last_sent.insert((symbol.to_string(), kind), now);
    }

    /// Time of the last recorded alert
    pub async fn last_sent(&self, symbol: &str, kind: AlertKind) -> Option<DateTime<Utc>> {
        let last_sent = self.last_sent.read().await;
        last_sent.get(&(symbol.to_string(), kind)).copied()
    }

    /// Drop entries whose window has elapsed; they no longer suppress anything
    pub async fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        let mut last_sent = self.last_sent.write().await;
        let before = last_sent.len();
        last_sent.retain(|(_, kind), last| match (now - *last).to_std() {
            Ok(elapsed) => elapsed <= self.windows.window(*kind),
            Err(_) => true,
        });
        before - last_sent.len()
    }

    /// Number of tracked (symbol, kind) pairs
    pub async fn len(&self) -> usize {
        self.last_sent.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.last_sent.read().await.is_empty()
    }
}
