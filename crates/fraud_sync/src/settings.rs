// Rust guideline compliant 2026-10-16

//! Process settings read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `FRAUD_SYNC_API_URL` | `http://localhost:8000` |
//! | `FRAUD_SYNC_WS_URL` | API URL with a `ws`/`wss` scheme and a `/ws` path |
//! | `FRAUD_SYNC_SNAPSHOT_LIMIT` | `500` (the backend maximum) |

use anyhow::{Context as _, bail};

const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Largest page the backend serves on the snapshot endpoint.
pub const MAX_SNAPSHOT_LIMIT: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub ws_url: String,
    pub snapshot_limit: usize,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Errors
    ///
    /// Fails when `FRAUD_SYNC_SNAPSHOT_LIMIT` is not a number in `[1, 500]`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let api_url = lookup("FRAUD_SYNC_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let ws_url = lookup("FRAUD_SYNC_WS_URL").unwrap_or_else(|| derive_ws_url(&api_url));

        let snapshot_limit = match lookup("FRAUD_SYNC_SNAPSHOT_LIMIT") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("FRAUD_SYNC_SNAPSHOT_LIMIT={raw} is not a number"))?,
            None => MAX_SNAPSHOT_LIMIT,
        };
        if !(1..=MAX_SNAPSHOT_LIMIT).contains(&snapshot_limit) {
            bail!("FRAUD_SYNC_SNAPSHOT_LIMIT must be in [1, {MAX_SNAPSHOT_LIMIT}], got {snapshot_limit}");
        }

        Ok(Self { api_url, ws_url, snapshot_limit })
    }
}

/// `http://host:port` -> `ws://host:port/ws`; `https` maps to `wss`.
fn derive_ws_url(api_url: &str) -> String {
    let base = if let Some(rest) = api_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = api_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        api_url.to_owned()
    };
    format!("{base}/ws")
}
