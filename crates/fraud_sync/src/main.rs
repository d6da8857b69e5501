// Rust guideline compliant 2026-10-16

//! Fraud-case dashboard sync entry point.
//!
//! Wires the sync core to its network adapters and runs, on one thread:
//! the push channel (Connection Manager -> Event Dispatcher -> cache), the
//! periodic snapshot poller, and the operator console.
//!
//! # Usage
//!
//! ```text
//! RUST_LOG=info FRAUD_SYNC_API_URL=http://localhost:8000 cargo run -p fraud_sync
//! ```
//!
//! Logs go to stderr so they do not interleave with console output. Stop
//! with `quit` or CTRL+C.

mod adapters;
mod console;
mod settings;

use adapters::cache_listener::CacheListener;
use adapters::http_backend::HttpBackend;
use adapters::system_clock::SystemClock;
use adapters::ws_transport::WsTransport;
use anyhow::Context as _;
use connection::{ConnectionConfig, ConnectionManager};
use dispatcher::EventDispatcher;
use domain::EventKind;
use lifecycle::LifecycleController;
use poller::{PollerConfig, SnapshotPoller};
use reconciler::Reconciler;
use settings::Settings;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Grace period for the blocking stdin reader at shutdown.
const STDIN_RELEASE: Duration = Duration::from_millis(200);

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    let result = runtime.block_on(run());
    // A pending stdin read never completes on its own; do not wait for it.
    runtime.shutdown_timeout(STDIN_RELEASE);
    result
}

async fn run() -> anyhow::Result<()> {
    let settings = Settings::from_env().context("invalid settings")?;
    tracing::info!(api = %settings.api_url, ws = %settings.ws_url, "main.starting");

    // -- Cache and push routing --
    let reconciler = Rc::new(Reconciler::new(SystemClock));
    let poller = SnapshotPoller::new(
        PollerConfig::builder().build().context("failed to build poller config")?,
    );
    // Detection broadcasts carry no full record; the listener pulls a snapshot.
    let listener = Rc::new(CacheListener::new(Rc::clone(&reconciler), poller.refresh_handle()));
    let dispatcher = EventDispatcher::new();
    dispatcher.subscribe(EventKind::NewCaseDetected, &listener);
    dispatcher.subscribe(EventKind::CaseStatusChanged, &listener);

    // -- Network adapters --
    let backend = HttpBackend::new(&settings.api_url, settings.snapshot_limit)
        .context("failed to build HTTP client")?;
    let transport = WsTransport::new(settings.ws_url.clone());
    let controller = LifecycleController::new(backend.clone());

    // -- Background components --
    let connection = ConnectionManager::new(
        ConnectionConfig::builder().build().context("failed to build connection config")?,
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    let shutdown = || {
        connection.close();
        poller.stop();
        stop_tx.send_replace(true);
    };

    let push = async {
        let result = connection
            .open(&transport, |frame| {
                let _ = dispatcher.dispatch(frame);
            })
            .await;
        if let Err(e) = result {
            // The poller keeps the cache fresh without the push channel.
            tracing::error!(error = %e, "main.push.stopped");
        }
    };

    let operator = async {
        let result = console::run(&reconciler, &controller, &connection, stop_rx.clone()).await;
        shutdown();
        result.context("console failed")
    };

    let signal = async {
        let mut stop = stop_rx.clone();
        tokio::select! {
            biased;
            _ = stop.wait_for(|stopped| *stopped) => {}
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    tracing::info!("main.shutdown: ctrl_c received");
                    shutdown();
                }
                Err(e) => {
                    tracing::warn!(error = %e, "main.signal.unavailable");
                    let mut stop = stop_rx.clone();
                    let _ = stop.wait_for(|stopped| *stopped).await;
                }
            },
        }
    };

    let ((), (), console_result, ()) =
        tokio::join!(push, poller.run(&backend, &reconciler), operator, signal);
    console_result?;

    let stats = reconciler.stats();
    tracing::info!(
        cases = stats.total_cases,
        poll_failures = poller.failures(),
        reconnects = connection.reconnect_attempts(),
        "main.stopped"
    );
    Ok(())
}
