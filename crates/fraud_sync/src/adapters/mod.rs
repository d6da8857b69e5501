// Rust guideline compliant 2026-10-16

//! Adapters (secondary ports) for the `fraud_sync` binary.
//!
//! Each sub-module implements one or more hexagonal port traits defined in the
//! `domain` crate, or the `dispatcher::Listener` trait. Network concerns stay
//! here; the component crates never see a URL or a socket.

pub mod cache_listener;
pub mod http_backend;
pub mod system_clock;
pub mod ws_transport;
