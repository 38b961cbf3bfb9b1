//! livepoll server library
//!
//! One live poll session shared by a presenter and many participants over
//! WebSocket: poll lifecycle, vote tallying, participant registry, history
//! and event fan-out, plus the HTTP/WebSocket server in front of them.

pub mod cli;
pub mod config;
pub mod logging;
pub mod polls;
pub mod server;
pub mod session;
