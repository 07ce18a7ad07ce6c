//! Realtime transcription relay.
//!
//! Accepts browser WebSocket connections on `/realtime` and pairs each one with
//! an outbound WebSocket to the AssemblyAI realtime endpoint, forwarding frames
//! in both directions until either side terminates.

pub mod config;
pub mod logging;
pub mod relay;
pub mod server;

pub use config::{CliArgs, ConfigError, RelayConfig};
pub use relay::{ConnectionPair, Frame, PairOutcome, RelayError, Termination};
pub use server::AppState;
