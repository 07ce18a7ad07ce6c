//! Connection pair relay between browser clients and the upstream
//! transcription service.
//!
//! - [`handler`]: `/realtime` upgrade endpoint, one pair per connection
//! - [`pair`]: the relay loop
//! - [`upstream`]: outbound connection establishment
//! - [`frame`]: transport-neutral frames

pub mod error;
pub mod frame;
pub mod handler;
pub mod pair;
pub mod upstream;

pub use error::{RelayError, RelayResult};
pub use frame::{CloseReason, Frame};
pub use handler::{client_socket, realtime_handler, RELAY_PATH};
pub use pair::{ConnectionPair, HandleState, PairOutcome, PairStats, Termination};
pub use upstream::{AssemblyAiConnector, BoxFrameSocket, FrameSocket, UpstreamConnector};
