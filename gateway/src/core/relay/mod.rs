//! Per-call relay between the telephony media stream and the voice agent.
//!
//! A [`RelaySession`] owns both connections of one call and runs two
//! forwarding loops over them. The [`SessionRegistry`] tracks live sessions
//! and supervises their tasks.

pub mod forward;
mod registry;
mod session;
pub mod state;
pub mod transport;

pub use forward::{Direction, LoopExit};
pub use registry::{SessionRegistry, SessionSummary};
pub use session::{DEFAULT_GRACE_PERIOD, RelaySession, RelaySettings};
pub use state::{LinkStatus, SessionPhase, StreamStateView, UNKNOWN_STREAM_SID};
pub use transport::{CloseReason, Connection, Frame, SharedSink, Side};
