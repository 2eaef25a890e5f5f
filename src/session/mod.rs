//! Player sessions: the command protocol, per-session state machine and the
//! engine that owns every shared table

pub mod engine;
pub mod handlers;
pub(crate) mod outcomes;
pub mod protocol;
pub mod registry;
#[allow(clippy::module_inception)]
pub mod session;

pub use engine::Engine;
pub use protocol::{GameCommand, GameResponse, ResponseKind};
pub use registry::{SessionHandle, SessionRegistry};
pub use session::{GameRng, PendingInteraction, Session, UiState};
