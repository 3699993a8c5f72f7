pub mod audio;
pub mod config;
pub mod effects;
pub mod error;
pub mod hint;
pub mod host;
pub mod interact;
pub mod npc;
pub mod order;
pub mod runtime;
pub mod session;
pub mod sim;
pub mod slots;
pub mod timer;

pub use config::SessionConfig;
pub use error::{ConfigError, InteractionError, MissingReference};
pub use interact::ObjectKind;
pub use npc::NpcPhase;
pub use order::{OrderState, ThreatSignal};
pub use session::Session;
pub use sim::{simulated_session, SimulatedHost};
pub use timer::{TimerHandle, TimerService};
