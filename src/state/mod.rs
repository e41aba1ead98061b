pub mod event_store;
pub mod session_registry;
pub mod voice_presence;

pub use event_store::{EventStore, SharedEventStore};
pub use session_registry::{create_shared_session_registry, SessionRegistry, SharedSessionRegistry};
pub use voice_presence::{OpenStay, SharedVoicePresence, VoicePresence};
