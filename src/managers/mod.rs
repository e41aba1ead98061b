pub mod notifier;
pub mod publisher;
pub mod role_manager;
pub mod sync_manager;

pub use notifier::{DiscordNotifier, Notifier, SharedNotifier};
pub use publisher::AttendancePublisher;
pub use role_manager::{
    create_shared_role_manager, RoleBinding, RoleManager, SharedRoleManager, REACTION_EMOJI,
};
pub use sync_manager::{SharedSyncManager, SyncManager, SyncRequest};
