use dashmap::DashMap;
use poise::serenity_prelude::{ChannelId, GuildId, Http, MessageId, RoleId, UserId};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{BotError, Result};
use crate::models::ReactionRoleBinding;
use crate::state::SharedEventStore;

/// Emoji that grants a bound role
pub const REACTION_EMOJI: &str = "✅";

/// Most members listed when enrolling students
pub const MEMBER_FETCH_LIMIT: u64 = 1000;

/// Role granted by reacting to a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleBinding {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub role_id: RoleId,
}

/// Role lookup, student enrollment and reaction roles
pub struct RoleManager {
    store: SharedEventStore,
    /// Reaction-role bindings by message
    bindings: DashMap<MessageId, RoleBinding>,
}

impl RoleManager {
    pub fn new(store: SharedEventStore) -> Self {
        Self {
            store,
            bindings: DashMap::new(),
        }
    }

    /// Get role ID by exact name
    pub async fn get_role_id(&self, http: &Http, guild_id: GuildId, role_name: &str) -> Result<RoleId> {
        let roles = guild_id.roles(http).await?;
        roles
            .into_iter()
            .find(|(_, role)| role.name == role_name)
            .map(|(id, _)| id)
            .ok_or_else(|| BotError::RoleNotFound {
                name: role_name.to_string(),
            })
    }

    /// Put every member holding `role_name` on the guild's roster.
    ///
    /// Returns the number of students added or refreshed.
    pub async fn enroll_students(&self, http: &Http, guild_id: GuildId, role_name: &str) -> Result<usize> {
        let role_id = self.get_role_id(http, guild_id, role_name).await?;
        let members = guild_id.members(http, Some(MEMBER_FETCH_LIMIT), None::<UserId>).await?;

        let mut enrolled = 0;
        for member in members.iter().filter(|m| m.roles.contains(&role_id)) {
            self.store
                .upsert_student(guild_id, member.user.id, &member.user.name)
                .await?;
            enrolled += 1;
        }

        info!(
            "Enrolled {} students with role '{}' in guild {}",
            enrolled, role_name, guild_id
        );
        Ok(enrolled)
    }

    /// Assign a role to a user
    pub async fn assign_role(&self, http: &Http, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<()> {
        let member = guild_id.member(http, user_id).await?;
        member.add_role(http, role_id).await?;
        info!("Assigned role {} to user {}", role_id, user_id);
        Ok(())
    }

    /// Remove a role from a user
    pub async fn remove_role(&self, http: &Http, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<()> {
        let member = guild_id.member(http, user_id).await?;
        member.remove_role(http, role_id).await?;
        info!("Removed role {} from user {}", role_id, user_id);
        Ok(())
    }

    /// Remember and persist a reaction-role binding
    pub async fn bind_reaction_role(&self, message_id: MessageId, binding: RoleBinding) -> Result<()> {
        self.store
            .save_reaction_role(&ReactionRoleBinding {
                message_id: message_id.to_string(),
                guild_id: binding.guild_id.to_string(),
                channel_id: binding.channel_id.to_string(),
                role_id: binding.role_id.to_string(),
            })
            .await?;
        self.bindings.insert(message_id, binding);
        debug!("Bound role {} to message {}", binding.role_id, message_id);
        Ok(())
    }

    pub fn binding_for(&self, message_id: MessageId) -> Option<RoleBinding> {
        self.bindings.get(&message_id).map(|b| *b)
    }

    /// Fill the cache from storage. Unreadable rows are skipped.
    pub async fn load_bindings(&self) -> Result<usize> {
        let rows = self.store.reaction_roles().await?;
        let mut loaded = 0;
        for row in rows {
            match parse_binding(&row) {
                Some((message_id, binding)) => {
                    self.bindings.insert(message_id, binding);
                    loaded += 1;
                }
                None => warn!("Skipping unreadable reaction-role binding {:?}", row),
            }
        }
        info!("Loaded {} reaction-role bindings", loaded);
        Ok(loaded)
    }
}

fn parse_binding(row: &ReactionRoleBinding) -> Option<(MessageId, RoleBinding)> {
    let id = |raw: &str| raw.parse::<u64>().ok().filter(|v| *v != 0);
    Some((
        MessageId::new(id(&row.message_id)?),
        RoleBinding {
            guild_id: GuildId::new(id(&row.guild_id)?),
            channel_id: ChannelId::new(id(&row.channel_id)?),
            role_id: RoleId::new(id(&row.role_id)?),
        },
    ))
}

/// Shared role manager type
pub type SharedRoleManager = Arc<RoleManager>;

pub fn create_shared_role_manager(store: SharedEventStore) -> SharedRoleManager {
    Arc::new(RoleManager::new(store))
}
