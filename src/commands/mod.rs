pub mod classtime;
pub mod general;
pub mod marksheet;
pub mod reaction_roles;
pub mod students;

use poise::serenity_prelude::GuildId;

use crate::error::{BotError, Result};
use crate::Context;

pub use classtime::{classtime, delclasstime, setclasstime};
pub use general::{help, ping};
pub use marksheet::{marklistnow, marksheet};
pub use reaction_roles::reacrole;
pub use students::setstudent;

/// Guild the command was used in
pub(crate) fn require_guild(ctx: Context<'_>) -> Result<GuildId> {
    ctx.guild_id()
        .ok_or_else(|| BotError::invalid_input("This command can only be used in a server."))
}

/// Every command the bot registers
pub fn all() -> Vec<poise::Command<crate::Data, crate::Error>> {
    vec![
        ping(),
        help(),
        setclasstime(),
        classtime(),
        delclasstime(),
        marklistnow(),
        marksheet(),
        setstudent(),
        reacrole(),
    ]
}
