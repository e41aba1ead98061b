// src/messages.rs

/// One entry of the help listing
pub struct CommandHelp {
    pub name: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
}

pub const COMMANDS: &[CommandHelp] = &[
    CommandHelp {
        name: "ping",
        usage: "`!ping`",
        description: "Check that the bot is alive and show its response time.",
    },
    CommandHelp {
        name: "marklistnow",
        usage: "`!marklistnow [voice channel name] [time]` or `!mn`",
        description: "List everyone who joined a voice channel around a class time.\n\
            The time is UTC in HH:MM. Joins from 10 minutes before until 90 minutes after count.\n\
            Example: `!marklistnow backend 01:45`.",
    },
    CommandHelp {
        name: "marksheet",
        usage: "`!marksheet [Sheet Name]` or `!ms [Sheet Name]`",
        description: "Write attendance marks into a Google Sheet and keep them updated until the class ends.\n\
            `!marksheet now [Sheet Name]` starts the class right now.\n\
            `!marksheet stop` stops the updates and closes the class 5 minutes ago.\n\
            Marks: `X` present, `L` late with the delay, `A` absent, followed by the attended share.",
    },
    CommandHelp {
        name: "setstudent",
        usage: "`!setstudent [role name]`",
        description: "Put every member with the role on the class roster.\nExample: `!setstudent Backend 2024`.",
    },
    CommandHelp {
        name: "setclasstime",
        usage: "`!setclasstime [time]`",
        description: "Set the class start time, HH:MM in local time.\nExample: `!setclasstime 08:45`.",
    },
    CommandHelp {
        name: "classtime",
        usage: "`!classtime`",
        description: "Show the class start time.",
    },
    CommandHelp {
        name: "delclasstime",
        usage: "`!delclasstime [time]`",
        description: "Delete the class start time.\nExample: `!delclasstime 08:45`.",
    },
    CommandHelp {
        name: "reacrole",
        usage: "`!reacrole [role name] [message]`",
        description: "Post a message; everyone who reacts with ✅ gets the role, removing the reaction removes it.\n\
            Example: `!reacrole 4year For 4th year students! Leave a reaction below!`.",
    },
];

/// Help text of a single command, matched by name
pub fn command_help(name: &str) -> Option<&'static CommandHelp> {
    let name = name.trim().trim_start_matches('!');
    COMMANDS.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

pub const UNKNOWN_COMMAND: &str = "Invalid command. Use `!help` to see available commands.";

pub const MARKSHEET_USAGE: &str =
    "Usage: !marksheet [Sheet Name] or !ms [Sheet Name] or include 'now' for current time.\nMore detail use `!help`";

pub const MARKLIST_USAGE: &str =
    "Usage: `!marklistnow [voice channel name] [time]` or !mn `[voice channel name] [time]`";

pub const REACROLE_USAGE: &str = "Usage: !reacrole [role name] [message]";

pub fn sheet_created_message(sheet_name: &str, url: &str) -> String {
    format!(
        "New sheet '{}' created and initialized successfully. You can access it here: {}",
        sheet_name, url
    )
}

pub fn sheet_updated_message(sheet_name: &str) -> String {
    format!(
        "Successfully accessed sheet: {}\nSheet updated successfully with new attendance marks.",
        sheet_name
    )
}

pub fn class_time_message(time: &str) -> String {
    format!("Current class time is {}.", time)
}

pub fn students_added_message(count: usize, role_name: &str) -> String {
    format!("Added {} students with role '{}' to the database.", count, role_name)
}
