//! Slash command parsing for the chat loop.

use console::style;

#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    Help,
    Clear,
    Exit,
    /// Forget the active session; the next message starts a new one.
    New,
    /// List stored sessions.
    Sessions,
    /// Continue a listed session, by list number or id.
    Resume(String),
    Unknown(String),
}

/// Parse user input as a slash command. `None` if it is not one.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut parts = trimmed.splitn(2, ' ');
    let cmd = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

    match cmd.as_str() {
        "/help" | "/h" | "/?" => Some(ChatCommand::Help),
        "/clear" | "/cls" => Some(ChatCommand::Clear),
        "/exit" | "/quit" | "/q" => Some(ChatCommand::Exit),
        "/new" => Some(ChatCommand::New),
        "/sessions" | "/ls" => Some(ChatCommand::Sessions),
        "/resume" => match arg {
            Some(target) => Some(ChatCommand::Resume(target.to_string())),
            None => Some(ChatCommand::Unknown(
                "/resume requires a session number or id".to_string(),
            )),
        },
        other => Some(ChatCommand::Unknown(other.to_string())),
    }
}

pub fn print_help() {
    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    println!("  {}        Show this help message", style("/help").cyan());
    println!("  {}       Clear the screen", style("/clear").cyan());
    println!("  {}         Start a new session", style("/new").cyan());
    println!("  {}    List your sessions", style("/sessions").cyan());
    println!("  {} Continue a listed session", style("/resume <n>").cyan());
    println!("  {}        End the chat", style("/quit").cyan());
    println!();
    println!("  {}", style("Ctrl+D to exit").dim());
    println!();
}
