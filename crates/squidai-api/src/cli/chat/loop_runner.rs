//! Main chat loop.

use std::path::PathBuf;
use std::sync::Arc;

use console::style;
use tracing::warn;

use squidai_core::client::controller::{
    ChatController, ClientIdentity, ControllerOptions, ExchangeOutcome, SubmitRejected,
};
use squidai_core::client::typing::RenderStrategy;
use squidai_infra::client::{ApiClient, HttpChatPersistence, HttpRelayTransport};
use squidai_types::chat::{AttachedInput, Session};

use super::attachments::load_image;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::renderer::{TerminalView, print_sessions, print_welcome_banner};

/// Options for `squid chat`.
pub struct ChatArgs {
    pub server: String,
    pub typewriter: bool,
    pub images: Vec<PathBuf>,
    pub identity: ClientIdentity,
}

/// Pick a session from the last listing by 1-based number, or by id.
fn find_session(listed: &[Session], target: &str) -> Option<Session> {
    match target.parse::<usize>() {
        Ok(n) if n >= 1 => listed.get(n - 1).cloned(),
        _ => listed.iter().find(|s| s.id == target).cloned(),
    }
}

/// Run the interactive chat loop until `/quit` or Ctrl+D.
pub async fn run_chat_loop(args: ChatArgs) -> anyhow::Result<()> {
    let mut pending_images: Vec<AttachedInput> = Vec::with_capacity(args.images.len());
    for path in &args.images {
        pending_images.push(load_image(path).await?);
    }

    let store_hint = if args.identity.user_id.is_some() {
        "signed in"
    } else {
        "guest (local sessions)"
    };
    let api = ApiClient::new(args.server.clone(), args.identity.clone());
    let persistence = Arc::new(HttpChatPersistence::new(api.clone()));
    let options = ControllerOptions {
        strategy: if args.typewriter {
            RenderStrategy::typewriter()
        } else {
            RenderStrategy::Chunk
        },
        identity: args.identity,
        ..ControllerOptions::default()
    };
    let controller = ChatController::new(
        HttpRelayTransport::new(api),
        Arc::clone(&persistence),
        options,
    );
    let view = TerminalView::new();

    print_welcome_banner(&args.server, store_hint);
    if !pending_images.is_empty() {
        println!(
            "  {} {} image(s) will be sent with your first message.\n",
            style("📎").bold(),
            pending_images.len()
        );
    }

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, _writer) = ChatInput::new(prompt)
        .map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;
    let mut listed: Vec<Session> = Vec::new();

    loop {
        let text = match chat_input.read_line().await {
            InputEvent::Eof => break,
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
                continue;
            }
            InputEvent::Message(text) => text,
        };

        if let Some(cmd) = commands::parse(&text) {
            match cmd {
                ChatCommand::Help => commands::print_help(),
                ChatCommand::Clear => chat_input.clear(),
                ChatCommand::Exit => break,
                ChatCommand::New => {
                    controller.start_new_session();
                    println!("\n  {}\n", style("New session started.").dim());
                }
                ChatCommand::Sessions => match persistence.list_sessions().await {
                    Ok(sessions) => {
                        print_sessions(&sessions);
                        listed = sessions;
                    }
                    Err(e) => {
                        println!("\n  {} Could not load sessions: {e}\n", style("!").red().bold());
                    }
                },
                ChatCommand::Resume(target) => match find_session(&listed, &target) {
                    Some(session) => {
                        println!(
                            "\n  {} Resumed {} ({} messages)\n",
                            style("↺").cyan().bold(),
                            style(&session.title).bold(),
                            session.messages.len()
                        );
                        controller.resume_session(session);
                    }
                    None => println!(
                        "\n  {} No such session. Run /sessions first.\n",
                        style("?").yellow().bold()
                    ),
                },
                ChatCommand::Unknown(name) => println!(
                    "\n  {} Unknown command: {}. Type /help for available commands.\n",
                    style("?").yellow().bold(),
                    style(name).dim()
                ),
            }
            continue;
        }

        let images = std::mem::take(&mut pending_images);
        match controller.submit(&text, images.clone(), &view).await {
            Ok(ExchangeOutcome::Completed(_)) => println!(),
            Ok(ExchangeOutcome::Failed { error, .. }) => {
                warn!(error = %error, "Exchange failed");
                println!();
            }
            Err(SubmitRejected::EmptyInput) => {}
            Err(rejected) => {
                // Nothing was sent; keep the attachments for the next try.
                pending_images = images;
                println!("\n  {} {rejected}\n", style("⏳").bold());
            }
        }
    }

    println!("\n  {}", style("Session ended.").dim());
    controller.flush().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listed() -> Vec<Session> {
        vec![Session::new("first"), Session::new("second")]
    }

    #[test]
    fn find_session_by_number() {
        let sessions = listed();
        assert_eq!(find_session(&sessions, "2").unwrap().title, "second");
        assert!(find_session(&sessions, "0").is_none());
        assert!(find_session(&sessions, "3").is_none());
    }

    #[test]
    fn find_session_by_id() {
        let sessions = listed();
        let id = sessions[0].id.clone();
        assert_eq!(find_session(&sessions, &id).unwrap().title, "first");
        assert!(find_session(&sessions, "unknown").is_none());
    }
}
