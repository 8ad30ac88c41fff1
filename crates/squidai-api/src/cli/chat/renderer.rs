//! Terminal rendering for the chat loop.
//!
//! While a reply streams, the visible prefix is printed raw. When the reply
//! completes, the raw lines are erased and the full text is re-rendered as
//! markdown through `termimad`.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use console::{Term, measure_text_width, style};
use termimad::MadSkin;

use squidai_core::client::controller::{ChatPhase, ChatView, RenderedTurn, role_label};
use squidai_types::chat::{Session, TurnRole};

/// Markdown renderer.
pub struct ChatRenderer {
    skin: MadSkin,
}

impl ChatRenderer {
    pub fn new() -> Self {
        let mut skin = MadSkin::default_dark();
        skin.bold.set_fg(termimad::crossterm::style::Color::Cyan);
        skin.inline_code
            .set_fg(termimad::crossterm::style::Color::Yellow);
        Self { skin }
    }

    pub fn render_final(&self, markdown: &str) -> String {
        format!("{}", self.skin.term_text(markdown))
    }
}

impl Default for ChatRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of terminal rows `text` occupies at `width` columns.
pub fn rows_for(text: &str, width: usize) -> usize {
    let width = width.max(1);
    text.split('\n')
        .map(|line| measure_text_width(line).div_ceil(width).max(1))
        .sum()
}

/// [`ChatView`] that writes to the terminal.
pub struct TerminalView {
    renderer: ChatRenderer,
    term: Term,
    /// Bytes of the streaming reply already printed.
    printed: Mutex<usize>,
}

impl TerminalView {
    pub fn new() -> Self {
        Self {
            renderer: ChatRenderer::new(),
            term: Term::stdout(),
            printed: Mutex::new(0),
        }
    }

    fn take_printed(&self) -> usize {
        let mut printed = self.printed.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *printed)
    }

    fn print_reply_header(&self) {
        println!("  {}", style(format!("{} >", role_label(TurnRole::Model))).cyan().bold());
    }
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatView for TerminalView {
    fn on_phase(&self, phase: ChatPhase) {
        match phase {
            ChatPhase::Sending => {
                print!("  {}", style("thinking...").dim());
                let _ = std::io::stdout().flush();
            }
            ChatPhase::Streaming => {
                let _ = self.term.clear_line();
                self.print_reply_header();
            }
            ChatPhase::Idle | ChatPhase::Error => {}
        }
    }

    fn on_typing(&self, visible: &str) {
        let mut printed = self.printed.lock().unwrap_or_else(PoisonError::into_inner);
        if visible.len() > *printed {
            print!("{}", &visible[*printed..]);
            let _ = std::io::stdout().flush();
            *printed = visible.len();
        }
    }

    fn on_turn(&self, turn: &RenderedTurn) {
        if turn.turn.role == TurnRole::User {
            return;
        }
        let printed = self.take_printed();

        if turn.is_error {
            // Either still on the "thinking..." line or mid-stream.
            let _ = self.term.clear_line();
            if printed > 0 {
                println!();
            }
            println!(
                "  {}",
                style(format!("{} >", role_label(TurnRole::Model))).red().bold()
            );
        } else if printed > 0 {
            println!();
            let width = self.term.size().1 as usize;
            let _ = self.term.clear_last_lines(rows_for(&turn.turn.text, width));
        } else {
            // Empty replies never reach here; a reply with no typing calls
            // still needs its header.
            self.print_reply_header();
        }
        println!("{}", self.renderer.render_final(&turn.turn.text));
    }
}

/// Print the session list with 1-based numbers for `/resume`.
pub fn print_sessions(sessions: &[Session]) {
    println!();
    if sessions.is_empty() {
        println!("  {}", style("No sessions yet.").dim());
        println!();
        return;
    }
    for (index, session) in sessions.iter().enumerate() {
        let updated = relative_age(session.updated_at);
        println!(
            "  {} {}  {}",
            style(format!("{:>2}.", index + 1)).cyan(),
            style(&session.title).bold(),
            style(format!("{} messages · {updated}", session.messages.len())).dim()
        );
    }
    println!();
}

/// Minutes/hours/days since an epoch-millisecond timestamp.
fn relative_age(updated_at: i64) -> String {
    let elapsed = squidai_types::chat::now_millis().saturating_sub(updated_at) / 1000;
    match elapsed {
        s if s < 60 => "just now".to_string(),
        s if s < 3_600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3_600),
        s => format!("{}d ago", s / 86_400),
    }
}

/// Welcome banner.
pub fn print_welcome_banner(server: &str, session_hint: &str) {
    println!();
    println!("  {} {}", style("🦑").bold(), style("SquidAI").cyan().bold());
    println!("  {}", style("Coding assistant").dim());
    println!();
    println!("  {}  {}", style("Server:").bold(), style(server).dim());
    println!("  {}  {}", style("Store:").bold(), style(session_hint).dim());
    println!();
    println!("  {}", style("Type /help for commands, Ctrl+D to exit").dim());
    println!("  {}", style("---").dim());
    println!();
}
