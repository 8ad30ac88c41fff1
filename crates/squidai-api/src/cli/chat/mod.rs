//! Interactive terminal chat against a running SquidAI server.
//!
//! Drives the core `ChatController` over HTTP: replies stream onto the
//! terminal as they arrive and are re-rendered as markdown once complete.
//! Entry point: `loop_runner::run_chat_loop`.

pub mod attachments;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod renderer;
