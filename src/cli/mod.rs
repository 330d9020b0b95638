//! Text-mode front end.
//!
//! A line-oriented command protocol over stdin/stdout: the thin
//! "presentation collaborator" the engine core is designed against. It
//! owns a [`Game`](crate::game::Game) and translates commands into
//! controller calls; no rule logic lives here. Search progress and
//! diagnostics are reported as `info ...` lines.

mod handler;
mod parser;

pub use handler::CliHandler;
pub use parser::{parse_command, Command};

pub const ENGINE_NAME: &str = "varchess";
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
