//! Generation pipeline: the nine-stage orchestrator, quality
//! verification and auto-rewrite, and the final draft assembler.

mod assembler;
mod orchestrator;
mod verify;

pub use assembler::{assemble, render_markdown};
pub use orchestrator::Orchestrator;
