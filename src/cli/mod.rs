//! Console front end

pub mod console;

pub use console::{print_analysis, print_history, print_memories, print_response, run};
