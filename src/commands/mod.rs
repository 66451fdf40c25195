//! CLI command implementations
//!
//! Printing only; the work itself happens in the session.

mod list;
mod probe;

pub use list::{list_boards, list_cables, list_fpgas};
pub use probe::{chain_summary, print_probes};
