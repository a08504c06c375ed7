//! Handlers for the subcommands, e.g. `ucd app.core segments`. Each writes its report
//! to the supplied writer.
pub mod info;
pub mod misc;
pub mod styles;
pub mod tables;

pub use info::*;
pub use misc::*;
