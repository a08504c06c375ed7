//! Loads ELF core files so that the stack of the crashed thread can be unwound.
//!
//! ```no_run
//! let mut core = ucd::CoreImage::new("app.core")?;
//! core.associate(3, "/usr/lib/libc.so.6")?;
//! let status = core.process_status();
//! println!("pid {} crashed at {:#x}", status.pid(), status.ip());
//! # Ok::<(), ucd::CoreError>(())
//! ```
pub mod coredump;
pub mod elf;
pub mod error;
mod utils;

#[cfg(test)]
mod fixtures;

pub use coredump::CoreImage;
pub use error::{CoreError, ErrorKind};
