//! Core files as the unwinder sees them: the program headers of the crashed process,
//! the registers of the thread that crashed, and optional backing files for code
//! segments the kernel left out of the dump.
mod backing;
mod image;

pub use backing::*;
pub use image::*;
