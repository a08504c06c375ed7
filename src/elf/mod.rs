//! Generic ELF support for core files. This module knows about the ELF container but
//! nothing about what the unwinder does with it.
//! Quick ELF reference: https://gist.github.com/x0nu11byt3/bcb35c3de461e5fb66173071a2379779
//!
//! ELF files start with an ELF header which includes:
//! * A magic number to identify the file as an ELF file.
//! * The class (32 or 64 bit) and byte order.
//! * The offset to and number of program headers.
//!
//! Program headers identify segments. In a core file the interesting types are:
//! * Load - memory of the process that cored. Read-only code usually isn't dumped so
//!   file size is less than memory size and a backing file has to supply the bytes.
//! * Note - variety of metadata, e.g. registers, signal and process info.
pub mod header;
pub mod io;
pub mod notes;
pub mod primitives;
pub mod segments;

pub use header::*;
pub use io::*;
pub use notes::*;
pub use primitives::*;
pub use segments::*;
