//! Errors returned while loading a core file or attaching backing files to it.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Broad classes of [`CoreError`]. Callers mostly care whether the core itself is
/// unusable (`Format`, `MissingContent`) or whether a single request failed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The operating system refused to open, stat, or map a file.
    Io,

    /// The bytes don't form a core file we can use.
    Format,

    /// The core is well formed but lacks something mandatory, e.g. NT_PRSTATUS.
    MissingContent,

    /// A backing file request named a bad segment or one that is already backed.
    Association,

    /// A memory read fell outside of what the core and its backing files supply.
    Memory,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("can't open '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("can't map '{}': {source}", path.display())]
    Map {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("can't stat '{}': {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("not an ELF file")]
    NotElf,

    #[error("not a 32/64 bit ELF file (class {0})")]
    UnsupportedClass(u8),

    #[error("endian-incompatible ELF file (data encoding {0})")]
    EndianMismatch(u8),

    #[error("64-bit file offset {0:#x} is too wide for this host")]
    OffsetTooWide(u64),

    #[error("wrong e_ehsize ({header_size}) or e_phentsize ({ph_entry_size})")]
    BadHeaderSize { header_size: u16, ph_entry_size: u16 },

    #[error("no register layout for machine {machine} in an ELF{bits} core")]
    UnsupportedMachine { machine: u16, bits: u32 },

    #[error("short read: wanted {wanted} bytes at offset {offset:#x}")]
    ShortRead { offset: u64, wanted: u64 },

    #[error("'{}' has {found} bytes but the segment stores {wanted}", path.display())]
    BackingTooShort {
        path: PathBuf,
        wanted: u64,
        found: u64,
    },

    #[error("no PT_NOTE segment")]
    MissingNote,

    #[error("no NT_PRSTATUS note")]
    MissingProcessStatus,

    #[error("there is no segment {index} (core has {count})")]
    NoSuchSegment { index: usize, count: usize },

    #[error("backing file already added to segment {index}")]
    AlreadyBacked { index: usize },

    #[error("{size} bytes at {addr:#x} aren't available")]
    Unmapped { addr: u64, size: usize },
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        use CoreError::*;
        match self {
            Open { .. } | Map { .. } | Stat { .. } => ErrorKind::Io,
            NotElf
            | UnsupportedClass(_)
            | EndianMismatch(_)
            | OffsetTooWide(_)
            | BadHeaderSize { .. }
            | UnsupportedMachine { .. }
            | ShortRead { .. }
            | BackingTooShort { .. } => ErrorKind::Format,
            MissingNote | MissingProcessStatus => ErrorKind::MissingContent,
            NoSuchSegment { .. } | AlreadyBacked { .. } => ErrorKind::Association,
            Unmapped { .. } => ErrorKind::Memory,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
