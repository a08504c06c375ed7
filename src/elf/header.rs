//! The ELF header: the fixed-size prefix that says what sort of file this is and where
//! the program header table lives.
use super::Stream;
use crate::error::{CoreError, Result};
use tracing::{debug, error};

pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

const EI_CLASS: usize = 4;
const EI_DATA: usize = 5;
const EI_NIDENT: usize = 16;

const ELFCLASS32: u8 = 1;
const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;
const ELFDATA2MSB: u8 = 2;

/// Size of an ELF64 header. No sane ELF32 core is smaller than this so it's the amount
/// we insist on being able to read up front.
pub const PREFIX_SIZE: usize = 64;

const ELF32_HEADER_SIZE: u16 = 52;
const ELF32_PH_ENTRY_SIZE: u16 = 32;

pub const ET_CORE: u16 = 4;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ElfClass {
    Elf32,
    Elf64,
}

impl ElfClass {
    fn from_ident(value: u8) -> Result<Self> {
        match value {
            ELFCLASS32 => Ok(ElfClass::Elf32),
            ELFCLASS64 => Ok(ElfClass::Elf64),
            _ => Err(CoreError::UnsupportedClass(value)),
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            ElfClass::Elf32 => 32,
            ElfClass::Elf64 => 64,
        }
    }
}

/// The EI_DATA value files have to use to be readable on this host.
pub fn native_data_encoding() -> u8 {
    if cfg!(target_endian = "little") {
        ELFDATA2LSB
    } else {
        ELFDATA2MSB
    }
}

/// Elf32_Ehdr or Elf64_Ehdr, minus the section header fields which core files don't use.
#[derive(Clone, Debug)]
pub struct ElfHeader {
    pub class: ElfClass,

    /// ET_CORE for core files.
    pub etype: u16,

    /// Target architecture, e.g. 62 for x86-64.
    pub machine: u16,

    pub version: u32,

    /// Zero for core files.
    pub entry: u64,

    /// Offset to the program header table.
    pub ph_offset: u64,

    pub flags: u32,

    /// Size of this header.
    pub header_size: u16,

    /// Size of one program header entry as declared by the file.
    pub ph_entry_size: u16,

    pub num_ph_entries: u16,
}

impl ElfHeader {
    /// Classifies and validates the header at the start of bytes. Nothing past the
    /// header is looked at, in particular no program headers are read.
    pub fn new(bytes: &[u8]) -> Result<Self> {
        let prefix = bytes.get(..PREFIX_SIZE).ok_or_else(|| {
            error!("file is only {} bytes, too small for an ELF header", bytes.len());
            CoreError::NotElf
        })?;
        if prefix[..4] != ELF_MAGIC {
            error!("bad ELF magic: {:02x?}", &prefix[..4]);
            return Err(CoreError::NotElf);
        }

        let class = ElfClass::from_ident(prefix[EI_CLASS]).inspect_err(|err| error!("{err}"))?;
        let data = prefix[EI_DATA];
        if data != native_data_encoding() {
            error!("data encoding {data} doesn't match the host's");
            return Err(CoreError::EndianMismatch(data));
        }

        let mut s = Stream::new(prefix, class);
        s.skip(EI_NIDENT)?;
        let etype = s.read_half()?;
        let machine = s.read_half()?;
        let version = s.read_word()?;
        let entry = s.read_addr()?;
        let ph_offset = s.read_addr()?;
        let _section_offset = s.read_addr()?;
        let flags = s.read_word()?;
        let header_size = s.read_half()?;
        let ph_entry_size = s.read_half()?;
        let num_ph_entries = s.read_half()?;

        let header = ElfHeader {
            class,
            etype,
            machine,
            version,
            entry,
            ph_offset,
            flags,
            header_size,
            ph_entry_size,
            num_ph_entries,
        };
        header.check_widths()?;
        header.check_sizes()?;
        debug!(
            "ELF{} header: type {etype}, machine {machine}, {num_ph_entries} program headers at {ph_offset:#x}",
            class.bits()
        );
        Ok(header)
    }

    pub fn is_core(&self) -> bool {
        self.etype == ET_CORE
    }

    pub fn stype(&self) -> &'static str {
        match self.etype {
            0 => "none",
            1 => "relocatable",
            2 => "executable",
            3 => "shared object",
            4 => "core",
            _ => "unknown",
        }
    }

    pub fn machine(&self) -> &'static str {
        match self.machine {
            3 => "x86",
            8 => "MIPS",
            20 => "PowerPC",
            21 => "PowerPC64",
            40 => "ARM",
            62 => "x86-64",
            183 => "AArch64",
            243 => "RISC-V",
            _ => "unknown",
        }
    }

    // We access the file through a mapping so 64-bit offsets have to fit in a usize.
    fn check_widths(&self) -> Result<()> {
        if self.class == ElfClass::Elf64 && usize::try_from(self.ph_offset).is_err() {
            error!(
                "64-bit file while only {} bit offsets are supported",
                usize::BITS
            );
            return Err(CoreError::OffsetTooWide(self.ph_offset));
        }
        Ok(())
    }

    // Only ELF32 sizes are checked. ELF64 headers are taken on faith.
    fn check_sizes(&self) -> Result<()> {
        match self.class {
            ElfClass::Elf32
                if self.header_size != ELF32_HEADER_SIZE
                    || self.ph_entry_size != ELF32_PH_ENTRY_SIZE =>
            {
                error!(
                    "wrong e_ehsize ({}) or e_phentsize ({})",
                    self.header_size, self.ph_entry_size
                );
                Err(CoreError::BadHeaderSize {
                    header_size: self.header_size,
                    ph_entry_size: self.ph_entry_size,
                })
            }
            _ => Ok(()),
        }
    }
}
