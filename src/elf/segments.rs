//! Program headers. In a core file these describe the memory of the process that
//! cored (load segments) plus the notes.
use super::{Bytes, ElfClass, ElfHeader, Offset, Reader, Stream, VirtualAddr};
use crate::error::Result;
use std::fmt;
use tracing::{error, trace, warn};

pub const EXECUTE_FLAG: u32 = 0x1;
pub const WRITE_FLAG: u32 = 0x2;
pub const READ_FLAG: u32 = 0x4;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SegmentType {
    /// Unused entry.
    Null,

    /// A loadable segment, described by p_filesz and p_memsz.
    Load,

    /// Specifies dynamic linking information.
    Dynamic,

    /// Location and size of a null-terminated path name to invoke as an interpreter.
    Interpreter,

    /// The location and size of auxiliary information.
    Note,

    /// Reserved but has unspecified semantics.
    Shlib,

    /// The location and size of the program header table itself.
    Phdr,

    /// The Thread-Local Storage template.
    Tls,

    /// OS, processor, or otherwise unrecognized types.
    Other(u32),
}

impl SegmentType {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => SegmentType::Null,
            1 => SegmentType::Load,
            2 => SegmentType::Dynamic,
            3 => SegmentType::Interpreter,
            4 => SegmentType::Note,
            5 => SegmentType::Shlib,
            6 => SegmentType::Phdr,
            7 => SegmentType::Tls,
            _ => SegmentType::Other(value),
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            SegmentType::Null => 0,
            SegmentType::Load => 1,
            SegmentType::Dynamic => 2,
            SegmentType::Interpreter => 3,
            SegmentType::Note => 4,
            SegmentType::Shlib => 5,
            SegmentType::Phdr => 6,
            SegmentType::Tls => 7,
            SegmentType::Other(value) => value,
        }
    }
}

impl fmt::Display for SegmentType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SegmentType::Null => f.write_str("null"),
            SegmentType::Load => f.write_str("load"),
            SegmentType::Dynamic => f.write_str("dynamic"),
            SegmentType::Interpreter => f.write_str("interp"),
            SegmentType::Note => f.write_str("note"),
            SegmentType::Shlib => f.write_str("shlib"),
            SegmentType::Phdr => f.write_str("phdr"),
            SegmentType::Tls => f.write_str("tls"),
            SegmentType::Other(value) => write!(f, "{value:#x}"),
        }
    }
}

/// One program header, widened to 64 bits whatever the class of the core. The physical
/// address is dropped: it's always zero in core files.
#[derive(Debug)]
pub struct Segment {
    pub stype: SegmentType,

    /// Read/Write/Execute flags.
    pub flags: u32,

    /// Where the segment's bytes are stored in the core file. The size is p_filesz which
    /// is zero (or less than the memory size) when the kernel didn't dump the pages.
    pub obytes: Bytes<Offset>,

    /// Addressing for the segment in the process that cored. The size is p_memsz.
    pub vbytes: Bytes<VirtualAddr>,

    pub align: u64,

    pub(crate) backing_size: u64,
}

impl Segment {
    /// Parses one Elf32_Phdr or Elf64_Phdr. Field order differs between the two.
    pub fn new(s: &mut Stream, class: ElfClass) -> Result<Self> {
        let (p_type, p_flags, p_offset, p_vaddr, p_paddr, p_filesz, p_memsz, p_align) =
            match class {
                ElfClass::Elf64 => {
                    let p_type = s.read_word()?;
                    let p_flags = s.read_word()?;
                    let p_offset = s.read_xword()?;
                    let p_vaddr = s.read_xword()?;
                    let p_paddr = s.read_xword()?;
                    let p_filesz = s.read_xword()?;
                    let p_memsz = s.read_xword()?;
                    let p_align = s.read_xword()?;
                    (p_type, p_flags, p_offset, p_vaddr, p_paddr, p_filesz, p_memsz, p_align)
                }
                ElfClass::Elf32 => {
                    let p_type = s.read_word()?;
                    let p_offset = s.read_word()? as u64;
                    let p_vaddr = s.read_word()? as u64;
                    let p_paddr = s.read_word()? as u64;
                    let p_filesz = s.read_word()? as u64;
                    let p_memsz = s.read_word()? as u64;
                    let p_flags = s.read_word()?;
                    let p_align = s.read_word()? as u64;
                    (p_type, p_flags, p_offset, p_vaddr, p_paddr, p_filesz, p_memsz, p_align)
                }
            };
        if p_paddr != 0 {
            warn!("p_paddr is {p_paddr:#x}, expected zero in a core file");
        }

        Ok(Segment {
            stype: SegmentType::from_u32(p_type),
            flags: p_flags,
            obytes: Bytes::<Offset>::from_raw(p_offset, p_filesz),
            vbytes: Bytes::<VirtualAddr>::from_raw(p_vaddr, p_memsz),
            align: p_align,
            backing_size: p_filesz,
        })
    }

    /// Reads the whole program header table. Any short record fails the lot.
    pub fn read_table(reader: &Reader, header: &ElfHeader) -> Result<Vec<Segment>> {
        let count = header.num_ph_entries as usize;
        let mut segments = Vec::with_capacity(count);
        if count == 0 {
            return Ok(segments);
        }

        let mut s = reader.stream(header.ph_offset).inspect_err(|err| {
            error!("can't read program headers at {:#x}: {err}", header.ph_offset)
        })?;
        for i in 0..count {
            let segment = Segment::new(&mut s, reader.class)
                .inspect_err(|err| error!("can't read program header {i}: {err}"))?;
            segment.trace(i);
            segments.push(segment);
        }
        Ok(segments)
    }

    pub fn file_size(&self) -> u64 {
        self.obytes.size
    }

    pub fn mem_size(&self) -> u64 {
        self.vbytes.size
    }

    /// The number of bytes a backing file supplies for this segment. Before a file is
    /// attached this is the size stored in the core.
    pub fn backing_size(&self) -> u64 {
        self.backing_size
    }

    /// Some pages of the segment weren't written to the core.
    pub fn is_partial(&self) -> bool {
        self.file_size() < self.mem_size()
    }

    pub fn executable(&self) -> bool {
        self.flags & EXECUTE_FLAG != 0
    }

    pub fn writeable(&self) -> bool {
        self.flags & WRITE_FLAG != 0
    }

    pub fn readable(&self) -> bool {
        self.flags & READ_FLAG != 0
    }

    /// Exactly r-x, which is what code from an exe or shared library looks like.
    pub fn is_code(&self) -> bool {
        self.flags == READ_FLAG | EXECUTE_FLAG
    }

    pub fn perms(&self) -> String {
        let mut result = String::with_capacity(3);
        result.push(if self.readable() { 'r' } else { '-' });
        result.push(if self.writeable() { 'w' } else { '-' });
        result.push(if self.executable() { 'x' } else { '-' });
        result
    }

    fn trace(&self, index: usize) {
        trace!("phdr[{index:03}]: type:{:?}", self.stype);
        if self.stype == SegmentType::Load {
            trace!(
                "phdr[{index:03}]: ofs:{:08x} va:{:08x} filesize:{:08x} memsize:{:08x} flg:{:x}{}{}",
                self.obytes.start.0,
                self.vbytes.start.0,
                self.file_size(),
                self.mem_size(),
                self.flags,
                if self.is_partial() { " partial" } else { "" },
                if self.executable() { " executable" } else { "" },
            );
        }
    }
}
