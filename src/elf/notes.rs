//! The notes in a core file. These provide information about the process, most
//! importantly NT_PRSTATUS which holds the registers of the thread that crashed.
use super::{ElfClass, ElfHeader, Reader, Segment, SegmentType, Stream};
use crate::error::{CoreError, Result};
use crate::utils;
use std::fmt;
use std::ops::Range;
use tracing::{debug, error};

pub const NT_PRSTATUS: u32 = 1;

const EM_386: u16 = 3;
const EM_X86_64: u16 = 62;
const EM_AARCH64: u16 = 183;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoteType {
    /// Signal info, pid, and the general purpose registers. See elf_prstatus in
    /// https://docs.huihoo.com/doxygen/linux/kernel/3.7/uapi_2linux_2elfcore_8h_source.html.
    PrStatus,

    /// Floating point register values.
    PrFPReg,

    /// Process state info, e.g. whether it's running, sleeping, or a zombie. Also the
    /// name and arguments for the executable.
    PrPsInfo,

    /// The auxiliary vector the kernel handed to the process.
    AuxV,

    /// Memory-mapped files, see fill_files_note in fs/binfmt_elf.c.
    File,

    /// A siginfo_t: the usual signal stuff plus e.g. the fault address.
    SigInfo,

    Other(u32),
}

impl NoteType {
    pub fn from_u32(value: u32) -> Self {
        match value {
            NT_PRSTATUS => NoteType::PrStatus,
            2 => NoteType::PrFPReg,
            3 => NoteType::PrPsInfo,
            6 => NoteType::AuxV,
            0x46494c45 => NoteType::File,
            0x53494749 => NoteType::SigInfo,
            _ => NoteType::Other(value),
        }
    }
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NoteType::PrStatus => f.write_str("NT_PRSTATUS"),
            NoteType::PrFPReg => f.write_str("NT_PRFPREG"),
            NoteType::PrPsInfo => f.write_str("NT_PRPSINFO"),
            NoteType::AuxV => f.write_str("NT_AUXV"),
            NoteType::File => f.write_str("NT_FILE"),
            NoteType::SigInfo => f.write_str("NT_SIGINFO"),
            NoteType::Other(value) => write!(f, "{value:#x}"),
        }
    }
}

/// A note record within a NoteBuffer.
#[derive(Clone, Debug)]
pub struct Note {
    pub name: String,
    pub ntype: NoteType,

    /// Location of the descriptor within the note buffer.
    pub desc: Range<usize>,
}

/// Reads one note: three words (name size, descriptor size, type) followed by the name
/// and then the descriptor, each padded to a four byte boundary.
pub fn read_note(s: &mut Stream) -> Result<Note> {
    let n_namesz = s.read_word()? as usize;
    let n_descsz = s.read_word()? as usize;
    let n_type = s.read_word()?;

    let name = s.read_bytes(n_namesz)?;
    let name = String::from_utf8_lossy(name)
        .trim_end_matches('\0')
        .to_string();
    s.skip(utils::word_padding(n_namesz))?;

    let start = s.offset;
    s.read_bytes(n_descsz)?;
    // the last note is sometimes missing its padding
    s.skip(utils::word_padding(n_descsz).min(s.remaining()))?;

    Ok(Note {
        name,
        ntype: NoteType::from_u32(n_type),
        desc: start..start + n_descsz,
    })
}

/// Iterates over the notes in a buffer. Iteration stops at the first malformed note.
pub struct Notes<'a> {
    s: Stream<'a>,
    done: bool,
}

impl Iterator for Notes<'_> {
    type Item = Note;

    fn next(&mut self) -> Option<Note> {
        if self.done || self.s.remaining() == 0 {
            return None;
        }
        match read_note(&mut self.s) {
            Ok(note) => Some(note),
            Err(err) => {
                debug!("malformed note: {err}");
                self.done = true;
                None
            }
        }
    }
}

/// Where the interesting bits of elf_prstatus live. This differs by architecture; these
/// are the Linux x86, x86-64, and AArch64 layouts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StatusLayout {
    /// Size of the whole elf_prstatus.
    pub size: usize,
    pid: usize,
    registers: usize,
    register_size: usize,
    ip: usize,
    sp: usize,
    names: &'static [&'static str],
}

const X86_64_REGISTERS: &[&str] = &[
    "r15", "r14", "r13", "r12", "rbp", "rbx", "r11", "r10", "r9", "r8", "rax", "rcx", "rdx",
    "rsi", "rdi", "orig_rax", "rip", "cs", "eflags", "rsp", "ss", "fs_base", "gs_base", "ds",
    "es", "fs", "gs",
];

// Registers that rarely matter when looking at a crash.
const RARE_REGISTERS: &[&str] = &[
    "orig_rax", "orig_eax", "cs", "ds", "es", "fs", "gs", "ss", "eflags", "fs_base", "gs_base",
    "pstate",
];

const AARCH64_REGISTERS: &[&str] = &[
    "x0", "x1", "x2", "x3", "x4", "x5", "x6", "x7", "x8", "x9", "x10", "x11", "x12", "x13",
    "x14", "x15", "x16", "x17", "x18", "x19", "x20", "x21", "x22", "x23", "x24", "x25", "x26",
    "x27", "x28", "x29", "x30", "sp", "pc", "pstate",
];

const X86_REGISTERS: &[&str] = &[
    "ebx", "ecx", "edx", "esi", "edi", "ebp", "eax", "ds", "es", "fs", "gs", "orig_eax", "eip",
    "cs", "eflags", "esp", "ss",
];

impl StatusLayout {
    pub const X86_64: StatusLayout = StatusLayout {
        size: 336,
        pid: 32,
        registers: 112,
        register_size: 8,
        ip: 16,
        sp: 19,
        names: X86_64_REGISTERS,
    };

    pub const X86: StatusLayout = StatusLayout {
        size: 144,
        pid: 24,
        registers: 72,
        register_size: 4,
        ip: 12,
        sp: 15,
        names: X86_REGISTERS,
    };

    pub const AARCH64: StatusLayout = StatusLayout {
        size: 392,
        pid: 32,
        registers: 112,
        register_size: 8,
        ip: 32,
        sp: 31,
        names: AARCH64_REGISTERS,
    };

    /// Picks the layout from e_machine. Other machines are an error.
    pub fn for_header(header: &ElfHeader) -> Result<Self> {
        match (header.class, header.machine) {
            (ElfClass::Elf64, EM_X86_64) => Ok(StatusLayout::X86_64),
            (ElfClass::Elf32, EM_386) => Ok(StatusLayout::X86),
            (ElfClass::Elf64, EM_AARCH64) => Ok(StatusLayout::AARCH64),
            (class, machine) => {
                error!(
                    "no NT_PRSTATUS layout for {} ({machine}) in an ELF{} core",
                    header.machine(),
                    class.bits()
                );
                Err(CoreError::UnsupportedMachine {
                    machine,
                    bits: class.bits(),
                })
            }
        }
    }

    pub fn num_registers(&self) -> usize {
        self.names.len()
    }
}

/// Locates the NT_PRSTATUS descriptor inside a NoteBuffer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StatusNote {
    pub offset: usize,
    pub layout: StatusLayout,
}

/// The contents of the first PT_NOTE segment.
pub struct NoteBuffer {
    class: ElfClass,
    bytes: Vec<u8>,
}

impl NoteBuffer {
    pub fn new(bytes: Vec<u8>, class: ElfClass) -> Self {
        NoteBuffer { class, bytes }
    }

    /// Copies the first PT_NOTE segment out of the core.
    pub fn read(reader: &Reader, segments: &[Segment]) -> Result<Self> {
        let segment = segments
            .iter()
            .find(|s| s.stype == SegmentType::Note)
            .ok_or_else(|| {
                error!("no PT_NOTE segment");
                CoreError::MissingNote
            })?;
        let bytes = reader
            .slice(segment.obytes.start.0, segment.obytes.size)
            .inspect_err(|err| error!("can't read PT_NOTE: {err}"))?;
        Ok(NoteBuffer::new(bytes.to_vec(), reader.class))
    }

    pub fn bytes(&self, note: &Note) -> &[u8] {
        &self.bytes[note.desc.clone()]
    }

    pub fn iter(&self) -> Notes<'_> {
        Notes {
            s: Stream::new(&self.bytes, self.class),
            done: false,
        }
    }

    /// Finds the first NT_PRSTATUS note that is large enough to hold an elf_prstatus.
    pub fn find_status(&self, layout: StatusLayout) -> Result<StatusNote> {
        let note = self
            .iter()
            .find(|n| n.ntype == NoteType::PrStatus && n.desc.len() >= layout.size)
            .ok_or_else(|| {
                error!("no NT_PRSTATUS note of at least {} bytes", layout.size);
                CoreError::MissingProcessStatus
            })?;
        debug!("NT_PRSTATUS at note offset {:#x}", note.desc.start);
        Ok(StatusNote {
            offset: note.desc.start,
            layout,
        })
    }

    pub fn status(&self, note: StatusNote) -> ProcessStatus<'_> {
        ProcessStatus {
            bytes: &self.bytes[note.offset..note.offset + note.layout.size],
            layout: note.layout,
        }
    }
}

/// View of an elf_prstatus inside a NoteBuffer.
#[derive(Clone, Copy)]
pub struct ProcessStatus<'a> {
    bytes: &'a [u8],
    layout: StatusLayout,
}

impl<'a> ProcessStatus<'a> {
    /// The signal that terminated the process (si_signo).
    pub fn signal(&self) -> i32 {
        self.word(0) as i32
    }

    /// The signal that was current when the core was written (pr_cursig).
    pub fn current_signal(&self) -> u16 {
        let mut b = [0; 2];
        b.copy_from_slice(&self.bytes[12..14]);
        u16::from_ne_bytes(b)
    }

    /// The process ID of the process that generated this core file.
    pub fn pid(&self) -> i32 {
        self.word(self.layout.pid) as i32
    }

    pub fn num_registers(&self) -> usize {
        self.layout.num_registers()
    }

    /// General purpose registers as laid out in the kernel's user_regs_struct.
    pub fn register(&self, n: usize) -> Option<u64> {
        if n >= self.num_registers() {
            return None;
        }
        let at = self.layout.registers + n * self.layout.register_size;
        match self.layout.register_size {
            8 => {
                let mut b = [0; 8];
                b.copy_from_slice(&self.bytes[at..at + 8]);
                Some(u64::from_ne_bytes(b))
            }
            _ => Some(self.word(at) as u64),
        }
    }

    pub fn registers(self) -> impl Iterator<Item = u64> + 'a {
        (0..self.num_registers()).filter_map(move |n| self.register(n))
    }

    pub fn register_name(&self, n: usize) -> &'static str {
        self.layout.names.get(n).copied().unwrap_or("?")
    }

    pub fn is_rare_register(&self, n: usize) -> bool {
        RARE_REGISTERS.contains(&self.register_name(n))
    }

    /// Returns the instruction address within the currently executing function.
    pub fn ip(&self) -> u64 {
        self.register(self.layout.ip).unwrap_or_default()
    }

    pub fn sp(&self) -> u64 {
        self.register(self.layout.sp).unwrap_or_default()
    }

    /// Name of the program counter, e.g. rip.
    pub fn ip_name(&self) -> &'static str {
        self.register_name(self.layout.ip)
    }

    pub fn sp_name(&self) -> &'static str {
        self.register_name(self.layout.sp)
    }

    fn word(&self, at: usize) -> u32 {
        let mut b = [0; 4];
        b.copy_from_slice(&self.bytes[at..at + 4]);
        u32::from_ne_bytes(b)
    }
}

pub fn signal_name(signal: i32) -> &'static str {
    match signal {
        1 => "SIGHUP", // see https://man7.org/linux/man-pages/man7/signal.7.html
        2 => "SIGINT",
        3 => "SIGQUIT",
        4 => "SIGILL",
        5 => "SIGTRAP",
        6 => "SIGABRT",
        7 => "SIGBUS",
        8 => "SIGFPE",
        9 => "SIGKILL",
        10 => "SIGUSR1",
        11 => "SIGSEGV",
        12 => "SIGUSR2",
        13 => "SIGPIPE",
        14 => "SIGALRM",
        15 => "SIGTERM",
        16 => "SIGSTKFLT",
        17 => "SIGCHLD",
        24 => "SIGXCPU",
        25 => "SIGXFSZ",
        31 => "SIGSYS",
        _ => "unknown signal",
    }
}
