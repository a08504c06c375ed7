//! Small synthetic core files for the unit tests of both the library and the binary.
//! Everything is written in the host's byte order.
use std::fs;
use std::path::{Path, PathBuf};

pub const PT_LOAD: u32 = 1;
pub const PT_NOTE: u32 = 4;

pub const PF_X: u32 = 0x1;
pub const PF_W: u32 = 0x2;
pub const PF_R: u32 = 0x4;

pub const NT_PRSTATUS: u32 = 1;
pub const NT_PRPSINFO: u32 = 3;

pub const EM_AARCH64: u16 = 183;
pub const EM_ARM: u16 = 40;

/// Field offsets within an Elf64_Phdr, for patching built cores.
pub const P_OFFSET64: usize = 8;
pub const P_FILESZ64: usize = 32;

/// Signal number written into every prstatus (SIGSEGV).
pub const SIGNAL: i32 = 11;

pub struct FixtureSegment {
    pub stype: u32,
    pub flags: u32,
    pub vaddr: u64,
    pub data: Vec<u8>,
    pub mem_size: u64,
}

pub struct CoreBuilder {
    sixty_four_bit: bool,
    machine: u16,
    segments: Vec<FixtureSegment>,
}

impl CoreBuilder {
    pub fn new(sixty_four_bit: bool) -> Self {
        CoreBuilder {
            sixty_four_bit,
            machine: if sixty_four_bit { 62 } else { 3 },
            segments: Vec::new(),
        }
    }

    /// Overrides e_machine, which defaults to x86-64 or x86.
    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    /// Adds a PT_NOTE segment holding a "CORE" NT_PRSTATUS note.
    pub fn with_status(self, pid: i32, registers: &[u64]) -> Self {
        let desc = prstatus(self.sixty_four_bit, pid, registers);
        self.note(note_record(b"CORE\0", NT_PRSTATUS, &desc))
    }

    /// Adds a PT_NOTE segment with arbitrary (already encoded) note records.
    pub fn note(self, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        self.segment(PT_NOTE, 0, 0, data, size)
    }

    pub fn load(self, vaddr: u64, flags: u32, data: &[u8], mem_size: u64) -> Self {
        self.segment(PT_LOAD, flags, vaddr, data.to_vec(), mem_size)
    }

    pub fn segment(
        mut self,
        stype: u32,
        flags: u32,
        vaddr: u64,
        data: Vec<u8>,
        mem_size: u64,
    ) -> Self {
        self.segments.push(FixtureSegment {
            stype,
            flags,
            vaddr,
            data,
            mem_size,
        });
        self
    }

    pub fn header_size(&self) -> u64 {
        if self.sixty_four_bit { 64 } else { 52 }
    }

    pub fn ph_size(&self) -> u64 {
        if self.sixty_four_bit { 56 } else { 32 }
    }

    /// File offset of each segment's data in the built file.
    pub fn data_offsets(&self) -> Vec<u64> {
        let mut offset = self.header_size() + self.ph_size() * self.segments.len() as u64;
        let mut offsets = Vec::new();
        for segment in self.segments.iter() {
            offsets.push(offset);
            offset = align4(offset + segment.data.len() as u64);
        }
        offsets
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.put_header(&mut out);
        let offsets = self.data_offsets();
        for (segment, &offset) in self.segments.iter().zip(offsets.iter()) {
            self.put_ph(&mut out, segment, offset);
        }
        for (segment, &offset) in self.segments.iter().zip(offsets.iter()) {
            out.resize(offset as usize, 0);
            out.extend_from_slice(&segment.data);
        }
        out
    }

    pub fn write(&self, dir: &Path) -> PathBuf {
        write_file(dir, "core", &self.build())
    }

    fn put_header(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(b"\x7fELF");
        out.push(if self.sixty_four_bit { 2 } else { 1 });
        out.push(if cfg!(target_endian = "little") { 1 } else { 2 });
        out.push(1); // EI_VERSION
        out.resize(16, 0);
        out.extend_from_slice(&4u16.to_ne_bytes()); // ET_CORE
        out.extend_from_slice(&self.machine.to_ne_bytes());
        out.extend_from_slice(&1u32.to_ne_bytes());
        self.put_addr(out, 0); // e_entry
        self.put_addr(out, self.header_size()); // e_phoff
        self.put_addr(out, 0); // e_shoff
        out.extend_from_slice(&0u32.to_ne_bytes()); // e_flags
        out.extend_from_slice(&(self.header_size() as u16).to_ne_bytes());
        out.extend_from_slice(&(self.ph_size() as u16).to_ne_bytes());
        out.extend_from_slice(&(self.segments.len() as u16).to_ne_bytes());
        out.extend_from_slice(&0u16.to_ne_bytes()); // e_shentsize
        out.extend_from_slice(&0u16.to_ne_bytes()); // e_shnum
        out.extend_from_slice(&0u16.to_ne_bytes()); // e_shstrndx
        assert_eq!(out.len() as u64, self.header_size());
    }

    fn put_ph(&self, out: &mut Vec<u8>, segment: &FixtureSegment, offset: u64) {
        let file_size = segment.data.len() as u64;
        out.extend_from_slice(&segment.stype.to_ne_bytes());
        if self.sixty_four_bit {
            out.extend_from_slice(&segment.flags.to_ne_bytes());
        }
        self.put_addr(out, offset);
        self.put_addr(out, segment.vaddr);
        self.put_addr(out, 0); // p_paddr
        self.put_addr(out, file_size);
        self.put_addr(out, segment.mem_size);
        if !self.sixty_four_bit {
            out.extend_from_slice(&segment.flags.to_ne_bytes());
        }
        self.put_addr(out, 0x1000); // p_align
    }

    fn put_addr(&self, out: &mut Vec<u8>, value: u64) {
        if self.sixty_four_bit {
            out.extend_from_slice(&value.to_ne_bytes());
        } else {
            out.extend_from_slice(&(value as u32).to_ne_bytes());
        }
    }
}

/// Encodes one note: namesz, descsz, type, padded name, padded descriptor.
pub fn note_record(name: &[u8], ntype: u32, desc: &[u8]) -> Vec<u8> {
    let mut note = Vec::new();
    note.extend_from_slice(&(name.len() as u32).to_ne_bytes());
    note.extend_from_slice(&(desc.len() as u32).to_ne_bytes());
    note.extend_from_slice(&ntype.to_ne_bytes());
    note.extend_from_slice(name);
    note.resize(align4(note.len() as u64) as usize, 0);
    note.extend_from_slice(desc);
    note.resize(align4(note.len() as u64) as usize, 0);
    note
}

/// An elf_prstatus descriptor laid out as on x86 (32-bit) or x86-64 Linux.
pub fn prstatus(sixty_four_bit: bool, pid: i32, registers: &[u64]) -> Vec<u8> {
    if sixty_four_bit {
        encode_prstatus(336, 32, 112, 27, 8, pid, registers)
    } else {
        encode_prstatus(144, 24, 72, 17, 4, pid, registers)
    }
}

/// An elf_prstatus descriptor laid out as on AArch64 Linux: x0-x30, sp, pc, pstate.
pub fn aarch64_prstatus(pid: i32, registers: &[u64]) -> Vec<u8> {
    encode_prstatus(392, 32, 112, 34, 8, pid, registers)
}

fn encode_prstatus(
    size: usize,
    pid_at: usize,
    regs_at: usize,
    num_regs: usize,
    width: usize,
    pid: i32,
    registers: &[u64],
) -> Vec<u8> {
    let mut desc = vec![0u8; size];
    desc[0..4].copy_from_slice(&SIGNAL.to_ne_bytes()); // si_signo
    desc[12..14].copy_from_slice(&(SIGNAL as u16).to_ne_bytes()); // pr_cursig
    desc[pid_at..pid_at + 4].copy_from_slice(&pid.to_ne_bytes());
    for (i, &value) in registers.iter().take(num_regs).enumerate() {
        let at = regs_at + i * width;
        if width == 8 {
            desc[at..at + 8].copy_from_slice(&value.to_ne_bytes());
        } else {
            desc[at..at + 4].copy_from_slice(&(value as u32).to_ne_bytes());
        }
    }
    desc
}

/// Overwrites one 64-bit field of program header index in a built ELF64 core.
pub fn patch_ph64(bytes: &mut [u8], index: usize, field: usize, value: u64) {
    let at = 64 + 56 * index + field;
    bytes[at..at + 8].copy_from_slice(&value.to_ne_bytes());
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

fn align4(n: u64) -> u64 {
    (n + 3) & !3
}
