use super::ElfClass;
use crate::error::{CoreError, Result};
use memmap2::Mmap;

/// Read-only view of a whole core file. The header has already been classified so all
/// multi-byte values are in the host's byte order.
pub struct Reader {
    pub class: ElfClass,
    bytes: Mmap,
}

impl Reader {
    pub fn new(bytes: Mmap, class: ElfClass) -> Self {
        Reader { class, bytes }
    }

    /// Note that these functions all return a Result: core files are often truncated
    /// and running off the end is a short read, not a panic.
    pub fn slice(&self, offset: u64, size: u64) -> Result<&[u8]> {
        let short = || CoreError::ShortRead {
            offset,
            wanted: size,
        };
        let start = usize::try_from(offset).map_err(|_| short())?;
        let size = usize::try_from(size).map_err(|_| short())?;
        let end = start.checked_add(size).ok_or_else(short)?;
        self.bytes.get(start..end).ok_or_else(short)
    }

    pub fn stream(&self, offset: u64) -> Result<Stream<'_>> {
        let short = || CoreError::ShortRead { offset, wanted: 1 };
        let start = usize::try_from(offset).map_err(|_| short())?;
        let bytes = self.bytes.get(start..).ok_or_else(short)?;
        Ok(Stream::with_base(bytes, self.class, offset))
    }
}

/// Cursor over a byte slice, either part of the mapped core or the note buffer.
pub struct Stream<'a> {
    bytes: &'a [u8],
    class: ElfClass,
    base: u64,
    pub offset: usize,
}

impl<'a> Stream<'a> {
    pub fn new(bytes: &'a [u8], class: ElfClass) -> Self {
        Stream::with_base(bytes, class, 0)
    }

    /// base is only used so that errors report file offsets rather than slice offsets.
    pub fn with_base(bytes: &'a [u8], class: ElfClass, base: u64) -> Self {
        Stream {
            bytes,
            class,
            base,
            offset: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }

    pub fn read_bytes(&mut self, size: usize) -> Result<&'a [u8]> {
        let bytes = self
            .offset
            .checked_add(size)
            .and_then(|end| self.bytes.get(self.offset..end))
            .ok_or(CoreError::ShortRead {
                offset: self.base + self.offset as u64,
                wanted: size as u64,
            })?;
        self.offset += size;
        Ok(bytes)
    }

    pub fn skip(&mut self, size: usize) -> Result<()> {
        self.read_bytes(size).map(|_| ())
    }

    pub fn read_half(&mut self) -> Result<u16> {
        Ok(u16::from_ne_bytes(self.read_array()?))
    }

    pub fn read_word(&mut self) -> Result<u32> {
        Ok(u32::from_ne_bytes(self.read_array()?))
    }

    pub fn read_xword(&mut self) -> Result<u64> {
        Ok(u64::from_ne_bytes(self.read_array()?))
    }

    /// Read either a u32 or u64 word depending on whether the core file is 64-bit.
    /// But, for sanity, always return the result as 64 bits.
    pub fn read_addr(&mut self) -> Result<u64> {
        match self.class {
            ElfClass::Elf64 => self.read_xword(),
            ElfClass::Elf32 => Ok(self.read_word()? as u64),
        }
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut array = [0; N];
        array.copy_from_slice(bytes);
        Ok(array)
    }
}
