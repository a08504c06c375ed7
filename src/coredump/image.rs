use super::BackingFile;
use crate::elf::{
    ElfClass, ElfHeader, Note, NoteBuffer, Notes, ProcessStatus, Reader, Segment, SegmentType,
    StatusLayout, StatusNote, VirtualAddr,
};
use crate::error::{CoreError, Result};
use memmap2::Mmap;
use rangemap::RangeMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info_span, trace, warn};

/// A loaded core file: its segments, its notes, and any backing files that have been
/// attached. Everything is released when this is dropped.
pub struct CoreImage {
    pub(super) path: PathBuf,
    pub(super) file: File,
    pub(super) reader: Reader,
    pub(super) header: ElfHeader,
    pub(super) segments: Vec<Segment>,
    /// Parallel to segments.
    pub(super) backings: Vec<Option<BackingFile>>,
    pub(super) loads: RangeMap<u64, usize>,
    pub(super) notes: NoteBuffer,
    pub(super) status: StatusNote,
}

impl CoreImage {
    /// Loads and validates the core at path. Fails unless the core has a usable
    /// NT_PRSTATUS note.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let _span = info_span!("core", path = %path.display()).entered();

        let file = File::open(&path).map_err(|source| {
            error!("can't open core: {source}");
            CoreError::Open {
                path: path.clone(),
                source,
            }
        })?;

        // This is unsafe because it has undefined behavior if the underlying file is
        // modified while the memory map is in use.
        let bytes = unsafe { Mmap::map(&file) }.map_err(|source| {
            error!("can't map core: {source}");
            CoreError::Map {
                path: path.clone(),
                source,
            }
        })?;

        let header = ElfHeader::new(&bytes)?;
        if !header.is_core() {
            warn!("ELF type is {} rather than core", header.stype());
        }
        let reader = Reader::new(bytes, header.class);
        let segments = Segment::read_table(&reader, &header)?;
        let notes = NoteBuffer::read(&reader, &segments)?;
        let layout = StatusLayout::for_header(&header)?;
        let status = notes.find_status(layout)?;
        let loads = index_loads(&segments);
        let backings = segments.iter().map(|_| None).collect();
        debug!(
            "loaded {} segments, {} of them loads, pid {}",
            segments.len(),
            loads.iter().count(),
            notes.status(status).pid()
        );

        Ok(CoreImage {
            path,
            file,
            reader,
            header,
            segments,
            backings,
            loads,
            notes,
            status,
        })
    }

    /// Only used for messages.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn class(&self) -> ElfClass {
        self.header.class
    }

    pub fn header(&self) -> &ElfHeader {
        &self.header
    }

    /// Number of segments, always the header's e_phnum.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// The file attached to segment index with associate, if any.
    pub fn backing(&self, index: usize) -> Option<&BackingFile> {
        self.backings.get(index).and_then(Option::as_ref)
    }

    /// Registers, pid, and signal of the thread that crashed.
    pub fn process_status(&self) -> ProcessStatus<'_> {
        self.notes.status(self.status)
    }

    pub fn notes(&self) -> Notes<'_> {
        self.notes.iter()
    }

    pub fn note_bytes(&self, note: &Note) -> &[u8] {
        self.notes.bytes(note)
    }

    /// The load segment that contains addr.
    pub fn find_segment(&self, addr: u64) -> Option<(usize, &Segment)> {
        self.loads
            .get(&addr)
            .map(|&index| (index, &self.segments[index]))
    }

    /// Fills buf with the process's memory starting at addr. Bytes come from the core if
    /// they were dumped, otherwise from the segment's backing file.
    pub fn read_memory(&self, addr: u64, buf: &mut [u8]) -> Result<()> {
        let size = buf.len();
        let unmapped = || CoreError::Unmapped { addr, size };
        let (index, segment) = self.find_segment(addr).ok_or_else(unmapped)?;
        let start = segment
            .vbytes
            .delta(VirtualAddr(addr))
            .ok_or_else(unmapped)?;
        let end = start
            .checked_add(size as u64)
            .filter(|&end| end <= segment.mem_size())
            .ok_or_else(unmapped)?;

        if end <= segment.file_size() {
            let offset = segment
                .obytes
                .start
                .0
                .checked_add(start)
                .ok_or(CoreError::ShortRead {
                    offset: segment.obytes.start.0,
                    wanted: end,
                })?;
            let bytes = self.reader.slice(offset, size as u64)?;
            buf.copy_from_slice(bytes);
        } else if let Some(backing) = self.backing(index)
            && end <= backing.size
        {
            buf.copy_from_slice(&backing.bytes()[start as usize..end as usize]);
        } else {
            trace!("{size} bytes at {addr:#x} in segment {index} weren't dumped");
            return Err(unmapped());
        }
        Ok(())
    }
}

impl fmt::Debug for CoreImage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CoreImage")
            .field("path", &self.path)
            .field("class", &self.header.class)
            .field("segments", &self.segments.len())
            .finish_non_exhaustive()
    }
}

impl Drop for CoreImage {
    fn drop(&mut self) {
        let backed = self.backings.iter().flatten().count();
        debug!(
            "releasing '{}' and {backed} backing files",
            self.path.display()
        );
    }
}

fn index_loads(segments: &[Segment]) -> RangeMap<u64, usize> {
    let mut loads = RangeMap::new();
    for (i, segment) in segments.iter().enumerate() {
        if segment.stype != SegmentType::Load {
            continue;
        }
        let range = segment.vbytes.start.0..segment.vbytes.end();
        if range.is_empty() {
            continue;
        }
        if loads.overlaps(&range) {
            warn!("load segment {i} overlaps an earlier load segment");
        }
        loads.insert(range, i);
    }
    loads
}
