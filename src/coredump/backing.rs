//! Backing files supply the bytes of segments the kernel didn't bother to dump, which
//! is usually the read-only code of the exe and its shared libraries.
use super::CoreImage;
use crate::elf::{Reader, Segment};
use crate::error::{CoreError, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, info_span, warn};

#[derive(Debug)]
pub struct BackingFile {
    /// Only used for messages.
    pub path: PathBuf,
    pub size: u64,
    file: File,
    bytes: Option<Mmap>, // None for empty files
}

impl BackingFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| {
            error!("can't open '{}': {source}", path.display());
            CoreError::Open {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let size = file
            .metadata()
            .map_err(|source| {
                error!("can't stat '{}': {source}", path.display());
                CoreError::Stat {
                    path: path.to_path_buf(),
                    source,
                }
            })?
            .len();

        let bytes = if size == 0 {
            None
        } else {
            // This is unsafe because it has undefined behavior if the underlying file is
            // modified while the memory map is in use.
            let bytes = unsafe { Mmap::map(&file) }.map_err(|source| {
                error!("can't map '{}': {source}", path.display());
                CoreError::Map {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            Some(bytes)
        };

        Ok(BackingFile {
            path: path.to_path_buf(),
            size,
            file,
            bytes,
        })
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn bytes(&self) -> &[u8] {
        self.bytes.as_deref().unwrap_or_default()
    }
}

impl CoreImage {
    /// Uses the file at path to supply the bytes of segment index. The segment's stored
    /// bytes, if any, are compared against the start of the file but a mismatch is only
    /// logged. On failure the segment is left without a backing file.
    pub fn associate(&mut self, index: usize, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let _span = info_span!("associate", index, path = %path.display()).entered();

        let count = self.segments.len();
        let segment = self.segments.get(index).ok_or_else(|| {
            error!("there is no segment {index} in this core");
            CoreError::NoSuchSegment { index, count }
        })?;
        if let Some(old) = &self.backings[index] {
            error!(
                "backing file '{}' already added to segment {index}",
                old.path.display()
            );
            return Err(CoreError::AlreadyBacked { index });
        }

        let backing = BackingFile::open(path)?;
        if !segment.is_code() {
            info!(
                "segment {index} is not r-x: flags are {:#x}",
                segment.flags
            );
        }
        if backing.size > segment.mem_size() {
            // expected, e.g. a shared library is mapped in several pieces
            debug!(
                "segment {index} is {} bytes, file is larger: {} bytes",
                segment.mem_size(),
                backing.size
            );
        }
        if segment.file_size() != 0 {
            compare(&self.reader, index, segment, &backing)?;
        }

        self.segments[index].backing_size = backing.size;
        self.backings[index] = Some(backing);
        Ok(())
    }
}

fn compare(
    reader: &Reader,
    index: usize,
    segment: &Segment,
    backing: &BackingFile,
) -> Result<()> {
    let wanted = segment.file_size();
    let core = reader
        .slice(segment.obytes.start.0, wanted)
        .inspect_err(|err| error!("error reading segment {index} from the core: {err}"))?;
    let file = backing.bytes().get(..core.len()).ok_or_else(|| {
        error!(
            "error reading {wanted} bytes from '{}'",
            backing.path.display()
        );
        CoreError::BackingTooShort {
            path: backing.path.clone(),
            wanted,
            found: backing.size,
        }
    })?;

    if core == file {
        debug!("segment {index}: first {wanted} bytes in core dump and in file match");
    } else {
        warn!("segment {index}: first {wanted} bytes in core dump and in file do not match");
    }
    Ok(())
}
