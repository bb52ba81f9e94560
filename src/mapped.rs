// SPDX-License-Identifier: MPL-2.0

//! Memory-mapped file source
//!
//! The input file is mapped read-only once and handed out in fixed-size
//! chunks. Buffers reference the mapping directly, nothing is copied.

use std::fs::File;
use std::num::NonZeroUsize;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;

use crate::CAT;
use crate::error::PipelineError;
use crate::feeder::{BufferSource, FrameClock};

/// Splits `0..len` into consecutive ranges of at most `chunk_size` bytes.
///
/// The offset only moves forward and never passes `len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkCursor {
    offset: usize,
    len: usize,
    chunk_size: NonZeroUsize,
}

impl ChunkCursor {
    pub fn new(len: usize, chunk_size: usize) -> Result<Self, PipelineError> {
        let chunk_size = NonZeroUsize::new(chunk_size).ok_or(PipelineError::ZeroChunkSize)?;
        Ok(Self {
            offset: 0,
            len,
            chunk_size,
        })
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size.get()
    }

    pub fn remaining(&self) -> usize {
        self.len - self.offset
    }

    pub fn is_exhausted(&self) -> bool {
        self.offset == self.len
    }

    /// Shrink the end so only whole chunks remain. Returns the bytes dropped.
    pub fn truncate_to_whole_chunks(&mut self) -> usize {
        let dropped = self.len % self.chunk_size;
        self.len -= dropped;
        self.offset = self.offset.min(self.len);
        dropped
    }

    /// Shrink the end so at most `chunks` further chunks are produced.
    pub fn limit_chunks(&mut self, chunks: usize) {
        let end = self
            .offset
            .saturating_add(chunks.saturating_mul(self.chunk_size.get()));
        self.len = self.len.min(end);
    }
}

impl Iterator for ChunkCursor {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        if self.is_exhausted() {
            return None;
        }
        let start = self.offset;
        self.offset += self.remaining().min(self.chunk_size.get());
        Some(start..self.offset)
    }
}

// A window into the shared mapping, kept alive by the buffer wrapping it
struct MappedChunk {
    map: Arc<Mmap>,
    range: Range<usize>,
}

impl AsRef<[u8]> for MappedChunk {
    fn as_ref(&self) -> &[u8] {
        &self.map[self.range.clone()]
    }
}

/// A [`BufferSource`] reading a file through a read-only memory map.
pub struct MappedFile {
    // None for an empty file, which cannot be mapped
    map: Option<Arc<Mmap>>,
    cursor: ChunkCursor,
    clock: Option<FrameClock>,
}

impl MappedFile {
    pub fn open(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let open_error = |source| PipelineError::Open {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(open_error)?;
        let len = file.metadata().map_err(open_error)?.len() as usize;
        let cursor = ChunkCursor::new(len, chunk_size)?;

        let map = if len == 0 {
            gst::warning!(CAT, "Input '{}' is empty", path.display());
            None
        } else {
            // SAFETY: the file must not be truncated or modified while mapped
            let map = unsafe { Mmap::map(&file) }.map_err(open_error)?;
            Some(Arc::new(map))
        };

        gst::debug!(
            CAT,
            "Mapped '{}': {} bytes in chunks of {}",
            path.display(),
            len,
            chunk_size
        );

        Ok(Self {
            map,
            cursor,
            clock: None,
        })
    }

    /// Drop a trailing partial chunk so every buffer has the full chunk size.
    pub fn whole_chunks(mut self) -> Self {
        let dropped = self.cursor.truncate_to_whole_chunks();
        if dropped > 0 {
            gst::warning!(
                CAT,
                "Ignoring {} trailing bytes, not a whole chunk of {}",
                dropped,
                self.cursor.chunk_size()
            );
        }
        self
    }

    /// Stop after `chunks` buffers.
    pub fn with_limit(mut self, chunks: Option<u64>) -> Self {
        if let Some(chunks) = chunks {
            self.cursor
                .limit_chunks(usize::try_from(chunks).unwrap_or(usize::MAX));
        }
        self
    }

    /// Timestamp each chunk as one frame at `framerate`.
    pub fn with_framerate(mut self, framerate: gst::Fraction) -> Self {
        self.clock = Some(FrameClock::new(framerate));
        self
    }

    /// Bytes that will be read in total.
    pub fn len(&self) -> usize {
        self.cursor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.is_empty()
    }

    /// Read offset into the file.
    pub fn offset(&self) -> usize {
        self.cursor.offset()
    }
}

impl BufferSource for MappedFile {
    fn next_buffer(&mut self) -> Option<gst::Buffer> {
        let map = self.map.as_ref()?;
        let range = self.cursor.next()?;
        let offset = range.start as u64;
        let offset_end = range.end as u64;

        let mut buffer = gst::Buffer::from_slice(MappedChunk {
            map: Arc::clone(map),
            range,
        });
        if let Some(buffer) = buffer.get_mut() {
            buffer.set_offset(offset);
            buffer.set_offset_end(offset_end);
            if let Some(clock) = self.clock.as_mut() {
                clock.stamp(buffer);
            }
        }
        Some(buffer)
    }
}
