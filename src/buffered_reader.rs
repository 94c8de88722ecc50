use std::io::{self, Read, Seek, SeekFrom};

use anyhow::{Context, Result};
use memchr::memchr;

use crate::error::SortError;
use crate::line_table::{GrowthMode, LineTable};
use crate::line_view::LineView;

/// Reads an unbounded physical line (including its trailing newline, if
/// any) one byte at a time. Only used for the header and the single
/// line-length-estimation probe, where call volume is tiny and a full
/// windowed read would be overkill.
fn read_physical_line<R: Read>(reader: &mut R, out: &mut Vec<u8>) -> io::Result<usize> {
    let mut byte = [0u8; 1];
    let mut n = 0;
    loop {
        let read = reader.read(&mut byte)?;
        if read == 0 {
            break;
        }
        out.push(byte[0]);
        n += 1;
        if byte[0] == b'\n' {
            break;
        }
    }
    Ok(n)
}

/// Windowed stream reader (§4.3, "C3"). Loads large byte windows bounded by
/// a memory budget and carves each window into complete, newline-terminated
/// [`LineView`]s with zero-copy key extraction.
pub(crate) struct BufferedReader<R> {
    reader: R,
    field_delim: u8,
    key_field: usize,
    buf: Vec<u8>,
    buf_len: usize,
    off: usize,
    line_len: usize,
    header_lines: Vec<Vec<u8>>,
}

impl<R: Read + Seek> BufferedReader<R> {
    /// `file_len` is only consulted when `memory_size <= 0`, in which case
    /// the window capacity becomes the whole file (§4.3.3); callers not in
    /// that situation may pass `0`.
    pub(crate) fn new(
        mut reader: R,
        field_delim: u8,
        key_field: usize,
        header: usize,
        memory_size: i64,
        file_len: u64,
    ) -> Result<BufferedReader<R>> {
        let mut header_lines = Vec::with_capacity(header);
        for _ in 0..header {
            let mut line = Vec::new();
            let n = read_physical_line(&mut reader, &mut line).context("reading header line")?;
            if n == 0 {
                break;
            }
            header_lines.push(line);
        }

        // line-length estimation: read one more physical line, remember
        // its length, then rewind so the body read below starts at its
        // first byte again.
        let mut probe = Vec::new();
        let probe_len =
            read_physical_line(&mut reader, &mut probe).context("estimating line length")?;
        if probe_len == 0 {
            return Err(SortError::EmptyBody { header_lines }.into());
        }
        reader
            .seek(SeekFrom::Current(-(probe_len as i64)))
            .context("rewind after line-length estimation")?;
        let line_len = probe_len;

        let capacity: usize = if memory_size <= 0 {
            file_len as usize
        } else {
            let memory_size = memory_size as usize;
            let line_view_records = memory_size / line_len;
            memory_size.saturating_sub(line_view_records * std::mem::size_of::<LineView<'static>>())
        };

        Ok(BufferedReader {
            reader,
            field_delim,
            key_field,
            buf: vec![0u8; capacity],
            buf_len: 0,
            off: 0,
            line_len,
            header_lines,
        })
    }

    pub(crate) fn header_lines(&self) -> &[Vec<u8>] {
        &self.header_lines
    }

    pub(crate) fn line_len(&self) -> usize {
        self.line_len
    }

    /// The currently valid window: the bytes returned by the most recent
    /// [`Self::read_lines`] call. Used by [`crate::run::Run`] to resolve
    /// byte-offset line spans back into slices without holding a borrow
    /// across calls.
    pub(crate) fn window(&self) -> &[u8] {
        &self.buf[..self.buf_len]
    }

    /// The window buffer's base address, as a plain integer rather than a
    /// borrow. The buffer never reallocates after construction, so this
    /// stays valid for the reader's whole lifetime and can be captured
    /// ahead of a [`Self::read_lines`] call without holding any borrow of
    /// `self` across it.
    pub(crate) fn buffer_base(&self) -> usize {
        self.buf.as_ptr() as usize
    }

    /// Rough capacity, in records, to pre-size a [`LineTable`] built from
    /// one window: `window_bytes / estimated_line_len`.
    pub(crate) fn estimated_line_capacity(&self) -> usize {
        self.buf.len() / self.line_len.max(1)
    }

    /// Reads the next window and carves it into complete lines. Returns an
    /// empty table once there is no more data (§4.3's "if len <= 0: do
    /// nothing").
    ///
    /// The returned table borrows this reader's window buffer: the borrow
    /// checker ties its lifetime to this call, so those views are provably
    /// invalid (because Rust won't let them outlive `self`) by the time a
    /// second call to `read_lines` could run.
    pub(crate) fn read_lines(&mut self) -> Result<LineTable<'_>> {
        if self.off > 0 {
            let start = self.buf_len - self.off;
            self.buf.copy_within(start..self.buf_len, 0);
        }

        let capacity = self.buf.len();
        let mut total_read = 0usize;
        loop {
            let n = self
                .reader
                .read(&mut self.buf[self.off + total_read..capacity])
                .context("reading input window")?;
            if n == 0 {
                break;
            }
            total_read += n;
            if self.off + total_read >= capacity {
                break;
            }
        }

        let mut table = LineTable::with_capacity(GrowthMode::Geometric, self.estimated_line_capacity());

        if total_read == 0 {
            self.buf_len = self.off;
            return Ok(table);
        }

        self.buf_len = self.off + total_read;

        let mut s = 0usize;
        while let Some(idx) = memchr(b'\n', &self.buf[s..self.buf_len]) {
            let end = s + idx + 1;
            table.push(LineView::new(&self.buf[s..end], self.field_delim, self.key_field));
            s = end;
        }

        if s == 0 && self.buf_len == capacity {
            return Err(SortError::LineTooLong { capacity }.into());
        }

        self.off = self.buf_len - s;
        Ok(table)
    }
}
