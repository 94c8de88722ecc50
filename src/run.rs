use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result};

use crate::buffered_reader::BufferedReader;
use crate::line_table::LineTable;

/// A line's value and key as byte ranges into a [`Run`]'s own buffered
/// reader window, rather than a borrowed [`crate::line_view::LineView`].
/// This is what lets `Run` stay lifetime-free across the window refills
/// a merge performs (§4.5).
#[derive(Clone, Debug)]
struct LineSpan {
    value: Range<usize>,
    key: Range<usize>,
}

/// A sorted run spilled to an anonymous temp file ("C5", §4.5).
///
/// During divide, a run is nothing more than a [`LineTable`] about to be
/// sorted and written out - that table is transient and lives only on the
/// driver's stack (§3's `[NEW]` note). `Run` itself only comes into being
/// once the table has been spilled, and from then on owns just the spill
/// file and, once merging starts, a read-side [`BufferedReader`] plus a
/// cursor into its current window.
pub(crate) struct Run {
    file: File,
    reader: Option<BufferedReader<File>>,
    spans: Vec<LineSpan>,
    cursor: usize,
}

impl Run {
    /// Sorts `table` with `threads` workers and spills it, in sorted
    /// order, to a fresh anonymous temp file under `tmp_dir`.
    pub(crate) fn sort_write(mut table: LineTable<'_>, threads: usize, tmp_dir: &Path) -> Result<Run> {
        table.sort_threads(threads);
        let mut file = tempfile::tempfile_in(tmp_dir).context("creating spill file for run")?;
        table.write_all(&mut file).context("writing sorted run to spill file")?;
        Ok(Run {
            file,
            reader: None,
            spans: Vec::new(),
            cursor: 0,
        })
    }

    /// Rewinds the spill file, installs a fresh [`BufferedReader`] budgeted
    /// at `memory_share` bytes (no header - the spill stream carries none),
    /// and seeds the first window.
    pub(crate) fn prepare_read(&mut self, field_delim: u8, key_field: usize, memory_share: i64) -> Result<()> {
        self.file.seek(SeekFrom::Start(0)).context("rewinding run spill file")?;
        let file = self.file.try_clone().context("cloning run spill file handle")?;
        let file_len = file.metadata().map(|m| m.len()).unwrap_or(0);
        let reader = BufferedReader::new(file, field_delim, key_field, 0, memory_share, file_len)
            .context("opening run for merge")?;
        self.reader = Some(reader);
        self.refill_spans()
    }

    fn refill_spans(&mut self) -> Result<()> {
        let reader = self.reader.as_mut().expect("prepare_read must run before refill");
        let base = reader.buffer_base();
        let table = reader.read_lines().context("reading next window of a run")?;
        self.spans = table
            .as_slice()
            .iter()
            .map(|line| {
                let value = line.value();
                let key = line.key();
                let v_start = value.as_ptr() as usize - base;
                let k_start = key.as_ptr() as usize - base;
                LineSpan {
                    value: v_start..v_start + value.len(),
                    key: k_start..k_start + key.len(),
                }
            })
            .collect();
        self.cursor = 0;
        Ok(())
    }

    /// The current line's key bytes, or `None` once the run is exhausted.
    /// Used by the merge loop's minimum-selection (§4.6.2).
    pub(crate) fn current_key(&self) -> Option<&[u8]> {
        let reader = self.reader.as_ref()?;
        self.spans.get(self.cursor).map(|s| &reader.window()[s.key.clone()])
    }

    /// The current line's full value bytes (including its trailing
    /// newline), or `None` once the run is exhausted.
    pub(crate) fn current_value(&self) -> Option<&[u8]> {
        let reader = self.reader.as_ref()?;
        self.spans.get(self.cursor).map(|s| &reader.window()[s.value.clone()])
    }

    /// Advances past the current line, refilling the window (and thus
    /// recomputing spans against the new window) if the batch just ran out.
    pub(crate) fn advance(&mut self) -> Result<()> {
        self.cursor += 1;
        if self.cursor >= self.spans.len() {
            self.refill_spans()?;
        }
        Ok(())
    }

    /// Copies this run's entire spilled body to `out` verbatim - the
    /// single-run fast path of §4.6.3, where the merge phase can be
    /// skipped because one run's sorted bytes already are the sorted body.
    pub(crate) fn copy_sorted_to<W: Write>(&mut self, out: &mut W) -> Result<()> {
        self.file.seek(SeekFrom::Start(0)).context("rewinding run spill file")?;
        io::copy(&mut self.file, out).context("copying single run to output")?;
        Ok(())
    }
}
