use std::io::{self, Write};

use crate::line_view::LineView;

/// Growth discipline for a [`LineTable`]. Geometric growth amortises
/// repeated `add` calls during divide-phase reads; exact growth is used for
/// the bucketed-sort scratch tables (§4.4) where the final size is known
/// up front via the first-byte histogram, and over-allocating would waste
/// the memory budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum GrowthMode {
    Geometric,
    Exact,
}

const GEOMETRIC_INITIAL_CAPACITY: usize = 10;

/// An ordered, growable sequence of [`LineView`]s sharing one host buffer.
#[derive(Debug)]
pub(crate) struct LineTable<'a> {
    lines: Vec<LineView<'a>>,
    growth: GrowthMode,
}

impl<'a> LineTable<'a> {
    pub(crate) fn new(growth: GrowthMode) -> LineTable<'a> {
        let capacity = match growth {
            GrowthMode::Geometric => GEOMETRIC_INITIAL_CAPACITY,
            GrowthMode::Exact => 0,
        };
        LineTable {
            lines: Vec::with_capacity(capacity),
            growth,
        }
    }

    pub(crate) fn with_capacity(growth: GrowthMode, capacity: usize) -> LineTable<'a> {
        let capacity = match growth {
            GrowthMode::Geometric => capacity.max(GEOMETRIC_INITIAL_CAPACITY),
            GrowthMode::Exact => capacity,
        };
        LineTable {
            lines: Vec::with_capacity(capacity),
            growth,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lines.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub(crate) fn as_slice(&self) -> &[LineView<'a>] {
        &self.lines
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [LineView<'a>] {
        &mut self.lines
    }

    /// Appends a line view, growing the backing storage according to
    /// `self.growth` if it is at capacity. Under `GrowthMode::Geometric`
    /// this reallocates in `capacity + capacity/2` steps (§3); under
    /// `GrowthMode::Exact` the caller is expected to have pre-sized the
    /// table, so this should never need to reallocate in practice.
    pub(crate) fn push(&mut self, line: LineView<'a>) {
        if self.lines.len() == self.lines.capacity() {
            match self.growth {
                GrowthMode::Geometric => {
                    let grown = self.lines.capacity() + self.lines.capacity() / 2;
                    let grown = grown.max(GEOMETRIC_INITIAL_CAPACITY);
                    self.lines.reserve(grown - self.lines.len());
                }
                GrowthMode::Exact => {
                    self.lines.reserve(1);
                }
            }
        }
        self.lines.push(line);
    }

    pub(crate) fn clear(&mut self) {
        self.lines.clear();
        self.lines.shrink_to_fit();
    }

    pub(crate) fn sort_threads(&mut self, threads: usize) {
        crate::bucket_sort::sort(&mut self.lines, threads);
    }

    /// Writes every line's `value` bytes, in table order, to `out`. Fails
    /// if any write is short.
    pub(crate) fn write_all<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for line in &self.lines {
            out.write_all(line.value())?;
        }
        Ok(())
    }
}
