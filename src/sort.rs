use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use rlimit::Resource;

use crate::config::Config;
use crate::line_view::{compare_keys, LineView};
use crate::memory_budget::MemoryBudget;
use crate::run::Run;
use crate::buffered_reader::BufferedReader;

/// Sort a delimited text file by a single key field, under a bounded memory budget ("C6/C8" -
/// the external sort driver and its public builder surface).
///
/// # Examples
/// ```
/// use std::path::PathBuf;
/// use extsort_fields::sort::Sort;
///
/// fn sort_records(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
///     let mut text_file_sort = Sort::new(input, output);
///     // set the field delimiter and the zero-based key field to sort on. Defaults are TAB and 0.
///     text_file_sort.with_field_delim(b';');
///     text_file_sort.with_key_field(1);
///     // set the directory for intermediate spilled runs. Defaults to std::env::temp_dir().
///     text_file_sort.with_tmp_dir(tmp);
///     text_file_sort.sort()
/// }
/// ```
pub struct Sort {
    input_file: PathBuf,
    output_file: PathBuf,
    tmp_dir: PathBuf,
    field_delim: u8,
    key_field: usize,
    header: usize,
    memory_size: i64,
    nr_threads: usize,
}

impl Sort {
    /// Create a default Sort definition.
    ///
    /// * the default field delimiter is a TAB (`b'\t'`)
    /// * the default key field is 0 - the first field
    /// * the default header count is 0 - no lines are passed through verbatim
    /// * the default memory budget is 0, which is interpreted as "use the input file size"
    /// * the default thread count is the number of available CPU cores
    /// * the default directory for intermediate spilled runs is `std::env::temp_dir()`
    pub fn new(input_file: PathBuf, output_file: PathBuf) -> Sort {
        Sort {
            input_file,
            output_file,
            tmp_dir: std::env::temp_dir(),
            field_delim: b'\t',
            key_field: 0,
            header: 0,
            memory_size: 0,
            nr_threads: 0,
        }
    }

    /// Set the directory for intermediate spilled runs. For large files it is recommended to use
    /// a dedicated directory on the same file system as the output.
    pub fn with_tmp_dir(&mut self, tmp_dir: PathBuf) {
        self.tmp_dir = tmp_dir;
    }

    /// Set the single-byte field delimiter. The default is TAB.
    pub fn with_field_delim(&mut self, field_delim: u8) {
        self.field_delim = field_delim;
    }

    /// Set the zero-based key field index. The default is 0.
    pub fn with_key_field(&mut self, key_field: usize) {
        self.key_field = key_field;
    }

    /// Set the number of leading lines to pass through to the output verbatim, ahead of the
    /// sorted body. The default is 0.
    pub fn with_header(&mut self, header: usize) {
        self.header = header;
    }

    /// Set the total memory budget in bytes. A value `<= 0` uses the input file size. The budget
    /// is split between the divide-phase reader and the merge-phase runs (§4.7).
    pub fn with_memory_size(&mut self, memory_size: i64) {
        self.memory_size = memory_size;
    }

    /// Set the number of worker threads used to sort each run in parallel. Coerced to at least 1.
    /// The default is the number of available CPU cores.
    pub fn with_nr_threads(&mut self, nr_threads: usize) {
        self.nr_threads = nr_threads;
    }

    fn resolve_config(&self) -> Config {
        let nr_threads = if self.nr_threads == 0 {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        } else {
            self.nr_threads
        };
        Config::new(
            self.input_file.clone(),
            self.output_file.clone(),
            self.tmp_dir.clone(),
            self.field_delim,
            self.key_field,
            self.header,
            self.memory_size,
            nr_threads,
        )
    }

    /// Run the external sort. Removes any pre-existing file at `output_file` up front, so a
    /// partial result from an earlier failed attempt is never mistaken for a finished sort (§7).
    pub fn sort(&self) -> Result<(), anyhow::Error> {
        let config = self.resolve_config();
        if config.output_file().exists() {
            fs::remove_file(config.output_file())
                .with_context(|| format!("removing stale output file {}", config.output_file().to_string_lossy()))?;
        }
        log::info!(
            "starting external sort: input={}, output={}, memory_size={}, nr_threads={}",
            config.input_file().to_string_lossy(),
            config.output_file().to_string_lossy(),
            config.memory_size(),
            config.nr_threads(),
        );
        Self::run_sort(&config).map_err(|err| {
            log::error!("external sort failed: {err:#}");
            err
        })
    }

    /// Re-reads `path` and confirms that its body (lines after the configured header count)
    /// is non-decreasing under the §4.1 key comparison. Used to validate a sort's own output, or
    /// to confirm an arbitrary file is not already sorted.
    pub fn verify_sorted(&self, path: &Path) -> Result<bool, anyhow::Error> {
        let file = File::open(path).with_context(|| format!("opening {} for verification", path.to_string_lossy()))?;
        let mut reader = BufReader::new(file);
        let mut skipped = 0;
        let mut line = Vec::new();
        let mut previous: Option<Vec<u8>> = None;
        loop {
            line.clear();
            let n = read_line(&mut reader, &mut line)?;
            if n == 0 {
                break;
            }
            if skipped < self.header {
                skipped += 1;
                continue;
            }
            let key = LineView::new(&line, self.field_delim, self.key_field).key().to_vec();
            if let Some(prev) = &previous {
                if compare_keys(prev, &key) == std::cmp::Ordering::Greater {
                    return Ok(false);
                }
            }
            previous = Some(key);
        }
        Ok(true)
    }

    fn run_sort(config: &Config) -> Result<(), anyhow::Error> {
        let budget = MemoryBudget::new(config.memory_size());

        let input = File::open(config.input_file())
            .with_context(|| format!("opening input file {}", config.input_file().to_string_lossy()))?;
        let input_len = input.metadata().map(|m| m.len()).unwrap_or(0);

        let output_file = File::create(config.output_file())
            .with_context(|| format!("creating output file {}", config.output_file().to_string_lossy()))?;
        let mut output = BufWriter::new(output_file);

        let mut reader = match BufferedReader::new(
            input,
            config.field_delim(),
            config.key_field(),
            config.header(),
            budget.divide_share(),
            input_len,
        ) {
            Ok(reader) => reader,
            // §4.6.3's zero-run fast path: an input with no body at all, or with fewer
            // physical lines than the configured header count, is not a fatal error - whatever
            // header lines were captured become the entire output (§8 boundary behaviours).
            Err(err) => match err.downcast_ref::<crate::error::SortError>() {
                Some(crate::error::SortError::EmptyBody { header_lines }) => {
                    for header_line in header_lines {
                        output.write_all(header_line).context("writing header line")?;
                    }
                    output.flush().context("flushing output file")?;
                    log::info!("empty body: wrote {} header line(s), no runs", header_lines.len());
                    return Ok(());
                }
                _ => return Err(err).context("constructing divide-phase reader"),
            },
        };
        for header_line in reader.header_lines() {
            output.write_all(header_line).context("writing header line")?;
        }

        log::info!("divide phase: building sorted runs");
        let mut runs = Vec::new();
        loop {
            let table = reader.read_lines().context("reading next divide-phase window")?;
            if table.is_empty() {
                break;
            }
            let run = Run::sort_write(table, config.nr_threads(), config.tmp_dir())
                .context("sorting and spilling a run")?;
            runs.push(run);
        }
        // drop the divide-phase reader before merging: its window buffer is no longer needed and
        // its memory share should not overlap with the merge-phase per-run buffers (§4.7).
        drop(reader);
        log::info!("divide phase complete: {} run(s)", runs.len());

        match runs.len() {
            0 => {}
            1 => {
                let mut run = runs.into_iter().next().unwrap();
                run.copy_sorted_to(&mut output).context("copying single run to output")?;
            }
            nr_runs => {
                Self::merge(runs, config, &budget, nr_runs, &mut output)?;
            }
        }

        output.flush().context("flushing output file")?;
        log::info!("external sort finished");
        Ok(())
    }

    fn merge(
        mut runs: Vec<Run>,
        config: &Config,
        budget: &MemoryBudget,
        nr_runs: usize,
        output: &mut impl Write,
    ) -> Result<(), anyhow::Error> {
        let (merge_share, floored) = budget.merge_share(nr_runs);
        if floored {
            log::warn!(
                "merge-time per-run memory share floored at {} bytes for {} runs",
                merge_share,
                nr_runs,
            );
        }

        let (soft, hard) = Self::get_nofile_limit()?;
        let wanted_soft = (nr_runs as u64 + 256).max(soft).min(hard);
        Self::set_nofile_limit(wanted_soft, hard)?;

        let result = (|| -> Result<(), anyhow::Error> {
            for run in runs.iter_mut() {
                run.prepare_read(config.field_delim(), config.key_field(), merge_share)
                    .context("preparing a run for merging")?;
            }

            log::info!("merge phase: {} runs", nr_runs);
            loop {
                let min_index = runs
                    .iter()
                    .enumerate()
                    .filter_map(|(i, run)| run.current_key().map(|key| (i, key)))
                    .min_by(|(_, a), (_, b)| compare_keys(a, b))
                    .map(|(i, _)| i);

                let Some(i) = min_index else {
                    break;
                };

                let value = runs[i]
                    .current_value()
                    .ok_or_else(|| anyhow!("run {i} lost its current line between selection and write"))?
                    .to_vec();
                output.write_all(&value).context("writing merged line to output")?;
                runs[i].advance().context("advancing a run after merging its current line")?;
            }
            Ok(())
        })();

        Self::set_nofile_limit(soft, hard)?;
        result
    }

    fn get_nofile_limit() -> Result<(u64, u64), anyhow::Error> {
        rlimit::getrlimit(Resource::NOFILE).context("reading RLIMIT_NOFILE")
    }

    fn set_nofile_limit(soft: u64, hard: u64) -> Result<(), anyhow::Error> {
        rlimit::setrlimit(Resource::NOFILE, soft, hard)
            .with_context(|| format!("setting RLIMIT_NOFILE to soft={soft}, hard={hard}"))
    }
}

/// Reads one physical line (including its trailing newline, if any) from an arbitrary reader.
/// Used only by [`Sort::verify_sorted`], which re-reads a whole file once and has no reason to
/// pay for the windowed buffering the core sort uses.
fn read_line<R: Read>(reader: &mut R, out: &mut Vec<u8>) -> Result<usize, anyhow::Error> {
    let mut byte = [0u8; 1];
    let mut n = 0;
    loop {
        let read = reader.read(&mut byte).context("reading a line for verification")?;
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
