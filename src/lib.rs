//! This crate implements an external sort for very large delimited text files: CSV, TSV,
//! `pg_dump` output, [GTFS](https://gtfs.org/schedule/reference/) feeds and similar line-oriented
//! formats composed of records separated by a newline and fields separated by a single-byte
//! delimiter.
//!
//! Records are ordered by a single configurable key field. The sort works under a bounded memory
//! budget: input is read in large windows and carved into sorted, spilled *runs*, which are then
//! merged into the final output. This lets it sort files much larger than available RAM, at the
//! cost of a pass over the disk for the spilled runs.
//!
//! # Examples
//! ```
//! use std::path::PathBuf;
//! use extsort_fields::sort::Sort;
//!
//! // optimized for use with Jemalloc
//! use tikv_jemallocator::Jemalloc;
//! #[global_allocator]
//! static GLOBAL: Jemalloc = Jemalloc;
//!
//! fn sort_records(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
//!     let mut text_file_sort = Sort::new(input, output);
//!
//!     // sort on the second field (0-based) of a ';'-delimited file, passing the first line
//!     // through verbatim as a header
//!     text_file_sort.with_field_delim(b';');
//!     text_file_sort.with_key_field(1);
//!     text_file_sort.with_header(1);
//!
//!     // cap memory use and set the worker count for the in-memory sort of each run. The default
//!     // for threads is all available CPU cores; the default memory budget is the input file size.
//!     text_file_sort.with_memory_size(64 * 1024 * 1024);
//!     text_file_sort.with_nr_threads(4);
//!
//!     // directory for spilled runs. Defaults to std::env::temp_dir(); for large sorts a
//!     // dedicated directory on the same file system as the output is recommended.
//!     text_file_sort.with_tmp_dir(tmp);
//!
//!     text_file_sort.sort()
//! }
//! ```

pub(crate) mod bucket_sort;
pub(crate) mod buffered_reader;
pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod line_table;
pub(crate) mod line_view;
pub(crate) mod memory_budget;
pub(crate) mod run;

pub mod sort;
