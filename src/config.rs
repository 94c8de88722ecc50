use std::path::PathBuf;

/// Resolved configuration for one sort run (§6's "Configuration surface").
/// Built by [`crate::sort::Sort`] from the builder's `with_*` calls plus
/// their defaults; never constructed directly by callers.
#[derive(Clone, Debug)]
pub(crate) struct Config {
    input_file: PathBuf,
    output_file: PathBuf,
    tmp_dir: PathBuf,
    field_delim: u8,
    key_field: usize,
    header: usize,
    memory_size: i64,
    nr_threads: usize,
}

impl Config {
    pub(crate) fn new(
        input_file: PathBuf,
        output_file: PathBuf,
        tmp_dir: PathBuf,
        field_delim: u8,
        key_field: usize,
        header: usize,
        memory_size: i64,
        nr_threads: usize,
    ) -> Config {
        Config {
            input_file,
            output_file,
            tmp_dir,
            field_delim,
            key_field,
            header,
            memory_size,
            nr_threads: nr_threads.max(1),
        }
    }

    pub(crate) fn input_file(&self) -> &PathBuf {
        &self.input_file
    }

    pub(crate) fn output_file(&self) -> &PathBuf {
        &self.output_file
    }

    pub(crate) fn tmp_dir(&self) -> &PathBuf {
        &self.tmp_dir
    }

    pub(crate) fn field_delim(&self) -> u8 {
        self.field_delim
    }

    pub(crate) fn key_field(&self) -> usize {
        self.key_field
    }

    pub(crate) fn header(&self) -> usize {
        self.header
    }

    pub(crate) fn memory_size(&self) -> i64 {
        self.memory_size
    }

    pub(crate) fn nr_threads(&self) -> usize {
        self.nr_threads
    }
}
