use std::path::{Path, PathBuf};

use anyhow::Error;
use extsort_fields::sort::Sort;

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Sort with every default left in place: TAB delimiter, key field 0, no header.
fn sort_defaults(input_path: &Path, output_path: &Path) -> Result<(), Error> {
    let sort = Sort::new(input_path.to_path_buf(), output_path.to_path_buf());
    sort.sort()?;
    Ok(())
}

/// Sort a semicolon-delimited file by its second field, passing the first line through verbatim.
fn sort_with_header(input_path: &Path, output_path: &Path) -> Result<(), Error> {
    let mut sort = Sort::new(input_path.to_path_buf(), output_path.to_path_buf());
    sort.with_field_delim(b';');
    sort.with_key_field(1);
    sort.with_header(1);
    sort.sort()?;
    Ok(())
}

/// Sort under a tight memory budget, forcing the divide phase to spill several runs that the
/// merge phase must then combine.
fn sort_with_bounded_memory(input_path: &Path, output_path: &Path) -> Result<(), Error> {
    let mut sort = Sort::new(input_path.to_path_buf(), output_path.to_path_buf());
    sort.with_field_delim(b';');
    sort.with_key_field(1);
    sort.with_memory_size(64 * 1024);
    sort.sort()?;
    Ok(())
}

/// Sort with an explicit thread count and a dedicated directory for intermediate runs.
fn sort_with_explicit_threads(input_path: &Path, output_path: &Path, tmp_dir: &Path) -> Result<(), Error> {
    let mut sort = Sort::new(input_path.to_path_buf(), output_path.to_path_buf());
    sort.with_field_delim(b';');
    sort.with_key_field(1);
    sort.with_nr_threads(4);
    sort.with_tmp_dir(tmp_dir.to_path_buf());
    sort.sort()?;
    Ok(())
}

// cargo run -r --example sort_text_file
pub fn main() -> Result<(), Error> {
    let input_path = PathBuf::from("./tests/fixtures/sorted-1000.dat");
    let defaults_path = PathBuf::from("./target/defaults-1000.dat");
    let header_path = PathBuf::from("./target/header-1000.dat");
    let bounded_path = PathBuf::from("./target/bounded-1000.dat");
    let threads_path = PathBuf::from("./target/threads-1000.dat");
    let tmp_dir = PathBuf::from("./target");

    sort_defaults(&input_path, &defaults_path)?;
    sort_with_header(&input_path, &header_path)?;
    sort_with_bounded_memory(&input_path, &bounded_path)?;
    sort_with_explicit_threads(&input_path, &threads_path, &tmp_dir)?;

    Ok(())
}
