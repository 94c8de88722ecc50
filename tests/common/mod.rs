use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

static COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn setup() {
    let results_dir_path = PathBuf::from_str("./target/results/").unwrap();
    if !results_dir_path.exists() {
        fs::create_dir_all(&results_dir_path).unwrap_or_else(|_| {
            panic!("Failed to create results directory: {:?}", results_dir_path)
        });
    }
}

#[allow(dead_code)]
pub fn read_lines(path: &PathBuf) -> Result<Vec<String>, anyhow::Error> {
    let reader = BufReader::new(File::open(path)?);
    let lines = reader.lines().map(|x| x.unwrap()).collect();
    Ok(lines)
}

/// A fresh, not-yet-created path under `dir`, unique within this test run.
#[allow(dead_code)]
pub fn temp_file_name(dir: &str) -> PathBuf {
    let mut result = PathBuf::from(dir);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    result.push(format!("tfs-test-{}-{}", std::process::id(), n));
    result
}

/// Writes `lines` (each without its own trailing newline) to a fresh file under `dir`,
/// terminating every line with LF, and returns its path.
#[allow(dead_code)]
pub fn write_fixture(dir: &str, lines: &[&str]) -> Result<PathBuf, anyhow::Error> {
    let path = temp_file_name(dir);
    let mut file = File::create(&path)?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    Ok(path)
}
