use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use super::record::DatasetRecord;
use super::writer::is_jsonl;

fn dataset_files(source_dir: &Path) -> io::Result<Vec<std::path::PathBuf>> {
    if !source_dir.exists() {
        return Err(io::Error::new(io::ErrorKind::NotFound, "Dataset directory not found"));
    }
    let mut paths: Vec<_> = fs::read_dir(source_dir)?
        .filter_map(|r| r.ok())
        .map(|e| e.path())
        .filter(|p| is_jsonl(p))
        .collect();
    // File names carry the creation time
    paths.sort();
    Ok(paths)
}

/// Merge all dataset files of `source_dir` into one JSONL file.
/// Returns the number of source files merged.
pub fn to_jsonl(source_dir: &Path, target_path: &Path) -> io::Result<usize> {
    let paths = dataset_files(source_dir)?;
    let mut output_file = File::create(target_path)?;

    for path in &paths {
        let content = fs::read(path)?;
        output_file.write_all(&content)?;
        if content.last().is_some_and(|&b| b != b'\n') {
            output_file.write_all(b"\n")?;
        }
    }

    output_file.flush()?;
    log::info!("Exported {} dataset files to {}", paths.len(), target_path.display());
    Ok(paths.len())
}

/// Read every record back; malformed lines are skipped with a warning
pub fn read_records(source_dir: &Path) -> io::Result<Vec<DatasetRecord>> {
    let mut records = Vec::new();
    for path in dataset_files(source_dir)? {
        let reader = BufReader::new(File::open(&path)?);
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Skipping {}:{}: {}", path.display(), i + 1, e),
            }
        }
    }
    Ok(records)
}
