use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::logic::dataset::record::DatasetRecord;

pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10 MB

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_files: usize,
    pub total_size_mb: f32,
    pub current_file: String,
}

/// File count and size of a dataset directory, without creating it
pub fn dataset_stats(base_dir: &Path) -> io::Result<DatasetStats> {
    let mut total_files = 0;
    let mut size = 0u64;
    let mut paths = Vec::new();

    for entry in fs::read_dir(base_dir)?.flatten() {
        let path = entry.path();
        if is_jsonl(&path) {
            total_files += 1;
            if let Ok(meta) = entry.metadata() {
                size += meta.len();
            }
            paths.push(path);
        }
    }

    let current_file = paths
        .iter()
        .max()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("None")
        .to_string();

    Ok(DatasetStats {
        total_files,
        total_size_mb: size as f32 / 1024.0 / 1024.0,
        current_file,
    })
}

/// Append-only JSONL writer with size-based rotation
pub struct DatasetWriter {
    file: Mutex<Option<File>>,
    base_dir: PathBuf,
    max_file_size: u64,
    /// Distinguishes files created within the same second
    sequence: Mutex<u32>,
}

impl DatasetWriter {
    pub fn from_path(base_dir: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self {
            file: Mutex::new(None),
            base_dir,
            max_file_size: MAX_FILE_SIZE,
            sequence: Mutex::new(0),
        })
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes.max(1);
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Append record to dataset log
    /// Handles file rotation automatically
    pub fn append(&self, record: &DatasetRecord) -> io::Result<()> {
        let mut file_guard = self.file.lock();

        // Reopen the latest file after a restart unless it is full
        if file_guard.is_none() {
            *file_guard = Some(match self.find_latest_log_file()? {
                Some(path) => {
                    let f = OpenOptions::new().create(true).append(true).open(&path)?;
                    if f.metadata()?.len() < self.max_file_size {
                        f
                    } else {
                        self.create_new_file()?
                    }
                }
                None => self.create_new_file()?,
            });
        }

        let should_rotate = match file_guard.as_ref() {
            Some(f) => f.metadata()?.len() >= self.max_file_size,
            None => false,
        };
        if should_rotate {
            log::debug!("Dataset file reached {} bytes, rotating", self.max_file_size);
            *file_guard = Some(self.create_new_file()?);
        }

        if let Some(file) = file_guard.as_mut() {
            let json = serde_json::to_string(record)?;
            writeln!(file, "{}", json)?;
        }

        Ok(())
    }

    pub fn append_all(&self, records: &[DatasetRecord]) -> io::Result<usize> {
        for record in records {
            self.append(record)?;
        }
        Ok(records.len())
    }

    pub fn get_stats(&self) -> io::Result<DatasetStats> {
        dataset_stats(&self.base_dir)
    }

    fn create_new_file(&self) -> io::Result<File> {
        let mut seq = self.sequence.lock();
        *seq += 1;
        // dataset-YYYY-MM-DD-HHMMSS-NNNN.jsonl sorts chronologically
        let filename = format!("dataset-{}-{:04}.jsonl", Utc::now().format("%Y-%m-%d-%H%M%S"), *seq);
        let path = self.base_dir.join(filename);

        OpenOptions::new().create(true).append(true).open(path)
    }

    fn find_latest_log_file(&self) -> io::Result<Option<PathBuf>> {
        let mut entries: Vec<PathBuf> = fs::read_dir(&self.base_dir)?
            .filter_map(|res| res.ok())
            .map(|e| e.path())
            .filter(|p| is_jsonl(p))
            .collect();

        entries.sort();
        Ok(entries.pop())
    }
}

pub(crate) fn is_jsonl(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "jsonl")
}
