//! File-backed storage of planning inputs and result artifacts.

pub mod tables;

pub use tables::*;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::domain::{Customer, Facility};
use crate::postprocess::ResultRecord;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing column '{column}'")]
    MissingColumn { column: String },

    #[error("Invalid value '{value}' in column '{column}' at row {row}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
}

fn open(path: &Path) -> Result<BufReader<File>, RepoError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| RepoError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn create(path: &Path) -> Result<BufWriter<File>, RepoError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| RepoError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| RepoError::Io {
            path: path.to_path_buf(),
            source,
        })
}

pub fn load_facilities(path: impl AsRef<Path>) -> Result<Vec<Facility>, RepoError> {
    let path = path.as_ref();
    let facilities = read_facilities(open(path)?)?;
    debug!(path = %path.display(), count = facilities.len(), "facilities loaded");
    Ok(facilities)
}

pub fn load_demand(path: impl AsRef<Path>, period: &str) -> Result<Vec<Customer>, RepoError> {
    let path = path.as_ref();
    let customers = read_demand(open(path)?, period)?;
    debug!(path = %path.display(), period, count = customers.len(), "demand loaded");
    Ok(customers)
}

pub fn save_facilities(path: impl AsRef<Path>, facilities: &[Facility]) -> Result<(), RepoError> {
    let path = path.as_ref();
    write_facilities(create(path)?, facilities)?;
    debug!(path = %path.display(), count = facilities.len(), "facilities written");
    Ok(())
}

pub fn save_records(path: impl AsRef<Path>, records: &[ResultRecord]) -> Result<(), RepoError> {
    let path = path.as_ref();
    write_records(create(path)?, records)?;
    debug!(path = %path.display(), count = records.len(), "records written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_facilities("does/not/exist.csv").unwrap_err();
        match err {
            RepoError::Io { path, .. } => assert_eq!(path, PathBuf::from("does/not/exist.csv")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_save_and_load_facilities_on_disk() {
        let dir = std::env::temp_dir().join(format!("facility-planner-repo-{}", std::process::id()));
        let path = dir.join("nested").join("infrastructure.csv");
        let facilities = vec![Facility::new((1.0, 2.0), 3).with_existing(1, 1)];

        save_facilities(&path, &facilities).unwrap();
        assert_eq!(load_facilities(&path).unwrap(), facilities);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
