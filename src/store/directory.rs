use crate::models::sensor::RawEntry;
use crate::store::{EntryCursor, SensorStore, StoreError};
use log::debug;
use std::fs::{read_dir, File, ReadDir};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Upper bound for a single value file; sensor values are short strings.
const MAX_VALUE_LEN: u64 = 4096;

/// Reads entries from a flat directory of value files, the way `hwmon`
/// exposes sensors under `/sys/class/hwmon`.
///
/// Every regular file directly inside `root` is one entry: the file name is
/// the entry name and the trimmed content is its text value. Subdirectories
/// and unreadable files are skipped.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl SensorStore for DirectoryStore {
    fn namespace(&self) -> String {
        self.root.display().to_string()
    }

    fn open(&self) -> Result<Box<dyn EntryCursor + '_>, StoreError> {
        let dir = read_dir(&self.root).map_err(|source| StoreError::NamespaceUnavailable {
            namespace: self.namespace(),
            source,
        })?;
        Ok(Box::new(DirectoryCursor { dir, position: 0 }))
    }
}

struct DirectoryCursor {
    dir: ReadDir,
    position: usize,
}

impl EntryCursor for DirectoryCursor {
    fn next_entry(&mut self) -> Result<Option<RawEntry>, StoreError> {
        loop {
            let entry = match self.dir.next() {
                None => return Ok(None),
                Some(Err(source)) => {
                    return Err(StoreError::Enumeration {
                        position: self.position,
                        source,
                    })
                }
                Some(Ok(entry)) => entry,
            };

            if !entry.file_type().is_ok_and(|file_type| file_type.is_file()) {
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };

            let Some(value) = get_file_line(&entry.path()) else {
                debug!("Skipping unreadable value file {}", entry.path().display());
                continue;
            };

            self.position += 1;
            return Ok(Some(RawEntry::new(name, value)));
        }
    }
}

// Read a value file, dropping trailing whitespace and newlines.
fn get_file_line(file: &Path) -> Option<String> {
    let mut reader = String::new();
    let f = File::open(file).ok()?;
    f.take(MAX_VALUE_LEN).read_to_string(&mut reader).ok()?;
    reader.truncate(reader.trim_end().len());
    Some(reader)
}
