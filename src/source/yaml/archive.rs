use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{Error, Result};

/// The hierarchical export, either still zipped or already extracted.
///
/// Zip handles are pooled so concurrent tasks each read through their own
/// archive without re-parsing the central directory for every document.
pub enum Archive {
    Zip {
        path: PathBuf,
        pool: Mutex<Vec<ZipArchive<File>>>,
    },
    Directory(PathBuf),
}

impl Archive {
    pub fn open(path: &Path) -> Result<Self> {
        if path.is_dir() {
            return Ok(Archive::Directory(path.to_path_buf()));
        }
        let first = ZipArchive::new(File::open(path)?)?;
        Ok(Archive::Zip {
            path: path.to_path_buf(),
            pool: Mutex::new(vec![first]),
        })
    }

    /// Hand `f` a buffered reader over one document
    pub fn with_reader<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut dyn BufRead) -> Result<T>,
    ) -> Result<T> {
        match self {
            Archive::Zip { path, pool } => {
                let mut zip = Self::checkout(path, pool)?;
                let result = match zip.by_name(name) {
                    Ok(entry) => f(&mut BufReader::new(entry)),
                    Err(ZipError::FileNotFound) => Err(missing(name)),
                    Err(err) => Err(err.into()),
                };
                pool.lock().push(zip);
                result
            }
            Archive::Directory(root) => {
                let file = File::open(root.join(name)).map_err(|err| match err.kind() {
                    ErrorKind::NotFound => missing(name),
                    _ => Error::Io(err),
                })?;
                f(&mut BufReader::new(file))
            }
        }
    }

    pub fn read_to_string(&self, name: &str) -> Result<String> {
        self.with_reader(name, |reader| {
            let mut text = String::new();
            reader.read_to_string(&mut text)?;
            Ok(text)
        })
    }

    /// Every file in the archive, as `/`-separated paths relative to its root
    pub fn file_names(&self) -> Result<Vec<String>> {
        match self {
            Archive::Zip { path, pool } => {
                let zip = Self::checkout(path, pool)?;
                let names = zip
                    .file_names()
                    .filter(|name| !name.ends_with('/'))
                    .map(String::from)
                    .collect();
                pool.lock().push(zip);
                Ok(names)
            }
            Archive::Directory(root) => {
                let mut names = Vec::new();
                for entry in WalkDir::new(root).sort_by_file_name() {
                    let entry = entry.map_err(|err| Error::Io(err.into()))?;
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                    let parts: Vec<_> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    names.push(parts.join("/"));
                }
                Ok(names)
            }
        }
    }

    fn checkout(path: &Path, pool: &Mutex<Vec<ZipArchive<File>>>) -> Result<ZipArchive<File>> {
        let pooled = pool.lock().pop();
        match pooled {
            Some(zip) => Ok(zip),
            None => Ok(ZipArchive::new(File::open(path)?)?),
        }
    }
}

fn missing(name: &str) -> Error {
    Error::schema(name, "document missing from archive")
}
