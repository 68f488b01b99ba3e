//! Shared-storage layout.
//!
//! Every artifact is published with write-to-temporary then rename, so a
//! reader polling the directory sees either nothing or a complete file.

use crate::{
    ARTIFACT_PREFIX, ARTIFACT_SUFFIX, REQUEST_PREFIX, RESPONSE_PREFIX, SCRIPT_PREFIX,
    SCRIPT_SUFFIX, TEMP_SUFFIX,
};

use models::RequestId;
use models::request::REQUEST_ID_LEN;

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind as IoErrorKind, Result as IoResult, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};

use const_format::concatcp;
use log::{debug, trace, warn};
use regex::Regex;

const REQUEST_NAME_PATTERN: &str = concatcp!(
    "^",
    REQUEST_PREFIX,
    "(?P<id>[0-9a-f]{",
    REQUEST_ID_LEN,
    "})",
    r"\.json$"
);

static REQUEST_NAME_REGEX: OnceLock<Regex> = OnceLock::new();

pub(crate) fn get_request_name_regex() -> &'static Regex {
    REQUEST_NAME_REGEX
        .get_or_init(|| Regex::new(REQUEST_NAME_PATTERN).expect("valid regex pattern"))
}

/// A directory shared between the controller and the host.
#[derive(Debug, Clone)]
pub struct IpcDirectory {
    root: PathBuf,
}

impl IpcDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_exists(&self) -> IoResult<()> {
        fs::create_dir_all(&self.root)
    }

    pub fn request_path(&self, request_id: &RequestId) -> PathBuf {
        self.root
            .join(format!("{REQUEST_PREFIX}{request_id}{ARTIFACT_SUFFIX}"))
    }

    pub fn response_path(&self, request_id: &RequestId) -> PathBuf {
        self.root
            .join(format!("{RESPONSE_PREFIX}{request_id}{ARTIFACT_SUFFIX}"))
    }

    pub fn script_path(&self, request_id: &RequestId) -> PathBuf {
        self.root
            .join(format!("{SCRIPT_PREFIX}{request_id}{SCRIPT_SUFFIX}"))
    }

    /// Publish `bytes` at `path`; the file appears fully written or not at all.
    pub fn write_atomic(&self, path: &Path, bytes: &[u8]) -> IoResult<()> {
        let temp_path = temp_path_for(path);

        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        trace!("Published {}", path.display());
        Ok(())
    }

    /// Ids of every published request, oldest first.
    ///
    /// Temporaries are never listed, so a request still being written is
    /// invisible here.
    pub fn pending_requests(&self) -> IoResult<Vec<RequestId>> {
        let regex = get_request_name_regex();
        let mut pending = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };

            if let Some(captures) = regex.captures(name)
                && let Some(id) = captures.name("id")
                && let Ok(request_id) = RequestId::parse(id.as_str())
            {
                pending.push(request_id);
            }
        }

        pending.sort();
        Ok(pending)
    }

    /// Contents of `path`, or `None` when it does not exist (yet, or any more).
    pub fn read_if_present(&self, path: &Path) -> IoResult<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Remove `path`; a file that is already gone is not an error.
    pub fn remove_quiet(&self, path: &Path) -> IoResult<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Delete artifacts last modified more than `threshold` ago.
    ///
    /// Only names carrying [`ARTIFACT_PREFIX`] are touched. Failures on
    /// individual files are logged and skipped.
    pub fn sweep_stale(&self, threshold: Duration) -> IoResult<usize> {
        let now = SystemTime::now();
        let mut removed = 0;

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            if !is_artifact_name(&name) {
                continue;
            }

            let age = entry
                .metadata()
                .and_then(|metadata| metadata.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok());

            match age {
                Some(age) if age > threshold => match self.remove_quiet(&entry.path()) {
                    Ok(true) => {
                        debug!("Removed stale artifact {name:?} ({age:?} old)");
                        removed += 1;
                    }
                    Ok(false) => {}
                    Err(e) => warn!("Failed to remove stale artifact {name:?}: {e}"),
                },
                _ => {}
            }
        }

        Ok(removed)
    }
}

pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

fn is_artifact_name(name: &OsString) -> bool {
    let Some(name) = name.to_str() else {
        return false;
    };

    name.starts_with(ARTIFACT_PREFIX)
        && [ARTIFACT_SUFFIX, SCRIPT_SUFFIX, TEMP_SUFFIX]
            .iter()
            .any(|suffix| name.ends_with(suffix))
}
