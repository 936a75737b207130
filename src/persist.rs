//! Atomic JSON file persistence shared by every tier that owns an on-disk
//! snapshot (record store, graph, conversation memory, project memories).
//!
//! Writes go to a temp file in the target directory, are fsynced, then
//! renamed over the destination — so a crash mid-write never leaves a
//! truncated or partially-written snapshot. Per the failure semantics in
//! the error handling design, every function here only ever logs; it never
//! returns an error to its caller.

use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

/// Serialize `value` as pretty JSON and atomically replace `path`.
///
/// Logs and returns on any I/O or serialization failure; the in-memory
/// store remains authoritative until the next successful call.
pub fn save_json<T: Serialize>(path: &Path, value: &T) {
    let Some(dir) = path.parent() else {
        warn!(?path, "persist: path has no parent directory, skipping save");
        return;
    };

    if let Err(e) = std::fs::create_dir_all(dir) {
        warn!(?path, error = %e, "persist: failed to create parent directory");
        return;
    }

    let json = match serde_json::to_vec_pretty(value) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(?path, error = %e, "persist: failed to serialize snapshot");
            return;
        }
    };

    let tmp = match tempfile::NamedTempFile::new_in(dir) {
        Ok(f) => f,
        Err(e) => {
            warn!(?path, error = %e, "persist: failed to create temp file");
            return;
        }
    };

    if let Err(e) = std::io::Write::write_all(&mut tmp.as_file(), &json) {
        warn!(?path, error = %e, "persist: failed to write temp file");
        return;
    }

    if let Err(e) = tmp.as_file().sync_all() {
        warn!(?path, error = %e, "persist: failed to fsync temp file");
        return;
    }

    if let Err(e) = tmp.persist(path) {
        warn!(?path, error = %e, "persist: failed to rename temp file into place");
        return;
    }

    debug!(?path, bytes = json.len(), "persist: snapshot written");
}

/// Load and deserialize `path`. Missing file or decode failure both yield
/// `None` — per the error handling design, a decode mismatch at load is
/// treated as an empty store, not a hard error.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(?path, error = %e, "persist: failed to read snapshot");
            return None;
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(?path, error = %e, "persist: failed to decode snapshot, starting empty");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        value: u32,
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        save_json(&path, &Sample { value: 42 });
        let loaded: Option<Sample> = load_json(&path);
        assert_eq!(loaded, Some(Sample { value: 42 }));
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let loaded: Option<Sample> = load_json(&path);
        assert_eq!(loaded, None);
    }

    #[test]
    fn corrupt_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.json");
        std::fs::write(&path, b"not json").unwrap();
        let loaded: Option<Sample> = load_json(&path);
        assert_eq!(loaded, None);
    }
}
