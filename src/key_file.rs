//! Service account key file output
//!
//! The key is written to a temporary sibling first and renamed into place,
//! so an interrupted or failed write never leaves a truncated key behind.

use crate::error::ProvisionError;
use crate::types::KeyMaterial;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write key material to `path`, replacing any previous key file
pub fn write_key_file(path: &Path, key: &KeyMaterial) -> Result<(), ProvisionError> {
    let tmp = temp_path(path);
    let to_error = |source| ProvisionError::KeyFile {
        path: path.to_path_buf(),
        source,
    };

    debug!(path = %path.display(), key_id = %key.key_id, "Writing key file");

    let result = write_private(&tmp, &key.credentials_json).and_then(|_| fs::rename(&tmp, path));
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(to_error(e));
    }

    Ok(())
}

/// Always creates a fresh file, so the mode is never inherited from a
/// temp file left by an earlier run
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => return Err(e),
        _ => {}
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(contents: &str) -> KeyMaterial {
        KeyMaterial {
            key_id: "abc123".into(),
            credentials_json: contents.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let tmp = temp_path(Path::new("/work/binge-plus-sa-key.json"));
        assert_eq!(tmp, PathBuf::from("/work/binge-plus-sa-key.json.tmp"));
    }

    #[test]
    fn test_write_key_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("binge-plus-sa-key.json");

        write_key_file(&path, &key(r#"{"type": "service_account"}"#)).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            r#"{"type": "service_account"}"#
        );
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_write_replaces_previous_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("key.json");

        write_key_file(&path, &key("old")).unwrap();
        write_key_file(&path, &key("new")).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("key.json");
        write_key_file(&path, &key("{}")).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_stale_temp_file_mode_is_not_kept() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("k-key.json");
        let stale = temp_path(&path);
        fs::write(&stale, "partial").unwrap();
        fs::set_permissions(&stale, fs::Permissions::from_mode(0o644)).unwrap();

        write_key_file(&path, &key("{}")).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
        assert!(!stale.exists());
    }

    #[test]
    fn test_missing_directory_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("key.json");

        let err = write_key_file(&path, &key("{}")).unwrap_err();
        assert!(matches!(err, ProvisionError::KeyFile { .. }));
        assert!(!path.exists());
    }
}
