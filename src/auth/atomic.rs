//! Same-directory temp file + rename writes for credential files.
//!
//! The temp file always lives next to the target so the final rename never
//! crosses a filesystem boundary. Readers see either the old file or the new
//! one, never a partial write.

use rand::Rng;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Create `dir` and any missing ancestors as owner-only directories.
/// Directories that already exist keep their permissions.
pub(crate) fn ensure_private_dir(dir: &Path) -> io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}

/// Atomically replace `target` with `contents` using owner-only permissions.
pub(crate) fn write_private_atomic(target: &Path, contents: &[u8]) -> io::Result<()> {
    write_private_atomic_with(target, contents, |from, to| fs::rename(from, to))
}

/// Atomic write with an injectable commit step; the default is `fs::rename`.
pub(crate) fn write_private_atomic_with<F>(
    target: &Path,
    contents: &[u8],
    commit: F,
) -> io::Result<()>
where
    F: FnOnce(&Path, &Path) -> io::Result<()>,
{
    let tmp_path = temp_sibling_path(target)?;
    let result = write_new_private_file(&tmp_path, contents).and_then(|()| commit(&tmp_path, target));
    if result.is_err() {
        // The target was never touched; only the temp file needs cleanup.
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// Unique hidden temp path in the target's own directory.
fn temp_sibling_path(target: &Path) -> io::Result<PathBuf> {
    let file_name = target.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("`{}` has no file name", target.display()),
        )
    })?;
    let suffix: u64 = rand::thread_rng().gen();
    let tmp_name = format!(
        ".{}.{}.{suffix:016x}.tmp",
        file_name.to_string_lossy(),
        std::process::id()
    );
    Ok(target.with_file_name(tmp_name))
}

fn write_new_private_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        // Mode applies at creation, before any secret bytes land on disk.
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::TestTempDir;

    fn leftover_temp_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .expect("read dir")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn replaces_existing_file_contents() {
        let tmp = TestTempDir::new("atomic-replace");
        let target = tmp.write_text("auth.toml", "old = 1\n");
        write_private_atomic(&target, b"new = 2\n").expect("atomic write");
        assert_eq!(fs::read_to_string(&target).unwrap(), "new = 2\n");
        assert!(leftover_temp_files(tmp.path()).is_empty());
    }

    #[test]
    fn failed_commit_leaves_target_untouched_and_cleans_temp() {
        let tmp = TestTempDir::new("atomic-crash");
        let target = tmp.write_text("auth.toml", "original\n");
        let before = fs::read(&target).unwrap();

        let mut staged = None;
        let err = write_private_atomic_with(&target, b"replacement\n", |from, _to| {
            // Temp file is fully written in the target's directory before commit.
            assert_eq!(from.parent(), target.parent());
            assert_eq!(fs::read_to_string(from).unwrap(), "replacement\n");
            staged = Some(from.to_path_buf());
            Err(io::Error::new(io::ErrorKind::Interrupted, "killed before rename"))
        })
        .expect_err("commit failure should surface");

        assert_eq!(err.kind(), io::ErrorKind::Interrupted);
        assert_eq!(fs::read(&target).unwrap(), before);
        assert!(!staged.expect("commit ran").exists());
        assert!(leftover_temp_files(tmp.path()).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn written_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TestTempDir::new("atomic-perms");
        let target = tmp.child("secret");
        write_private_atomic(&target, b"token").expect("write");
        let mode = fs::metadata(&target).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn ensure_private_dir_creates_nested_owner_only_dirs() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TestTempDir::new("atomic-dir");
        let dir = tmp.child("servers/juliahub.com");
        ensure_private_dir(&dir).expect("create dir");
        let mode = fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
    }

    #[cfg(unix)]
    #[test]
    fn ensure_private_dir_leaves_existing_dirs_alone() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TestTempDir::new("atomic-existing");
        let depot = tmp.child("depot");
        fs::create_dir_all(&depot).unwrap();
        fs::set_permissions(&depot, fs::Permissions::from_mode(0o755)).unwrap();

        ensure_private_dir(&depot.join("servers/juliahub.com")).expect("create dir");

        let mode = |path: &Path| fs::metadata(path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&depot), 0o755);
        assert_eq!(mode(&depot.join("servers")), 0o700);
        assert_eq!(mode(&depot.join("servers/juliahub.com")), 0o700);
    }
}
