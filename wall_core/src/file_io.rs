//! # File I/O Module
//!
//! Handles project file operations with safety features:
//! - **Atomic saves**: write to .tmp, sync, rename over the target
//! - **File locking**: prevent two editors working on the same scene
//! - **Version validation**: ensure schema compatibility
//!
//! ## File Format
//!
//! Projects are saved as `.wall` files containing JSON.
//! Lock files use the `.wall.lock` extension and record who holds the lock.
//!
//! ## Example
//!
//! ```rust,no_run
//! use wall_core::file_io::{save_project, load_project, FileLock};
//! use wall_core::project::Project;
//! use std::path::Path;
//!
//! let project = Project::new("Garden wall");
//! let path = Path::new("garden.wall");
//!
//! let lock = FileLock::acquire(path, "alex").unwrap();
//! save_project(&project, path).unwrap();
//! drop(lock);
//!
//! let loaded = load_project(path).unwrap();
//! assert_eq!(loaded.meta.name, "Garden wall");
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{WallError, WallResult};
use crate::project::{Project, SCHEMA_VERSION};

/// Locks older than this are considered abandoned.
const STALE_LOCK_HOURS: i64 = 24;

/// Lock file metadata stored in .wall.lock files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// User identifier
    pub user_id: String,
    /// Machine name where lock was acquired
    pub machine: String,
    /// Process ID that holds the lock
    pub pid: u32,
    /// When the lock was acquired
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Create new lock info for the current process
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }

    /// Whether the holder of this lock is gone.
    ///
    /// A lock is stale if it was taken on this machine by a process that no
    /// longer runs, or if it is older than 24 hours.
    pub fn is_stale(&self) -> bool {
        if let Some(our_machine) = hostname() {
            if self.machine == our_machine && !process_alive(self.pid) {
                return true;
            }
        }
        (Utc::now() - self.locked_at).num_hours() > STALE_LOCK_HOURS
    }
}

fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("HOST").ok())
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    fs::metadata(format!("/proc/{}", pid)).is_ok()
}

#[cfg(windows)]
fn process_alive(pid: u32) -> bool {
    use std::process::Command;
    match Command::new("tasklist")
        .args(["/FI", &format!("PID eq {}", pid), "/NH"])
        .output()
    {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            !stdout.contains("No tasks") && stdout.contains(&pid.to_string())
        }
        Err(_) => true,
    }
}

#[cfg(not(any(unix, windows)))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// File lock guard that releases the lock when dropped.
///
/// Combines an OS-level lock (via fs2) with a `.lock` sidecar carrying
/// [`LockInfo`] so other users can see who holds the file.
pub struct FileLock {
    project_path: PathBuf,
    lock_path: PathBuf,
    /// Keeps the OS lock alive
    _lock_file: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire an exclusive lock on a project file.
    ///
    /// Fails with [`WallError::FileLocked`] if a live lock is held by
    /// someone else. Stale locks are taken over.
    ///
    /// ```rust,no_run
    /// use wall_core::file_io::FileLock;
    /// use std::path::Path;
    ///
    /// let lock = FileLock::acquire(Path::new("scene.wall"), "alex")?;
    /// drop(lock);
    /// # Ok::<(), wall_core::errors::WallError>(())
    /// ```
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> WallResult<Self> {
        let lock_path = lock_path_for(path);
        let info = LockInfo::new(user_id);

        if let Ok(existing) = read_lock_info(&lock_path) {
            if !existing.is_stale() {
                return Err(WallError::file_locked(
                    path.display().to_string(),
                    format!("{} ({})", existing.user_id, existing.machine),
                    existing.locked_at.to_rfc3339(),
                ));
            }
            warn!(
                path = %path.display(),
                holder = %existing.user_id,
                "taking over stale lock"
            );
        }

        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| {
                WallError::file_error("create lock", lock_path.display().to_string(), e.to_string())
            })?;

        lock_file.try_lock_exclusive().map_err(|_| {
            WallError::file_locked(
                path.display().to_string(),
                "another process".to_string(),
                "unknown".to_string(),
            )
        })?;

        let lock_json = serde_json::to_string_pretty(&info).map_err(WallError::serialization)?;

        lock_file.write_all(lock_json.as_bytes()).map_err(|e| {
            WallError::file_error("write lock", lock_path.display().to_string(), e.to_string())
        })?;

        lock_file.sync_all().map_err(|e| {
            WallError::file_error("sync lock", lock_path.display().to_string(), e.to_string())
        })?;

        debug!(path = %path.display(), user = %info.user_id, "lock acquired");
        Ok(FileLock {
            project_path: path.to_path_buf(),
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Check if a file is locked without acquiring the lock.
    ///
    /// Returns `Some(LockInfo)` for a live lock, `None` if the file is free.
    pub fn check(path: &Path) -> Option<LockInfo> {
        read_lock_info(&lock_path_for(path))
            .ok()
            .filter(|info| !info.is_stale())
    }

    /// Path of the locked project file
    pub fn project_path(&self) -> &Path {
        &self.project_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn lock_path_for(project_path: &Path) -> PathBuf {
    let mut lock_path = project_path.to_path_buf();
    let extension = lock_path
        .extension()
        .map(|e| format!("{}.lock", e.to_string_lossy()))
        .unwrap_or_else(|| "lock".to_string());
    lock_path.set_extension(extension);
    lock_path
}

fn read_lock_info(lock_path: &Path) -> WallResult<LockInfo> {
    let contents = read_to_string(lock_path, "read lock")?;
    serde_json::from_str(&contents).map_err(WallError::serialization)
}

fn read_to_string(path: &Path, operation: &str) -> WallResult<String> {
    let mut file = File::open(path)
        .map_err(|e| WallError::file_error(operation, path.display().to_string(), e.to_string()))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| WallError::file_error(operation, path.display().to_string(), e.to_string()))?;
    Ok(contents)
}

/// Save a project to a file with atomic write semantics.
///
/// The project is serialized, written to `<path>.tmp`, synced to disk and
/// then renamed over `path`, so an interrupted save never leaves a
/// truncated project behind.
pub fn save_project(project: &Project, path: &Path) -> WallResult<()> {
    let json = serde_json::to_string_pretty(project).map_err(WallError::serialization)?;

    let tmp_path = tmp_path_for(path);

    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        WallError::file_error("create temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.write_all(json.as_bytes()).map_err(|e| {
        WallError::file_error("write temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.sync_all().map_err(|e| {
        WallError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        WallError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    info!(
        path = %path.display(),
        columns = project.scene.columns.len(),
        blocks = project.scene.blocks.len(),
        "project saved"
    );
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp_path = path.to_path_buf();
    let extension = tmp_path
        .extension()
        .map(|e| format!("{}.tmp", e.to_string_lossy()))
        .unwrap_or_else(|| "tmp".to_string());
    tmp_path.set_extension(extension);
    tmp_path
}

/// Load a project from a file.
///
/// # Returns
///
/// * `Err(WallError::VersionMismatch)` - file schema is incompatible
/// * `Err(WallError::SerializationError)` - invalid JSON
/// * `Err(WallError::ColumnIndexOutOfRange | InvalidDocument)` - the scene is malformed
/// * `Err(WallError::FileError)` - I/O error
pub fn load_project(path: &Path) -> WallResult<Project> {
    let contents = read_to_string(path, "read")?;

    let project: Project = serde_json::from_str(&contents).map_err(|e| WallError::SerializationError {
        reason: format!("Invalid JSON in {}: {}", path.display(), e),
    })?;

    validate_version(&project.meta.version)?;
    project.validate()?;

    debug!(path = %path.display(), name = %project.meta.name, "project loaded");
    Ok(project)
}

/// Load a project, also reporting whether someone else holds its lock.
///
/// * `Ok((Project, None))` - loaded, no lock
/// * `Ok((Project, Some(LockInfo)))` - loaded, but another user has the lock
pub fn load_project_with_lock_check(path: &Path) -> WallResult<(Project, Option<LockInfo>)> {
    let project = load_project(path)?;
    let lock_info = FileLock::check(path);
    Ok((project, lock_info))
}

/// Validate that a file version is compatible with the current schema.
fn validate_version(file_version: &str) -> WallResult<()> {
    let mismatch = || WallError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let parse = |v: &str| -> Option<Vec<u32>> { v.split('.').map(|p| p.parse().ok()).collect() };
    let (Some(file_parts), Some(current_parts)) = (parse(file_version), parse(SCHEMA_VERSION)) else {
        return Err(mismatch());
    };

    // Major version must match
    if file_parts.first() != current_parts.first() {
        return Err(mismatch());
    }

    // For 0.x, a newer minor may carry breaking changes
    if current_parts.first() == Some(&0) {
        if let (Some(file_minor), Some(current_minor)) = (file_parts.get(1), current_parts.get(1)) {
            if file_minor > current_minor {
                return Err(mismatch());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::StructureGraph;
    use std::env::temp_dir;

    fn temp_project_path(name: &str) -> PathBuf {
        temp_dir().join(format!("wallkit_test_{}.wall", name))
    }

    #[test]
    fn test_lock_path_generation() {
        let project_path = Path::new("/path/to/scene.wall");
        assert_eq!(lock_path_for(project_path), Path::new("/path/to/scene.wall.lock"));
        assert_eq!(tmp_path_for(project_path), Path::new("/path/to/scene.wall.tmp"));
        assert_eq!(lock_path_for(Path::new("scene")), Path::new("scene.lock"));
    }

    #[test]
    fn test_lock_info_creation() {
        let info = LockInfo::new("alex");
        assert_eq!(info.user_id, "alex");
        assert!(info.pid > 0);
    }

    #[test]
    fn test_old_lock_is_stale() {
        let mut info = LockInfo::new("alex");
        info.machine = "some-other-host".to_string();
        assert!(!info.is_stale());
        info.locked_at = Utc::now() - chrono::Duration::hours(25);
        assert!(info.is_stale());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = temp_project_path("roundtrip");

        let mut graph = StructureGraph::seeded();
        let a = graph.column_at(0).unwrap();
        let b = graph.add_column(1.5, 0.0);
        let block = graph.add_block(a, b, 0.205).unwrap();
        let project = Project::from_graph("Roundtrip", &graph);
        save_project(&project, &path).unwrap();

        let loaded = load_project(&path).unwrap();
        assert_eq!(loaded.meta.name, "Roundtrip");
        assert_eq!(loaded.scene, project.scene);
        assert!(loaded.to_graph().unwrap().contains_block(&block));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_atomic_save_creates_no_tmp_file() {
        let path = temp_project_path("atomic");
        let tmp_path = tmp_path_for(&path);

        save_project(&Project::new("Atomic"), &path).unwrap();

        assert!(!tmp_path.exists());
        assert!(path.exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_bad_scene() {
        let path = temp_project_path("bad_scene");
        let mut project = Project::new("Bad");
        project.scene.blocks.push(crate::codec::BlockRecord {
            id: "a".to_string(),
            from_column_index: 0,
            to_column_index: 9,
            y: 0.2,
        });
        save_project(&project, &path).unwrap();

        let err = load_project(&path).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_INDEX_OUT_OF_RANGE");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_file() {
        let path = temp_project_path("does_not_exist");
        let _ = fs::remove_file(&path);
        assert_eq!(load_project(&path).unwrap_err().error_code(), "FILE_ERROR");
    }

    #[test]
    fn test_load_invalid_json() {
        let path = temp_project_path("invalid_json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_project(&path),
            Err(WallError::SerializationError { .. })
        ));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_file_lock_acquire_and_release() {
        let path = temp_project_path("lock_test");
        File::create(&path).unwrap();

        let lock = FileLock::acquire(&path, "alex").unwrap();
        assert_eq!(lock.info.user_id, "alex");
        assert_eq!(lock.project_path(), path.as_path());

        let lock_path = lock_path_for(&path);
        assert!(lock_path.exists());

        drop(lock);
        assert!(!lock_path.exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_live_lock_blocks_second_acquire() {
        let path = temp_project_path("lock_contention");
        File::create(&path).unwrap();

        // Held on another machine, taken just now
        let foreign = LockInfo {
            user_id: "sam".to_string(),
            machine: "far-away-host".to_string(),
            pid: 1,
            locked_at: Utc::now(),
        };
        let lock_path = lock_path_for(&path);
        fs::write(&lock_path, serde_json::to_string(&foreign).unwrap()).unwrap();

        let err = FileLock::acquire(&path, "alex").err().unwrap();
        assert_eq!(err.error_code(), "FILE_LOCKED");
        assert!(err.to_string().contains("sam"));
        assert_eq!(FileLock::check(&path).map(|i| i.user_id), Some("sam".to_string()));

        let _ = fs::remove_file(&lock_path);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(SCHEMA_VERSION).is_ok());
        assert!(validate_version("0.1.5").is_ok());
        assert!(validate_version("0.0.9").is_ok());

        assert!(validate_version("1.0.0").is_err());
        assert!(validate_version("0.2.0").is_err());
        assert!(validate_version("banana").is_err());
    }

    #[test]
    fn test_load_with_lock_check() {
        let path = temp_project_path("lock_check");
        save_project(&Project::new("Checked"), &path).unwrap();

        let (loaded, lock_info) = load_project_with_lock_check(&path).unwrap();
        assert_eq!(loaded.meta.name, "Checked");
        assert!(lock_info.is_none());

        let _ = fs::remove_file(&path);
    }
}
