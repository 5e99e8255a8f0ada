//! Filesystem-backed staging cache.
//!
//! # Storage Layout
//!
//! ```text
//! <root>/
//! └── <user_token>/              # one namespace per submitting user
//!     └── <session_id>/          # UNIX seconds, six fractional digits
//!         └── <file_name>        # exactly one staged file
//! ```
//!
//! # Eviction
//!
//! [`StickyStore::evict`] runs before every save and walks the tree synchronously:
//!
//! 1. Too many files overall: the whole root goes.
//! 2. Too many files for one user: that user's namespace goes.
//! 3. Session directories older than the stickiness window go (all of them when forced).
//!    Entries whose names are not numbers are not ours and are never touched.
//! 4. A namespace left empty goes.
//!
//! Removal is best effort. Failures are logged and the sweep carries on.
//!
//! # Concurrency
//!
//! There is no locking. Saves write to a temp file in the session directory and rename it
//! into place, so a reader sees either nothing or the complete file. A sweep running in
//! another request can still delete a session between a save and a later load; the load then
//! reports [`LoadOutcome::NotFound`].

use crate::{FilesError, StickyConfig, StickyKey};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use sticky_session_id::{timestamp_secs, SessionIdGenerator, StickySessionId};
use tempfile::NamedTempFile;

/// A staged file read back from the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedFile {
    /// Name the file was uploaded with
    pub name: String,

    /// File content
    pub bytes: Vec<u8>,

    /// Absolute location on disk
    pub path: PathBuf,
}

/// Result of looking up a staged file.
///
/// Missing identifiers, invalid identifiers and absent files all collapse into
/// [`LoadOutcome::NotFound`]; callers treat every one of them as "nothing staged".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Found(StagedFile),
    NotFound,
}

impl LoadOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, LoadOutcome::Found(_))
    }

    pub fn into_staged(self) -> Option<StagedFile> {
        match self {
            LoadOutcome::Found(staged) => Some(staged),
            LoadOutcome::NotFound => None,
        }
    }
}

/// What a sweep removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EvictionReport {
    /// The global file limit was exceeded and the whole root was deleted
    pub root_purged: bool,

    /// User namespaces deleted, either over their file limit or left empty
    pub users_removed: usize,

    /// Session directories deleted for age (or because the sweep was forced)
    pub sessions_removed: usize,
}

/// Point-in-time counts for a store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StoreStats {
    pub files: usize,
    pub users: usize,
    pub sessions: usize,
}

/// Staging cache rooted at [`StickyConfig::dir`].
///
/// One store is normally created at startup and shared by every request. It holds the
/// session id generator so ids stay unique across requests within the process.
#[derive(Debug)]
pub struct StickyStore {
    config: StickyConfig,
    ids: SessionIdGenerator,
}

impl StickyStore {
    pub fn new(config: StickyConfig) -> Self {
        Self {
            config,
            ids: SessionIdGenerator::new(),
        }
    }

    pub fn config(&self) -> &StickyConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        self.config.dir()
    }

    /// Returns a session id that no other upload through this store has used.
    pub fn next_session_id(&self) -> StickySessionId {
        self.ids.next_id()
    }

    /// `<root>/<user_token>/<session_id>/<file_name>`
    pub fn path_for(&self, key: &StickyKey) -> PathBuf {
        key.path(self.root())
    }

    /// Stages `bytes` under `key`, replacing anything already there.
    ///
    /// Runs an eviction sweep first so the store cannot grow without bound.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::Io`] if the session directory cannot be created or the file
    /// cannot be written and moved into place. Nothing is left at the key path on failure.
    pub fn save(&self, key: &StickyKey, bytes: &[u8]) -> Result<PathBuf, FilesError> {
        self.evict(false);

        let session_dir = key.session_dir(self.root());
        let path = self.path_for(key);

        fs::create_dir_all(&session_dir).map_err(|e| {
            io_context(
                e,
                format!(
                    "Failed to create session directory {}",
                    session_dir.display()
                ),
            )
        })?;

        let mut staging = NamedTempFile::new_in(&session_dir).map_err(|e| {
            io_context(
                e,
                format!("Failed to create temp file in {}", session_dir.display()),
            )
        })?;

        staging
            .write_all(bytes)
            .and_then(|()| staging.as_file().sync_data())
            .map_err(|e| {
                io_context(
                    e,
                    format!("Failed to write temp file for {}", path.display()),
                )
            })?;

        staging.persist(&path).map_err(|e| {
            io_context(
                e.error,
                format!("Failed to move staged file into {}", path.display()),
            )
        })?;

        tracing::debug!(
            user = key.user_token(),
            session = %key.session_id(),
            file = key.file_name(),
            size = bytes.len(),
            "staged upload"
        );

        Ok(path)
    }

    /// Reads the file staged under `key`.
    pub fn load(&self, key: &StickyKey) -> LoadOutcome {
        let path = self.path_for(key);

        match fs::read(&path) {
            Ok(bytes) => LoadOutcome::Found(StagedFile {
                name: key.file_name().to_owned(),
                bytes,
                path,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no staged file");
                LoadOutcome::NotFound
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read staged file");
                LoadOutcome::NotFound
            }
        }
    }

    /// Reads a staged file addressed by raw, possibly missing, identifiers.
    pub fn load_parts(
        &self,
        user_token: Option<&str>,
        session_id: Option<&str>,
        file_name: Option<&str>,
    ) -> LoadOutcome {
        match StickyKey::from_parts(user_token, session_id, file_name) {
            Ok(key) => self.load(&key),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring staged file reference");
                LoadOutcome::NotFound
            }
        }
    }

    /// Runs the eviction sweep against the current time.
    ///
    /// With `force` set every session directory is removed regardless of age.
    pub fn evict(&self, force: bool) -> EvictionReport {
        self.evict_at(Utc::now(), force)
    }

    /// Runs the eviction sweep as if the current time were `now`.
    pub fn evict_at(&self, now: DateTime<Utc>, force: bool) -> EvictionReport {
        let mut report = EvictionReport::default();
        let root = self.root();

        // Unreadable or missing root: nothing to flush.
        let Ok(entries) = fs::read_dir(root) else {
            return report;
        };
        let user_dirs: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| is_real_dir(path))
            .collect();

        let total = count_files(root);
        if total > self.config.max_sticky_files() {
            tracing::info!(
                root = %root.display(),
                files = total,
                limit = self.config.max_sticky_files(),
                "sticky store over capacity; purging"
            );
            remove_tree(root);
            report.root_purged = true;
            return report;
        }

        let now_secs = now.timestamp_micros() as f64 / 1_000_000.0;
        let stickiness_secs = self.config.stickiness().as_secs_f64();

        for user_path in user_dirs {
            let user_files = count_files(&user_path);
            if user_files > self.config.max_files_per_user() {
                tracing::info!(
                    user = %user_path.display(),
                    files = user_files,
                    limit = self.config.max_files_per_user(),
                    "user namespace over capacity; purging"
                );
                remove_tree(&user_path);
                report.users_removed += 1;
                continue;
            }

            let sessions = match fs::read_dir(&user_path) {
                Ok(sessions) => sessions,
                Err(e) => {
                    tracing::warn!(user = %user_path.display(), error = %e, "cannot list sessions");
                    continue;
                }
            };

            for session in sessions.flatten() {
                let name = session.file_name();
                let Some(created) = name.to_str().and_then(timestamp_secs) else {
                    continue;
                };

                if now_secs - created > stickiness_secs || force {
                    let session_path = session.path();
                    if !is_real_dir(&session_path) {
                        continue;
                    }
                    remove_tree(&session_path);
                    report.sessions_removed += 1;
                }
            }

            if is_empty_dir(&user_path) {
                remove_tree(&user_path);
                report.users_removed += 1;
            }
        }

        if report != EvictionReport::default() {
            tracing::debug!(
                users_removed = report.users_removed,
                sessions_removed = report.sessions_removed,
                "eviction sweep finished"
            );
        }

        report
    }

    /// Counts files, user namespaces and session directories currently on disk.
    pub fn stats(&self) -> StoreStats {
        let root = self.root();
        let mut stats = StoreStats {
            files: count_files(root),
            ..StoreStats::default()
        };

        let Ok(users) = fs::read_dir(root) else {
            return stats;
        };

        for user in users.flatten() {
            let user_path = user.path();
            if !is_real_dir(&user_path) {
                continue;
            }
            stats.users += 1;

            if let Ok(sessions) = fs::read_dir(&user_path) {
                stats.sessions += sessions
                    .flatten()
                    .filter(|session| is_real_dir(&session.path()))
                    .count();
            }
        }

        stats
    }
}

fn io_context(e: std::io::Error, context: String) -> FilesError {
    FilesError::Io(std::io::Error::new(e.kind(), format!("{}: {}", context, e)))
}

/// True for directories, without following symlinks.
fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_dir())
        .unwrap_or(false)
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

/// Counts every non-directory entry beneath `path`. Unreadable directories count as empty.
fn count_files(path: &Path) -> usize {
    let Ok(entries) = fs::read_dir(path) else {
        return 0;
    };

    entries
        .flatten()
        .map(|entry| match entry.file_type() {
            Ok(kind) if kind.is_dir() => count_files(&entry.path()),
            Ok(_) => 1,
            Err(_) => 0,
        })
        .sum()
}

fn remove_tree(path: &Path) {
    if let Err(e) = fs::remove_dir_all(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove sticky directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn store_in(temp: &TempDir) -> StickyStore {
        StickyStore::new(StickyConfig::new(temp.path().join("sticky")))
    }

    fn new_key(store: &StickyStore, user: &str, file: &str) -> StickyKey {
        StickyKey::new(user, store.next_session_id(), file).unwrap()
    }

    /// Plants a staged file directly on disk under an arbitrary session directory name.
    fn plant(root: &Path, user: &str, session: &str, file: &str) -> PathBuf {
        let dir = root.join(user).join(session);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(file);
        fs::write(&path, b"planted").unwrap();
        path
    }

    #[test]
    fn test_save_then_load_returns_same_bytes() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let key = new_key(&store, "tok", "photo.jpg");
        let content: Vec<u8> = (0..=255).collect();

        let path = store.save(&key, &content).unwrap();
        assert_eq!(path, store.path_for(&key));

        match store.load(&key) {
            LoadOutcome::Found(staged) => {
                assert_eq!(staged.bytes, content);
                assert_eq!(staged.name, "photo.jpg");
                assert_eq!(staged.path, path);
            }
            LoadOutcome::NotFound => panic!("expected staged file"),
        }
    }

    #[test]
    fn test_save_creates_missing_root() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        assert!(!store.root().exists());

        store.save(&new_key(&store, "tok", "a.txt"), b"x").unwrap();
        assert!(store.root().is_dir());
    }

    #[test]
    fn test_save_overwrites_existing_file() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let key = new_key(&store, "tok", "a.txt");

        store.save(&key, b"first").unwrap();
        store.save(&key, b"second").unwrap();

        let staged = store.load(&key).into_staged().unwrap();
        assert_eq!(staged.bytes, b"second");
    }

    #[test]
    fn test_save_leaves_single_file_in_session_dir() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let key = new_key(&store, "tok", "a.txt");

        store.save(&key, b"content").unwrap();

        let entries: Vec<_> = fs::read_dir(key.session_dir(store.root()))
            .unwrap()
            .flatten()
            .map(|e| e.file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("a.txt")]);
    }

    #[test]
    fn test_save_empty_file() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let key = new_key(&store, "tok", "empty.dat");

        store.save(&key, b"").unwrap();
        let staged = store.load(&key).into_staged().unwrap();
        assert!(staged.bytes.is_empty());
    }

    #[test]
    fn test_save_fails_when_root_is_a_file() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("sticky");
        fs::write(&root, b"not a directory").unwrap();
        let store = StickyStore::new(StickyConfig::new(&root));

        let result = store.save(&new_key(&store, "tok", "a.txt"), b"x");
        assert!(matches!(result, Err(FilesError::Io(_))));
    }

    #[test]
    fn test_distinct_sessions_do_not_overwrite() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let first = new_key(&store, "tok", "a.txt");
        let second = new_key(&store, "tok", "a.txt");
        assert_ne!(first, second);

        store.save(&first, b"one").unwrap();
        store.save(&second, b"two").unwrap();

        assert_eq!(store.load(&first).into_staged().unwrap().bytes, b"one");
        assert_eq!(store.load(&second).into_staged().unwrap().bytes, b"two");
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        assert_eq!(store.load(&new_key(&store, "tok", "a.txt")), LoadOutcome::NotFound);
    }

    #[test]
    fn test_load_parts_collapses_bad_references() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let key = new_key(&store, "tok", "a.txt");
        store.save(&key, b"x").unwrap();
        let session = key.session_id().to_string();

        assert!(store
            .load_parts(Some("tok"), Some(&session), Some("a.txt"))
            .is_found());

        assert_eq!(store.load_parts(None, Some(&session), Some("a.txt")), LoadOutcome::NotFound);
        assert_eq!(store.load_parts(Some("tok"), None, Some("a.txt")), LoadOutcome::NotFound);
        assert_eq!(store.load_parts(Some("tok"), Some(&session), None), LoadOutcome::NotFound);
        assert_eq!(
            store.load_parts(Some("tok"), Some("not-a-session"), Some("a.txt")),
            LoadOutcome::NotFound
        );
        assert_eq!(
            store.load_parts(Some("tok"), Some("1.000000"), Some("a.txt")),
            LoadOutcome::NotFound
        );
        assert_eq!(
            store.load_parts(Some("other"), Some(&session), Some("a.txt")),
            LoadOutcome::NotFound
        );
    }

    #[test]
    fn test_load_parts_rejects_traversal() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        plant(store.root(), "victim", "1767225600.000000", "secret.txt");

        let outcome = store.load_parts(
            Some("tok"),
            Some("1767225600.000000"),
            Some("../../victim/1767225600.000000/secret.txt"),
        );
        assert_eq!(outcome, LoadOutcome::NotFound);
    }

    #[test]
    fn test_evict_missing_root_is_noop() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        assert_eq!(store.evict(true), EvictionReport::default());
        assert!(!store.root().exists());
    }

    #[test]
    fn test_evict_removes_expired_sessions() {
        let temp = TempDir::new().unwrap();
        let store = StickyStore::new(
            StickyConfig::new(temp.path().join("sticky")).with_stickiness(Duration::from_secs(60)),
        );
        let old = plant(store.root(), "tok", "1000.000000", "old.txt");
        let fresh = plant(store.root(), "tok", "1100.000000", "fresh.txt");
        let now = DateTime::from_timestamp(1120, 0).unwrap();

        let report = store.evict_at(now, false);

        assert_eq!(report.sessions_removed, 1);
        assert!(!old.exists());
        assert!(!old.parent().unwrap().exists());
        assert!(fresh.exists());
    }

    #[test]
    fn test_session_exactly_at_stickiness_survives() {
        let temp = TempDir::new().unwrap();
        let store = StickyStore::new(
            StickyConfig::new(temp.path().join("sticky")).with_stickiness(Duration::from_secs(60)),
        );
        let path = plant(store.root(), "tok", "1000.000000", "a.txt");

        store.evict_at(DateTime::from_timestamp(1060, 0).unwrap(), false);
        assert!(path.exists());

        store.evict_at(DateTime::from_timestamp(1061, 0).unwrap(), false);
        assert!(!path.exists());
    }

    #[test]
    fn test_load_after_stickiness_elapsed_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let key = new_key(&store, "tok", "a.txt");
        store.save(&key, b"x").unwrap();

        let later = Utc::now() + chrono::Duration::seconds(3601);
        store.evict_at(later, false);

        assert_eq!(store.load(&key), LoadOutcome::NotFound);
    }

    #[test]
    fn test_forced_evict_removes_fresh_sessions() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let key = new_key(&store, "tok", "a.txt");
        store.save(&key, b"x").unwrap();

        let report = store.evict(true);

        assert_eq!(report.sessions_removed, 1);
        assert_eq!(report.users_removed, 1);
        assert_eq!(store.load(&key), LoadOutcome::NotFound);
        assert!(!store.root().join("tok").exists());
    }

    #[test]
    fn test_evict_keeps_non_numeric_entries() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let unmanaged = plant(store.root(), "tok", "keep-me", "notes.txt");

        let report = store.evict(true);

        assert_eq!(report, EvictionReport::default());
        assert!(unmanaged.exists());
    }

    #[test]
    fn test_non_finite_session_names_are_sessions() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let inf = plant(store.root(), "tok", "inf", "a.txt");
        let nan = plant(store.root(), "tok", "NaN", "b.txt");

        // Never old enough for an ordinary sweep.
        assert_eq!(store.evict(false).sessions_removed, 0);
        assert!(inf.exists());
        assert!(nan.exists());

        let report = store.evict(true);
        assert_eq!(report.sessions_removed, 2);
        assert!(!inf.exists());
        assert!(!nan.exists());
    }

    #[test]
    fn test_evict_skips_numeric_files() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let user_dir = store.root().join("tok");
        fs::create_dir_all(&user_dir).unwrap();
        let stray = user_dir.join("1000.000000");
        fs::write(&stray, b"not a session dir").unwrap();

        store.evict(true);

        assert!(stray.is_file());
    }

    #[test]
    fn test_evict_prunes_empty_user_namespace() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        fs::create_dir_all(store.root().join("idle")).unwrap();

        let report = store.evict(false);

        assert_eq!(report.users_removed, 1);
        assert!(!store.root().join("idle").exists());
        assert!(store.root().exists());
    }

    #[test]
    fn test_evict_ignores_files_at_root() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        fs::create_dir_all(store.root()).unwrap();
        let stray = store.root().join("README");
        fs::write(&stray, b"hello").unwrap();

        store.evict(true);

        assert!(stray.exists());
    }

    #[test]
    fn test_save_purges_user_over_limit() {
        let temp = TempDir::new().unwrap();
        let store = StickyStore::new(
            StickyConfig::new(temp.path().join("sticky")).with_max_files_per_user(2),
        );
        let mut earlier = Vec::new();
        for i in 0..3 {
            let key = new_key(&store, "tok", &format!("file{i}.txt"));
            // Plant directly so the limit is exceeded before the next save sweeps.
            let path = store.path_for(&key);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, b"x").unwrap();
            earlier.push(key);
        }
        let other = plant(store.root(), "other", "keep", "other.txt");

        let newest = new_key(&store, "tok", "new.txt");
        store.save(&newest, b"new").unwrap();

        for key in &earlier {
            assert_eq!(store.load(key), LoadOutcome::NotFound);
        }
        assert!(store.load(&newest).is_found());
        assert_eq!(count_files(&store.root().join("tok")), 1);
        assert!(other.exists());
    }

    #[test]
    fn test_user_at_limit_is_kept() {
        let temp = TempDir::new().unwrap();
        let store = StickyStore::new(
            StickyConfig::new(temp.path().join("sticky")).with_max_files_per_user(2),
        );
        let a = new_key(&store, "tok", "a.txt");
        let b = new_key(&store, "tok", "b.txt");
        store.save(&a, b"a").unwrap();
        store.save(&b, b"b").unwrap();

        let report = store.evict(false);

        assert_eq!(report, EvictionReport::default());
        assert!(store.load(&a).is_found());
        assert!(store.load(&b).is_found());
    }

    #[test]
    fn test_save_purges_root_over_global_limit() {
        let temp = TempDir::new().unwrap();
        let store = StickyStore::new(
            StickyConfig::new(temp.path().join("sticky")).with_max_sticky_files(3),
        );
        for user in ["a", "b", "c", "d"] {
            plant(store.root(), user, "keep", "f.txt");
        }

        let key = new_key(&store, "tok", "new.txt");
        store.save(&key, b"new").unwrap();

        let stats = store.stats();
        assert_eq!(stats.files, 1);
        assert_eq!(stats.users, 1);
        assert!(store.load(&key).is_found());
    }

    #[test]
    fn test_evict_reports_root_purge() {
        let temp = TempDir::new().unwrap();
        let store = StickyStore::new(
            StickyConfig::new(temp.path().join("sticky")).with_max_sticky_files(1),
        );
        plant(store.root(), "a", "1.000000", "f.txt");
        plant(store.root(), "b", "1.000000", "f.txt");

        let report = store.evict(false);

        assert!(report.root_purged);
        assert!(!store.root().exists());
    }

    #[test]
    fn test_stats_counts_tree() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        assert_eq!(store.stats(), StoreStats::default());

        store.save(&new_key(&store, "a", "1.txt"), b"1").unwrap();
        store.save(&new_key(&store, "a", "2.txt"), b"2").unwrap();
        store.save(&new_key(&store, "b", "3.txt"), b"3").unwrap();

        assert_eq!(
            store.stats(),
            StoreStats {
                files: 3,
                users: 2,
                sessions: 3,
            }
        );
    }

    #[test]
    fn test_report_serialises() {
        let report = EvictionReport {
            root_purged: false,
            users_removed: 2,
            sessions_removed: 5,
        };
        let json = serde_json::to_value(report).unwrap();
        assert_eq!(json["users_removed"], 2);
        assert_eq!(json["sessions_removed"], 5);
        assert_eq!(json["root_purged"], false);
    }
}
