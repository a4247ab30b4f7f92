// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use super::{KeyValueStore, StoreError};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Temp file plus atomic rename, without fsync.
    #[default]
    BestEffort,
    /// Also syncs the file and its directory where the platform allows it.
    Durable,
}

/// One JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    durability: WriteDurability,
}

fn io_error(path: &Path, source: io::Error) -> StoreError {
    StoreError::Io { path: path.display().to_string(), message: source.to_string() }
}

fn validate_key(key: &str) -> Result<(), StoreError> {
    let reason = if key.is_empty() {
        "key is empty"
    } else if key.contains(['/', '\\']) {
        "key contains a path separator"
    } else if key.contains("..") {
        "key contains '..'"
    } else if key.chars().any(|ch| ch.is_control()) {
        "key contains a control character"
    } else {
        return Ok(());
    };
    Err(StoreError::InvalidKey { key: key.to_owned(), reason })
}

fn rename_overwrite(from: &Path, to: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::AlreadyExists | io::ErrorKind::PermissionDenied
                ) =>
            {
                let _ = fs::remove_file(to);
                fs::rename(from, to)
            }
            Err(err) => Err(err),
        }
    }

    #[cfg(not(windows))]
    {
        fs::rename(from, to)
    }
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), durability: WriteDurability::default() }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.json")))
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(|source| io_error(&self.root, source))?;

        let Some(file_name) = path.file_name() else {
            return Err(io_error(path, io::Error::other("path has no file name")));
        };
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
        let tmp_path = self
            .root
            .join(format!(".tessera.tmp.{}.{}", file_name.to_string_lossy(), nanos));

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
            .map_err(|source| io_error(&tmp_path, source))?;
        file.write_all(contents).map_err(|source| io_error(&tmp_path, source))?;
        if self.durability == WriteDurability::Durable {
            file.sync_all().map_err(|source| io_error(&tmp_path, source))?;
        }
        drop(file);

        if let Err(source) = rename_overwrite(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(io_error(path, source));
        }

        if self.durability == WriteDurability::Durable {
            #[cfg(unix)]
            {
                let dir = fs::File::open(&self.root).map_err(|source| io_error(&self.root, source))?;
                dir.sync_all().map_err(|source| io_error(&self.root, source))?;
            }
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn load_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(io_error(&path, source)),
        }
    }

    fn save_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        self.write_atomic(&path, value.as_bytes())?;
        tracing::debug!(key, path = %path.display(), bytes = value.len(), "store value written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(key, "store value removed");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(io_error(&path, source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    use rstest::{fixture, rstest};

    use super::{FileStore, WriteDurability};
    use crate::model::{ConversationLog, ConversationTurn, Role};
    use crate::store::{chat_key, KeyValueStore, KeyValueStoreExt, StoreError};

    static TEMP_DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

    struct TempDir {
        path: std::path::PathBuf,
    }

    impl TempDir {
        fn new(prefix: &str) -> Self {
            let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
            let counter = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
            let mut path = env::temp_dir();
            path.push(format!("tessera-{prefix}-{}-{nanos}-{counter}", std::process::id()));
            Self { path }
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }

    #[fixture]
    fn tmp() -> TempDir {
        TempDir::new("file-store")
    }

    #[rstest]
    fn missing_keys_load_as_none(tmp: TempDir) {
        let store = FileStore::new(&tmp.path);
        assert_eq!(store.load_raw("tessera.sidebar.ada").expect("load"), None);
        store.remove("tessera.sidebar.ada").expect("removing a missing key is fine");
    }

    #[rstest]
    fn conversation_tail_survives_a_reopen(tmp: TempDir) {
        let mut log = ConversationLog::default();
        log.append(Role::User, "payments platform", None);
        log.append(Role::Assistant, "Here is your diagram", None);

        let store = FileStore::new(&tmp.path).with_durability(WriteDurability::Durable);
        store.save(&chat_key("ada"), log.persisted_tail()).expect("save");

        let reopened = FileStore::new(&tmp.path);
        let turns = reopened
            .load::<Vec<ConversationTurn>>(&chat_key("ada"))
            .expect("load")
            .expect("stored");
        assert_eq!(turns, log.turns());
        assert!(tmp.path.join("tessera.chat.ada.json").is_file());
    }

    #[rstest]
    #[case("")]
    #[case("../escape")]
    #[case("nested/key")]
    #[case("a\\b")]
    fn path_like_keys_are_refused(tmp: TempDir, #[case] key: &str) {
        let store = FileStore::new(&tmp.path);
        let err = store.save_raw(key, "true").expect_err("invalid key");
        assert!(matches!(err, StoreError::InvalidKey { .. }));
    }

    #[rstest]
    fn overwrites_replace_the_previous_value(tmp: TempDir) {
        let store = FileStore::new(&tmp.path);
        store.save("flag", &true).expect("save");
        store.save("flag", &false).expect("save");
        assert_eq!(store.load::<bool>("flag").expect("load"), Some(false));

        let leftovers = std::fs::read_dir(&tmp.path)
            .expect("read dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(".tessera.tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }
}
