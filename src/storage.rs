use crate::errors::{AppError, AppResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Filesystem contract the stores are written against.
pub trait Storage: Send + Sync {
    fn ensure_directory(&self, path: &Path) -> AppResult<()>;
    /// `Ok(None)` when the file does not exist.
    fn read_text(&self, path: &Path) -> AppResult<Option<String>>;
    fn write_text(&self, path: &Path, content: &str) -> AppResult<()>;
    fn rename(&self, from: &Path, to: &Path) -> AppResult<()>;
    /// Missing files are not an error.
    fn remove_file(&self, path: &Path) -> AppResult<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl Storage for FsStorage {
    fn ensure_directory(&self, path: &Path) -> AppResult<()> {
        fs::create_dir_all(path).map_err(|error| AppError::Io(error.to_string()))
    }

    fn read_text(&self, path: &Path) -> AppResult<Option<String>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(AppError::Io(error.to_string())),
        }
    }

    /// Flushes to disk before returning so a following rename never exposes a
    /// partially written file.
    fn write_text(&self, path: &Path, content: &str) -> AppResult<()> {
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> AppResult<()> {
        fs::rename(from, to).map_err(|error| AppError::Io(error.to_string()))
    }

    fn remove_file(&self, path: &Path) -> AppResult<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(AppError::Io(error.to_string())),
        }
    }
}

/// A single JSON document persisted with write-temp-then-rename.
pub struct DurableRecord<T> {
    storage: Arc<dyn Storage>,
    path: PathBuf,
    parse_error_code: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> DurableRecord<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(storage: Arc<dyn Storage>, path: PathBuf, parse_error_code: &'static str) -> Self {
        Self {
            storage,
            path,
            parse_error_code,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    pub fn load(&self) -> AppResult<Option<T>> {
        let Some(content) = self.storage.read_text(&self.path)? else {
            return Ok(None);
        };
        serde_json::from_str(&content).map(Some).map_err(|error| {
            tracing::warn!(
                path = %self.path.display(),
                code = self.parse_error_code,
                error = %error,
                "durable record is not valid json"
            );
            AppError::Parse {
                code: self.parse_error_code,
                path: self.path.display().to_string(),
                message: error.to_string(),
            }
        })
    }

    /// Loads the document, writing `default` first if the file is absent.
    pub fn load_or_init(&self, default: impl FnOnce() -> T) -> AppResult<(T, bool)> {
        if let Some(existing) = self.load()? {
            return Ok((existing, false));
        }
        let value = default();
        self.save(&value)?;
        Ok((value, true))
    }

    pub fn save(&self, value: &T) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            self.storage.ensure_directory(parent)?;
        }
        let content = serde_json::to_string_pretty(value)?;
        let temp = self.temp_path();
        if let Err(error) = self
            .storage
            .write_text(&temp, &content)
            .and_then(|()| self.storage.rename(&temp, &self.path))
        {
            if let Err(cleanup) = self.storage.remove_file(&temp) {
                tracing::warn!(
                    path = %temp.display(),
                    error = %cleanup,
                    "failed to remove temp file"
                );
            }
            return Err(error);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Doc {
        items: Vec<String>,
    }

    fn record(root: &Path) -> DurableRecord<Doc> {
        DurableRecord::new(Arc::new(FsStorage), root.join("nested/doc.json"), "DOC_PARSE_ERROR")
    }

    #[test]
    fn missing_file_loads_as_none_and_init_persists_default() {
        let root = tempfile::tempdir().expect("temp root");
        let record = record(root.path());
        assert!(record.load().expect("load").is_none());

        let (doc, created) = record
            .load_or_init(|| Doc { items: vec!["seed".to_string()] })
            .expect("init");
        assert!(created);
        assert_eq!(doc.items, vec!["seed".to_string()]);
        assert!(record.path().exists());

        let (again, created) = record.load_or_init(|| Doc { items: vec![] }).expect("reload");
        assert!(!created);
        assert_eq!(again, doc);
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let root = tempfile::tempdir().expect("temp root");
        let record = record(root.path());
        record.save(&Doc { items: vec!["a".to_string()] }).expect("save");
        assert!(!root.path().join("nested/doc.json.tmp").exists());
        assert_eq!(
            record.load().expect("load"),
            Some(Doc { items: vec!["a".to_string()] })
        );
    }

    #[test]
    fn invalid_json_is_a_parse_error_and_file_is_untouched() {
        let root = tempfile::tempdir().expect("temp root");
        let record = record(root.path());
        fs::create_dir_all(root.path().join("nested")).expect("mkdir");
        fs::write(record.path(), "{ not json").expect("write garbage");

        let error = record.load().expect_err("parse error");
        assert_eq!(error.code(), "DOC_PARSE_ERROR");
        assert!(record.load_or_init(|| Doc { items: vec![] }).is_err());
        assert_eq!(fs::read_to_string(record.path()).expect("read"), "{ not json");
    }

    #[derive(Default)]
    struct FailingRename {
        written: Mutex<Vec<PathBuf>>,
        removed: Mutex<Vec<PathBuf>>,
    }

    impl Storage for FailingRename {
        fn ensure_directory(&self, _path: &Path) -> AppResult<()> {
            Ok(())
        }

        fn read_text(&self, _path: &Path) -> AppResult<Option<String>> {
            Ok(None)
        }

        fn write_text(&self, path: &Path, _content: &str) -> AppResult<()> {
            self.written.lock().expect("written lock").push(path.to_path_buf());
            Ok(())
        }

        fn rename(&self, _from: &Path, _to: &Path) -> AppResult<()> {
            Err(AppError::Io("disk full".to_string()))
        }

        fn remove_file(&self, path: &Path) -> AppResult<()> {
            self.removed.lock().expect("removed lock").push(path.to_path_buf());
            Ok(())
        }
    }

    #[test]
    fn failed_rename_propagates_and_removes_the_temp_file() {
        let storage = Arc::new(FailingRename::default());
        let record: DurableRecord<Doc> = DurableRecord::new(
            storage.clone(),
            PathBuf::from("/data/doc.json"),
            "DOC_PARSE_ERROR",
        );

        let error = record.save(&Doc { items: vec![] }).expect_err("rename fails");
        assert_eq!(error.to_string(), "IO_FAILURE: disk full");
        assert_eq!(
            storage.written.lock().expect("written lock").as_slice(),
            &[PathBuf::from("/data/doc.json.tmp")]
        );
        assert_eq!(
            storage.removed.lock().expect("removed lock").as_slice(),
            &[PathBuf::from("/data/doc.json.tmp")]
        );
    }

    #[test]
    fn fs_write_text_replaces_existing_temp_contents() {
        let root = tempfile::tempdir().expect("temp root");
        let path = root.path().join("doc.json.tmp");
        fs::write(&path, "stale content that is longer than the new one").expect("seed");

        FsStorage.write_text(&path, "{}").expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "{}");

        FsStorage.remove_file(&path).expect("remove");
        assert!(!path.exists());
        FsStorage.remove_file(&path).expect("missing file is fine");
    }
}
