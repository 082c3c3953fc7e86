use std::{
    collections::BTreeMap,
    future::Future,
    io::ErrorKind,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use log::error;
use tokio::fs;

use crate::error::DiaryError;

use super::{date::EntryDate, entry::DiaryEntry};

/// Key-value-by-date access to diary content.
///
/// Dates are validated when an [`EntryDate`] is parsed, so implementations
/// never see a malformed key.
pub trait ContentStore: Send + Sync + 'static {
    /// Fails with [`DiaryError::NotFound`] when no entry exists for `date`.
    fn read(&self, date: &EntryDate) -> impl Future<Output = Result<String, DiaryError>> + Send;

    /// Creates the entry if absent, overwrites it otherwise.
    fn write(
        &self,
        date: &EntryDate,
        content: &str,
    ) -> impl Future<Output = Result<(), DiaryError>> + Send;

    fn exists(&self, date: &EntryDate) -> impl Future<Output = Result<bool, DiaryError>> + Send;

    /// All entries, newest date first.
    fn list(&self) -> impl Future<Output = Result<Vec<DiaryEntry>, DiaryError>> + Send;

    fn delete(&self, date: &EntryDate) -> impl Future<Output = Result<(), DiaryError>> + Send;

    /// Create an empty entry; [`DiaryError::Conflict`] if one already exists.
    fn create(&self, date: &EntryDate) -> impl Future<Output = Result<(), DiaryError>> + Send {
        async move {
            if self.exists(date).await? {
                return Err(DiaryError::Conflict(format!("Diary entry for {date}")));
            }
            self.write(date, "").await
        }
    }
}

fn entry_not_found(date: &EntryDate) -> DiaryError {
    DiaryError::NotFound(format!("Diary entry for {date}"))
}

/// Flat-file store: one `<date>_public.md` file per entry in a single directory.
#[derive(Debug, Clone)]
pub struct FileContentStore {
    root: PathBuf,
}

impl FileContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn entry_path(&self, date: &EntryDate) -> PathBuf {
        self.root.join(date.filename())
    }
}

impl ContentStore for FileContentStore {
    async fn read(&self, date: &EntryDate) -> Result<String, DiaryError> {
        match fs::read_to_string(self.entry_path(date)).await {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(entry_not_found(date)),
            Err(err) => {
                error!("Error reading diary file for {date}: {err}");
                Err(DiaryError::Io(err))
            }
        }
    }

    async fn write(&self, date: &EntryDate, content: &str) -> Result<(), DiaryError> {
        fs::create_dir_all(&self.root).await?;
        fs::write(self.entry_path(date), content)
            .await
            .map_err(|err| {
                error!("Error writing diary file for {date}: {err}");
                DiaryError::Persist(format!("failed to write diary file: {err}"))
            })
    }

    async fn exists(&self, date: &EntryDate) -> Result<bool, DiaryError> {
        Ok(fs::try_exists(self.entry_path(date)).await?)
    }

    async fn list(&self) -> Result<Vec<DiaryEntry>, DiaryError> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                error!("Error listing diary files in {}: {err}", self.root.display());
                return Err(DiaryError::Io(err));
            }
        };

        let mut dates = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let name = item.file_name();
            if let Some(date) = EntryDate::from_filename(&name.to_string_lossy()) {
                dates.push(date);
            }
        }

        dates.sort_unstable_by(|a, b| b.cmp(a));
        Ok(dates.into_iter().map(DiaryEntry::listed).collect())
    }

    async fn delete(&self, date: &EntryDate) -> Result<(), DiaryError> {
        match fs::remove_file(self.entry_path(date)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(entry_not_found(date)),
            Err(err) => Err(DiaryError::Io(err)),
        }
    }
}

/// In-process store, used for embedding and tests. Writes can be made to
/// fail on demand to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    entries: Mutex<BTreeMap<EntryDate, String>>,
    fail_writes: AtomicBool,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Synchronous peek, without going through the async contract.
    pub fn get(&self, date: &EntryDate) -> Option<String> {
        self.lock().get(date).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<EntryDate, String>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl ContentStore for MemoryContentStore {
    async fn read(&self, date: &EntryDate) -> Result<String, DiaryError> {
        self.lock().get(date).cloned().ok_or_else(|| entry_not_found(date))
    }

    async fn write(&self, date: &EntryDate, content: &str) -> Result<(), DiaryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DiaryError::Persist("write rejected by store".into()));
        }
        self.lock().insert(*date, content.to_string());
        Ok(())
    }

    async fn exists(&self, date: &EntryDate) -> Result<bool, DiaryError> {
        Ok(self.lock().contains_key(date))
    }

    async fn list(&self) -> Result<Vec<DiaryEntry>, DiaryError> {
        Ok(self
            .lock()
            .keys()
            .rev()
            .copied()
            .map(DiaryEntry::listed)
            .collect())
    }

    async fn delete(&self, date: &EntryDate) -> Result<(), DiaryError> {
        self.lock()
            .remove(date)
            .map(|_| ())
            .ok_or_else(|| entry_not_found(date))
    }
}
