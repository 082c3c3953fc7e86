//! The editing session for one diary entry at a time.
//!
//! Owns the auto-save coordinator and rebinds its persist target whenever a
//! different date is selected.

pub mod commands;

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    autosave::{AutoSaveCoordinator, Persist, SaveSnapshot},
    diary::{ContentStore, DiaryEntry, EntryDate},
    error::{DiaryError, PersistError},
    labels::{codec, LabelCatalog},
};
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// Persist callback bound to one date at selection time.
pub struct StorePersist<S> {
    store: Arc<S>,
    date: EntryDate,
}

impl<S: ContentStore> Persist for StorePersist<S> {
    async fn save(&self, content: String) -> Result<(), PersistError> {
        self.store
            .write(&self.date, &content)
            .await
            .map_err(PersistError::from)
    }
}

#[derive(Debug, Clone, Copy)]
struct Selection {
    date: EntryDate,
    exists: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub date: Option<EntryDate>,
    pub exists: bool,
    #[serde(flatten)]
    pub save: SaveSnapshot,
}

pub struct DiarySession<S: ContentStore> {
    store: Arc<S>,
    autosave: AutoSaveCoordinator<StorePersist<S>>,
    selection: Arc<Mutex<Option<Selection>>>,
}

impl<S: ContentStore> Clone for DiarySession<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            autosave: self.autosave.clone(),
            selection: Arc::clone(&self.selection),
        }
    }
}

impl<S: ContentStore> DiarySession<S> {
    pub fn new(store: Arc<S>, autosave_delay: Duration) -> Self {
        Self {
            store,
            autosave: AutoSaveCoordinator::new(autosave_delay),
            selection: Arc::new(Mutex::new(None)),
        }
    }

    #[cfg(test)]
    pub async fn selected_date(&self) -> Option<EntryDate> {
        self.selection.lock().await.map(|selection| selection.date)
    }

    /// Load `date` and make it the auto-save target. A missing entry starts
    /// empty; any other load failure leaves the current selection in place.
    pub async fn select(&self, date: EntryDate) -> Result<SessionSnapshot, DiaryError> {
        let mut selection = self.selection.lock().await;

        let (content, exists) = match self.store.read(&date).await {
            Ok(content) => (content, true),
            Err(err) if err.is_not_found() => (String::new(), false),
            Err(err) => {
                log_warn!("Failed to load diary entry for {}: {}", date, err);
                return Err(err);
            }
        };

        self.bind(&mut selection, date, content, exists).await;
        log_info!("Selected diary entry {} (exists: {})", date, exists);

        Ok(Self::compose(*selection, self.autosave.get_snapshot().await))
    }

    async fn bind(
        &self,
        selection: &mut Option<Selection>,
        date: EntryDate,
        content: String,
        exists: bool,
    ) {
        let persist = StorePersist {
            store: Arc::clone(&self.store),
            date,
        };
        self.autosave.switch_target(Some(persist), content).await;
        *selection = Some(Selection { date, exists });
    }

    /// Stop auto-saving the selected entry and wait until none of its writes
    /// is still running, so a direct store change is not overwritten.
    async fn detach(&self) {
        self.autosave.switch_target(None, String::new()).await;
        self.autosave.wait_idle().await;
    }

    fn is_selected(selection: &Option<Selection>, date: EntryDate) -> bool {
        selection.is_some_and(|s| s.date == date)
    }

    pub async fn edit(&self, content: String) -> SessionSnapshot {
        self.autosave.content_changed(content).await;
        self.snapshot().await
    }

    pub async fn save_now(&self) -> SessionSnapshot {
        let selection = *self.selection.lock().await;
        let save = self.autosave.save_now().await;
        Self::compose(selection, save)
    }

    /// Wait for a running save, then write anything still unsaved.
    pub async fn flush(&self) -> SessionSnapshot {
        let save = self.autosave.flush().await;
        let selection = *self.selection.lock().await;
        Self::compose(selection, save)
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let selection = *self.selection.lock().await;
        Self::compose(selection, self.autosave.get_snapshot().await)
    }

    /// Write an empty entry for `date` and select it.
    pub async fn create_entry(&self, date: EntryDate) -> Result<SessionSnapshot, DiaryError> {
        self.store.create(&date).await?;
        log_info!("Created diary entry {}", date);
        self.select(date).await
    }

    /// Create an empty entry without changing the selection. A selected entry
    /// that was missing now exists; pending edits stay pending.
    pub async fn create(&self, date: EntryDate) -> Result<(), DiaryError> {
        let mut selection = self.selection.lock().await;
        self.store.create(&date).await?;
        if let Some(selected) = &mut *selection {
            if selected.date == date {
                selected.exists = true;
            }
        }
        Ok(())
    }

    /// Replace the whole entry for `date`. When it is the selected entry the
    /// written text becomes the saved state and pending edits are dropped.
    pub async fn write_entry(&self, date: EntryDate, content: String) -> Result<(), DiaryError> {
        let mut selection = self.selection.lock().await;
        if !Self::is_selected(&selection, date) {
            return self.store.write(&date, &content).await;
        }

        self.detach().await;
        match self.store.write(&date, &content).await {
            Ok(()) => {
                self.bind(&mut selection, date, content, true).await;
                Ok(())
            }
            Err(err) => {
                self.reload(&mut selection, date).await;
                Err(err)
            }
        }
    }

    /// Delete the entry for `date`. A selected entry starts over empty.
    pub async fn delete_entry(&self, date: EntryDate) -> Result<(), DiaryError> {
        let mut selection = self.selection.lock().await;
        if !Self::is_selected(&selection, date) {
            return self.store.delete(&date).await;
        }
        if !self.store.exists(&date).await? {
            return Err(DiaryError::NotFound(format!("Diary entry for {date}")));
        }

        self.detach().await;
        match self.store.delete(&date).await {
            Ok(()) => {
                self.bind(&mut selection, date, String::new(), false).await;
                log_info!("Deleted selected diary entry {}", date);
                Ok(())
            }
            Err(err) => {
                self.reload(&mut selection, date).await;
                Err(err)
            }
        }
    }

    /// Rebind to whatever the store holds after a failed direct change.
    async fn reload(&self, selection: &mut Option<Selection>, date: EntryDate) {
        let (content, exists) = match self.store.read(&date).await {
            Ok(content) => (content, true),
            Err(err) => {
                if !err.is_not_found() {
                    log_warn!("Failed to reload diary entry for {}: {}", date, err);
                }
                (String::new(), false)
            }
        };
        self.bind(selection, date, content, exists).await;
    }

    /// Label ids stored in the content being edited.
    pub async fn labels(&self) -> Vec<String> {
        codec::decode(&self.autosave.current_content().await)
    }

    /// Rewrite the label metadata of the current content. Counts as an edit.
    pub async fn set_labels<C>(&self, ids: &[String], catalog: &C) -> SessionSnapshot
    where
        C: LabelCatalog + ?Sized,
    {
        self.autosave
            .update_content(|current| codec::encode(current, ids, catalog))
            .await;
        self.snapshot().await
    }

    pub async fn list(&self) -> Result<Vec<DiaryEntry>, DiaryError> {
        self.store.list().await
    }

    fn compose(selection: Option<Selection>, save: SaveSnapshot) -> SessionSnapshot {
        SessionSnapshot {
            date: selection.map(|s| s.date),
            // a successful save creates a missing entry
            exists: selection.is_some_and(|s| s.exists) || save.last_saved_at.is_some(),
            save,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        autosave::SavePhase,
        diary::MemoryContentStore,
        labels::{models::DEFAULT_LABELS, Label},
    };
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::{sync::Semaphore, time};

    const DELAY: Duration = Duration::from_millis(1000);

    fn date(value: &str) -> EntryDate {
        EntryDate::parse(value).unwrap()
    }

    async fn advance(ms: u64) {
        time::sleep(Duration::from_millis(ms)).await;
    }

    fn default_catalog() -> Vec<Label> {
        DEFAULT_LABELS
            .iter()
            .enumerate()
            .map(|(index, (id, name, color))| Label {
                id: id.to_string(),
                name: name.to_string(),
                color: color.to_string(),
                order_index: index as i64,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .collect()
    }

    /// Memory store whose writes can be held back and whose reads can fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryContentStore,
        gate: Option<Arc<Semaphore>>,
        fail_reads: AtomicBool,
    }

    impl ContentStore for FlakyStore {
        async fn read(&self, date: &EntryDate) -> Result<String, DiaryError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(DiaryError::Io(std::io::Error::other("device unplugged")));
            }
            self.inner.read(date).await
        }

        async fn write(&self, date: &EntryDate, content: &str) -> Result<(), DiaryError> {
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            self.inner.write(date, content).await
        }

        async fn exists(&self, date: &EntryDate) -> Result<bool, DiaryError> {
            self.inner.exists(date).await
        }

        async fn list(&self) -> Result<Vec<DiaryEntry>, DiaryError> {
            self.inner.list().await
        }

        async fn delete(&self, date: &EntryDate) -> Result<(), DiaryError> {
            self.inner.delete(date).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_entry_is_written_after_typing() {
        let store = Arc::new(MemoryContentStore::new());
        let session = DiarySession::new(store.clone(), DELAY);

        let snap = session.select(date("2025-01-01")).await.unwrap();
        assert_eq!(snap.save.current_content, "");
        assert!(!snap.exists);

        session.edit("Hello".into()).await;
        advance(1100).await;

        assert_eq!(store.get(&date("2025-01-01")).as_deref(), Some("Hello"));
        let snap = session.snapshot().await;
        assert!(snap.exists);
        assert!(!snap.save.has_unsaved_changes);
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_loads_existing_content() {
        let store = Arc::new(MemoryContentStore::new());
        store.write(&date("2024-12-24"), "Eve").await.unwrap();
        let session = DiarySession::new(store, DELAY);

        let snap = session.select(date("2024-12-24")).await.unwrap();
        assert_eq!(snap.date, Some(date("2024-12-24")));
        assert_eq!(snap.save.current_content, "Eve");
        assert!(snap.exists);
        assert_eq!(snap.save.phase, SavePhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_existing_entry_conflicts() {
        let store = Arc::new(MemoryContentStore::new());
        store.write(&date("2025-03-03"), "kept").await.unwrap();
        let session = DiarySession::new(store.clone(), DELAY);

        let err = session.create_entry(date("2025-03-03")).await.unwrap_err();
        assert!(matches!(err, DiaryError::Conflict(_)));
        assert_eq!(store.get(&date("2025-03-03")).as_deref(), Some("kept"));
        assert_eq!(session.selected_date().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_writes_empty_entry_and_selects_it() {
        let store = Arc::new(MemoryContentStore::new());
        let session = DiarySession::new(store.clone(), DELAY);

        let snap = session.create_entry(date("2025-03-04")).await.unwrap();
        assert!(snap.exists);
        assert_eq!(snap.date, Some(date("2025-03-04")));
        assert_eq!(store.get(&date("2025-03-04")).as_deref(), Some(""));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_keeps_content() {
        let store = Arc::new(MemoryContentStore::new());
        store.set_fail_writes(true);
        let session = DiarySession::new(store.clone(), DELAY);
        session.select(date("2025-01-01")).await.unwrap();

        session.edit("unsaved".into()).await;
        advance(1100).await;

        let snap = session.snapshot().await;
        assert_eq!(snap.save.current_content, "unsaved");
        assert!(snap.save.error.is_some());
        assert!(snap.save.has_unsaved_changes);
        assert!(!snap.exists);
        assert_eq!(store.get(&date("2025-01-01")), None);

        store.set_fail_writes(false);
        let snap = session.save_now().await;
        assert_eq!(snap.save.error, None);
        assert_eq!(store.get(&date("2025-01-01")).as_deref(), Some("unsaved"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_save_for_previous_date_is_ignored() {
        let gate = Arc::new(Semaphore::new(0));
        let store = Arc::new(FlakyStore {
            gate: Some(gate.clone()),
            ..FlakyStore::default()
        });
        let session = DiarySession::new(store.clone(), DELAY);

        session.select(date("2025-01-01")).await.unwrap();
        session.edit("first day".into()).await;
        advance(1100).await;
        assert!(session.snapshot().await.save.is_saving);

        session.select(date("2025-01-02")).await.unwrap();
        gate.add_permits(10);
        advance(10).await;

        // the old write still lands in the old entry
        assert_eq!(
            store.inner.get(&date("2025-01-01")).as_deref(),
            Some("first day")
        );
        let snap = session.snapshot().await;
        assert_eq!(snap.date, Some(date("2025-01-02")));
        assert_eq!(snap.save.current_content, "");
        assert!(!snap.save.is_saving);
        assert_eq!(snap.save.last_saved_at, None);
        assert!(!snap.exists);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_failure_keeps_previous_selection() {
        let store = Arc::new(FlakyStore::default());
        store.inner.write(&date("2025-01-01"), "safe").await.unwrap();
        let session = DiarySession::new(store.clone(), DELAY);
        session.select(date("2025-01-01")).await.unwrap();
        session.edit("safe, edited".into()).await;

        store.fail_reads.store(true, Ordering::SeqCst);
        let err = session.select(date("2025-01-02")).await.unwrap_err();
        assert!(matches!(err, DiaryError::Io(_)));

        let snap = session.snapshot().await;
        assert_eq!(snap.date, Some(date("2025-01-01")));
        assert_eq!(snap.save.current_content, "safe, edited");

        advance(1100).await;
        assert_eq!(
            store.inner.get(&date("2025-01-01")).as_deref(),
            Some("safe, edited")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_labels_edits_content() {
        let store = Arc::new(MemoryContentStore::new());
        store
            .write(&date("2025-06-01"), "Went hiking.")
            .await
            .unwrap();
        let session = DiarySession::new(store.clone(), DELAY);
        session.select(date("2025-06-01")).await.unwrap();

        let ids = vec!["6".to_string(), "2".to_string()];
        let snap = session.set_labels(&ids, &default_catalog()).await;
        assert!(snap.save.has_unsaved_changes);
        assert!(snap
            .save
            .current_content
            .contains("- **Labels:** Travel, Personal"));
        assert_eq!(session.labels().await, ids);

        advance(1100).await;
        let saved = store.get(&date("2025-06-01")).unwrap();
        assert!(saved.starts_with("Went hiking.\n\n---\n\n"));

        session.set_labels(&[], &default_catalog()).await;
        assert!(session.labels().await.is_empty());
        assert_eq!(session.snapshot().await.save.current_content, "Went hiking.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_write_to_selected_entry_wins() {
        let store = Arc::new(MemoryContentStore::new());
        let session = DiarySession::new(store.clone(), DELAY);
        session.select(date("2025-01-01")).await.unwrap();
        session.edit("draft".into()).await;

        session
            .write_entry(date("2025-01-01"), "external".into())
            .await
            .unwrap();
        let snap = session.snapshot().await;
        assert_eq!(snap.save.current_content, "external");
        assert!(!snap.save.has_unsaved_changes);
        assert!(snap.exists);

        advance(2000).await;
        assert_eq!(store.get(&date("2025-01-01")).as_deref(), Some("external"));

        session.edit("external, continued".into()).await;
        advance(1100).await;
        assert_eq!(
            store.get(&date("2025-01-01")).as_deref(),
            Some("external, continued")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_write_waits_for_running_save() {
        let gate = Arc::new(Semaphore::new(0));
        let store = Arc::new(FlakyStore {
            gate: Some(gate.clone()),
            ..FlakyStore::default()
        });
        let session = DiarySession::new(store.clone(), DELAY);
        session.select(date("2025-01-01")).await.unwrap();
        session.edit("autosaved".into()).await;
        advance(1100).await;
        assert!(session.snapshot().await.save.is_saving);

        let writing = tokio::spawn({
            let session = session.clone();
            async move {
                session
                    .write_entry(date("2025-01-01"), "external".into())
                    .await
            }
        });
        advance(10).await;
        assert!(!writing.is_finished());

        gate.add_permits(10);
        writing.await.unwrap().unwrap();
        assert_eq!(
            store.inner.get(&date("2025-01-01")).as_deref(),
            Some("external")
        );
        assert_eq!(session.snapshot().await.save.current_content, "external");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleting_selected_entry_starts_over_empty() {
        let store = Arc::new(MemoryContentStore::new());
        store.write(&date("2025-01-01"), "gone soon").await.unwrap();
        let session = DiarySession::new(store.clone(), DELAY);
        session.select(date("2025-01-01")).await.unwrap();
        session.edit("gone soon!".into()).await;

        session.delete_entry(date("2025-01-01")).await.unwrap();
        let snap = session.snapshot().await;
        assert_eq!(snap.date, Some(date("2025-01-01")));
        assert_eq!(snap.save.current_content, "");
        assert!(!snap.exists);
        assert!(!snap.save.has_unsaved_changes);

        advance(2000).await;
        assert_eq!(store.get(&date("2025-01-01")), None);

        let err = session.delete_entry(date("2025-01-01")).await.unwrap_err();
        assert!(matches!(err, DiaryError::NotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_creating_selected_missing_entry_marks_it_existing() {
        let store = Arc::new(MemoryContentStore::new());
        let session = DiarySession::new(store.clone(), DELAY);
        session.select(date("2025-05-05")).await.unwrap();
        assert!(!session.snapshot().await.exists);

        session.create(date("2025-05-05")).await.unwrap();
        assert!(session.snapshot().await.exists);
        assert_eq!(store.get(&date("2025-05-05")).as_deref(), Some(""));

        let err = session.create(date("2025-05-05")).await.unwrap_err();
        assert!(matches!(err, DiaryError::Conflict(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_writes_text_typed_during_a_save() {
        let gate = Arc::new(Semaphore::new(0));
        let store = Arc::new(FlakyStore {
            gate: Some(gate.clone()),
            ..FlakyStore::default()
        });
        let session = DiarySession::new(store.clone(), DELAY);
        session.select(date("2025-01-01")).await.unwrap();
        session.edit("one".into()).await;
        advance(1100).await;
        session.edit("two".into()).await;

        let flushing = tokio::spawn({
            let session = session.clone();
            async move { session.flush().await }
        });
        advance(10).await;
        assert!(!flushing.is_finished());

        gate.add_permits(10);
        let snap = flushing.await.unwrap();
        assert!(!snap.save.has_unsaved_changes);
        assert!(snap.exists);
        assert_eq!(store.inner.get(&date("2025-01-01")).as_deref(), Some("two"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_passes_through_store() {
        let store = Arc::new(MemoryContentStore::new());
        store.write(&date("2025-01-01"), "a").await.unwrap();
        store.write(&date("2025-02-01"), "b").await.unwrap();
        let session = DiarySession::new(store, DELAY);

        let dates: Vec<EntryDate> = session.list().await.unwrap().into_iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![date("2025-02-01"), date("2025-01-01")]);
    }
}
