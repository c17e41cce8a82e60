use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::{Task, TaskId, TaskRecord};
use crate::sound::{CompletionSound, Silent};
use crate::storage::{Storage, StorageError};

/// Callback run after every applied mutation. It gets the store back and is
/// expected to pull whatever it needs; there is no change payload.
pub type Listener = Arc<dyn Fn(&TaskStore) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// The ordered task list, its backing file, and its change listeners.
///
/// Cloning gives another handle to the same store. Every mutation is written
/// to disk before listeners are called, and listeners run with no lock held.
#[derive(Clone)]
pub struct TaskStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    storage: Storage,
    data: Mutex<StoreData>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    sound: Mutex<Arc<dyn CompletionSound>>,
    next_subscription: AtomicU64,
}

#[derive(Debug)]
struct StoreData {
    tasks: Vec<Task>,
    next_id: u64,
}

impl StoreData {
    fn allocate_id(&mut self) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        id
    }

    fn records(&self) -> Vec<TaskRecord> {
        self.tasks.iter().map(Task::to_record).collect()
    }
}

impl TaskStore {
    /// Loads the store from `storage`. Never fails: a missing file gives an
    /// empty store, and an unreadable one is logged, moved aside, and also
    /// gives an empty store.
    pub fn load(storage: Storage) -> Self {
        let path = storage.tasks_path();
        let records = match storage.load_tasks() {
            Ok(Some(loaded)) => {
                log::info!(
                    "store: loaded tasks count={} skipped={} path={}",
                    loaded.records.len(),
                    loaded.skipped,
                    path.display()
                );
                loaded.records
            }
            Ok(None) => {
                log::info!("store: no tasks file at {}, starting fresh", path.display());
                Vec::new()
            }
            Err(err) => {
                log::error!(
                    "store: failed to load tasks path={} error={err}, starting empty",
                    path.display()
                );
                if err.is_content_error() {
                    match storage.quarantine_tasks() {
                        Ok(moved) => {
                            log::warn!("store: moved unreadable tasks file to {}", moved.display())
                        }
                        Err(err) => log::error!("store: failed to move unreadable tasks file: {err}"),
                    }
                }
                Vec::new()
            }
        };
        Self::from_records(storage, records)
    }

    pub fn from_records(storage: Storage, records: Vec<TaskRecord>) -> Self {
        let mut data = StoreData {
            tasks: Vec::with_capacity(records.len()),
            next_id: 1,
        };
        for record in records {
            let id = data.allocate_id();
            data.tasks.push(Task::from_record(id, record));
        }
        Self {
            inner: Arc::new(StoreInner {
                storage,
                data: Mutex::new(data),
                listeners: Mutex::new(Vec::new()),
                sound: Mutex::new(Arc::new(Silent)),
                next_subscription: AtomicU64::new(1),
            }),
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.inner.storage
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.data().tasks.clone()
    }

    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.data().tasks.iter().find(|task| task.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.data().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data().tasks.is_empty()
    }

    pub fn set_completion_sound(&self, sound: Arc<dyn CompletionSound>) {
        *self.inner.sound.lock().expect("store poisoned") = sound;
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&TaskStore) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.listeners().push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    /// Appends a new open, unprioritized task. Blank descriptions are ignored.
    pub fn add(&self, description: &str) -> Option<TaskId> {
        let description = description.trim();
        if description.is_empty() {
            log::warn!("store: add ignored, empty description");
            return None;
        }
        let id = {
            let mut guard = self.data();
            let id = guard.allocate_id();
            guard.tasks.push(Task {
                id,
                description: description.to_string(),
                completed: false,
                prioritized: false,
            });
            self.persist(&guard);
            id
        };
        log::info!("store: added task id={id}");
        self.notify();
        Some(id)
    }

    pub fn delete(&self, id: TaskId) -> bool {
        {
            let mut guard = self.data();
            let Some(index) = guard.tasks.iter().position(|task| task.id == id) else {
                log::warn!("store: delete ignored, unknown task id={id}");
                return false;
            };
            guard.tasks.remove(index);
            self.persist(&guard);
        }
        log::info!("store: deleted task id={id}");
        self.notify();
        true
    }

    /// Flips `completed` and returns the new value. Reaching `true` plays the
    /// completion sound once, after listeners ran.
    pub fn toggle_completed(&self, id: TaskId) -> Option<bool> {
        let completed = self.update(id, "toggle_completed", |task| {
            task.completed = !task.completed;
            task.completed
        })?;
        if completed {
            self.play_completion_sound();
        }
        Some(completed)
    }

    pub fn toggle_prioritized(&self, id: TaskId) -> Option<bool> {
        self.update(id, "toggle_prioritized", |task| {
            task.prioritized = !task.prioritized;
            task.prioritized
        })
    }

    pub fn edit(&self, id: TaskId, new_description: &str) -> bool {
        let new_description = new_description.trim();
        if new_description.is_empty() {
            log::warn!("store: edit ignored, empty description id={id}");
            return false;
        }
        self.update(id, "edit", |task| {
            task.description = new_description.to_string();
        })
        .is_some()
    }

    /// Writes the whole list to disk.
    pub fn save(&self) -> Result<(), StorageError> {
        let records = self.data().records();
        self.inner.storage.save_tasks(&records)
    }

    fn update<R>(&self, id: TaskId, op: &str, apply: impl FnOnce(&mut Task) -> R) -> Option<R> {
        let result = {
            let mut guard = self.data();
            let Some(task) = guard.tasks.iter_mut().find(|task| task.id == id) else {
                log::warn!("store: {op} ignored, unknown task id={id}");
                return None;
            };
            let result = apply(task);
            self.persist(&guard);
            result
        };
        log::info!("store: {op} applied id={id}");
        self.notify();
        Some(result)
    }

    // Runs with the data lock held so the file always reflects the latest
    // mutation order.
    fn persist(&self, data: &StoreData) {
        if let Err(err) = self.inner.storage.save_tasks(&data.records()) {
            log::error!(
                "store: failed to save tasks path={} error={err}",
                self.inner.storage.tasks_path().display()
            );
        }
    }

    fn notify(&self) {
        let listeners: Vec<Listener> = self
            .listeners()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(self);
        }
    }

    fn play_completion_sound(&self) {
        let sound = self.inner.sound.lock().expect("store poisoned").clone();
        if let Err(err) = sound.play() {
            log::warn!("store: completion sound failed: {err}");
        }
    }

    fn data(&self) -> MutexGuard<'_, StoreData> {
        self.inner.data.lock().expect("store poisoned")
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Listener)>> {
        self.inner.listeners.lock().expect("store poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    #[derive(Default)]
    struct CountingSound {
        plays: AtomicUsize,
    }

    impl CompletionSound for CountingSound {
        fn play(&self) -> Result<(), String> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct BrokenSound;

    impl CompletionSound for BrokenSound {
        fn play(&self) -> Result<(), String> {
            Err("no audio device".to_string())
        }
    }

    fn empty_store(dir: &tempfile::TempDir) -> TaskStore {
        TaskStore::load(Storage::new(dir.path().to_path_buf()))
    }

    fn counting_notifications(store: &TaskStore) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        store.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    fn on_disk(store: &TaskStore) -> Vec<TaskRecord> {
        store
            .storage()
            .load_tasks()
            .unwrap()
            .map(|loaded| loaded.records)
            .unwrap_or_default()
    }

    fn descriptions(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|task| task.description.as_str()).collect()
    }

    #[test]
    fn load_without_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir);
        assert!(store.is_empty());
        assert!(!store.storage().tasks_path().exists());
    }

    #[test]
    fn add_appends_open_unprioritized_task_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir);
        let notified = counting_notifications(&store);

        let id = store.add("buy milk").expect("task added");
        assert_eq!(store.len(), 1);
        let task = store.task(id).unwrap();
        assert_eq!(task.description, "buy milk");
        assert!(!task.completed);
        assert!(!task.prioritized);
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert_eq!(on_disk(&store).len(), 1);
    }

    #[test]
    fn add_trims_and_rejects_blank_descriptions() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir);
        let notified = counting_notifications(&store);

        assert!(store.add("").is_none());
        assert!(store.add("   ").is_none());
        assert!(store.add("\t\n").is_none());
        assert!(store.is_empty());
        assert_eq!(notified.load(Ordering::SeqCst), 0);
        assert!(!store.storage().tasks_path().exists());

        let id = store.add("  padded  ").unwrap();
        assert_eq!(store.task(id).unwrap().description, "padded");
    }

    #[test]
    fn ids_are_unique_and_never_reused() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir);

        let first = store.add("same").unwrap();
        assert!(store.delete(first));
        let second = store.add("same").unwrap();
        let third = store.add("same").unwrap();
        assert_ne!(first, second);
        assert_ne!(second, third);
        assert!(store.task(first).is_none());
    }

    #[test]
    fn identical_tasks_are_addressed_independently() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir);
        let first = store.add("water plants").unwrap();
        let second = store.add("water plants").unwrap();

        assert_eq!(store.toggle_completed(second), Some(true));
        assert!(!store.task(first).unwrap().completed);
        assert!(store.task(second).unwrap().completed);

        assert!(store.delete(first));
        let remaining = store.tasks();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, second);
    }

    #[test]
    fn delete_unknown_id_is_a_silent_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir);
        store.add("keep me").unwrap();
        let notified = counting_notifications(&store);

        assert!(!store.delete(TaskId(999)));
        assert_eq!(store.len(), 1);
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn toggle_completed_twice_restores_flag_and_persists_both_states() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir);
        let id = store.add("buy milk").unwrap();

        assert_eq!(store.toggle_completed(id), Some(true));
        assert!(on_disk(&store)[0].completed);

        assert_eq!(store.toggle_completed(id), Some(false));
        assert!(!on_disk(&store)[0].completed);
        assert!(!store.task(id).unwrap().completed);
    }

    #[test]
    fn completion_sound_plays_only_when_task_becomes_completed() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir);
        let sound = Arc::new(CountingSound::default());
        store.set_completion_sound(sound.clone());
        let id = store.add("buy milk").unwrap();

        store.toggle_completed(id);
        assert_eq!(sound.plays.load(Ordering::SeqCst), 1);
        store.toggle_completed(id);
        assert_eq!(sound.plays.load(Ordering::SeqCst), 1);
        store.toggle_completed(id);
        assert_eq!(sound.plays.load(Ordering::SeqCst), 2);

        // Other mutations never play it.
        store.toggle_prioritized(id);
        store.edit(id, "buy oat milk");
        assert_eq!(sound.plays.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failing_sound_does_not_affect_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir);
        store.set_completion_sound(Arc::new(BrokenSound));
        let id = store.add("buy milk").unwrap();

        assert_eq!(store.toggle_completed(id), Some(true));
        assert!(store.task(id).unwrap().completed);
        assert!(on_disk(&store)[0].completed);
    }

    #[test]
    fn toggle_unknown_id_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir);
        let sound = Arc::new(CountingSound::default());
        store.set_completion_sound(sound.clone());
        let notified = counting_notifications(&store);

        assert_eq!(store.toggle_completed(TaskId(42)), None);
        assert_eq!(store.toggle_prioritized(TaskId(42)), None);
        assert_eq!(notified.load(Ordering::SeqCst), 0);
        assert_eq!(sound.plays.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn toggle_prioritized_flips_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir);
        let id = store.add("call mom").unwrap();

        assert_eq!(store.toggle_prioritized(id), Some(true));
        assert!(on_disk(&store)[0].prioritized);
        assert_eq!(store.toggle_prioritized(id), Some(false));
        assert!(!on_disk(&store)[0].prioritized);
    }

    #[test]
    fn edit_replaces_description_and_rejects_blank() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir);
        let id = store.add("buy milk").unwrap();
        let notified = counting_notifications(&store);

        assert!(!store.edit(id, "  "));
        assert_eq!(store.task(id).unwrap().description, "buy milk");
        assert_eq!(notified.load(Ordering::SeqCst), 0);

        assert!(store.edit(id, "buy bread"));
        assert_eq!(store.task(id).unwrap().description, "buy bread");
        assert_eq!(on_disk(&store)[0].description, "buy bread");
        assert_eq!(notified.load(Ordering::SeqCst), 1);

        assert!(!store.edit(TaskId(77), "ghost"));
    }

    #[test]
    fn listeners_see_the_write_already_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir);
        let id = store.add("buy milk").unwrap();

        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        store.subscribe(move |store| {
            let records = store.storage().load_tasks().unwrap().unwrap().records;
            sink.lock().unwrap().push(records[0].completed);
        });

        store.toggle_completed(id);
        store.toggle_completed(id);
        assert_eq!(*observed.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn listener_may_mutate_the_store_while_notified() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir);
        let fired = Arc::new(AtomicBool::new(false));
        let once = Arc::clone(&fired);
        store.subscribe(move |store| {
            if !once.swap(true, Ordering::SeqCst) {
                store.add("follow-up");
            }
        });

        store.add("first");
        assert_eq!(descriptions(&store.tasks()), vec!["first", "follow-up"]);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir);
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let subscription = store.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        store.add("one");
        assert!(store.unsubscribe(subscription));
        assert!(!store.unsubscribe(subscription));
        store.add("two");
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn save_failure_keeps_in_memory_change_and_still_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let store = TaskStore::load(Storage::new(blocker));
        let notified = counting_notifications(&store);

        let id = store.add("survives in memory").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert!(store.save().is_err());
        assert!(store.task(id).is_some());
    }

    #[test]
    fn save_then_fresh_load_reconstructs_the_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir);
        let a = store.add("a").unwrap();
        store.add("b").unwrap();
        let c = store.add("c").unwrap();
        store.toggle_completed(a);
        store.toggle_prioritized(c);
        store.save().unwrap();

        let reloaded = empty_store(&dir);
        let before: Vec<TaskRecord> = store.tasks().iter().map(Task::to_record).collect();
        let after: Vec<TaskRecord> = reloaded.tasks().iter().map(Task::to_record).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn load_defaults_missing_prioritized_to_false() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("tasks.json"),
            r#"[{ "description": "legacy", "completed": false }]"#,
        )
        .unwrap();

        let store = empty_store(&dir);
        let tasks = store.tasks();
        assert_eq!(tasks.len(), 1);
        assert!(!tasks[0].prioritized);
    }

    #[test]
    fn malformed_file_starts_empty_and_is_kept_aside() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tasks.json"), "{ definitely not a list").unwrap();

        let store = empty_store(&dir);
        assert!(store.is_empty());
        assert!(!store.storage().tasks_path().exists());
        let kept: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("tasks-unreadable-")
            })
            .collect();
        assert_eq!(kept.len(), 1);

        // The store is fully usable afterwards.
        store.add("fresh start").unwrap();
        assert_eq!(on_disk(&store).len(), 1);
    }

    #[test]
    fn file_with_bad_encoding_is_kept_aside_before_first_save() {
        let dir = tempfile::tempdir().unwrap();
        let original: &[u8] = b"[{\"description\": \"caf\xe9\", \"completed\": false}]";
        fs::write(dir.path().join("tasks.json"), original).unwrap();

        let store = empty_store(&dir);
        assert!(store.is_empty());
        store.add("new").unwrap();

        let kept: Vec<Vec<u8>> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("tasks-unreadable-")
            })
            .map(|entry| fs::read(entry.path()).unwrap())
            .collect();
        assert_eq!(kept, vec![original.to_vec()]);
        assert_eq!(descriptions(&store.tasks()), vec!["new"]);
        assert_eq!(on_disk(&store).len(), 1);
    }
}
