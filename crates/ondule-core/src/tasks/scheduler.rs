//! Priority-ordered task list with transactional edits.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{FrameIo, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Remove,
}

struct State {
    tasks: Vec<Arc<dyn Task>>,
    depth: usize,
    pending: Vec<(Op, Arc<dyn Task>)>,
}

impl State {
    fn position<T: Task + ?Sized>(&self, task: &Arc<T>) -> Option<usize> {
        let ptr = Arc::as_ptr(task);
        self.tasks
            .iter()
            .position(|t| std::ptr::addr_eq(Arc::as_ptr(t), ptr))
    }

    fn insert(&mut self, task: Arc<dyn Task>) {
        if self.position(&task).is_some() {
            return;
        }
        let priority = task.priority();
        // Upper bound: equal priorities keep insertion order.
        let at = self.tasks.partition_point(|t| t.priority() >= priority);
        #[cfg(feature = "tracing")]
        tracing::debug!("scheduler: add '{}' (priority {priority}) at {at}", task.name());
        self.tasks.insert(at, task);
    }

    fn take<T: Task + ?Sized>(&mut self, task: &Arc<T>) -> Option<Arc<dyn Task>> {
        let at = self.position(task)?;
        let removed = self.tasks.remove(at);
        #[cfg(feature = "tracing")]
        tracing::debug!("scheduler: remove '{}'", removed.name());
        Some(removed)
    }
}

/// Runs tasks once per frame in strictly descending priority.
///
/// Mutations share the lock held during [`process`](Self::process), so a
/// frame never observes a half-edited list. Inside a transaction, adds and
/// removes are buffered and applied together when the outermost transaction
/// ends.
///
/// ```rust
/// use std::sync::Arc;
/// use ondule_core::{ObjectList, TaskScheduler};
///
/// let scheduler = TaskScheduler::new();
/// let a = Arc::new(ObjectList::new("a"));
/// let b = Arc::new(ObjectList::new("b").with_priority(10));
/// {
///     let _tx = scheduler.transaction();
///     scheduler.add(a.clone());
///     scheduler.add(b.clone());
///     assert!(scheduler.is_empty());
/// }
/// let names: Vec<_> = scheduler.tasks().into_iter().map(|(n, _)| n).collect();
/// assert_eq!(names, ["b", "a"]);
/// ```
pub struct TaskScheduler {
    state: Mutex<State>,
}

impl TaskScheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                tasks: Vec::new(),
                depth: 0,
                pending: Vec::new(),
            }),
        }
    }

    /// Runs every task once, highest priority first.
    pub fn process(&self, input: &[f32], output: &mut [f32]) {
        let state = self.state.lock();
        let mut io = FrameIo::new(input, output);
        for task in &state.tasks {
            task.process(&mut io);
        }
    }

    /// Schedules `task`. A no-op if it is already scheduled.
    ///
    /// Inside a transaction the add is deferred to the transaction's end.
    pub fn add(&self, task: Arc<dyn Task>) {
        let mut state = self.state.lock();
        if state.depth > 0 {
            state.pending.push((Op::Add, task));
        } else {
            state.insert(task);
        }
    }

    /// Unschedules `task`. Returns true if it was removed now.
    ///
    /// Inside a transaction the removal is deferred and this returns false.
    pub fn remove<T: Task + ?Sized>(&self, task: &Arc<T>) -> bool {
        let removed = {
            let mut state = self.state.lock();
            if state.depth > 0 {
                let ptr = Arc::as_ptr(task);
                let handle = state
                    .tasks
                    .iter()
                    .chain(state.pending.iter().map(|(_, t)| t))
                    .find(|t| std::ptr::addr_eq(Arc::as_ptr(*t), ptr))
                    .cloned();
                if let Some(handle) = handle {
                    state.pending.push((Op::Remove, handle));
                }
                return false;
            }
            state.take(task)
        };
        // Dropped outside the lock.
        removed.is_some()
    }

    /// Opens a transaction. Nested calls increase the depth.
    pub fn begin_transaction(&self) {
        self.state.lock().depth += 1;
    }

    /// Closes a transaction. When the depth reaches zero, every buffered
    /// operation is replayed in submission order under a single lock.
    pub fn end_transaction(&self) {
        let retired = {
            let mut state = self.state.lock();
            if state.depth == 0 {
                return;
            }
            state.depth -= 1;
            if state.depth > 0 {
                return;
            }
            let pending = std::mem::take(&mut state.pending);
            let mut retired = Vec::new();
            for (op, task) in pending {
                match op {
                    Op::Add => state.insert(task),
                    Op::Remove => retired.extend(state.take(&task)),
                }
            }
            retired
        };
        drop(retired);
    }

    /// Opens a transaction that closes when the guard drops.
    pub fn transaction(&self) -> Transaction<'_> {
        self.begin_transaction();
        Transaction { scheduler: self }
    }

    /// Current transaction nesting depth.
    pub fn transaction_depth(&self) -> usize {
        self.state.lock().depth
    }

    /// Runs `f` while holding the scheduler lock, excluding any frame.
    ///
    /// `f` must not call back into this scheduler.
    pub fn edit<R>(&self, f: impl FnOnce() -> R) -> R {
        let _state = self.state.lock();
        f()
    }

    /// `(name, priority)` of every scheduled task in run order.
    pub fn tasks(&self) -> Vec<(String, i32)> {
        self.state
            .lock()
            .tasks
            .iter()
            .map(|t| (t.name().to_string(), t.priority()))
            .collect()
    }

    /// Number of scheduled tasks.
    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Returns true if no task is scheduled.
    pub fn is_empty(&self) -> bool {
        self.state.lock().tasks.is_empty()
    }

    /// Returns true if `task` is scheduled right now.
    pub fn contains<T: Task + ?Sized>(&self, task: &Arc<T>) -> bool {
        self.state.lock().position(task).is_some()
    }

    /// Unschedules every task.
    pub fn clear(&self) {
        let tasks = std::mem::take(&mut self.state.lock().tasks);
        drop(tasks);
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("tasks", &self.tasks())
            .finish_non_exhaustive()
    }
}

/// Guard returned by [`TaskScheduler::transaction`].
#[must_use = "the transaction ends as soon as the guard is dropped"]
pub struct Transaction<'a> {
    scheduler: &'a TaskScheduler,
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.scheduler.end_transaction();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    struct Probe {
        name: &'static str,
        priority: i32,
        log: Arc<Mutex<Vec<&'static str>>>,
        runs: AtomicUsize,
    }

    impl Probe {
        fn new(name: &'static str, priority: i32, log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                priority,
                log: Arc::clone(log),
                runs: AtomicUsize::new(0),
            })
        }
    }

    impl Task for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn process(&self, _io: &mut FrameIo<'_>) {
            self.runs.fetch_add(1, Ordering::Relaxed);
            self.log.lock().push(self.name);
        }
    }

    fn run(scheduler: &TaskScheduler) {
        let mut out = [0.0f32; 4];
        scheduler.process(&[0.0; 4], &mut out);
    }

    #[test]
    fn runs_in_descending_priority() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let scheduler = TaskScheduler::new();
        scheduler.add(Probe::new("low", -5, &log));
        scheduler.add(Probe::new("high", 100, &log));
        scheduler.add(Probe::new("mid", 0, &log));

        run(&scheduler);
        assert_eq!(*log.lock(), vec!["high", "mid", "low"]);
    }

    #[test]
    fn equal_priorities_keep_insertion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let scheduler = TaskScheduler::new();
        scheduler.add(Probe::new("first", 1, &log));
        scheduler.add(Probe::new("second", 1, &log));
        scheduler.add(Probe::new("third", 1, &log));

        run(&scheduler);
        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn duplicate_add_is_noop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let scheduler = TaskScheduler::new();
        let task = Probe::new("t", 0, &log);
        scheduler.add(task.clone());
        scheduler.add(task.clone());
        assert_eq!(scheduler.len(), 1);

        run(&scheduler);
        assert_eq!(task.runs.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn remove_releases_task() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let scheduler = TaskScheduler::new();
        let task = Probe::new("t", 0, &log);
        scheduler.add(task.clone());
        assert_eq!(Arc::strong_count(&task), 2);

        assert!(scheduler.remove(&task));
        assert!(!scheduler.remove(&task));
        assert_eq!(Arc::strong_count(&task), 1);
        assert!(!scheduler.contains(&task));
    }

    #[test]
    fn transaction_defers_until_outermost_end() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let scheduler = TaskScheduler::new();
        let keep = Probe::new("keep", 0, &log);
        let gone = Probe::new("gone", 0, &log);
        let fresh = Probe::new("fresh", 5, &log);
        scheduler.add(keep.clone());
        scheduler.add(gone.clone());

        scheduler.begin_transaction();
        scheduler.begin_transaction();
        scheduler.add(fresh.clone());
        scheduler.remove(&gone);
        assert_eq!(scheduler.transaction_depth(), 2);
        scheduler.end_transaction();

        // Still buffered at depth one.
        assert!(!scheduler.contains(&fresh));
        assert!(scheduler.contains(&gone));

        scheduler.end_transaction();
        assert_eq!(scheduler.transaction_depth(), 0);
        assert!(scheduler.contains(&fresh));
        assert!(!scheduler.contains(&gone));
        assert_eq!(
            scheduler.tasks(),
            vec![("fresh".to_string(), 5), ("keep".to_string(), 0)]
        );
    }

    #[test]
    fn guard_ends_transaction_on_drop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let scheduler = TaskScheduler::new();
        {
            let _tx = scheduler.transaction();
            scheduler.add(Probe::new("t", 0, &log));
            assert!(scheduler.is_empty());
        }
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn unbalanced_end_is_ignored() {
        let scheduler = TaskScheduler::new();
        scheduler.end_transaction();
        assert_eq!(scheduler.transaction_depth(), 0);
    }

    #[test]
    fn edit_runs_under_lock() {
        let scheduler = TaskScheduler::new();
        let value = scheduler.edit(|| 42);
        assert_eq!(value, 42);
    }
}
