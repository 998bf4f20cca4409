//! Suspended tasks resumed once per tick
//!
//! A task is plain data (its kind plus whatever time it has accumulated);
//! the owner supplies the resume logic when it polls. Cancelling a task is
//! removing it from the set.

use std::fmt;
use std::task::Poll;

/// Slack allowed when accumulated tick time is compared against a limit.
///
/// Tick lengths arrive as `f32`, so a sum of e.g. 1200 ticks of 1/120 s can
/// land a hair under 10 s. Anything within this window counts as reached.
pub const TIME_EPSILON: f64 = 1e-4;

/// Whether `elapsed` seconds have reached `limit`
pub fn reached(elapsed: f64, limit: f32) -> bool {
    elapsed + TIME_EPSILON >= f64::from(limit)
}

/// Identifies a task within one [`TaskSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// The active tasks of one owner, in spawn order
#[derive(Debug, Clone)]
pub struct TaskSet<K> {
    tasks: Vec<(TaskId, K)>,
    next_id: u64,
}

impl<K> Default for TaskSet<K> {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 0,
        }
    }
}

impl<K> TaskSet<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, kind: K) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push((id, kind));
        id
    }

    /// Remove a task; it will never be resumed again
    pub fn cancel(&mut self, id: TaskId) -> Option<K> {
        let index = self.tasks.iter().position(|(tid, _)| *tid == id)?;
        Some(self.tasks.remove(index).1)
    }

    /// Remove every task matching `pred`, returning how many were removed
    pub fn cancel_where<F: FnMut(&K) -> bool>(&mut self, mut pred: F) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|(_, kind)| !pred(kind));
        before - self.tasks.len()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|(tid, _)| *tid == id)
    }

    pub fn get(&self, id: TaskId) -> Option<&K> {
        self.tasks.iter().find(|(tid, _)| *tid == id).map(|(_, k)| k)
    }

    pub fn any<F: FnMut(&K) -> bool>(&self, pred: F) -> bool {
        self.tasks.iter().map(|(_, k)| k).any(pred)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &K)> {
        self.tasks.iter().map(|(id, k)| (*id, k))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Resume every task once. Finished tasks are removed and their outputs
    /// returned in spawn order.
    pub fn poll_all<O, F>(&mut self, mut resume: F) -> Vec<(TaskId, O)>
    where
        F: FnMut(&mut K) -> Poll<O>,
    {
        let mut finished = Vec::new();
        self.tasks.retain_mut(|(id, kind)| match resume(kind) {
            Poll::Ready(output) => {
                finished.push((*id, output));
                false
            }
            Poll::Pending => true,
        });
        finished
    }
}
