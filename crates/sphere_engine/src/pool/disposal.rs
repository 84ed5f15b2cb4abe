//! Deferred disposal queue
//!
//! Evicted pool items are parked here instead of being destroyed inside the
//! eviction callback. The owner drains the queue at a defined point in the
//! frame, after the call stack that caused the eviction has unwound.
//!
//! The queue only remembers what is waiting. Whether an id has already been
//! disposed is answered by the owner at drain time, so nothing accumulates
//! once an item is gone.

use super::SlotId;
use std::collections::VecDeque;

/// Boxed error returned by a disposer
pub type DisposeError = Box<dyn std::error::Error + Send + Sync>;

/// Result type of a disposer
pub type DisposeResult = Result<(), DisposeError>;

/// Outcome of one drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Items disposed successfully
    pub disposed: usize,
    /// Items whose disposer returned an error
    pub failed: usize,
    /// Items skipped because the owner no longer had them pending
    pub skipped: usize,
}

/// FIFO of items waiting for disposal
pub struct DisposalQueue<T> {
    queue: VecDeque<(SlotId, T)>,
    /// Set while a drain is running
    draining: bool,
}

impl<T> Default for DisposalQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DisposalQueue<T> {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            draining: false,
        }
    }

    /// Items waiting for disposal
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether `id` is queued
    pub fn contains(&self, id: SlotId) -> bool {
        self.queue.iter().any(|(queued, _)| *queued == id)
    }

    /// Queue an item. Returns `false` (and drops the item without disposing
    /// it) if the id is already queued.
    pub fn enqueue(&mut self, id: SlotId, item: T) -> bool {
        if self.contains(id) {
            log::warn!("Double disposal attempt for {id}; ignoring");
            return false;
        }
        self.queue.push_back((id, item));
        true
    }

    /// Dispose every queued item in FIFO order.
    ///
    /// `retire` is asked once per item and must return `true` only if the id
    /// is still pending disposal, marking it done as a side effect. Items it
    /// refuses are dropped without running the disposer. A failing disposer
    /// is logged and does not stop the remaining items. Calling this while a
    /// drain is already running is refused.
    pub fn drain<R, F>(&mut self, mut retire: R, mut disposer: F) -> DrainReport
    where
        R: FnMut(SlotId) -> bool,
        F: FnMut(SlotId, T) -> DisposeResult,
    {
        let mut report = DrainReport::default();
        if self.draining {
            log::warn!("Disposal drain re-entered; skipping");
            return report;
        }
        self.draining = true;

        while let Some((id, item)) = self.queue.pop_front() {
            if !retire(id) {
                log::warn!("Double disposal attempt for {id}; skipping");
                report.skipped += 1;
                continue;
            }
            match disposer(id, item) {
                Ok(()) => report.disposed += 1,
                Err(err) => {
                    log::error!("Disposal of {id} failed: {err}");
                    report.failed += 1;
                }
            }
        }

        self.draining = false;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_drain_is_fifo_and_survives_failures() {
        let mut queue = DisposalQueue::new();
        for raw in 1..=4 {
            assert!(queue.enqueue(SlotId::new(raw), raw));
        }

        let mut order = Vec::new();
        let report = queue.drain(|_| true, |id, item| {
            order.push(item);
            if id == SlotId::new(2) {
                Err("boom".into())
            } else {
                Ok(())
            }
        });

        assert_eq!(order, vec![1, 2, 3, 4]);
        assert_eq!(report, DrainReport { disposed: 3, failed: 1, skipped: 0 });
        assert!(queue.is_empty());
    }

    #[test]
    fn test_same_id_is_never_disposed_twice() {
        let mut queue = DisposalQueue::new();
        let mut pending: HashSet<SlotId> = HashSet::new();
        let id = SlotId::new(9);
        pending.insert(id);
        assert!(queue.enqueue(id, "first"));
        assert!(!queue.enqueue(id, "again"));

        let mut calls = 0;
        let first = queue.drain(
            |id| pending.remove(&id),
            |_, _| {
                calls += 1;
                Ok(())
            },
        );
        assert_eq!(first.disposed, 1);

        // Queued again after disposal: the owner no longer has it pending
        assert!(queue.enqueue(id, "after"));
        let second = queue.drain(
            |id| pending.remove(&id),
            |_, _| {
                calls += 1;
                Ok(())
            },
        );

        assert_eq!(calls, 1);
        assert_eq!(second, DrainReport { disposed: 0, failed: 0, skipped: 1 });
        assert!(queue.is_empty());
    }

    #[test]
    fn test_nested_drain_is_refused() {
        let mut queue: DisposalQueue<u32> = DisposalQueue::new();
        queue.draining = true;
        queue.enqueue(SlotId::new(1), 1);
        let report = queue.drain(|_| true, |_, _| Ok(()));
        assert_eq!(report, DrainReport::default());
        assert_eq!(queue.len(), 1);
    }
}
