//! FIFO work queue with drain tracking for async workers
//!
//! Producers [`enqueue`](WorkQueue::enqueue); workers
//! [`dequeue`](WorkQueue::dequeue) (suspending while empty) and
//! [`ack`](WorkQueue::ack) once per dequeued item. [`join`](WorkQueue::join)
//! resolves when every enqueued item has been acknowledged.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("ack without an outstanding dequeued item")]
    Overacknowledged,
}

struct QueueState<T> {
    items: VecDeque<T>,
    /// Dequeued but not yet acknowledged
    in_flight: usize,
    enqueued: usize,
}

impl<T> QueueState<T> {
    fn unfinished(&self) -> usize {
        self.items.len() + self.in_flight
    }
}

pub struct WorkQueue<T> {
    state: Mutex<QueueState<T>>,
    item_ready: Notify,
    drained: Notify,
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                in_flight: 0,
                enqueued: 0,
            }),
            item_ready: Notify::new(),
            drained: Notify::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn enqueue(&self, item: T) {
        {
            let mut state = self.state();
            state.items.push_back(item);
            state.enqueued += 1;
        }
        self.item_ready.notify_one();
    }

    /// Take the oldest item, waiting while the queue is empty.
    pub async fn dequeue(&self) -> T {
        loop {
            let ready = self.item_ready.notified();
            if let Some(item) = self.try_dequeue() {
                return item;
            }
            ready.await;
        }
    }

    pub fn try_dequeue(&self) -> Option<T> {
        let mut state = self.state();
        let item = state.items.pop_front()?;
        state.in_flight += 1;
        Some(item)
    }

    /// Mark one dequeued item as done.
    pub fn ack(&self) -> Result<(), QueueError> {
        let drained = {
            let mut state = self.state();
            if state.in_flight == 0 {
                return Err(QueueError::Overacknowledged);
            }
            state.in_flight -= 1;
            state.unfinished() == 0
        };
        if drained {
            self.drained.notify_waiters();
        }
        Ok(())
    }

    /// Wait until every enqueued item has been acknowledged.
    pub async fn join(&self) {
        loop {
            let drained = self.drained.notified();
            if self.state().unfinished() == 0 {
                return;
            }
            drained.await;
        }
    }

    /// Items waiting to be dequeued
    pub fn len(&self) -> usize {
        self.state().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items enqueued but not yet acknowledged
    pub fn unfinished(&self) -> usize {
        self.state().unfinished()
    }

    /// Items ever enqueued
    pub fn total_enqueued(&self) -> usize {
        self.state().enqueued
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for WorkQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let queue = Self::new();
        for item in iter {
            queue.enqueue(item);
        }
        queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn fifo_order() {
        let q: WorkQueue<i32> = [1, 2, 3].into_iter().collect();
        assert_eq!(q.total_enqueued(), 3);
        assert_eq!(q.dequeue().await, 1);
        assert_eq!(q.dequeue().await, 2);
        assert_eq!(q.dequeue().await, 3);
        assert!(q.is_empty());
        assert_eq!(q.unfinished(), 3);
    }

    #[tokio::test]
    async fn join_on_empty_queue_returns() {
        let q: WorkQueue<i32> = WorkQueue::new();
        tokio::time::timeout(Duration::from_secs(1), q.join())
            .await
            .expect("join should not block on an empty queue");
    }

    #[test]
    fn ack_without_dequeue_is_error() {
        let q: WorkQueue<i32> = [1].into_iter().collect();
        assert_eq!(q.ack(), Err(QueueError::Overacknowledged));
        q.try_dequeue().unwrap();
        assert_eq!(q.ack(), Ok(()));
        assert_eq!(q.ack(), Err(QueueError::Overacknowledged));
    }

    #[tokio::test]
    async fn join_waits_for_every_ack() {
        let q = Arc::new(WorkQueue::new());
        for i in 0..3 {
            q.enqueue(i);
        }
        for _ in 0..3 {
            q.dequeue().await;
        }
        q.ack().unwrap();
        q.ack().unwrap();

        let join = tokio::spawn({
            let q = q.clone();
            async move { q.join().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!join.is_finished(), "join returned with one item unacknowledged");

        q.ack().unwrap();
        tokio::time::timeout(Duration::from_secs(1), join)
            .await
            .expect("join should return after the last ack")
            .unwrap();
        assert_eq!(q.unfinished(), 0);
    }

    #[tokio::test]
    async fn dequeue_wakes_on_enqueue() {
        let q = Arc::new(WorkQueue::new());
        let waiter = tokio::spawn({
            let q = q.clone();
            async move { q.dequeue().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        q.enqueue("late");
        let item = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("dequeue should wake")
            .unwrap();
        assert_eq!(item, "late");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_workers_take_each_item_once() {
        let q: Arc<WorkQueue<usize>> = Arc::new((0..200).collect());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let q = q.clone();
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Some(item) = q.try_dequeue() {
                    seen.push(item);
                    tokio::task::yield_now().await;
                    q.ack().unwrap();
                }
                seen
            }));
        }
        let mut all = Vec::new();
        for h in handles {
            all.extend(h.await.unwrap());
        }
        q.join().await;
        all.sort_unstable();
        assert_eq!(all, (0..200).collect::<Vec<_>>());
    }
}
