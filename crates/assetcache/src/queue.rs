//! Priority-ordered blocking queue of pending loads
//!
//! Smaller priority values are served first. Equal priorities are served in
//! enqueue order: every entry carries a sequence number that breaks ties.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Load priority; smaller values are served first
pub type Priority = u32;

struct Entry<T> {
    priority: Priority,
    seq: u64,
    item: T,
}

impl<T> Entry<T> {
    fn key(&self) -> (Priority, u64) {
        (self.priority, self.seq)
    }
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // BinaryHeap is a max-heap; reverse so the smallest key pops first
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

struct Inner<T> {
    heap: BinaryHeap<Entry<T>>,
    next_seq: u64,
    closed: bool,
}

/// Unbounded multi-producer queue with blocking, wake-on-enqueue dequeue
pub struct LoadQueue<T> {
    inner: Mutex<Inner<T>>,
    available: Condvar,
}

impl<T> Default for LoadQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LoadQueue<T> {
    /// Create an empty, open queue
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                next_seq: 0,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Add an entry; never blocks
    pub fn enqueue(&self, item: T, priority: Priority) {
        let mut inner = self.inner.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.heap.push(Entry {
            priority,
            seq,
            item,
        });
        drop(inner);
        self.available.notify_one();
    }

    /// Wait for the next entry
    ///
    /// Returns `None` only once the queue is closed and empty, so closing
    /// lets consumers drain what is left before stopping.
    pub fn dequeue(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(entry) = inner.heap.pop() {
                return Some(entry.item);
            }
            if inner.closed {
                return None;
            }
            self.available.wait(&mut inner);
        }
    }

    /// Like `dequeue`, giving up after `timeout`
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<T> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.dequeue();
        };
        let mut inner = self.inner.lock();
        loop {
            if let Some(entry) = inner.heap.pop() {
                return Some(entry.item);
            }
            if inner.closed {
                return None;
            }
            if self.available.wait_until(&mut inner, deadline).timed_out() {
                return inner.heap.pop().map(|entry| entry.item);
            }
        }
    }

    /// Take the next entry if one is ready
    pub fn try_dequeue(&self) -> Option<T> {
        self.inner.lock().heap.pop().map(|entry| entry.item)
    }

    /// Take every queued entry in service order
    pub fn drain(&self) -> Vec<T> {
        let mut inner = self.inner.lock();
        let mut out = Vec::with_capacity(inner.heap.len());
        while let Some(entry) = inner.heap.pop() {
            out.push(entry.item);
        }
        out
    }

    /// Stop blocking consumers once the queue runs dry
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.available.notify_all();
    }

    /// Check if `close` was called
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Number of queued entries
    pub fn len(&self) -> usize {
        self.inner.lock().heap.len()
    }

    /// Check if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_priority_then_fifo() {
        let queue = LoadQueue::new();
        queue.enqueue("5-first", 5);
        queue.enqueue("1", 1);
        queue.enqueue("5-second", 5);
        queue.enqueue("3", 3);

        assert_eq!(queue.dequeue(), Some("1"));
        assert_eq!(queue.dequeue(), Some("3"));
        assert_eq!(queue.dequeue(), Some("5-first"));
        assert_eq!(queue.dequeue(), Some("5-second"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_fifo_among_equal_priorities() {
        let queue = LoadQueue::new();
        for i in 0..100 {
            queue.enqueue(i, 7);
        }
        assert_eq!(queue.drain(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_try_dequeue_empty() {
        let queue: LoadQueue<u32> = LoadQueue::new();
        assert_eq!(queue.try_dequeue(), None);
        assert_eq!(queue.dequeue_timeout(Duration::from_millis(10)), None);
    }

    #[test]
    fn test_dequeue_unbounded_timeout() {
        let queue = LoadQueue::new();
        queue.enqueue("a", 1);

        assert_eq!(queue.dequeue_timeout(Duration::MAX), Some("a"));

        queue.close();
        assert_eq!(queue.dequeue_timeout(Duration::MAX), None);
    }

    #[test]
    fn test_dequeue_wakes_on_enqueue() {
        let queue = Arc::new(LoadQueue::new());

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.dequeue())
        };

        thread::sleep(Duration::from_millis(20));
        queue.enqueue("late", 0);

        assert_eq!(consumer.join().unwrap(), Some("late"));
    }

    #[test]
    fn test_close_drains_then_stops() {
        let queue = LoadQueue::new();
        queue.enqueue(1, 0);
        queue.enqueue(2, 0);
        queue.close();

        assert!(queue.is_closed());
        assert_eq!(queue.dequeue(), Some(1));
        assert_eq!(queue.dequeue(), Some(2));
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_close_releases_blocked_consumers() {
        let queue: Arc<LoadQueue<u32>> = Arc::new(LoadQueue::new());

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.dequeue())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        queue.close();

        for consumer in consumers {
            assert_eq!(consumer.join().unwrap(), None);
        }
    }

    #[test]
    fn test_concurrent_producers() {
        let queue = Arc::new(LoadQueue::new());

        let producers: Vec<_> = (0..4u32)
            .map(|p| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..250u32 {
                        queue.enqueue(p * 1000 + i, i % 10);
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        let drained = queue.drain();
        assert_eq!(drained.len(), 1000);

        let priorities: Vec<u32> = drained.iter().map(|v| (v % 1000) % 10).collect();
        assert!(priorities.windows(2).all(|w| w[0] <= w[1]));
    }
}
