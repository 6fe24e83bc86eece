use crossbeam_queue::ArrayQueue;

/// Single-slot latest-value handoff between a receive thread and a poller.
///
/// [`Mailbox::publish`] overwrites whatever is waiting; [`Mailbox::take_if_new`]
/// removes it. A burst of publishes between two takes collapses to the last
/// one and the older values are dropped. No value is ever returned twice.
///
/// Backed by a lock-free queue of capacity one, so neither side ever blocks.
pub struct Mailbox<T> {
    slot: ArrayQueue<T>,
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: ArrayQueue::new(1),
        }
    }

    /// Store `value`, replacing and dropping any value not yet taken.
    pub fn publish(&self, value: T) {
        drop(self.slot.force_push(value));
    }

    /// Take the pending value, if one was published since the last take.
    pub fn take_if_new(&self) -> Option<T> {
        self.slot.pop()
    }

    /// Returns true if a value is waiting. Does not consume it.
    pub fn has_new(&self) -> bool {
        !self.slot.is_empty()
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Mailbox<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("has_new", &self.has_new())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn empty_mailbox_has_nothing() {
        let mailbox: Mailbox<u32> = Mailbox::new();
        assert!(!mailbox.has_new());
        assert_eq!(mailbox.take_if_new(), None);
    }

    #[test]
    fn burst_collapses_to_latest() {
        let mailbox = Mailbox::new();
        mailbox.publish("v1");
        mailbox.publish("v2");
        mailbox.publish("v3");

        assert!(mailbox.has_new());
        assert_eq!(mailbox.take_if_new(), Some("v3"));
        assert_eq!(mailbox.take_if_new(), None);
        assert!(!mailbox.has_new());
    }

    #[test]
    fn has_new_does_not_consume() {
        let mailbox = Mailbox::new();
        mailbox.publish(7);
        assert!(mailbox.has_new());
        assert!(mailbox.has_new());
        assert_eq!(mailbox.take_if_new(), Some(7));
    }

    #[derive(Debug)]
    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn overwritten_and_pending_values_are_dropped() {
        let drops = Arc::new(AtomicUsize::new(0));
        {
            let mailbox = Mailbox::new();
            mailbox.publish(DropCounter(Arc::clone(&drops)));
            mailbox.publish(DropCounter(Arc::clone(&drops)));
            assert_eq!(drops.load(Ordering::SeqCst), 1);
        }
        assert_eq!(drops.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_publisher_never_delivers_twice() {
        let mailbox = Arc::new(Mailbox::new());
        let producer = {
            let mailbox = Arc::clone(&mailbox);
            std::thread::spawn(move || {
                for i in 0..10_000u32 {
                    mailbox.publish(i);
                }
            })
        };

        let mut last: Option<u32> = None;
        let mut taken = 0usize;
        let mut record = |value: u32| {
            if let Some(prev) = last {
                assert!(value > prev, "values must arrive in publish order");
            }
            last = Some(value);
            taken += 1;
        };

        while !producer.is_finished() {
            if let Some(value) = mailbox.take_if_new() {
                record(value);
            }
        }
        producer.join().unwrap();
        if let Some(value) = mailbox.take_if_new() {
            record(value);
        }
        assert_eq!(mailbox.take_if_new(), None);

        assert!(taken >= 1);
        assert!(taken <= 10_000);
        assert_eq!(last, Some(9_999));
    }
}
