//! Thread-local tracer slots.
//!
//! Each worker thread owns an independent tracer instance so the
//! span-creation hot path never takes a lock. A [`ThreadLocalSlot`] maps the
//! calling thread to its owned entry: the registered initializer runs
//! exactly once per thread, on first access, receiving that thread's
//! runtime handle; every later access returns the cached instance at O(1).
//!
//! Entries are dropped when their owning thread tears down. Since an entry
//! is only ever touched by the thread that created it there is no
//! destruction race and no synchronization anywhere on the access path.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;

static NEXT_SLOT_ID: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static SLOTS: RefCell<HashMap<u64, Rc<dyn Any>>> = RefCell::new(HashMap::new());
}

type SlotInit<T> = dyn Fn(&Handle) -> Rc<T> + Send + Sync;

/// Allocates one owned `T` per worker thread, lazily.
pub struct ThreadLocalSlot<T> {
    id: u64,
    init: Arc<SlotInit<T>>,
}

impl<T> Clone for ThreadLocalSlot<T> {
    fn clone(&self) -> Self {
        ThreadLocalSlot {
            id: self.id,
            init: self.init.clone(),
        }
    }
}

impl<T> fmt::Debug for ThreadLocalSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadLocalSlot").field("id", &self.id).finish()
    }
}

impl<T: 'static> ThreadLocalSlot<T> {
    /// Allocate a slot with the initializer that will run once per thread.
    ///
    /// The initializer receives the calling thread's runtime handle (for
    /// arming per-thread timers) and must not block.
    pub fn new(init: impl Fn(&Handle) -> Rc<T> + Send + Sync + 'static) -> Self {
        ThreadLocalSlot {
            id: NEXT_SLOT_ID.fetch_add(1, Ordering::Relaxed),
            init: Arc::new(init),
        }
    }

    /// This thread's entry, creating it on first access.
    ///
    /// Must be called on a thread running a tokio runtime; the initializer
    /// must not call back into the same slot.
    pub fn get(&self) -> Rc<T> {
        if let Some(existing) = SLOTS.with(|slots| slots.borrow().get(&self.id).cloned()) {
            return existing
                .downcast::<T>()
                .expect("slot ids are unique, entry type cannot change");
        }
        let handle = Handle::current();
        let value = (self.init)(&handle);
        SLOTS.with(|slots| {
            slots
                .borrow_mut()
                .insert(self.id, value.clone() as Rc<dyn Any>)
        });
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    fn current_thread_runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("failed to build current-thread runtime")
    }

    #[test]
    fn initializer_runs_once_per_thread() {
        let calls = Arc::new(AtomicUsize::new(0));
        let slot = {
            let calls = calls.clone();
            ThreadLocalSlot::new(move |_handle| {
                calls.fetch_add(1, Ordering::SeqCst);
                Rc::new(7u32)
            })
        };

        let runtime = current_thread_runtime();
        runtime.block_on(async {
            let first = slot.get();
            let second = slot.get();
            assert!(Rc::ptr_eq(&first, &second));
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn threads_receive_distinct_instances() {
        let slot = Arc::new(ThreadLocalSlot::new(|_handle| Rc::new(0u64)));
        // Both workers hold their entry until the other has reported, so the
        // two addresses cannot alias through allocator reuse.
        let barrier = Arc::new(std::sync::Barrier::new(2));

        let (tx, rx) = mpsc::channel::<usize>();
        let mut workers = Vec::new();
        for _ in 0..2 {
            let slot = slot.clone();
            let barrier = barrier.clone();
            let tx = tx.clone();
            workers.push(std::thread::spawn(move || {
                let runtime = current_thread_runtime();
                runtime.block_on(async move {
                    let entry = slot.get();
                    tx.send(Rc::as_ptr(&entry) as usize).unwrap();
                    let again = slot.get();
                    assert!(Rc::ptr_eq(&entry, &again));
                    barrier.wait();
                });
            }));
        }
        drop(tx);

        let addresses: Vec<usize> = rx.iter().collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(addresses.len(), 2);
        assert_ne!(addresses[0], addresses[1], "identity, not equality");
    }

    #[test]
    fn slots_are_independent() {
        let first = ThreadLocalSlot::new(|_handle| Rc::new(1u32));
        let second = ThreadLocalSlot::new(|_handle| Rc::new(2u32));

        let runtime = current_thread_runtime();
        runtime.block_on(async {
            assert_eq!(*first.get(), 1);
            assert_eq!(*second.get(), 2);
        });
    }
}
