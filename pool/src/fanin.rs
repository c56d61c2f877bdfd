//! A fan-in join for concurrent outbound calls: N subtasks each deliver one
//! value, and the subtask that completes the set invokes the aggregate
//! callback exactly once, on its own thread, with the results in slot
//! order. The RPC layer uses this to join multi-node `getblocktemplate`
//! calls into a single continuation.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

type Callback<T> = Box<dyn FnOnce(Vec<T>) + Send>;

/// Shared aggregate state for one fan-in round.
pub struct FanIn<T> {
    slots: Mutex<Vec<Option<T>>>,
    callback: Mutex<Option<Callback<T>>>,
    arrived: AtomicUsize,
    expected: usize,
}

impl<T: Send> FanIn<T> {
    /// Create the aggregate for `expected` subtasks. `expected` must be at
    /// least 1; with nothing to wait for there is no completing deliverer
    /// to run the callback.
    pub fn new<F>(expected: usize, callback: F) -> Arc<Self>
    where
        F: FnOnce(Vec<T>) + Send + 'static,
    {
        assert!(expected > 0, "fan-in requires at least one subtask");
        Arc::new(Self {
            slots: Mutex::new((0..expected).map(|_| None).collect()),
            callback: Mutex::new(Some(Box::new(callback))),
            arrived: AtomicUsize::new(0),
            expected,
        })
    }

    /// Deliver subtask `index`'s value. May be called from any thread; each
    /// slot must be delivered exactly once. The caller that supplies the
    /// final value runs the callback before returning, releasing the
    /// aggregate state.
    pub fn deliver(&self, index: usize, value: T) {
        {
            let mut slots = self.slots.lock().expect("fan-in state poisoned");
            assert!(
                slots[index].is_none(),
                "fan-in slot {index} delivered twice"
            );
            slots[index] = Some(value);
        }

        // AcqRel: the completing thread must observe every earlier slot store
        if self.arrived.fetch_add(1, Ordering::AcqRel) + 1 == self.expected {
            let callback = self
                .callback
                .lock()
                .expect("fan-in state poisoned")
                .take();
            let slots = std::mem::take(&mut *self.slots.lock().expect("fan-in state poisoned"));
            let results: Vec<T> = slots.into_iter().flatten().collect();
            if let Some(callback) = callback {
                callback(results);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn it_fires_once_with_ordered_results() {
        let (tx, rx) = mpsc::channel();
        let fan_in = FanIn::new(4, move |results: Vec<u32>| {
            tx.send(results).unwrap();
        });

        let mut handles = vec![];
        for (index, value) in [(3usize, 30u32), (0, 0), (2, 20), (1, 10)] {
            let fan_in = Arc::clone(&fan_in);
            handles.push(thread::spawn(move || fan_in.deliver(index, value)));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(rx.recv().unwrap(), vec![0, 10, 20, 30]);
        assert!(rx.try_recv().is_err(), "callback must fire exactly once");
    }

    #[test]
    fn the_final_deliverer_runs_the_callback_inline() {
        let (tx, rx) = mpsc::channel();
        let fan_in = FanIn::new(2, move |results: Vec<&'static str>| {
            tx.send((thread::current().id(), results)).unwrap();
        });

        fan_in.deliver(0, "a");
        let fan_in2 = Arc::clone(&fan_in);
        let handle = thread::spawn(move || {
            let id = thread::current().id();
            fan_in2.deliver(1, "b");
            id
        });
        let worker_id = handle.join().unwrap();

        let (cb_thread, results) = rx.recv().unwrap();
        assert_eq!(cb_thread, worker_id);
        assert_eq!(results, vec!["a", "b"]);
    }
}
