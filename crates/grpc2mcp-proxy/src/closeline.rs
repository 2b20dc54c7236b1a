//! An ordered, idempotent stack of cleanup closures for test harnesses
//! that spin up a demo MCP server plus a proxy in front of it (spec
//! §4.8, P6).

use std::sync::Mutex;

type Closer = Box<dyn FnOnce() + Send>;

/// Registers closers in call order and runs them all, in that same order,
/// exactly once. Calling `close` more than once is a no-op after the
/// first call.
#[derive(Default)]
pub struct CloseLine {
    closers: Mutex<Vec<Closer>>,
}

impl CloseLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, closer: impl FnOnce() + Send + 'static) {
        self.closers.lock().unwrap().push(Box::new(closer));
    }

    /// Registers a fallible closer; any error it returns is dropped, as
    /// in the original, since cleanup failures during teardown have no
    /// caller left to report them to.
    pub fn add_fallible<E>(&self, closer: impl FnOnce() -> Result<(), E> + Send + 'static) {
        self.add(move || {
            let _ = closer();
        });
    }

    /// Runs every registered closer in registration order, then clears
    /// the list so a second call is a no-op.
    pub fn close(&self) {
        let closers = std::mem::take(&mut *self.closers.lock().unwrap());
        for closer in closers {
            closer();
        }
    }
}
