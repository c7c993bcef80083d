//! Sequential continuation-passing queue.
//!
//! [`run_queue`] walks a list of items one at a time. Each item is handed to
//! `step` together with a [`Continue`] handle; the next item starts only when
//! that handle is invoked, and `done` runs once after the last one. Absent
//! items (`None`) are skipped as already finished. Nothing runs in parallel,
//! nothing is reordered, and there is no timeout: an item that never invokes
//! its continuation stops the queue for good.
//!
//! ```
//! use nav_transition::run_queue;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let log = seen.clone();
//! let finished = seen.clone();
//!
//! run_queue(
//!     vec![Some(1), None, Some(3)],
//!     move |item, cont| {
//!         log.borrow_mut().push(item);
//!         cont.resume();
//!     },
//!     move || finished.borrow_mut().push(0),
//! );
//!
//! assert_eq!(*seen.borrow(), vec![1, 3, 0]);
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

struct QueueState<T> {
    items: RefCell<VecDeque<Option<T>>>,
    step: Box<dyn Fn(T, Continue)>,
    done: RefCell<Option<Box<dyn FnOnce()>>>,
}

/// Continuation for one queue item. Resuming it starts the next item.
pub struct Continue {
    advance: Box<dyn FnOnce()>,
}

impl Continue {
    /// Move on to the next item.
    pub fn resume(self) {
        (self.advance)();
    }
}

impl fmt::Debug for Continue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Continue")
    }
}

/// Run `items` through `step` strictly in order, then call `done`.
pub fn run_queue<T, S, D>(items: Vec<Option<T>>, step: S, done: D)
where
    T: 'static,
    S: Fn(T, Continue) + 'static,
    D: FnOnce() + 'static,
{
    let state = Rc::new(QueueState {
        items: RefCell::new(items.into()),
        step: Box::new(step),
        done: RefCell::new(Some(Box::new(done))),
    });
    advance(state);
}

fn advance<T: 'static>(state: Rc<QueueState<T>>) {
    loop {
        let item = state.items.borrow_mut().pop_front();
        match item {
            Some(Some(item)) => {
                let resume_state = state.clone();
                let cont = Continue {
                    advance: Box::new(move || advance(resume_state)),
                };
                (state.step)(item, cont);
                return;
            }
            Some(None) => continue,
            None => {
                let done = state.done.borrow_mut().take();
                if let Some(done) = done {
                    done();
                }
                return;
            }
        }
    }
}
