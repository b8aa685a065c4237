use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

type Listener<T> = Rc<dyn Fn(&T)>;

/// typed event channel owning its listener list
///
/// delivery is synchronous, on the emitting thread, in subscription order.
/// listeners are never removed; a listener that outlives its target should
/// hold weak references and turn into a no-op.
pub struct EventSource<T> {
    listeners: RefCell<Vec<Listener<T>>>,
}

impl<T> EventSource<T> {
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) {
        self.listeners.borrow_mut().push(Rc::new(listener));
    }

    pub fn emit(&self, event: &T) {
        // clone the list so listeners may subscribe while being notified
        let listeners: Vec<Listener<T>> = self.listeners.borrow().clone();
        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl<T> Default for EventSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

type Task = Box<dyn FnOnce()>;

/// cooperative queue of deferred work, drained by the event loop
#[derive(Clone, Default)]
pub struct TaskQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&self, task: impl FnOnce() + 'static) {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    /// run queued tasks in FIFO order until the queue is empty
    ///
    /// tasks spawned while draining run in the same call. returns the number
    /// of tasks that ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            // the borrow must end before the task runs, tasks may spawn
            let next = self.tasks.borrow_mut().pop_front();
            match next {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break ran,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.len())
            .finish()
    }
}
