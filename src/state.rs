use crate::events::EventSource;
use crate::status::{Snapshot, StatusEntry};
use crate::warning;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};

/// why a refresh happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    /// periodic rescan of the working tree
    Poll,
    /// explicit request from the user or a late-bound listener
    Explicit,
    /// a dispatched command completed
    CommandCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshEvent {
    pub reason: RefreshReason,
}

#[derive(Debug)]
struct Inner {
    snapshot: RefCell<Snapshot>,
    initialised: Cell<bool>,
    refreshed: EventSource<RefreshEvent>,
}

/// process-wide view of the working tree status
///
/// the snapshot is replaced wholesale by the poller and handed out as a
/// shared immutable slice. cloning the handle shares the same state.
#[derive(Debug, Clone)]
pub struct ChangeState {
    inner: Rc<Inner>,
}

/// non-owning handle for listeners, so the listener list never keeps the
/// state alive
#[derive(Debug, Clone)]
pub struct WeakChangeState {
    inner: Weak<Inner>,
}

impl WeakChangeState {
    pub fn upgrade(&self) -> Option<ChangeState> {
        self.inner.upgrade().map(|inner| ChangeState { inner })
    }
}

impl Default for ChangeState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeState {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Inner {
                snapshot: RefCell::new(Rc::from(Vec::new())),
                initialised: Cell::new(false),
                refreshed: EventSource::new(),
            }),
        }
    }

    /// latest snapshot, empty before the first refresh
    pub fn current_snapshot(&self) -> Snapshot {
        self.inner.snapshot.borrow().clone()
    }

    pub fn is_initialised(&self) -> bool {
        self.inner.initialised.get()
    }

    /// register a handler fired once per completed refresh
    pub fn on_refresh(&self, handler: impl Fn(&RefreshEvent) + 'static) {
        self.inner.refreshed.subscribe(handler);
    }

    /// like `on_refresh`, but a state that already holds data delivers one
    /// catch-up notification to this handler straight away
    pub fn bind_refresh_handler(&self, handler: impl Fn(&RefreshEvent) + 'static) {
        let handler = Rc::new(handler);
        let registered = Rc::clone(&handler);
        self.inner.refreshed.subscribe(move |event| registered(event));
        if self.is_initialised() {
            handler(&RefreshEvent {
                reason: RefreshReason::Explicit,
            });
        }
    }

    /// replace the snapshot and notify every listener exactly once
    ///
    /// paths must be unique, later duplicates are dropped.
    pub fn replace(&self, entries: Vec<StatusEntry>, reason: RefreshReason) {
        let mut seen = HashSet::with_capacity(entries.len());
        let mut unique = Vec::with_capacity(entries.len());
        for entry in entries {
            if seen.insert(entry.path.clone()) {
                unique.push(entry);
            } else {
                warning!("duplicate status entry for {}, ignoring", entry.path);
            }
        }

        *self.inner.snapshot.borrow_mut() = Rc::from(unique);
        self.inner.initialised.set(true);
        self.inner.refreshed.emit(&RefreshEvent { reason });
    }

    pub fn downgrade(&self) -> WeakChangeState {
        WeakChangeState {
            inner: Rc::downgrade(&self.inner),
        }
    }
}
