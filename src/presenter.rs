use crate::state::ChangeState;
use crate::transport::{CommandKind, CommandTransport, Completion};
use crate::view::{ChangeListView, CommandRequest};
use crate::{debug, error};
use std::rc::{Rc, Weak};

/// surfaces failed commands to the user
pub trait FailureReporter {
    fn report(&self, kind: CommandKind, error: &anyhow::Error);
}

/// prints failures to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalReporter;

impl FailureReporter for TerminalReporter {
    fn report(&self, kind: CommandKind, error: &anyhow::Error) {
        error!("failed to {}: {:#}", kind, error);
    }
}

/// keeps a change list view in step with the change state and forwards the
/// view's stage/unstage requests to the transport
///
/// the presenter holds no copy of the snapshot and never updates the view
/// on its own after a command; the next refresh shows the outcome.
#[derive(Debug)]
pub struct ChangeListPresenter<V> {
    view: Rc<V>,
}

impl<V: ChangeListView + 'static> ChangeListPresenter<V> {
    /// wire both subscriptions, once, for the lifetime of the view
    pub fn new(
        transport: Rc<dyn CommandTransport>,
        view: Rc<V>,
        state: &ChangeState,
        reporter: Rc<dyn FailureReporter>,
    ) -> Self {
        let request_view = Rc::downgrade(&view);
        view.on_command_request(Box::new(move |request: &CommandRequest| {
            dispatch(transport.as_ref(), &request_view, &reporter, request);
        }));

        let refresh_view = Rc::downgrade(&view);
        let refresh_state = state.downgrade();
        state.bind_refresh_handler(move |event| {
            let (Some(view), Some(state)) = (refresh_view.upgrade(), refresh_state.upgrade())
            else {
                debug!("ignoring {:?} refresh, view is gone", event.reason);
                return;
            };
            view.set_items(&state.current_snapshot());
        });

        Self { view }
    }

    pub fn view(&self) -> &Rc<V> {
        &self.view
    }

    pub fn set_select_first_item_by_default(&self, enabled: bool) {
        self.view.set_select_first_item_by_default(enabled);
    }
}

/// send one batch to the transport without waiting for it
fn dispatch<V: 'static>(
    transport: &dyn CommandTransport,
    view: &Weak<V>,
    reporter: &Rc<dyn FailureReporter>,
    request: &CommandRequest,
) {
    if request.is_empty() {
        debug!("ignoring empty command batch");
        return;
    }

    let kind = if request.is_unstage() {
        CommandKind::Unstage
    } else {
        CommandKind::Stage
    };
    let paths = request.paths();
    debug!("dispatching {} of {} path(s)", kind, paths.len());

    let view = Weak::clone(view);
    let reporter = Rc::clone(reporter);
    let done: Completion = Box::new(move |result: anyhow::Result<()>| {
        if view.strong_count() == 0 {
            debug!("{} finished after the view was closed", kind);
            return;
        }
        if let Err(e) = result {
            reporter.report(kind, &e);
        }
    });

    match kind {
        CommandKind::Stage => transport.stage(paths, done),
        CommandKind::Unstage => transport.unstage(paths, done),
    }
}
