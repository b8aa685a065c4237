pub mod cli;
pub mod constants;
pub mod context;
pub mod events;
pub mod poller;
pub mod presenter;
pub mod state;
pub mod status;
pub mod transport;
pub mod ui;
pub mod view;

pub use events::{EventSource, TaskQueue};
pub use poller::{GitStatusPoller, PollSettings};
pub use presenter::{ChangeListPresenter, FailureReporter, TerminalReporter};
pub use state::{ChangeState, RefreshEvent, RefreshReason};
pub use status::{FileState, Snapshot, StatusEntry};
pub use transport::{CommandKind, CommandTransport, Completion, GitTransport};
pub use view::{ChangeListView, CommandHandler, CommandItem, CommandRequest, TableView};
