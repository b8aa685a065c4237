use anyhow::{Result, bail};
use git_changelist::cli::Cli;
use git_changelist::constants::SPINNER_TICK_MILLIS;
use git_changelist::context::{AppContext, Settings};
use git_changelist::ui::{self, PromptOutcome};
use git_changelist::{
    ChangeListPresenter, ChangeState, GitStatusPoller, GitTransport, RefreshReason, TableView,
    TaskQueue, TerminalReporter, debug, error, info, status, warning,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::rc::Rc;
use std::time::Duration;

fn main() {
    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    let ctx = AppContext::new(&cli, &settings);
    ui::set_verbose(ctx.verbose);
    debug!("{:?}", ctx);

    let poller = GitStatusPoller::open(&ctx.repo_path, ctx.poll)?;
    if let Some(operation) = poller.operation_in_progress()? {
        warning!("repository is in the middle of an operation ({:?})", operation);
    }

    let state = ChangeState::new();
    let queue = TaskQueue::new();
    let transport = Rc::new(GitTransport::new(poller.workdir(), queue.clone()));
    let presenter = ChangeListPresenter::new(
        transport,
        Rc::new(TableView::new()),
        &state,
        Rc::new(TerminalReporter),
    );
    presenter.set_select_first_item_by_default(ctx.select_first);

    initial_scan(&poller, &state)?;

    if ctx.once {
        info!(presenter.view().render().trim_end());
        return Ok(());
    }

    // sanity checks
    if !std::io::stdin().is_terminal() || !std::io::stdout().is_terminal() {
        bail!("interactive terminal required (use --once to print the list)");
    }

    event_loop(&ctx, &poller, &state, &queue, presenter.view())
}

/// first scan, with a spinner for large working trees
fn initial_scan(poller: &GitStatusPoller, state: &ChangeState) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("scanning working tree...");
    spinner.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MILLIS));

    let result = poller.refresh(state, RefreshReason::Explicit);

    spinner.finish_and_clear();
    result.map(|count| debug!("{} changed file(s)", count))
}

enum UserAction {
    Quit,
    Continue,
}

const OPTIONS: [&str; 8] = [
    "refresh", "stage", "unstage", "toggle", "pick", "all", "clear", "quit",
];

fn event_loop(
    ctx: &AppContext,
    poller: &GitStatusPoller,
    state: &ChangeState,
    queue: &TaskQueue,
    view: &TableView,
) -> Result<()> {
    let mut last_render = String::new();

    loop {
        // only redraw when something visible changed
        let rendered = view.render();
        if rendered != last_render {
            info!();
            info!(rendered.trim_end());
            last_render = rendered;
        }

        let reason = match ui::prompt(&OPTIONS, ctx.poll_timeout())? {
            PromptOutcome::TimedOut => RefreshReason::Poll,
            PromptOutcome::Cancelled => break,
            PromptOutcome::Choice(action) => match handle_user_action(action, view)? {
                UserAction::Quit => break,
                UserAction::Continue => RefreshReason::Explicit,
            },
        };

        let reason = if queue.run_pending() > 0 {
            RefreshReason::CommandCompleted
        } else {
            reason
        };

        // a failed scan leaves the previous list on screen
        if let Err(e) = poller.refresh(state, reason) {
            error!("{:#}", e);
        }
    }

    Ok(())
}

/// handle user action and return what to do next
fn handle_user_action(action: char, view: &TableView) -> Result<UserAction> {
    match action {
        's' => view.stage_selected(),
        'u' => view.unstage_selected(),
        't' => view.toggle_staged_selected(),
        'p' => pick(view)?,
        'a' => view.select_all(),
        'c' => view.clear_selection(),
        'q' => return Ok(UserAction::Quit),
        _ => status!("refreshing..."),
    }
    Ok(UserAction::Continue)
}

/// toggle rows by index, or select them by path
fn pick(view: &TableView) -> Result<()> {
    status!("rows or paths to pick:");
    let Some(line) = ui::read_line("? ")? else {
        return Ok(());
    };
    let Some(words) = ui::split_words(&line) else {
        warning!("unbalanced quotes in: {}", line);
        return Ok(());
    };

    for word in words {
        let picked = match word.parse::<usize>() {
            Ok(index) => view.toggle(index),
            Err(_) => view.select(&word),
        };
        if !picked {
            warning!("not in the change list: {}", word);
        }
    }
    Ok(())
}
