use crate::events::EventSource;
use crate::status::StatusEntry;
use colored::Colorize;
use num_format::{Locale, ToFormattedString};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt::Write;

/// one file of a command batch and the staged state it should end up in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandItem {
    pub path: String,
    /// rename source, moved in the same direction as `path`
    pub old_path: Option<String>,
    pub staged: bool,
}

/// a batch of paths that all move in the same direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    items: Vec<CommandItem>,
    unstage: bool,
}

impl CommandRequest {
    pub fn new<I, S>(paths: I, unstage: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = paths
            .into_iter()
            .map(|path| CommandItem {
                path: path.into(),
                old_path: None,
                staged: !unstage,
            })
            .collect();
        Self { items, unstage }
    }

    /// batch for listed entries, keeping the rename source of each
    pub fn for_entries(entries: impl IntoIterator<Item = StatusEntry>, unstage: bool) -> Self {
        let items = entries
            .into_iter()
            .map(|entry| CommandItem {
                path: entry.path,
                old_path: entry.old_path,
                staged: !unstage,
            })
            .collect();
        Self { items, unstage }
    }

    pub fn stage<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(paths, false)
    }

    pub fn unstage<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(paths, true)
    }

    pub fn items(&self) -> &[CommandItem] {
        &self.items
    }

    pub fn is_unstage(&self) -> bool {
        self.unstage
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// paths in the order they were requested, a rename source right after
    /// its new path
    pub fn paths(&self) -> Vec<String> {
        let mut paths = Vec::with_capacity(self.items.len());
        for item in &self.items {
            paths.push(item.path.clone());
            if let Some(old_path) = &item.old_path {
                paths.push(old_path.clone());
            }
        }
        paths
    }
}

pub type CommandHandler = Box<dyn Fn(&CommandRequest)>;

/// a list of changed files the user can select and stage or unstage
pub trait ChangeListView {
    /// replace the displayed rows
    fn set_items(&self, items: &[StatusEntry]);

    /// register a handler for stage/unstage requests raised by the user
    fn on_command_request(&self, handler: CommandHandler);

    fn set_select_first_item_by_default(&self, enabled: bool);
}

/// terminal table of changed files
///
/// selection is keyed by path. `set_items` keeps the selection of paths that
/// are still listed and forgets the rest; when nothing is left selected and
/// select-first is on, the first row gets selected.
#[derive(Debug, Default)]
pub struct TableView {
    items: RefCell<Vec<StatusEntry>>,
    selection: RefCell<HashSet<String>>,
    select_first: Cell<bool>,
    requests: EventSource<CommandRequest>,
}

impl TableView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<StatusEntry> {
        self.items.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn select_first_by_default(&self) -> bool {
        self.select_first.get()
    }

    /// selected entries in display order
    pub fn selected(&self) -> Vec<StatusEntry> {
        let selection = self.selection.borrow();
        self.items
            .borrow()
            .iter()
            .filter(|entry| selection.contains(&entry.path))
            .cloned()
            .collect()
    }

    pub fn is_selected(&self, path: &str) -> bool {
        self.selection.borrow().contains(path)
    }

    /// add a listed path to the selection, returns false if not listed
    pub fn select(&self, path: &str) -> bool {
        let listed = self.items.borrow().iter().any(|entry| entry.path == path);
        if listed {
            self.selection.borrow_mut().insert(path.to_string());
        }
        listed
    }

    /// flip the selection of the row at `index`, returns false if out of range
    pub fn toggle(&self, index: usize) -> bool {
        let Some(path) = self.items.borrow().get(index).map(|e| e.path.clone()) else {
            return false;
        };
        let mut selection = self.selection.borrow_mut();
        if !selection.remove(&path) {
            selection.insert(path);
        }
        true
    }

    pub fn select_all(&self) {
        let paths = self.items.borrow().iter().map(|e| e.path.clone()).collect();
        *self.selection.borrow_mut() = paths;
    }

    pub fn clear_selection(&self) {
        self.selection.borrow_mut().clear();
    }

    /// stage the selected entries that have working tree changes
    pub fn stage_selected(&self) {
        let entries = self
            .selected()
            .into_iter()
            .filter(StatusEntry::is_unstaged);
        self.emit(CommandRequest::for_entries(entries, false));
    }

    /// unstage the selected entries that have index changes
    pub fn unstage_selected(&self) {
        let entries = self
            .selected()
            .into_iter()
            .filter(StatusEntry::is_staged);
        self.emit(CommandRequest::for_entries(entries, true));
    }

    /// flip the staged state of the selection
    ///
    /// fully staged entries are unstaged, everything else is staged. each
    /// direction goes out as its own batch, unstage first, and a direction
    /// with nothing in it is skipped.
    pub fn toggle_staged_selected(&self) {
        let (unstage, stage): (Vec<StatusEntry>, Vec<StatusEntry>) = self
            .selected()
            .into_iter()
            .partition(StatusEntry::is_fully_staged);

        if !unstage.is_empty() {
            self.emit(CommandRequest::for_entries(unstage, true));
        }
        if !stage.is_empty() {
            self.emit(CommandRequest::for_entries(stage, false));
        }
    }

    /// request a command for an explicit subset, unlisted paths are skipped
    pub fn request(&self, paths: &[&str], unstage: bool) {
        let listed: Vec<StatusEntry> = {
            let items = self.items.borrow();
            paths
                .iter()
                .filter_map(|path| items.iter().find(|entry| entry.path == *path).cloned())
                .collect()
        };
        self.emit(CommandRequest::for_entries(listed, unstage));
    }

    fn emit(&self, request: CommandRequest) {
        crate::debug!(
            "{} request for {} path(s)",
            if request.is_unstage() { "unstage" } else { "stage" },
            request.items().len()
        );
        self.requests.emit(&request);
    }

    /// render the table as terminal text
    pub fn render(&self) -> String {
        let items = self.items.borrow();
        let selection = self.selection.borrow();
        let mut output = String::new();

        if items.is_empty() {
            let _ = writeln!(output, "{}", "no changes".dimmed());
            return output;
        }

        let width = items.len().to_string().len();
        for (index, entry) in items.iter().enumerate() {
            let marker = if selection.contains(&entry.path) {
                "*".bold()
            } else {
                " ".normal()
            };
            let staged = entry.staged.code().to_string();
            let unstaged = entry.unstaged.code().to_string();
            let (staged, unstaged) = if entry.is_conflicted() {
                (staged.magenta(), unstaged.magenta())
            } else {
                (staged.green(), unstaged.red())
            };
            let path = match &entry.old_path {
                Some(old_path) => format!("{old_path} -> {}", entry.path),
                None => entry.path.clone(),
            };
            let _ = writeln!(output, "{marker} {index:>width$} {staged}{unstaged} {path}");
        }

        let staged = items.iter().filter(|e| e.is_staged()).count();
        let unstaged = items.iter().filter(|e| e.is_unstaged()).count();
        let file_word = if items.len() == 1 { "file" } else { "files" };
        let _ = writeln!(
            output,
            "{}",
            format!(
                "{} {file_word}, {} staged, {} unstaged, {} selected",
                items.len().to_formatted_string(&Locale::en),
                staged.to_formatted_string(&Locale::en),
                unstaged.to_formatted_string(&Locale::en),
                selection.len().to_formatted_string(&Locale::en),
            )
            .dimmed()
        );
        output
    }
}

impl ChangeListView for TableView {
    fn set_items(&self, items: &[StatusEntry]) {
        let listed: HashSet<&str> = items.iter().map(|e| e.path.as_str()).collect();
        let mut selection = self.selection.borrow_mut();
        selection.retain(|path| listed.contains(path.as_str()));
        if selection.is_empty()
            && self.select_first.get()
            && let Some(first) = items.first()
        {
            selection.insert(first.path.clone());
        }
        drop(selection);

        *self.items.borrow_mut() = items.to_vec();
    }

    fn on_command_request(&self, handler: CommandHandler) {
        self.requests.subscribe(move |request| handler(request));
    }

    fn set_select_first_item_by_default(&self, enabled: bool) {
        self.select_first.set(enabled);
    }
}
