use git2::Status;
use std::fmt;
use std::rc::Rc;

/// state of one side (index or working tree) of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileState {
    #[default]
    Unmodified,
    Modified,
    Added,
    Deleted,
    Renamed,
    TypeChanged,
    Untracked,
    Conflicted,
}

impl FileState {
    /// single porcelain character for this state
    pub fn code(self) -> char {
        match self {
            FileState::Unmodified => ' ',
            FileState::Modified => 'M',
            FileState::Added => 'A',
            FileState::Deleted => 'D',
            FileState::Renamed => 'R',
            FileState::TypeChanged => 'T',
            FileState::Untracked => '?',
            FileState::Conflicted => 'U',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        let state = match code {
            ' ' | '.' => FileState::Unmodified,
            'M' => FileState::Modified,
            'A' => FileState::Added,
            'D' => FileState::Deleted,
            'R' => FileState::Renamed,
            'T' => FileState::TypeChanged,
            '?' => FileState::Untracked,
            'U' => FileState::Conflicted,
            _ => return None,
        };
        Some(state)
    }

    pub fn is_changed(self) -> bool {
        self != FileState::Unmodified
    }
}

/// one file of the change list with its staged and unstaged state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatusEntry {
    pub path: String,
    /// set for renames, the path the file was renamed from
    pub old_path: Option<String>,
    pub staged: FileState,
    pub unstaged: FileState,
}

/// immutable snapshot of the working tree, replaced wholesale on refresh
pub type Snapshot = Rc<[StatusEntry]>;

impl StatusEntry {
    pub fn new(path: impl Into<String>, staged: FileState, unstaged: FileState) -> Self {
        Self {
            path: path.into(),
            old_path: None,
            staged,
            unstaged,
        }
    }

    pub fn with_old_path(mut self, old_path: impl Into<String>) -> Self {
        self.old_path = Some(old_path.into());
        self
    }

    /// every path a stage or unstage of this entry has to touch, new path
    /// first, then the old path of a rename
    pub fn touched_paths(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.path.as_str()).chain(self.old_path.as_deref())
    }

    /// parse a two-character porcelain code such as "M " or "??"
    pub fn from_code(code: &str, path: impl Into<String>) -> Option<Self> {
        let mut chars = code.chars();
        let staged = FileState::from_code(chars.next()?)?;
        let unstaged = FileState::from_code(chars.next()?)?;
        if chars.next().is_some() {
            return None;
        }
        Some(Self::new(path, staged, unstaged))
    }

    /// map git2 status flags onto the two sides
    pub fn from_git_status(path: impl Into<String>, status: Status) -> Self {
        if status.is_conflicted() {
            return Self::new(path, FileState::Conflicted, FileState::Conflicted);
        }
        if status.is_wt_new() && !status.intersects(Self::INDEX_FLAGS) {
            return Self::new(path, FileState::Untracked, FileState::Untracked);
        }

        let staged = if status.is_index_new() {
            FileState::Added
        } else if status.is_index_deleted() {
            FileState::Deleted
        } else if status.is_index_renamed() {
            FileState::Renamed
        } else if status.is_index_typechange() {
            FileState::TypeChanged
        } else if status.is_index_modified() {
            FileState::Modified
        } else {
            FileState::Unmodified
        };

        let unstaged = if status.is_wt_deleted() {
            FileState::Deleted
        } else if status.is_wt_renamed() {
            FileState::Renamed
        } else if status.is_wt_typechange() {
            FileState::TypeChanged
        } else if status.is_wt_modified() {
            FileState::Modified
        } else {
            FileState::Unmodified
        };

        Self::new(path, staged, unstaged)
    }

    const INDEX_FLAGS: Status = Status::INDEX_NEW
        .union(Status::INDEX_MODIFIED)
        .union(Status::INDEX_DELETED)
        .union(Status::INDEX_RENAMED)
        .union(Status::INDEX_TYPECHANGE);

    /// two-character porcelain code, staged side first
    pub fn code(&self) -> String {
        let mut code = String::with_capacity(2);
        code.push(self.staged.code());
        code.push(self.unstaged.code());
        code
    }

    /// the index side carries a change that could be unstaged
    pub fn is_staged(&self) -> bool {
        self.staged.is_changed() && !self.is_untracked() && !self.is_conflicted()
    }

    /// the working tree side carries a change that could be staged
    pub fn is_unstaged(&self) -> bool {
        self.unstaged.is_changed()
    }

    pub fn is_untracked(&self) -> bool {
        self.staged == FileState::Untracked
    }

    pub fn is_conflicted(&self) -> bool {
        self.staged == FileState::Conflicted || self.unstaged == FileState::Conflicted
    }

    /// everything is in the index and nothing is left in the working tree
    pub fn is_fully_staged(&self) -> bool {
        self.is_staged() && !self.is_unstaged()
    }
}

impl fmt::Display for StatusEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.old_path {
            Some(old_path) => write!(f, "{} {} -> {}", self.code(), old_path, self.path),
            None => write!(f, "{} {}", self.code(), self.path),
        }
    }
}
