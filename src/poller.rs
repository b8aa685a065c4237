use crate::state::{ChangeState, RefreshReason};
use crate::status::StatusEntry;
use anyhow::{Context, Result, bail};
use git2::{Repository, RepositoryState, StatusOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// how the working tree is scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// detect renames in the index and in the working tree
    pub renames: bool,
    /// delay between periodic rescans
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            renames: true,
            interval: Duration::from_secs(crate::constants::DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

/// produces status snapshots from a git repository
#[derive(Debug)]
pub struct GitStatusPoller {
    workdir: PathBuf,
    settings: PollSettings,
}

impl GitStatusPoller {
    /// find the repository containing `path` (can be anywhere within the repo)
    pub fn open(path: &Path, settings: PollSettings) -> Result<Self> {
        let repo = Repository::discover(path)
            .with_context(|| format!("not in a git repository: {}", path.display()))?;
        let Some(workdir) = repo.workdir() else {
            bail!("bare repositories have no working tree");
        };
        Ok(Self {
            workdir: workdir.to_path_buf(),
            settings,
        })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    /// describe an in-progress operation (merge, rebase, etc), if any
    pub fn operation_in_progress(&self) -> Result<Option<RepositoryState>> {
        let repo = self.repo()?;
        match repo.state() {
            RepositoryState::Clean => Ok(None),
            state => Ok(Some(state)),
        }
    }

    /// read the status of every changed file, in the order git reports them
    pub fn scan(&self) -> Result<Vec<StatusEntry>> {
        let repo = self.repo()?;

        let mut opts = StatusOptions::new();
        opts.include_untracked(true);
        opts.recurse_untracked_dirs(true);
        opts.include_ignored(false);
        opts.renames_head_to_index(self.settings.renames);
        opts.renames_index_to_workdir(self.settings.renames);

        let statuses = repo
            .statuses(Some(&mut opts))
            .context("failed to read repository status")?;

        let mut entries = Vec::with_capacity(statuses.len());
        for entry in statuses.iter() {
            let status = entry.status();
            if status.is_ignored() || status.is_empty() {
                continue;
            }

            let workdir_delta = entry.index_to_workdir();
            let index_delta = entry.head_to_index();

            // renames are listed under their old name, show the new one
            let new_path = workdir_delta
                .as_ref()
                .and_then(|delta| delta.new_file().path().map(Path::to_path_buf))
                .or_else(|| {
                    index_delta
                        .as_ref()
                        .and_then(|delta| delta.new_file().path().map(Path::to_path_buf))
                });
            let path = match new_path {
                Some(path) => path.to_string_lossy().to_string(),
                None => String::from_utf8_lossy(entry.path_bytes()).to_string(),
            };

            // the old path has to move together with the new one
            let rename_delta = if status.is_wt_renamed() {
                workdir_delta.as_ref()
            } else if status.is_index_renamed() {
                index_delta.as_ref()
            } else {
                None
            };
            let old_path = rename_delta
                .and_then(|delta| delta.old_file().path().map(|p| p.to_string_lossy().to_string()))
                .filter(|old_path| *old_path != path);

            let status_entry = StatusEntry::from_git_status(path, status);
            entries.push(match old_path {
                Some(old_path) => status_entry.with_old_path(old_path),
                None => status_entry,
            });
        }

        Ok(entries)
    }

    /// scan and replace the state, returning the number of entries
    pub fn refresh(&self, state: &ChangeState, reason: RefreshReason) -> Result<usize> {
        let entries = self.scan()?;
        let count = entries.len();
        state.replace(entries, reason);
        Ok(count)
    }

    fn repo(&self) -> Result<Repository> {
        Repository::open(&self.workdir)
            .with_context(|| format!("failed to open git repository: {}", self.workdir.display()))
    }
}
