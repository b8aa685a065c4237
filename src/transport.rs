use crate::events::TaskQueue;
use crate::{debug, warning};
use anyhow::{Context, Result, anyhow, bail};
use git2::{ErrorCode, Repository};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// receives the outcome of a dispatched command, exactly once
pub type Completion = Box<dyn FnOnce(Result<()>)>;

/// which way a batch moves files between working tree and index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Stage,
    Unstage,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Stage => f.write_str("stage"),
            CommandKind::Unstage => f.write_str("unstage"),
        }
    }
}

/// remote side that carries out stage and unstage commands
///
/// both operations return immediately, `done` fires once the command has
/// finished, possibly much later.
pub trait CommandTransport {
    fn stage(&self, paths: Vec<String>, done: Completion);
    fn unstage(&self, paths: Vec<String>, done: Completion);
}

/// executes commands against the repository index on the task queue
#[derive(Debug, Clone)]
pub struct GitTransport {
    workdir: PathBuf,
    queue: TaskQueue,
}

impl GitTransport {
    pub fn new(workdir: impl Into<PathBuf>, queue: TaskQueue) -> Self {
        Self {
            workdir: workdir.into(),
            queue,
        }
    }

    fn submit(&self, kind: CommandKind, paths: Vec<String>, done: Completion) {
        let workdir = self.workdir.clone();
        self.queue.spawn(move || {
            debug!("running {} for {} path(s)", kind, paths.len());
            let result = match kind {
                CommandKind::Stage => stage_paths(&workdir, &paths),
                CommandKind::Unstage => unstage_paths(&workdir, &paths),
            };
            done(result);
        });
    }
}

impl CommandTransport for GitTransport {
    fn stage(&self, paths: Vec<String>, done: Completion) {
        self.submit(CommandKind::Stage, paths, done);
    }

    fn unstage(&self, paths: Vec<String>, done: Completion) {
        self.submit(CommandKind::Unstage, paths, done);
    }
}

/// paths must be relative and stay inside the working tree
fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("empty path");
    }
    let escapes = Path::new(path)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        bail!("path is outside the working tree: {path}");
    }
    Ok(())
}

/// add files to the index, or remove them if they no longer exist on disk
fn stage_paths(workdir: &Path, paths: &[String]) -> Result<()> {
    let repo = Repository::open(workdir)
        .with_context(|| format!("failed to open git repository: {}", workdir.display()))?;
    let mut index = repo.index().context("failed to get git index")?;

    // collect all errors before writing index
    let mut errors = Vec::new();

    for path in paths {
        if let Err(e) = validate_path(path) {
            errors.push(format!("failed to stage {path}: {e}"));
            continue;
        }
        let result = if workdir.join(path).symlink_metadata().is_ok() {
            index.add_path(Path::new(path))
        } else {
            // deletions: remove from index
            index.remove_path(Path::new(path))
        };
        if let Err(e) = result {
            errors.push(format!("failed to stage {path}: {e}"));
        }
    }

    if !errors.is_empty() {
        // rollback by reloading from disk
        if let Err(e) = index.read(true) {
            warning!("failed to reload index during rollback: {}", e);
        }
        return Err(anyhow!(errors.join("\n")));
    }

    index.write().context("failed to write git index")
}

/// reset index entries back to HEAD, or drop them when there is no HEAD yet
fn unstage_paths(workdir: &Path, paths: &[String]) -> Result<()> {
    for path in paths {
        validate_path(path).with_context(|| format!("failed to unstage {path}"))?;
    }

    let repo = Repository::open(workdir)
        .with_context(|| format!("failed to open git repository: {}", workdir.display()))?;

    // handle unborn branch (no commits yet)
    let head = match repo.head() {
        Ok(head) => Some(
            head.peel_to_commit()
                .context("failed to resolve HEAD commit")?
                .into_object(),
        ),
        Err(e) if e.code() == ErrorCode::UnbornBranch => None,
        Err(e) => return Err(e).context("failed to get HEAD"),
    };

    repo.reset_default(head.as_ref(), paths.iter().map(String::as_str))
        .context("failed to unstage files")
}

#[cfg(test)]
mod tests;
