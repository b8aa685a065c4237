use super::*;
use std::cell::RefCell;
use std::fs;
use std::rc::Rc;
use tempfile::TempDir;

fn setup_test_repo() -> (TempDir, Repository) {
    let temp_dir = TempDir::new().unwrap();
    let repo = Repository::init(temp_dir.path()).unwrap();

    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@example.com").unwrap();

    (temp_dir, repo)
}

fn commit_all(repo: &Repository, message: &str) {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();

    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let signature = repo.signature().unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .unwrap();
}

/// status flags for one path, read fresh from disk
fn status_of(repo_path: &Path, path: &str) -> git2::Status {
    let repo = Repository::open(repo_path).unwrap();
    repo.status_file(Path::new(path)).unwrap()
}

/// run one command through the queue and return its outcome
fn run(
    transport: &GitTransport,
    queue: &TaskQueue,
    kind: CommandKind,
    paths: &[&str],
) -> Result<()> {
    let outcome: Rc<RefCell<Option<Result<()>>>> = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&outcome);
    let done: Completion = Box::new(move |result: Result<()>| {
        *slot.borrow_mut() = Some(result);
    });
    let paths = paths.iter().map(ToString::to_string).collect();

    match kind {
        CommandKind::Stage => transport.stage(paths, done),
        CommandKind::Unstage => transport.unstage(paths, done),
    }

    // nothing happens until the queue is drained
    assert!(outcome.borrow().is_none());
    assert_eq!(queue.run_pending(), 1);

    outcome.borrow_mut().take().expect("completion should fire")
}

#[test]
fn test_stage_untracked_and_modified() {
    let (temp_dir, repo) = setup_test_repo();
    let repo_path = temp_dir.path();
    fs::write(repo_path.join("tracked.txt"), "one").unwrap();
    commit_all(&repo, "initial commit");

    fs::write(repo_path.join("tracked.txt"), "two").unwrap();
    fs::write(repo_path.join("new.txt"), "new").unwrap();

    let queue = TaskQueue::new();
    let transport = GitTransport::new(repo_path, queue.clone());
    run(&transport, &queue, CommandKind::Stage, &["tracked.txt", "new.txt"]).unwrap();

    assert_eq!(status_of(repo_path, "tracked.txt"), git2::Status::INDEX_MODIFIED);
    assert_eq!(status_of(repo_path, "new.txt"), git2::Status::INDEX_NEW);
}

#[test]
fn test_stage_deletion() {
    let (temp_dir, repo) = setup_test_repo();
    let repo_path = temp_dir.path();
    fs::write(repo_path.join("gone.txt"), "bye").unwrap();
    commit_all(&repo, "initial commit");
    fs::remove_file(repo_path.join("gone.txt")).unwrap();

    let queue = TaskQueue::new();
    let transport = GitTransport::new(repo_path, queue.clone());
    run(&transport, &queue, CommandKind::Stage, &["gone.txt"]).unwrap();

    assert_eq!(status_of(repo_path, "gone.txt"), git2::Status::INDEX_DELETED);
}

#[test]
fn test_unstage_restores_head_version() {
    let (temp_dir, repo) = setup_test_repo();
    let repo_path = temp_dir.path();
    fs::write(repo_path.join("a.txt"), "one").unwrap();
    commit_all(&repo, "initial commit");

    fs::write(repo_path.join("a.txt"), "two").unwrap();
    fs::write(repo_path.join("b.txt"), "new").unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new("a.txt")).unwrap();
    index.add_path(Path::new("b.txt")).unwrap();
    index.write().unwrap();

    let queue = TaskQueue::new();
    let transport = GitTransport::new(repo_path, queue.clone());
    run(&transport, &queue, CommandKind::Unstage, &["a.txt", "b.txt"]).unwrap();

    // the working tree keeps the changes, the index no longer does
    assert_eq!(status_of(repo_path, "a.txt"), git2::Status::WT_MODIFIED);
    assert_eq!(status_of(repo_path, "b.txt"), git2::Status::WT_NEW);
    assert_eq!(fs::read_to_string(repo_path.join("a.txt")).unwrap(), "two");
}

#[test]
fn test_unstage_on_unborn_branch() {
    let (temp_dir, repo) = setup_test_repo();
    let repo_path = temp_dir.path();
    fs::write(repo_path.join("first.txt"), "hello").unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new("first.txt")).unwrap();
    index.write().unwrap();

    let queue = TaskQueue::new();
    let transport = GitTransport::new(repo_path, queue.clone());
    run(&transport, &queue, CommandKind::Unstage, &["first.txt"]).unwrap();

    assert_eq!(status_of(repo_path, "first.txt"), git2::Status::WT_NEW);
}

#[test]
fn test_stage_failure_rolls_back_whole_batch() {
    let (temp_dir, repo) = setup_test_repo();
    let repo_path = temp_dir.path();
    fs::write(repo_path.join("a.txt"), "one").unwrap();
    commit_all(&repo, "initial commit");
    fs::write(repo_path.join("a.txt"), "two").unwrap();

    let queue = TaskQueue::new();
    let transport = GitTransport::new(repo_path, queue.clone());
    let err = run(&transport, &queue, CommandKind::Stage, &["a.txt", "../escape.txt"])
        .unwrap_err();

    assert!(err.to_string().contains("../escape.txt"));
    // a.txt was valid but the index was never written
    assert_eq!(status_of(repo_path, "a.txt"), git2::Status::WT_MODIFIED);
}

#[test]
fn test_unstage_rejects_invalid_paths() {
    let (temp_dir, _repo) = setup_test_repo();
    let queue = TaskQueue::new();
    let transport = GitTransport::new(temp_dir.path(), queue.clone());

    let err = run(&transport, &queue, CommandKind::Unstage, &["/etc/passwd"]).unwrap_err();
    assert!(format!("{err:#}").contains("outside the working tree"));
}

#[test]
fn test_validate_path() {
    assert!(validate_path("a.txt").is_ok());
    assert!(validate_path("dir/./b.txt").is_ok());
    assert!(validate_path("").is_err());
    assert!(validate_path("../a.txt").is_err());
    assert!(validate_path("dir/../../a.txt").is_err());
    assert!(validate_path("/abs.txt").is_err());
}

#[test]
fn test_command_kind_display() {
    assert_eq!(CommandKind::Stage.to_string(), "stage");
    assert_eq!(CommandKind::Unstage.to_string(), "unstage");
}

/// scan the working tree the way the change list does
fn scan(repo_path: &Path) -> Vec<crate::status::StatusEntry> {
    crate::poller::GitStatusPoller::open(repo_path, crate::poller::PollSettings::default())
        .unwrap()
        .scan()
        .unwrap()
}

#[test]
fn test_rename_stages_and_unstages_both_paths() {
    let (temp_dir, repo) = setup_test_repo();
    let repo_path = temp_dir.path();
    fs::write(repo_path.join("old.txt"), "file content").unwrap();
    commit_all(&repo, "initial commit");
    fs::rename(repo_path.join("old.txt"), repo_path.join("new.txt")).unwrap();

    let entries = scan(repo_path);
    assert_eq!(entries.len(), 1, "working tree rename listed once");
    assert_eq!(entries[0].code(), " R");
    assert_eq!(entries[0].old_path.as_deref(), Some("old.txt"));

    let queue = TaskQueue::new();
    let transport = GitTransport::new(repo_path, queue.clone());

    // staging moves the deletion of the old path along with the new file
    let paths = crate::view::CommandRequest::for_entries(entries, false).paths();
    assert_eq!(paths, vec!["new.txt", "old.txt"]);
    let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
    run(&transport, &queue, CommandKind::Stage, &paths).unwrap();

    assert_eq!(status_of(repo_path, "old.txt"), git2::Status::INDEX_DELETED);
    let entries = scan(repo_path);
    assert_eq!(entries.len(), 1, "staged rename listed once");
    assert_eq!(entries[0].code(), "R ");
    assert_eq!(entries[0].path, "new.txt");
    assert_eq!(entries[0].old_path.as_deref(), Some("old.txt"));

    // unstaging restores the old path in the index as well
    let paths = crate::view::CommandRequest::for_entries(entries, true).paths();
    let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
    run(&transport, &queue, CommandKind::Unstage, &paths).unwrap();

    assert_eq!(status_of(repo_path, "old.txt"), git2::Status::WT_DELETED);
    assert_eq!(status_of(repo_path, "new.txt"), git2::Status::WT_NEW);
    let entries = scan(repo_path);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].code(), " R");
}
