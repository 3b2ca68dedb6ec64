//! Hand-rolled `git2` plumbing for the three git-facing commands.
//!
//! `conduit-git` only covers worktree lifecycle (create/delete); diffing,
//! log listing and rebasing a session's branch onto its base are CLI-only
//! concerns, so they talk to `git2` directly against the session's
//! worktree path.

use std::error::Error;
use std::path::Path;

use clap::ArgMatches;
use git2::{DiffFormat, DiffOptions, ErrorCode, Repository};

use crate::color;
use crate::commands::helpers::{build_harness, resolve_session};

/// Resolves the base commit to diff/rebase against, trying
/// `origin/<base>`, then `refs/heads/<base>`, then `<base>` itself.
fn resolve_base<'repo>(
    repo: &'repo Repository,
    base_branch: &str,
) -> Result<git2::Commit<'repo>, Box<dyn Error>> {
    let candidates = [
        format!("refs/remotes/origin/{base_branch}"),
        format!("refs/heads/{base_branch}"),
        base_branch.to_string(),
    ];
    for candidate in &candidates {
        if let Ok(obj) = repo.revparse_single(candidate) {
            if let Ok(commit) = obj.peel_to_commit() {
                return Ok(commit);
            }
        }
    }
    Err(format!("could not resolve base branch '{}'", base_branch).into())
}

pub fn diff(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let id = matches.get_one::<String>("id").expect("required");
    let harness = build_harness()?;
    let session = resolve_session(&harness.store, id)?;
    let worktree = session
        .worktree
        .as_ref()
        .ok_or_else(|| format!("session '{}' has no worktree", session.name))?;

    let repo = Repository::open(&worktree.worktree_path)?;
    let head_tree = repo.head()?.peel_to_tree()?;

    let mut opts = DiffOptions::new();
    let diff = if matches.get_flag("staged") {
        repo.diff_tree_to_index(Some(&head_tree), None, Some(&mut opts))?
    } else {
        repo.diff_tree_to_workdir_with_index(Some(&head_tree), Some(&mut opts))?
    };

    if matches.get_flag("stat") {
        let stats = diff.stats()?;
        println!(
            "{} file(s) changed, {} insertion(s)(+), {} deletion(s)(-)",
            stats.files_changed(),
            stats.insertions(),
            stats.deletions()
        );
        return Ok(());
    }

    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        let prefix = match line.origin() {
            '+' | '-' | ' ' => line.origin().to_string(),
            _ => String::new(),
        };
        print!("{}{}", prefix, String::from_utf8_lossy(line.content()));
        true
    })?;
    Ok(())
}

pub fn commits(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let id = matches.get_one::<String>("id").expect("required");
    let count = *matches.get_one::<usize>("count").expect("has default");

    let harness = build_harness()?;
    let session = resolve_session(&harness.store, id)?;
    let worktree = session
        .worktree
        .as_ref()
        .ok_or_else(|| format!("session '{}' has no worktree", session.name))?;

    let repo = Repository::open(&worktree.worktree_path)?;
    let base = resolve_base(&repo, &worktree.base_branch)?;

    let mut walk = repo.revwalk()?;
    walk.push_head()?;
    walk.hide(base.id())?;

    for (i, oid) in walk.enumerate() {
        if i >= count {
            break;
        }
        let oid = oid?;
        let commit = repo.find_commit(oid)?;
        let summary = commit.summary().unwrap_or("<no summary>");
        println!("{}  {}", color::muted(&oid.to_string()[..8]), summary);
    }
    Ok(())
}

pub fn sync(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let id = matches.get_one::<String>("id").expect("required");
    let harness = build_harness()?;
    let session = resolve_session(&harness.store, id)?;
    let worktree = session
        .worktree
        .as_ref()
        .ok_or_else(|| format!("session '{}' has no worktree", session.name))?;

    let base_branch = matches
        .get_one::<String>("base")
        .cloned()
        .unwrap_or_else(|| worktree.base_branch.clone());

    let repo = Repository::open(&worktree.worktree_path)?;
    println!("{}", color::muted("Fetching origin..."));
    fetch_origin(&repo)?;

    let base = resolve_base(&repo, &base_branch)?;
    let base_annotated = repo.find_annotated_commit(base.id())?;

    let head_ref = repo.head()?;
    let branch_name = head_ref
        .shorthand()
        .ok_or("HEAD is detached, cannot rebase")?
        .to_string();
    let head_annotated = repo.reference_to_annotated_commit(&head_ref)?;

    let mut rebase = repo.rebase(Some(&head_annotated), Some(&base_annotated), None, None)?;
    while let Some(op) = rebase.next() {
        let op = op?;
        let sig = repo.signature()?;
        match rebase.commit(None, &sig, None) {
            Ok(_) => {}
            Err(e) if e.code() == git2::ErrorCode::Unmerged => {
                rebase.abort()?;
                return Err(format!(
                    "rebase stopped on conflicting commit {}: resolve manually with `git rebase --continue` in {}",
                    op.id(),
                    worktree.worktree_path
                )
                .into());
            }
            Err(e) => {
                rebase.abort()?;
                return Err(e.into());
            }
        }
    }
    rebase.finish(None)?;

    println!(
        "{}",
        color::aurora(&format!("Rebased '{}' onto '{}'.", branch_name, base_branch))
    );
    Ok(())
}

fn fetch_origin(repo: &Repository) -> Result<(), Box<dyn Error>> {
    let Ok(mut remote) = repo.find_remote("origin") else {
        return Ok(());
    };
    remote.fetch(&[] as &[&str], None, None)?;
    Ok(())
}

fn session_repo(id: &str) -> Result<(Repository, String), Box<dyn Error>> {
    let harness = build_harness()?;
    let session = resolve_session(&harness.store, id)?;
    let worktree = session
        .worktree
        .as_ref()
        .ok_or_else(|| format!("session '{}' has no worktree", session.name))?;
    let repo = Repository::open(&worktree.worktree_path)?;
    Ok((repo, session.name.clone()))
}

/// `git add <path>`: moves a working-tree change into the index.
pub fn stage(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let id = matches.get_one::<String>("id").expect("required");
    let path = matches.get_one::<String>("path").expect("required");
    let (repo, name) = session_repo(id)?;

    let mut index = repo.index()?;
    index.add_path(Path::new(path))?;
    index.write()?;

    println!("{}", color::aurora(&format!("Staged '{}' in '{}'.", path, name)));
    Ok(())
}

/// `git reset HEAD -- <path>`: resets the index entry for `path` back to
/// its HEAD state, undoing a prior [`stage`] without touching the
/// working tree.
pub fn unstage(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let id = matches.get_one::<String>("id").expect("required");
    let path = matches.get_one::<String>("path").expect("required");
    let (repo, name) = session_repo(id)?;

    let head = repo.head()?.peel_to_commit()?;
    repo.reset_default(Some(head.as_object()), [path.as_str()])?;

    println!("{}", color::aurora(&format!("Unstaged '{}' in '{}'.", path, name)));
    Ok(())
}

/// `git checkout -- <path>`: overwrites the working-tree copy of `path`
/// with the index's version, discarding unstaged edits.
pub fn discard(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let id = matches.get_one::<String>("id").expect("required");
    let path = matches.get_one::<String>("path").expect("required");
    let (repo, name) = session_repo(id)?;

    let mut checkout = git2::build::CheckoutBuilder::new();
    checkout.force().path(path.as_str());
    match repo.checkout_index(None, Some(&mut checkout)) {
        Ok(()) => {}
        Err(e) if e.code() == ErrorCode::NotFound => {
            return Err(format!("'{}' has no staged or committed version to discard to", path).into());
        }
        Err(e) => return Err(e.into()),
    }

    println!("{}", color::aurora(&format!("Discarded changes to '{}' in '{}'.", path, name)));
    Ok(())
}
