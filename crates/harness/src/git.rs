// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shelled `git` plumbing for worktree preparation, status inspection,
//! and the finalize/commit/push stage (§4.10). All calls go through
//! `tokio::process::Command`; there is no `git2` dependency in the
//! teacher's stack, so this follows the same "shell out, parse text"
//! idiom the teacher uses for its own credential subprocesses.

use std::path::{Path, PathBuf};

use dashboard_core::error::{ErrorCode, ServiceError};
use tokio::process::Command;

struct GitOutput {
    status_ok: bool,
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

async fn run(cwd: &Path, args: &[&str]) -> anyhow::Result<GitOutput> {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .await
        .map_err(|e| anyhow::anyhow!("spawn git {args:?}: {e}"))?;
    Ok(GitOutput {
        status_ok: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

async fn run_ok(cwd: &Path, args: &[&str]) -> anyhow::Result<String> {
    let out = run(cwd, args).await?;
    if !out.status_ok {
        anyhow::bail!("git {args:?} failed ({:?}): {}", out.code, out.stderr.trim());
    }
    Ok(out.stdout)
}

/// `git status --porcelain`, raw lines (one per dirty entry).
pub async fn status_porcelain(cwd: &Path) -> anyhow::Result<Vec<String>> {
    let out = run_ok(cwd, &["status", "--porcelain"]).await?;
    Ok(out.lines().map(str::to_owned).filter(|l| !l.is_empty()).collect())
}

/// `git rev-parse --show-toplevel`, canonicalized.
pub async fn toplevel(cwd: &Path) -> anyhow::Result<PathBuf> {
    let out = run(cwd, &["rev-parse", "--show-toplevel"]).await?;
    if !out.status_ok {
        anyhow::bail!("not a git repository: {}", out.stderr.trim());
    }
    let path = PathBuf::from(out.stdout.trim());
    path.canonicalize().map_err(|e| anyhow::anyhow!("canonicalize toplevel: {e}"))
}

/// Current branch name, or `"main"` when `HEAD` is detached (§4.10 init).
pub async fn current_branch(cwd: &Path) -> anyhow::Result<String> {
    let out = run(cwd, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
    if !out.status_ok {
        return Ok("main".to_owned());
    }
    let branch = out.stdout.trim();
    if branch.is_empty() || branch == "HEAD" {
        Ok("main".to_owned())
    } else {
        Ok(branch.to_owned())
    }
}

/// `git worktree add -b <new_branch> <path> <base_branch>`.
pub async fn worktree_add(repo: &Path, path: &Path, new_branch: &str, base_branch: &str) -> anyhow::Result<()> {
    let path_str = path.to_string_lossy().into_owned();
    run_ok(repo, &["worktree", "add", "-b", new_branch, &path_str, base_branch])
        .await
        .map_err(|e| anyhow::anyhow!("git worktree add failed: {e}"))?;
    Ok(())
}

/// `git diff --name-only`, one path per line.
pub async fn diff_name_only(cwd: &Path) -> anyhow::Result<Vec<String>> {
    let out = run_ok(cwd, &["diff", "--name-only"]).await?;
    Ok(out.lines().map(str::to_owned).filter(|l| !l.is_empty()).collect())
}

pub async fn add_all(cwd: &Path) -> anyhow::Result<()> {
    run_ok(cwd, &["add", "-A"]).await?;
    Ok(())
}

pub async fn commit(cwd: &Path, message: &str) -> anyhow::Result<()> {
    run_ok(cwd, &["commit", "-m", message]).await?;
    Ok(())
}

pub async fn rev_parse_head(cwd: &Path) -> anyhow::Result<String> {
    Ok(run_ok(cwd, &["rev-parse", "HEAD"]).await?.trim().to_owned())
}

pub struct PushOutcome {
    pub ok: bool,
    pub code: Option<i32>,
    pub output_tail: String,
}

/// `git push -u origin <branch>`; never errors, the caller records
/// failure in the push result per §4.10.
pub async fn push(cwd: &Path, remote: &str, branch: &str) -> anyhow::Result<PushOutcome> {
    let out = run(cwd, &["push", "-u", remote, branch]).await?;
    let mut combined = out.stdout;
    combined.push_str(&out.stderr);
    let tail = tail_chars(&combined, 4000);
    Ok(PushOutcome { ok: out.status_ok, code: out.code, output_tail: tail })
}

fn tail_chars(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        text.to_owned()
    } else {
        text.chars().skip(count - max).collect()
    }
}

/// Require a git repository whose canonical toplevel lies inside
/// `shared_repos_root` (§4.10 init, §5 path containment policy).
pub async fn resolve_contained_repo(shared_repos_root: &Path, repo_path: &str) -> anyhow::Result<PathBuf> {
    let candidate = dashboard_core::pathguard::contain(shared_repos_root, Path::new(repo_path))
        .map_err(|_| ServiceError::new(ErrorCode::PathEscape, format!("{repo_path} escapes the shared repos root")))?;
    let top = toplevel(&candidate).await.map_err(|e| ServiceError::new(ErrorCode::InvalidInput, e.to_string()))?;
    dashboard_core::pathguard::contain(shared_repos_root, &top)
        .map_err(|_| ServiceError::new(ErrorCode::PathEscape, "repository toplevel escapes the shared repos root").into())
}

/// `harness/<YYYY-MM-DD>/<slug(title)[:40]>-<runId[-6:]>` (§4.10
/// worktree_prepare).
pub fn final_branch_name(title: &str, run_id: &str, today: &str) -> String {
    let slug = slugify(title, 40);
    let tail = run_id_tail(run_id, 6);
    format!("harness/{today}/{slug}-{tail}")
}

fn run_id_tail(run_id: &str, n: usize) -> String {
    let count = run_id.chars().count();
    if count <= n {
        run_id.to_owned()
    } else {
        run_id.chars().skip(count - n).collect()
    }
}

/// Lowercase, non-alphanumeric runs collapsed to a single `-`, trimmed of
/// leading/trailing `-`, truncated to `max` chars.
pub fn slugify(input: &str, max: usize) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_dash = false;
    for c in input.chars().flat_map(|c| c.to_lowercase()) {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_dash = false;
        } else if !last_was_dash && !out.is_empty() {
            out.push('-');
            last_was_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out.truncate(max);
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        "run".to_owned()
    } else {
        out
    }
}

pub fn subtask_branch_name(final_branch: &str, i: u8) -> String {
    format!("{final_branch}-sub{i}")
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
