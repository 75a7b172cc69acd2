// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt and scaffold document templates used across the harness stages
//! (§4.10 `artifact_scaffold`, `parent_plan`, `subtask_fanout`,
//! `parent_integrate`, `test_verify`, `self_review`).

use crate::persona::PersonaSpec;
use crate::run::{RunState, TaskInput};

fn style_guide(persona: Option<&PersonaSpec>) -> String {
    match persona {
        Some(p) if !p.personality.is_empty() => format!("{} — {}", p.name, p.personality),
        Some(p) => p.name.clone(),
        None => "neutral, direct".to_owned(),
    }
}

/// `docs/harness/task-spec.md` (§4.10 `artifact_scaffold`).
pub fn task_spec_md(state: &RunState, persona: Option<&PersonaSpec>) -> String {
    let task = &state.task;
    let mut out = format!(
        "# Task Spec\n\n\
         - Run id: {}\n\
         - Title: {}\n\
         - Repo: {}\n\
         - Base branch: {}\n\
         - Persona style guide: {}\n\n\
         ## Objective\n\n{}\n\n",
        state.id,
        task.title,
        state.repo_root.as_deref().unwrap_or(&task.repo_path),
        state.base_branch.as_deref().unwrap_or("(unresolved)"),
        style_guide(persona),
        task.objective,
    );
    out.push_str("## Success criteria\n\n");
    if task.success_criteria.is_empty() {
        out.push_str("(none specified)\n\n");
    } else {
        for c in &task.success_criteria {
            out.push_str(&format!("- {c}\n"));
        }
        out.push('\n');
    }
    out.push_str("## Constraints\n\n");
    if task.constraints.is_empty() {
        out.push_str("(none specified)\n\n");
    } else {
        for c in &task.constraints {
            out.push_str(&format!("- {c}\n"));
        }
        out.push('\n');
    }
    out.push_str("## Verification commands\n\n");
    if task.verification_commands.is_empty() {
        out.push_str("(none specified)\n\n");
    } else {
        for c in &task.verification_commands {
            out.push_str(&format!("- `{c}`\n"));
        }
        out.push('\n');
    }
    out.push_str("## Browser scenarios\n\n");
    if task.browser_scenarios.is_empty() {
        out.push_str("(none specified)\n");
    } else {
        for s in &task.browser_scenarios {
            out.push_str(&format!("- {} — {}\n", s.name, s.url));
        }
    }
    out
}

/// `docs/harness/AGENTS.md` (§4.10 `artifact_scaffold`).
pub fn agents_md(state: &RunState) -> String {
    format!(
        "# Agent conventions for this worktree\n\n\
         This worktree belongs to harness run `{}`. Work directly in this\n\
         checkout; a parent worktree and per-subtask worktrees share the\n\
         same base branch but are otherwise isolated.\n\n\
         - Record notable decisions in `docs/harness/run-journal.md`.\n\
         - Keep changes scoped to the stated objective and constraints in\n\
           `docs/harness/task-spec.md`.\n\
         - Do not push or force-push; the harness finalizes and pushes the\n\
           parent branch once all stages complete.\n",
        state.id
    )
}

/// `docs/harness/run-journal.md` seed (§4.10 `artifact_scaffold`).
pub fn run_journal_seed(state: &RunState) -> String {
    format!("# Run journal — {}\n\n- run created for: {}\n", state.id, state.task.title)
}

pub fn review_checklist_md() -> &'static str {
    "# Review checklist\n\n\
     - [ ] Changes match the stated objective\n\
     - [ ] Success criteria are met\n\
     - [ ] Constraints are respected\n\
     - [ ] No unrelated files modified\n\
     - [ ] Verification commands pass\n"
}

pub fn verification_plan_md(state: &RunState) -> String {
    let mut out = String::from("# Verification plan\n\n");
    if state.task.verification_commands.is_empty() {
        out.push_str("No verification commands were provided for this run.\n");
    } else {
        for c in &state.task.verification_commands {
            out.push_str(&format!("- `{c}`\n"));
        }
    }
    out
}

/// `docs/harness/subtasks/subtask-<i>.md` (§4.10 `artifact_scaffold`).
pub fn subtask_md(state: &RunState, index: u8, prompt: &str) -> String {
    format!(
        "# Subtask {index} — {}\n\n\
         Run id: {}\n\n\
         ## Prompt\n\n{prompt}\n",
        state.task.title, state.id
    )
}

/// Per-subtask prompt: explicit override from task input when present,
/// else a generated template referencing the shared objective (§4.10
/// `subtask_fanout`).
pub fn subtask_prompt(task: &TaskInput, index: u8) -> String {
    let idx = (index - 1) as usize;
    if let Some(Some(explicit)) = task.subtask_prompts.get(idx) {
        if !explicit.trim().is_empty() {
            return explicit.clone();
        }
    }
    format!(
        "You are working subtask {index} of the objective below in this isolated worktree.\n\
         Make focused progress on one independent slice of the work; avoid stepping on\n\
         other subtasks' likely files when the objective names distinct areas.\n\n\
         Objective:\n{}\n\n\
         Success criteria:\n{}\n",
        task.objective,
        bullet_list(&task.success_criteria),
    )
}

/// Non-interactive "exec" prompt for `parent_plan` (§4.10).
pub fn parent_plan_prompt(task: &TaskInput) -> String {
    format!(
        "Produce a concrete implementation plan for the objective below.\n\
         Write it to docs/harness/parent-plan.md and append a one-line summary\n\
         to docs/harness/run-journal.md. Do not start implementing yet.\n\n\
         Objective:\n{}\n\n\
         Success criteria:\n{}\n\n\
         Constraints:\n{}\n",
        task.objective,
        bullet_list(&task.success_criteria),
        bullet_list(&task.constraints),
    )
}

/// `parent_integrate` prompt listing subtask worktree paths (§4.10).
pub fn integration_prompt(task: &TaskInput, subtask_paths: &[String]) -> String {
    let mut out = String::from(
        "Integrate the work produced in the following subtask worktrees into this\n\
         parent worktree. Resolve any overlaps and ensure the combined result still\n\
         satisfies the objective and success criteria below.\n\n",
    );
    out.push_str("Subtask worktrees:\n");
    for p in subtask_paths {
        out.push_str(&format!("- {p}\n"));
    }
    out.push_str(&format!("\nObjective:\n{}\n\nSuccess criteria:\n{}\n", task.objective, bullet_list(&task.success_criteria)));
    out
}

/// Repair prompt naming the failure reason, reused by `test_verify` and
/// `browser_validation`'s one-shot repair pass (§4.10).
pub fn repair_prompt(reason: &str) -> String {
    format!(
        "The following check failed after the prior changes:\n\n{reason}\n\n\
         Make the minimal changes needed to fix this, then stop. Do not touch\n\
         unrelated files.\n"
    )
}

pub fn self_review_prompt(task: &TaskInput) -> String {
    format!(
        "Review the changes made in this worktree against the objective and\n\
         success criteria below. Note anything that looks incomplete, risky, or\n\
         inconsistent with the stated constraints in docs/harness/review-checklist.md,\n\
         checking off items that are satisfied.\n\n\
         Objective:\n{}\n\n\
         Success criteria:\n{}\n",
        task.objective,
        bullet_list(&task.success_criteria),
    )
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "(none specified)".to_owned();
    }
    items.iter().map(|i| format!("- {i}")).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
#[path = "prompts_tests.rs"]
mod tests;
