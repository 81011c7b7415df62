// Terminal rendering for job results and problem pages
use algolab_client::listing::Page;
use algolab_client::poller::{JobPhase, JobSnapshot};
use algolab_common::types::{JobStatus, ProblemSummary};
use std::fmt::Write as _;
use tokio::sync::watch;

/// Print each status change until the job finishes or the tracker goes away
pub async fn follow(mut rx: watch::Receiver<JobSnapshot>) {
    let mut last: Option<JobStatus> = None;
    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        if let Some(status) = snapshot.status {
            if last.as_ref() != Some(&status) && !status.is_terminal() {
                println!("  ⏳ {}", status);
            }
            last = Some(status);
        }
        if snapshot.phase.is_finished() {
            break;
        }
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|l| format!("      {}", l))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn job_result(snapshot: &JobSnapshot) -> String {
    let mut out = String::new();

    match snapshot.phase {
        JobPhase::Errored => {
            let _ = writeln!(
                out,
                "❌ Request failed: {}",
                snapshot.error.as_deref().unwrap_or("unknown error")
            );
            return out;
        }
        JobPhase::Idle | JobPhase::Creating | JobPhase::Polling => {
            let _ = writeln!(out, "⚠️  Job did not finish");
            return out;
        }
        JobPhase::Done => {}
    }

    let status = snapshot
        .status
        .as_ref()
        .map(|s| s.as_str())
        .unwrap_or("Unknown");
    if snapshot.is_success() {
        let _ = writeln!(out, "✅ {}", status);
    } else {
        let _ = writeln!(out, "✗ {}", status);
    }

    if let Some(stdout) = snapshot.std_out.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "  stdout:\n{}", indent(stdout));
    }
    if let Some(stderr) = snapshot.std_err.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "  stderr:\n{}", indent(stderr));
    }

    for case in &snapshot.failed_testcases {
        let visibility = if case.is_public { "" } else { " (hidden)" };
        let _ = writeln!(out, "  Test {}{}", case.id, visibility);
        let _ = writeln!(out, "    input:\n{}", indent(&case.input));
        let _ = writeln!(out, "    expected:\n{}", indent(&case.expected));
        let _ = writeln!(out, "    got:\n{}", indent(&case.got));
        if let Some(stdout) = case.std_out.as_deref().filter(|s| !s.is_empty()) {
            let _ = writeln!(out, "    stdout:\n{}", indent(stdout));
        }
    }

    out
}

pub fn problem_page(page: &Page<ProblemSummary>) -> String {
    let mut out = String::new();

    if page.items.is_empty() {
        let _ = writeln!(out, "No problems match.");
        return out;
    }

    for (offset, problem) in page.items.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>4}. {:<40} {:<7} {}",
            page.first_item() + offset,
            problem.title,
            problem.difficulty.to_string(),
            problem.slug
        );
    }
    let _ = writeln!(
        out,
        "\nPage {}/{} ({} problems)",
        page.page, page.total_pages, page.total_items
    );
    if page.has_next() {
        let _ = writeln!(out, "Next: --page {}", page.page + 1);
    }

    out
}
