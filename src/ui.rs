use colored::{ColoredString, Colorize};
use runbook::{BatchResult, RemoteStatus, StackOutcome, StackState, StatusClass};
use std::time::Duration;

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Status Formatting
// ============================================================================

/// Remote status colored by how it classifies
pub fn remote_status(status: &RemoteStatus) -> ColoredString {
    let text = status.as_str();
    match status.class() {
        StatusClass::Complete => text.green(),
        StatusClass::InProgress => text.cyan(),
        StatusClass::RolledBack => text.yellow(),
        StatusClass::Failed => text.red(),
        StatusClass::Deleted => text.dimmed(),
    }
}

/// Local lifecycle state, colored
pub fn stack_state(state: StackState) -> ColoredString {
    let text = state.label();
    match state {
        StackState::Succeeded => text.green(),
        StackState::Failed | StackState::RolledBack => text.red(),
        StackState::TimedOut | StackState::Cancelled => text.yellow(),
        StackState::InProgress | StackState::Submitting => text.cyan(),
        StackState::Detached => text.blue(),
        StackState::Pending | StackState::Skipped | StackState::Absent => text.dimmed(),
    }
}

/// Outcome label, colored
pub fn outcome(outcome: &StackOutcome) -> ColoredString {
    let label = outcome.label();
    match outcome {
        StackOutcome::Succeeded => label.green(),
        StackOutcome::Failed { .. } => label.red().bold(),
        StackOutcome::Skipped { .. } => label.dimmed(),
        StackOutcome::TimedOut { .. } => label.yellow(),
    }
}

/// Format a duration as `42s`, `3m 05s` or `1h 02m`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

/// Truncate text for table cells, keeping the start
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = text.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

// ============================================================================
// Batch Summary
// ============================================================================

const DETAIL_WIDTH: usize = 72;

/// Print the per-stack outcome table and the counts line
pub fn print_summary(result: &BatchResult) {
    header(&format!("Summary: {}", result.command()));

    let name_width = result
        .entries()
        .iter()
        .map(|(ctx, _)| ctx.name().len())
        .max()
        .unwrap_or(5)
        .max(5);

    println!(
        "  {:<name_width$}  {:<12}  {:<10}  {:>7}  {}",
        "Stack".bold(),
        "State".bold(),
        "Outcome".bold(),
        "Time".bold(),
        "Detail".bold(),
    );

    for (ctx, result_outcome) in result.entries() {
        let elapsed = ctx
            .elapsed()
            .and_then(|d| d.to_std().ok())
            .map(format_duration)
            .unwrap_or_default();
        let detail = result_outcome
            .detail()
            .map(|d| truncate(&d, DETAIL_WIDTH))
            .unwrap_or_default();
        println!(
            "  {:<name_width$}  {:<12}  {:<10}  {:>7}  {}",
            ctx.name(),
            stack_state(ctx.state()),
            outcome(result_outcome),
            elapsed,
            detail.dimmed(),
        );
    }

    let summary = result.summary();
    println!();
    let counts = format!(
        "{} succeeded, {} failed, {} timed out, {} skipped",
        summary.succeeded, summary.failed, summary.timed_out, summary.skipped
    );
    if summary.is_success() {
        success(&counts);
    } else {
        error(&counts);
    }
}

// ============================================================================
// Tests
// ============================================================================
