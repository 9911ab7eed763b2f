use colored::Colorize;
use declarative::{RunSummary, StateResult};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
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
// State Results
// ============================================================================

/// Plain-text status symbol for a state result
pub fn status_symbol(result: &StateResult) -> &'static str {
    if !result.success {
        "✗"
    } else if result.is_pending() {
        "~"
    } else if result.has_changes() {
        "✓"
    } else {
        "○"
    }
}

/// One line per change, e.g. `+ htop` or `- vim`
pub fn change_lines(result: &StateResult) -> Vec<String> {
    result
        .changes
        .iter()
        .map(|(name, change)| {
            let sign = match (change.old.is_empty(), change.new.is_empty()) {
                (true, false) => '+',
                (false, true) => '-',
                _ => '~',
            };
            format!("{sign} {name}")
        })
        .collect()
}

/// Print a state result with its changes and comment
pub fn state_result(result: &StateResult) {
    let symbol = status_symbol(result);
    let symbol = match symbol {
        "✗" => symbol.red(),
        "~" => symbol.yellow(),
        "✓" => symbol.green(),
        _ => symbol.dimmed(),
    };
    println!("  {} {}", symbol, result.name.bold());

    for line in change_lines(result) {
        let line = if result.dry_run {
            line.yellow()
        } else {
            line.green()
        };
        println!("      {line}");
    }
    for line in result.comment.lines() {
        dim(&format!("    {line}"));
    }
}

/// Print final summary
pub fn summary(summary: &RunSummary, dry_run: bool) {
    println!();
    if !summary.is_success() {
        println!("  {} Converged with errors", "⚠".yellow().bold());
    } else if dry_run {
        println!("  {} Dry run - no changes made", "ℹ".blue());
    } else {
        println!("  {} Package sets converged", "✓".green().bold());
    }

    if summary.changed > 0 {
        println!("    • {} state(s) changed", summary.changed);
    }
    if summary.pending > 0 {
        println!("    • {} state(s) would change", summary.pending);
    }
    if summary.unchanged > 0 {
        println!("    • {} state(s) already converged", summary.unchanged);
    }
    if summary.skipped > 0 {
        println!("    • {} state(s) skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "state(s)".red());
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::Change;

    #[test]
    fn test_status_symbol() {
        let unchanged = StateResult::ok("base", false, "All 1 package(s) already installed");
        assert_eq!(status_symbol(&unchanged), "○");

        let changed = unchanged.clone().with_change("git", Change::installed());
        assert_eq!(status_symbol(&changed), "✓");

        let pending = StateResult {
            dry_run: true,
            ..changed.clone()
        };
        assert_eq!(status_symbol(&pending), "~");

        let failed = StateResult::failed("aur", false, "yay cannot run as root");
        assert_eq!(status_symbol(&failed), "✗");
    }

    #[test]
    fn test_change_lines() {
        let result = StateResult::ok("mixed", false, "")
            .with_change("htop", Change::installed())
            .with_change("vim", Change::removed())
            .with_change("upgraded", Change::upgraded());

        assert_eq!(change_lines(&result), vec!["+ htop", "+ upgraded", "- vim"]);
    }
}
