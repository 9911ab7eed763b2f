//! Progress indicators and prompts for the pkgconverge CLI.

use anyhow::Result;
use colored::Colorize;
use declarative::{ConfirmCallback, ProgressCallback, StateResult};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::ui;

/// Spinner shown around a long package manager call.
///
/// Hidden when `quiet` is set or output is JSON.
pub fn spinner(msg: &str, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Reports executor progress: a spinner per state, then its result.
pub struct StateProgress {
    hidden: bool,
    current: Option<ProgressBar>,
}

impl StateProgress {
    pub fn new(hidden: bool) -> Self {
        Self {
            hidden,
            current: None,
        }
    }
}

impl ProgressCallback for StateProgress {
    fn on_batch_start(&mut self, count: usize, user_scoped: bool) {
        if self.hidden {
            return;
        }
        let context = if user_scoped { "user-scoped" } else { "privileged" };
        println!();
        println!("  {} Applying {count} {context} state(s)...", "→".cyan());
    }

    fn on_state_start(&mut self, name: &str, description: &str) {
        self.current = Some(spinner(&format!("{name} ({description})"), self.hidden));
    }

    fn on_state_complete(&mut self, _name: &str, result: &StateResult) {
        if let Some(pb) = self.current.take() {
            pb.finish_and_clear();
        }
        if !self.hidden {
            ui::state_result(result);
        }
    }

    fn on_batch_complete(&mut self) {}
}

/// Asks on the terminal unless `yes` was given.
pub struct PromptConfirm {
    pub yes: bool,
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.yes {
            return Ok(true);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?;
        Ok(confirmed)
    }
}
