use crate::ui::{theme, Icons};
use indicatif::{HumanDuration, ProgressBar};
use owo_colors::OwoColorize;
use std::time::{Duration, Instant};

/// Spinner shown while a document is converted and loaded
pub struct Spinner {
    pb: ProgressBar,
    started: Instant,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = if console::Term::stderr().is_term() {
            let pb = ProgressBar::new_spinner();
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(message.to_string());
        Self {
            pb,
            started: Instant::now(),
        }
    }

    /// Clear the spinner and print how long the work took
    pub fn finish(&self, summary: &str) {
        self.pb.finish_and_clear();
        eprintln!(
            "{} {} {}",
            Icons::CLOCK.style(theme().dim.clone()),
            summary.style(theme().success.clone()),
            format!("in {}", HumanDuration(self.started.elapsed())).style(theme().dim.clone())
        );
    }

    pub fn abandon(&self) {
        self.pb.finish_and_clear();
    }
}
