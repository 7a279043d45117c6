use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

fn counted_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {msg}\n[{elapsed_precise}] [{bar:40.green/white}] {pos}/{len} packets ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg} [{elapsed_precise}] {pos} packets")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Packet progress for one operation; a no-op when disabled
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    pub fn new(enabled: bool, total: Option<u64>, message: impl Into<String>) -> Self {
        if !enabled {
            return Self::disabled();
        }

        let bar = match total {
            Some(total) => ProgressBar::new(total).with_style(counted_style()),
            None => ProgressBar::new_spinner().with_style(spinner_style()),
        };
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(250));

        Self { bar: Some(bar) }
    }

    pub fn disabled() -> Self {
        Self { bar: None }
    }

    #[inline]
    pub fn inc(&self, delta: u64) {
        if let Some(bar) = &self.bar {
            bar.inc(delta);
        }
    }

    pub fn finish(&self, message: impl Into<String>) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(message.into());
        }
    }
}
