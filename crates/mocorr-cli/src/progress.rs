use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use mocorr_core::pipeline::{PipelineStage, ProgressReporter};

/// Drives one terminal progress bar, restarted for every stage.
pub struct BarReporter {
    bar: ProgressBar,
    stage: Mutex<Option<PipelineStage>>,
}

impl BarReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg:28} [{bar:40}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self {
            bar,
            stage: Mutex::new(None),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        if let Ok(mut current) = self.stage.lock() {
            *current = Some(stage);
        }
        self.bar.reset();
        self.bar.set_length(total_items.unwrap_or(1) as u64);
        self.bar.set_message(stage.to_string());
    }

    fn advance(&self, items_done: usize) {
        self.bar.set_position(items_done as u64);
    }

    fn finish_stage(&self) {
        if let Some(len) = self.bar.length() {
            self.bar.set_position(len);
        }
        if let Ok(current) = self.stage.lock() {
            if let Some(stage) = *current {
                self.bar.println(format!("  done: {stage}"));
            }
        }
    }
}
