use indicatif::{ProgressBar, ProgressStyle};

pub struct ProgressTracker {
    bar: ProgressBar,
}

impl ProgressTracker {
    /// Tracker sized for a pass over the HDUs of one file
    pub fn for_extensions(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        bar.set_style(ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap()
            .progress_chars("#>-"));
        bar.set_message("Processing HDUs".to_string());

        ProgressTracker {
            bar,
        }
    }

    /// Advances by one HDU and shows what is being worked on
    pub fn step(&self, label: &str) {
        self.bar.set_message(label.to_string());
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("Completed");
    }
}
