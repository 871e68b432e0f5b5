//! Progress bar for the trip counting phase

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use intermediate_edges::ProgressCallback;

const TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} trips ({percent}%) {per_sec} ETA: {eta}";

/// Creates a progress bar counting trips
pub fn create_progress_bar(total_trips: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_trips);
    let style = ProgressStyle::default_bar()
        .template(TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}

/// Owns the bar shown while a matrix is being built
pub struct ProgressManager {
    pub pb: ProgressBar,
}

impl ProgressManager {
    pub fn new(message: &str) -> Self {
        eprintln!("{message}");
        // Length is set by the first callback, once the corpus is loaded
        Self {
            pb: create_progress_bar(0),
        }
    }

    /// Callback feeding the bar from worker threads.
    ///
    /// Workers report in any order, so each call advances the bar by one
    /// trip and the reported count is never written back.
    pub fn callback(&self) -> ProgressCallback {
        let pb = self.pb.clone();
        Arc::new(move |_done, total| {
            if pb.length() != Some(total) {
                pb.set_length(total);
            }
            pb.inc(1);
            if pb.position() >= total && !pb.is_finished() {
                pb.finish_with_message("done");
            }
        })
    }

    pub fn finish(&self) {
        if !self.pb.is_finished() {
            self.pb.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_progress_bar_template() {
        let pb = create_progress_bar(1000);
        assert_eq!(pb.length().unwrap(), 1000);

        pb.set_position(100);
        pb.finish();
    }

    #[test]
    fn test_callback_tracks_total() {
        let manager = ProgressManager::new("Counting trips");
        let callback = manager.callback();

        callback(1, 10);
        callback(3, 10);
        callback(2, 10);
        assert_eq!(manager.pb.length().unwrap(), 10);
        assert_eq!(manager.pb.position(), 3);
        assert!(!manager.pb.is_finished());
    }

    #[test]
    fn test_late_report_does_not_rewind() {
        let manager = ProgressManager::new("Counting trips");
        let callback = manager.callback();

        // The worker that finished trip 4 of 4 reports before trip 3's
        callback(1, 4);
        callback(2, 4);
        callback(4, 4);
        callback(3, 4);
        assert_eq!(manager.pb.position(), 4);
        assert!(manager.pb.is_finished());
    }
}
