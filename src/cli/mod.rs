//! Command-line only helpers, kept out of the library

pub mod progress;

pub use progress::ProgressManager;
