//! Shared helpers for gitdigger integration tests.
//!
//! - `build_pdf` creates real PDFs with a text layer
//! - `TestHarness` runs the worker pool against a fake GitHub and a scripted model

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
