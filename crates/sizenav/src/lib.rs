//! Terminal directory browser that shows the size of every entry.
//!
//! Directory sizes are measured off the render thread and memoized in a
//! [`cache::SizeCache`] shared by every listing.

pub mod cache;
pub mod disk;
pub mod error;
pub mod format;
pub mod input;
pub mod lister;
pub mod loader;
pub mod logging;
pub mod nav;
pub mod remove;
pub mod settings;
pub mod sizer;
pub mod ui;
