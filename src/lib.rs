//! Lectern - a reader and chapter server for pre-rendered HTML textbooks
//!
//! The library exposes the navigation core (catalog, session, loader) and
//! the server so both the binary and integration tests can drive them.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod history;
pub mod loader;
pub mod logging;
pub mod navigation;
pub mod serve;
pub mod session;
pub mod theme;
pub mod toc;
pub mod tui;
