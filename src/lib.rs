//! Pathmark: Node Naming and Path History
//!
//! Generates unique, sanitized names for nodes of a content tree and remembers
//! the former paths of renamed or moved nodes so stale URLs can be redirected
//! to where the content lives now.

pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod language;
pub mod logging;
pub mod naming;
pub mod sanitize;
pub mod tooling;
pub mod tree;
pub mod types;
