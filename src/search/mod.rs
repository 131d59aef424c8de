//! The key-usage search engine.
//!
//! Three layers, bottom-up:
//!
//! - [`backend`]: runs ripgrep/grep subprocesses and parses `file:line`
//!   matches, with a lenient failure policy.
//! - [`resolver`]: classifies one key as direct / pattern / unused using the
//!   idiom registry and hierarchical fallback.
//! - [`scheduler`]: fans the resolver out over a bounded worker pool while
//!   keeping results in input order.

pub mod backend;
pub mod resolver;
pub mod scheduler;

pub use backend::{SearchBackend, SearchTool};
pub use resolver::Resolver;
pub use scheduler::analyze_keys;
