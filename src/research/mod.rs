//! Research orchestration
//!
//! The stages a research run goes through, in order:
//!
//! - [`search`] - batched, timeout-bounded search fan-out
//! - [`searchers`] - web (daedra) and local file searchers
//! - [`synthesis`] - report writing with an extraction fallback chain
//! - [`references`] - `(Reference N)` renumbering
//! - [`refinement`] - evaluate/improve quality gate
//! - [`pipeline`] - the driver tying the stages together
//!
//! [`progress`] and [`artifacts`] are shared by all stages.

pub mod artifacts;
pub mod pipeline;
pub mod progress;
pub mod references;
pub mod refinement;
pub mod search;
pub mod searchers;
pub mod synthesis;
