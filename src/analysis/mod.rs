//! Rule-based lead qualification engine.
//!
//! A transcript (plus optional account metadata) flows through:
//! 1. `signals`: independent pattern detectors (pain, objections, urgency, ...)
//! 2. `stage`: priority-ordered stage resolution and consistency corrections
//! 3. `scoring`: additive 0–100 lead score
//! 4. `planner`: next-best-actions and follow-up tasks
//! 5. `summary`: bounded plain-text digest
//!
//! **The engine is pure.** No I/O, no per-call state; every pattern lives in the
//! immutable `PatternRegistry` compiled at startup.

pub mod engine;
pub mod patterns;
pub mod planner;
pub mod scoring;
pub mod signals;
pub mod stage;
pub mod summary;
pub mod types;

pub use engine::LeadAnalyzer;
pub use patterns::PatternRegistry;
pub use types::*;
