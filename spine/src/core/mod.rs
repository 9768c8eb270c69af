//! Deterministic, pure logic behind the reconciliation engine.
//!
//! Core modules must be free of I/O side effects. Everything that touches the
//! world goes through the `TaskContext` handed to each task, so the runtime and
//! the value types here can be tested against in-memory doubles.

pub mod catalogue;
pub mod invariants;
pub mod machine;
pub mod runtime;
pub mod task;
pub mod timer;
pub mod types;
