//! Pulse-driven task-tree reconciliation engine.
//!
//! Behaviour is a chain of active tasks, root to leaf, re-derived top-down on
//! every pulse. Each level states the child it wants; the runtime keeps an
//! equal child running and replaces an unequal one, so only the deepest task
//! touches the world. The crate is split the same way it is tested:
//!
//! - **[`core`]**: the task contract, the runtime, phase machines and the
//!   item/catalogue model. No I/O.
//! - **[`env`]**: the world-query and motor boundary the tasks act through.
//! - **[`goal`]** and **[`tasks`]**: the resource goal resolver and the leaf
//!   tasks it delegates to.
//! - **[`supervisor`]**: priority chains that decide which root runs.
//! - **[`sim`]**: a deterministic grid world implementing the boundary.
//! - **[`io`]**: config, catalogue and scenario loading, pulse traces.
//!
//! [`run`] ties these together for the `spine run` command.

pub mod core;
pub mod env;
pub mod exit_codes;
pub mod goal;
pub mod io;
pub mod logging;
pub mod run;
pub mod sim;
pub mod supervisor;
pub mod tasks;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
