//! Leaf capabilities the resolver and chains delegate to.
//!
//! Each is a thin task over the motor/query boundary: construct it with a
//! target, and it eventually reports finished or failed.

pub mod craft;
pub mod eat;
pub mod gather;
pub mod mine;
pub mod navigate;

pub use craft::CraftTask;
pub use eat::EatTask;
pub use gather::GatherTask;
pub use mine::MineBlockTask;
pub use navigate::NavigateTask;
