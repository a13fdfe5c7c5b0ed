//! Check worker tasks and their pool.

pub mod check;
pub mod pool;

pub use pool::CheckWorkerPool;
