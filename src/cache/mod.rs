//! Cache Module
//!
//! Cache handles and the factory that registers them.

mod factory;
mod handle;


// Re-export public types
pub use factory::{CacheFactory, Instance};
pub use handle::{Cache, Keys};
