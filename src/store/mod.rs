//! Cache backends. Sessions are ephemeral, so only an in-memory one exists.

pub mod memory;

pub use memory::MemoryCache;
