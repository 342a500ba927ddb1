//! Login session storage with lazy expiry.
//!
//! - `SessionBackend`: RPITIT trait for raw session persistence
//! - `MemorySessionBackend`: in-process backend, also the failover target
//! - `SessionStore`: validation, expiry, and failover on top of a backend

pub mod backend;
pub mod memory;
pub mod store;

pub use backend::SessionBackend;
pub use memory::MemorySessionBackend;
pub use store::SessionStore;
