//! A single buffer pool manager implementation: clock (second-chance)
//! replacement over a fixed pool of frames, backed by `common::disk_manager`.
//!
//! The index engine this crate ultimately serves runs one operation to
//! completion before the next begins (see the concurrency model in the
//! storage engine's design notes), so there is no need for the actor- or
//! lock-striped buffer pools a concurrent engine would want. A single
//! `Mutex` around the frame table is enough to satisfy the `Send + Sync`
//! bound on `BufferPoolManager` while keeping the implementation a plain,
//! synchronous call.

pub mod clock;

pub use clock::ClockBufferPoolManager;
