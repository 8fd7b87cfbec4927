//! In-process concurrent primitives.
//!
//! - [`atomic`]: scalar cells, a non-blocking acquire gate, and a CAS-swappable
//!   node slot
//! - [`queue`]: unbounded lock-free MPMC FIFO queue (Michael–Scott)
//! - [`map`]: 256-way sharded concurrent hash map
//! - [`ring`]: consistent hash ring with nearest-neighbour routing
//! - [`hash`]: the [`HashCode`] capability that map sharding and ring
//!   placement dispatch on
//! - [`chain`]: ordered handler chain
//!
//! Everything is in-memory and scoped to one process.

// Allow the crate to reference itself as ::concord for derive macro usage
extern crate self as concord;

pub mod atomic;
pub mod chain;
pub mod hash;
pub mod map;
pub mod queue;
pub mod ring;
mod trace;

#[doc(inline)]
pub use hash::HashCode;
pub use map::ShardedMap;
pub use queue::{Queue, Timeout};
pub use ring::{HashRing, RingError};
pub use trace::init_tracing;
