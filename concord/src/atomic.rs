//! Atomic building blocks shared by the rest of the crate.
//!
//! - [`Bool`], [`Int32`], [`Int64`], [`Uint32`], [`Uint64`]: wait-free scalar cells
//! - [`AcquireLock`]: one-shot, non-blocking ownership gate
//! - [`Node`] / [`NodeSlot`]: a pointer slot whose contents are replaced with a
//!   single CAS, so composite values can be swapped atomically
//!
//! Every operation here is lock-free and linearizable per cell. Nothing orders
//! operations on two different cells against each other.

mod acquire;
mod cell;
mod node;

pub use acquire::{AcquireGuard, AcquireLock};
pub use cell::{Bool, Int32, Int64, Uint32, Uint64};
pub use node::{Node, NodeRef, NodeSlot};

#[doc(inline)]
pub use crossbeam_epoch::{Guard, pin};
