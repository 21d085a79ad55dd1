//! Snowflake-style primary keys for short links.
//!
//! A [`SnowflakeId`] packs a 41-bit millisecond timestamp, a 5-bit datacenter
//! id, a 5-bit worker id and a 12-bit sequence into one `u64` whose top bit is
//! always zero. IDs are minted by a [`LockSnowflakeGenerator`], constructed
//! once per process from a [`NodeIdentity`] and shared by reference.
//!
//! ```
//! use linkflake::{LockSnowflakeGenerator, NodeIdentity, SystemClock};
//!
//! let node = NodeIdentity::new(3, 7).unwrap();
//! let generator = LockSnowflakeGenerator::with_node(node, SystemClock::default());
//!
//! let id = generator.next_id().unwrap();
//! assert_eq!(id.datacenter_id(), 3);
//! assert_eq!(id.worker_id(), 7);
//! ```
mod error;
mod generator;
mod id;
mod node;
mod status;
mod time;

pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::node::*;
pub use crate::status::*;
pub use crate::time::*;
