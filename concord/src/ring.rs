//! Consistent hash ring with nearest-neighbour routing.
//!
//! Servers are placed on a 32-bit circle at their [`HashCode`]. A key is
//! routed to whichever neighbouring server is numerically closest to the key's
//! hash, not strictly to its successor:
//!
//! - inside the array, the first server at or after the key is compared with
//!   its predecessor; the predecessor wins only if strictly closer
//! - past either end of the array, the last and first servers are compared by
//!   32-bit wrapping distance
//!
//! These rules are kept bit-for-bit so routing stays compatible with existing
//! deployments; don't "fix" them into textbook successor routing.
//!
//! The sorted array sits behind a `RwLock`. Every mutation builds a fresh
//! array and swaps it in under the write lock, so a concurrent [`HashRing::get`]
//! sees either the old ring or the new one, never a half-updated one.

use std::fmt;

use parking_lot::RwLock;
use thiserror::Error;

use crate::hash::HashCode;
use crate::trace::{debug, warn};

/// Errors returned by ring lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RingError {
    /// The ring has no servers to route to.
    #[error("no server")]
    NoServer,
}

#[derive(Clone)]
struct RingNode<S> {
    server: S,
    hash_value: u32,
}

impl<S: HashCode> RingNode<S> {
    fn new(server: S) -> Self {
        let hash_value = server.hash_code();
        Self { server, hash_value }
    }
}

fn sorted<S>(mut nodes: Vec<RingNode<S>>) -> Vec<RingNode<S>> {
    nodes.sort_by_key(|node| node.hash_value);
    nodes
}

/// First index whose hash is `>= value`, or `nodes.len()` if none.
fn search<S>(nodes: &[RingNode<S>], value: u32) -> usize {
    nodes.partition_point(|node| node.hash_value < value)
}

/// Picks the server for `value` on a non-empty, sorted ring.
fn route<S>(nodes: &[RingNode<S>], value: u32) -> &S {
    let length = nodes.len();
    let index = search(nodes, value);

    if index == length || index == 0 {
        let first = nodes[0].hash_value;
        let last = nodes[length - 1].hash_value;
        if value.wrapping_sub(last) < u32::MAX.wrapping_sub(value).wrapping_add(first) {
            return &nodes[length - 1].server;
        }
        return &nodes[0].server;
    }

    // nodes[index - 1] < value <= nodes[index], so neither subtraction wraps.
    if nodes[index].hash_value - value > value - nodes[index - 1].hash_value {
        return &nodes[index - 1].server;
    }
    &nodes[index].server
}

/// Consistent hash ring over servers of type `S`.
///
/// `get` hands out clones of `S`, so servers are usually cheap handles such as
/// `Arc<Backend>` or an address.
///
/// # Example
///
/// ```
/// use concord::ring::HashRing;
///
/// let ring = HashRing::new(vec![10u32, 100, 200]);
///
/// assert_eq!(ring.get(&60u32), Ok(100));
/// assert_eq!(ring.get(&50u32), Ok(10));
/// assert_eq!(ring.get(&4_294_967_290u32), Ok(10));
/// ```
pub struct HashRing<S> {
    nodes: RwLock<Vec<RingNode<S>>>,
}

impl<S: HashCode + Clone> HashRing<S> {
    #[must_use]
    pub fn new(servers: impl IntoIterator<Item = S>) -> Self {
        let ring = Self {
            nodes: RwLock::new(Vec::new()),
        };
        ring.store_servers(servers);
        ring
    }

    /// Replaces the whole membership.
    pub fn store_servers(&self, servers: impl IntoIterator<Item = S>) {
        let next = sorted(servers.into_iter().map(RingNode::new).collect());
        let mut nodes = self.nodes.write();
        *nodes = next;
        debug!(servers = nodes.len(), "ring membership replaced");
    }

    /// Adds one server and re-sorts the ring.
    pub fn add_server(&self, server: S) {
        let node = RingNode::new(server);

        let mut nodes = self.nodes.write();
        let mut next = Vec::with_capacity(nodes.len() + 1);
        next.extend(nodes.iter().cloned());
        next.push(node);
        *nodes = sorted(next);
        debug!(servers = nodes.len(), "ring server added");
    }

    /// Removes the server placed at `server`'s hash. No-op if none is there.
    ///
    /// Matching is by hash value: if two servers collide on the same hash,
    /// the first one in ring order is removed.
    pub fn remove_server(&self, server: &S) {
        let value = server.hash_code();

        let mut nodes = self.nodes.write();
        let index = search(&nodes, value);
        if index >= nodes.len() || nodes[index].hash_value != value {
            return;
        }

        *nodes = if nodes.len() == 1 {
            Vec::new()
        } else {
            let remaining = nodes
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != index)
                .map(|(_, node)| node.clone())
                .collect();
            sorted(remaining)
        };
        debug!(hash_value = value, servers = nodes.len(), "ring server removed");
    }

    /// Routes `key` to a server.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::NoServer`] if the ring is empty.
    pub fn get<K: HashCode + ?Sized>(&self, key: &K) -> Result<S, RingError> {
        let nodes = self.nodes.read();
        if nodes.is_empty() {
            warn!("ring lookup on empty ring");
            return Err(RingError::NoServer);
        }
        Ok(route(&nodes, key.hash_code()).clone())
    }
}

impl<S> HashRing<S> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    /// Visits servers in ring order under the read lock.
    ///
    /// `handler` receives the position and server and returns `true` to stop.
    /// It must not mutate the same ring.
    pub fn range<F>(&self, mut handler: F)
    where
        F: FnMut(usize, &S) -> bool,
    {
        let nodes = self.nodes.read();
        for (index, node) in nodes.iter().enumerate() {
            if handler(index, &node.server) {
                break;
            }
        }
    }
}

impl<S> Default for HashRing<S> {
    fn default() -> Self {
        Self {
            nodes: RwLock::new(Vec::new()),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for HashRing<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nodes = self.nodes.read();
        f.debug_map()
            .entries(nodes.iter().map(|node| (node.hash_value, &node.server)))
            .finish()
    }
}
