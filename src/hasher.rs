//! Graph hashing utilities.
//!
//! [`GraphHasher`] computes a stable SHA-256 digest of a
//! [`ResourceGraph`]. The graph is serialised to canonical JSON (RFC 8785) so
//! map ordering and number formatting cannot change the digest, and secret
//! values are never part of the serialised form. Two runs over the same
//! Stackfile therefore agree on the digest whatever state the engine holds.
//!
//! # Examples
//!
//! ```
//! use azstack::hasher::GraphHasher;
//! use azstack::ir::ResourceGraph;
//!
//! let graph = ResourceGraph::new("demo", "dev");
//! let digest = GraphHasher::digest(&graph).expect("digest");
//! assert_eq!(digest.len(), 64);
//! ```

use crate::ir::ResourceGraph;
use sha2::{Digest, Sha256};

const DOMAIN: &[u8] = b"azstack-graph-v1";

/// Computes stable digests for [`ResourceGraph`]s.
pub struct GraphHasher;

impl GraphHasher {
    /// Calculate the hex-encoded digest of `graph`.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph cannot be serialised.
    pub fn digest(graph: &ResourceGraph) -> Result<String, serde_json::Error> {
        let canonical = serde_json_canonicalizer::to_vec(graph)?;
        let mut hasher = Sha256::new();
        Self::update_with_len(&mut hasher, DOMAIN);
        Self::update_with_len(&mut hasher, &canonical);
        Ok(format!("{:x}", hasher.finalize()))
    }

    fn update_with_len(hasher: &mut Sha256, bytes: &[u8]) {
        let len = bytes.len();
        hasher.update(format!("{len}:").as_bytes());
        hasher.update(bytes);
    }
}
