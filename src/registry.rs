//! Operation Metadata Registry
//!
//! Maps each operation name of a wrapped object to its caching policy.
//! Built once at construction time and immutable afterwards, so the dispatch
//! layer can consult it without any locking.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{CacheError, Result};

// == Operation Policy ==
/// How the dispatch layer treats one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpPolicy {
    /// Result is memoized per state and argument list, for this long
    Cacheable { ttl: Duration },
    /// Changes observable state; triggers a state transition after running
    Mutator,
    /// Forwarded unchanged, no cache or state interaction
    Passthrough,
}

// == Operation Registry ==
/// Immutable operation-name -> policy table.
///
/// Operations that were never registered resolve to [`OpPolicy::Passthrough`]:
/// a misclassified operation only costs a cache miss, not correctness, so the
/// registry fails open.
#[derive(Debug, Clone)]
pub struct OpRegistry {
    policies: HashMap<String, OpPolicy>,
}

impl OpRegistry {
    /// Starts building a registry.
    pub fn builder() -> OpRegistryBuilder {
        OpRegistryBuilder {
            policies: HashMap::new(),
        }
    }

    // == Policy Lookup ==
    /// Returns the policy for an operation, `Passthrough` if unknown.
    pub fn policy(&self, op: &str) -> OpPolicy {
        self.policies
            .get(op)
            .copied()
            .unwrap_or(OpPolicy::Passthrough)
    }

    /// Returns the number of registered operations.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Returns true if no operations were registered.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

// == Registry Builder ==
/// Builder for [`OpRegistry`]. Each operation may be registered exactly once.
#[derive(Debug)]
pub struct OpRegistryBuilder {
    policies: HashMap<String, OpPolicy>,
}

impl OpRegistryBuilder {
    /// Registers a cacheable operation with the given TTL.
    pub fn cacheable(self, op: impl Into<String>, ttl: Duration) -> Result<Self> {
        let op = op.into();
        if ttl.is_zero() {
            return Err(CacheError::ZeroTtl(op));
        }
        self.insert(op, OpPolicy::Cacheable { ttl })
    }

    /// Registers a mutator operation.
    pub fn mutator(self, op: impl Into<String>) -> Result<Self> {
        self.insert(op.into(), OpPolicy::Mutator)
    }

    /// Registers an explicit passthrough operation.
    ///
    /// Unregistered operations are passthrough anyway; registering one makes
    /// the classification visible and guards against later re-registration
    /// under a different policy.
    pub fn passthrough(self, op: impl Into<String>) -> Result<Self> {
        self.insert(op.into(), OpPolicy::Passthrough)
    }

    /// Finalizes the registry.
    pub fn build(self) -> OpRegistry {
        OpRegistry {
            policies: self.policies,
        }
    }

    fn insert(mut self, op: String, policy: OpPolicy) -> Result<Self> {
        if self.policies.contains_key(&op) {
            return Err(CacheError::DuplicateOperation(op));
        }
        self.policies.insert(op, policy);
        Ok(self)
    }
}
