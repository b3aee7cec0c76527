//! Identity resolution seam.
//!
//! Sensors are bound to athletes by an external store (the web layer's
//! database in a full deployment). The core consults the resolver exactly
//! once per sensor, on its first-seen transition, and treats the returned
//! binding as an opaque read-only value. Later rebinds are not reflected
//! until the sensor is seen as new again.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Athlete record bound to a sensor id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityBinding {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_hr: Option<u32>,
}

/// Errors from the external identity store.
#[derive(Debug)]
pub enum IdentityError {
    /// The lookup itself failed (store unreachable, malformed record, ...).
    Lookup(String),
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityError::Lookup(msg) => write!(f, "identity lookup failed: {msg}"),
        }
    }
}

impl std::error::Error for IdentityError {}

/// External collaborator that maps sensor ids to athlete bindings.
///
/// Implementations must be cheap, synchronous, side-effect-free reads; the
/// core never calls `lookup` while holding the registry lock, and a failed
/// lookup never aborts sample ingestion.
pub trait IdentityResolver: Send + Sync {
    fn lookup(&self, sensor_id: u32) -> Result<Option<IdentityBinding>, IdentityError>;
}

/// Resolver that never finds a binding.
#[derive(Debug, Default)]
pub struct NoIdentity;

impl IdentityResolver for NoIdentity {
    fn lookup(&self, _sensor_id: u32) -> Result<Option<IdentityBinding>, IdentityError> {
        Ok(None)
    }
}

/// In-memory resolver backed by a map, for tests and simulated pipelines.
#[derive(Debug, Default)]
pub struct MemoryResolver {
    bindings: Mutex<HashMap<u32, IdentityBinding>>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind (or rebind) a sensor id to an athlete.
    pub fn bind(&self, sensor_id: u32, binding: IdentityBinding) {
        let mut bindings = match self.bindings.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        bindings.insert(sensor_id, binding);
    }
}

impl IdentityResolver for MemoryResolver {
    fn lookup(&self, sensor_id: u32) -> Result<Option<IdentityBinding>, IdentityError> {
        let bindings = match self.bindings.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(bindings.get(&sensor_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_resolver_roundtrip() {
        let resolver = MemoryResolver::new();
        assert_eq!(resolver.lookup(5).unwrap(), None);

        resolver.bind(
            5,
            IdentityBinding {
                first_name: "Ada".to_string(),
                last_name: "Kova".to_string(),
                max_hr: Some(192),
            },
        );

        let binding = resolver.lookup(5).unwrap().unwrap();
        assert_eq!(binding.first_name, "Ada");
        assert_eq!(binding.max_hr, Some(192));
        assert_eq!(resolver.lookup(6).unwrap(), None);
    }

    #[test]
    fn test_binding_serialization_omits_missing_max_hr() {
        let binding = IdentityBinding {
            first_name: "Ada".to_string(),
            last_name: "Kova".to_string(),
            max_hr: None,
        };
        let json = serde_json::to_string(&binding).unwrap();
        assert_eq!(json, r#"{"first_name":"Ada","last_name":"Kova"}"#);
    }
}
