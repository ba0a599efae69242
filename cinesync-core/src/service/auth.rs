//! Owner authorization
//!
//! The owner capability is resolved exactly once, at handshake time,
//! and frozen onto the connection record. The gate consulted on every
//! mutation is a pure predicate over that record.

use subtle::ConstantTimeEq;

use crate::hub::ConnectionInfo;

/// Gate consulted by the hub before any playback mutation.
///
/// Read access (snapshots, broadcasts) is never gated.
#[must_use]
pub fn is_privileged(conn: &ConnectionInfo) -> bool {
    conn.is_owner
}

/// Handshake-time owner token check.
#[derive(Debug, Clone)]
pub struct OwnerAuth {
    /// `None` when no token is configured; then nobody is ever owner.
    token: Option<String>,
}

impl OwnerAuth {
    #[must_use]
    pub fn new(owner_token: &str) -> Self {
        Self {
            token: if owner_token.is_empty() {
                None
            } else {
                Some(owner_token.to_string())
            },
        }
    }

    /// Resolve the owner capability for a connecting client.
    pub fn resolve(&self, presented: Option<&str>) -> bool {
        match (&self.token, presented) {
            (Some(expected), Some(given)) => {
                expected.as_bytes().ct_eq(given.as_bytes()).into()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConnectionId;

    #[test]
    fn test_resolve_matching_token() {
        let auth = OwnerAuth::new("secret");
        assert!(auth.resolve(Some("secret")));
        assert!(!auth.resolve(Some("wrong")));
        assert!(!auth.resolve(Some("secret-longer")));
        assert!(!auth.resolve(None));
    }

    #[test]
    fn test_empty_config_never_grants() {
        let auth = OwnerAuth::new("");
        assert!(!auth.resolve(Some("")));
        assert!(!auth.resolve(Some("anything")));
        assert!(!auth.resolve(None));
    }

    #[test]
    fn test_is_privileged_is_pure_over_capability() {
        let owner = ConnectionInfo {
            id: ConnectionId::new(),
            is_owner: true,
        };
        let viewer = ConnectionInfo {
            id: ConnectionId::new(),
            is_owner: false,
        };
        assert!(is_privileged(&owner));
        assert!(!is_privileged(&viewer));
    }
}
