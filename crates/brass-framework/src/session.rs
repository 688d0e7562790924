//! Privileges granted by configuration and by logging in.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tracing::info;

use brass_core::{Event, Privileges};

/// Flags granted to a logged-in identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    /// Account the identity logged in as.
    pub account: String,
    /// Owner flag.
    pub owner: bool,
    /// Admin flag.
    pub admin: bool,
}

/// In-memory privilege table.
///
/// Configured owner identities are always owners. Everyone else gains flags
/// only by logging in, and keeps them until logout or process exit.
#[derive(Default)]
pub struct SessionStore {
    owners: HashSet<String>,
    sessions: RwLock<HashMap<String, Grant>>,
}

impl SessionStore {
    /// Creates a store with the configured owner identities.
    pub fn new<I, S>(owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            owners: owners.into_iter().map(Into::into).collect(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Grants `grant` to `identity`, replacing any previous session.
    pub fn login(&self, identity: &str, grant: Grant) {
        info!(identity, account = %grant.account, owner = grant.owner, admin = grant.admin, "Logged in");
        self.sessions.write().insert(identity.to_string(), grant);
    }

    /// Drops the session of `identity`. Returns false if there was none.
    pub fn logout(&self, identity: &str) -> bool {
        self.sessions.write().remove(identity).is_some()
    }

    /// Current grant of `identity`.
    pub fn grant(&self, identity: &str) -> Option<Grant> {
        self.sessions.read().get(identity).cloned()
    }
}

impl Privileges for SessionStore {
    fn is_owner(&self, event: &Event) -> bool {
        if event.identity.is_empty() {
            return false;
        }
        self.owners.contains(&event.identity)
            || self.sessions.read().get(&event.identity).is_some_and(|g| g.owner)
    }

    fn is_admin(&self, event: &Event) -> bool {
        !event.identity.is_empty()
            && self.sessions.read().get(&event.identity).is_some_and(|g| g.admin)
    }
}
