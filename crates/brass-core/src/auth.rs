//! Privilege lookup.
//!
//! Authorization data lives outside the core (configuration owners, users
//! logged in through the store). The command router only needs to ask.

use crate::event::Event;

/// Answers privilege questions about the sender of an event.
pub trait Privileges: Send + Sync {
    /// Returns true if the sender is an owner.
    fn is_owner(&self, event: &Event) -> bool;

    /// Returns true if the sender is an admin.
    fn is_admin(&self, event: &Event) -> bool;

    /// Owners and admins bypass rate limits and admin-only gates.
    fn is_privileged(&self, event: &Event) -> bool {
        self.is_owner(event) || self.is_admin(event)
    }
}

/// Grants nothing to anyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrivileges;

impl Privileges for NoPrivileges {
    fn is_owner(&self, _event: &Event) -> bool {
        false
    }

    fn is_admin(&self, _event: &Event) -> bool {
        false
    }
}
