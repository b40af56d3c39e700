//! Preview authorization gate.

use bitpreview_core::Bitstream;
use serde::{Deserialize, Serialize};

/// Answer of a read-permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadAccess {
    /// The caller may read the bitstream.
    Granted,
    /// The caller may not read the bitstream.
    Denied,
    /// Reading requires a license the caller has not agreed to yet.
    LicenseRequired,
}

impl ReadAccess {
    /// Whether reading is allowed right now.
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

impl From<bool> for ReadAccess {
    fn from(granted: bool) -> Self {
        if granted { Self::Granted } else { Self::Denied }
    }
}

/// Permission checks for the current caller.
///
/// Implementations should map backend failures to [`ReadAccess::Denied`];
/// a failed check means no preview, never an error page.
pub trait AccessPolicy {
    /// Check read permission on a bitstream.
    fn read_access(&self, bitstream: &Bitstream) -> ReadAccess;

    /// Whether the caller may perform administrative actions.
    fn is_admin(&self) -> bool {
        false
    }
}

/// Policy for local, single-user use: everything is readable and the
/// caller is an administrator.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAccess;

impl AccessPolicy for OpenAccess {
    fn read_access(&self, _bitstream: &Bitstream) -> ReadAccess {
        ReadAccess::Granted
    }

    fn is_admin(&self) -> bool {
        true
    }
}

/// Decides whether a bitstream may be previewed.
#[derive(Debug, Clone)]
pub struct PreviewGate<P> {
    enabled: bool,
    policy: P,
}

impl<P: AccessPolicy> PreviewGate<P> {
    /// Create a gate with the global feature switch and a permission policy.
    pub fn new(enabled: bool, policy: P) -> Self {
        Self { enabled, policy }
    }

    /// True only when previews are enabled and the caller can read the
    /// bitstream right now. A pending license agreement yields `false`.
    pub fn can_preview(&self, bitstream: &Bitstream) -> bool {
        if !self.enabled {
            return false;
        }
        match self.policy.read_access(bitstream) {
            ReadAccess::Granted => true,
            ReadAccess::LicenseRequired => {
                tracing::debug!(bitstream = %bitstream.id, "preview blocked by missing license agreement");
                false
            }
            ReadAccess::Denied => false,
        }
    }

    /// Live read-permission check, independent of the feature switch.
    pub fn has_read_access(&self, bitstream: &Bitstream) -> bool {
        self.policy.read_access(bitstream).is_granted()
    }

    /// Whether the caller may delete stored previews.
    pub fn is_admin(&self) -> bool {
        self.policy.is_admin()
    }

    /// Whether the feature switch is on.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get the underlying policy.
    pub fn policy(&self) -> &P {
        &self.policy
    }
}
