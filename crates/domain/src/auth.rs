//! The single authorization seam: every mutating service method takes an
//! [`Actor`] and decides from it, so permission rules live next to the
//! operations they guard instead of being scattered per endpoint.

use common::{Role, UserId, VendorId};

/// The authenticated principal behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
    /// Set when the user operates a vendor account.
    pub vendor_id: Option<VendorId>,
}

impl Actor {
    pub fn customer(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Customer,
            vendor_id: None,
        }
    }

    pub fn vendor(user_id: UserId, vendor_id: VendorId) -> Self {
        Self {
            user_id,
            role: Role::Vendor,
            vendor_id: Some(vendor_id),
        }
    }

    pub fn staff(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Staff,
            vendor_id: None,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
            vendor_id: None,
        }
    }

    /// Back-office roles bypass ownership checks.
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}
