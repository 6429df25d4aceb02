//! Account domain types.

use serde::{Deserialize, Serialize};

/// What side of the rental marketplace an account belongs to.
///
/// Wire format: `u8` (0 = Seeker, 1 = Landlord, 2 = Both, 3 = Admin).
/// Capability checks go through `is_tenant` / `is_landlord` / `is_admin`;
/// never match on the raw wire value outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Seeker = 0,
    Landlord = 1,
    Both = 2,
    Admin = 3,
}

impl AccountKind {
    /// Convert from `u8` wire value. Returns `None` for unknown values.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Seeker),
            1 => Some(Self::Landlord),
            2 => Some(Self::Both),
            3 => Some(Self::Admin),
            _ => None,
        }
    }

    /// Convert to `u8` wire value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Can this account rent a property (browse listings, apply, message)?
    pub fn is_tenant(self) -> bool {
        matches!(self, Self::Seeker | Self::Both)
    }

    /// Can this account list properties?
    pub fn is_landlord(self) -> bool {
        matches!(self, Self::Landlord | Self::Both)
    }

    /// Platform staff with access to admin surfaces.
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Second-factor configuration for an account.
///
/// Wire format: `u8` (0 = None, 1 = EmailOtp, 2 = Totp). MFA is only
/// enforced at login when the method is not `None` AND the account has a
/// verified email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MfaMethod {
    None = 0,
    EmailOtp = 1,
    Totp = 2,
}

impl MfaMethod {
    /// Convert from `u8` wire value. Returns `None` for unknown values.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::None),
            1 => Some(Self::EmailOtp),
            2 => Some(Self::Totp),
            _ => None,
        }
    }

    /// Convert to `u8` wire value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}
