//! Security audit event actions.

use serde::{Deserialize, Serialize};

/// Action tag on a security audit event.
///
/// Wire format is the SCREAMING_SNAKE string (stable, stored as-is in the
/// audit log and exposed to admin tooling). Adding a variant is
/// backwards-compatible; renaming one is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityAction {
    Register,
    Login,
    LoginMfa,
    FailedLogin,
    Logout,
    EmailVerified,
    MfaEnabled,
    MfaDisabled,
    DeviceAdded,
    DeviceRemoved,
    AccountLocked,
    AccountUnlocked,
    SuspiciousActivity,
    AccessDeniedAdmin,
    PasswordChanged,
    PasswordReset,
    BackupCodesRegenerated,
}

impl SecurityAction {
    /// Stable string form used for storage and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Register => "REGISTER",
            Self::Login => "LOGIN",
            Self::LoginMfa => "LOGIN_MFA",
            Self::FailedLogin => "FAILED_LOGIN",
            Self::Logout => "LOGOUT",
            Self::EmailVerified => "EMAIL_VERIFIED",
            Self::MfaEnabled => "MFA_ENABLED",
            Self::MfaDisabled => "MFA_DISABLED",
            Self::DeviceAdded => "DEVICE_ADDED",
            Self::DeviceRemoved => "DEVICE_REMOVED",
            Self::AccountLocked => "ACCOUNT_LOCKED",
            Self::AccountUnlocked => "ACCOUNT_UNLOCKED",
            Self::SuspiciousActivity => "SUSPICIOUS_ACTIVITY",
            Self::AccessDeniedAdmin => "ACCESS_DENIED_ADMIN",
            Self::PasswordChanged => "PASSWORD_CHANGED",
            Self::PasswordReset => "PASSWORD_RESET",
            Self::BackupCodesRegenerated => "BACKUP_CODES_REGENERATED",
        }
    }

    /// Parse the stable string form. Returns `None` for unknown actions.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "REGISTER" => Some(Self::Register),
            "LOGIN" => Some(Self::Login),
            "LOGIN_MFA" => Some(Self::LoginMfa),
            "FAILED_LOGIN" => Some(Self::FailedLogin),
            "LOGOUT" => Some(Self::Logout),
            "EMAIL_VERIFIED" => Some(Self::EmailVerified),
            "MFA_ENABLED" => Some(Self::MfaEnabled),
            "MFA_DISABLED" => Some(Self::MfaDisabled),
            "DEVICE_ADDED" => Some(Self::DeviceAdded),
            "DEVICE_REMOVED" => Some(Self::DeviceRemoved),
            "ACCOUNT_LOCKED" => Some(Self::AccountLocked),
            "ACCOUNT_UNLOCKED" => Some(Self::AccountUnlocked),
            "SUSPICIOUS_ACTIVITY" => Some(Self::SuspiciousActivity),
            "ACCESS_DENIED_ADMIN" => Some(Self::AccessDeniedAdmin),
            "PASSWORD_CHANGED" => Some(Self::PasswordChanged),
            "PASSWORD_RESET" => Some(Self::PasswordReset),
            "BACKUP_CODES_REGENERATED" => Some(Self::BackupCodesRegenerated),
            _ => None,
        }
    }
}
