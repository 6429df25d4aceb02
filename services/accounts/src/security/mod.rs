pub mod backup;
pub mod fingerprint;
pub mod link_token;
pub mod lockout;
pub mod otp;
pub mod password;
pub mod totp;
