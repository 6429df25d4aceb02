pub mod availability;
pub mod device;
pub mod enrollment;
pub mod events;
pub mod login;
pub mod mfa;
pub mod password;
pub mod register;
pub mod session;
