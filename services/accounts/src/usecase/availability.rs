use crate::domain::repository::AccountStore;
use crate::domain::types::{validate_email, validate_phone, validate_username};
use crate::error::AccountsServiceError;

/// Which identifier a registration form is probing.
pub enum AvailabilityQuery {
    Username(String),
    Email(String),
    Phone(String),
}

pub struct CheckAvailabilityUseCase<A: AccountStore> {
    pub accounts: A,
}

impl<A: AccountStore> CheckAvailabilityUseCase<A> {
    /// Format problems are rejected as validation errors rather than
    /// reported as "available"; a value that cannot register is neither.
    pub async fn execute(&self, query: AvailabilityQuery) -> Result<bool, AccountsServiceError> {
        match query {
            AvailabilityQuery::Username(raw) => {
                let username = validate_username(&raw)?;
                Ok(self.accounts.find_by_username(&username).await?.is_none())
            }
            AvailabilityQuery::Email(raw) => {
                let email = validate_email(&raw)?;
                Ok(self.accounts.find_by_email(&email).await?.is_none())
            }
            AvailabilityQuery::Phone(raw) => {
                let Some(phone) = validate_phone(&raw)? else {
                    return Err(AccountsServiceError::Validation(
                        "Invalid phone number format. Use format: +1234567890".to_owned(),
                    ));
                };
                Ok(self.accounts.find_by_phone(&phone).await?.is_none())
            }
        }
    }
}
