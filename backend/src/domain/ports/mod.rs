//! Driven ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod mailer;
mod password_hasher;
mod repository;
mod token_issuer;
mod user_account_repository;

pub use mailer::{MailEnvelope, MailReceipt, Mailer};
#[cfg(test)]
pub use mailer::MockMailer;
pub use password_hasher::{PasswordDigest, PasswordHasher};
#[cfg(test)]
pub use password_hasher::MockPasswordHasher;
pub use repository::{Query, Repository, RepositoryError};
pub use token_issuer::{IssuedToken, TokenClaims, TokenIssuer};
#[cfg(test)]
pub use token_issuer::MockTokenIssuer;
pub use user_account_repository::UserAccountRepository;
