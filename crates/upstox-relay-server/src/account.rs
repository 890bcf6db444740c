//! Account extraction.
//!
//! Handlers that read or write tokens take an [`Account`] so the identity
//! they act for is always explicit. Callers name it with the
//! `X-Account-Id` header; without one the default account is used.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use upstox_relay_oauth::AccountId;

/// Header naming the account a request acts for.
pub const ACCOUNT_HEADER: &str = "x-account-id";

/// The account a request acts for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account(pub AccountId);

impl<S> FromRequestParts<S> for Account
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account = parts
            .headers
            .get(ACCOUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(AccountId::parse)
            .unwrap_or_default();

        Ok(Account(account))
    }
}
