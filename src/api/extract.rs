// Request extractors

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use std::convert::Infallible;

use crate::credentials::Credentials;

/// Basic credentials from the `Authorization` header, if any were sent.
///
/// Never rejects: a missing or malformed header yields `None` and the
/// verifier decides what that means.
#[derive(Debug, Clone)]
pub struct BasicCredentials(pub Option<Credentials>);

impl<S> FromRequestParts<S> for BasicCredentials
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let credentials = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(Credentials::from_basic_header);

        Ok(Self(credentials))
    }
}
