//! Credential Verifier
//!
//! Applications and admin users both authenticate with HTTP Basic
//! credentials. Any failure (missing header, unknown name, wrong secret)
//! collapses into [`GatewayError::Unauthorized`], so callers cannot tell
//! which part was wrong.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::collections::HashMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

use crate::directory::{Application, ApplicationDirectory, ApplicationName};
use crate::error::{GatewayError, GatewayResult};

/// A presented name/secret pair
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub name: String,
    pub secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("name", &self.name)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret: secret.into(),
        }
    }

    /// Parse an `Authorization` header value of the form `Basic <base64>`.
    ///
    /// The scheme is matched case-insensitively. Returns `None` for anything
    /// malformed.
    pub fn from_basic_header(value: &str) -> Option<Self> {
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }

        let decoded = BASE64.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (name, secret) = decoded.split_once(':')?;

        Some(Self::new(name, secret))
    }

    /// Render as an `Authorization` header value
    pub fn to_basic_header(&self) -> String {
        format!(
            "Basic {}",
            BASE64.encode(format!("{}:{}", self.name, self.secret))
        )
    }
}

fn secrets_match(stored: &str, presented: &str) -> bool {
    stored.as_bytes().ct_eq(presented.as_bytes()).into()
}

/// Authenticate an application against the directory
pub async fn verify_application(
    directory: &dyn ApplicationDirectory,
    credentials: Option<&Credentials>,
) -> GatewayResult<Application> {
    let credentials = credentials.ok_or(GatewayError::Unauthorized)?;
    let name = ApplicationName::parse(&credentials.name).map_err(|_| GatewayError::Unauthorized)?;

    let application = directory
        .find(&name)
        .await?
        .ok_or(GatewayError::Unauthorized)?;

    if !secrets_match(&application.secret, &credentials.secret) {
        return Err(GatewayError::Unauthorized);
    }

    Ok(application)
}

/// An administrator of the gateway
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub username: String,
    password_hash: String,
}

fn hash_password(password: &str) -> GatewayResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| GatewayError::Storage(format!("Password hashing failed: {}", e)))
}

/// Admin accounts with argon2-hashed passwords
#[derive(Debug, Clone, Default)]
pub struct AdminUsers {
    users: Arc<RwLock<HashMap<String, AdminUser>>>,
}

impl AdminUsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or reset an admin account
    pub async fn bootstrap(&self, username: &str, password: &str) -> GatewayResult<()> {
        let user = AdminUser {
            username: username.to_string(),
            password_hash: hash_password(password)?,
        };
        self.users.write().await.insert(username.to_string(), user);
        tracing::info!(username, "Admin user provisioned");
        Ok(())
    }

    /// Authenticate an admin user
    pub async fn verify(&self, credentials: Option<&Credentials>) -> GatewayResult<AdminUser> {
        let credentials = credentials.ok_or(GatewayError::Unauthorized)?;

        let users = self.users.read().await;
        let user = users
            .get(&credentials.name)
            .ok_or(GatewayError::Unauthorized)?;

        let parsed = PasswordHash::new(&user.password_hash)
            .map_err(|e| GatewayError::Storage(format!("Invalid password hash: {}", e)))?;
        Argon2::default()
            .verify_password(credentials.secret.as_bytes(), &parsed)
            .map_err(|_| GatewayError::Unauthorized)?;

        Ok(user.clone())
    }

    /// Replace an admin user's password
    pub async fn change_password(&self, username: &str, new_password: &str) -> GatewayResult<()> {
        if new_password.is_empty() {
            return Err(GatewayError::Validation(
                "new_password is required".to_string(),
            ));
        }

        let password_hash = hash_password(new_password)?;
        let mut users = self.users.write().await;
        let user = users.get_mut(username).ok_or_else(|| {
            GatewayError::NotFound(format!("Unable to find user '{}'", username))
        })?;
        user.password_hash = password_hash;

        tracing::info!(username, "Admin password changed");
        Ok(())
    }
}
