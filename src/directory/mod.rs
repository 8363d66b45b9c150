//! Application Directory
//!
//! Registered client applications, their credentials and their sending
//! quota. The dispatcher only reads applications and bumps their counters;
//! everything else here exists for the admin surface.
//!
//! # Quota counting
//!
//! Two ways to charge recipients against an application:
//!
//! - [`ApplicationDirectory::increment`] adds unconditionally. It is atomic
//!   on its own, but paired with a separate admission check it can let two
//!   concurrent requests jointly overshoot the limit.
//! - [`ApplicationDirectory::increment_within_limit`] adds only if the new
//!   count stays within the limit, in a single atomic step.

pub mod memory;
pub mod name;

pub use memory::InMemoryDirectory;
pub use name::ApplicationName;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::GatewayResult;

/// Lifetime recipient ceiling and running total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quota {
    pub limit: u64,
    pub count: u64,
}

impl Quota {
    pub fn new(limit: u64) -> Self {
        Self { limit, count: 0 }
    }

    /// Recipients still available before the limit is reached
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.count)
    }

    /// Whether `requested` more recipients fit under the limit
    pub fn allows(&self, requested: u64) -> bool {
        self.count
            .checked_add(requested)
            .is_some_and(|total| total <= self.limit)
    }
}

/// A registered client application.
///
/// Serializes as `{name, active, send: {limit, count}}`; the secret never
/// leaves the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Application {
    pub name: ApplicationName,

    #[serde(skip)]
    pub secret: String,

    pub active: bool,

    #[serde(rename = "send")]
    pub quota: Quota,
}

impl Application {
    /// New active application with a zero count
    pub fn new(name: ApplicationName, secret: impl Into<String>, limit: u64) -> Self {
        Self {
            name,
            secret: secret.into(),
            active: true,
            quota: Quota::new(limit),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.quota.count = count;
        self
    }
}

/// Outcome of a conditional counter update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Increment {
    /// Count was raised; carries the new quota
    Applied(Quota),
    /// Count would have passed the limit and was left alone
    LimitExceeded(Quota),
}

/// Storage capability for applications
#[async_trait]
pub trait ApplicationDirectory: Send + Sync {
    /// Look up an application by canonical name
    async fn find(&self, name: &ApplicationName) -> GatewayResult<Option<Application>>;

    /// Register a new application. Fails with `Conflict` when the name is taken.
    async fn create(&self, application: Application) -> GatewayResult<Application>;

    /// All applications, ordered by name
    async fn list(&self) -> GatewayResult<Vec<Application>>;

    /// Enable or disable an application
    async fn set_active(&self, name: &ApplicationName, active: bool)
        -> GatewayResult<Application>;

    /// Change an application's lifetime limit
    async fn set_limit(&self, name: &ApplicationName, limit: u64) -> GatewayResult<Application>;

    /// Atomically add `by` to the count
    async fn increment(&self, name: &ApplicationName, by: u64) -> GatewayResult<Quota>;

    /// Atomically add `by` to the count unless that would pass the limit
    async fn increment_within_limit(
        &self,
        name: &ApplicationName,
        by: u64,
    ) -> GatewayResult<Increment>;
}

/// Error text for an unknown application name
pub(crate) fn unknown_application(name: &ApplicationName) -> String {
    format!("Unable to find application with name '{}'", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_allows() {
        let quota = Quota { limit: 4, count: 2 };
        assert!(quota.allows(2));
        assert!(!quota.allows(3));
        assert_eq!(quota.remaining(), 2);
    }

    #[test]
    fn test_quota_allows_does_not_overflow() {
        let quota = Quota {
            limit: u64::MAX,
            count: u64::MAX,
        };
        assert!(!quota.allows(1));
        assert!(quota.allows(0));
    }

    #[test]
    fn test_application_json_hides_secret() {
        let app = Application::new(ApplicationName::parse("New Name").unwrap(), "123", 200000);
        let json = serde_json::to_value(&app).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "new name",
                "active": true,
                "send": { "limit": 200000, "count": 0 }
            })
        );
        assert!(json.get("secret").is_none());
    }
}
