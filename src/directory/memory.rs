//! In-memory application directory
//!
//! The map is behind a `tokio` `RwLock` and only write-locked to register a
//! new application. Per-application state lives in atomics, so counter
//! updates and admin toggles run under the read lock and never serialize
//! unrelated applications.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{
    unknown_application, Application, ApplicationDirectory, ApplicationName, Increment, Quota,
};
use crate::error::{GatewayError, GatewayResult};

/// Mutable state of one registered application
#[derive(Debug)]
struct Entry {
    name: ApplicationName,
    secret: String,
    active: AtomicBool,
    limit: AtomicU64,
    count: AtomicU64,
}

impl Entry {
    fn new(application: Application) -> Self {
        Self {
            name: application.name,
            secret: application.secret,
            active: AtomicBool::new(application.active),
            limit: AtomicU64::new(application.quota.limit),
            count: AtomicU64::new(application.quota.count),
        }
    }

    fn quota(&self) -> Quota {
        Quota {
            limit: self.limit.load(Ordering::SeqCst),
            count: self.count.load(Ordering::SeqCst),
        }
    }

    fn snapshot(&self) -> Application {
        Application {
            name: self.name.clone(),
            secret: self.secret.clone(),
            active: self.active.load(Ordering::SeqCst),
            quota: self.quota(),
        }
    }

    /// Add without looking at the limit
    fn add(&self, by: u64) -> Quota {
        let mut current = self.count.load(Ordering::SeqCst);
        loop {
            let new_value = current.saturating_add(by);
            match self.count.compare_exchange_weak(
                current,
                new_value,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    return Quota {
                        limit: self.limit.load(Ordering::SeqCst),
                        count: new_value,
                    }
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Add only if the result stays within the limit
    fn try_add(&self, by: u64) -> Increment {
        let mut current = self.count.load(Ordering::SeqCst);
        loop {
            let limit = self.limit.load(Ordering::SeqCst);
            let quota = Quota {
                limit,
                count: current,
            };
            if !quota.allows(by) {
                return Increment::LimitExceeded(quota);
            }

            let new_value = current + by;
            match self.count.compare_exchange_weak(
                current,
                new_value,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    return Increment::Applied(Quota {
                        limit,
                        count: new_value,
                    })
                }
                Err(actual) => current = actual,
            }
        }
    }
}

/// Application directory held entirely in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    applications: Arc<RwLock<HashMap<ApplicationName, Arc<Entry>>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered applications
    pub async fn len(&self) -> usize {
        self.applications.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.applications.read().await.is_empty()
    }

    async fn entry(&self, name: &ApplicationName) -> GatewayResult<Arc<Entry>> {
        self.applications
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(unknown_application(name)))
    }
}

#[async_trait]
impl ApplicationDirectory for InMemoryDirectory {
    async fn find(&self, name: &ApplicationName) -> GatewayResult<Option<Application>> {
        let applications = self.applications.read().await;
        Ok(applications.get(name).map(|entry| entry.snapshot()))
    }

    async fn create(&self, application: Application) -> GatewayResult<Application> {
        let mut applications = self.applications.write().await;

        if applications.contains_key(&application.name) {
            return Err(GatewayError::Conflict(format!(
                "Application with name '{}' already exists.",
                application.name
            )));
        }

        let entry = Arc::new(Entry::new(application));
        let created = entry.snapshot();
        applications.insert(created.name.clone(), entry);

        tracing::info!(application = %created.name, limit = created.quota.limit, "Registered application");
        Ok(created)
    }

    async fn list(&self) -> GatewayResult<Vec<Application>> {
        let applications = self.applications.read().await;
        let mut all: Vec<Application> = applications.values().map(|e| e.snapshot()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn set_active(
        &self,
        name: &ApplicationName,
        active: bool,
    ) -> GatewayResult<Application> {
        let entry = self.entry(name).await?;
        entry.active.store(active, Ordering::SeqCst);
        tracing::info!(application = %name, active, "Application state changed");
        Ok(entry.snapshot())
    }

    async fn set_limit(&self, name: &ApplicationName, limit: u64) -> GatewayResult<Application> {
        let entry = self.entry(name).await?;
        entry.limit.store(limit, Ordering::SeqCst);
        tracing::info!(application = %name, limit, "Application limit changed");
        Ok(entry.snapshot())
    }

    async fn increment(&self, name: &ApplicationName, by: u64) -> GatewayResult<Quota> {
        let entry = self.entry(name).await?;
        Ok(entry.add(by))
    }

    async fn increment_within_limit(
        &self,
        name: &ApplicationName,
        by: u64,
    ) -> GatewayResult<Increment> {
        let entry = self.entry(name).await?;
        Ok(entry.try_add(by))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(raw: &str) -> ApplicationName {
        ApplicationName::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_case_insensitively() {
        let directory = InMemoryDirectory::new();
        directory
            .create(Application::new(name("AppForTest"), "Secret123", 2000))
            .await
            .unwrap();

        let found = directory.find(&name("APPFORTEST")).await.unwrap().unwrap();
        assert_eq!(found.name.as_str(), "appfortest");
        assert_eq!(found.secret, "Secret123");
        assert_eq!(found.quota, Quota { limit: 2000, count: 0 });
    }

    #[tokio::test]
    async fn test_duplicate_name_names_conflict() {
        let directory = InMemoryDirectory::new();
        directory
            .create(Application::new(name("Unique Name"), "Secret", 2000))
            .await
            .unwrap();

        let err = directory
            .create(Application::new(name("Unique name"), "Secret", 2000))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            GatewayError::Conflict("Application with name 'unique name' already exists.".into())
        );
        assert_eq!(directory.len().await, 1);
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let directory = InMemoryDirectory::new();
        for raw in ["zeta", "Alpha", "mid"] {
            directory
                .create(Application::new(name(raw), "s", 10))
                .await
                .unwrap();
        }

        let names: Vec<String> = directory
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name.to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn test_set_active_and_limit() {
        let directory = InMemoryDirectory::new();
        directory
            .create(Application::new(name("app"), "s", 10))
            .await
            .unwrap();

        let app = directory.set_active(&name("app"), false).await.unwrap();
        assert!(!app.active);

        let app = directory.set_limit(&name("app"), 50).await.unwrap();
        assert_eq!(app.quota.limit, 50);
        assert!(!app.active);
    }

    #[tokio::test]
    async fn test_unknown_application_is_not_found() {
        let directory = InMemoryDirectory::new();
        let err = directory.set_limit(&name("ghost"), 1).await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::NotFound("Unable to find application with name 'ghost'".into())
        );
        assert!(directory.increment(&name("ghost"), 1).await.is_err());
    }

    #[tokio::test]
    async fn test_increment_ignores_limit() {
        let directory = InMemoryDirectory::new();
        directory
            .create(Application::new(name("app"), "s", 2))
            .await
            .unwrap();

        let quota = directory.increment(&name("app"), 3).await.unwrap();
        assert_eq!(quota, Quota { limit: 2, count: 3 });
    }

    #[tokio::test]
    async fn test_increment_within_limit() {
        let directory = InMemoryDirectory::new();
        directory
            .create(Application::new(name("app"), "s", 4))
            .await
            .unwrap();

        assert_eq!(
            directory.increment_within_limit(&name("app"), 3).await.unwrap(),
            Increment::Applied(Quota { limit: 4, count: 3 })
        );
        assert_eq!(
            directory.increment_within_limit(&name("app"), 2).await.unwrap(),
            Increment::LimitExceeded(Quota { limit: 4, count: 3 })
        );
        assert_eq!(
            directory.increment_within_limit(&name("app"), 1).await.unwrap(),
            Increment::Applied(Quota { limit: 4, count: 4 })
        );
    }

    #[tokio::test]
    async fn test_concurrent_conditional_increments_never_pass_limit() {
        let directory = InMemoryDirectory::new();
        directory
            .create(Application::new(name("app"), "s", 100))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..64 {
            let directory = directory.clone();
            handles.push(tokio::spawn(async move {
                directory
                    .increment_within_limit(&name("app"), 3)
                    .await
                    .unwrap()
            }));
        }

        let mut applied = 0;
        for handle in handles {
            if let Increment::Applied(_) = handle.await.unwrap() {
                applied += 1;
            }
        }

        let app = directory.find(&name("app")).await.unwrap().unwrap();
        assert_eq!(applied, 33);
        assert_eq!(app.quota.count, 99);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let directory = InMemoryDirectory::new();
        directory
            .create(Application::new(name("app"), "s", 10))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let directory = directory.clone();
            handles.push(tokio::spawn(async move {
                directory.increment(&name("app"), 2).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let app = directory.find(&name("app")).await.unwrap().unwrap();
        assert_eq!(app.quota.count, 100);
    }
}
