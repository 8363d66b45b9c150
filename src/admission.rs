//! Admission Controller
//!
//! Decides whether an authenticated application may send to a number of
//! recipients. The check is pre-flight: `count + requested` is compared with
//! the limit before anything is persisted, so an oversized request is
//! rejected whole rather than partially sent.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::directory::{Application, ApplicationName};

/// Why an application was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    Disabled,
    QuotaExceeded,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::Disabled => "disabled",
            RejectionReason::QuotaExceeded => "quota_exceeded",
        }
    }
}

/// A refused submission, naming the application in canonical form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionRejection {
    pub reason: RejectionReason,
    pub application: ApplicationName,
}

impl AdmissionRejection {
    pub fn disabled(application: &ApplicationName) -> Self {
        Self {
            reason: RejectionReason::Disabled,
            application: application.clone(),
        }
    }

    pub fn quota_exceeded(application: &ApplicationName) -> Self {
        Self {
            reason: RejectionReason::QuotaExceeded,
            application: application.clone(),
        }
    }
}

impl fmt::Display for AdmissionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            RejectionReason::Disabled => write!(
                f,
                "Unable to send sms as application '{}' has been disabled",
                self.application
            ),
            RejectionReason::QuotaExceeded => write!(
                f,
                "Unable to send sms as application '{}' has reached the allocated sms limit",
                self.application
            ),
        }
    }
}

/// Result of an admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Caller may persist and must then charge exactly the requested count
    Admitted,
    Rejected(AdmissionRejection),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Check an application against a request for `requested` recipients.
///
/// A disabled application is refused before its quota is looked at.
pub fn admit(application: &Application, requested: u64) -> Admission {
    if !application.active {
        return Admission::Rejected(AdmissionRejection::disabled(&application.name));
    }

    if !application.quota.allows(requested) {
        return Admission::Rejected(AdmissionRejection::quota_exceeded(&application.name));
    }

    Admission::Admitted
}

/// How the dispatcher charges admitted recipients to the counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountingStrategy {
    /// Conditional add at the storage layer; a request that loses a race is
    /// rolled back and reported as quota exceeded. `count <= limit` holds
    /// under any interleaving.
    #[default]
    Conditional,
    /// Unconditional atomic add after the pre-flight check. Concurrent
    /// requests that each pass the check may jointly overshoot the limit.
    BestEffort,
}

impl std::str::FromStr for CountingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "conditional" => Ok(CountingStrategy::Conditional),
            "best_effort" | "best-effort" => Ok(CountingStrategy::BestEffort),
            other => Err(format!(
                "Invalid quota strategy: {}. Must be one of: conditional, best_effort",
                other
            )),
        }
    }
}
