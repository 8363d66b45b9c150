//! SMS Gateway Library
//!
//! Accepts SMS submissions from registered client applications over HTTP,
//! enforces each application's lifetime recipient quota, and stores the
//! messages for later retrieval. Also provides the admin surface for
//! registering applications and managing their quotas.

pub mod admission;
pub mod api;
pub mod config;
pub mod credentials;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod message;
pub mod metrics;
pub mod server;

pub use admission::{Admission, AdmissionRejection, CountingStrategy, RejectionReason};
pub use config::Config;
pub use credentials::{AdminUsers, Credentials};
pub use directory::{Application, ApplicationDirectory, ApplicationName, InMemoryDirectory, Quota};
pub use dispatch::{DispatchStage, Dispatcher};
pub use error::{GatewayError, GatewayResult};
pub use message::{InMemoryMessageStore, Message, MessageId, MessageStore, NewMessage, SubmitRequest};
