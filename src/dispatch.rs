//! Dispatch Orchestrator
//!
//! Drives a submission through its stages in a fixed order:
//!
//! ```text
//! Unauthenticated -> Authenticated -> Validated -> Admitted -> Persisted -> Complete
//!        |                 |              |
//!   AuthRejected   ValidationRejected  AdmissionRejected
//! ```
//!
//! Validation runs before admission so a malformed request never consumes
//! quota. If charging the counter fails after the message was persisted,
//! the message is removed again before the error is returned.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::admission::{admit, Admission, AdmissionRejection, CountingStrategy};
use crate::credentials::{verify_application, Credentials};
use crate::directory::{Application, ApplicationDirectory, ApplicationName, Increment, Quota};
use crate::error::{GatewayError, GatewayResult};
use crate::message::{Message, MessageStore, NewMessage, SubmitRequest};
use crate::metrics;

/// Where a submission is, or where it ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    Unauthenticated,
    Authenticated,
    Validated,
    Admitted,
    Persisted,
    Complete,
    AuthRejected,
    ValidationRejected,
    AdmissionRejected,
}

impl DispatchStage {
    /// Stage a submission ends in when `err` stops it here.
    ///
    /// Storage failures have no rejection state of their own and stay at
    /// the stage they interrupted.
    pub fn rejected_by(self, err: &GatewayError) -> Self {
        match err {
            GatewayError::Unauthorized => DispatchStage::AuthRejected,
            GatewayError::Validation(_) => DispatchStage::ValidationRejected,
            GatewayError::Admission(_) => DispatchStage::AdmissionRejected,
            _ => self,
        }
    }

    pub fn is_rejected(self) -> bool {
        matches!(
            self,
            DispatchStage::AuthRejected
                | DispatchStage::ValidationRejected
                | DispatchStage::AdmissionRejected
        )
    }
}

/// Top-level submission and retrieval flow
pub struct Dispatcher {
    directory: Arc<dyn ApplicationDirectory>,
    messages: Arc<dyn MessageStore>,
    strategy: CountingStrategy,
}

impl Dispatcher {
    pub fn new(
        directory: Arc<dyn ApplicationDirectory>,
        messages: Arc<dyn MessageStore>,
        strategy: CountingStrategy,
    ) -> Self {
        Self {
            directory,
            messages,
            strategy,
        }
    }

    pub fn strategy(&self) -> CountingStrategy {
        self.strategy
    }

    /// Resolve credentials to an application
    pub async fn authenticate(&self, credentials: Option<&Credentials>) -> GatewayResult<Application> {
        verify_application(self.directory.as_ref(), credentials).await
    }

    /// Submit a message on behalf of the authenticated application
    pub async fn submit(
        &self,
        credentials: Option<&Credentials>,
        request: SubmitRequest,
    ) -> GatewayResult<Message> {
        let (_, result) = self.dispatch(credentials, request).await;
        result
    }

    /// Run a submission, returning the stage it ended in alongside the outcome
    pub async fn dispatch(
        &self,
        credentials: Option<&Credentials>,
        request: SubmitRequest,
    ) -> (DispatchStage, GatewayResult<Message>) {
        let timer = metrics::DISPATCH_DURATION_SECONDS.start_timer();
        let mut stage = DispatchStage::Unauthenticated;

        let result = self.run(&mut stage, credentials, request).await;
        timer.observe_duration();

        match &result {
            Ok(message) => {
                metrics::record_submission("accepted");
                metrics::RECIPIENTS_ADMITTED_TOTAL.inc_by(message.statuses.len() as u64);
            }
            Err(err) => {
                let reached = stage;
                stage = reached.rejected_by(err);
                metrics::record_submission(err.error_code());
                debug!(stage = ?stage, reached = ?reached, error = %err, "Submission rejected");
            }
        }
        (stage, result)
    }

    /// Fetch a message; no admission check applies
    pub async fn retrieve(
        &self,
        credentials: Option<&Credentials>,
        id: &str,
    ) -> GatewayResult<Message> {
        let result = async {
            let application = self.authenticate(credentials).await?;
            debug!(application = %application.name, message_id = id, "Looking up message");
            self.messages.find_by_id(id).await
        }
        .await;

        match &result {
            Ok(_) => metrics::record_retrieval("found"),
            Err(err) => metrics::record_retrieval(err.error_code()),
        }
        result
    }

    async fn run(
        &self,
        stage: &mut DispatchStage,
        credentials: Option<&Credentials>,
        request: SubmitRequest,
    ) -> GatewayResult<Message> {
        let application = self.authenticate(credentials).await?;
        let name = &application.name;
        enter(stage, DispatchStage::Authenticated, name);

        let new_message = NewMessage::from_request(request)?;
        enter(stage, DispatchStage::Validated, name);

        let requested = new_message.recipient_count();
        if let Admission::Rejected(rejection) = admit(&application, requested) {
            return Err(GatewayError::Admission(rejection));
        }
        enter(stage, DispatchStage::Admitted, name);

        let message = self.messages.create(new_message).await?;
        enter(stage, DispatchStage::Persisted, name);

        let quota = match self.charge(name, requested).await {
            Ok(quota) => quota,
            Err(err) => {
                self.discard(&message).await;
                return Err(err);
            }
        };
        enter(stage, DispatchStage::Complete, name);

        info!(
            application = %name,
            message_id = %message.id,
            recipients = requested,
            count = quota.count,
            limit = quota.limit,
            "Message accepted"
        );
        Ok(message)
    }

    async fn charge(&self, name: &ApplicationName, requested: u64) -> GatewayResult<Quota> {
        match self.strategy {
            CountingStrategy::BestEffort => self.directory.increment(name, requested).await,
            CountingStrategy::Conditional => {
                match self.directory.increment_within_limit(name, requested).await? {
                    Increment::Applied(quota) => Ok(quota),
                    Increment::LimitExceeded(quota) => {
                        warn!(
                            application = %name,
                            requested,
                            count = quota.count,
                            limit = quota.limit,
                            "Quota consumed by a concurrent request"
                        );
                        Err(GatewayError::Admission(AdmissionRejection::quota_exceeded(name)))
                    }
                }
            }
        }
    }

    async fn discard(&self, message: &Message) {
        if let Err(err) = self.messages.remove(&message.id).await {
            error!(message_id = %message.id, error = %err, "Failed to roll back uncounted message");
        }
    }
}

fn enter(stage: &mut DispatchStage, next: DispatchStage, application: &ApplicationName) {
    let from = *stage;
    debug!(application = %application, from = ?from, to = ?next, "Dispatch stage");
    *stage = next;
}
