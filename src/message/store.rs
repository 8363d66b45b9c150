//! Message Store

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{DeliveryState, Message, MessageId, NewMessage};
use crate::error::{GatewayError, GatewayResult};

/// Storage capability for messages
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a validated message with a fresh id and all statuses `Sending`
    async fn create(&self, message: NewMessage) -> GatewayResult<Message>;

    /// Fetch a message by its id as given by the caller
    async fn find_by_id(&self, id: &str) -> GatewayResult<Message>;

    /// Move one recipient of a message to a new delivery state
    async fn update_status(
        &self,
        id: &MessageId,
        index: usize,
        state: DeliveryState,
    ) -> GatewayResult<Message>;

    /// Drop a message whose submission could not be completed
    async fn remove(&self, id: &MessageId) -> GatewayResult<()>;
}

/// Error text for an unknown message id
pub(crate) fn unknown_message(id: &str) -> String {
    format!("Unable to find message with id '{}'", id)
}

/// Message store held in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageStore {
    messages: Arc<RwLock<HashMap<MessageId, Message>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored messages
    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn create(&self, message: NewMessage) -> GatewayResult<Message> {
        let message = Message::create(message);
        let mut messages = self.messages.write().await;
        messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn find_by_id(&self, id: &str) -> GatewayResult<Message> {
        let not_found = || GatewayError::NotFound(unknown_message(id));
        let key = MessageId::parse(id).ok_or_else(not_found)?;

        let messages = self.messages.read().await;
        messages.get(&key).cloned().ok_or_else(not_found)
    }

    async fn update_status(
        &self,
        id: &MessageId,
        index: usize,
        state: DeliveryState,
    ) -> GatewayResult<Message> {
        let mut messages = self.messages.write().await;
        let message = messages
            .get_mut(id)
            .ok_or_else(|| GatewayError::NotFound(unknown_message(&id.to_string())))?;

        let status = message.statuses.get_mut(index).ok_or_else(|| {
            GatewayError::NotFound(format!(
                "Message '{}' has no recipient at position {}",
                id, index
            ))
        })?;
        status.state = state;

        Ok(message.clone())
    }

    async fn remove(&self, id: &MessageId) -> GatewayResult<()> {
        self.messages.write().await.remove(id);
        Ok(())
    }
}
