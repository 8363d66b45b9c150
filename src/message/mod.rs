//! Messages and Per-Recipient Status
//!
//! A submission is fanned out into one [`StatusRecord`] per recipient, in the
//! order the recipients were given. Inbound payloads arrive as
//! [`SubmitRequest`] and only become a [`NewMessage`] after validation, so
//! nothing malformed can reach the store or consume quota.

pub mod store;

pub use store::{InMemoryMessageStore, MessageStore};

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};

/// Server-assigned message identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a caller-supplied id; anything that is not a UUID is `None`
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(Self)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque sender reference supplied by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub name: String,
    pub id: String,
}

/// Delivery state of one recipient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryState {
    PendingSend,
    Sending,
    Delivered,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    #[serde(rename = "phonenumber")]
    pub recipient: String,

    #[serde(rename = "status")]
    pub state: DeliveryState,
}

/// A persisted submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,

    pub sender: Sender,

    #[serde(rename = "message")]
    pub body: String,

    #[serde(rename = "messageStatus")]
    pub statuses: Vec<StatusRecord>,
}

impl Message {
    /// Assign an id and fan the recipients out, each starting as `Sending`
    pub fn create(new: NewMessage) -> Self {
        let statuses = new
            .recipients
            .into_iter()
            .map(|recipient| StatusRecord {
                recipient,
                state: DeliveryState::Sending,
            })
            .collect();

        Self {
            id: MessageId::generate(),
            sender: new.sender,
            body: new.body,
            statuses,
        }
    }
}

/// Sender as it arrives on the wire
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SenderPayload {
    pub name: Option<String>,
    pub id: Option<String>,
}

/// Inbound submission payload.
///
/// Every field is optional at the serde level so a structurally incomplete
/// body turns into field-level validation messages instead of a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    /// Client request token; accepted, not interpreted
    pub token: Option<String>,

    pub sender: Option<SenderPayload>,

    pub recipients: Option<Vec<String>>,

    pub message: Option<String>,

    /// Reserved; has no effect on dispatch
    pub status_notification: Option<bool>,
}

/// A submission that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    sender: Sender,
    body: String,
    recipients: Vec<String>,
}

impl NewMessage {
    /// Validate the parts of a message, reporting every problem at once
    pub fn new(
        sender: Option<SenderPayload>,
        body: Option<String>,
        recipients: Option<Vec<String>>,
    ) -> GatewayResult<Self> {
        let mut problems = Vec::new();

        let sender = match sender {
            None => {
                problems.push("sender is required");
                None
            }
            Some(SenderPayload { name, id }) => {
                let name = name.filter(|n| !n.trim().is_empty());
                let id = id.filter(|i| !i.trim().is_empty());
                if name.is_none() {
                    problems.push("sender name is required");
                }
                if id.is_none() {
                    problems.push("sender id is required");
                }
                name.zip(id).map(|(name, id)| Sender { name, id })
            }
        };

        match &recipients {
            None => problems.push("recipients is required"),
            Some(list) if list.is_empty() => problems.push("recipients must not be empty"),
            Some(list) if list.iter().any(|r| r.trim().is_empty()) => {
                problems.push("recipients must not contain blank phone numbers")
            }
            Some(_) => {}
        }

        let body = body.filter(|b| !b.trim().is_empty());
        if body.is_none() {
            problems.push("message is required");
        }

        match (sender, body, recipients) {
            (Some(sender), Some(body), Some(recipients)) if problems.is_empty() => Ok(Self {
                sender,
                body,
                recipients,
            }),
            _ => Err(GatewayError::Validation(problems.join(", "))),
        }
    }

    /// Validate an inbound payload
    pub fn from_request(request: SubmitRequest) -> GatewayResult<Self> {
        Self::new(request.sender, request.message, request.recipients)
    }

    /// Number of recipients, which is what admission charges
    pub fn recipient_count(&self) -> u64 {
        self.recipients.len() as u64
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sender() -> Option<SenderPayload> {
        Some(SenderPayload {
            name: Some("Bob Smith".into()),
            id: Some("121313".into()),
        })
    }

    #[test]
    fn test_valid_message_fans_out_in_order() {
        let new = NewMessage::new(
            sender(),
            Some("This is from new sms-gateway".into()),
            Some(vec![
                "055 0840 7317".into(),
                "0934 861 9007".into(),
                "(0151) 545 1812".into(),
            ]),
        )
        .unwrap();
        assert_eq!(new.recipient_count(), 3);

        let message = Message::create(new);
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["message"], "This is from new sms-gateway");
        assert_eq!(json["sender"]["name"], "Bob Smith");
        assert_eq!(
            json["messageStatus"],
            serde_json::json!([
                {"phonenumber": "055 0840 7317", "status": "sending"},
                {"phonenumber": "0934 861 9007", "status": "sending"},
                {"phonenumber": "(0151) 545 1812", "status": "sending"}
            ])
        );
        assert!(json["id"].is_string());
    }

    #[test]
    fn test_empty_request_lists_every_field() {
        let err = NewMessage::from_request(SubmitRequest::default()).unwrap_err();
        assert_eq!(
            err,
            GatewayError::Validation(
                "sender is required, recipients is required, message is required".into()
            )
        );
    }

    #[test]
    fn test_sender_subfields_are_required() {
        let err = NewMessage::new(
            Some(SenderPayload {
                name: Some("Bob".into()),
                id: None,
            }),
            Some("hi".into()),
            Some(vec!["1".into()]),
        )
        .unwrap_err();
        assert_eq!(err, GatewayError::Validation("sender id is required".into()));
    }

    #[test]
    fn test_empty_recipients_rejected() {
        let err = NewMessage::new(sender(), Some("hi".into()), Some(vec![])).unwrap_err();
        assert_eq!(
            err,
            GatewayError::Validation("recipients must not be empty".into())
        );
    }

    #[test]
    fn test_blank_body_rejected() {
        let err = NewMessage::new(sender(), Some("   ".into()), Some(vec!["1".into()])).unwrap_err();
        assert_eq!(err, GatewayError::Validation("message is required".into()));
    }

    #[test]
    fn test_payload_field_names() {
        let request: SubmitRequest = serde_json::from_value(serde_json::json!({
            "token": "app req token",
            "sender": {"name": "Bob Smith", "id": "121313"},
            "recipients": ["055 0840 7317"],
            "message": "hello",
            "statusNotification": true
        }))
        .unwrap();
        assert_eq!(request.status_notification, Some(true));
        assert!(NewMessage::from_request(request).is_ok());
    }

    #[test]
    fn test_delivery_state_names() {
        assert_eq!(
            serde_json::to_string(&DeliveryState::PendingSend).unwrap(),
            "\"pending-send\""
        );
        assert_eq!(
            serde_json::to_string(&DeliveryState::Delivered).unwrap(),
            "\"delivered\""
        );
    }

    #[test]
    fn test_message_id_parse() {
        let id = MessageId::generate();
        assert_eq!(MessageId::parse(&id.to_string()), Some(id));
        assert_eq!(MessageId::parse("12345"), None);
    }

    proptest! {
        #[test]
        fn prop_one_sending_status_per_recipient(
            recipients in prop::collection::vec("[0-9 ()+]{1,15}[0-9]", 1..40)
        ) {
            let new = NewMessage::new(sender(), Some("body".into()), Some(recipients.clone())).unwrap();
            let message = Message::create(new);

            prop_assert_eq!(message.statuses.len(), recipients.len());
            for (status, recipient) in message.statuses.iter().zip(&recipients) {
                prop_assert_eq!(&status.recipient, recipient);
                prop_assert_eq!(status.state, DeliveryState::Sending);
            }
        }
    }
}
