use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// The four inbound message kinds, keyed by the wire `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Post,
    Comment,
    Registration,
    Login,
}

impl MessageKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "post" => Some(Self::Post),
            "comment" => Some(Self::Comment),
            "register" => Some(Self::Registration),
            "login" => Some(Self::Login),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
            Self::Registration => "register",
            Self::Login => "login",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostPayload {
    pub title: String,
    #[serde(rename = "postcontent")]
    pub body: String,
    #[serde(rename = "posttime")]
    pub created_at: String,
    #[serde(rename = "user")]
    pub author: String,
    #[serde(default)]
    pub tipo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentPayload {
    #[serde(rename = "commentcontent")]
    pub body: String,
    #[serde(rename = "user")]
    pub author: String,
    #[serde(rename = "commenttime")]
    pub created_at: String,
    #[serde(default)]
    pub tipo: String,
}

/// A registration request. When re-broadcast the password is left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationPayload {
    pub username: String,
    pub age: String,
    pub email: String,
    pub gender: String,
    #[serde(rename = "firstname")]
    pub first_name: String,
    #[serde(rename = "lastname")]
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub tipo: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginPayload {
    #[serde(rename = "loginUsername")]
    pub username: String,
    #[serde(rename = "loginPassword")]
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct Discriminant {
    #[serde(rename = "type")]
    kind: String,
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Post(PostPayload),
    Comment(CommentPayload),
    Registration(RegistrationPayload),
    Login(LoginPayload),
}

impl Envelope {
    /// Reads the `type` field first, then decodes the whole frame as the
    /// payload for that kind.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let discriminant: Discriminant = serde_json::from_slice(data)
            .map_err(|e| DecodeError::MalformedEnvelope(e.to_string()))?;

        let kind = MessageKind::from_tag(&discriminant.kind)
            .ok_or(DecodeError::UnrecognizedKind(discriminant.kind))?;

        let payload_error = |e: serde_json::Error| DecodeError::PayloadDecodeError {
            kind,
            reason: e.to_string(),
        };

        let envelope = match kind {
            MessageKind::Post => Envelope::Post(serde_json::from_slice(data).map_err(payload_error)?),
            MessageKind::Comment => {
                Envelope::Comment(serde_json::from_slice(data).map_err(payload_error)?)
            }
            MessageKind::Registration => {
                Envelope::Registration(serde_json::from_slice(data).map_err(payload_error)?)
            }
            MessageKind::Login => Envelope::Login(serde_json::from_slice(data).map_err(payload_error)?),
        };

        Ok(envelope)
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Envelope::Post(_) => MessageKind::Post,
            Envelope::Comment(_) => MessageKind::Comment,
            Envelope::Registration(_) => MessageKind::Registration,
            Envelope::Login(_) => MessageKind::Login,
        }
    }
}

/// Per-field outcome of the registration checks. A `true` flag marks a
/// violated rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormValidation {
    pub username_length: bool,
    pub username_space: bool,
    pub username_duplicate: bool,
    pub email_duplicate: bool,
    pub password_length: bool,
    pub tipo: String,
}

impl FormValidation {
    pub fn new() -> Self {
        Self {
            username_length: false,
            username_space: false,
            username_duplicate: false,
            email_duplicate: false,
            password_length: false,
            tipo: "formValidation".to_string(),
        }
    }

    pub fn passed(&self) -> bool {
        !(self.username_length
            || self.username_space
            || self.username_duplicate
            || self.email_duplicate
            || self.password_length)
    }
}

impl Default for FormValidation {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginValidation {
    pub invalid_username: bool,
    pub invalid_password: bool,
    pub successful_login: bool,
    pub tipo: String,
}

impl LoginValidation {
    fn with_flags(invalid_username: bool, invalid_password: bool, successful_login: bool) -> Self {
        Self {
            invalid_username,
            invalid_password,
            successful_login,
            tipo: "loginValidation".to_string(),
        }
    }

    pub fn invalid_username() -> Self {
        Self::with_flags(true, false, false)
    }

    pub fn invalid_password() -> Self {
        Self::with_flags(false, true, false)
    }

    pub fn success() -> Self {
        Self::with_flags(false, false, true)
    }
}

/// Sent when a request could not be completed for reasons other than
/// validation, e.g. the datastore is unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub tipo: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            tipo: "error".to_string(),
            message: message.into(),
        }
    }
}
