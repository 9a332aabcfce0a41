use serde::Serialize;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, TransportError};
use crate::websocket::message::{
    CommentPayload, Envelope, ErrorResponse, LoginPayload, PostPayload, RegistrationPayload,
};
use crate::websocket::registry::{ConnectionHandle, ConnectionId};
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Upgraded, nothing handled yet.
    Open,
    /// Waiting for the next frame.
    Idle,
    /// A login is being checked.
    Authenticating,
    Closed,
}

/// Per-connection session: decodes one frame at a time and dispatches it.
pub struct Connection {
    handle: ConnectionHandle,
    state: AppState,
    session: SessionState,
    username: Option<String>,
}

impl Connection {
    pub fn new(handle: ConnectionHandle, state: AppState) -> Self {
        Self {
            handle,
            state,
            session: SessionState::Open,
            username: None,
        }
    }

    /// Handles one inbound frame. Only transport failures and close frames
    /// come back as errors; everything else is logged and the session keeps
    /// going.
    pub async fn handle_message(&mut self, msg: Message) -> Result<(), TransportError> {
        let data = match msg {
            Message::Text(text) => text.into_bytes(),
            Message::Binary(bin) => bin,
            Message::Close(frame) => {
                info!("Client initiated close for connection {}: {:?}", self.id(), frame);
                return Err(TransportError::Closed);
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                // tungstenite queues the pong reply itself
                debug!("Control frame on connection {}", self.id());
                return Ok(());
            }
        };

        let result = match Envelope::decode(&data) {
            Ok(envelope) => {
                debug!("Received {} on connection {}", envelope.kind(), self.id());
                self.dispatch(envelope).await
            }
            Err(e) => {
                warn!("Dropping frame from connection {}: {}", self.id(), e);
                Ok(())
            }
        };

        self.session = SessionState::Idle;
        result
    }

    async fn dispatch(&mut self, envelope: Envelope) -> Result<(), TransportError> {
        let result = match envelope {
            Envelope::Post(post) => self.handle_post(post).await,
            Envelope::Comment(comment) => self.handle_comment(comment).await,
            Envelope::Registration(registration) => self.handle_registration(registration).await,
            Envelope::Login(login) => self.handle_login(login).await,
        };

        match result {
            Ok(()) => Ok(()),
            Err(AppError::TransportError(e)) => Err(e),
            Err(e) => {
                error!("Request on connection {} failed: {}", self.id(), e);
                self.send_json(&ErrorResponse::new(client_message(&e)))
            }
        }
    }

    async fn handle_post(&self, mut post: PostPayload) -> Result<(), AppError> {
        post.tipo = "post".to_string();
        self.state.broadcast.publish_post(post).await
    }

    async fn handle_comment(&self, mut comment: CommentPayload) -> Result<(), AppError> {
        comment.tipo = "comment".to_string();
        self.state.broadcast.publish_comment(comment).await
    }

    async fn handle_registration(&self, mut registration: RegistrationPayload) -> Result<(), AppError> {
        let auth = &self.state.auth_service;

        let validation = auth.validate_registration(&registration).await?;
        self.send_json(&validation)?;

        if !validation.passed() {
            return Ok(());
        }

        auth.create_user(&registration).await?;

        registration.tipo = "registration".to_string();
        self.state.broadcast.publish_registration(registration).await
    }

    async fn handle_login(&mut self, login: LoginPayload) -> Result<(), AppError> {
        self.session = SessionState::Authenticating;

        let result = self.state.auth_service.login(&login).await?;
        if result.successful_login {
            self.state.registry.bind_identity(&login.username, self.id()).await;
            self.username = Some(login.username);
        }

        self.send_json(&result)?;
        Ok(())
    }

    fn send_json<T: Serialize>(&self, value: &T) -> Result<(), TransportError> {
        let text = serde_json::to_string(value)
            .map_err(|e| TransportError::Send(format!("Failed to serialize message: {}", e)))?;
        self.handle.send_text(text)
    }

    pub fn close(&mut self) {
        self.session = SessionState::Closed;
        info!(
            "Session on connection {} closed (user: {})",
            self.id(),
            self.username.as_deref().unwrap_or("anonymous")
        );
    }

    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    pub fn session_state(&self) -> SessionState {
        self.session
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

/// What the client is told when a request fails. Internal details stay in
/// the log.
fn client_message(err: &AppError) -> &'static str {
    match err {
        AppError::PersistenceError(_) => "The user database is unavailable, please try again",
        AppError::HashingError(_) => "Registration could not be completed",
        _ => "Internal server error",
    }
}
