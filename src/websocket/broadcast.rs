//! Broadcast fan-out.
//!
//! Session handlers publish posts, comments and completed registrations onto
//! three single-slot channels. One [`FanOutEngine`] per process drains them
//! and writes each value to every connection in the registry. A full slot
//! makes the publisher wait, which is the only backpressure in the hub.

use std::sync::Arc;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::websocket::message::{CommentPayload, MessageKind, PostPayload, RegistrationPayload};
use crate::websocket::registry::ConnectionRegistry;

const CHANNEL_CAPACITY: usize = 1;

/// Publishing half, cloned into every session.
#[derive(Debug, Clone)]
pub struct BroadcastSender {
    posts: mpsc::Sender<PostPayload>,
    comments: mpsc::Sender<CommentPayload>,
    registrations: mpsc::Sender<RegistrationPayload>,
}

/// Draining half, owned by the fan-out engine.
#[derive(Debug)]
pub struct BroadcastReceivers {
    posts: mpsc::Receiver<PostPayload>,
    comments: mpsc::Receiver<CommentPayload>,
    registrations: mpsc::Receiver<RegistrationPayload>,
}

pub fn channels() -> (BroadcastSender, BroadcastReceivers) {
    let (posts_tx, posts_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (comments_tx, comments_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (registrations_tx, registrations_rx) = mpsc::channel(CHANNEL_CAPACITY);

    (
        BroadcastSender {
            posts: posts_tx,
            comments: comments_tx,
            registrations: registrations_tx,
        },
        BroadcastReceivers {
            posts: posts_rx,
            comments: comments_rx,
            registrations: registrations_rx,
        },
    )
}

fn engine_gone(kind: MessageKind) -> AppError {
    AppError::InternalError(format!("broadcast channel for {} is closed", kind))
}

impl BroadcastSender {
    pub async fn publish_post(&self, post: PostPayload) -> Result<(), AppError> {
        self.posts
            .send(post)
            .await
            .map_err(|_| engine_gone(MessageKind::Post))
    }

    pub async fn publish_comment(&self, comment: CommentPayload) -> Result<(), AppError> {
        self.comments
            .send(comment)
            .await
            .map_err(|_| engine_gone(MessageKind::Comment))
    }

    pub async fn publish_registration(&self, registration: RegistrationPayload) -> Result<(), AppError> {
        self.registrations
            .send(registration)
            .await
            .map_err(|_| engine_gone(MessageKind::Registration))
    }
}

pub struct FanOutEngine {
    registry: Arc<ConnectionRegistry>,
    receivers: BroadcastReceivers,
}

impl FanOutEngine {
    pub fn new(registry: Arc<ConnectionRegistry>, receivers: BroadcastReceivers) -> Self {
        Self { registry, receivers }
    }

    /// Runs until every sender has been dropped.
    pub async fn run(mut self) {
        info!("Broadcast fan-out engine started");

        loop {
            let (kind, encoded) = tokio::select! {
                Some(post) = self.receivers.posts.recv() => (MessageKind::Post, encode(&post)),
                Some(comment) = self.receivers.comments.recv() => (MessageKind::Comment, encode(&comment)),
                Some(registration) = self.receivers.registrations.recv() => {
                    (MessageKind::Registration, encode(&registration))
                }
                else => break,
            };

            match encoded {
                Ok(text) => {
                    self.deliver(kind, &text).await;
                }
                Err(e) => error!("Failed to serialize {} broadcast: {}", kind, e),
            }
        }

        info!("Broadcast fan-out engine stopped");
    }

    /// Writes `text` to every registered connection and returns how many
    /// accepted it. A failed connection is skipped; the rest still get it.
    pub async fn deliver(&self, kind: MessageKind, text: &str) -> usize {
        let snapshot = self.registry.snapshot().await;
        let mut delivered = 0;

        for handle in &snapshot {
            match handle.send_text(text) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Failed to broadcast {} to connection {}: {}", kind, handle.id(), e),
            }
        }

        debug!("Broadcast {} to {}/{} connections", kind, delivered, snapshot.len());
        delivered
    }
}

fn encode<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}
