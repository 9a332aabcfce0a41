#![allow(dead_code)]

use async_trait::async_trait;
use forum_hub::error::PersistenceError;
use forum_hub::{AppState, CredentialHasher, NewUser, Settings, UserStore, WebSocketServer};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// In-memory user store keyed by username.
pub struct MemoryStore {
    users: Mutex<HashMap<String, NewUser>>,
    hasher: CredentialHasher,
    pub created: Mutex<Vec<NewUser>>,
}

impl MemoryStore {
    pub fn new(settings: &Settings) -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            hasher: CredentialHasher::new(&settings.hashing).expect("valid hashing params"),
            created: Mutex::new(Vec::new()),
        }
    }

    /// Seeds a user with a properly hashed password.
    pub fn insert(&self, username: &str, email: &str, password: &str) {
        let user = NewUser {
            username: username.to_string(),
            age: "30".to_string(),
            gender: "x".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password_hash: self.hasher.hash_blocking(password).expect("hash"),
            email: email.to_string(),
        };
        self.users.lock().unwrap().insert(username.to_string(), user);
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn user_exists(&self, username: &str) -> Result<bool, PersistenceError> {
        Ok(self.users.lock().unwrap().contains_key(username))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, PersistenceError> {
        Ok(self.users.lock().unwrap().values().any(|u| u.email == email))
    }

    async fn correct_password(&self, username: &str, password: &str) -> Result<bool, PersistenceError> {
        let hash = match self.users.lock().unwrap().get(username) {
            Some(user) => user.password_hash.clone(),
            None => return Ok(false),
        };
        Ok(self.hasher.verify(password, &hash).await)
    }

    async fn register_user(&self, user: &NewUser) -> Result<(), PersistenceError> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(&user.username) {
            return Err(PersistenceError::Duplicate);
        }
        users.insert(user.username.clone(), user.clone());
        self.created.lock().unwrap().push(user.clone());
        Ok(())
    }
}

pub struct TestHub {
    pub url: String,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

/// Starts a hub with one fan-out engine on an ephemeral port.
pub async fn spawn_hub() -> TestHub {
    let settings = Settings::new_for_test().expect("Failed to load test config");
    let store = Arc::new(MemoryStore::new(&settings));
    let (state, engine) = AppState::new(settings, store.clone()).expect("Failed to build state");
    tokio::spawn(engine.run());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Arc::new(WebSocketServer::new(state.clone()));
    tokio::spawn(server.run(listener));

    TestHub {
        url: format!("ws://{}", addr),
        state,
        store,
    }
}

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

impl TestHub {
    /// Connects a client and waits until the server has registered it.
    pub async fn connect(&self) -> Client {
        let before = self.state.registry.connection_count().await;
        let (ws, _) = connect_async(self.url.as_str()).await.expect("Failed to connect");
        self.wait_for_connections(before + 1).await;
        ws
    }

    pub async fn wait_for_connections(&self, expected: usize) {
        timeout(RECV_TIMEOUT, async {
            while self.state.registry.connection_count().await != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("registry never reached {} connections", expected));
    }
}

pub async fn send_json(client: &mut Client, value: Value) {
    client
        .send(Message::Text(value.to_string()))
        .await
        .expect("Failed to send");
}

/// Next text frame as JSON, skipping control frames.
pub async fn recv_json(client: &mut Client) -> Value {
    loop {
        let frame = timeout(RECV_TIMEOUT, client.next())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Stream ended")
            .expect("Read failed");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).expect("Invalid JSON from server");
        }
    }
}

/// Asserts nothing arrives within a short window.
pub async fn assert_silent(client: &mut Client) {
    if let Ok(Some(Ok(Message::Text(text)))) =
        timeout(Duration::from_millis(200), client.next()).await
    {
        panic!("Unexpected frame: {}", text);
    }
}
