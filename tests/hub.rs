mod common;

use common::{assert_silent, recv_json, send_json, spawn_hub};
use futures::SinkExt;
use serde_json::json;

fn post(title: &str, user: &str) -> serde_json::Value {
    json!({
        "type": "post",
        "title": title,
        "postcontent": "content",
        "posttime": "2024-01-01 12:00",
        "user": user,
    })
}

fn register(username: &str, email: &str, password: &str) -> serde_json::Value {
    json!({
        "type": "register",
        "username": username,
        "age": "30",
        "email": email,
        "gender": "f",
        "firstname": "Alice",
        "lastname": "Liddell",
        "password": password,
    })
}

#[test_log::test(tokio::test)]
async fn test_post_reaches_every_connection_once() {
    let hub = spawn_hub().await;
    let mut alice = hub.connect().await;
    let mut bob = hub.connect().await;

    send_json(&mut alice, post("Hello", "alice")).await;

    for client in [&mut alice, &mut bob] {
        let received = recv_json(client).await;
        assert_eq!(received["tipo"], "post");
        assert_eq!(received["title"], "Hello");
        assert_eq!(received["user"], "alice");
        assert_silent(client).await;
    }
}

#[test_log::test(tokio::test)]
async fn test_comment_is_broadcast_with_kind_tag() {
    let hub = spawn_hub().await;
    let mut alice = hub.connect().await;
    let mut bob = hub.connect().await;

    send_json(
        &mut bob,
        json!({
            "type": "comment",
            "commentcontent": "Nice post",
            "user": "bob",
            "commenttime": "2024-01-01 12:05",
        }),
    )
    .await;

    for client in [&mut alice, &mut bob] {
        let received = recv_json(client).await;
        assert_eq!(received["tipo"], "comment");
        assert_eq!(received["commentcontent"], "Nice post");
    }
}

#[test_log::test(tokio::test)]
async fn test_back_to_back_posts_are_all_delivered_in_order() {
    let hub = spawn_hub().await;
    let mut alice = hub.connect().await;
    let mut bob = hub.connect().await;

    for i in 0..5 {
        send_json(&mut alice, post(&format!("post {}", i), "alice")).await;
    }

    for client in [&mut alice, &mut bob] {
        for i in 0..5 {
            assert_eq!(recv_json(client).await["title"], format!("post {}", i));
        }
        assert_silent(client).await;
    }
}

#[test_log::test(tokio::test)]
async fn test_bad_frames_do_not_close_the_connection() {
    let hub = spawn_hub().await;
    let mut alice = hub.connect().await;

    send_json(&mut alice, json!({"type": "poll"})).await;
    send_json(&mut alice, json!({"type": "post", "title": "missing fields"})).await;
    alice
        .send(tokio_tungstenite::tungstenite::Message::Text("{not json".into()))
        .await
        .unwrap();

    send_json(&mut alice, post("still here", "alice")).await;
    assert_eq!(recv_json(&mut alice).await["title"], "still here");
    assert_eq!(hub.state.registry.connection_count().await, 1);
}

#[test_log::test(tokio::test)]
async fn test_registration_reports_every_violation() {
    let hub = spawn_hub().await;
    hub.store.insert("carol", "taken@example.com", "password");
    let mut client = hub.connect().await;

    send_json(&mut client, register("ab c", "taken@example.com", "x")).await;

    let response = recv_json(&mut client).await;
    assert_eq!(
        response,
        json!({
            "usernameLength": true,
            "usernameSpace": true,
            "usernameDuplicate": false,
            "emailDuplicate": true,
            "passwordLength": true,
            "tipo": "formValidation",
        })
    );
    assert!(hub.store.created.lock().unwrap().is_empty());
    assert_silent(&mut client).await;
}

#[test_log::test(tokio::test)]
async fn test_successful_registration_creates_user_and_broadcasts() {
    let hub = spawn_hub().await;
    let mut alice = hub.connect().await;
    let mut bob = hub.connect().await;

    send_json(&mut alice, register("alice", "alice@example.com", "secret")).await;

    let validation = recv_json(&mut alice).await;
    assert_eq!(validation["tipo"], "formValidation");
    for flag in ["usernameLength", "usernameSpace", "usernameDuplicate", "emailDuplicate", "passwordLength"] {
        assert_eq!(validation[flag], false, "{} should pass", flag);
    }

    for client in [&mut alice, &mut bob] {
        let event = recv_json(client).await;
        assert_eq!(event["tipo"], "registration");
        assert_eq!(event["username"], "alice");
        assert!(event.get("password").is_none());
    }
    assert_silent(&mut bob).await;

    let created = hub.store.created.lock().unwrap().clone();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].username, "alice");
    assert_ne!(created[0].password_hash, "secret");
}

#[test_log::test(tokio::test)]
async fn test_login_flows() {
    let hub = spawn_hub().await;
    hub.store.insert("alice", "alice@example.com", "secret");
    let mut client = hub.connect().await;

    send_json(&mut client, json!({"type": "login", "loginUsername": "ghost", "loginPassword": "secret"})).await;
    assert_eq!(
        recv_json(&mut client).await,
        json!({
            "invalidUsername": true,
            "invalidPassword": false,
            "successfulLogin": false,
            "tipo": "loginValidation",
        })
    );

    send_json(&mut client, json!({"type": "login", "loginUsername": "alice", "loginPassword": "wrong"})).await;
    assert_eq!(
        recv_json(&mut client).await,
        json!({
            "invalidUsername": false,
            "invalidPassword": true,
            "successfulLogin": false,
            "tipo": "loginValidation",
        })
    );
    assert_eq!(hub.state.registry.connection_for("alice").await, None);

    send_json(&mut client, json!({"type": "login", "loginUsername": "alice", "loginPassword": "secret"})).await;
    let response = recv_json(&mut client).await;
    assert_eq!(response["successfulLogin"], true);
    assert!(hub.state.registry.connection_for("alice").await.is_some());
    assert_eq!(hub.state.registry.authenticated_count().await, 1);
}

#[test_log::test(tokio::test)]
async fn test_disconnect_unregisters_and_clears_binding() {
    let hub = spawn_hub().await;
    hub.store.insert("alice", "alice@example.com", "secret");
    let mut alice = hub.connect().await;
    let mut bob = hub.connect().await;

    send_json(&mut alice, json!({"type": "login", "loginUsername": "alice", "loginPassword": "secret"})).await;
    assert_eq!(recv_json(&mut alice).await["successfulLogin"], true);

    alice.close(None).await.unwrap();
    hub.wait_for_connections(1).await;
    assert_eq!(hub.state.registry.connection_for("alice").await, None);

    // Remaining connections keep receiving broadcasts
    send_json(&mut bob, post("after close", "bob")).await;
    assert_eq!(recv_json(&mut bob).await["title"], "after close");
    assert_silent(&mut bob).await;
}

#[test_log::test(tokio::test)]
async fn test_dropped_socket_is_cleaned_up() {
    let hub = spawn_hub().await;
    let alice = hub.connect().await;
    let mut bob = hub.connect().await;

    drop(alice);
    hub.wait_for_connections(1).await;

    send_json(&mut bob, post("still delivered", "bob")).await;
    assert_eq!(recv_json(&mut bob).await["title"], "still delivered");
}

#[test_log::test(tokio::test)]
async fn test_login_in_flight_at_disconnect_leaves_no_binding() {
    let hub = spawn_hub().await;
    hub.store.insert("alice", "alice@example.com", "secret");

    for _ in 0..5 {
        let mut alice = hub.connect().await;
        send_json(&mut alice, json!({"type": "login", "loginUsername": "alice", "loginPassword": "secret"})).await;
        drop(alice);
        hub.wait_for_connections(0).await;

        // Give any still-running session a chance to bind late
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(hub.state.registry.connection_for("alice").await, None);
        assert_eq!(hub.state.registry.authenticated_count().await, 0);
    }
}
