// tests/federated_test.rs
// Federated provisioning and the dev login strategy

use evently_backend::auth::{Credentials, ExternalProfile};
use evently_backend::config::Environment;
use evently_backend::users::{NewUser, Provider, Role};

mod common;

fn google_profile(id: &str, name: Option<&str>, email: Option<&str>) -> ExternalProfile {
    ExternalProfile {
        provider: Provider::Google,
        provider_id: id.to_string(),
        display_name: name.map(str::to_string),
        email: email.map(str::to_string),
        avatar_url: None,
    }
}

async fn user_count(pool: &sqlx::SqlitePool) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .unwrap();
    count
}

#[tokio::test]
async fn first_federated_login_provisions_an_account() {
    let db = common::test_db().await;
    let state = common::test_state(&db, Environment::Development);

    let auth = state
        .auth
        .authenticate(Credentials::Federated(google_profile(
            "g-123",
            Some("Jane Doe"),
            Some("jane@example.com"),
        )))
        .await
        .expect("federated login should succeed");

    assert!(auth.newly_provisioned);
    assert_eq!(auth.user.username, "jane-doe");
    assert_eq!(auth.user.email, "jane@example.com");
    assert_eq!(auth.user.provider, Provider::Google);
    assert_eq!(auth.user.provider_id.as_deref(), Some("g-123"));
    assert!(auth.user.password_hash.is_none());

    // First sight records a register, not a login.
    assert_eq!(common::activity_count(&db.pool, "register").await, 1);
    assert_eq!(common::activity_count(&db.pool, "login").await, 0);
}

#[tokio::test]
async fn returning_federated_login_reuses_and_refreshes() {
    let db = common::test_db().await;
    let state = common::test_state(&db, Environment::Development);

    let first = state
        .auth
        .authenticate(Credentials::Federated(google_profile(
            "g-456",
            Some("Sam Smith"),
            Some("sam@example.com"),
        )))
        .await
        .unwrap();

    // Same identity comes back with a changed email and avatar.
    let mut updated = google_profile("g-456", Some("Sam Smith"), Some("sam@new.example.com"));
    updated.avatar_url = Some("https://cdn.example.com/sam.png".to_string());

    let second = state
        .auth
        .authenticate(Credentials::Federated(updated))
        .await
        .unwrap();

    assert!(!second.newly_provisioned);
    assert_eq!(second.user.id, first.user.id);
    assert_eq!(second.user.email, "sam@new.example.com");
    assert_eq!(
        second.user.avatar_url.as_deref(),
        Some("https://cdn.example.com/sam.png")
    );
    assert_eq!(user_count(&db.pool).await, 1);
}

#[tokio::test]
async fn concurrent_first_logins_create_exactly_one_account() {
    let db = common::test_db().await;
    let state = common::test_state(&db, Environment::Development);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            state
                .auth
                .authenticate(Credentials::Federated(google_profile(
                    "g-race",
                    Some("Racer"),
                    Some("racer@example.com"),
                )))
                .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let auth = handle.await.unwrap().expect("every login should succeed");
        ids.push(auth.user.id);
    }

    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 1, "all logins should resolve to the same account");
    assert_eq!(user_count(&db.pool).await, 1);
}

#[tokio::test]
async fn username_collision_gets_a_provider_suffix() {
    let db = common::test_db().await;
    let state = common::test_state(&db, Environment::Development);

    // An unrelated local account already owns the derived username.
    state
        .users
        .create(NewUser {
            username: "jane-doe".to_string(),
            email: "taken@example.com".to_string(),
            ..NewUser::default()
        })
        .await
        .unwrap();

    let auth = state
        .auth
        .authenticate(Credentials::Federated(google_profile(
            "g-789xyz12",
            Some("Jane Doe"),
            Some("jane2@example.com"),
        )))
        .await
        .unwrap();

    assert_eq!(auth.user.username, "jane-doe-g-789xyz");
    assert_eq!(user_count(&db.pool).await, 2);
}

#[tokio::test]
async fn missing_profile_fields_are_synthesized() {
    let db = common::test_db().await;
    let state = common::test_state(&db, Environment::Development);

    // No display name: username derives from the email local part.
    let auth = state
        .auth
        .authenticate(Credentials::Federated(google_profile(
            "g-a",
            None,
            Some("quiet.person@example.com"),
        )))
        .await
        .unwrap();
    assert_eq!(auth.user.username, "quiet.person");

    // No email either: a placeholder is synthesized from the identity.
    let auth = state
        .auth
        .authenticate(Credentials::Federated(google_profile("g-b", None, None)))
        .await
        .unwrap();
    assert_eq!(auth.user.email, "g-b@google.local");
}

#[tokio::test]
async fn dev_login_provisions_and_promotes() {
    let db = common::test_db().await;
    let state = common::test_state(&db, Environment::Development);

    let auth = state
        .auth
        .authenticate(Credentials::Dev {
            email: "dev@example.com".to_string(),
            name: Some("Dev Person".to_string()),
            admin: false,
        })
        .await
        .unwrap();
    assert!(auth.newly_provisioned);
    assert_eq!(auth.user.provider, Provider::Dev);
    assert_eq!(auth.user.role, Role::User);
    assert_eq!(auth.user.username, "dev-person");

    // Same email again: reused, and the admin flag upgrades the role.
    let again = state
        .auth
        .authenticate(Credentials::Dev {
            email: "dev@example.com".to_string(),
            name: None,
            admin: true,
        })
        .await
        .unwrap();
    assert!(!again.newly_provisioned);
    assert_eq!(again.user.id, auth.user.id);
    assert_eq!(again.user.role, Role::Admin);
    assert_eq!(user_count(&db.pool).await, 1);
}
