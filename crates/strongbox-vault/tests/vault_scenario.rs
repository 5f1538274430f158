// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: registration, lockout, and encrypted entries against a
//! file-backed database and root key.

use std::path::Path;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use strongbox_config::model::{KdfConfig, StorageConfig};
use strongbox_core::{
    AccountState, EntryUpdate, LoginOutcome, NewEntry, RegisterOutcome, Session,
};
use strongbox_storage::{Database, schema};
use strongbox_vault::{AuthService, KeyStore, SecretStore};
use tempfile::TempDir;

struct Harness {
    auth: AuthService,
    secrets: SecretStore,
    db: Database,
}

async fn open(dir: &Path) -> Harness {
    let keystore = Arc::new(KeyStore::open(dir.join("root_key.json")).unwrap());
    let db = Database::open_with(&StorageConfig {
        database_path: dir.join("strongbox.db").to_string_lossy().into_owned(),
        ..StorageConfig::default()
    })
    .await
    .unwrap();
    let kdf = KdfConfig {
        memory_cost: 8192,
        iterations: 1,
        parallelism: 1,
    };
    Harness {
        auth: AuthService::new(db.clone(), keystore, &kdf),
        secrets: SecretStore::new(db.clone()),
        db,
    }
}

fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

async fn login(auth: &AuthService, user: &str, password: &str) -> Session {
    match auth.login(user, &secret(password)).await.unwrap() {
        LoginOutcome::Authenticated(session) => session,
        other => panic!("expected session for {user}, got {other:?}"),
    }
}

#[tokio::test]
async fn alice_is_locked_after_five_wrong_passwords() {
    let dir = TempDir::new().unwrap();
    let h = open(dir.path()).await;

    assert!(matches!(
        h.auth.register("alice", &secret("Secr3t!")).await.unwrap(),
        RegisterOutcome::Registered(_)
    ));

    for expected in [4u32, 3, 2, 1] {
        match h.auth.login("alice", &secret("wrong")).await.unwrap() {
            LoginOutcome::InvalidCredentials { remaining_attempts } => {
                assert_eq!(remaining_attempts, expected)
            }
            other => panic!("expected InvalidCredentials, got {other:?}"),
        }
        let status = h.auth.account_status("alice").await.unwrap().unwrap();
        assert_eq!(status.state, AccountState::Active);
        assert_eq!(status.failed_attempts, 5 - expected);
    }

    assert!(matches!(
        h.auth.login("alice", &secret("wrong")).await.unwrap(),
        LoginOutcome::LockedNow
    ));
    let status = h.auth.account_status("alice").await.unwrap().unwrap();
    assert_eq!(status.state, AccountState::Locked);
    assert_eq!(status.failed_attempts, 5);

    // Sticky: the correct password no longer works and the counter is frozen.
    for password in ["Secr3t!", "wrong"] {
        assert!(matches!(
            h.auth.login("alice", &secret(password)).await.unwrap(),
            LoginOutcome::Locked
        ));
    }
    assert_eq!(
        h.auth.account_status("alice").await.unwrap().unwrap().failed_attempts,
        5
    );
}

#[tokio::test]
async fn lockout_survives_restart() {
    let dir = TempDir::new().unwrap();
    {
        let h = open(dir.path()).await;
        h.auth.register("alice", &secret("Secr3t!")).await.unwrap();
        for _ in 0..5 {
            h.auth.login("alice", &secret("wrong")).await.unwrap();
        }
        h.db.close().await.unwrap();
    }

    let h = open(dir.path()).await;
    assert!(matches!(
        h.auth.login("alice", &secret("Secr3t!")).await.unwrap(),
        LoginOutcome::Locked
    ));
}

#[tokio::test]
async fn entries_round_trip_across_restart() {
    let dir = TempDir::new().unwrap();
    let id = {
        let h = open(dir.path()).await;
        h.auth.register("alice", &secret("Secr3t!")).await.unwrap();
        let session = login(&h.auth, "alice", "Secr3t!").await;
        let id = h
            .secrets
            .add(
                &session,
                NewEntry {
                    service: "github".into(),
                    account_login: "alice@example.com".into(),
                    account_password: secret("gh-token-value"),
                    expire_date: None,
                },
            )
            .await
            .unwrap();
        h.db.close().await.unwrap();
        id
    };

    let h = open(dir.path()).await;
    let session = login(&h.auth, "alice", "Secr3t!").await;
    let listed = h.secrets.list(&session).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].service, "github");

    let revealed = h.secrets.reveal(&session, id).await.unwrap().unwrap();
    assert_eq!(revealed.account_password.expose_secret(), "gh-token-value");
}

#[tokio::test]
async fn tenants_are_isolated() {
    let dir = TempDir::new().unwrap();
    let h = open(dir.path()).await;
    h.auth.register("alice", &secret("a-pass")).await.unwrap();
    h.auth.register("bob", &secret("b-pass")).await.unwrap();
    let alice = login(&h.auth, "alice", "a-pass").await;
    let bob = login(&h.auth, "bob", "b-pass").await;

    let entry = NewEntry {
        service: "bank".into(),
        account_login: "alice".into(),
        account_password: secret("alice-bank"),
        expire_date: None,
    };
    let id = h.secrets.add(&alice, entry).await.unwrap();

    assert!(h.secrets.list(&bob).await.unwrap().is_empty());
    assert!(h.secrets.reveal(&bob, id).await.unwrap().is_none());
    let update = EntryUpdate {
        account_password: Some(secret("hijacked")),
        ..Default::default()
    };
    assert!(!h.secrets.update(&bob, id, update).await.unwrap());
    assert!(!h.secrets.delete(&bob, id).await.unwrap());

    let revealed = h.secrets.reveal(&alice, id).await.unwrap().unwrap();
    assert_eq!(revealed.account_password.expose_secret(), "alice-bank");
}

#[tokio::test]
async fn list_is_newest_first() {
    let dir = TempDir::new().unwrap();
    let h = open(dir.path()).await;
    h.auth.register("alice", &secret("pw")).await.unwrap();
    let session = login(&h.auth, "alice", "pw").await;

    let mut ids = Vec::new();
    for service in ["one", "two", "three"] {
        let entry = NewEntry {
            service: service.into(),
            account_login: "alice".into(),
            account_password: secret(service),
            expire_date: None,
        };
        ids.push(h.secrets.add(&session, entry).await.unwrap());
    }
    ids.reverse();

    let listed: Vec<_> = h
        .secrets
        .list(&session)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(listed, ids);

    assert!(h.secrets.delete(&session, ids[0]).await.unwrap());
    assert!(!h.secrets.delete(&session, ids[0]).await.unwrap());
    assert_eq!(h.secrets.list(&session).await.unwrap().len(), 2);
}

#[tokio::test]
async fn schema_ensures_are_idempotent_on_a_live_store() {
    let dir = TempDir::new().unwrap();
    let h = open(dir.path()).await;
    let RegisterOutcome::Registered(id) = h.auth.register("alice", &secret("pw")).await.unwrap()
    else {
        panic!("registration failed");
    };
    let session = login(&h.auth, "alice", "pw").await;
    let entry = NewEntry {
        service: "svc".into(),
        account_login: "a".into(),
        account_password: secret("x"),
        expire_date: None,
    };
    h.secrets.add(&session, entry).await.unwrap();

    for _ in 0..3 {
        schema::ensure_user_table(&h.db).await.unwrap();
        schema::ensure_entry_store_for(&h.db, id).await.unwrap();
    }
    assert_eq!(h.secrets.list(&session).await.unwrap().len(), 1);
}
