//! Tests against a live PostgreSQL server configured in `configuration.yaml`.
//! Each test creates its own database and applies the migrations.

use std::net::TcpListener;
use std::sync::Arc;

use serde_json::{json, Value};
use sqlx::{Connection, Executor, PgConnection, PgPool, Row};
use token_auth::auth::PasswordHasher;
use token_auth::clock::SystemClock;
use token_auth::configuration::{get_configuration, DatabaseSettings};
use token_auth::error::{AppError, DatabaseError};
use token_auth::startup::run;
use token_auth::store::{PgUserStore, UserStore};

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let connection_pool = fresh_database().await;
    let jwt_config = get_configuration()
        .expect("Failed to read configuration.")
        .jwt;

    let server = run(
        listener,
        Arc::new(PgUserStore::new(connection_pool.clone())),
        jwt_config,
        PasswordHasher::new(4),
        Arc::new(SystemClock),
    )
    .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        db_pool: connection_pool,
    }
}

async fn fresh_database() -> PgPool {
    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = uuid::Uuid::new_v4().to_string();
    configure_database(&configuration.database).await
}

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");
    // Migrate database
    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

async fn stored_refresh_hash(pool: &PgPool, email: &str) -> Option<String> {
    sqlx::query("SELECT refresh_token_hash FROM users WHERE email = $1")
        .bind(email)
        .fetch_one(pool)
        .await
        .expect("Failed to fetch user")
        .get("refresh_token_hash")
}

// --- Store Tests ---

#[tokio::test]
async fn create_and_find_user() {
    let store = PgUserStore::new(fresh_database().await);

    let created = store.create_user("a@b.com", "hash").await.unwrap();
    assert!(!created.is_logged_in());

    let by_email = store.find_by_email("a@b.com").await.unwrap().unwrap();
    let by_id = store.find_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(by_email.id, created.id);
    assert_eq!(by_id.email, "a@b.com");
    assert_eq!(by_id.password_hash, "hash");

    assert!(store.find_by_email("nope@x.com").await.unwrap().is_none());
    assert!(store.find_by_id(created.id + 1).await.unwrap().is_none());
}

#[tokio::test]
async fn unique_violation_becomes_duplicate_email() {
    let pool = fresh_database().await;
    let store = PgUserStore::new(pool.clone());
    store.create_user("a@b.com", "hash").await.unwrap();

    let err = store.create_user("a@b.com", "other").await.unwrap_err();
    assert!(err.is_duplicate_email());

    let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM users")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("count");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn clear_refresh_hash_only_reports_actual_clears() {
    let store = PgUserStore::new(fresh_database().await);
    let user = store.create_user("a@b.com", "hash").await.unwrap();

    assert!(!store.clear_refresh_hash(user.id).await.unwrap());

    store.update_refresh_hash(user.id, "rt-hash").await.unwrap();
    let stored = store.find_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token_hash.as_deref(), Some("rt-hash"));

    assert!(store.clear_refresh_hash(user.id).await.unwrap());
    assert!(!store.clear_refresh_hash(user.id).await.unwrap());
    assert!(!store.clear_refresh_hash(user.id + 100).await.unwrap());

    let stored = store.find_by_id(user.id).await.unwrap().unwrap();
    assert!(!stored.is_logged_in());
}

#[tokio::test]
async fn update_refresh_hash_overwrites_and_bumps_updated_at() {
    let pool = fresh_database().await;
    let store = PgUserStore::new(pool.clone());
    let user = store.create_user("a@b.com", "hash").await.unwrap();

    store.update_refresh_hash(user.id, "first").await.unwrap();
    store.update_refresh_hash(user.id, "second").await.unwrap();

    let row = sqlx::query(
        "SELECT refresh_token_hash, updated_at >= created_at AS bumped FROM users WHERE id = $1",
    )
    .bind(user.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(row.get::<Option<String>, _>("refresh_token_hash").as_deref(), Some("second"));
    assert!(row.get::<bool, _>("bumped"));
}

#[tokio::test]
async fn update_refresh_hash_for_unknown_user_fails() {
    let store = PgUserStore::new(fresh_database().await);

    let err = store.update_refresh_hash(42, "rt-hash").await.unwrap_err();
    assert!(matches!(err, AppError::Database(DatabaseError::NotFound(_))));
}

// --- HTTP Flow Tests ---

#[tokio::test]
async fn duplicate_signup_returns_409_against_postgres() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let body = json!({"email": "a@b.com", "password": "secret"});

    let first = client
        .post(&format!("{}/auth/local/signup", &app.address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, first.status().as_u16());
    assert!(stored_refresh_hash(&app.db_pool, "a@b.com").await.is_some());

    let second = client
        .post(&format!("{}/auth/local/signup", &app.address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(409, second.status().as_u16());
}

#[tokio::test]
async fn refresh_rotation_and_double_logout_against_postgres() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let p1: Value = client
        .post(&format!("{}/auth/local/signup", &app.address))
        .json(&json!({"email": "a@b.com", "password": "secret"}))
        .send()
        .await
        .expect("Failed to execute request.")
        .json()
        .await
        .expect("Failed to parse response");
    let p1_refresh = p1["refresh_token"].as_str().unwrap().to_string();
    let hash_after_signup = stored_refresh_hash(&app.db_pool, "a@b.com").await;

    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .bearer_auth(&p1_refresh)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let p2: Value = response.json().await.unwrap();
    assert_ne!(stored_refresh_hash(&app.db_pool, "a@b.com").await, hash_after_signup);

    let stale = client
        .post(&format!("{}/auth/refresh", &app.address))
        .bearer_auth(&p1_refresh)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(403, stale.status().as_u16());

    let access = p2["access_token"].as_str().unwrap();
    for _ in 0..2 {
        let response = client
            .post(&format!("{}/auth/logout", &app.address))
            .bearer_auth(access)
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(200, response.status().as_u16());
    }
    assert!(stored_refresh_hash(&app.db_pool, "a@b.com").await.is_none());
}

