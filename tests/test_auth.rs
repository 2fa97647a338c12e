use chrono::{Duration, Utc};
use sheet_filter::auth::{
    AuthError, SessionCodec, SessionCookie, SessionKey, UserStore, current_user, login, logout,
};
use sheet_filter::config::AppConfig;
use std::path::Path;
use tempfile::tempdir;

fn config_in(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.users = dir.join("users.json");
    config.storage.session_token = dir.join("state/session");
    config.storage.session_key = dir.join("state/session.key");
    config
}

#[test]
fn test_register_and_verify() {
    let dir = tempdir().expect("temp dir");
    let users = UserStore::new(dir.path().join("users.json"));

    users.register("ana", "s3cret").expect("register");
    assert!(users.verify("ana", "s3cret"));
    assert!(!users.verify("ana", "wrong"));
    assert!(!users.verify("bob", "s3cret"));
}

#[test]
fn test_register_rejects_empty_fields_and_duplicates() {
    let dir = tempdir().expect("temp dir");
    let users = UserStore::new(dir.path().join("users.json"));

    assert!(matches!(
        users.register("", "pw"),
        Err(AuthError::EmptyCredentials)
    ));
    assert!(matches!(
        users.register("ana", ""),
        Err(AuthError::EmptyCredentials)
    ));

    users.register("ana", "pw").expect("register");
    assert!(matches!(
        users.register("ana", "other"),
        Err(AuthError::UsernameTaken(_))
    ));
    assert!(users.verify("ana", "pw"));
}

#[test]
fn test_same_password_hashes_differently_per_user() {
    let dir = tempdir().expect("temp dir");
    let users = UserStore::new(dir.path().join("users.json"));
    users.register("ana", "pw").expect("register");
    users.register("bob", "pw").expect("register");

    let all = users.load();
    assert_ne!(all["ana"].password, all["bob"].password);
}

#[test]
fn test_token_round_trip_and_expiry() {
    let codec = SessionCodec::new(SessionKey::generate(), 7);
    let issued_at = Utc::now();
    let token = codec.issue("ana", issued_at).expect("issue");

    assert_eq!(codec.validate(&token, issued_at), Some("ana".to_string()));
    assert_eq!(
        codec.validate(&token, issued_at + Duration::days(6)),
        Some("ana".to_string())
    );
    assert_eq!(codec.validate(&token, issued_at + Duration::days(8)), None);
}

#[test]
fn test_token_from_another_key_or_tampered_is_rejected() {
    let codec = SessionCodec::new(SessionKey::generate(), 7);
    let token = codec.issue("ana", Utc::now()).expect("issue");

    let other = SessionCodec::new(SessionKey::generate(), 7);
    assert_eq!(other.validate(&token, Utc::now()), None);

    let mut tampered = token.into_bytes();
    let last = tampered.len() - 1;
    tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).expect("ascii");
    assert_eq!(codec.validate(&tampered, Utc::now()), None);
}

#[test]
fn test_login_persists_session_until_logout() {
    let dir = tempdir().expect("temp dir");
    let config = config_in(dir.path());
    UserStore::new(&config.storage.users)
        .register("ana", "pw")
        .expect("register");

    assert_eq!(current_user(&config), None);
    assert!(matches!(
        login(&config, "ana", "nope"),
        Err(AuthError::InvalidCredentials)
    ));
    assert_eq!(current_user(&config), None);

    login(&config, "ana", "pw").expect("login");
    assert_eq!(current_user(&config), Some("ana".to_string()));

    logout(&config).expect("logout");
    assert_eq!(current_user(&config), None);
    logout(&config).expect("second logout is fine");
}

#[test]
fn test_login_with_unreachable_expiry_fails_cleanly() {
    let dir = tempdir().expect("temp dir");
    let mut config = config_in(dir.path());
    config.session.expiry_days = 100_000_000;
    UserStore::new(&config.storage.users)
        .register("ana", "pw")
        .expect("register");

    assert!(matches!(
        login(&config, "ana", "pw"),
        Err(AuthError::ExpiryOutOfRange(100_000_000))
    ));
    assert_eq!(current_user(&config), None);
}

#[test]
fn test_garbage_session_file_means_logged_out() {
    let dir = tempdir().expect("temp dir");
    let config = config_in(dir.path());

    SessionCookie::new(&config.storage.session_token)
        .write("garbage")
        .expect("write");
    assert_eq!(current_user(&config), None);

    SessionKey::load_or_create(&config.storage.session_key).expect("key");
    assert_eq!(current_user(&config), None);

    std::fs::write(&config.storage.session_key, "not a key").expect("write");
    assert_eq!(current_user(&config), None);
}

#[test]
fn test_session_key_is_reused() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("session.key");
    let first = SessionKey::load_or_create(&path).expect("create");
    let second = SessionKey::load_or_create(&path).expect("load");
    assert_eq!(first, second);
}
