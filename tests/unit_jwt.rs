mod common;

use std::sync::Arc;

use appointme::appointme_auth::{Principal, TokenCodec, TokenError, TokenVerifier};
use appointme::appointme_config::JwtConfig;
use appointme::appointme_core::ManualClock;
use chrono::Duration;
use common::TEST_SECRET;
use serde_json::{Map, Value, json};

fn codec_with_lifetime(lifetime: Duration) -> (TokenCodec, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_now());
    let config = JwtConfig::new(TEST_SECRET, lifetime).unwrap();
    (TokenCodec::new(&config, clock.clone()), clock)
}

fn alice() -> Principal {
    Principal {
        id: 1,
        username: "alice".to_string(),
        authorities: vec!["User".to_string()],
        enabled: true,
        locked: false,
    }
}

#[test]
fn test_alice_token_valid_for_one_hour() {
    let (codec, clock) = codec_with_lifetime(Duration::hours(1));
    let token = codec.issue("alice", Map::new(), &[]).unwrap();

    assert_eq!(codec.parse_subject(&token).unwrap(), "alice");
    assert!(codec.is_valid(&token, &alice()).unwrap());

    clock.advance(Duration::minutes(61));

    assert_eq!(codec.parse_subject(&token), Err(TokenError::Expired));
    assert_eq!(codec.is_valid(&token, &alice()), Err(TokenError::Expired));
}

#[test]
fn test_extra_claims_are_carried() {
    let (codec, _) = codec_with_lifetime(Duration::hours(1));
    let mut extra = Map::new();
    extra.insert("fullName".to_string(), json!("Smith, Alice"));
    extra.insert("sub".to_string(), json!("mallory"));

    let token = codec
        .issue("alice", extra, &["User".to_string(), "Admin".to_string()])
        .unwrap();

    let claims = codec.decode(&token).unwrap();
    assert_eq!(claims.sub, "alice");
    assert_eq!(claims.claim::<String>("fullName").as_deref(), Some("Smith, Alice"));
    assert_eq!(claims.authorities, vec!["User", "Admin"]);
    assert_eq!(claims.exp - claims.iat, 3600);
}

#[test]
fn test_other_principal_is_not_valid() {
    let (codec, _) = codec_with_lifetime(Duration::hours(1));
    let token = codec.issue("alice", Map::new(), &[]).unwrap();
    let bob = Principal {
        username: "bob".to_string(),
        ..alice()
    };

    assert!(!codec.is_valid(&token, &bob).unwrap());
}

#[test]
fn test_tokens_from_another_key_are_malformed() {
    let (codec, _) = codec_with_lifetime(Duration::hours(1));
    let other_secret = "b3RoZXItc2lnbmluZy1rZXktdGhhdC1pcy1sb25nLWVub3VnaC0xMjM=";
    let other = TokenCodec::new(
        &JwtConfig::new(other_secret, Duration::hours(1)).unwrap(),
        Arc::new(ManualClock::starting_now()),
    );

    let token = other.issue("alice", Map::new(), &[]).unwrap();

    assert_eq!(codec.parse_subject(&token), Err(TokenError::Malformed));
    assert_eq!(codec.parse_subject("not.a.jwt"), Err(TokenError::Malformed));
    assert_eq!(
        codec.extract_claim("", |c| c.claim::<Value>("fullName")),
        Err(TokenError::Malformed)
    );
}
