//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sso_client::{AccessToken, Authentication, CacheProvider, Result, SsoError, TokenProvider};

/// Token provider that counts calls and accepts any token.
///
/// Records expire `ttl_secs` after verification; a negative value produces
/// records that are already expired.
pub struct CountingTokenProvider {
    pub ttl_secs: i64,
    pub jwt_calls: AtomicUsize,
    pub bearer_calls: AtomicUsize,
    pub id_token_calls: AtomicUsize,
    pub code_calls: AtomicUsize,
    valid_codes: Mutex<HashSet<String>>,
}

impl CountingTokenProvider {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            ttl_secs,
            jwt_calls: AtomicUsize::new(0),
            bearer_calls: AtomicUsize::new(0),
            id_token_calls: AtomicUsize::new(0),
            code_calls: AtomicUsize::new(0),
            valid_codes: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_codes(self, codes: &[&str]) -> Self {
        self.valid_codes
            .lock()
            .unwrap()
            .extend(codes.iter().map(|c| c.to_string()));
        self
    }

    pub fn jwt_calls(&self) -> usize {
        self.jwt_calls.load(Ordering::SeqCst)
    }

    pub fn bearer_calls(&self) -> usize {
        self.bearer_calls.load(Ordering::SeqCst)
    }

    pub fn id_token_calls(&self) -> usize {
        self.id_token_calls.load(Ordering::SeqCst)
    }

    pub fn code_calls(&self) -> usize {
        self.code_calls.load(Ordering::SeqCst)
    }

    pub fn total_verifications(&self) -> usize {
        self.jwt_calls() + self.bearer_calls() + self.id_token_calls()
    }

    fn record_for(&self, token: &str, call: usize) -> Authentication {
        let expires_at = Utc::now() + Duration::seconds(self.ttl_secs);
        let mut authc = Authentication::new(format!("user-{token}"), expires_at);
        authc.claims.insert("call".into(), serde_json::json!(call));
        authc
    }
}

#[async_trait]
impl TokenProvider for CountingTokenProvider {
    async fn verify_jwt_access_token(&self, token: &str) -> Result<Authentication> {
        let call = self.jwt_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(self.record_for(token, call))
    }

    async fn verify_bearer_access_token(&self, token: &str) -> Result<Authentication> {
        let call = self.bearer_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(self.record_for(token, call))
    }

    async fn verify_id_token(&self, token: &str) -> Result<Authentication> {
        let call = self.id_token_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(self.record_for(token, call))
    }

    async fn obtain_access_token_by_code(&self, code: &str) -> Result<AccessToken> {
        self.code_calls.fetch_add(1, Ordering::SeqCst);
        // codes are single use
        if !self.valid_codes.lock().unwrap().remove(code) {
            return Err(SsoError::InvalidCode(format!("unknown or consumed code: {code}")));
        }
        Ok(AccessToken {
            access_token: format!("at-{code}"),
            refresh_token: Some(format!("rt-{code}")),
            expires_at: Utc::now() + Duration::seconds(3600),
            token_type: "Bearer".into(),
        })
    }
}

/// Token provider that rejects everything with a fixed error kind.
pub struct RejectingTokenProvider {
    pub expired: bool,
    pub calls: AtomicUsize,
}

impl RejectingTokenProvider {
    pub fn new(expired: bool) -> Self {
        Self {
            expired,
            calls: AtomicUsize::new(0),
        }
    }

    fn reject(&self) -> SsoError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.expired {
            SsoError::TokenExpired("exp claim has passed".into())
        } else {
            SsoError::InvalidToken("signature mismatch".into())
        }
    }
}

#[async_trait]
impl TokenProvider for RejectingTokenProvider {
    async fn verify_jwt_access_token(&self, _token: &str) -> Result<Authentication> {
        Err(self.reject())
    }

    async fn verify_bearer_access_token(&self, _token: &str) -> Result<Authentication> {
        Err(self.reject())
    }

    async fn verify_id_token(&self, _token: &str) -> Result<Authentication> {
        Err(self.reject())
    }

    async fn obtain_access_token_by_code(&self, code: &str) -> Result<AccessToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SsoError::InvalidCode(code.to_string()))
    }
}

/// Cache that stores entries verbatim, ignoring expiry, and counts calls.
///
/// Lets tests hand the client an already-expired record.
#[derive(Default)]
pub struct SpyCache {
    pub entries: Mutex<HashMap<String, (Authentication, DateTime<Utc>)>>,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
    pub removes: AtomicUsize,
}

impl SpyCache {
    pub fn seed(&self, key: &str, authc: Authentication) {
        let expires_at = authc.expires_at;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (authc, expires_at));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    pub fn stored_expiry(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .map(|(_, expires_at)| *expires_at)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheProvider for SpyCache {
    async fn get(&self, key: &str) -> Option<Authentication> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .map(|(authc, _)| authc.clone())
    }

    async fn put(&self, key: &str, authc: Authentication, expires_at: DateTime<Utc>) {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (authc, expires_at));
    }

    async fn remove(&self, key: &str) {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().unwrap().remove(key);
    }
}
