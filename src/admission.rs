// admission guard - api key check + per client rate limit

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use crate::config::AdmissionOrder;
use crate::error::GatewayError;
use crate::rate_limit::{ClientIdentity, RateLimiter};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

// Why a request was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Unauthorized,
    RateLimited { retry_after: Duration },
}

impl Rejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::Unauthorized => "unauthorized",
            Rejection::RateLimited { .. } => "rate_limited",
        }
    }
}

pub struct AdmissionGuard {
    // only the digest of the secret is kept
    key_digest: [u8; 32],
    limiter: RateLimiter,
    order: AdmissionOrder,
}

impl AdmissionGuard {
    pub fn new(api_key: &str, limiter: RateLimiter, order: AdmissionOrder) -> Self {
        Self {
            key_digest: digest(api_key),
            limiter,
            order,
        }
    }

    pub fn order(&self) -> AdmissionOrder {
        self.order
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    // Full admission decision for one request: `Ok(())` means allow.
    pub fn check(&self, client: &ClientIdentity, provided_key: Option<&str>) -> Result<(), Rejection> {
        self.check_at(client, provided_key, Instant::now())
    }

    pub fn check_at(
        &self,
        client: &ClientIdentity,
        provided_key: Option<&str>,
        now: Instant,
    ) -> Result<(), Rejection> {
        match self.order {
            AdmissionOrder::KeyFirst => {
                self.check_key(provided_key)?;
                self.check_rate_at(client, now)
            }
            AdmissionOrder::RateLimitFirst => {
                self.check_rate_at(client, now)?;
                self.check_key(provided_key)
            }
        }
    }

    // A missing key is treated like a wrong one.
    pub fn check_key(&self, provided_key: Option<&str>) -> Result<(), Rejection> {
        match provided_key {
            Some(key) if constant_time_eq(&self.key_digest, &digest(key)) => Ok(()),
            _ => Err(Rejection::Unauthorized),
        }
    }

    pub fn check_rate(&self, client: &ClientIdentity) -> Result<(), Rejection> {
        self.check_rate_at(client, Instant::now())
    }

    pub fn check_rate_at(&self, client: &ClientIdentity, now: Instant) -> Result<(), Rejection> {
        self.limiter
            .check_at(client, now)
            .map_err(|retry_after| Rejection::RateLimited { retry_after })
    }

    // Turn a rejection into the error the HTTP layer renders
    pub fn rejection_error(&self, rejection: Rejection) -> GatewayError {
        match rejection {
            Rejection::Unauthorized => GatewayError::Unauthorized,
            Rejection::RateLimited { retry_after } => GatewayError::RateLimited {
                quota: self.limiter.describe_quota(),
                retry_after,
            },
        }
    }
}

fn digest(key: &str) -> [u8; 32] {
    Sha256::digest(key.as_bytes()).into()
}

// Hashing first makes both sides the same length; the fold never exits early
fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn api_key_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok())
}

// Work out who is calling.
// With `trust_forwarded`, the left-most address in `X-Forwarded-For` wins
// (entries that are not IP addresses are ignored). Otherwise the TCP peer
// address is used. Requests with neither share the `unknown` bucket.
// The header is whatever the caller sent unless a proxy rewrites it,
// so trusting it on a directly exposed port lets callers pick their bucket.
pub fn client_identity(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded: bool,
) -> ClientIdentity {
    if trust_forwarded {
        let forwarded = headers
            .get(FORWARDED_FOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            return ClientIdentity::from(ip);
        }
    }

    match peer {
        Some(addr) => ClientIdentity::from(addr.ip()),
        None => ClientIdentity::unknown(),
    }
}
