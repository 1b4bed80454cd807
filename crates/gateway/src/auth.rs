//! JWT bearer authentication for the WebSocket endpoint.

use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;
use stepwise_config::AuthConfig;

/// Token payload. `sub` identifies the client; `exp` is optional but
/// enforced when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
}

/// Why a request was refused. Every variant is a 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("未授权的访问")]
    Missing,
    #[error("无效的token")]
    Invalid,
    #[error("token已过期")]
    Expired,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "detail": self.to_string() })),
        )
            .into_response()
    }
}

#[derive(Clone)]
pub struct JwtVerifier {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl JwtVerifier {
    pub fn new(secret: &str, algorithm: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        let algorithm = Algorithm::from_str(algorithm)?;
        let mut validation = Validation::new(algorithm);
        // Tokens without `exp` are accepted; `sub` is checked after decoding.
        validation.required_spec_claims = HashSet::new();
        Ok(Self {
            algorithm,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// `None` when no secret is configured.
    pub fn from_config(config: &AuthConfig) -> Result<Option<Self>, jsonwebtoken::errors::Error> {
        config
            .secret_key
            .as_deref()
            .map(|secret| Self::new(secret, &config.algorithm))
            .transpose()
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid,
            })?;
        if data.claims.sub.is_empty() {
            return Err(AuthError::Invalid);
        }
        Ok(data.claims)
    }

    /// Mint a token for `sub` valid for `ttl`.
    pub fn issue(&self, sub: &str, ttl: Duration) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: sub.to_string(),
            exp: Some(now.saturating_add(ttl.as_secs())),
            iat: Some(now),
        };
        jsonwebtoken::encode(&Header::new(self.algorithm), &claims, &self.encoding)
    }

    /// Verify the `Authorization: Bearer <jwt>` header.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<Claims, AuthError> {
        let token = bearer_token(headers).ok_or(AuthError::Missing)?;
        self.verify(token)
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn verifier() -> JwtVerifier {
        JwtVerifier::new("test-secret", "HS256").unwrap()
    }

    fn encode(claims: &Claims, secret: &str) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn issued_token_verifies() {
        let v = verifier();
        let token = v.issue("alice", Duration::from_secs(3600)).unwrap();
        let claims = v.verify(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert!(claims.exp.unwrap() > claims.iat.unwrap());
    }

    #[test]
    fn huge_ttl_saturates() {
        let v = verifier();
        let token = v.issue("alice", Duration::from_secs(u64::MAX)).unwrap();
        let claims = v.verify(&token).unwrap();
        assert_eq!(claims.exp, Some(u64::MAX));
    }

    #[test]
    fn token_without_exp_is_accepted() {
        let token = encode(&Claims { sub: "bob".into(), exp: None, iat: None }, "test-secret");
        assert_eq!(verifier().verify(&token).unwrap().sub, "bob");
    }

    #[test]
    fn expired_token() {
        let past = (chrono::Utc::now().timestamp() - 3600).max(0) as u64;
        let token = encode(&Claims { sub: "a".into(), exp: Some(past), iat: None }, "test-secret");
        assert_eq!(verifier().verify(&token), Err(AuthError::Expired));
    }

    #[test]
    fn wrong_secret_or_garbage_is_invalid() {
        let token = encode(&Claims { sub: "a".into(), exp: None, iat: None }, "other");
        assert_eq!(verifier().verify(&token), Err(AuthError::Invalid));
        assert_eq!(verifier().verify("not-a-jwt"), Err(AuthError::Invalid));
    }

    #[test]
    fn missing_subject_is_invalid() {
        let token = encode(&Claims { sub: String::new(), exp: None, iat: None }, "test-secret");
        assert_eq!(verifier().verify(&token), Err(AuthError::Invalid));
    }

    #[test]
    fn bearer_header_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(verifier().authorize(&headers), Err(AuthError::Missing));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));
    }

    #[test]
    fn from_config_without_secret() {
        let config = AuthConfig::default();
        assert!(JwtVerifier::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn error_messages() {
        assert_eq!(AuthError::Missing.to_string(), "未授权的访问");
        assert_eq!(AuthError::Expired.to_string(), "token已过期");
    }
}
