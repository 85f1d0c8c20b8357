//! Account records, password hashing and session tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::contract::ValidationError;

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_TTL_SECS: i64 = 60 * 60 * 24;
const PASSWORD_SCHEME: &str = "sha256";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<NewAccount, ValidationError> {
        match (
            normalized_email(self.email),
            self.password.filter(|value| !value.is_empty()),
            non_blank(self.name),
        ) {
            (Some(email), Some(password), Some(name)) => Ok(NewAccount {
                email,
                password,
                name,
            }),
            _ => Err(ValidationError::new(
                "Missing required fields: email, password, and name are required",
            )),
        }
    }
}

impl LoginRequest {
    pub fn validate(self) -> Result<Credentials, ValidationError> {
        match (
            normalized_email(self.email),
            self.password.filter(|value| !value.is_empty()),
        ) {
            (Some(email), Some(password)) => Ok(Credentials { email, password }),
            _ => Err(ValidationError::new(
                "Missing required fields: email and password are required",
            )),
        }
    }
}

/// Emails are compared case-insensitively, so they are stored lower-cased.
fn normalized_email(value: Option<String>) -> Option<String> {
    non_blank(value).map(|email| email.to_lowercase())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Row in the users table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
}

impl UserRecord {
    pub fn create(account: NewAccount, now: &str) -> Self {
        Self {
            user_id: Uuid::new_v4().to_string(),
            email: account.email,
            name: account.name,
            password_hash: hash_password(&account.password),
            created_at: now.to_string(),
            updated_at: now.to_string(),
            last_login: None,
        }
    }

    pub fn public_view(&self) -> PublicUser {
        PublicUser {
            user_id: self.user_id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            created_at: Some(self.created_at.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub user_id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Stored form: `sha256$<salt>$<hex hmac(salt, password)>`.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = password_mac(&salt, password).finalize().into_bytes();
    format!("{PASSWORD_SCHEME}${salt}${}", hex::encode(digest))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(PASSWORD_SCHEME), Some(salt), Some(expected_hex)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let Ok(expected) = hex::decode(expected_hex) else {
        return false;
    };
    password_mac(salt, password).verify_slice(&expected).is_ok()
}

fn password_mac(salt: &str, password: &str) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(salt.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(password.as_bytes());
    mac
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub user_id: String,
    pub email: String,
    pub exp: i64,
}

impl TokenClaims {
    pub fn for_user(user: &UserRecord, now_epoch_secs: i64) -> Self {
        Self {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            exp: now_epoch_secs + TOKEN_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

/// `base64url(claims json) "." hex(hmac-sha256(secret, payload))`
pub fn issue_token(claims: &TokenClaims, secret: &str) -> String {
    let json = serde_json::to_vec(claims).unwrap_or_default();
    let payload = URL_SAFE_NO_PAD.encode(json);
    let signature = sign(secret, &payload).finalize().into_bytes();
    format!("{payload}.{}", hex::encode(signature))
}

pub fn verify_token(
    token: &str,
    secret: &str,
    now_epoch_secs: i64,
) -> Result<TokenClaims, TokenError> {
    let (payload, signature_hex) = token.trim().split_once('.').ok_or(TokenError::Malformed)?;
    let signature = hex::decode(signature_hex).map_err(|_| TokenError::Malformed)?;
    sign(secret, payload)
        .verify_slice(&signature)
        .map_err(|_| TokenError::BadSignature)?;

    let json = URL_SAFE_NO_PAD
        .decode(payload.as_bytes())
        .map_err(|_| TokenError::Malformed)?;
    let claims: TokenClaims = serde_json::from_slice(&json).map_err(|_| TokenError::Malformed)?;
    if claims.exp <= now_epoch_secs {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}

fn sign(secret: &str, payload: &str) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(payload.as_bytes());
    mac
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}
