use bill_capture_core::auth::{
    issue_token, verify_password, LoginRequest, RegisterRequest, TokenClaims, UserRecord,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::adapters::repository::UserRepository;
use crate::handlers::http::{
    is_preflight, message_response, normalize_apigw_event, preflight_response,
    server_error_response, success_response, ApiGatewayResponse,
};

pub struct RegisterContext<'a> {
    pub users: &'a dyn UserRepository,
}

pub struct LoginContext<'a> {
    pub users: &'a dyn UserRepository,
    pub token_secret: &'a str,
}

pub fn handle_register_event(
    event: Value,
    context: &RegisterContext<'_>,
    now: DateTime<Utc>,
) -> ApiGatewayResponse {
    if is_preflight(&event) {
        return preflight_response();
    }
    let request: RegisterRequest = match parse_body(event) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let account = match request.validate() {
        Ok(account) => account,
        Err(error) => return message_response(400, error.message()),
    };

    match context.users.find_by_email(&account.email) {
        Ok(Some(_)) => {
            tracing::info!(email = %account.email, "registration for existing email");
            return message_response(409, "User with this email already exists");
        }
        Ok(None) => {}
        Err(error) => {
            tracing::error!(%error, "user lookup failed");
            return server_error_response("Error registering user", &error.to_string());
        }
    }

    let user = UserRecord::create(account, &timestamp(now));
    if let Err(error) = context.users.insert_user(&user) {
        tracing::error!(%error, "user insert failed");
        return server_error_response("Error registering user", &error.to_string());
    }

    tracing::info!(user_id = %user.user_id, "user registered");
    success_response(
        201,
        json!({
            "message": "User registered successfully",
            "user": user.public_view(),
        }),
    )
}

pub fn handle_login_event(
    event: Value,
    context: &LoginContext<'_>,
    now: DateTime<Utc>,
) -> ApiGatewayResponse {
    if is_preflight(&event) {
        return preflight_response();
    }
    let request: LoginRequest = match parse_body(event) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let credentials = match request.validate() {
        Ok(credentials) => credentials,
        Err(error) => return message_response(400, error.message()),
    };

    let user = match context.users.find_by_email(&credentials.email) {
        Ok(Some(user)) if verify_password(&credentials.password, &user.password_hash) => user,
        Ok(_) => {
            tracing::info!(email = %credentials.email, "rejected login");
            return message_response(401, "Invalid email or password");
        }
        Err(error) => {
            tracing::error!(%error, "user lookup failed");
            return server_error_response("Error during login", &error.to_string());
        }
    };

    let login_at = timestamp(now);
    if let Err(error) = context.users.record_login(&user.user_id, &login_at) {
        tracing::warn!(user_id = %user.user_id, %error, "could not record last login");
    }

    let token = issue_token(
        &TokenClaims::for_user(&user, now.timestamp()),
        context.token_secret,
    );
    tracing::info!(user_id = %user.user_id, "user logged in");
    success_response(
        200,
        json!({
            "message": "Login successful",
            "token": token,
            "user": user.public_view(),
        }),
    )
}

fn parse_body<T: DeserializeOwned>(event: Value) -> Result<T, ApiGatewayResponse> {
    let payload = normalize_apigw_event(event).map_err(|message| message_response(400, &message))?;
    serde_json::from_value(payload)
        .map_err(|error| message_response(400, &format!("Malformed request: {error}")))
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}
