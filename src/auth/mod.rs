/*!
 * # Authentication and Authorization Module
 *
 * Account registration, password login and HS256 bearer tokens for the
 * LogiTrack API. Order endpoints sit behind [`auth_middleware`], which
 * consults an [`AccessGate`] and attaches the resolved [`AuthUser`] to the
 * request extensions.
 */

use crate::{
    config::AppConfig,
    db::DbPool,
    entities::user,
    errors::ServiceError,
    validation::validate_credential_charset,
};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use sea_orm::{ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, Set, SqlErr};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Role granted to every self-registered account
pub const DEFAULT_ROLE: &str = "User";

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,        // Subject (user ID)
    pub name: String,       // Username
    pub roles: Vec<String>, // User's roles
    pub jti: String,        // JWT ID (unique identifier for this token)
    pub iat: i64,           // Issued at time
    pub exp: i64,           // Expiration time
    pub nbf: i64,           // Not valid before time
    pub iss: String,        // Issuer
    pub aud: String,        // Audience
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
    pub roles: Vec<String>,
    pub token_id: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.name,
            roles: claims.roles,
            token_id: claims.jti,
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            jwt_audience: cfg.jwt_audience.clone(),
            jwt_issuer: cfg.jwt_issuer.clone(),
            access_token_expiration: Duration::from_secs(cfg.jwt_expiration as u64),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50), custom = "validate_credential_charset")]
    #[schema(example = "dock_supervisor")]
    pub username: String,
    #[validate(email)]
    #[schema(example = "supervisor@logitrack.example")]
    pub email: String,
    #[validate(length(min = 8, max = 100), custom = "validate_credential_charset")]
    pub password: String,
    #[validate(must_match = "password")]
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "dock_supervisor")]
    pub username: String,
    pub password: String,
}

/// Bearer token issued on a successful login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Seconds until the token expires
    #[schema(example = 3600)]
    pub expires_in: i64,
    pub roles: Vec<String>,
}

/// Decides whether a presented credential grants access, and as whom.
pub trait AccessGate: Send + Sync {
    fn authorize(&self, credential: &str) -> Option<AuthUser>;
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DbPool>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DbPool>) -> Self {
        Self { config, db }
    }

    /// Creates an account with the default role
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegisterRequest) -> Result<user::Model, ServiceError> {
        request.validate()?;

        let existing = user::Entity::find()
            .filter(user::Column::Username.eq(request.username.as_str()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            warn!("Registration rejected: username taken");
            return Err(username_taken(&request.username));
        }

        let password_hash = hash_password(request.password).await?;
        let account = user::ActiveModel {
            username: Set(request.username.clone()),
            email: Set(request.email),
            password_hash: Set(password_hash),
            roles: Set(DEFAULT_ROLE.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|err| registration_insert_error(err, &request.username))?;

        info!(user_id = account.id, "User registered");
        Ok(account)
    }

    /// Exchanges a username and password for a bearer token
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse, ServiceError> {
        let account = user::Entity::find()
            .filter(user::Column::Username.eq(request.username.as_str()))
            .one(&*self.db)
            .await?;

        // unknown user and wrong password look the same to the caller
        let Some(account) = account else {
            warn!("Login failed: unknown user");
            return Err(invalid_credentials());
        };
        if !verify_password(request.password, account.password_hash.clone()).await? {
            warn!(user_id = account.id, "Login failed: wrong password");
            return Err(invalid_credentials());
        }

        let token = self.issue_token(&account)?;
        info!(user_id = account.id, "User logged in");
        Ok(TokenResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs() as i64,
            roles: account.role_list(),
        })
    }

    /// Signs an access token for a user
    pub fn issue_token(&self, account: &user::Model) -> Result<String, ServiceError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| ServiceError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: account.id.to_string(),
            name: account.username.clone(),
            roles: account.role_list(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::JwtError(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| ServiceError::JwtError(e.to_string()))
    }
}

impl AccessGate for AuthService {
    fn authorize(&self, credential: &str) -> Option<AuthUser> {
        match self.validate_token(credential) {
            Ok(claims) => Some(AuthUser::from(claims)),
            Err(e) => {
                debug!(error = %e, "Bearer token rejected");
                None
            }
        }
    }
}

fn username_taken(username: &str) -> ServiceError {
    ServiceError::InvalidRequest(format!("Username '{}' is already taken.", username))
}

// a concurrent registration can win the unique index after our check
fn registration_insert_error(err: DbErr, username: &str) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            warn!("Registration rejected: username taken concurrently");
            username_taken(username)
        }
        _ => ServiceError::DatabaseError(err),
    }
}

fn invalid_credentials() -> ServiceError {
    ServiceError::Unauthorized("Invalid username or password".to_string())
}

async fn hash_password(password: String) -> Result<String, ServiceError> {
    // CPU-bound, runs on the blocking pool
    tokio::task::spawn_blocking(move || {
        let mut salt_bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| ServiceError::HashError(e.to_string()))?;
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::HashError(e.to_string()))
    })
    .await
    .map_err(|e| ServiceError::InternalError(format!("Password hashing task failed: {}", e)))?
}

async fn verify_password(password: String, stored: String) -> Result<bool, ServiceError> {
    tokio::task::spawn_blocking(move || {
        let parsed =
            PasswordHash::new(&stored).map_err(|e| ServiceError::HashError(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| ServiceError::InternalError(format!("Password check task failed: {}", e)))?
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware that resolves the bearer token through the
/// gate and attaches the [`AuthUser`] to the request
pub async fn auth_middleware(
    State(gate): State<Arc<dyn AccessGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    let user = bearer_token(&request).and_then(|token| gate.authorize(token));
    match user {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => ServiceError::Unauthorized("Authentication required".to_string()).into_response(),
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self, gate: Arc<dyn AccessGate>) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self, gate: Arc<dyn AccessGate>) -> Self {
        self.route_layer(axum::middleware::from_fn_with_state(gate, auth_middleware))
    }
}
