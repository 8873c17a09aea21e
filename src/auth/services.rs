use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        jwt::JwtKeys,
        password::{check_strength, hash_password, verify_password},
        repo::UserStore,
        repo_types::{NewUser, ProfileUpdate, User},
    },
    db::StoreError,
    error::{ApiError, ApiResult},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Profile fields accepted at sign-up.
#[derive(Debug, Clone, Default)]
pub struct SignUpProfile {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A user together with a freshly issued session token.
#[derive(Debug)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Sign-up, sign-in and token-to-user resolution over an injected
/// credential store.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, keys: JwtKeys) -> Self {
        Self { users, keys }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: SignUpProfile,
    ) -> ApiResult<Session> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(ApiError::Validation("Invalid email".into()));
        }
        if let Err(e) = check_strength(password) {
            warn!(email = %email, reason = %e, "password refused");
            return Err(ApiError::Validation(e.to_string()));
        }

        if self.users.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(ApiError::DuplicateEmail);
        }

        let new_user = NewUser {
            email,
            password_hash: String::new(),
            name: profile.name.unwrap_or_default().trim().to_string(),
            phone: profile.phone,
            address: profile.address,
            is_admin: false,
        };
        let user = self.hash_and_store(new_user, password).await?;

        let token = self.keys.issue(user.id)?;
        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(Session { user, token })
    }

    /// Hashes `password` into `user.password_hash` and persists the record.
    async fn hash_and_store(&self, mut user: NewUser, password: &str) -> ApiResult<User> {
        user.password_hash = hash_password(password)?;
        match self.users.insert(user).await {
            Ok(u) => Ok(u),
            Err(StoreError::Duplicate) => Err(ApiError::DuplicateEmail),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ApiResult<Session> {
        let email = normalize_email(email);

        let user = match self.users.find_by_email(&email).await? {
            Some(u) => u,
            None => {
                warn!(email = %email, "sign-in unknown email");
                return Err(ApiError::InvalidCredentials);
            }
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "sign-in invalid password");
            return Err(ApiError::InvalidCredentials);
        }

        let token = self.keys.issue(user.id)?;
        info!(user_id = %user.id, email = %user.email, "user signed in");
        Ok(Session { user, token })
    }

    /// Resolves a bearer token to the user it names.
    pub async fn current_user(&self, token: &str) -> ApiResult<User> {
        let user_id = self.keys.verify(token).map_err(|e| {
            warn!(error = %e, "token rejected");
            ApiError::InvalidToken(e)
        })?;
        self.users.find_by_id(user_id).await?.ok_or_else(|| {
            warn!(user_id = %user_id, "token names a missing user");
            ApiError::UserNotFound
        })
    }

    pub async fn update_profile(&self, user_id: Uuid, mut update: ProfileUpdate) -> ApiResult<User> {
        if let Some(name) = update.name.as_mut() {
            *name = name.trim().to_string();
        }
        self.users
            .update_profile(user_id, update)
            .await?
            .ok_or(ApiError::UserNotFound)
    }

    /// Creates the administrator account unless the email is already taken.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> ApiResult<User> {
        let email = normalize_email(email);
        if let Some(existing) = self.users.find_by_email(&email).await? {
            if !existing.is_admin {
                warn!(email = %email, "configured admin email belongs to a non-admin user");
            }
            return Ok(existing);
        }
        if !is_valid_email(&email) || check_strength(password).is_err() {
            return Err(ApiError::Validation("Invalid admin credentials".into()));
        }

        let new_user = NewUser {
            email,
            password_hash: String::new(),
            name: "Administrator".into(),
            phone: None,
            address: None,
            is_admin: true,
        };
        let user = self.hash_and_store(new_user, password).await?;
        info!(user_id = %user.id, email = %user.email, "admin user created");
        Ok(user)
    }
}
