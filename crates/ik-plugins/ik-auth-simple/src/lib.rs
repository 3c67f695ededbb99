//! # ik-auth-simple
//!
//! Argon2-based implementation of `AuthProvider`.
//! Accounts and the current session live in the local key/value store, so a
//! restart restores the last signed-in user.

use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use ik_core::{AppError, AuthProvider, Credentials, Result, User};
use ik_store_local::LocalKv;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

const USERS_KEY: &str = "infoking.auth.users";
const SESSION_KEY: &str = "infoking.auth.session";
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
    id: String,
    email: String,
    /// PHC string; empty for provider-only accounts.
    password_hash: String,
}

impl Account {
    fn user(&self) -> User {
        User {
            id: self.id.clone(),
            email: self.email.clone(),
        }
    }
}

pub struct SimpleAuthProvider {
    kv: Arc<LocalKv>,
    /// Lowercase names accepted by `sign_in_with_provider`.
    providers: Vec<String>,
    write_lock: Mutex<()>,
}

impl SimpleAuthProvider {
    pub fn new(kv: Arc<LocalKv>, providers: Vec<String>) -> Self {
        Self {
            kv,
            providers: providers.into_iter().map(|p| p.to_lowercase()).collect(),
            write_lock: Mutex::new(()),
        }
    }

    async fn accounts(&self) -> Result<Vec<Account>> {
        Ok(self.kv.get(USERS_KEY).await?.unwrap_or_default())
    }

    async fn start_session(&self, account: &Account) -> Result<User> {
        let user = account.user();
        self.kv.put(SESSION_KEY, &user).await?;
        info!(user_id = %user.id, "Session started");
        Ok(user)
    }

    fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
            .map_err(|e| AppError::Internal(format!("salt: {e}")))?;
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("hash: {e}")))
    }

    /// Verifies if a provided password matches a stored Argon2 hash.
    fn verify_password(password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(_) => return false,
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AppError::Validation(format!("`{email}` is not an email address"))),
    }
}

#[async_trait]
impl AuthProvider for SimpleAuthProvider {
    async fn current_user(&self) -> Result<Option<User>> {
        self.kv.get(SESSION_KEY).await
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<User> {
        let email = normalize_email(&credentials.email)?;
        let accounts = self.accounts().await?;
        let account = accounts
            .iter()
            .find(|a| a.email == email && Self::verify_password(&credentials.password, &a.password_hash))
            .ok_or_else(|| {
                warn!(%email, "Rejected sign-in");
                AppError::Auth("invalid email or password".to_string())
            })?;
        self.start_session(account).await
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<User> {
        let email = normalize_email(&credentials.email)?;
        if credentials.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let _guard = self.write_lock.lock().await;
        let mut accounts = self.accounts().await?;
        if accounts.iter().any(|a| a.email == email) {
            return Err(AppError::Auth(format!("{email} is already registered")));
        }
        let account = Account {
            id: Uuid::now_v7().to_string(),
            email,
            password_hash: Self::hash_password(&credentials.password)?,
        };
        accounts.push(account.clone());
        self.kv.put(USERS_KEY, &accounts).await?;
        self.start_session(&account).await
    }

    /// Local stand-in for a hosted OAuth flow: one stable account per provider.
    async fn sign_in_with_provider(&self, provider: &str) -> Result<User> {
        let provider = provider.trim().to_lowercase();
        if !self.providers.contains(&provider) {
            return Err(AppError::Auth(format!("sign-in with `{provider}` is not enabled")));
        }

        let _guard = self.write_lock.lock().await;
        let mut accounts = self.accounts().await?;
        let email = format!("{provider}-user@infoking.local");
        let account = match accounts.iter().find(|a| a.email == email) {
            Some(existing) => existing.clone(),
            None => {
                let created = Account {
                    id: Uuid::now_v7().to_string(),
                    email,
                    password_hash: String::new(),
                };
                accounts.push(created.clone());
                self.kv.put(USERS_KEY, &accounts).await?;
                created
            }
        };
        self.start_session(&account).await
    }

    async fn sign_out(&self) -> Result<()> {
        self.kv.remove(SESSION_KEY).await
    }
}
