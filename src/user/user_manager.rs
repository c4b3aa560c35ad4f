use super::{
    auth::PasswordHasherKind, permissions::UserRole, AuthToken, AuthTokenValue, Permission,
    UserAuthCredentials, UserStore, UsernamePasswordCredentials,
};
use anyhow::{bail, Context, Result};
use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};
use tracing::{debug, info};

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 3600);

/// The identity behind a valid, unexpired token.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub token: AuthToken,
    pub user_handle: String,
    pub role: UserRole,
}

impl ResolvedSession {
    pub fn permissions(&self) -> &'static [Permission] {
        self.role.permissions()
    }
}

pub struct UserManager {
    user_store: Arc<dyn UserStore>,
    session_ttl: Duration,
}

impl UserManager {
    pub fn new(user_store: Arc<dyn UserStore>) -> Self {
        Self {
            user_store,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }

    pub fn with_session_ttl(mut self, session_ttl: Duration) -> Self {
        self.session_ttl = session_ttl;
        self
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub fn add_user<T: AsRef<str>>(&self, user_handle: T, role: UserRole) -> Result<usize> {
        let user_handle = user_handle.as_ref();
        if user_handle.is_empty() {
            bail!("The user handle cannot be empty.")
        }
        if self.user_store.get_user_id(user_handle)?.is_some() {
            bail!("User handle already exists.");
        }
        self.user_store.create_user(user_handle, role)
    }

    fn create_hashed_password(
        user_id: usize,
        password: &str,
    ) -> Result<UsernamePasswordCredentials> {
        if password.is_empty() {
            bail!("The password cannot be empty.");
        }
        let hasher = PasswordHasherKind::Argon2;
        let salt = hasher.generate_b64_salt();
        let hash = hasher.hash(password.as_bytes(), &salt)?;
        Ok(UsernamePasswordCredentials {
            user_id,
            salt,
            hash,
            hasher,
            created: SystemTime::now(),
            last_tried: None,
            last_used: None,
        })
    }

    fn require_credentials(&self, user_handle: &str) -> Result<UserAuthCredentials> {
        self.user_store
            .get_user_auth_credentials(user_handle)?
            .with_context(|| format!("User with handle {} not found.", user_handle))
    }

    pub fn create_password_credentials(&self, user_handle: &str, password: &str) -> Result<()> {
        let mut credentials = self.require_credentials(user_handle)?;
        if credentials.username_password.is_some() {
            bail!("User with handle {} already has password credentials. Maybe you want to update them?", user_handle);
        }
        credentials.username_password =
            Some(Self::create_hashed_password(credentials.user_id, password)?);
        self.user_store.update_user_auth_credentials(credentials)
    }

    pub fn update_password_credentials(&self, user_handle: &str, password: &str) -> Result<()> {
        let mut credentials = self.require_credentials(user_handle)?;
        if credentials.username_password.is_none() {
            bail!(
                "Cannot update password of user with handle {} since it never had one.",
                user_handle
            );
        }
        credentials.username_password =
            Some(Self::create_hashed_password(credentials.user_id, password)?);
        self.user_store.update_user_auth_credentials(credentials)
    }

    pub fn delete_password_credentials(&self, user_handle: &str) -> Result<()> {
        let mut credentials = self.require_credentials(user_handle)?;
        credentials.username_password = None;
        self.user_store.update_user_auth_credentials(credentials)
    }

    /// Verifies a password. Unknown users and users without a password both
    /// verify as false.
    pub fn check_password(&self, user_handle: &str, password: &str) -> Result<Option<usize>> {
        let credentials = match self.user_store.get_user_auth_credentials(user_handle)? {
            Some(c) => c,
            None => return Ok(None),
        };
        let password_credentials = match credentials.username_password {
            Some(p) => p,
            None => return Ok(None),
        };
        let verified = password_credentials
            .hasher
            .verify(password, password_credentials.hash.as_str())?;
        self.user_store
            .record_password_attempt(credentials.user_id, verified)?;
        Ok(verified.then_some(credentials.user_id))
    }

    /// Verifies the password and, on success, issues a fresh auth token.
    pub fn login(&self, user_handle: &str, password: &str) -> Result<Option<AuthToken>> {
        let user_id = match self.check_password(user_handle, password)? {
            Some(id) => id,
            None => {
                debug!("Rejected login for handle {}", user_handle);
                return Ok(None);
            }
        };
        let token = AuthToken {
            user_id,
            value: AuthTokenValue::generate(),
            created: SystemTime::now(),
            last_used: None,
        };
        self.user_store.add_user_auth_token(token.clone())?;
        info!("User {} logged in", user_handle);
        Ok(Some(token))
    }

    /// Looks up the session behind a token value. Expired tokens are deleted
    /// and resolve to None.
    pub fn resolve_session(&self, value: &AuthTokenValue) -> Result<Option<ResolvedSession>> {
        let token = match self.user_store.get_user_auth_token(value)? {
            Some(t) => t,
            None => return Ok(None),
        };
        if token.is_expired(SystemTime::now(), self.session_ttl) {
            debug!("Auth token of user {} expired", token.user_id);
            self.user_store.delete_user_auth_token(value)?;
            return Ok(None);
        }
        let user_handle = match self.user_store.get_user_handle(token.user_id)? {
            Some(h) => h,
            None => return Ok(None),
        };
        let role = match self.user_store.get_user_role(token.user_id)? {
            Some(r) => r,
            None => return Ok(None),
        };
        if let Err(e) = self
            .user_store
            .update_user_auth_token_last_used_timestamp(value)
        {
            debug!("Failed to update auth token last_used timestamp: {}", e);
        }
        Ok(Some(ResolvedSession {
            token,
            user_handle,
            role,
        }))
    }

    pub fn delete_auth_token(&self, user_id: usize, token_value: &AuthTokenValue) -> Result<()> {
        let token = self
            .user_store
            .get_user_auth_token(token_value)?
            .with_context(|| "Auth token not found")?;
        if token.user_id != user_id {
            bail!(
                "Tried to delete an auth token of user {} while authenticated as {}",
                token.user_id,
                user_id
            );
        }
        self.user_store.delete_user_auth_token(token_value)?;
        Ok(())
    }

    pub fn get_user_tokens(&self, user_handle: &str) -> Result<Vec<AuthToken>> {
        self.user_store.get_all_user_auth_tokens(user_handle)
    }

    pub fn get_user_credentials(&self, user_handle: &str) -> Result<Option<UserAuthCredentials>> {
        self.user_store.get_user_auth_credentials(user_handle)
    }

    pub fn get_all_user_handles(&self) -> Result<Vec<String>> {
        self.user_store.get_all_user_handles()
    }

    pub fn get_user_role(&self, user_handle: &str) -> Result<Option<UserRole>> {
        match self.user_store.get_user_id(user_handle)? {
            Some(user_id) => self.user_store.get_user_role(user_id),
            None => Ok(None),
        }
    }

    pub fn set_user_role(&self, user_handle: &str, role: UserRole) -> Result<()> {
        let user_id = self
            .user_store
            .get_user_id(user_handle)?
            .with_context(|| format!("User with handle {} not found.", user_handle))?;
        self.user_store.set_user_role(user_id, role)
    }
}
