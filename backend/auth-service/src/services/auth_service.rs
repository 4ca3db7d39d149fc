/// Session and credential lifecycle orchestration.
///
/// Composes the password hasher, token codec, durable token store and
/// revocation cache into the registration, verification, login, rotation,
/// logout and password-reset flows. Two rules hold everywhere:
///
/// - a refresh token is only usable when BOTH stores approve it, and
/// - durable state is written before its cache mirror, so the cache can
///   lag behind the store but never run ahead of it.
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::error::{AuthError, Result};
use crate::models::{OneTimeTokenKind, TokenPair, User};
use crate::security::{hash_password, verify_password, TokenCodec, TokenKind};
use crate::services::EmailService;
use crate::store::{DurableTokenStore, RevocationCache, UserStore};

// Verified against when the email is unknown, so that path costs the same
// slow hash check as a wrong password.
static DUMMY_PASSWORD_HASH: Lazy<String> =
    Lazy::new(|| hash_password("instead-of-a-real-password").unwrap_or_default());

/// The lifecycle manager, generic over its storage backends.
#[derive(Clone)]
pub struct AuthService<U, S, C> {
    users: U,
    tokens: S,
    cache: C,
    codec: TokenCodec,
    email: EmailService,
    access_ttl: Duration,
    refresh_ttl: Duration,
    verification_ttl: Duration,
    reset_ttl: Duration,
}

impl<U, S, C> AuthService<U, S, C>
where
    U: UserStore,
    S: DurableTokenStore,
    C: RevocationCache,
{
    pub fn new(
        users: U,
        tokens: S,
        cache: C,
        codec: TokenCodec,
        email: EmailService,
        settings: &Settings,
    ) -> Self {
        Self {
            users,
            tokens,
            cache,
            codec,
            email,
            access_ttl: Duration::minutes(settings.jwt.access_ttl_minutes),
            refresh_ttl: Duration::days(settings.jwt.refresh_ttl_days),
            verification_ttl: Duration::minutes(settings.tokens.verification_ttl_minutes),
            reset_ttl: Duration::minutes(settings.tokens.reset_ttl_minutes),
        }
    }

    /// Create an unverified, inactive account and send the verification
    /// token to the given address.
    pub async fn register(&self, email: &str, password: &str) -> Result<User> {
        let password_hash = hash_password(password)?;
        let user = self.users.create_user(email, &password_hash).await?;

        let token = self
            .tokens
            .create_one_time_token(
                OneTimeTokenKind::EmailVerification,
                user.id,
                self.verification_ttl,
            )
            .await?;
        self.dispatch_verification_email(user.email.clone(), token);

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Consume a verification token and activate its account.
    pub async fn verify_email(&self, token: &str) -> Result<()> {
        let user_id = self
            .tokens
            .consume_one_time_token(OneTimeTokenKind::EmailVerification, token)
            .await?
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        self.users.mark_verified(user_id).await?;

        info!(user_id = %user_id, "email verified");
        Ok(())
    }

    /// Check credentials and return the account when it is active.
    ///
    /// Unknown email and wrong password are indistinguishable to the
    /// caller; only a valid password against an unactivated account earns
    /// the more specific `NotVerified`.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => {
                let _ = verify_password(password, &DUMMY_PASSWORD_HASH);
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !verify_password(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_activated() {
            return Err(AuthError::NotVerified);
        }

        Ok(user)
    }

    /// Issue a fresh access/refresh pair for an authenticated user.
    ///
    /// The refresh token is recorded durably before the cache entry is
    /// written; a crash between the two leaves a token the cache will deny,
    /// never a cache entry with no backing record.
    pub async fn issue_token_pair(&self, user: &User) -> Result<TokenPair> {
        let access = self.codec.issue(user.id, TokenKind::Access, self.access_ttl)?;
        let refresh = self
            .codec
            .issue(user.id, TokenKind::Refresh, self.refresh_ttl)?;

        self.tokens
            .record_refresh_token(refresh.jti, user.id, refresh.expires_at)
            .await?;

        let ttl_seconds = (refresh.expires_at - Utc::now()).num_seconds().max(1) as u64;
        self.cache
            .mark_usable(refresh.jti, user.id, ttl_seconds)
            .await?;

        Ok(TokenPair::new(access.token, refresh.token))
    }

    /// Rotate a refresh token: validate it against both stores, revoke it,
    /// and issue a brand-new pair.
    ///
    /// The conditional revoke makes concurrent calls with the same token
    /// race for one winner; every loser sees `TokenRevokedOrExpired`, the
    /// same as replaying an old token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let bearer = self.codec.decode(refresh_token)?;
        if bearer.kind != TokenKind::Refresh {
            return Err(AuthError::InvalidToken);
        }

        match self.cache.is_usable(bearer.jti).await? {
            Some(user_id) if user_id == bearer.subject => {}
            _ => return Err(AuthError::TokenRevokedOrExpired),
        }

        if self
            .tokens
            .find_active_refresh_token(bearer.jti)
            .await?
            .is_none()
        {
            return Err(AuthError::TokenRevokedOrExpired);
        }

        if !self.tokens.revoke_refresh_token(bearer.jti).await? {
            return Err(AuthError::TokenRevokedOrExpired);
        }
        self.cache.revoke(bearer.jti).await?;

        let user = self
            .users
            .find_by_id(bearer.subject)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        info!(user_id = %user.id, jti = %bearer.jti, "refresh token rotated");
        self.issue_token_pair(&user).await
    }

    /// Revoke the presented refresh token in both stores. Absent or
    /// already-revoked tokens are success; logout is idempotent.
    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        let bearer = self.codec.decode(refresh_token)?;
        if bearer.kind != TokenKind::Refresh {
            return Err(AuthError::InvalidToken);
        }

        self.tokens.revoke_refresh_token(bearer.jti).await?;
        self.cache.revoke(bearer.jti).await?;

        info!(user_id = %bearer.subject, "user logged out");
        Ok(())
    }

    /// Create and send a password-reset token. Unknown addresses return
    /// the same silent success, with no token and no email.
    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => return Ok(()),
        };

        let token = self
            .tokens
            .create_one_time_token(OneTimeTokenKind::PasswordReset, user.id, self.reset_ttl)
            .await?;
        self.dispatch_password_reset_email(user.email.clone(), token);

        info!(user_id = %user.id, "password reset requested");
        Ok(())
    }

    /// Consume a reset token, store the new password, and end every live
    /// session of that user in both stores.
    pub async fn confirm_password_reset(&self, token: &str, new_password: &str) -> Result<()> {
        let user_id = self
            .tokens
            .consume_one_time_token(OneTimeTokenKind::PasswordReset, token)
            .await?
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        let password_hash = hash_password(new_password)?;
        self.users.update_password(user_id, &password_hash).await?;

        let revoked = self.tokens.revoke_all_for_user(user_id).await?;
        for jti in &revoked {
            self.cache.revoke(*jti).await?;
        }

        info!(
            user_id = %user_id,
            sessions_revoked = revoked.len(),
            "password reset completed"
        );
        Ok(())
    }

    /// Change the account email. The account drops back to unverified and
    /// inactive, and a fresh verification token goes to the new address.
    pub async fn change_email(&self, user_id: Uuid, new_email: &str) -> Result<User> {
        let user = self.users.update_email(user_id, new_email).await?;

        let token = self
            .tokens
            .create_one_time_token(
                OneTimeTokenKind::EmailVerification,
                user.id,
                self.verification_ttl,
            )
            .await?;
        self.dispatch_verification_email(user.email.clone(), token);

        info!(user_id = %user.id, "email changed, verification pending");
        Ok(user)
    }

    // Notification dispatch is fire-and-forget: a delivery failure is
    // logged, never surfaced to the triggering request.

    fn dispatch_verification_email(&self, recipient: String, token: String) {
        let email = self.email.clone();
        tokio::spawn(async move {
            if let Err(e) = email.send_verification_email(&recipient, &token).await {
                warn!(error = %e, "failed to send verification email");
            }
        });
    }

    fn dispatch_password_reset_email(&self, recipient: String, token: String) {
        let email = self.email.clone();
        tokio::spawn(async move {
            if let Err(e) = email.send_password_reset_email(&recipient, &token).await {
                warn!(error = %e, "failed to send password reset email");
            }
        });
    }
}
