/// Lifecycle tests for the credential manager over in-memory stores
///
/// These cover the orchestration rules that span both token stores: refresh
/// rotation, replay rejection, dual-store approval, single-use one-time
/// tokens, and the reset-revokes-everything guarantee.
use crate::error::AuthError;
use crate::models::OneTimeTokenKind;
use crate::security::{verify_password, TokenKind};
use crate::store::UserStore;
use crate::tests::fixtures::*;

// ============================================================================
// Registration & Email Verification
// ============================================================================

#[tokio::test]
async fn test_register_creates_unverified_account() {
    // GIVEN: A fresh service
    let h = test_harness();

    // WHEN: A user registers
    let user = h
        .auth
        .register(TEST_EMAIL, TEST_PASSWORD)
        .await
        .expect("registration should succeed");

    // THEN: The account starts unverified and inactive
    assert_eq!(user.email, TEST_EMAIL);
    assert!(!user.is_verified, "new accounts must not be verified");
    assert!(!user.is_active, "new accounts must not be active");
    assert_eq!(user.role, "user");

    // AND: A verification token was minted for it
    assert_eq!(
        h.tokens
            .issued_count(OneTimeTokenKind::EmailVerification, user.id),
        1
    );
}

#[tokio::test]
async fn test_register_stores_hashed_password() {
    // GIVEN: A fresh service
    let h = test_harness();

    // WHEN: A user registers
    let user = h
        .auth
        .register(TEST_EMAIL, TEST_PASSWORD)
        .await
        .expect("registration should succeed");

    // THEN: The stored credential is a hash that verifies, not the plaintext
    assert_ne!(user.password_hash, TEST_PASSWORD);
    assert!(verify_password(TEST_PASSWORD, &user.password_hash));
}

#[tokio::test]
async fn test_register_duplicate_email_rejected() {
    // GIVEN: An existing account
    let h = test_harness();
    h.auth
        .register(TEST_EMAIL, TEST_PASSWORD)
        .await
        .expect("first registration should succeed");

    // WHEN: A second registration uses the same email
    let result = h.auth.register(TEST_EMAIL, "another-password").await;

    // THEN: It should conflict
    assert!(
        matches!(result.unwrap_err(), AuthError::EmailInUse),
        "duplicate email should be rejected"
    );
}

#[tokio::test]
async fn test_verify_email_activates_account() {
    // GIVEN: A registered, unverified user
    let h = test_harness();
    let user = h
        .auth
        .register(TEST_EMAIL, TEST_PASSWORD)
        .await
        .expect("registration should succeed");
    let token = h
        .tokens
        .last_issued_token(OneTimeTokenKind::EmailVerification, user.id)
        .expect("verification token should be issued");

    // WHEN: The verification token is submitted
    h.auth
        .verify_email(&token)
        .await
        .expect("verification should succeed");

    // THEN: The account becomes verified and active
    let reloaded = h
        .users
        .find_by_id(user.id)
        .await
        .expect("lookup should succeed")
        .expect("user should exist");
    assert!(reloaded.is_verified);
    assert!(reloaded.is_active);
}

#[tokio::test]
async fn test_verification_token_single_use() {
    // GIVEN: A token that has already been consumed
    let h = test_harness();
    let user = h
        .auth
        .register(TEST_EMAIL, TEST_PASSWORD)
        .await
        .expect("registration should succeed");
    let token = h
        .tokens
        .last_issued_token(OneTimeTokenKind::EmailVerification, user.id)
        .expect("verification token should be issued");
    h.auth
        .verify_email(&token)
        .await
        .expect("first use should succeed");

    // WHEN: The same token is submitted again
    let result = h.auth.verify_email(&token).await;

    // THEN: The replay should be rejected
    assert!(
        matches!(result.unwrap_err(), AuthError::InvalidOrExpiredToken),
        "a consumed token must not work twice"
    );
}

#[tokio::test]
async fn test_verify_email_unknown_token_rejected() {
    // GIVEN: A token that was never issued
    let h = test_harness();

    // WHEN: It is submitted
    let result = h.auth.verify_email("deadbeefdeadbeefdeadbeef").await;

    // THEN: Should be rejected without distinguishing why
    assert!(matches!(
        result.unwrap_err(),
        AuthError::InvalidOrExpiredToken
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_verification_single_winner() {
    // GIVEN: One verification token and two racing consumers
    let h = test_harness();
    let user = h
        .auth
        .register(TEST_EMAIL, TEST_PASSWORD)
        .await
        .expect("registration should succeed");
    let token = h
        .tokens
        .last_issued_token(OneTimeTokenKind::EmailVerification, user.id)
        .expect("verification token should be issued");

    // WHEN: Both submit the same token concurrently
    let auth_a = h.auth.clone();
    let auth_b = h.auth.clone();
    let token_a = token.clone();
    let token_b = token;
    let (a, b) = tokio::join!(
        tokio::spawn(async move { auth_a.verify_email(&token_a).await }),
        tokio::spawn(async move { auth_b.verify_email(&token_b).await }),
    );
    let a = a.expect("task should not panic");
    let b = b.expect("task should not panic");

    // THEN: Exactly one consumption wins
    assert_eq!(
        a.is_ok() as usize + b.is_ok() as usize,
        1,
        "exactly one of two racing consumers should win"
    );
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_authenticate_happy_path() {
    // GIVEN: A verified account
    let h = test_harness();
    let user = registered_verified_user(&h, TEST_EMAIL, TEST_PASSWORD).await;

    // WHEN: It authenticates with the right password
    let authed = h
        .auth
        .authenticate(TEST_EMAIL, TEST_PASSWORD)
        .await
        .expect("authentication should succeed");

    // THEN: The right account comes back
    assert_eq!(authed.id, user.id);
}

#[tokio::test]
async fn test_authenticate_unverified_account_rejected() {
    // GIVEN: A registered but unverified account
    let h = test_harness();
    h.auth
        .register(TEST_EMAIL, TEST_PASSWORD)
        .await
        .expect("registration should succeed");

    // WHEN: It tries to log in with the correct password
    let result = h.auth.authenticate(TEST_EMAIL, TEST_PASSWORD).await;

    // THEN: It is told to verify first, not that the password was wrong
    assert!(
        matches!(result.unwrap_err(), AuthError::NotVerified),
        "unverified accounts must not authenticate"
    );
}

#[tokio::test]
async fn test_authenticate_wrong_password_rejected() {
    // GIVEN: A verified account
    let h = test_harness();
    registered_verified_user(&h, TEST_EMAIL, TEST_PASSWORD).await;

    // WHEN: The wrong password is presented
    let result = h.auth.authenticate(TEST_EMAIL, "not-the-password").await;

    // THEN: Should fail with the generic credentials error
    assert!(matches!(result.unwrap_err(), AuthError::InvalidCredentials));
}

#[tokio::test]
async fn test_authenticate_unknown_email_rejected() {
    // GIVEN: No account for the email
    let h = test_harness();

    // WHEN: Someone tries to log in with it
    let result = h.auth.authenticate("ghost@example.com", TEST_PASSWORD).await;

    // THEN: The failure is indistinguishable from a wrong password
    assert!(matches!(result.unwrap_err(), AuthError::InvalidCredentials));
}

// ============================================================================
// Token Pair Issuance
// ============================================================================

#[tokio::test]
async fn test_issued_pair_decodes_and_is_mirrored() {
    // GIVEN: A verified account
    let h = test_harness();
    let user = registered_verified_user(&h, TEST_EMAIL, TEST_PASSWORD).await;

    // WHEN: A token pair is issued
    let pair = h
        .auth
        .issue_token_pair(&user)
        .await
        .expect("issuance should succeed");

    // THEN: Both tokens decode with the right kind and subject
    let access = h.codec.decode(&pair.access_token).expect("access decodes");
    assert_eq!(access.kind, TokenKind::Access);
    assert_eq!(access.subject, user.id);

    let refresh = h
        .codec
        .decode(&pair.refresh_token)
        .expect("refresh decodes");
    assert_eq!(refresh.kind, TokenKind::Refresh);
    assert_eq!(refresh.subject, user.id);

    assert_eq!(pair.token_type, "bearer");

    // AND: The refresh jti is live in both stores
    assert!(h.cache.contains(refresh.jti), "cache should mirror the jti");
    let record = h
        .tokens
        .refresh_record(refresh.jti)
        .expect("durable record should exist");
    assert!(record.is_active());
    assert_eq!(record.user_id, user.id);
}

// ============================================================================
// Refresh Rotation
// ============================================================================

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    // GIVEN: A logged-in session
    let h = test_harness();
    let user = registered_verified_user(&h, TEST_EMAIL, TEST_PASSWORD).await;
    let pair = h.auth.issue_token_pair(&user).await.expect("issuance");
    let old_jti = h.codec.decode(&pair.refresh_token).expect("decode").jti;

    // WHEN: The refresh token is exchanged
    let rotated = h
        .auth
        .refresh(&pair.refresh_token)
        .await
        .expect("refresh should succeed");

    // THEN: A different refresh token comes back
    assert_ne!(rotated.refresh_token, pair.refresh_token);

    // AND: The old jti is dead in both stores while the new one is live
    let old_record = h.tokens.refresh_record(old_jti).expect("record kept");
    assert!(old_record.revoked_at.is_some(), "old jti must be revoked");
    assert!(!h.cache.contains(old_jti), "old jti must leave the cache");

    let new_jti = h.codec.decode(&rotated.refresh_token).expect("decode").jti;
    assert!(h.cache.contains(new_jti));
}

#[tokio::test]
async fn test_refresh_replay_rejected() {
    // GIVEN: A refresh token that was already rotated
    let h = test_harness();
    let user = registered_verified_user(&h, TEST_EMAIL, TEST_PASSWORD).await;
    let pair = h.auth.issue_token_pair(&user).await.expect("issuance");
    let rotated = h
        .auth
        .refresh(&pair.refresh_token)
        .await
        .expect("first refresh should succeed");

    // WHEN: The spent token is replayed
    let replay = h.auth.refresh(&pair.refresh_token).await;

    // THEN: The replay is rejected as revoked
    assert!(
        matches!(replay.unwrap_err(), AuthError::TokenRevokedOrExpired),
        "a rotated refresh token must not work again"
    );

    // AND: The successor token still works
    h.auth
        .refresh(&rotated.refresh_token)
        .await
        .expect("the successor token should remain usable");
}

#[tokio::test]
async fn test_refresh_with_access_token_rejected() {
    // GIVEN: A valid access token
    let h = test_harness();
    let user = registered_verified_user(&h, TEST_EMAIL, TEST_PASSWORD).await;
    let pair = h.auth.issue_token_pair(&user).await.expect("issuance");

    // WHEN: It is presented to the refresh endpoint
    let result = h.auth.refresh(&pair.access_token).await;

    // THEN: The wrong token kind is rejected outright
    assert!(matches!(result.unwrap_err(), AuthError::InvalidToken));
}

#[tokio::test]
async fn test_refresh_with_garbage_rejected() {
    // GIVEN: A string that is not a JWT at all
    let h = test_harness();

    // WHEN: It is presented to the refresh endpoint
    let result = h.auth.refresh("not-a-token").await;

    // THEN: Should fail signature/shape validation
    assert!(matches!(result.unwrap_err(), AuthError::InvalidToken));
}

#[tokio::test]
async fn test_refresh_denied_without_cache_entry() {
    // GIVEN: A session whose cache entry disappeared (eviction, flush),
    //        while the durable record still says active
    let h = test_harness();
    let user = registered_verified_user(&h, TEST_EMAIL, TEST_PASSWORD).await;
    let pair = h.auth.issue_token_pair(&user).await.expect("issuance");
    let jti = h.codec.decode(&pair.refresh_token).expect("decode").jti;
    h.cache.evict(jti);
    assert!(h.tokens.refresh_record(jti).expect("record").is_active());

    // WHEN: The token is exchanged
    let result = h.auth.refresh(&pair.refresh_token).await;

    // THEN: Cache absence alone is enough to deny
    assert!(
        matches!(result.unwrap_err(), AuthError::TokenRevokedOrExpired),
        "a missing cache entry must deny the refresh"
    );
}

#[tokio::test]
async fn test_refresh_denied_when_durable_revoked() {
    // GIVEN: A cache entry that survived a durable-side revocation
    let h = test_harness();
    let user = registered_verified_user(&h, TEST_EMAIL, TEST_PASSWORD).await;
    let pair = h.auth.issue_token_pair(&user).await.expect("issuance");
    let jti = h.codec.decode(&pair.refresh_token).expect("decode").jti;

    use crate::store::DurableTokenStore;
    assert!(h
        .tokens
        .revoke_refresh_token(jti)
        .await
        .expect("revocation should succeed"));
    assert!(h.cache.contains(jti), "cache entry deliberately left behind");

    // WHEN: The token is exchanged
    let result = h.auth.refresh(&pair.refresh_token).await;

    // THEN: The durable store has the final say
    assert!(matches!(
        result.unwrap_err(),
        AuthError::TokenRevokedOrExpired
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_refresh_single_winner() {
    // GIVEN: One refresh token and two racing clients
    let h = test_harness();
    let user = registered_verified_user(&h, TEST_EMAIL, TEST_PASSWORD).await;
    let pair = h.auth.issue_token_pair(&user).await.expect("issuance");

    // WHEN: Both exchange the same token concurrently
    let auth_a = h.auth.clone();
    let auth_b = h.auth.clone();
    let token_a = pair.refresh_token.clone();
    let token_b = pair.refresh_token.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { auth_a.refresh(&token_a).await }),
        tokio::spawn(async move { auth_b.refresh(&token_b).await }),
    );
    let a = a.expect("task should not panic");
    let b = b.expect("task should not panic");

    // THEN: Exactly one rotation wins
    assert_eq!(
        a.is_ok() as usize + b.is_ok() as usize,
        1,
        "exactly one concurrent refresh should win"
    );

    // AND: The loser sees the same error a replayed token gets
    let loser = if a.is_err() {
        a.unwrap_err()
    } else {
        b.unwrap_err()
    };
    assert!(matches!(loser, AuthError::TokenRevokedOrExpired));
}

// ============================================================================
// Logout
// ============================================================================

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    // GIVEN: A logged-in session
    let h = test_harness();
    let user = registered_verified_user(&h, TEST_EMAIL, TEST_PASSWORD).await;
    let pair = h.auth.issue_token_pair(&user).await.expect("issuance");
    let jti = h.codec.decode(&pair.refresh_token).expect("decode").jti;

    // WHEN: The session logs out
    h.auth
        .logout(&pair.refresh_token)
        .await
        .expect("logout should succeed");

    // THEN: The token is dead in both stores
    assert!(!h.cache.contains(jti));
    let record = h.tokens.refresh_record(jti).expect("record kept");
    assert!(record.revoked_at.is_some());

    // AND: A later refresh attempt fails
    let result = h.auth.refresh(&pair.refresh_token).await;
    assert!(matches!(
        result.unwrap_err(),
        AuthError::TokenRevokedOrExpired
    ));
}

#[tokio::test]
async fn test_logout_idempotent() {
    // GIVEN: A session that already logged out
    let h = test_harness();
    let user = registered_verified_user(&h, TEST_EMAIL, TEST_PASSWORD).await;
    let pair = h.auth.issue_token_pair(&user).await.expect("issuance");
    h.auth
        .logout(&pair.refresh_token)
        .await
        .expect("first logout should succeed");

    // WHEN: Logout is called again with the same token
    let result = h.auth.logout(&pair.refresh_token).await;

    // THEN: Still succeeds
    assert!(result.is_ok(), "logout must be idempotent");
}

#[tokio::test]
async fn test_logout_garbage_token_rejected() {
    // GIVEN: A malformed token
    let h = test_harness();

    // WHEN: It is presented to logout
    let result = h.auth.logout("garbage").await;

    // THEN: The decode failure surfaces
    assert!(matches!(result.unwrap_err(), AuthError::InvalidToken));
}

// ============================================================================
// Password Reset
// ============================================================================

#[tokio::test]
async fn test_password_reset_unknown_email_silent() {
    // GIVEN: No account for the email
    let h = test_harness();

    // WHEN: A reset is requested for it
    let result = h.auth.request_password_reset("ghost@example.com").await;

    // THEN: The caller cannot tell the account does not exist
    assert!(result.is_ok(), "unknown emails must not be revealed");

    // AND: No token was minted
    assert_eq!(h.tokens.issued_total(OneTimeTokenKind::PasswordReset), 0);
}

#[tokio::test]
async fn test_password_reset_flow() {
    // GIVEN: A verified account that requested a reset
    let h = test_harness();
    let user = registered_verified_user(&h, TEST_EMAIL, TEST_PASSWORD).await;
    h.auth
        .request_password_reset(TEST_EMAIL)
        .await
        .expect("request should succeed");
    let token = h
        .tokens
        .last_issued_token(OneTimeTokenKind::PasswordReset, user.id)
        .expect("reset token should be issued");

    // WHEN: The reset is confirmed with a new password
    h.auth
        .confirm_password_reset(&token, "a-brand-new-password")
        .await
        .expect("confirmation should succeed");

    // THEN: Only the new password authenticates
    let authed = h
        .auth
        .authenticate(TEST_EMAIL, "a-brand-new-password")
        .await
        .expect("new password should work");
    assert_eq!(authed.id, user.id);

    let old = h.auth.authenticate(TEST_EMAIL, TEST_PASSWORD).await;
    assert!(matches!(old.unwrap_err(), AuthError::InvalidCredentials));
}

#[tokio::test]
async fn test_password_reset_revokes_all_sessions() {
    // GIVEN: An account with two live sessions
    let h = test_harness();
    let user = registered_verified_user(&h, TEST_EMAIL, TEST_PASSWORD).await;
    let desktop = h.auth.issue_token_pair(&user).await.expect("issuance");
    let mobile = h.auth.issue_token_pair(&user).await.expect("issuance");

    // WHEN: A password reset completes
    h.auth
        .request_password_reset(TEST_EMAIL)
        .await
        .expect("request should succeed");
    let token = h
        .tokens
        .last_issued_token(OneTimeTokenKind::PasswordReset, user.id)
        .expect("reset token should be issued");
    h.auth
        .confirm_password_reset(&token, "a-brand-new-password")
        .await
        .expect("confirmation should succeed");

    // THEN: Every pre-existing session is dead
    let desktop_refresh = h.auth.refresh(&desktop.refresh_token).await;
    assert!(matches!(
        desktop_refresh.unwrap_err(),
        AuthError::TokenRevokedOrExpired
    ));
    let mobile_refresh = h.auth.refresh(&mobile.refresh_token).await;
    assert!(matches!(
        mobile_refresh.unwrap_err(),
        AuthError::TokenRevokedOrExpired
    ));
}

#[tokio::test]
async fn test_reset_token_single_use() {
    // GIVEN: A reset token that was already spent
    let h = test_harness();
    let user = registered_verified_user(&h, TEST_EMAIL, TEST_PASSWORD).await;
    h.auth
        .request_password_reset(TEST_EMAIL)
        .await
        .expect("request should succeed");
    let token = h
        .tokens
        .last_issued_token(OneTimeTokenKind::PasswordReset, user.id)
        .expect("reset token should be issued");
    h.auth
        .confirm_password_reset(&token, "first-new-password")
        .await
        .expect("first use should succeed");

    // WHEN: The same token is used again
    let result = h.auth.confirm_password_reset(&token, "second-attempt").await;

    // THEN: The replay is rejected
    assert!(matches!(
        result.unwrap_err(),
        AuthError::InvalidOrExpiredToken
    ));
}

#[tokio::test]
async fn test_reset_token_not_valid_for_verification() {
    // GIVEN: A password reset token
    let h = test_harness();
    let user = registered_verified_user(&h, TEST_EMAIL, TEST_PASSWORD).await;
    h.auth
        .request_password_reset(TEST_EMAIL)
        .await
        .expect("request should succeed");
    let token = h
        .tokens
        .last_issued_token(OneTimeTokenKind::PasswordReset, user.id)
        .expect("reset token should be issued");

    // WHEN: It is submitted to email verification
    let result = h.auth.verify_email(&token).await;

    // THEN: The families do not cross
    assert!(matches!(
        result.unwrap_err(),
        AuthError::InvalidOrExpiredToken
    ));
}

// ============================================================================
// Email Change
// ============================================================================

#[tokio::test]
async fn test_change_email_drops_verification() {
    // GIVEN: A verified account
    let h = test_harness();
    let user = registered_verified_user(&h, TEST_EMAIL, TEST_PASSWORD).await;

    // WHEN: The email is changed
    let updated = h
        .auth
        .change_email(user.id, TEST_EMAIL_2)
        .await
        .expect("email change should succeed");

    // THEN: The account drops back to unverified and inactive
    assert_eq!(updated.email, TEST_EMAIL_2);
    assert!(!updated.is_verified);
    assert!(!updated.is_active);

    // AND: A fresh verification token restores it
    let token = h
        .tokens
        .last_issued_token(OneTimeTokenKind::EmailVerification, user.id)
        .expect("a new verification token should be issued");
    h.auth
        .verify_email(&token)
        .await
        .expect("re-verification should succeed");

    let reloaded = h
        .users
        .find_by_id(user.id)
        .await
        .expect("lookup should succeed")
        .expect("user should exist");
    assert!(reloaded.is_verified);
    assert!(reloaded.is_active);
}

#[tokio::test]
async fn test_change_email_conflict_rejected() {
    // GIVEN: Two accounts
    let h = test_harness();
    let user = registered_verified_user(&h, TEST_EMAIL, TEST_PASSWORD).await;
    registered_verified_user(&h, TEST_EMAIL_2, TEST_PASSWORD).await;

    // WHEN: The first tries to take the second's address
    let result = h.auth.change_email(user.id, TEST_EMAIL_2).await;

    // THEN: The conflict is reported
    assert!(matches!(result.unwrap_err(), AuthError::EmailInUse));
}
