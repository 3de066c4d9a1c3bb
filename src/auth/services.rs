use rand::Rng;
use time::{Duration, OffsetDateTime};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        cookies::SessionTokens,
        csrf::generate_csrf_token,
        dto::{ChangePasswordRequest, RegisterRequest, ResetPasswordRequest},
        jwt::{JwtKeys, TokenKind},
        password::{hash_password, verify_password},
        repo_types::{NewUser, UniqueViolation, User},
        validation::{
            is_valid_email, is_valid_handle, is_valid_name, is_valid_password, sanitize_bio,
            MAX_BIO_LEN, MIN_PASSWORD_LEN,
        },
    },
    error::{AppError, AppResult, FieldError},
    mail::reset_code_mail,
    state::AppState,
};

pub const RESET_CODE_TTL_MINUTES: i64 = 15;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Six upper-case hex characters.
pub fn generate_reset_code() -> String {
    let bytes: [u8; 3] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

pub fn issue_session(keys: &JwtKeys, user_id: Uuid) -> anyhow::Result<SessionTokens> {
    Ok(SessionTokens {
        access_token: keys.sign_access(user_id)?,
        refresh_token: keys.sign_refresh(user_id)?,
        csrf_token: generate_csrf_token(),
    })
}

fn validate_registration(req: &mut RegisterRequest) -> AppResult<NewUser> {
    req.email = normalize_email(&req.email);
    req.handle = req.handle.trim().to_string();
    req.first_name = req.first_name.trim().to_string();
    req.last_name = req.last_name.trim().to_string();

    let mut errors = Vec::new();
    if !is_valid_email(&req.email) {
        errors.push(FieldError::new("email", "must be a valid email address"));
    }
    if !is_valid_password(&req.password) {
        errors.push(FieldError::new(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    if !is_valid_handle(&req.handle) {
        errors.push(FieldError::new(
            "handle",
            "must be 3-30 letters, digits, '_' or '.', not starting with a digit",
        ));
    }
    if !is_valid_name(&req.first_name) {
        errors.push(FieldError::new("first_name", "may contain only letters, spaces, '-' and '''"));
    }
    if !is_valid_name(&req.last_name) {
        errors.push(FieldError::new("last_name", "may contain only letters, spaces, '-' and '''"));
    }
    let bio = req.bio.as_deref().and_then(sanitize_bio);
    if bio.as_ref().is_some_and(|b| b.chars().count() > MAX_BIO_LEN) {
        errors.push(FieldError::new("bio", format!("must be at most {MAX_BIO_LEN} characters")));
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    Ok(NewUser {
        email: req.email.clone(),
        handle: req.handle.clone(),
        first_name: req.first_name.clone(),
        last_name: req.last_name.clone(),
        bio,
        password_hash: None,
    })
}

pub async fn register(
    state: &AppState,
    mut req: RegisterRequest,
) -> AppResult<(User, SessionTokens)> {
    let mut new_user = validate_registration(&mut req)?;

    if state.users.find_by_email(&new_user.email).await?.is_some() {
        warn!(email = %new_user.email, "email already registered");
        return Err(AppError::EmailTaken);
    }
    if state.users.find_by_handle(&new_user.handle).await?.is_some() {
        warn!(handle = %new_user.handle, "handle already taken");
        return Err(AppError::HandleTaken);
    }

    new_user.password_hash = Some(hash_password(&req.password)?);
    let user = match state.users.create(new_user).await {
        Ok(u) => u,
        Err(e) => {
            let violation = e.downcast_ref::<UniqueViolation>().copied();
            return Err(match violation {
                Some(UniqueViolation::Email) => AppError::EmailTaken,
                Some(UniqueViolation::Handle) => AppError::HandleTaken,
                None => {
                    error!(error = %e, "create user failed");
                    AppError::Internal(e)
                }
            })
        }
    };

    let tokens = issue_session(&state.jwt, user.id)?;
    info!(user_id = %user.id, "user registered");
    Ok((user, tokens))
}

pub async fn login(
    state: &AppState,
    email: &str,
    password: &str,
) -> AppResult<(User, SessionTokens)> {
    let email = normalize_email(email);
    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!("login unknown email");
        return Err(AppError::InvalidCredentials);
    };
    let Some(hash) = user.password_hash.as_deref() else {
        warn!(user_id = %user.id, "login on account without local credentials");
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password(password, hash) {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let tokens = issue_session(&state.jwt, user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok((user, tokens))
}

/// Rotates the whole cookie triad. Any problem with the refresh token is a
/// plain 401.
pub async fn refresh(
    state: &AppState,
    refresh_token: Option<&str>,
) -> AppResult<(User, SessionTokens)> {
    let token = refresh_token.ok_or(AppError::Unauthorized)?;
    let claims = state
        .jwt
        .decode_kind(token, TokenKind::Refresh)
        .map_err(|e| {
            warn!(reason = %e, "refresh token rejected");
            AppError::Unauthorized
        })?;
    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let tokens = issue_session(&state.jwt, user.id)?;
    info!(user_id = %user.id, "session refreshed");
    Ok((user, tokens))
}

/// Silently succeeds for unknown emails and for mail failures.
pub async fn forgot_password(state: &AppState, email: &str) -> AppResult<()> {
    let email = normalize_email(email);
    let Some(user) = state.users.find_by_email(&email).await? else {
        info!("password reset requested for unknown email");
        return Ok(());
    };

    let code = generate_reset_code();
    let expires = OffsetDateTime::now_utc() + Duration::minutes(RESET_CODE_TTL_MINUTES);
    state.users.set_reset_code(user.id, &code, expires).await?;

    let (subject, body) = reset_code_mail(&code, RESET_CODE_TTL_MINUTES);
    if let Err(e) = state.mailer.send(&user.email, &subject, &body).await {
        error!(error = %e, user_id = %user.id, "reset mail failed");
    }
    info!(user_id = %user.id, "password reset code issued");
    Ok(())
}

pub async fn reset_password(state: &AppState, req: ResetPasswordRequest) -> AppResult<()> {
    if !is_valid_password(&req.new_password) {
        return Err(AppError::invalid(
            "new_password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    let email = normalize_email(&req.email);
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AppError::InvalidResetCode)?;

    let code = req.code.trim();
    let code_ok = match (&user.reset_password_code, user.reset_password_expires) {
        (Some(stored), Some(expires)) => stored == code && expires > OffsetDateTime::now_utc(),
        _ => false,
    };
    if !code_ok {
        warn!(user_id = %user.id, "invalid or expired reset code");
        return Err(AppError::InvalidResetCode);
    }

    let hash = hash_password(&req.new_password)?;
    // the write re-checks the code, so a racing reset with the same code loses here
    if !state.users.redeem_reset_code(user.id, code, &hash).await? {
        warn!(user_id = %user.id, "reset code already redeemed");
        return Err(AppError::InvalidResetCode);
    }
    info!(user_id = %user.id, "password reset");
    Ok(())
}

pub async fn change_password(
    state: &AppState,
    user_id: Uuid,
    req: ChangePasswordRequest,
) -> AppResult<()> {
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let current_ok = user
        .password_hash
        .as_deref()
        .is_some_and(|h| verify_password(&req.current_password, h));
    if !current_ok {
        return Err(AppError::InvalidCredentials);
    }
    if !is_valid_password(&req.new_password) {
        return Err(AppError::invalid(
            "new_password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    let hash = hash_password(&req.new_password)?;
    state.users.set_password(user.id, &hash).await?;
    info!(%user_id, "password changed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::dto::ForgotPasswordRequest, testing::registration};

    #[tokio::test]
    async fn duplicate_email_any_case_is_email_conflict() {
        let state = AppState::fake();
        register(&state, registration("film@x.io", "alice")).await.unwrap();
        let err = register(&state, registration("FILM@X.IO", "someone_else")).await.unwrap_err();
        assert!(matches!(err, AppError::EmailTaken));
    }

    #[tokio::test]
    async fn duplicate_handle_is_handle_conflict() {
        let state = AppState::fake();
        register(&state, registration("one@x.io", "alice")).await.unwrap();
        let err = register(&state, registration("two@x.io", "alice")).await.unwrap_err();
        assert!(matches!(err, AppError::HandleTaken));
        // handles compare exactly
        assert!(register(&state, registration("three@x.io", "Alice")).await.is_ok());
    }

    #[tokio::test]
    async fn registration_hashes_and_sanitizes() {
        let state = AppState::fake();
        let mut req = registration("bio@x.io", "biographer");
        req.bio = Some("<i>Loves</i> westerns".into());
        let (user, tokens) = register(&state, req).await.unwrap();
        assert_eq!(user.bio.as_deref(), Some("Loves westerns"));
        let stored = user.password_hash.unwrap();
        assert_ne!(stored, "password123");
        assert!(verify_password("password123", &stored));
        assert_eq!(state.jwt.decode(&tokens.access_token).unwrap().sub, user.id);
    }

    #[tokio::test]
    async fn registration_reports_every_invalid_field() {
        let state = AppState::fake();
        let mut req = registration("nope", "9lives");
        req.password = "short".into();
        req.first_name = "R2D2".into();
        let AppError::Validation(fields) = register(&state, req).await.unwrap_err() else {
            panic!("expected validation error");
        };
        let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, vec!["email", "password", "handle", "first_name"]);
    }

    #[tokio::test]
    async fn login_without_local_password_is_invalid_credentials() {
        let state = AppState::fake();
        crate::testing::seed_external_user(&state, "sso@x.io", "sso_user").await;
        let err = login(&state, "sso@x.io", "whatever1").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn login_is_case_insensitive_on_email() {
        let state = AppState::fake();
        register(&state, registration("case@x.io", "casey")).await.unwrap();
        assert!(login(&state, " Case@X.io ", "password123").await.is_ok());
        assert!(matches!(
            login(&state, "case@x.io", "wrong-password").await.unwrap_err(),
            AppError::InvalidCredentials
        ));
    }

    #[tokio::test]
    async fn refresh_requires_refresh_type() {
        let state = AppState::fake();
        let (_, tokens) = register(&state, registration("r@x.io", "refresher")).await.unwrap();
        assert!(matches!(refresh(&state, None).await.unwrap_err(), AppError::Unauthorized));
        assert!(matches!(
            refresh(&state, Some(&tokens.access_token)).await.unwrap_err(),
            AppError::Unauthorized
        ));
        let (_, rotated) = refresh(&state, Some(&tokens.refresh_token)).await.unwrap();
        assert_ne!(rotated.csrf_token, tokens.csrf_token);
    }

    #[tokio::test]
    async fn expired_refresh_token_fails_closed() {
        let state = AppState::fake();
        let (user, _) = register(&state, registration("e@x.io", "expiring")).await.unwrap();
        let stale = state
            .jwt
            .issue(user.id, TokenKind::Refresh, Duration::seconds(-60))
            .unwrap();
        assert!(matches!(refresh(&state, Some(&stale)).await.unwrap_err(), AppError::Unauthorized));
    }

    #[tokio::test]
    async fn reset_code_is_single_use() {
        let state = AppState::fake();
        register(&state, registration("reset@x.io", "resetter")).await.unwrap();
        let req = ForgotPasswordRequest { email: "reset@x.io".into() };
        forgot_password(&state, &req.email).await.unwrap();

        let code = crate::testing::reset_code_for(&state, "reset@x.io").await.expect("code stored");
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));

        let reset = |code: &str| ResetPasswordRequest {
            email: "reset@x.io".into(),
            code: code.into(),
            new_password: "brand-new-pass".into(),
        };
        reset_password(&state, reset(&code)).await.unwrap();
        assert!(matches!(
            reset_password(&state, reset(&code)).await.unwrap_err(),
            AppError::InvalidResetCode
        ));
        assert!(matches!(
            login(&state, "reset@x.io", "password123").await.unwrap_err(),
            AppError::InvalidCredentials
        ));
        assert!(login(&state, "reset@x.io", "brand-new-pass").await.is_ok());
    }

    #[tokio::test]
    async fn wrong_or_expired_code_is_rejected() {
        let state = AppState::fake();
        let (user, _) = register(&state, registration("x@x.io", "xavier")).await.unwrap();
        state
            .users
            .set_reset_code(user.id, "ABCDEF", OffsetDateTime::now_utc() - Duration::minutes(1))
            .await
            .unwrap();
        let req = |code: &str| ResetPasswordRequest {
            email: "x@x.io".into(),
            code: code.into(),
            new_password: "another-pass".into(),
        };
        assert!(matches!(
            reset_password(&state, req("ABCDEF")).await.unwrap_err(),
            AppError::InvalidResetCode
        ));
        assert!(matches!(
            reset_password(&state, req("000000")).await.unwrap_err(),
            AppError::InvalidResetCode
        ));
    }

    #[tokio::test]
    async fn concurrent_resets_with_one_code_succeed_once() {
        let state = AppState::fake();
        register(&state, registration("race@x.io", "racer")).await.unwrap();
        forgot_password(&state, "race@x.io").await.unwrap();
        let code = crate::testing::reset_code_for(&state, "race@x.io").await.unwrap();

        let req = |pw: &str| ResetPasswordRequest {
            email: "race@x.io".into(),
            code: code.clone(),
            new_password: pw.into(),
        };
        let (a, b) = tokio::join!(
            reset_password(&state, req("first-new-pass")),
            reset_password(&state, req("second-new-pass")),
        );
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    }

    #[tokio::test]
    async fn redeem_rejects_a_consumed_code() {
        let state = AppState::fake();
        let (user, _) = register(&state, registration("used@x.io", "used_code")).await.unwrap();
        let expires = OffsetDateTime::now_utc() + Duration::minutes(5);
        state.users.set_reset_code(user.id, "C0FFEE", expires).await.unwrap();
        assert!(state.users.redeem_reset_code(user.id, "C0FFEE", "h1").await.unwrap());
        assert!(!state.users.redeem_reset_code(user.id, "C0FFEE", "h2").await.unwrap());
    }

    #[tokio::test]
    async fn forgot_password_on_unknown_email_is_silent() {
        let state = AppState::fake();
        forgot_password(&state, "ghost@x.io").await.unwrap();
        assert!(crate::testing::reset_code_for(&state, "ghost@x.io").await.is_none());
    }

    #[tokio::test]
    async fn mail_failure_is_swallowed() {
        let mut state = AppState::fake();
        state.mailer = std::sync::Arc::new(crate::testing::FailingMailer);
        register(&state, registration("m@x.io", "mailless")).await.unwrap();
        forgot_password(&state, "m@x.io").await.unwrap();
        assert!(crate::testing::reset_code_for(&state, "m@x.io").await.is_some());
    }

    #[tokio::test]
    async fn change_password_needs_current_one() {
        let state = AppState::fake();
        let (user, _) = register(&state, registration("c@x.io", "changer")).await.unwrap();
        let bad = ChangePasswordRequest {
            current_password: "nope-nope".into(),
            new_password: "newpassword".into(),
        };
        assert!(matches!(
            change_password(&state, user.id, bad).await.unwrap_err(),
            AppError::InvalidCredentials
        ));
        let good = ChangePasswordRequest {
            current_password: "password123".into(),
            new_password: "newpassword".into(),
        };
        change_password(&state, user.id, good).await.unwrap();
        assert!(login(&state, "c@x.io", "newpassword").await.is_ok());
    }

    #[test]
    fn reset_codes_are_six_hex_chars() {
        for _ in 0..20 {
            let c = generate_reset_code();
            assert_eq!(c.len(), 6);
            assert!(c.chars().all(|ch| ch.is_ascii_hexdigit()));
        }
    }
}
