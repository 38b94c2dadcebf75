///! Integration tests for session tokens, password hashing and the auth
///! service.
///!
///! Token tests need no database; the service tests run against an in-memory
///! SQLite schema.
///!
///! Run with: `cargo test --test auth_test`
mod common;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use uuid::Uuid;

use freelance_backend::auth::jwt::{Claims, create_token, validate_token};
use freelance_backend::auth::password;
use freelance_backend::error::AppError;
use freelance_backend::models::users::{EmailRequest, LoginUser, RegisterUser, ResetPassword, Roles};
use freelance_backend::services::auth as auth_service;

use common::{
    FailingMailer, FakeMailer, LINK_BASE, TEST_SECRET, account_context, jwt_config, setup_db,
};

/// Pull the token out of an emailed `{LINK_BASE}/{path}/{token}` link.
fn link_token(body: &str, path: &str) -> String {
    let marker = format!("{LINK_BASE}/{path}/");
    let start = body.find(&marker).expect("Email should contain the link") + marker.len();
    body[start..]
        .split_whitespace()
        .next()
        .expect("Link should carry a token")
        .to_string()
}

fn email(address: &str) -> EmailRequest {
    EmailRequest {
        email: address.to_string(),
    }
}

fn register_input(email: &str, role: Option<Roles>) -> RegisterUser {
    RegisterUser {
        name: "Alice Smith".to_string(),
        email: email.to_string(),
        password: "correct-horse-battery".to_string(),
        role,
    }
}

#[test]
fn test_issued_token_decodes_correctly() {
    let user_id = Uuid::new_v4();
    let token = create_token(user_id, Roles::Freelancer, TEST_SECRET, 60).expect("Token should sign");

    let claims = validate_token(&token, TEST_SECRET).expect("Token should be valid");

    assert_eq!(claims.sub, user_id.to_string());
    assert_eq!(claims.role, Roles::Freelancer);
    assert_eq!(claims.user_id().unwrap(), user_id);
    assert!(claims.exp > claims.iat);
}

#[test]
fn test_expired_token_is_rejected() {
    let now = Utc::now().timestamp() as usize;

    let claims = Claims {
        sub: Uuid::new_v4().to_string(),
        role: Roles::Client,
        iat: now - 3600,
        exp: now - 300, // expired 5 minutes ago (well past the 60s default leeway)
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap();

    let result = validate_token(&token, TEST_SECRET);
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("ExpiredSignature"));
}

#[test]
fn test_wrong_secret_is_rejected() {
    let token = create_token(Uuid::new_v4(), Roles::Client, TEST_SECRET, 60).unwrap();

    let result = validate_token(&token, "completely-wrong-secret-xxxxxxxxxxxxxxxxxxx");
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("InvalidSignature"));
}

#[test]
fn test_garbage_token_is_rejected() {
    let result = validate_token("not.a.valid.jwt", TEST_SECRET);
    assert!(result.is_err());
}

#[test]
fn test_non_uuid_subject_is_reported() {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: "not-a-uuid".to_string(),
        role: Roles::Client,
        iat: now,
        exp: now + 3600,
    };
    assert!(claims.user_id().is_err());
}

#[test]
fn test_password_hash_round_trip() {
    let hashed = password::hash("correct-horse-battery").unwrap();
    assert_ne!(hashed, "correct-horse-battery");
    assert!(password::compare("correct-horse-battery", &hashed).unwrap());
    assert!(!password::compare("wrong-password", &hashed).unwrap());
}

#[tokio::test]
async fn test_register_and_login() {
    let db = setup_db().await;
    let mailer = FakeMailer::default();
    let jwt = jwt_config();
    let ctx = account_context(&db, &mailer, &jwt);

    let registered = auth_service::register(&ctx, register_input("Alice@Example.com", None))
        .await
        .expect("Registration should succeed");
    assert_eq!(registered.user.email, "alice@example.com");
    assert_eq!(registered.user.role, Roles::Freelancer);

    let logged_in = auth_service::login(
        &db,
        &jwt_config(),
        LoginUser {
            email: "alice@example.com".to_string(),
            password: "correct-horse-battery".to_string(),
        },
    )
    .await
    .expect("Login should succeed");
    let claims = validate_token(&logged_in.token, TEST_SECRET).unwrap();
    assert_eq!(claims.user_id().unwrap(), registered.user.id);

    let err = auth_service::login(
        &db,
        &jwt_config(),
        LoginUser {
            email: "alice@example.com".to_string(),
            password: "not-the-password".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Authentication(_)), "got {err:?}");
}

#[tokio::test]
async fn test_register_rejections() {
    let db = setup_db().await;
    let mailer = FakeMailer::default();
    let jwt = jwt_config();
    let ctx = account_context(&db, &mailer, &jwt);

    auth_service::register(&ctx, register_input("bob@example.com", Some(Roles::Client)))
        .await
        .expect("First registration succeeds");

    let err = auth_service::register(&ctx, register_input("BOB@example.com", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");

    let err = auth_service::register(&ctx, register_input("root@example.com", Some(Roles::Admin)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    let mut short = register_input("short@example.com", None);
    short.password = "abc".to_string();
    let err = auth_service::register(&ctx, short).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn test_email_verification_flow() {
    let db = setup_db().await;
    let mailer = FakeMailer::default();
    let jwt = jwt_config();
    let ctx = account_context(&db, &mailer, &jwt);

    let registered = auth_service::register(&ctx, register_input("vera@example.com", None))
        .await
        .expect("Registration should succeed");
    assert!(!registered.user.email_verified);

    let notices = mailer.notices_to("vera@example.com");
    assert_eq!(notices.len(), 1);
    let token = link_token(&notices[0].body, "api/auth/verify-email");

    // A session token is not a verification link.
    let err = auth_service::verify_email(&ctx, &registered.token)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    let verified = auth_service::verify_email(&ctx, &token)
        .await
        .expect("Verification should succeed");
    assert_eq!(verified.id, registered.user.id);
    assert!(verified.email_verified);

    let err = auth_service::verify_email(&ctx, &token).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "got {err:?}");

    let err = auth_service::resend_verification(&ctx, email("vera@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "got {err:?}");

    let err = auth_service::verify_email(&ctx, "not-a-token").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn test_resend_verification() {
    let db = setup_db().await;
    let mailer = FakeMailer::default();
    let jwt = jwt_config();
    let ctx = account_context(&db, &mailer, &jwt);

    auth_service::register(&ctx, register_input("uma@example.com", None))
        .await
        .expect("Registration should succeed");
    auth_service::resend_verification(&ctx, email("UMA@example.com"))
        .await
        .expect("Resend should succeed");
    assert_eq!(mailer.notices_to("uma@example.com").len(), 2);

    let err = auth_service::resend_verification(&ctx, email("nobody@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn test_registration_survives_mail_outage() {
    let db = setup_db().await;
    let mailer = FailingMailer::default();
    let jwt = jwt_config();
    let ctx = account_context(&db, &mailer, &jwt);

    let registered = auth_service::register(&ctx, register_input("otto@example.com", None))
        .await
        .expect("Registration should not depend on the mail relay");
    assert_eq!(registered.user.email, "otto@example.com");
    assert_eq!(*mailer.attempts.lock().unwrap(), 1);

    let err = auth_service::forgot_password(&ctx, email("otto@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Internal(_)), "got {err:?}");
}

#[tokio::test]
async fn test_password_reset_flow() {
    let db = setup_db().await;
    let mailer = FakeMailer::default();
    let jwt = jwt_config();
    let ctx = account_context(&db, &mailer, &jwt);

    auth_service::register(&ctx, register_input("rita@example.com", None))
        .await
        .expect("Registration should succeed");

    let err = auth_service::forgot_password(&ctx, email("nobody@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");

    auth_service::forgot_password(&ctx, email("rita@example.com"))
        .await
        .expect("Reset email should be sent");
    let notices = mailer.notices_to("rita@example.com");
    let reset = notices
        .iter()
        .find(|n| n.body.contains("/reset-password/"))
        .expect("Reset email should be sent");
    let token = link_token(&reset.body, "reset-password");

    let err = auth_service::reset_password(
        &ctx,
        &token,
        ResetPassword {
            password: "abc".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    auth_service::reset_password(
        &ctx,
        &token,
        ResetPassword {
            password: "a-brand-new-secret".to_string(),
        },
    )
    .await
    .expect("Reset should succeed");

    let err = auth_service::reset_password(
        &ctx,
        &token,
        ResetPassword {
            password: "yet-another-secret".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    let err = auth_service::login(
        &db,
        &jwt,
        LoginUser {
            email: "rita@example.com".to_string(),
            password: "correct-horse-battery".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Authentication(_)), "got {err:?}");

    auth_service::login(
        &db,
        &jwt,
        LoginUser {
            email: "rita@example.com".to_string(),
            password: "a-brand-new-secret".to_string(),
        },
    )
    .await
    .expect("Login with the new password should succeed");
}
