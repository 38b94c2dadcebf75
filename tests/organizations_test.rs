//! Organizations: ownership, invitations and membership.
//!
//! Run with: `cargo test --test organizations_test`
mod common;

use sea_orm::DatabaseConnection;

use freelance_backend::error::AppError;
use freelance_backend::models::organization_members::MemberRole;
use freelance_backend::models::organizations::{
    self, CreateOrganization, InviteMember, InviteOutcome, UpdateOrganization,
};
use freelance_backend::models::users::{self, RegisterUser, Roles};
use freelance_backend::services::{auth as auth_service, organizations as org_service};

use common::{FakeMailer, account_context, create_user, jwt_config, setup_db};

async fn create_org(db: &DatabaseConnection, owner: &users::Model) -> organizations::Model {
    org_service::create_organization(
        db,
        owner,
        CreateOrganization {
            name: "Pixel Studio".to_string(),
            description: Some("Design collective".to_string()),
        },
    )
    .await
    .expect("Organization should be created")
}

fn invite(organization_id: uuid::Uuid, email: &str) -> InviteMember {
    InviteMember {
        organization_id,
        email: email.to_string(),
    }
}

#[tokio::test]
async fn test_owner_is_the_first_admin() {
    let db = setup_db().await;
    let owner = create_user(&db, "Olga", Roles::Client).await;

    let org = create_org(&db, &owner).await;
    assert_eq!(org.owner_id, owner.id);

    let members = org_service::get_members(&db, &owner, org.id)
        .await
        .expect("Owner can list members");
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, owner.id);
    assert_eq!(members[0].role, MemberRole::Admin);

    let mine = org_service::my_organizations(&db, &owner).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, org.id);

    let err = org_service::create_organization(
        &db,
        &owner,
        CreateOrganization {
            name: "   ".to_string(),
            description: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn test_invite_existing_user_and_pending_email() {
    let db = setup_db().await;
    let mailer = FakeMailer::default();
    let owner = create_user(&db, "Olga", Roles::Client).await;
    let member = create_user(&db, "Max", Roles::Freelancer).await;
    let org = create_org(&db, &owner).await;

    let outcome = org_service::invite_member(&db, &mailer, &owner, invite(org.id, &member.email))
        .await
        .expect("Existing user is added");
    assert_eq!(outcome, InviteOutcome::Added { user_id: member.id });
    assert_eq!(mailer.notices_to(&member.email).len(), 1);

    let err = org_service::invite_member(&db, &mailer, &owner, invite(org.id, &member.email))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");

    let outcome = org_service::invite_member(&db, &mailer, &owner, invite(org.id, "Nina@Example.com"))
        .await
        .expect("Unknown email becomes a pending invite");
    assert_eq!(
        outcome,
        InviteOutcome::Pending {
            email: "nina@example.com".to_string()
        }
    );
    assert_eq!(mailer.notices_to("nina@example.com").len(), 1);

    let err = org_service::invite_member(&db, &mailer, &owner, invite(org.id, "nina@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");

    let detail = org_service::get_organization(&db, &member, org.id)
        .await
        .expect("Members can view the organization");
    assert_eq!(detail.members.len(), 2);
    assert_eq!(detail.pending_invites, vec!["nina@example.com".to_string()]);

    // Registering with the invited email joins the organization.
    let jwt = jwt_config();
    let registered = auth_service::register(
        &account_context(&db, &mailer, &jwt),
        RegisterUser {
            name: "Nina".to_string(),
            email: "nina@example.com".to_string(),
            password: "correct-horse-battery".to_string(),
            role: Some(Roles::Freelancer),
        },
    )
    .await
    .expect("Registration should succeed");

    let detail = org_service::get_organization(&db, &owner, org.id).await.unwrap();
    assert_eq!(detail.members.len(), 3);
    assert!(detail.pending_invites.is_empty());
    let nina = detail
        .members
        .iter()
        .find(|m| m.user_id == registered.user.id)
        .expect("Invitee should be a member");
    assert_eq!(nina.role, MemberRole::Member);
}

#[tokio::test]
async fn test_only_the_owner_manages_the_organization() {
    let db = setup_db().await;
    let mailer = FakeMailer::default();
    let owner = create_user(&db, "Olga", Roles::Client).await;
    let member = create_user(&db, "Max", Roles::Freelancer).await;
    let outsider = create_user(&db, "Otis", Roles::Freelancer).await;
    let org = create_org(&db, &owner).await;
    org_service::invite_member(&db, &mailer, &owner, invite(org.id, &member.email))
        .await
        .unwrap();

    let err = org_service::invite_member(&db, &mailer, &member, invite(org.id, &outsider.email))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");

    let err = org_service::update_organization(
        &db,
        &member,
        org.id,
        UpdateOrganization {
            name: Some("Hijacked".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");

    let err = org_service::get_members(&db, &outsider, org.id).await.unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");

    let err = org_service::remove_member(&db, &member, org.id, owner.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");

    // Partial update keeps the description.
    let updated = org_service::update_organization(
        &db,
        &owner,
        org.id,
        UpdateOrganization {
            name: Some("Pixel Works".to_string()),
            ..Default::default()
        },
    )
    .await
    .expect("Owner can update");
    assert_eq!(updated.name, "Pixel Works");
    assert_eq!(updated.description.as_deref(), Some("Design collective"));
}

#[tokio::test]
async fn test_removing_and_leaving() {
    let db = setup_db().await;
    let mailer = FakeMailer::default();
    let owner = create_user(&db, "Olga", Roles::Client).await;
    let first = create_user(&db, "Max", Roles::Freelancer).await;
    let second = create_user(&db, "Mia", Roles::Freelancer).await;
    let org = create_org(&db, &owner).await;
    for user in [&first, &second] {
        org_service::invite_member(&db, &mailer, &owner, invite(org.id, &user.email))
            .await
            .unwrap();
    }

    let err = org_service::remove_member(&db, &owner, org.id, owner.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "got {err:?}");

    let err = org_service::leave_organization(&db, &owner, org.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "got {err:?}");

    org_service::remove_member(&db, &owner, org.id, first.id)
        .await
        .expect("Owner can remove a member");
    let err = org_service::remove_member(&db, &owner, org.id, first.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");

    org_service::leave_organization(&db, &second, org.id)
        .await
        .expect("Member can leave");
    let err = org_service::leave_organization(&db, &second, org.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");

    assert!(org_service::my_organizations(&db, &second).await.unwrap().is_empty());
    let members = org_service::get_members(&db, &owner, org.id).await.unwrap();
    assert_eq!(members.len(), 1);
}
