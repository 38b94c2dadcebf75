use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::auth::authorization::is_admin;
use crate::db::organizations as org_db;
use crate::db::users as user_db;
use crate::error::AppError;
use crate::mail::{Mailer, NoticeEmail};
use crate::models::organization_members::MemberRole;
use crate::models::organizations::{
    self, CreateOrganization, InviteMember, InviteOutcome, MemberView, OrganizationDetail,
    UpdateOrganization,
};
use crate::models::users;

async fn load_organization(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<organizations::Model, AppError> {
    org_db::get_organization_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))
}

fn require_owner(
    organization: &organizations::Model,
    acting: &users::Model,
    action: &str,
) -> Result<(), AppError> {
    if organization.owner_id == acting.id {
        Ok(())
    } else {
        Err(AppError::Authorization(format!("Only the owner can {action}")))
    }
}

/// Members and site admins may look inside an organization.
async fn require_visible(
    db: &DatabaseConnection,
    organization: &organizations::Model,
    acting: &users::Model,
) -> Result<(), AppError> {
    if is_admin(acting)
        || org_db::get_member(db, organization.id, acting.id)
            .await?
            .is_some()
    {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "You are not a member of this organization".to_string(),
        ))
    }
}

async fn send_best_effort(mailer: &dyn Mailer, email: NoticeEmail) {
    let to = email.to.clone();
    if let Err(e) = mailer.send_notice(email).await {
        tracing::warn!(to = %to, error = %e, "organization email failed");
    }
}

/// Create an organization owned by the caller, who becomes its first admin.
/// Any invitations already waiting for the caller's email are accepted too.
pub async fn create_organization(
    db: &DatabaseConnection,
    acting: &users::Model,
    input: CreateOrganization,
) -> Result<organizations::Model, AppError> {
    input.validate()?;
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }

    let organization =
        org_db::insert_organization(db, acting.id, name, input.description).await?;
    tracing::info!(
        organization_id = %organization.id,
        owner_id = %acting.id,
        "organization created"
    );

    let joined = org_db::claim_invites(db, &acting.email, acting.id).await?;
    for organization_id in joined {
        tracing::info!(
            organization_id = %organization_id,
            user_id = %acting.id,
            "pending invite accepted"
        );
    }

    Ok(organization)
}

pub async fn my_organizations(
    db: &DatabaseConnection,
    acting: &users::Model,
) -> Result<Vec<organizations::Model>, AppError> {
    Ok(org_db::get_organizations_for_user(db, acting.id).await?)
}

pub async fn get_organization(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
) -> Result<OrganizationDetail, AppError> {
    let organization = load_organization(db, id).await?;
    require_visible(db, &organization, acting).await?;

    let members = member_views(db, id).await?;
    let pending_invites = org_db::get_invites_for_organization(db, id)
        .await?
        .into_iter()
        .map(|invite| invite.email)
        .collect();

    Ok(OrganizationDetail {
        organization,
        members,
        pending_invites,
    })
}

/// Invite by email. An existing account joins immediately; otherwise the
/// email is kept as a pending invite until someone registers with it.
pub async fn invite_member(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
    acting: &users::Model,
    input: InviteMember,
) -> Result<InviteOutcome, AppError> {
    input.validate()?;
    let organization = load_organization(db, input.organization_id).await?;
    require_owner(&organization, acting, "invite members")?;

    let email = input.email.trim().to_lowercase();

    if let Some(user) = user_db::get_user_by_email(db, &email).await? {
        if org_db::get_member(db, organization.id, user.id).await?.is_some() {
            return Err(AppError::Conflict("User is already a member".to_string()));
        }
        org_db::insert_member(db, organization.id, user.id, MemberRole::Member).await?;
        tracing::info!(
            organization_id = %organization.id,
            user_id = %user.id,
            invited_by = %acting.id,
            "member added"
        );

        send_best_effort(
            mailer,
            NoticeEmail {
                to: email,
                subject: "You've been added to an organization".to_string(),
                body: format!("You've been added to the organization \"{}\".", organization.name),
            },
        )
        .await;
        return Ok(InviteOutcome::Added { user_id: user.id });
    }

    if org_db::get_invite(db, organization.id, &email).await?.is_some() {
        return Err(AppError::Conflict(
            "This email has already been invited".to_string(),
        ));
    }
    org_db::insert_invite(db, organization.id, email.clone(), acting.id).await?;
    tracing::info!(organization_id = %organization.id, email = %email, "pending invite recorded");

    send_best_effort(
        mailer,
        NoticeEmail {
            to: email.clone(),
            subject: "You're invited to join an organization".to_string(),
            body: format!(
                "You've been invited to join the organization \"{}\". Create your account using this email to be added automatically.",
                organization.name
            ),
        },
    )
    .await;
    Ok(InviteOutcome::Pending { email })
}

async fn member_views(
    db: &DatabaseConnection,
    organization_id: Uuid,
) -> Result<Vec<MemberView>, AppError> {
    let members = org_db::get_members(db, organization_id).await?;
    let ids = members.iter().map(|m| m.user_id).collect();
    let profiles: HashMap<Uuid, users::Model> = user_db::get_users_by_ids(db, ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(members
        .into_iter()
        .filter_map(|member| {
            profiles.get(&member.user_id).map(|user| MemberView {
                user_id: member.user_id,
                name: user.name.clone(),
                email: user.email.clone(),
                role: member.role,
                joined_at: member.joined_at,
            })
        })
        .collect())
}

pub async fn get_members(
    db: &DatabaseConnection,
    acting: &users::Model,
    organization_id: Uuid,
) -> Result<Vec<MemberView>, AppError> {
    let organization = load_organization(db, organization_id).await?;
    require_visible(db, &organization, acting).await?;
    member_views(db, organization_id).await
}

/// Owner (or a site admin) removes someone other than the owner.
pub async fn remove_member(
    db: &DatabaseConnection,
    acting: &users::Model,
    organization_id: Uuid,
    member_id: Uuid,
) -> Result<(), AppError> {
    let organization = load_organization(db, organization_id).await?;
    if !is_admin(acting) {
        require_owner(&organization, acting, "remove members")?;
    }
    if member_id == organization.owner_id {
        return Err(AppError::InvalidState(
            "The owner cannot be removed from the organization".to_string(),
        ));
    }

    if org_db::delete_member(db, organization_id, member_id).await? == 0 {
        return Err(AppError::NotFound("Member not found".to_string()));
    }
    tracing::info!(
        organization_id = %organization_id,
        user_id = %member_id,
        removed_by = %acting.id,
        "member removed"
    );
    Ok(())
}

pub async fn update_organization(
    db: &DatabaseConnection,
    acting: &users::Model,
    organization_id: Uuid,
    input: UpdateOrganization,
) -> Result<organizations::Model, AppError> {
    input.validate()?;
    let organization = load_organization(db, organization_id).await?;
    require_owner(&organization, acting, "update the organization")?;

    let updated = org_db::update_organization(db, organization, input).await?;
    tracing::info!(organization_id = %organization_id, "organization updated");
    Ok(updated)
}

pub async fn leave_organization(
    db: &DatabaseConnection,
    acting: &users::Model,
    organization_id: Uuid,
) -> Result<(), AppError> {
    let organization = load_organization(db, organization_id).await?;
    if organization.owner_id == acting.id {
        return Err(AppError::InvalidState(
            "The owner cannot leave the organization".to_string(),
        ));
    }

    if org_db::delete_member(db, organization_id, acting.id).await? == 0 {
        return Err(AppError::NotFound(
            "You are not a member of this organization".to_string(),
        ));
    }
    tracing::info!(organization_id = %organization_id, user_id = %acting.id, "member left");
    Ok(())
}
