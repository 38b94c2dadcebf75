use sea_orm::*;
use uuid::Uuid;

use crate::models::organization_invites;
use crate::models::organization_members::{self, MemberRole};
use crate::models::organizations::{self, UpdateOrganization};

/// Create the organization with its owner as the first admin member.
pub async fn insert_organization(
    db: &DatabaseConnection,
    owner_id: Uuid,
    name: String,
    description: Option<String>,
) -> Result<organizations::Model, DbErr> {
    let txn = db.begin().await?;
    let now = chrono::Utc::now();

    let organization = organizations::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(description),
        owner_id: Set(owner_id),
        created_at: Set(now),
        updated_at: Set(None),
    }
    .insert(&txn)
    .await?;

    insert_member(&txn, organization.id, owner_id, MemberRole::Admin).await?;

    txn.commit().await?;
    Ok(organization)
}

pub async fn get_organization_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<organizations::Model>, DbErr> {
    organizations::Entity::find_by_id(id).one(db).await
}

/// Organizations the user belongs to, oldest membership first.
pub async fn get_organizations_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Vec<organizations::Model>, DbErr> {
    organizations::Entity::find()
        .inner_join(organization_members::Entity)
        .filter(organization_members::Column::UserId.eq(user_id))
        .order_by_asc(organization_members::Column::JoinedAt)
        .all(db)
        .await
}

pub async fn update_organization(
    db: &DatabaseConnection,
    organization: organizations::Model,
    input: UpdateOrganization,
) -> Result<organizations::Model, DbErr> {
    let mut active: organizations::ActiveModel = organization.into();

    if let Some(name) = input.name.filter(|n| !n.trim().is_empty()) {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = input.description.filter(|d| !d.trim().is_empty()) {
        active.description = Set(Some(description));
    }
    active.updated_at = Set(Some(chrono::Utc::now()));

    active.update(db).await
}

// ── Members ──

pub async fn insert_member<C: ConnectionTrait>(
    db: &C,
    organization_id: Uuid,
    user_id: Uuid,
    role: MemberRole,
) -> Result<organization_members::Model, DbErr> {
    organization_members::ActiveModel {
        id: Set(Uuid::new_v4()),
        organization_id: Set(organization_id),
        user_id: Set(user_id),
        role: Set(role),
        joined_at: Set(chrono::Utc::now()),
    }
    .insert(db)
    .await
}

pub async fn get_member(
    db: &DatabaseConnection,
    organization_id: Uuid,
    user_id: Uuid,
) -> Result<Option<organization_members::Model>, DbErr> {
    organization_members::Entity::find()
        .filter(organization_members::Column::OrganizationId.eq(organization_id))
        .filter(organization_members::Column::UserId.eq(user_id))
        .one(db)
        .await
}

pub async fn get_members(
    db: &DatabaseConnection,
    organization_id: Uuid,
) -> Result<Vec<organization_members::Model>, DbErr> {
    organization_members::Entity::find()
        .filter(organization_members::Column::OrganizationId.eq(organization_id))
        .order_by_asc(organization_members::Column::JoinedAt)
        .all(db)
        .await
}

pub async fn delete_member(
    db: &DatabaseConnection,
    organization_id: Uuid,
    user_id: Uuid,
) -> Result<u64, DbErr> {
    let result = organization_members::Entity::delete_many()
        .filter(organization_members::Column::OrganizationId.eq(organization_id))
        .filter(organization_members::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

// ── Pending invites ──

pub async fn insert_invite(
    db: &DatabaseConnection,
    organization_id: Uuid,
    email: String,
    invited_by: Uuid,
) -> Result<organization_invites::Model, DbErr> {
    organization_invites::ActiveModel {
        id: Set(Uuid::new_v4()),
        organization_id: Set(organization_id),
        email: Set(email),
        invited_by: Set(invited_by),
        created_at: Set(chrono::Utc::now()),
    }
    .insert(db)
    .await
}

pub async fn get_invite(
    db: &DatabaseConnection,
    organization_id: Uuid,
    email: &str,
) -> Result<Option<organization_invites::Model>, DbErr> {
    organization_invites::Entity::find()
        .filter(organization_invites::Column::OrganizationId.eq(organization_id))
        .filter(organization_invites::Column::Email.eq(email))
        .one(db)
        .await
}

pub async fn get_invites_for_organization(
    db: &DatabaseConnection,
    organization_id: Uuid,
) -> Result<Vec<organization_invites::Model>, DbErr> {
    organization_invites::Entity::find()
        .filter(organization_invites::Column::OrganizationId.eq(organization_id))
        .order_by_asc(organization_invites::Column::CreatedAt)
        .all(db)
        .await
}

/// Turn every pending invite for `email` into a membership for `user_id`.
/// Returns the organizations joined.
pub async fn claim_invites(
    db: &DatabaseConnection,
    email: &str,
    user_id: Uuid,
) -> Result<Vec<Uuid>, DbErr> {
    let txn = db.begin().await?;

    let invites = organization_invites::Entity::find()
        .filter(organization_invites::Column::Email.eq(email))
        .all(&txn)
        .await?;

    let mut joined = Vec::with_capacity(invites.len());
    for invite in invites {
        let already_member = organization_members::Entity::find()
            .filter(organization_members::Column::OrganizationId.eq(invite.organization_id))
            .filter(organization_members::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .is_some();
        if !already_member {
            insert_member(&txn, invite.organization_id, user_id, MemberRole::Member).await?;
            joined.push(invite.organization_id);
        }
        organization_invites::Entity::delete_by_id(invite.id)
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;
    Ok(joined)
}
