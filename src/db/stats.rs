use sea_orm::*;

use crate::models::users::{self, Roles};

pub async fn count_users(db: &DatabaseConnection) -> Result<u64, DbErr> {
    users::Entity::find().count(db).await
}

pub async fn count_users_with_role(db: &DatabaseConnection, role: Roles) -> Result<u64, DbErr> {
    users::Entity::find()
        .filter(users::Column::Role.eq(role))
        .count(db)
        .await
}
