//! Disputes, reviews and the admin dashboard.
//!
//! Run with: `cargo test --test peer_features_test`
mod common;

use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

use freelance_backend::error::AppError;
use freelance_backend::models::contracts::{ContractStatus, UpdateContractStatus};
use freelance_backend::models::disputes::{CreateDispute, DisputeStatus, UpdateDispute};
use freelance_backend::models::reviews::CreateReview;
use freelance_backend::models::users::{self, Roles};
use freelance_backend::services::{
    admin as admin_service, contracts as contract_service, disputes as dispute_service,
    reviews as review_service,
};

use common::{active_contract, create_user, setup_db, started_hub};

/// Admins cannot self-register, so promote a user directly.
async fn create_admin(db: &DatabaseConnection) -> users::Model {
    let user = create_user(db, "Ada", Roles::Client).await;
    let mut active: users::ActiveModel = user.into();
    active.role = Set(Roles::Admin);
    active.update(db).await.expect("Failed to promote admin")
}

fn review(contract_id: uuid::Uuid, rating: i32) -> CreateReview {
    CreateReview {
        contract_id,
        rating,
        comment: Some("Great to work with".to_string()),
    }
}

#[tokio::test]
async fn test_dispute_visibility_and_admin_resolution() {
    let db = setup_db().await;
    let hub = started_hub();
    let (client, freelancer, contract) = active_contract(&db, &hub).await;
    let outsider = create_user(&db, "Olga", Roles::Client).await;
    let admin = create_admin(&db).await;

    let input = || CreateDispute {
        contract_id: contract.id,
        milestone_id: None,
        reason: "Late delivery".to_string(),
        description: None,
    };

    let err = dispute_service::create_dispute(&db, &outsider, input())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");

    let dispute = dispute_service::create_dispute(&db, &client, input())
        .await
        .expect("Party can raise a dispute");
    assert_eq!(dispute.status, DisputeStatus::Open);

    dispute_service::get_dispute(&db, &freelancer, dispute.id)
        .await
        .expect("The other party can see it");
    let err = dispute_service::get_dispute(&db, &outsider, dispute.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");

    let err = dispute_service::update_dispute(
        &db,
        &client,
        dispute.id,
        UpdateDispute {
            status: Some(DisputeStatus::Resolved),
            resolution: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");

    let resolved = dispute_service::update_dispute(
        &db,
        &admin,
        dispute.id,
        UpdateDispute {
            status: Some(DisputeStatus::Resolved),
            resolution: Some("Deadline extended".to_string()),
        },
    )
    .await
    .expect("Admin can resolve");
    assert_eq!(resolved.status, DisputeStatus::Resolved);
    assert_eq!(resolved.resolution.as_deref(), Some("Deadline extended"));
    assert_eq!(resolved.reason, "Late delivery");
}

#[tokio::test]
async fn test_reviews_need_a_completed_contract_and_are_unique() {
    let db = setup_db().await;
    let hub = started_hub();
    let (client, freelancer, contract) = active_contract(&db, &hub).await;

    let err = review_service::create_review(&db, &client, review(contract.id, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "got {err:?}");

    contract_service::update_status(
        &db,
        &client,
        contract.id,
        UpdateContractStatus {
            status: ContractStatus::Completed,
        },
    )
    .await
    .unwrap();

    let err = review_service::create_review(&db, &client, review(contract.id, 6))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    let left = review_service::create_review(&db, &client, review(contract.id, 5))
        .await
        .expect("Client can review");
    assert_eq!(left.reviewee_id, freelancer.id);

    let err = review_service::create_review(&db, &client, review(contract.id, 4))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");

    review_service::create_review(&db, &freelancer, review(contract.id, 3))
        .await
        .expect("Freelancer can review too");

    let summary = review_service::reviews_for_user(&db, freelancer.id).await.unwrap();
    assert_eq!(summary.count, 1);
    assert_eq!(summary.average_rating, Some(5.0));

    let err = review_service::delete_review(&db, &freelancer, left.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");
    review_service::delete_review(&db, &client, left.id)
        .await
        .expect("Author can delete");
    let summary = review_service::reviews_for_user(&db, freelancer.id).await.unwrap();
    assert_eq!(summary.average_rating, None);
}

#[tokio::test]
async fn test_admin_stats_count_by_role() {
    let db = setup_db().await;
    let hub = started_hub();
    let (client, _, _) = active_contract(&db, &hub).await;
    let admin = create_admin(&db).await;

    let err = admin_service::dashboard_stats(&db, &client).await.unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");

    let stats = admin_service::dashboard_stats(&db, &admin).await.unwrap();
    assert_eq!(stats.total_users, 3);
    assert_eq!(stats.clients, 1);
    assert_eq!(stats.freelancers, 1);
    assert_eq!(stats.admins, 1);
    assert_eq!(stats.total_jobs, 1);
    assert_eq!(stats.total_contracts, 1);
    assert_eq!(stats.revenue, 0.0);
}
