//! Contract lifecycle against a migrated in-memory database.
//!
//! Run with: `cargo test --test contracts_test`
mod common;

use chrono::NaiveDate;

use freelance_backend::db::milestones as milestone_db;
use freelance_backend::error::AppError;
use freelance_backend::models::contracts::{ContractStatus, UpdateContractStatus};
use freelance_backend::models::milestones::{CreateMilestone, UpdateMilestone};
use freelance_backend::models::users::Roles;
use freelance_backend::services::contracts as contract_service;

use common::{
    active_contract, contract_input, create_job, create_user, job_with_accepted_proposal, setup_db,
    started_hub,
};

#[tokio::test]
async fn test_contract_starts_active_and_is_unique_per_job_and_freelancer() {
    let db = setup_db().await;
    let hub = started_hub();
    let client = create_user(&db, "Carol", Roles::Client).await;
    let freelancer = create_user(&db, "Frank", Roles::Freelancer).await;
    let job_id = job_with_accepted_proposal(&db, &hub, &client, &freelancer).await;

    let contract = contract_service::create_contract(&db, &client, contract_input(job_id, freelancer.id))
        .await
        .expect("Contract should be created");
    assert_eq!(contract.status, ContractStatus::Active);
    assert_eq!(contract.client_id, client.id);
    assert!(contract.approved_at.is_none());

    let err = contract_service::create_contract(&db, &client, contract_input(job_id, freelancer.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");
}

#[tokio::test]
async fn test_contract_requires_accepted_proposal() {
    let db = setup_db().await;
    let client = create_user(&db, "Carol", Roles::Client).await;
    let freelancer = create_user(&db, "Frank", Roles::Freelancer).await;
    let job_id = create_job(&db, &client).await;

    let err = contract_service::create_contract(&db, &client, contract_input(job_id, freelancer.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn test_only_job_client_can_create_contract() {
    let db = setup_db().await;
    let hub = started_hub();
    let client = create_user(&db, "Carol", Roles::Client).await;
    let other = create_user(&db, "Oscar", Roles::Client).await;
    let freelancer = create_user(&db, "Frank", Roles::Freelancer).await;
    let job_id = job_with_accepted_proposal(&db, &hub, &client, &freelancer).await;

    let err = contract_service::create_contract(&db, &other, contract_input(job_id, freelancer.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");
}

#[tokio::test]
async fn test_end_date_before_start_is_rejected() {
    let db = setup_db().await;
    let hub = started_hub();
    let client = create_user(&db, "Carol", Roles::Client).await;
    let freelancer = create_user(&db, "Frank", Roles::Freelancer).await;
    let job_id = job_with_accepted_proposal(&db, &hub, &client, &freelancer).await;

    let mut input = contract_input(job_id, freelancer.id);
    input.end_date = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();

    let err = contract_service::create_contract(&db, &client, input)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn test_approve_is_freelancer_only_and_keeps_first_time() {
    let db = setup_db().await;
    let hub = started_hub();
    let (client, freelancer, contract) = active_contract(&db, &hub).await;

    let err = contract_service::approve_contract(&db, &client, contract.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");

    let first = contract_service::approve_contract(&db, &freelancer, contract.id)
        .await
        .expect("Freelancer can approve");
    assert_eq!(first.status, ContractStatus::Active);
    assert!(first.approved_at.is_some());

    let second = contract_service::approve_contract(&db, &freelancer, contract.id)
        .await
        .expect("Approving again is a no-op");
    assert_eq!(second.approved_at, first.approved_at);
}

#[tokio::test]
async fn test_reject_cancels_and_blocks_later_approval() {
    let db = setup_db().await;
    let hub = started_hub();
    let (_, freelancer, contract) = active_contract(&db, &hub).await;

    let cancelled = contract_service::reject_contract(&db, &freelancer, contract.id)
        .await
        .expect("Freelancer can reject");
    assert_eq!(cancelled.status, ContractStatus::Cancelled);

    let err = contract_service::approve_contract(&db, &freelancer, contract.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "got {err:?}");
}

#[tokio::test]
async fn test_status_update_rules() {
    let db = setup_db().await;
    let hub = started_hub();
    let (client, freelancer, contract) = active_contract(&db, &hub).await;
    let outsider = create_user(&db, "Olga", Roles::Freelancer).await;

    let err = contract_service::update_status(
        &db,
        &outsider,
        contract.id,
        UpdateContractStatus {
            status: ContractStatus::Paused,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");

    let err = contract_service::update_status(
        &db,
        &client,
        contract.id,
        UpdateContractStatus {
            status: ContractStatus::Active,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    let completed = contract_service::update_status(
        &db,
        &freelancer,
        contract.id,
        UpdateContractStatus {
            status: ContractStatus::Completed,
        },
    )
    .await
    .expect("Party can complete");
    assert_eq!(completed.status, ContractStatus::Completed);

    // Terminal statuses can still be overwritten.
    let cancelled = contract_service::update_status(
        &db,
        &client,
        contract.id,
        UpdateContractStatus {
            status: ContractStatus::Cancelled,
        },
    )
    .await
    .expect("Overwrite is allowed");
    assert_eq!(cancelled.status, ContractStatus::Cancelled);
}

#[tokio::test]
async fn test_milestones_and_contract_listing() {
    let db = setup_db().await;
    let hub = started_hub();
    let (client, freelancer, contract) = active_contract(&db, &hub).await;

    let milestone_input = || CreateMilestone {
        title: "Design".to_string(),
        description: "Wireframes".to_string(),
        due_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
        amount: 200.0,
    };

    let err = contract_service::add_milestone(&db, &freelancer, contract.id, milestone_input())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");

    contract_service::add_milestone(&db, &client, contract.id, milestone_input())
        .await
        .expect("Client can add milestones");

    let milestones = contract_service::list_milestones(&db, &freelancer, contract.id)
        .await
        .expect("Freelancer can list milestones");
    assert_eq!(milestones.len(), 1);
    assert!(!milestones[0].is_complete);

    let summaries = contract_service::get_contracts_for_user(&db, &freelancer)
        .await
        .expect("Listing works");
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].job_title.as_deref(), Some("Build a landing page"));
    assert_eq!(
        summaries[0].counterpart.as_ref().map(|c| c.id),
        Some(client.id)
    );

    contract_service::delete_contract(&db, &client, contract.id)
        .await
        .expect("Client can delete the contract");
    let err = contract_service::get_contract(&db, &client, contract.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");

    let orphans = milestone_db::get_milestones_by_contract(&db, contract.id)
        .await
        .expect("Milestone lookup");
    assert!(orphans.is_empty(), "milestones outlived their contract");
}

#[tokio::test]
async fn test_milestone_partial_update_and_delete() {
    let db = setup_db().await;
    let hub = started_hub();
    let (client, freelancer, contract) = active_contract(&db, &hub).await;
    let due = NaiveDate::from_ymd_opt(2026, 1, 20).unwrap();

    let milestone = contract_service::add_milestone(
        &db,
        &client,
        contract.id,
        CreateMilestone {
            title: "Build".to_string(),
            description: "Implement the pages".to_string(),
            due_date: due,
            amount: 300.0,
        },
    )
    .await
    .expect("Client can add milestones");

    let err = contract_service::update_milestone(
        &db,
        &freelancer,
        contract.id,
        milestone.id,
        UpdateMilestone {
            is_complete: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");

    let updated = contract_service::update_milestone(
        &db,
        &client,
        contract.id,
        milestone.id,
        UpdateMilestone {
            amount: Some(350.0),
            is_complete: Some(true),
            ..Default::default()
        },
    )
    .await
    .expect("Client can update milestones");
    assert_eq!(updated.amount, 350.0);
    assert!(updated.is_complete);
    assert_eq!(updated.title, "Build");
    assert_eq!(updated.description, "Implement the pages");
    assert_eq!(updated.due_date, due);

    let err = contract_service::delete_milestone(&db, &freelancer, contract.id, milestone.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");

    contract_service::delete_milestone(&db, &client, contract.id, milestone.id)
        .await
        .expect("Client can delete milestones");
    let remaining = contract_service::list_milestones(&db, &freelancer, contract.id)
        .await
        .expect("Freelancer can list milestones");
    assert!(remaining.is_empty());

    let err = contract_service::delete_milestone(&db, &client, contract.id, milestone.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}
