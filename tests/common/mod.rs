//! Shared fixtures for the integration tests: an in-memory SQLite database
//! with the real migrations applied, seeded users, and fakes for the
//! payment processor and the mailer.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use freelance_backend::config::JwtConfig;
use freelance_backend::db::users as user_db;
use freelance_backend::mail::{MailError, Mailer, NoticeEmail, ReceiptEmail};
use freelance_backend::models::contracts::{self, CreateContract};
use freelance_backend::models::jobs::CreateJob;
use freelance_backend::models::proposals::{ProposalStatus, RespondToProposal, SubmitProposal};
use freelance_backend::models::users::{self, RegisterUser, Roles};
use freelance_backend::payments::{PaymentError, PaymentGateway, PaymentIntent, PaymentIntentRequest};
use freelance_backend::realtime::EventHub;
use freelance_backend::services;
use freelance_backend::services::auth::AccountContext;

pub const TEST_SECRET: &str = "test-secret-at-least-256-bits-long-for-hs256-xxxxxxx";
pub const LINK_BASE: &str = "http://localhost:8080";

pub fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret: TEST_SECRET.to_string(),
        maxage_minutes: 60,
    }
}

/// A fresh schema per test. One connection, so every query sees the same
/// in-memory database.
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub fn started_hub() -> EventHub {
    let hub = EventHub::new();
    hub.start();
    hub
}

pub fn account_context<'a>(
    db: &'a DatabaseConnection,
    mailer: &'a dyn Mailer,
    jwt: &'a JwtConfig,
) -> AccountContext<'a> {
    AccountContext {
        db,
        mailer,
        jwt,
        link_base: LINK_BASE,
    }
}

/// Register through the real auth service and return the stored row.
pub async fn create_user(db: &DatabaseConnection, name: &str, role: Roles) -> users::Model {
    let mailer = FakeMailer::default();
    let jwt = jwt_config();
    let auth = services::auth::register(
        &account_context(db, &mailer, &jwt),
        RegisterUser {
            name: name.to_string(),
            email: format!("{}-{}@example.com", name.to_lowercase(), Uuid::new_v4()),
            password: "correct-horse-battery".to_string(),
            role: Some(role),
        },
    )
    .await
    .expect("Failed to register user");

    user_db::get_user_by_id(db, auth.user.id)
        .await
        .expect("Failed to load user")
        .expect("Registered user should exist")
}

pub async fn create_job(db: &DatabaseConnection, client: &users::Model) -> Uuid {
    services::jobs::create_job(
        db,
        client,
        CreateJob {
            title: "Build a landing page".to_string(),
            description: "Single page with a signup form".to_string(),
            category: Some("web".to_string()),
            skills: vec!["html".to_string(), "css".to_string()],
            budget: 500.0,
            deadline: None,
        },
    )
    .await
    .expect("Failed to create job")
    .id
}

pub fn proposal_input() -> SubmitProposal {
    SubmitProposal {
        cover_letter: "I have shipped dozens of these".to_string(),
        expected_rate: 40.0,
        estimated_time: "2 weeks".to_string(),
    }
}

/// Job posted by `client` with an accepted proposal from `freelancer`.
pub async fn job_with_accepted_proposal(
    db: &DatabaseConnection,
    hub: &EventHub,
    client: &users::Model,
    freelancer: &users::Model,
) -> Uuid {
    let job_id = create_job(db, client).await;
    let proposal = services::proposals::submit_proposal(db, hub, freelancer, job_id, proposal_input())
        .await
        .expect("Failed to submit proposal");
    services::proposals::respond_to_proposal(
        db,
        hub,
        client,
        proposal.id,
        RespondToProposal {
            status: ProposalStatus::Accepted,
        },
    )
    .await
    .expect("Failed to accept proposal");
    job_id
}

pub fn contract_input(job_id: Uuid, freelancer_id: Uuid) -> CreateContract {
    CreateContract {
        job_id,
        freelancer_id,
        terms: "Deliver the page and two revisions".to_string(),
        start_date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date"),
        end_date: NaiveDate::from_ymd_opt(2026, 2, 1).expect("valid date"),
    }
}

/// Client, freelancer, and an active contract between them.
pub async fn active_contract(
    db: &DatabaseConnection,
    hub: &EventHub,
) -> (users::Model, users::Model, contracts::Model) {
    let client = create_user(db, "Carol", Roles::Client).await;
    let freelancer = create_user(db, "Frank", Roles::Freelancer).await;
    let job_id = job_with_accepted_proposal(db, hub, &client, &freelancer).await;
    let contract = services::contracts::create_contract(db, &client, contract_input(job_id, freelancer.id))
        .await
        .expect("Failed to create contract");
    (client, freelancer, contract)
}

/// Records every request instead of calling the processor.
#[derive(Default)]
pub struct FakeGateway {
    pub requests: Mutex<Vec<PaymentIntentRequest>>,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        let mut requests = self.requests.lock().expect("gateway lock poisoned");
        let id = format!("pi_test_{}", requests.len() + 1);
        requests.push(request);
        Ok(PaymentIntent {
            client_secret: format!("{id}_secret"),
            id,
        })
    }
}

/// Collects outgoing mail in memory.
#[derive(Default)]
pub struct FakeMailer {
    pub sent: Mutex<Vec<ReceiptEmail>>,
    pub notices: Mutex<Vec<NoticeEmail>>,
}

impl FakeMailer {
    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("mailer lock poisoned").len()
    }

    pub fn notices_to(&self, to: &str) -> Vec<NoticeEmail> {
        self.notices
            .lock()
            .expect("mailer lock poisoned")
            .iter()
            .filter(|n| n.to == to)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send_receipt(&self, email: ReceiptEmail) -> Result<(), MailError> {
        self.sent.lock().expect("mailer lock poisoned").push(email);
        Ok(())
    }

    async fn send_notice(&self, email: NoticeEmail) -> Result<(), MailError> {
        self.notices.lock().expect("mailer lock poisoned").push(email);
        Ok(())
    }
}

/// A mailer whose relay is always down.
#[derive(Default)]
pub struct FailingMailer {
    pub attempts: Mutex<usize>,
}

impl FailingMailer {
    fn fail(&self) -> Result<(), MailError> {
        *self.attempts.lock().expect("mailer lock poisoned") += 1;
        Err(MailError::Task("relay unavailable".to_string()))
    }
}

#[async_trait]
impl Mailer for FailingMailer {
    async fn send_receipt(&self, _email: ReceiptEmail) -> Result<(), MailError> {
        self.fail()
    }

    async fn send_notice(&self, _email: NoticeEmail) -> Result<(), MailError> {
        self.fail()
    }
}

/// Hand the fake to code that wants the trait object.
pub fn gateway_handle(gateway: &Arc<FakeGateway>) -> Arc<dyn PaymentGateway> {
    gateway.clone()
}
