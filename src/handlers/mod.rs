pub mod admin;
pub mod auth;
pub mod chat;
pub mod contracts;
pub mod disputes;
pub mod invoices;
pub mod jobs;
pub mod notifications;
pub mod organizations;
pub mod payments;
pub mod proposals;
pub mod reviews;
pub mod users;
pub mod webhooks;

use actix_web::web;

use crate::chat::session;
use crate::error::AppError;

/// Malformed bodies, path segments and query strings get the same `{"msg"}`
/// error shape as everything else.
pub fn configure_extractors(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    );
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // ── Auth routes (register/login are public) ──
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(auth::register))
            .route("/login", web::post().to(auth::login))
            .route("/me", web::get().to(auth::me))
            .route("/verify-email/{token}", web::get().to(auth::verify_email))
            .route(
                "/resend-verification",
                web::post().to(auth::resend_verification),
            )
            .route("/forgot-password", web::post().to(auth::forgot_password))
            .route(
                "/reset-password/{token}",
                web::post().to(auth::reset_password),
            ),
    );

    // ── User routes ──
    cfg.service(web::resource("/users").route(web::get().to(users::get_users)));
    cfg.service(
        web::resource("/users/{id}")
            .route(web::get().to(users::get_user))
            .route(web::put().to(users::update_user)),
    );

    // ── Organization routes ──
    cfg.service(
        web::scope("/orgs")
            .route("", web::get().to(organizations::my_organizations))
            .route("", web::post().to(organizations::create_organization))
            .route("/invite", web::post().to(organizations::invite_member))
            .route("/{id}", web::get().to(organizations::get_organization))
            .route("/{id}", web::put().to(organizations::update_organization))
            .route("/{id}/members", web::get().to(organizations::get_members))
            .route(
                "/{id}/members/{member_id}",
                web::delete().to(organizations::remove_member),
            )
            .route("/{id}/leave", web::post().to(organizations::leave_organization)),
    );

    // ── Job routes ──
    cfg.service(
        web::scope("/jobs")
            .route("", web::get().to(jobs::get_jobs))
            .route("", web::post().to(jobs::create_job))
            .route("/{id}", web::get().to(jobs::get_job))
            .route("/{id}", web::put().to(jobs::update_job))
            .route("/{id}", web::delete().to(jobs::delete_job))
            .route("/{id}/status", web::patch().to(jobs::update_job_status))
            .route("/{id}/proposals", web::get().to(jobs::get_job_proposals))
            .route("/{id}/proposals", web::post().to(jobs::submit_proposal)),
    );

    // ── Proposal routes ──
    cfg.service(
        web::scope("/proposals")
            .route("/mine", web::get().to(proposals::my_proposals))
            .route("/{id}/respond", web::patch().to(proposals::respond))
            .route("/{id}", web::delete().to(proposals::delete_proposal)),
    );

    // ── Contract routes ──
    cfg.service(
        web::scope("/contracts")
            .route("", web::get().to(contracts::get_contracts))
            .route("", web::post().to(contracts::create_contract))
            .route("/{id}", web::get().to(contracts::get_contract))
            .route("/{id}", web::delete().to(contracts::delete_contract))
            .route("/{id}/approve", web::patch().to(contracts::approve_contract))
            .route("/{id}/reject", web::patch().to(contracts::reject_contract))
            .route("/{id}/status", web::patch().to(contracts::update_status))
            .route("/{id}/milestones", web::get().to(contracts::get_milestones))
            .route("/{id}/milestones", web::post().to(contracts::add_milestone))
            .route(
                "/{id}/milestones/{milestone_id}",
                web::put().to(contracts::update_milestone),
            )
            .route(
                "/{id}/milestones/{milestone_id}",
                web::delete().to(contracts::delete_milestone),
            ),
    );

    // ── Invoice routes ──
    cfg.service(
        web::scope("/invoices")
            .route(
                "/create-payment-intent",
                web::post().to(invoices::create_payment_intent),
            )
            .route("", web::get().to(invoices::get_invoices))
            .route("", web::post().to(invoices::create_invoice))
            .route("/{id}", web::get().to(invoices::get_invoice))
            .route("/{id}", web::put().to(invoices::update_invoice))
            .route("/{id}", web::delete().to(invoices::delete_invoice))
            .route("/{id}/pdf", web::get().to(invoices::get_invoice_pdf))
            .route("/{id}/pay", web::patch().to(invoices::mark_paid)),
    );

    // ── Payment routes ──
    cfg.service(
        web::scope("/payments")
            .route("", web::get().to(payments::get_payments))
            .route("/{id}", web::get().to(payments::get_payment)),
    );

    // ── Payment processor callbacks (signature-authenticated, no JWT) ──
    cfg.service(
        web::scope("/webhooks").route("/stripe", web::post().to(webhooks::stripe_webhook)),
    );

    // ── Dispute routes ──
    cfg.service(
        web::scope("/disputes")
            .route("", web::get().to(disputes::get_disputes))
            .route("", web::post().to(disputes::create_dispute))
            .route("/mine", web::get().to(disputes::my_disputes))
            .route("/{id}", web::get().to(disputes::get_dispute))
            .route("/{id}", web::patch().to(disputes::update_dispute)),
    );

    // ── Review routes ──
    cfg.service(
        web::scope("/reviews")
            .route("", web::post().to(reviews::create_review))
            .route("/user/{user_id}", web::get().to(reviews::get_user_reviews))
            .route("/{id}", web::delete().to(reviews::delete_review)),
    );

    // ── Notification routes ──
    cfg.service(
        web::scope("/notifications")
            .route("/ws", web::get().to(session::notifications_ws))
            .route("", web::get().to(notifications::get_notifications))
            .route("/read-all", web::patch().to(notifications::mark_all_read))
            .route("/{id}/read", web::patch().to(notifications::mark_read)),
    );

    // ── Chat routes (WebSocket + REST) ──
    cfg.service(
        web::scope("/chat")
            .route("/ws/{contract_id}", web::get().to(session::ws_connect))
            .route("/messages/{id}", web::delete().to(chat::delete_message))
            .route("/{contract_id}/messages", web::get().to(chat::get_messages))
            .route("/{contract_id}/messages", web::post().to(chat::send_message))
            .route("/{contract_id}/seen", web::post().to(chat::mark_seen)),
    );

    // ── Admin routes ──
    cfg.service(web::scope("/admin").route("/stats", web::get().to(admin::get_stats)));
}
