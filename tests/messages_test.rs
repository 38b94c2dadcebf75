//! Contract chat through the service layer, with a hub subscriber standing
//! in for a connected socket.
//!
//! Run with: `cargo test --test messages_test`
mod common;

use freelance_backend::chat::protocol::ServerMessage;
use freelance_backend::error::AppError;
use freelance_backend::models::PaginationQuery;
use freelance_backend::models::contracts::{ContractStatus, UpdateContractStatus};
use freelance_backend::models::messages::SendMessage;
use freelance_backend::models::users::Roles;
use freelance_backend::realtime::Channel;
use freelance_backend::services::{contracts as contract_service, messages as message_service};

use common::{active_contract, create_user, setup_db, started_hub};

fn text(content: &str) -> SendMessage {
    SendMessage {
        content: content.to_string(),
    }
}

#[tokio::test]
async fn test_messages_reach_the_room_and_history() {
    let db = setup_db().await;
    let hub = started_hub();
    let (client, freelancer, contract) = active_contract(&db, &hub).await;
    let mut room = hub
        .join(Channel::Contract(contract.id), client.id)
        .await
        .expect("Hub is started");

    let first = message_service::send_message(&db, &hub, freelancer.id, contract.id, text("Hello"))
        .await
        .expect("Party can send");
    message_service::send_message(&db, &hub, client.id, contract.id, text("Hi back"))
        .await
        .expect("Party can send");

    match room.recv().await {
        Some(ServerMessage::NewMessage { id, content, .. }) => {
            assert_eq!(id, first.id);
            assert_eq!(content, "Hello");
        }
        other => panic!("unexpected frame {other:?}"),
    }

    let history = message_service::history(&db, client.id, contract.id, &PaginationQuery::default())
        .await
        .expect("Party can read history");
    let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["Hello", "Hi back"]);

    let outsider = create_user(&db, "Olga", Roles::Freelancer).await;
    let err = message_service::history(&db, outsider.id, contract.id, &PaginationQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");
}

#[tokio::test]
async fn test_only_received_messages_are_marked_seen() {
    let db = setup_db().await;
    let hub = started_hub();
    let (client, freelancer, contract) = active_contract(&db, &hub).await;

    let incoming = message_service::send_message(&db, &hub, freelancer.id, contract.id, text("Draft ready"))
        .await
        .unwrap();
    let own = message_service::send_message(&db, &hub, client.id, contract.id, text("Thanks"))
        .await
        .unwrap();

    let seen = message_service::mark_seen(&db, &hub, client.id, contract.id, vec![incoming.id, own.id])
        .await
        .expect("Party can mark seen");
    assert_eq!(seen, vec![incoming.id]);

    let again = message_service::mark_seen(&db, &hub, client.id, contract.id, vec![incoming.id])
        .await
        .unwrap();
    assert!(again.is_empty());

    let history = message_service::history(&db, client.id, contract.id, &PaginationQuery::default())
        .await
        .unwrap();
    assert!(history[0].seen_at.is_some());
    assert!(history[1].seen_at.is_none());
}

#[tokio::test]
async fn test_chat_closes_with_the_contract_and_deletes_are_sender_only() {
    let db = setup_db().await;
    let hub = started_hub();
    let (client, freelancer, contract) = active_contract(&db, &hub).await;

    let message = message_service::send_message(&db, &hub, freelancer.id, contract.id, text("Done"))
        .await
        .unwrap();

    let err = message_service::send_message(&db, &hub, client.id, contract.id, text("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    let err = message_service::delete_message(&db, &hub, client.id, message.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");

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

    let err = message_service::send_message(&db, &hub, client.id, contract.id, text("One more thing"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");

    message_service::delete_message(&db, &hub, freelancer.id, message.id)
        .await
        .expect("Sender can delete");
    let history = message_service::history(&db, client.id, contract.id, &PaginationQuery::default())
        .await
        .unwrap();
    assert!(history.is_empty());
}
