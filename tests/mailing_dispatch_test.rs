use chrono::NaiveTime;
use mailings::db;
use mailings::domain::{
    Actor, ClientInput, ClientRepository, DeliveryStatus, DomainError, Frequency, MessageInput,
    MessageRepository, StartTime,
};
use mailings::infrastructure::{SeaOrmClientRepository, SeaOrmMessageRepository};
use mailings::mail::{MemoryMailer, Templates};
use mailings::models::mailing::MailingInput;
use mailings::models::user::{self, ROLE_USER};
use mailings::services::mailing_service::{self, AttemptFilter, SENT_RESPONSE};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

struct Fixture {
    db: DatabaseConnection,
    mailer: MemoryMailer,
    templates: Templates,
    clients: SeaOrmClientRepository,
    messages: SeaOrmMessageRepository,
}

async fn setup() -> Fixture {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    Fixture {
        clients: SeaOrmClientRepository::new(db.clone()),
        messages: SeaOrmMessageRepository::new(db.clone()),
        db,
        mailer: MemoryMailer::new("news@example.com"),
        templates: Templates::new().expect("templates"),
    }
}

async fn create_user(db: &DatabaseConnection, email: &str) -> Actor {
    let now = chrono::Utc::now().to_rfc3339();
    let created = user::ActiveModel {
        email: Set(email.to_string()),
        password_hash: Set("hash".to_string()),
        full_name: Set("Owner".to_string()),
        role: Set(ROLE_USER.to_string()),
        is_active: Set(true),
        email_verified: Set(true),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create user");

    Actor {
        user_id: created.id,
        is_manager: false,
    }
}

fn at(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn start(hour: u8) -> StartTime {
    StartTime::from_hour(hour).unwrap()
}

impl Fixture {
    async fn client(&self, email: &str) -> i32 {
        self.clients
            .create(ClientInput {
                email: email.to_string(),
                full_name: "Reader".to_string(),
                comment: String::new(),
            })
            .await
            .expect("client")
            .id
    }

    async fn message(&self) -> i32 {
        self.messages
            .create(MessageInput {
                subject: "Spring news".to_string(),
                body: "First paragraph.\n\nSecond <paragraph>.".to_string(),
            })
            .await
            .expect("message")
            .id
    }
}

#[tokio::test]
async fn due_mailing_is_sent_to_every_client() {
    let fx = setup().await;
    let owner = create_user(&fx.db, "owner@example.com").await;
    let c1 = fx.client("a@example.com").await;
    let c2 = fx.client("b@example.com").await;
    let message_id = fx.message().await;

    let saved = mailing_service::save_mailing(
        &fx.db,
        &fx.mailer,
        &fx.templates,
        owner,
        None,
        MailingInput {
            start_time: start(9),
            frequency: Frequency::Weekly,
            message_id: Some(message_id),
            client_ids: vec![c2, c1, c2],
        },
        at(10, 30),
    )
    .await
    .expect("save");

    assert_eq!(saved.mailing.status, "started");
    assert_eq!(saved.mailing.client_ids, vec![c1, c2]);

    let report = saved.dispatch.expect("dispatch report");
    assert_eq!(report.sent, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(report.last_status, Some(DeliveryStatus::Sent));

    let sent = fx.mailer.sent().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, vec!["a@example.com".to_string()]);
    assert_eq!(sent[0].subject, "Spring news");
    assert_eq!(sent[0].from.as_deref(), Some("news@example.com"));
    let html = sent[0].body.html().expect("html part");
    assert!(html.contains("Second &lt;paragraph&gt;."));
    assert!(sent[0].body.text().contains("First paragraph."));

    let attempts = mailing_service::list_attempts(
        &fx.db,
        AttemptFilter {
            mailing_id: Some(saved.mailing.id),
            ..Default::default()
        },
    )
    .await
    .expect("attempts");
    assert_eq!(attempts.len(), 2);
    assert!(attempts.iter().all(|a| a.status == "sent" && a.response == SENT_RESPONSE));
    assert!(attempts.iter().all(|a| a.message_id == message_id));
}

#[tokio::test]
async fn failed_delivery_is_recorded_and_dispatch_continues() {
    let fx = setup().await;
    let owner = create_user(&fx.db, "owner@example.com").await;
    let bad = fx.client("bounce@example.com").await;
    let good = fx.client("ok@example.com").await;
    let message_id = fx.message().await;
    fx.mailer.reject("bounce@example.com").await;

    let saved = mailing_service::save_mailing(
        &fx.db,
        &fx.mailer,
        &fx.templates,
        owner,
        None,
        MailingInput {
            start_time: start(0),
            frequency: Frequency::Daily,
            message_id: Some(message_id),
            client_ids: vec![bad, good],
        },
        at(12, 0),
    )
    .await
    .expect("save");

    let report = saved.dispatch.expect("dispatch report");
    assert_eq!(report.sent, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.last_status, Some(DeliveryStatus::Sent));

    let failed = mailing_service::list_attempts(
        &fx.db,
        AttemptFilter {
            client_id: Some(bad),
            ..Default::default()
        },
    )
    .await
    .expect("attempts");
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].status, "failed");
    assert!(failed[0].response.contains("bounce@example.com"));
}

#[tokio::test]
async fn mailing_before_start_time_stays_created() {
    let fx = setup().await;
    let owner = create_user(&fx.db, "owner@example.com").await;
    let c1 = fx.client("a@example.com").await;
    let message_id = fx.message().await;

    let saved = mailing_service::save_mailing(
        &fx.db,
        &fx.mailer,
        &fx.templates,
        owner,
        None,
        MailingInput {
            start_time: start(18),
            frequency: Frequency::Monthly,
            message_id: Some(message_id),
            client_ids: vec![c1],
        },
        at(17, 59),
    )
    .await
    .expect("save");

    assert_eq!(saved.mailing.status, "created");
    assert!(saved.dispatch.is_none());
    assert!(fx.mailer.sent().await.is_empty());

    // Saving again once the hour has come starts it
    let updated = mailing_service::save_mailing(
        &fx.db,
        &fx.mailer,
        &fx.templates,
        owner,
        Some(saved.mailing.id),
        MailingInput {
            start_time: start(18),
            frequency: Frequency::Monthly,
            message_id: Some(message_id),
            client_ids: vec![c1],
        },
        at(18, 0),
    )
    .await
    .expect("update");
    assert_eq!(updated.mailing.status, "started");
    assert_eq!(fx.mailer.sent().await.len(), 1);
}

#[tokio::test]
async fn started_mailing_is_not_sent_twice() {
    let fx = setup().await;
    let owner = create_user(&fx.db, "owner@example.com").await;
    let c1 = fx.client("a@example.com").await;
    let message_id = fx.message().await;
    let input = MailingInput {
        start_time: start(0),
        frequency: Frequency::Daily,
        message_id: Some(message_id),
        client_ids: vec![c1],
    };

    let saved = mailing_service::save_mailing(
        &fx.db,
        &fx.mailer,
        &fx.templates,
        owner,
        None,
        input.clone(),
        at(8, 0),
    )
    .await
    .expect("save");
    assert!(saved.dispatch.is_some());

    let again = mailing_service::save_mailing(
        &fx.db,
        &fx.mailer,
        &fx.templates,
        owner,
        Some(saved.mailing.id),
        input,
        at(9, 0),
    )
    .await
    .expect("resave");
    assert!(again.dispatch.is_none());
    assert_eq!(again.mailing.status, "started");
    assert_eq!(fx.mailer.sent().await.len(), 1);
}

#[tokio::test]
async fn completed_mailing_is_not_restarted_by_a_save() {
    let fx = setup().await;
    let owner = create_user(&fx.db, "owner@example.com").await;
    let c1 = fx.client("a@example.com").await;
    let message_id = fx.message().await;
    let input = MailingInput {
        start_time: start(7),
        frequency: Frequency::Weekly,
        message_id: Some(message_id),
        client_ids: vec![c1],
    };

    let saved = mailing_service::save_mailing(
        &fx.db,
        &fx.mailer,
        &fx.templates,
        owner,
        None,
        input.clone(),
        at(7, 30),
    )
    .await
    .expect("save");
    assert!(saved.dispatch.is_some());

    let completed = mailing_service::complete_mailing(&fx.db, saved.mailing.id)
        .await
        .expect("complete");
    assert_eq!(completed.status, "completed");

    let again = mailing_service::save_mailing(
        &fx.db,
        &fx.mailer,
        &fx.templates,
        owner,
        Some(saved.mailing.id),
        input,
        at(23, 0),
    )
    .await
    .expect("resave");
    assert!(again.dispatch.is_none());
    assert_eq!(again.mailing.status, "completed");
    assert_eq!(fx.mailer.sent().await.len(), 1);
}

#[tokio::test]
async fn simultaneous_saves_dispatch_once() {
    let fx = setup().await;
    let owner = create_user(&fx.db, "owner@example.com").await;
    let c1 = fx.client("a@example.com").await;
    let message_id = fx.message().await;
    let input = MailingInput {
        start_time: start(10),
        frequency: Frequency::Daily,
        message_id: Some(message_id),
        client_ids: vec![c1],
    };

    // Not due yet, so it waits in `created`
    let saved = mailing_service::save_mailing(
        &fx.db,
        &fx.mailer,
        &fx.templates,
        owner,
        None,
        input.clone(),
        at(9, 0),
    )
    .await
    .expect("save");
    assert!(saved.dispatch.is_none());
    let id = saved.mailing.id;

    let (first, second) = tokio::join!(
        mailing_service::save_mailing(
            &fx.db,
            &fx.mailer,
            &fx.templates,
            owner,
            Some(id),
            input.clone(),
            at(12, 0),
        ),
        mailing_service::save_mailing(
            &fx.db,
            &fx.mailer,
            &fx.templates,
            owner,
            Some(id),
            input,
            at(12, 0),
        ),
    );
    let first = first.expect("first save");
    let second = second.expect("second save");

    let dispatched = [&first, &second]
        .iter()
        .filter(|s| s.dispatch.is_some())
        .count();
    assert_eq!(dispatched, 1);
    assert_eq!(first.mailing.status, "started");
    assert_eq!(second.mailing.status, "started");
    assert_eq!(fx.mailer.sent().await.len(), 1);
}

#[tokio::test]
async fn mailing_without_message_or_clients() {
    let fx = setup().await;
    let owner = create_user(&fx.db, "owner@example.com").await;
    let c1 = fx.client("a@example.com").await;

    let no_message = mailing_service::save_mailing(
        &fx.db,
        &fx.mailer,
        &fx.templates,
        owner,
        None,
        MailingInput {
            start_time: start(0),
            frequency: Frequency::Daily,
            message_id: None,
            client_ids: vec![c1],
        },
        at(8, 0),
    )
    .await
    .expect("save");
    assert_eq!(no_message.mailing.status, "created");
    assert!(no_message.dispatch.is_none());

    let message_id = fx.message().await;
    let no_clients = mailing_service::save_mailing(
        &fx.db,
        &fx.mailer,
        &fx.templates,
        owner,
        None,
        MailingInput {
            start_time: start(0),
            frequency: Frequency::Daily,
            message_id: Some(message_id),
            client_ids: vec![],
        },
        at(8, 0),
    )
    .await
    .expect("save");
    assert_eq!(no_clients.mailing.status, "started");
    let report = no_clients.dispatch.expect("dispatch report");
    assert_eq!(report.sent + report.failed, 0);
    assert_eq!(report.last_status, None);
    assert!(fx.mailer.sent().await.is_empty());
}

#[tokio::test]
async fn unknown_references_are_rejected() {
    let fx = setup().await;
    let owner = create_user(&fx.db, "owner@example.com").await;

    let result = mailing_service::save_mailing(
        &fx.db,
        &fx.mailer,
        &fx.templates,
        owner,
        None,
        MailingInput {
            start_time: start(0),
            frequency: Frequency::Daily,
            message_id: Some(404),
            client_ids: vec![],
        },
        at(8, 0),
    )
    .await;
    assert!(matches!(result, Err(DomainError::Validation(_))));

    let result = mailing_service::save_mailing(
        &fx.db,
        &fx.mailer,
        &fx.templates,
        owner,
        None,
        MailingInput {
            start_time: start(0),
            frequency: Frequency::Daily,
            message_id: None,
            client_ids: vec![77],
        },
        at(8, 0),
    )
    .await;
    assert!(matches!(result, Err(DomainError::Validation(_))));
}

#[tokio::test]
async fn ownership_rules() {
    let fx = setup().await;
    let owner = create_user(&fx.db, "owner@example.com").await;
    let other = create_user(&fx.db, "other@example.com").await;
    let manager = Actor {
        user_id: other.user_id,
        is_manager: true,
    };

    let saved = mailing_service::save_mailing(
        &fx.db,
        &fx.mailer,
        &fx.templates,
        owner,
        None,
        MailingInput {
            start_time: start(23),
            frequency: Frequency::Daily,
            message_id: None,
            client_ids: vec![],
        },
        at(8, 0),
    )
    .await
    .expect("save");
    let id = saved.mailing.id;

    assert!(mailing_service::list_mailings(&fx.db, other).await.unwrap().is_empty());
    assert_eq!(mailing_service::list_mailings(&fx.db, manager).await.unwrap().len(), 1);
    assert!(matches!(
        mailing_service::get_mailing(&fx.db, other, id).await,
        Err(DomainError::NotFound)
    ));
    assert!(mailing_service::get_mailing(&fx.db, manager, id).await.is_ok());
    assert!(matches!(
        mailing_service::delete_mailing(&fx.db, manager, id).await,
        Err(DomainError::Forbidden(_))
    ));

    let completed = mailing_service::complete_mailing(&fx.db, id).await.unwrap();
    assert_eq!(completed.status, "completed");

    mailing_service::delete_mailing(&fx.db, owner, id).await.unwrap();
    assert!(matches!(
        mailing_service::get_mailing(&fx.db, owner, id).await,
        Err(DomainError::NotFound)
    ));
}
