//! Mailing Service - scheduling check, dispatch and delivery bookkeeping
//!
//! Dispatch is sequential: one client at a time, one delivery
//! attempt recorded per client, no retries. A failed send is recorded and the
//! loop moves on to the next client.

use std::collections::{HashMap, HashSet};

use chrono::NaiveTime;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::Serialize;

use crate::domain::{Actor, DeliveryStatus, DomainError, MailingStatus};
use crate::mail::{Email, MailError, Mailer, Templates};
use crate::models::client::{self, Entity as Client};
use crate::models::delivery_attempt::{self, Entity as DeliveryAttempt};
use crate::models::mailing::{self, Entity as Mailing, MailingDto, MailingInput};
use crate::models::mailing_client::{self, Entity as MailingClient};
use crate::models::message::{self, Entity as Message};

pub const SENT_RESPONSE: &str = "Message sent successfully";

/// Outcome of one pass over a mailing's clients
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DispatchReport {
    pub mailing_id: i32,
    pub sent: usize,
    pub failed: usize,
    /// Status of the last attempt; `None` when the mailing had no clients
    pub last_status: Option<DeliveryStatus>,
}

/// A saved mailing together with the dispatch its save triggered, if any
#[derive(Debug, Serialize)]
pub struct SavedMailing {
    pub mailing: MailingDto,
    pub dispatch: Option<DispatchReport>,
}

/// Filter parameters for listing delivery attempts
#[derive(Debug, Default, Clone)]
pub struct AttemptFilter {
    pub mailing_id: Option<i32>,
    pub client_id: Option<i32>,
    /// Restrict to mailings owned by this user
    pub owner_id: Option<i32>,
}

/// Render, build and send one newsletter email.
async fn deliver(
    mailer: &dyn Mailer,
    templates: &Templates,
    message: &message::Model,
    to: &str,
) -> Result<(), MailError> {
    let (text, html) = templates.render_message(&message.subject, &message.body)?;

    let email = Email::plain(to, &message.subject, text)?
        .with_html(html)
        .sent_by(mailer.default_from());

    mailer.send(&email).await
}

/// Send the mailing's message to every client and record one delivery
/// attempt per client.
pub async fn send_messages(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
    templates: &Templates,
    mailing: &mailing::Model,
) -> Result<DispatchReport, DomainError> {
    let message_id = mailing.message_id.ok_or_else(|| {
        DomainError::Validation(format!("Mailing {} has no message", mailing.id))
    })?;
    let message = Message::find_by_id(message_id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;

    let clients = mailing
        .find_related(Client)
        .order_by_asc(client::Column::Id)
        .all(db)
        .await?;

    let mut report = DispatchReport {
        mailing_id: mailing.id,
        sent: 0,
        failed: 0,
        last_status: None,
    };

    for client in clients {
        let sent_at = chrono::Utc::now().to_rfc3339();

        let (status, response) = match deliver(mailer, templates, &message, &client.email).await {
            Ok(()) => {
                report.sent += 1;
                (DeliveryStatus::Sent, SENT_RESPONSE.to_string())
            }
            Err(e) => {
                tracing::warn!(
                    "Mailing {}: delivery to client {} <{}> failed: {}",
                    mailing.id,
                    client.id,
                    client.email,
                    e
                );
                report.failed += 1;
                (DeliveryStatus::Failed, e.to_string())
            }
        };

        delivery_attempt::ActiveModel {
            timestamp: Set(sent_at),
            status: Set(status.as_str().to_string()),
            response: Set(response),
            client_id: Set(client.id),
            mailing_id: Set(mailing.id),
            message_id: Set(message.id),
            ..Default::default()
        }
        .insert(db)
        .await?;

        report.last_status = Some(status);
    }

    tracing::info!(
        "Mailing {} dispatched: {} sent, {} failed",
        mailing.id,
        report.sent,
        report.failed
    );

    Ok(report)
}

/// Start the mailing if it is still `created` and its start time has been
/// reached at `now`. Returns the (possibly updated) mailing and the dispatch
/// report when a dispatch happened.
pub async fn start_scheduled_mailing(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
    templates: &Templates,
    mailing: mailing::Model,
    now: NaiveTime,
) -> Result<(mailing::Model, Option<DispatchReport>), DomainError> {
    let status = mailing.parsed_status()?;
    let start_time = mailing.parsed_start_time()?;

    if !status.should_start(start_time, now) {
        return Ok((mailing, None));
    }

    if mailing.message_id.is_none() {
        tracing::warn!(
            "Mailing {} is due at {} but has no message; leaving it {}",
            mailing.id,
            start_time,
            status
        );
        return Ok((mailing, None));
    }

    tracing::info!("Starting mailing {} (scheduled {})", mailing.id, start_time);

    // Only the caller that moves it out of `created` dispatches
    let flipped = Mailing::update_many()
        .col_expr(
            mailing::Column::Status,
            Expr::value(MailingStatus::Started.as_str()),
        )
        .col_expr(
            mailing::Column::UpdatedAt,
            Expr::value(chrono::Utc::now().to_rfc3339()),
        )
        .filter(mailing::Column::Id.eq(mailing.id))
        .filter(mailing::Column::Status.eq(MailingStatus::Created.as_str()))
        .exec(db)
        .await?;

    let started = Mailing::find_by_id(mailing.id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;

    if flipped.rows_affected != 1 {
        tracing::debug!("Mailing {} was already started elsewhere", mailing.id);
        return Ok((started, None));
    }

    let report = send_messages(db, mailer, templates, &started).await?;
    Ok((started, Some(report)))
}

async fn ensure_references(
    db: &DatabaseConnection,
    input: &MailingInput,
) -> Result<Vec<i32>, DomainError> {
    if let Some(message_id) = input.message_id {
        if Message::find_by_id(message_id).one(db).await?.is_none() {
            return Err(DomainError::Validation(format!(
                "Message {} does not exist",
                message_id
            )));
        }
    }

    let mut wanted: Vec<i32> = input.client_ids.clone();
    wanted.sort_unstable();
    wanted.dedup();

    if !wanted.is_empty() {
        let found: HashSet<i32> = Client::find()
            .filter(client::Column::Id.is_in(wanted.clone()))
            .all(db)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        if let Some(missing) = wanted.iter().find(|id| !found.contains(*id)) {
            return Err(DomainError::Validation(format!(
                "Client {} does not exist",
                missing
            )));
        }
    }

    Ok(wanted)
}

async fn replace_clients<C: ConnectionTrait>(
    conn: &C,
    mailing_id: i32,
    client_ids: &[i32],
) -> Result<(), DbErr> {
    MailingClient::delete_many()
        .filter(mailing_client::Column::MailingId.eq(mailing_id))
        .exec(conn)
        .await?;

    if client_ids.is_empty() {
        return Ok(());
    }

    let rows = client_ids.iter().map(|client_id| mailing_client::ActiveModel {
        mailing_id: Set(mailing_id),
        client_id: Set(*client_id),
    });
    MailingClient::insert_many(rows)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// Persist a mailing and its client set, then run the scheduling check.
/// `id = None` inserts a new mailing owned by the actor; `Some(id)` updates
/// an existing one the actor owns.
pub async fn save_mailing(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
    templates: &Templates,
    actor: Actor,
    id: Option<i32>,
    input: MailingInput,
    now: NaiveTime,
) -> Result<SavedMailing, DomainError> {
    let client_ids = ensure_references(db, &input).await?;
    let timestamp = chrono::Utc::now().to_rfc3339();

    let txn = db.begin().await?;

    let saved = match id {
        None => {
            mailing::ActiveModel {
                start_time: Set(input.start_time.to_string()),
                frequency: Set(input.frequency.as_str().to_string()),
                status: Set(MailingStatus::Created.as_str().to_string()),
                user_id: Set(actor.user_id),
                message_id: Set(input.message_id),
                created_at: Set(timestamp.clone()),
                updated_at: Set(timestamp),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
        Some(id) => {
            let existing = Mailing::find_by_id(id)
                .one(&txn)
                .await?
                .ok_or(DomainError::NotFound)?;
            if !actor.can_edit(existing.user_id) {
                return Err(DomainError::Forbidden(
                    "Only the owner can edit this mailing".to_string(),
                ));
            }

            let mut active: mailing::ActiveModel = existing.into();
            active.start_time = Set(input.start_time.to_string());
            active.frequency = Set(input.frequency.as_str().to_string());
            active.message_id = Set(input.message_id);
            active.updated_at = Set(timestamp);
            active.update(&txn).await?
        }
    };

    replace_clients(&txn, saved.id, &client_ids).await?;
    txn.commit().await?;

    let (saved, dispatch) = start_scheduled_mailing(db, mailer, templates, saved, now).await?;

    Ok(SavedMailing {
        mailing: MailingDto::new(saved, client_ids),
        dispatch,
    })
}

/// Client ids per mailing, ascending.
pub async fn client_ids_for(
    db: &DatabaseConnection,
    mailing_ids: &[i32],
) -> Result<HashMap<i32, Vec<i32>>, DomainError> {
    let mut map: HashMap<i32, Vec<i32>> = HashMap::new();
    if mailing_ids.is_empty() {
        return Ok(map);
    }

    let rows = MailingClient::find()
        .filter(mailing_client::Column::MailingId.is_in(mailing_ids.iter().copied()))
        .order_by_asc(mailing_client::Column::ClientId)
        .all(db)
        .await?;

    for row in rows {
        map.entry(row.mailing_id).or_default().push(row.client_id);
    }
    Ok(map)
}

async fn to_dtos(
    db: &DatabaseConnection,
    mailings: Vec<mailing::Model>,
) -> Result<Vec<MailingDto>, DomainError> {
    let ids: Vec<i32> = mailings.iter().map(|m| m.id).collect();
    let mut clients = client_ids_for(db, &ids).await?;
    Ok(mailings
        .into_iter()
        .map(|m| {
            let ids = clients.remove(&m.id).unwrap_or_default();
            MailingDto::new(m, ids)
        })
        .collect())
}

/// Managers see every mailing, everyone else only their own.
pub async fn list_mailings(
    db: &DatabaseConnection,
    actor: Actor,
) -> Result<Vec<MailingDto>, DomainError> {
    let mut query = Mailing::find().order_by_desc(mailing::Column::Id);
    if !actor.is_manager {
        query = query.filter(mailing::Column::UserId.eq(actor.user_id));
    }
    let mailings = query.all(db).await?;
    to_dtos(db, mailings).await
}

async fn find_visible(
    db: &DatabaseConnection,
    actor: Actor,
    id: i32,
) -> Result<mailing::Model, DomainError> {
    let mailing = Mailing::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;

    // Other users' mailings read as missing
    if !actor.can_view(mailing.user_id) {
        return Err(DomainError::NotFound);
    }
    Ok(mailing)
}

pub async fn get_mailing(
    db: &DatabaseConnection,
    actor: Actor,
    id: i32,
) -> Result<MailingDto, DomainError> {
    let mailing = find_visible(db, actor, id).await?;
    let mut dtos = to_dtos(db, vec![mailing]).await?;
    dtos.pop().ok_or(DomainError::NotFound)
}

pub async fn delete_mailing(
    db: &DatabaseConnection,
    actor: Actor,
    id: i32,
) -> Result<(), DomainError> {
    let mailing = find_visible(db, actor, id).await?;
    if !actor.can_edit(mailing.user_id) {
        return Err(DomainError::Forbidden(
            "Only the owner can delete this mailing".to_string(),
        ));
    }
    Mailing::delete_by_id(mailing.id).exec(db).await?;
    Ok(())
}

/// Manager action: stop a mailing for good.
pub async fn complete_mailing(db: &DatabaseConnection, id: i32) -> Result<MailingDto, DomainError> {
    let mailing = Mailing::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;

    let mut active: mailing::ActiveModel = mailing.into();
    active.status = Set(MailingStatus::Completed.as_str().to_string());
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());
    let updated = active.update(db).await?;

    tracing::info!("Mailing {} marked completed", updated.id);

    let mut dtos = to_dtos(db, vec![updated]).await?;
    dtos.pop().ok_or(DomainError::NotFound)
}

/// Delivery attempts, newest first.
pub async fn list_attempts(
    db: &DatabaseConnection,
    filter: AttemptFilter,
) -> Result<Vec<delivery_attempt::Model>, DomainError> {
    let mut condition = Condition::all();

    if let Some(mailing_id) = filter.mailing_id {
        condition = condition.add(delivery_attempt::Column::MailingId.eq(mailing_id));
    }

    if let Some(client_id) = filter.client_id {
        condition = condition.add(delivery_attempt::Column::ClientId.eq(client_id));
    }

    let mut query = DeliveryAttempt::find();
    if let Some(owner_id) = filter.owner_id {
        query = query
            .inner_join(Mailing)
            .filter(mailing::Column::UserId.eq(owner_id));
    }

    let attempts = query
        .filter(condition)
        .order_by_desc(delivery_attempt::Column::Id)
        .all(db)
        .await?;

    Ok(attempts)
}

/// Attempts for one mailing the actor can see.
pub async fn attempts_for_mailing(
    db: &DatabaseConnection,
    actor: Actor,
    mailing_id: i32,
) -> Result<Vec<delivery_attempt::Model>, DomainError> {
    find_visible(db, actor, mailing_id).await?;
    list_attempts(
        db,
        AttemptFilter {
            mailing_id: Some(mailing_id),
            ..Default::default()
        },
    )
    .await
}
