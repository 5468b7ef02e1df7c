//! Student records.
//!
//! A student is either a minor attached to a parent account or an adult with a
//! login of their own. Saving a student always leaves it with a subscription
//! when at least one plan exists.

use crate::{
    core::{
        account::{self, NewAccount},
        subscription::{self, SubscriptionView},
    },
    entities::{
        Account, Child, Gender, Group, SessionParticipant, Subscription, TrainingSession,
        account as account_entity, child, session_participant, subscription as sub_entity,
        training_session,
    },
    errors::{Error, FieldErrors, Result},
};
use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument};

/// Longest accepted first or last name
pub const MAX_NAME_LEN: usize = 100;

/// Which kind of student a form describes
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentType {
    Child,
    Adult,
}

/// Student form data after parsing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StudentInput {
    pub student_type: StudentType,
    /// Required for children, ignored for adults
    pub parent_id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Gender,
    pub notes: String,
    /// Required for adults, ignored for children
    pub account_username: String,
    pub account_email: String,
}

/// A student with its parent and login account, for listings
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChildRow {
    #[serde(flatten)]
    pub child: child::Model,
    pub parent: Option<account_entity::Model>,
    pub account: Option<account_entity::Model>,
}

/// Everything the student detail page shows
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChildDetail {
    pub child: child::Model,
    pub parent: Option<account_entity::Model>,
    pub account: Option<account_entity::Model>,
    pub subscription: Option<SubscriptionView>,
    /// Most recent first
    pub sessions: Vec<training_session::Model>,
}

async fn validate<C>(db: &C, input: &StudentInput, existing: Option<&child::Model>) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut errors = FieldErrors::new();

    // Only the first name is required; the last name may stay blank.
    if input.first_name.trim().is_empty() {
        errors.add("first_name", "This field is required.");
    }
    for (field, value) in [
        ("first_name", &input.first_name),
        ("last_name", &input.last_name),
    ] {
        if value.trim().chars().count() > MAX_NAME_LEN {
            errors.add(
                field,
                format!("Ensure this value has at most {MAX_NAME_LEN} characters."),
            );
        }
    }

    match input.student_type {
        StudentType::Child => match input.parent_id {
            None => errors.add("parent", "A child must have a parent."),
            Some(parent_id) => {
                let is_parent = Account::find_by_id(parent_id).one(db).await?.is_some()
                    && account::groups_of(db, parent_id)
                        .await?
                        .contains(&Group::Parent);
                if !is_parent {
                    errors.add("parent", "Select a valid parent account.");
                }
            }
        },
        StudentType::Adult => {
            let username = input.account_username.trim();
            if username.is_empty() {
                errors.add("account_username", "An adult student needs a username.");
            } else {
                account::check_username(&mut errors, "account_username", username);
                if errors.get("account_username").is_none()
                    && account::username_taken(db, username, existing.and_then(|c| c.account_id))
                        .await?
                {
                    errors.add("account_username", "This username is already taken.");
                }
            }
            let email = input.account_email.trim();
            if !email.is_empty() && !account::is_valid_email(email) {
                errors.add("account_email", "Enter a valid email address.");
            }
        }
    }

    errors.into_result()
}

/// Creates or updates the login of an adult student; returns its id.
async fn upsert_student_account<C>(
    db: &C,
    input: &StudentInput,
    existing_account: Option<i64>,
) -> Result<i64>
where
    C: ConnectionTrait,
{
    let username = input.account_username.trim().to_string();
    let email = input.account_email.trim().to_string();

    let found = match existing_account {
        Some(id) => Account::find_by_id(id).one(db).await?,
        None => None,
    };
    if let Some(found) = found {
        let mut active: account_entity::ActiveModel = found.into();
        active.username = Set(username);
        active.email = Set(email);
        let updated = active.update(db).await?;
        account::add_to_group(db, updated.id, Group::Student).await?;
        return Ok(updated.id);
    }

    let created = account::create_account(
        db,
        &NewAccount {
            username,
            email,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            is_staff: false,
        },
        &[Group::Student],
    )
    .await?;
    Ok(created.id)
}

/// Writes the validated form onto a student row (new or existing).
async fn save_student<C>(
    db: &C,
    input: &StudentInput,
    existing: Option<child::Model>,
) -> Result<child::Model>
where
    C: ConnectionTrait,
{
    let (parent_id, account_id, is_adult) = match input.student_type {
        StudentType::Adult => {
            let account_id =
                upsert_student_account(db, input, existing.as_ref().and_then(|c| c.account_id))
                    .await?;
            (None, Some(account_id), true)
        }
        StudentType::Child => (input.parent_id, None, false),
    };

    let is_new = existing.is_none();
    let mut active: child::ActiveModel = match existing {
        Some(model) => model.into(),
        None => <child::ActiveModel as Default>::default(),
    };
    active.parent_id = Set(parent_id);
    active.account_id = Set(account_id);
    active.is_adult = Set(is_adult);
    active.first_name = Set(input.first_name.trim().to_string());
    active.last_name = Set(input.last_name.trim().to_string());
    active.birth_date = Set(input.birth_date);
    active.gender = Set(input.gender);
    active.notes = Set(input.notes.trim().to_string());

    let saved = if is_new {
        active.insert(db).await?
    } else {
        active.update(db).await?
    };
    subscription::ensure_subscription(db, saved.id).await?;
    Ok(saved)
}

/// Creates a student from validated form data.
#[instrument(skip(db))]
pub async fn create_student(db: &DatabaseConnection, input: &StudentInput) -> Result<child::Model> {
    validate(db, input, None).await?;

    let txn = db.begin().await?;
    let created = save_student(&txn, input, None).await?;
    txn.commit().await?;

    info!("Created student '{}' ({:?})", created.full_name(), input.student_type);
    Ok(created)
}

/// Updates a student.
///
/// Turning an adult into a child detaches its login account; the account
/// itself is kept.
#[instrument(skip(db))]
pub async fn update_student(
    db: &DatabaseConnection,
    id: i64,
    input: &StudentInput,
) -> Result<child::Model> {
    let existing = get_child(db, id).await?;
    validate(db, input, Some(&existing)).await?;

    let txn = db.begin().await?;
    let updated = save_student(&txn, input, Some(existing)).await?;
    txn.commit().await?;

    info!("Updated student {}", updated.id);
    Ok(updated)
}

pub async fn get_child(db: &DatabaseConnection, id: i64) -> Result<child::Model> {
    Child::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::ChildNotFound { id })
}

/// All students ordered by first then last name.
pub async fn list_children(db: &DatabaseConnection) -> Result<Vec<child::Model>> {
    Child::find()
        .order_by_asc(child::Column::FirstName)
        .order_by_asc(child::Column::LastName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// All students with their parent and login accounts.
pub async fn list_children_with_accounts(db: &DatabaseConnection) -> Result<Vec<ChildRow>> {
    let children = list_children(db).await?;
    let ids: Vec<i64> = children
        .iter()
        .flat_map(|c| [c.parent_id, c.account_id])
        .flatten()
        .collect();
    let accounts: HashMap<i64, account_entity::Model> = Account::find()
        .filter(account_entity::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();

    Ok(children
        .into_iter()
        .map(|child| ChildRow {
            parent: child.parent_id.and_then(|id| accounts.get(&id).cloned()),
            account: child.account_id.and_then(|id| accounts.get(&id).cloned()),
            child,
        })
        .collect())
}

/// Children registered under a parent account, ordered by name.
pub async fn children_of_parent(
    db: &DatabaseConnection,
    parent_id: i64,
) -> Result<Vec<child::Model>> {
    Child::find()
        .filter(child::Column::ParentId.eq(parent_id))
        .order_by_asc(child::Column::FirstName)
        .order_by_asc(child::Column::LastName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The student record linked to an adult's login.
pub async fn linked_student(
    db: &DatabaseConnection,
    account_id: i64,
) -> Result<Option<child::Model>> {
    Child::find()
        .filter(child::Column::AccountId.eq(account_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads a student with parent, account, subscription and session history.
pub async fn child_detail(db: &DatabaseConnection, id: i64) -> Result<ChildDetail> {
    let child = get_child(db, id).await?;
    let parent = match child.parent_id {
        Some(pid) => Account::find_by_id(pid).one(db).await?,
        None => None,
    };
    let account = match child.account_id {
        Some(aid) => Account::find_by_id(aid).one(db).await?,
        None => None,
    };
    let subscription = subscription::get_subscription_view(db, id).await?;
    let sessions = child
        .find_related(TrainingSession)
        .order_by_desc(training_session::Column::Start)
        .all(db)
        .await?;

    Ok(ChildDetail {
        child,
        parent,
        account,
        subscription,
        sessions,
    })
}

/// Removes a student's participations, subscription and row.
pub(crate) async fn delete_child_rows<C>(db: &C, child_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    SessionParticipant::delete_many()
        .filter(session_participant::Column::ChildId.eq(child_id))
        .exec(db)
        .await?;
    Subscription::delete_many()
        .filter(sub_entity::Column::ChildId.eq(child_id))
        .exec(db)
        .await?;
    Child::delete_by_id(child_id).exec(db).await?;
    Ok(())
}

/// Deletes a student together with its subscription and participations.
/// An adult's login account is kept.
#[instrument(skip(db))]
pub async fn delete_child(db: &DatabaseConnection, id: i64) -> Result<child::Model> {
    let child = get_child(db, id).await?;

    let txn = db.begin().await?;
    delete_child_rows(&txn, id).await?;
    txn.commit().await?;

    info!("Deleted student '{}'", child.full_name());
    Ok(child)
}
