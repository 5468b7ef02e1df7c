//! Accounts, group membership and identity resolution.

use crate::{
    core::{child, roles::Role},
    entities::{Account, AccountGroup, Child, Group, account, account_group},
    errors::{Error, FieldErrors, Result},
};
use sea_orm::{ConnectionTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, instrument};

/// Longest accepted username
pub const MAX_USERNAME_LEN: usize = 150;

/// The authenticated caller of a request
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub account: account::Model,
    pub groups: Vec<Group>,
    pub role: Role,
}

impl Identity {
    /// Whether the account is a member of `group`.
    #[must_use]
    pub fn in_group(&self, group: Group) -> bool {
        self.groups.contains(&group)
    }
}

/// Fields of a new account
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
}

/// Loads the account behind an id together with its groups and role.
pub async fn load_identity(db: &DatabaseConnection, account_id: i64) -> Result<Option<Identity>> {
    let Some(account) = Account::find_by_id(account_id).one(db).await? else {
        return Ok(None);
    };
    let groups = groups_of(db, account_id).await?;
    let role = Role::resolve(account.is_staff, &groups);
    Ok(Some(Identity {
        account,
        groups,
        role,
    }))
}

/// Groups an account belongs to.
pub async fn groups_of<C>(db: &C, account_id: i64) -> Result<Vec<Group>>
where
    C: ConnectionTrait,
{
    let rows = AccountGroup::find()
        .filter(account_group::Column::AccountId.eq(account_id))
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|row| row.group).collect())
}

/// Adds an account to a group; a no-op when it is already a member.
pub async fn add_to_group<C>(db: &C, account_id: i64, group: Group) -> Result<()>
where
    C: ConnectionTrait,
{
    if groups_of(db, account_id).await?.contains(&group) {
        return Ok(());
    }
    account_group::ActiveModel {
        account_id: Set(account_id),
        group: Set(group),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(())
}

/// Whether `username` is taken by an account other than `except`.
pub async fn username_taken<C>(db: &C, username: &str, except: Option<i64>) -> Result<bool>
where
    C: ConnectionTrait,
{
    let mut query = Account::find().filter(account::Column::Username.eq(username));
    if let Some(id) = except {
        query = query.filter(account::Column::Id.ne(id));
    }
    Ok(query.count(db).await? > 0)
}

/// Loose shape check; delivery is not verified.
pub(crate) fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

pub(crate) fn check_username(errors: &mut FieldErrors, field: &str, username: &str) {
    if username.is_empty() {
        errors.add(field, "This field is required.");
    } else if username.chars().count() > MAX_USERNAME_LEN {
        errors.add(
            field,
            format!("Ensure this value has at most {MAX_USERNAME_LEN} characters."),
        );
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
    {
        errors.add(
            field,
            "Enter a valid username. Use letters, digits and @/./+/-/_ only.",
        );
    }
}

/// Inserts an account and its group memberships.
pub async fn create_account<C>(db: &C, new: &NewAccount, groups: &[Group]) -> Result<account::Model>
where
    C: ConnectionTrait,
{
    let account = account::ActiveModel {
        username: Set(new.username.clone()),
        email: Set(new.email.clone()),
        first_name: Set(new.first_name.clone()),
        last_name: Set(new.last_name.clone()),
        is_staff: Set(new.is_staff),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    for group in groups {
        add_to_group(db, account.id, *group).await?;
    }
    Ok(account)
}

/// Creates a parent account.
#[instrument(skip(db))]
pub async fn create_parent(db: &DatabaseConnection, new: &NewAccount) -> Result<account::Model> {
    let username = new.username.trim();
    let email = new.email.trim();

    let mut errors = FieldErrors::new();
    check_username(&mut errors, "username", username);
    if email.is_empty() {
        errors.add("email", "This field is required.");
    } else if !is_valid_email(email) {
        errors.add("email", "Enter a valid email address.");
    }
    if errors.get("username").is_none() && username_taken(db, username, None).await? {
        errors.add("username", "A user with that username already exists.");
    }
    errors.into_result()?;

    let new = NewAccount {
        username: username.to_string(),
        email: email.to_string(),
        first_name: new.first_name.trim().to_string(),
        last_name: new.last_name.trim().to_string(),
        is_staff: false,
    };

    let txn = db.begin().await?;
    let parent = create_account(&txn, &new, &[Group::Parent]).await?;
    txn.commit().await?;

    info!("Created parent account '{}'", parent.username);
    Ok(parent)
}

/// Accounts in the Parent group, ordered by username.
pub async fn list_parents(db: &DatabaseConnection) -> Result<Vec<account::Model>> {
    let parent_ids: Vec<i64> = AccountGroup::find()
        .filter(account_group::Column::Group.eq(Group::Parent))
        .all(db)
        .await?
        .into_iter()
        .map(|row| row.account_id)
        .collect();

    Account::find()
        .filter(account::Column::Id.is_in(parent_ids))
        .order_by_asc(account::Column::Username)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an account that is a member of the Parent group.
pub async fn get_parent(db: &DatabaseConnection, id: i64) -> Result<account::Model> {
    let account = Account::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::AccountNotFound { id })?;
    if !groups_of(db, id).await?.contains(&Group::Parent) {
        return Err(Error::AccountNotFound { id });
    }
    Ok(account)
}

/// Deletes a parent account with all of its children, their subscriptions
/// and participations.
///
/// Accounts outside the Parent group are reported as not found.
#[instrument(skip(db))]
pub async fn delete_parent(db: &DatabaseConnection, id: i64) -> Result<account::Model> {
    let parent = get_parent(db, id).await?;

    let txn = db.begin().await?;
    let children = Child::find()
        .filter(crate::entities::child::Column::ParentId.eq(id))
        .all(&txn)
        .await?;
    for kid in &children {
        child::delete_child_rows(&txn, kid.id).await?;
    }
    AccountGroup::delete_many()
        .filter(account_group::Column::AccountId.eq(id))
        .exec(&txn)
        .await?;
    Account::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    info!(
        "Deleted parent '{}' and {} children",
        parent.username,
        children.len()
    );
    Ok(parent)
}

/// Creates the configured staff account unless the username already exists.
///
/// Returns the account when it was created.
pub async fn ensure_admin(
    db: &DatabaseConnection,
    username: &str,
    email: &str,
) -> Result<Option<account::Model>> {
    if username_taken(db, username, None).await? {
        return Ok(None);
    }

    let txn = db.begin().await?;
    let admin = create_account(
        &txn,
        &NewAccount {
            username: username.to_string(),
            email: email.to_string(),
            is_staff: true,
            ..Default::default()
        },
        &[Group::Admin],
    )
    .await?;
    txn.commit().await?;

    info!("Created staff account '{}'", admin.username);
    Ok(Some(admin))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        entities::{SessionParticipant, Subscription},
        test_utils::*,
    };

    fn parent_input(username: &str, email: &str) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            email: email.to_string(),
            first_name: "Olga".to_string(),
            last_name: "Petrova".to_string(),
            is_staff: false,
        }
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("olga@example.com"));
        assert!(!is_valid_email("olga"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("olga@example"));
        assert!(!is_valid_email("ol ga@example.com"));
    }

    #[tokio::test]
    async fn test_create_parent_and_resolve_identity() -> Result<()> {
        let db = setup_test_db().await?;
        let parent = create_parent(&db, &parent_input(" olga ", "olga@example.com")).await?;
        assert_eq!(parent.username, "olga");

        let identity = load_identity(&db, parent.id).await?.unwrap();
        assert_eq!(identity.role, Role::Parent);
        assert!(identity.in_group(Group::Parent));
        assert!(load_identity(&db, 404).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_parent_rejects_duplicates_and_bad_email() -> Result<()> {
        let db = setup_test_db().await?;
        create_parent(&db, &parent_input("olga", "olga@example.com")).await?;

        let Err(Error::Validation(errors)) =
            create_parent(&db, &parent_input("olga", "not-an-email")).await
        else {
            panic!("expected validation error");
        };
        assert!(errors.get("username").is_some());
        assert!(errors.get("email").is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_parents_only_lists_parent_group() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_parent(&db, "zina").await?;
        create_test_parent(&db, "anya").await?;
        ensure_admin(&db, "boss", "").await?;

        let names: Vec<String> = list_parents(&db)
            .await?
            .into_iter()
            .map(|p| p.username)
            .collect();
        assert_eq!(names, vec!["anya", "zina"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_parent_cascades_to_children() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_plan(&db, "Basic", 8, 4000.0).await?;
        let parent = create_test_parent(&db, "olga").await?;
        let kid = create_test_child(&db, "Anna", Some(parent.id)).await?;
        let other = create_test_child(&db, "Boris", None).await?;
        let session = create_test_session(&db, &[kid.id, other.id]).await?;

        delete_parent(&db, parent.id).await?;

        assert!(Account::find_by_id(parent.id).one(&db).await?.is_none());
        assert!(Child::find_by_id(kid.id).one(&db).await?.is_none());
        assert!(Child::find_by_id(other.id).one(&db).await?.is_some());
        let subs = Subscription::find().all(&db).await?;
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].child_id, other.id);
        let participants = SessionParticipant::find().all(&db).await?;
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].session_id, session.id);
        assert!(groups_of(&db, parent.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_parent_refuses_non_parent() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = ensure_admin(&db, "boss", "boss@example.com").await?.unwrap();
        assert!(matches!(
            delete_parent(&db, admin.id).await,
            Err(Error::AccountNotFound { .. })
        ));
        assert!(Account::find_by_id(admin.id).one(&db).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = ensure_admin(&db, "boss", "").await?.unwrap();
        assert!(admin.is_staff);
        assert!(ensure_admin(&db, "boss", "").await?.is_none());

        let identity = load_identity(&db, admin.id).await?.unwrap();
        assert_eq!(identity.role, Role::Admin);
        Ok(())
    }
}
