//! Plan (subscription type) management.

use crate::{
    config::settings::PlanConfig,
    entities::{Subscription, SubscriptionType, subscription, subscription_type},
    errors::{Error, FieldErrors, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, instrument};

/// Longest accepted plan name
pub const MAX_NAME_LEN: usize = 100;
/// Largest lesson count a plan may carry
pub const MAX_LESSONS: i32 = 64;

/// Admin-submitted plan fields
#[derive(Clone, Debug, PartialEq)]
pub struct PlanInput {
    pub name: String,
    pub lessons_count: i32,
    pub price: f64,
}

impl PlanInput {
    /// Checks the fields, returning every problem found.
    pub fn validate(&self) -> Result<()> {
        let mut errors = FieldErrors::new();
        let name = self.name.trim();
        if name.is_empty() {
            errors.add("name", "This field is required.");
        } else if name.chars().count() > MAX_NAME_LEN {
            errors.add(
                "name",
                format!("Ensure this value has at most {MAX_NAME_LEN} characters."),
            );
        }
        if !(1..=MAX_LESSONS).contains(&self.lessons_count) {
            errors.add(
                "lessons_count",
                format!("Lesson count must be between 1 and {MAX_LESSONS}."),
            );
        }
        if !self.price.is_finite() || self.price < 0.0 {
            errors.add("price", "Price must be a non-negative number.");
        }
        errors.into_result()
    }
}

impl From<&PlanConfig> for PlanInput {
    fn from(plan: &PlanConfig) -> Self {
        Self {
            name: plan.name.clone(),
            lessons_count: plan.lessons_count,
            price: plan.price,
        }
    }
}

/// Result of a delete request
#[derive(Clone, Debug, PartialEq)]
pub enum DeleteOutcome {
    Deleted(subscription_type::Model),
    /// Subscriptions still reference the plan; nothing was removed
    InUse {
        plan: subscription_type::Model,
        subscriptions: u64,
    },
}

/// All plans, oldest first.
pub async fn list_subscription_types(
    db: &DatabaseConnection,
) -> Result<Vec<subscription_type::Model>> {
    SubscriptionType::find()
        .order_by_asc(subscription_type::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

pub async fn get_subscription_type(
    db: &DatabaseConnection,
    id: i64,
) -> Result<subscription_type::Model> {
    SubscriptionType::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::SubscriptionTypeNotFound { id })
}

#[instrument(skip(db))]
pub async fn create_subscription_type(
    db: &DatabaseConnection,
    input: &PlanInput,
) -> Result<subscription_type::Model> {
    input.validate()?;
    let plan = subscription_type::ActiveModel {
        name: Set(input.name.trim().to_string()),
        lessons_count: Set(input.lessons_count),
        price: Set(input.price),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!("Created plan '{}' ({} lessons)", plan.name, plan.lessons_count);
    Ok(plan)
}

/// Updates a plan. Existing balances keep their remaining lessons and price.
#[instrument(skip(db))]
pub async fn update_subscription_type(
    db: &DatabaseConnection,
    id: i64,
    input: &PlanInput,
) -> Result<subscription_type::Model> {
    let plan = get_subscription_type(db, id).await?;
    input.validate()?;

    let mut active: subscription_type::ActiveModel = plan.into();
    active.name = Set(input.name.trim().to_string());
    active.lessons_count = Set(input.lessons_count);
    active.price = Set(input.price);
    let updated = active.update(db).await?;
    info!("Updated plan {}", updated.id);
    Ok(updated)
}

/// Deletes a plan unless a subscription still uses it.
#[instrument(skip(db))]
pub async fn delete_subscription_type(db: &DatabaseConnection, id: i64) -> Result<DeleteOutcome> {
    let plan = get_subscription_type(db, id).await?;

    let in_use = Subscription::find()
        .filter(subscription::Column::SubTypeId.eq(id))
        .count(db)
        .await?;
    if in_use > 0 {
        info!("Refused to delete plan {}: {} subscriptions use it", id, in_use);
        return Ok(DeleteOutcome::InUse {
            plan,
            subscriptions: in_use,
        });
    }

    SubscriptionType::delete_by_id(id).exec(db).await?;
    info!("Deleted plan '{}'", plan.name);
    Ok(DeleteOutcome::Deleted(plan))
}

/// Inserts every configured plan whose name is not present yet.
///
/// Returns how many plans were created.
pub async fn seed_subscription_types(
    db: &DatabaseConnection,
    plans: &[PlanConfig],
) -> Result<usize> {
    let mut created = 0;
    for plan in plans {
        let exists = SubscriptionType::find()
            .filter(subscription_type::Column::Name.eq(plan.name.trim()))
            .count(db)
            .await?
            > 0;
        if !exists {
            create_subscription_type(db, &PlanInput::from(plan)).await?;
            created += 1;
        }
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn input(name: &str, lessons: i32, price: f64) -> PlanInput {
        PlanInput {
            name: name.to_string(),
            lessons_count: lessons,
            price,
        }
    }

    #[test]
    fn test_validation_reports_each_field() {
        let err = input("  ", 0, -5.0).validate().unwrap_err();
        let Error::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert!(fields.get("name").is_some());
        assert!(fields.get("lessons_count").is_some());
        assert!(fields.get("price").is_some());

        assert!(input("Basic", 64, 0.0).validate().is_ok());
        assert!(input("Basic", 65, 10.0).validate().is_err());
        assert!(input(&"x".repeat(101), 8, 10.0).validate().is_err());
        assert!(input("Basic", 8, f64::NAN).validate().is_err());
    }

    #[tokio::test]
    async fn test_create_invalid_plan_does_not_query() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let result = create_subscription_type(&db, &input("", 8, 100.0)).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_list() -> Result<()> {
        let db = setup_test_db().await?;
        let plan = create_subscription_type(&db, &input(" Basic ", 8, 4000.0)).await?;
        assert_eq!(plan.name, "Basic");

        let updated = update_subscription_type(&db, plan.id, &input("Basic+", 10, 4500.0)).await?;
        assert_eq!(updated.lessons_count, 10);

        let all = list_subscription_types(&db).await?;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Basic+");

        assert!(matches!(
            update_subscription_type(&db, 99, &input("X", 1, 1.0)).await,
            Err(Error::SubscriptionTypeNotFound { id: 99 })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_refused_while_in_use() -> Result<()> {
        let db = setup_test_db().await?;
        let used = create_test_plan(&db, "Basic", 8, 4000.0).await?;
        let unused = create_test_plan(&db, "Trial", 1, 500.0).await?;
        create_test_child(&db, "Anna", None).await?;

        let outcome = delete_subscription_type(&db, used.id).await?;
        assert!(matches!(outcome, DeleteOutcome::InUse { subscriptions: 1, .. }));
        assert!(SubscriptionType::find_by_id(used.id).one(&db).await?.is_some());

        let outcome = delete_subscription_type(&db, unused.id).await?;
        assert!(matches!(outcome, DeleteOutcome::Deleted(_)));
        assert!(SubscriptionType::find_by_id(unused.id).one(&db).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_skips_existing_names() -> Result<()> {
        let db = setup_test_db().await?;
        let plans = vec![
            PlanConfig {
                name: "Basic".to_string(),
                lessons_count: 8,
                price: 4000.0,
            },
            PlanConfig {
                name: "Long".to_string(),
                lessons_count: 16,
                price: 7000.0,
            },
        ];

        create_test_plan(&db, "Basic", 8, 3500.0).await?;
        assert_eq!(seed_subscription_types(&db, &plans).await?, 1);
        assert_eq!(seed_subscription_types(&db, &plans).await?, 0);

        let all = list_subscription_types(&db).await?;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].price, 3500.0);
        Ok(())
    }
}
