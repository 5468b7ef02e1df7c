//! Subscription balance logic.
//!
//! A balance is in one of three steady states: lessons left and paid, lessons
//! left and unpaid, or exhausted (zero left, always unpaid). Visits move a
//! balance towards exhaustion; payment resets it to the plan's full count.
//!
//! The pure transitions operate on entity models. The async functions apply
//! them to the database.

use crate::{
    entities::{
        Account, Child, Subscription, SubscriptionType, account, child, subscription,
        subscription_type,
    },
    errors::{Error, FieldErrors, Result},
};
use sea_orm::{
    ConnectionTrait, QueryOrder, Set, TransactionTrait,
    prelude::*,
    sea_query::{Expr, SimpleExpr},
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, instrument, warn};

/// Steady state of a balance
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceState {
    /// Lessons left, paid
    Active,
    /// Lessons left, not yet paid
    AwaitingPayment,
    /// No lessons left
    Exhausted,
}

/// Classifies a subscription.
#[must_use]
pub const fn balance_state(sub: &subscription::Model) -> BalanceState {
    if sub.lessons_remaining <= 0 {
        BalanceState::Exhausted
    } else if sub.paid {
        BalanceState::Active
    } else {
        BalanceState::AwaitingPayment
    }
}

/// Result of recording a visit
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VisitOutcome {
    /// One lesson was deducted
    Recorded {
        /// Lessons left afterwards
        remaining: i32,
    },
    /// The child has no subscription or no lessons left; nothing changed
    NoVisitAvailable,
}

/// Result of marking a payment
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Balance reset to the plan's full count
    Reset {
        /// Lessons available after payment
        remaining: i32,
    },
    /// The child has no subscription
    NoSubscription,
}

/// Plan choice submitted by an administrator when issuing or changing a subscription
#[derive(Clone, Debug, PartialEq)]
pub struct PlanChoice {
    pub sub_type_id: i64,
    /// Overrides the plan's price when present
    pub price: Option<f64>,
    pub mark_paid: bool,
}

impl PlanChoice {
    fn validate(&self) -> Result<()> {
        let mut errors = FieldErrors::new();
        if self
            .price
            .is_some_and(|price| !price.is_finite() || price < 0.0)
        {
            errors.add("price", "Price must be a non-negative number.");
        }
        errors.into_result()
    }
}

/// A subscription with its plan, as shown in listings
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub subscription: subscription::Model,
    pub plan: subscription_type::Model,
    pub total_lessons: i32,
    pub used_lessons: i32,
    pub state: BalanceState,
}

impl SubscriptionView {
    #[must_use]
    pub fn new(subscription: subscription::Model, plan: subscription_type::Model) -> Self {
        let total_lessons = plan.lessons_count;
        Self {
            used_lessons: (total_lessons - subscription.lessons_remaining).max(0),
            total_lessons,
            state: balance_state(&subscription),
            subscription,
            plan,
        }
    }
}

/// A row of the subscriptions listing
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubscriptionRow {
    #[serde(flatten)]
    pub view: SubscriptionView,
    pub child: child::Model,
    pub parent: Option<account::Model>,
}

/// Deducts one lesson. Returns false, leaving the model untouched, when none are left.
pub fn record_visit(sub: &mut subscription::Model) -> bool {
    if sub.lessons_remaining <= 0 {
        return false;
    }
    sub.lessons_remaining -= 1;
    if sub.lessons_remaining == 0 {
        sub.paid = false;
    }
    true
}

/// Marks the balance paid and restores the plan's full lesson count and price.
pub fn mark_paid_and_reset(sub: &mut subscription::Model, plan: &subscription_type::Model) {
    sub.paid = true;
    sub.lessons_remaining = plan.lessons_count;
    sub.price = plan.price;
}

/// Replaces the plan of an existing balance.
///
/// Paying resets the balance to the new plan's full count; otherwise the
/// remaining lessons are clamped to it.
pub fn change_plan(
    sub: &mut subscription::Model,
    plan: &subscription_type::Model,
    price: Option<f64>,
    mark_paid: bool,
) {
    sub.sub_type_id = plan.id;
    sub.price = price.unwrap_or(plan.price);
    if mark_paid {
        sub.paid = true;
        sub.lessons_remaining = plan.lessons_count;
    } else if sub.lessons_remaining > plan.lessons_count {
        sub.lessons_remaining = plan.lessons_count;
    }
}

fn into_active(sub: subscription::Model) -> subscription::ActiveModel {
    let mut active: subscription::ActiveModel = sub.clone().into();
    active.sub_type_id = Set(sub.sub_type_id);
    active.lessons_remaining = Set(sub.lessons_remaining);
    active.price = Set(sub.price);
    active.paid = Set(sub.paid);
    active
}

/// Finds the subscription of a child.
pub async fn get_subscription_for_child<C>(
    db: &C,
    child_id: i64,
) -> Result<Option<subscription::Model>>
where
    C: ConnectionTrait,
{
    Subscription::find()
        .filter(subscription::Column::ChildId.eq(child_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds the subscription of a child together with its plan.
pub async fn get_subscription_view<C>(db: &C, child_id: i64) -> Result<Option<SubscriptionView>>
where
    C: ConnectionTrait,
{
    let found = Subscription::find()
        .filter(subscription::Column::ChildId.eq(child_id))
        .find_also_related(SubscriptionType)
        .one(db)
        .await?;

    Ok(found.and_then(|(sub, plan)| plan.map(|plan| SubscriptionView::new(sub, plan))))
}

async fn require_child<C>(db: &C, child_id: i64) -> Result<child::Model>
where
    C: ConnectionTrait,
{
    Child::find_by_id(child_id)
        .one(db)
        .await?
        .ok_or(Error::ChildNotFound { id: child_id })
}

async fn require_plan<C>(db: &C, sub_type_id: i64) -> Result<subscription_type::Model>
where
    C: ConnectionTrait,
{
    SubscriptionType::find_by_id(sub_type_id)
        .one(db)
        .await?
        .ok_or(Error::SubscriptionTypeNotFound { id: sub_type_id })
}

/// Records one visit for a child.
///
/// The decrement is a single conditional `UPDATE`, so two concurrent visits
/// can never take the balance below zero or lose a deduction.
#[instrument(skip(db))]
pub async fn add_visit(db: &DatabaseConnection, child_id: i64) -> Result<VisitOutcome> {
    require_child(db, child_id).await?;

    let remaining_col = Expr::col(subscription::Column::LessonsRemaining);
    let paid_after: SimpleExpr = Expr::case(remaining_col.clone().eq(1), false)
        .finally(Expr::col(subscription::Column::Paid))
        .into();

    let updated = Subscription::update_many()
        .col_expr(subscription::Column::LessonsRemaining, remaining_col.sub(1))
        .col_expr(subscription::Column::Paid, paid_after)
        .filter(subscription::Column::ChildId.eq(child_id))
        .filter(subscription::Column::LessonsRemaining.gt(0))
        .exec(db)
        .await?;

    if updated.rows_affected == 0 {
        warn!("No visit available for child {}", child_id);
        return Ok(VisitOutcome::NoVisitAvailable);
    }

    let sub = get_subscription_for_child(db, child_id)
        .await?
        .ok_or(Error::SubscriptionNotFound { child_id })?;
    info!(
        "Visit recorded for child {}, {} lessons left",
        child_id, sub.lessons_remaining
    );
    Ok(VisitOutcome::Recorded {
        remaining: sub.lessons_remaining,
    })
}

/// Marks a child's subscription as paid and resets it to the full plan.
#[instrument(skip(db))]
pub async fn mark_payment(db: &DatabaseConnection, child_id: i64) -> Result<PaymentOutcome> {
    require_child(db, child_id).await?;

    let Some((mut sub, plan)) = Subscription::find()
        .filter(subscription::Column::ChildId.eq(child_id))
        .find_also_related(SubscriptionType)
        .one(db)
        .await?
        .and_then(|(sub, plan)| plan.map(|plan| (sub, plan)))
    else {
        return Ok(PaymentOutcome::NoSubscription);
    };

    mark_paid_and_reset(&mut sub, &plan);
    let saved = into_active(sub).update(db).await?;
    info!(
        "Payment marked for child {}, balance reset to {}",
        child_id, saved.lessons_remaining
    );
    Ok(PaymentOutcome::Reset {
        remaining: saved.lessons_remaining,
    })
}

/// Issues a fresh subscription, replacing any existing one.
///
/// The balance is the plan's full count when paid immediately, zero otherwise.
#[instrument(skip(db))]
pub async fn issue_subscription(
    db: &DatabaseConnection,
    child_id: i64,
    choice: &PlanChoice,
) -> Result<subscription::Model> {
    choice.validate()?;
    require_child(db, child_id).await?;
    let plan = require_plan(db, choice.sub_type_id).await?;

    let lessons_remaining = if choice.mark_paid {
        plan.lessons_count
    } else {
        0
    };
    let price = choice.price.unwrap_or(plan.price);

    let txn = db.begin().await?;
    let saved = match get_subscription_for_child(&txn, child_id).await? {
        Some(existing) => {
            let sub = subscription::Model {
                sub_type_id: plan.id,
                lessons_remaining,
                price,
                paid: choice.mark_paid,
                ..existing
            };
            into_active(sub).update(&txn).await?
        }
        None => {
            subscription::ActiveModel {
                child_id: Set(child_id),
                sub_type_id: Set(plan.id),
                lessons_remaining: Set(lessons_remaining),
                price: Set(price),
                paid: Set(choice.mark_paid),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };
    txn.commit().await?;

    info!(
        "Issued plan '{}' to child {} (paid: {})",
        plan.name, child_id, saved.paid
    );
    Ok(saved)
}

/// Changes the plan of an existing subscription.
#[instrument(skip(db))]
pub async fn change_subscription_plan(
    db: &DatabaseConnection,
    child_id: i64,
    choice: &PlanChoice,
) -> Result<subscription::Model> {
    choice.validate()?;
    require_child(db, child_id).await?;
    let mut sub = get_subscription_for_child(db, child_id)
        .await?
        .ok_or(Error::SubscriptionNotFound { child_id })?;
    let plan = require_plan(db, choice.sub_type_id).await?;

    change_plan(&mut sub, &plan, choice.price, choice.mark_paid);
    let saved = into_active(sub).update(db).await?;
    info!("Changed plan of child {} to '{}'", child_id, plan.name);
    Ok(saved)
}

/// Creates the default subscription for a child that has none.
///
/// Uses the first plan (lowest id); does nothing when no plan exists.
pub async fn ensure_subscription<C>(db: &C, child_id: i64) -> Result<Option<subscription::Model>>
where
    C: ConnectionTrait,
{
    if get_subscription_for_child(db, child_id).await?.is_some() {
        return Ok(None);
    }

    let Some(plan) = SubscriptionType::find()
        .order_by_asc(subscription_type::Column::Id)
        .one(db)
        .await?
    else {
        warn!(
            "No subscription types defined, child {} left without a subscription",
            child_id
        );
        return Ok(None);
    };

    let created = subscription::ActiveModel {
        child_id: Set(child_id),
        sub_type_id: Set(plan.id),
        lessons_remaining: Set(plan.lessons_count),
        price: Set(plan.price),
        paid: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!("Created default subscription for child {}", child_id);
    Ok(Some(created))
}

/// Subscriptions of the given children with their plans, keyed by child id.
pub async fn subscriptions_by_child(
    db: &DatabaseConnection,
    child_ids: &[i64],
) -> Result<HashMap<i64, SubscriptionView>> {
    if child_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = Subscription::find()
        .filter(subscription::Column::ChildId.is_in(child_ids.iter().copied()))
        .find_also_related(SubscriptionType)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(sub, plan)| {
            plan.map(|plan| (sub.child_id, SubscriptionView::new(sub, plan)))
        })
        .collect())
}

/// Every subscription with its child, the child's parent and the plan,
/// ordered by child name.
pub async fn list_subscriptions(db: &DatabaseConnection) -> Result<Vec<SubscriptionRow>> {
    let subs = Subscription::find()
        .find_also_related(Child)
        .all(db)
        .await?;
    let plans: HashMap<i64, subscription_type::Model> = SubscriptionType::find()
        .all(db)
        .await?
        .into_iter()
        .map(|plan| (plan.id, plan))
        .collect();
    let parent_ids: Vec<i64> = subs
        .iter()
        .filter_map(|(_, child)| child.as_ref().and_then(|c| c.parent_id))
        .collect();
    let parents: HashMap<i64, account::Model> = Account::find()
        .filter(account::Column::Id.is_in(parent_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|parent| (parent.id, parent))
        .collect();

    let mut rows: Vec<SubscriptionRow> = subs
        .into_iter()
        .filter_map(|(sub, child)| {
            let child = child?;
            let plan = plans.get(&sub.sub_type_id)?.clone();
            let parent = child.parent_id.and_then(|id| parents.get(&id).cloned());
            Some(SubscriptionRow {
                view: SubscriptionView::new(sub, plan),
                child,
                parent,
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        (&a.child.first_name, &a.child.last_name).cmp(&(&b.child.first_name, &b.child.last_name))
    });
    Ok(rows)
}
