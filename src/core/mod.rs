//! Framework-agnostic studio logic: students, accounts, subscriptions,
//! sessions and the schedule helpers built on them.

pub mod account;
pub mod birthdays;
pub mod calendar;
pub mod child;
pub mod roles;
pub mod session;
pub mod subscription;
pub mod subscription_type;
pub mod timeslots;
