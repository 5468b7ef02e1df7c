//! Upcoming student birthdays shown to administrators.

use crate::{
    core::child::list_children,
    entities::child,
    errors::Result,
};
use chrono::{Datelike, NaiveDate};
use sea_orm::DatabaseConnection;
use serde::Serialize;

/// A birthday falling inside the look-ahead window
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpcomingBirthday {
    pub child: child::Model,
    /// Date of the coming birthday
    pub date: NaiveDate,
    /// 0 means today
    pub days_left: i64,
    /// Age reached on `date`
    pub turning: i32,
}

/// The birthday in `year`; 29 February becomes 28 February in common years.
fn birthday_in(birth: NaiveDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, birth.month(), birth.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, birth.month(), birth.day() - 1))
}

/// Next birthday on or after `today`.
#[must_use]
pub fn next_birthday(birth: NaiveDate, today: NaiveDate) -> Option<NaiveDate> {
    let this_year = birthday_in(birth, today.year())?;
    if this_year >= today {
        Some(this_year)
    } else {
        birthday_in(birth, today.year() + 1)
    }
}

/// Students whose birthday is within `0..=window_days` of `today`, soonest
/// first, then by name.
#[must_use]
pub fn upcoming(
    children: Vec<child::Model>,
    today: NaiveDate,
    window_days: i64,
) -> Vec<UpcomingBirthday> {
    let mut found: Vec<UpcomingBirthday> = children
        .into_iter()
        .filter_map(|child| {
            let birth = child.birth_date?;
            let date = next_birthday(birth, today)?;
            let days_left = date.signed_duration_since(today).num_days();
            (days_left <= window_days).then(|| UpcomingBirthday {
                turning: date.year() - birth.year(),
                child,
                date,
                days_left,
            })
        })
        .collect();
    found.sort_by(|a, b| {
        (a.days_left, &a.child.first_name, &a.child.last_name).cmp(&(
            b.days_left,
            &b.child.first_name,
            &b.child.last_name,
        ))
    });
    found
}

/// Loads all students and returns the upcoming birthdays.
pub async fn upcoming_birthdays(
    db: &DatabaseConnection,
    today: NaiveDate,
    window_days: i64,
) -> Result<Vec<UpcomingBirthday>> {
    let children = list_children(db).await?;
    Ok(upcoming(children, today, window_days))
}
