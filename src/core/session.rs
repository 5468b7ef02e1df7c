//! Training sessions and their participants.

use crate::{
    core::{calendar::YearMonth, timeslots::SessionWithParticipants},
    entities::{
        Child, SessionParticipant, TrainingSession, child, session_participant, training_session,
    },
    errors::{Error, FieldErrors, Result},
};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use sea_orm::{ConnectionTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, instrument};

/// Longest accepted notes text
pub const MAX_NOTES_LEN: usize = 255;

/// Accepted `start` formats, tried in order
const START_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Parses a session start such as `2024-08-20T18:00`.
#[must_use]
pub fn parse_start(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    START_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Validated session fields
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionInput {
    pub start: NaiveDateTime,
    pub duration_minutes: i32,
    pub participant_ids: Vec<i64>,
    pub notes: String,
}

impl SessionInput {
    fn check_fields(&self, errors: &mut FieldErrors) {
        if self.duration_minutes < 1 {
            errors.add("duration_minutes", "Duration must be at least one minute.");
        }
        if self.notes.chars().count() > MAX_NOTES_LEN {
            errors.add(
                "notes",
                format!("Ensure this value has at most {MAX_NOTES_LEN} characters."),
            );
        }
    }

    /// Participant ids without duplicates, in ascending order
    fn unique_participants(&self) -> Vec<i64> {
        self.participant_ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

async fn validate<C>(db: &C, input: &SessionInput) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut errors = FieldErrors::new();
    input.check_fields(&mut errors);

    let wanted = input.unique_participants();
    if !wanted.is_empty() {
        let found = Child::find()
            .filter(child::Column::Id.is_in(wanted.iter().copied()))
            .count(db)
            .await?;
        if usize::try_from(found).ok() != Some(wanted.len()) {
            errors.add("participants", "Select valid students.");
        }
    }

    errors.into_result()
}

/// Weekly repeats of `start` that stay inside its calendar month, `start`
/// included.
#[must_use]
pub fn weekly_in_month(start: NaiveDateTime) -> Vec<NaiveDateTime> {
    let month = start.month();
    std::iter::successors(Some(start), |current| Some(*current + Duration::days(7)))
        .take_while(|current| current.month() == month)
        .collect()
}

async fn replace_participants<C>(db: &C, session_id: i64, child_ids: &[i64]) -> Result<()>
where
    C: ConnectionTrait,
{
    SessionParticipant::delete_many()
        .filter(session_participant::Column::SessionId.eq(session_id))
        .exec(db)
        .await?;
    if child_ids.is_empty() {
        return Ok(());
    }
    let rows = child_ids
        .iter()
        .map(|child_id| session_participant::ActiveModel {
            session_id: Set(session_id),
            child_id: Set(*child_id),
        });
    SessionParticipant::insert_many(rows)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

async fn insert_session<C>(
    db: &C,
    start: NaiveDateTime,
    input: &SessionInput,
    participants: &[i64],
) -> Result<training_session::Model>
where
    C: ConnectionTrait,
{
    let session = training_session::ActiveModel {
        start: Set(start),
        duration_minutes: Set(input.duration_minutes),
        notes: Set(input.notes.trim().to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    replace_participants(db, session.id, participants).await?;
    Ok(session)
}

/// Creates a session. With `fill_month`, also creates a copy with the same
/// participants every 7 days until the month ends.
///
/// Returns the created sessions in chronological order.
#[instrument(skip(db))]
pub async fn create_session(
    db: &DatabaseConnection,
    input: &SessionInput,
    fill_month: bool,
) -> Result<Vec<training_session::Model>> {
    validate(db, input).await?;
    let participants = input.unique_participants();
    let starts = if fill_month {
        weekly_in_month(input.start)
    } else {
        vec![input.start]
    };

    let txn = db.begin().await?;
    let mut created = Vec::with_capacity(starts.len());
    for start in starts {
        created.push(insert_session(&txn, start, input, &participants).await?);
    }
    txn.commit().await?;

    info!(
        "Created {} session(s) starting {}",
        created.len(),
        input.start
    );
    Ok(created)
}

pub async fn get_session(db: &DatabaseConnection, id: i64) -> Result<SessionWithParticipants> {
    let session = TrainingSession::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::SessionNotFound { id })?;
    let mut loaded = attach_participants(db, vec![session]).await?;
    loaded.pop().ok_or(Error::SessionNotFound { id })
}

/// Replaces a session's fields and participants.
#[instrument(skip(db))]
pub async fn update_session(
    db: &DatabaseConnection,
    id: i64,
    input: &SessionInput,
) -> Result<training_session::Model> {
    let session = TrainingSession::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::SessionNotFound { id })?;
    validate(db, input).await?;

    let txn = db.begin().await?;
    let mut active: training_session::ActiveModel = session.into();
    active.start = Set(input.start);
    active.duration_minutes = Set(input.duration_minutes);
    active.notes = Set(input.notes.trim().to_string());
    let updated = active.update(&txn).await?;
    replace_participants(&txn, id, &input.unique_participants()).await?;
    txn.commit().await?;

    info!("Updated session {}", id);
    Ok(updated)
}

#[instrument(skip(db))]
pub async fn delete_session(db: &DatabaseConnection, id: i64) -> Result<training_session::Model> {
    let session = TrainingSession::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::SessionNotFound { id })?;

    let txn = db.begin().await?;
    SessionParticipant::delete_many()
        .filter(session_participant::Column::SessionId.eq(id))
        .exec(&txn)
        .await?;
    TrainingSession::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    info!("Deleted session {}", id);
    Ok(session)
}

/// Adds one student to a session; adding a present student changes nothing.
#[instrument(skip(db))]
pub async fn add_participant(
    db: &DatabaseConnection,
    session_id: i64,
    child_id: i64,
) -> Result<(training_session::Model, child::Model)> {
    let session = TrainingSession::find_by_id(session_id)
        .one(db)
        .await?
        .ok_or(Error::SessionNotFound { id: session_id })?;
    let child = Child::find_by_id(child_id)
        .one(db)
        .await?
        .ok_or(Error::ChildNotFound { id: child_id })?;

    let present = SessionParticipant::find_by_id((session_id, child_id))
        .one(db)
        .await?
        .is_some();
    if present {
        debug!("Child {} already in session {}", child_id, session_id);
    } else {
        SessionParticipant::insert(session_participant::ActiveModel {
            session_id: Set(session_id),
            child_id: Set(child_id),
        })
        .exec_without_returning(db)
        .await?;
        info!("Added child {} to session {}", child_id, session_id);
    }
    Ok((session, child))
}

/// Loads participants for the given sessions, keeping the session order.
/// Participants are ordered by first then last name.
async fn attach_participants(
    db: &DatabaseConnection,
    sessions: Vec<training_session::Model>,
) -> Result<Vec<SessionWithParticipants>> {
    let ids: Vec<i64> = sessions.iter().map(|s| s.id).collect();
    let mut by_session: HashMap<i64, Vec<child::Model>> = HashMap::new();
    if !ids.is_empty() {
        let rows = SessionParticipant::find()
            .filter(session_participant::Column::SessionId.is_in(ids))
            .find_also_related(Child)
            .all(db)
            .await?;
        for (link, kid) in rows {
            if let Some(kid) = kid {
                by_session.entry(link.session_id).or_default().push(kid);
            }
        }
    }

    Ok(sessions
        .into_iter()
        .map(|session| {
            let mut participants = by_session.remove(&session.id).unwrap_or_default();
            participants.sort_by(|a, b| {
                (&a.first_name, &a.last_name, a.id).cmp(&(&b.first_name, &b.last_name, b.id))
            });
            SessionWithParticipants::new(session, participants)
        })
        .collect())
}

/// Sessions starting on or after `from` and before `until`, by start time.
pub async fn sessions_between(
    db: &DatabaseConnection,
    from: NaiveDate,
    until: NaiveDate,
) -> Result<Vec<SessionWithParticipants>> {
    let sessions = TrainingSession::find()
        .filter(training_session::Column::Start.gte(from.and_time(chrono::NaiveTime::MIN)))
        .filter(training_session::Column::Start.lt(until.and_time(chrono::NaiveTime::MIN)))
        .order_by_asc(training_session::Column::Start)
        .order_by_asc(training_session::Column::Id)
        .all(db)
        .await?;
    attach_participants(db, sessions).await
}

/// Sessions starting within a calendar month.
pub async fn sessions_in_month(
    db: &DatabaseConnection,
    month: YearMonth,
) -> Result<Vec<SessionWithParticipants>> {
    let (Some(first), Some(next_first)) = (month.first_day(), month.next().first_day()) else {
        return Ok(Vec::new());
    };
    sessions_between(db, first, next_first).await
}

/// Sessions any of the given students attend, each once, by start time.
pub async fn sessions_for_children(
    db: &DatabaseConnection,
    child_ids: &[i64],
) -> Result<Vec<SessionWithParticipants>> {
    if child_ids.is_empty() {
        return Ok(Vec::new());
    }

    let session_ids: BTreeSet<i64> = SessionParticipant::find()
        .filter(session_participant::Column::ChildId.is_in(child_ids.iter().copied()))
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.session_id)
        .collect();
    if session_ids.is_empty() {
        return Ok(Vec::new());
    }

    let sessions = TrainingSession::find()
        .filter(training_session::Column::Id.is_in(session_ids))
        .order_by_asc(training_session::Column::Start)
        .order_by_asc(training_session::Column::Id)
        .all(db)
        .await?;
    attach_participants(db, sessions).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn input(start: NaiveDateTime, participants: Vec<i64>) -> SessionInput {
        SessionInput {
            start,
            duration_minutes: 60,
            participant_ids: participants,
            notes: String::new(),
        }
    }

    #[test]
    fn test_parse_start_formats() {
        assert_eq!(parse_start("2024-08-20T18:00"), Some(at(2024, 8, 20, 18)));
        assert_eq!(parse_start(" 2024-08-20 18:00:00 "), Some(at(2024, 8, 20, 18)));
        assert_eq!(parse_start("20.08.2024 18:00"), None);
        assert_eq!(parse_start(""), None);
    }

    #[test]
    fn test_weekly_repeats_stay_in_month() {
        let starts = weekly_in_month(at(2024, 8, 6, 18));
        assert_eq!(
            starts,
            vec![
                at(2024, 8, 6, 18),
                at(2024, 8, 13, 18),
                at(2024, 8, 20, 18),
                at(2024, 8, 27, 18),
            ]
        );

        assert_eq!(weekly_in_month(at(2024, 8, 29, 18)).len(), 1);
        assert_eq!(weekly_in_month(at(2024, 12, 31, 9)).len(), 1);
    }

    #[tokio::test]
    async fn test_zero_duration_rejected_before_query() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let mut bad = input(at(2024, 8, 20, 18), vec![]);
        bad.duration_minutes = 0;
        let Err(Error::Validation(errors)) = create_session(&db, &bad, false).await else {
            panic!("expected validation error");
        };
        assert!(errors.get("duration_minutes").is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_fill_month_copies_participants() -> Result<()> {
        let db = setup_test_db().await?;
        let anna = create_test_child(&db, "Anna", None).await?;
        let boris = create_test_child(&db, "Boris", None).await?;

        let created = create_session(
            &db,
            &input(at(2024, 8, 6, 18), vec![boris.id, anna.id, anna.id]),
            true,
        )
        .await?;
        assert_eq!(created.len(), 4);

        let month = sessions_in_month(&db, YearMonth { year: 2024, month: 8 }).await?;
        assert_eq!(month.len(), 4);
        for entry in &month {
            let names: Vec<&str> = entry
                .participants
                .iter()
                .map(|c| c.first_name.as_str())
                .collect();
            assert_eq!(names, vec!["Anna", "Boris"]);
        }
        assert!(sessions_in_month(&db, YearMonth { year: 2024, month: 9 }).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_participant_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_session(&db, &input(at(2024, 8, 6, 18), vec![42]), false).await;
        let Err(Error::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert!(errors.get("participants").is_some());
        assert!(TrainingSession::find().all(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_replaces_participants() -> Result<()> {
        let db = setup_test_db().await?;
        let anna = create_test_child(&db, "Anna", None).await?;
        let boris = create_test_child(&db, "Boris", None).await?;
        let session = create_test_session(&db, &[anna.id]).await?;

        let mut edit = input(at(2024, 9, 3, 10), vec![boris.id]);
        edit.duration_minutes = 90;
        let updated = update_session(&db, session.id, &edit).await?;
        assert_eq!(updated.start, at(2024, 9, 3, 10));
        assert_eq!(updated.duration_minutes, 90);

        let loaded = get_session(&db, session.id).await?;
        assert_eq!(loaded.participants.len(), 1);
        assert_eq!(loaded.participants[0].id, boris.id);
        assert_eq!(loaded.end, at(2024, 9, 3, 11) + Duration::minutes(30));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_participant_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let anna = create_test_child(&db, "Anna", None).await?;
        let session = create_test_session(&db, &[]).await?;

        add_participant(&db, session.id, anna.id).await?;
        add_participant(&db, session.id, anna.id).await?;
        assert_eq!(get_session(&db, session.id).await?.participants.len(), 1);

        assert!(matches!(
            add_participant(&db, session.id, 999).await,
            Err(Error::ChildNotFound { id: 999 })
        ));
        assert!(matches!(
            add_participant(&db, 999, anna.id).await,
            Err(Error::SessionNotFound { id: 999 })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_session_removes_links() -> Result<()> {
        let db = setup_test_db().await?;
        let anna = create_test_child(&db, "Anna", None).await?;
        let session = create_test_session(&db, &[anna.id]).await?;

        delete_session(&db, session.id).await?;
        assert!(SessionParticipant::find().all(&db).await?.is_empty());
        assert!(Child::find_by_id(anna.id).one(&db).await?.is_some());
        assert!(matches!(
            delete_session(&db, session.id).await,
            Err(Error::SessionNotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_sessions_for_children_are_distinct_and_ordered() -> Result<()> {
        let db = setup_test_db().await?;
        let anna = create_test_child(&db, "Anna", None).await?;
        let boris = create_test_child(&db, "Boris", None).await?;
        let vera = create_test_child(&db, "Vera", None).await?;

        let later = create_session(&db, &input(at(2024, 8, 22, 18), vec![anna.id]), false).await?;
        let shared = create_session(
            &db,
            &input(at(2024, 8, 20, 18), vec![anna.id, boris.id]),
            false,
        )
        .await?;
        create_session(&db, &input(at(2024, 8, 21, 18), vec![vera.id]), false).await?;

        let found = sessions_for_children(&db, &[anna.id, boris.id]).await?;
        let ids: Vec<i64> = found.iter().map(|s| s.session.id).collect();
        assert_eq!(ids, vec![shared[0].id, later[0].id]);
        assert!(sessions_for_children(&db, &[]).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_sessions_between_bounds() -> Result<()> {
        let db = setup_test_db().await?;
        create_session(&db, &input(at(2024, 8, 19, 0), vec![]), false).await?;
        create_session(&db, &input(at(2024, 8, 25, 23), vec![]), false).await?;
        create_session(&db, &input(at(2024, 8, 26, 0), vec![]), false).await?;

        let monday = NaiveDate::from_ymd_opt(2024, 8, 19).unwrap();
        let week = sessions_between(&db, monday, monday + Duration::days(7)).await?;
        assert_eq!(week.len(), 2);
        Ok(())
    }
}
