//! Calendar helpers for the schedule views.
//!
//! `month_grid` lists a month's days and chunks them into 7-day "weeks" that
//! start on the 1st of the month, with no padding on either side. Views that
//! need Monday-aligned rows use [`MonthGrid::aligned_rows`].

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

/// A calendar month
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct YearMonth {
    pub year: i32,
    /// Always in `1..=12`
    pub month: u32,
}

impl YearMonth {
    /// Carries month overflow into the year, so `(2024, 0)` is December 2023
    /// and `(2024, 13)` is January 2025.
    #[must_use]
    pub fn normalized(year: i32, month: i32) -> Self {
        let zero_based = month - 1;
        let year = year + zero_based.div_euclid(12);
        #[allow(clippy::cast_sign_loss)] // rem_euclid(12) is always in 0..12
        let month = zero_based.rem_euclid(12) as u32 + 1;
        Self { year, month }
    }

    /// Month containing `date`
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    #[must_use]
    pub const fn prev(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    #[must_use]
    pub const fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The 1st of the month, `None` outside chrono's supported years.
    #[must_use]
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Number of days in the month.
    #[must_use]
    pub fn days_in_month(self) -> Option<u32> {
        let first = self.first_day()?;
        let next_first = self.next().first_day()?;
        u32::try_from(next_first.signed_duration_since(first).num_days()).ok()
    }
}

/// Days of one month, plus navigation to its neighbours
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    /// Every date of the month in order
    pub days: Vec<NaiveDate>,
    /// `days` in chunks of 7 starting at day 1; the last chunk may be short
    pub weeks: Vec<Vec<NaiveDate>>,
    pub prev: YearMonth,
    pub next: YearMonth,
}

impl MonthGrid {
    /// Monday-first rows of seven cells, `None` for cells outside the month.
    #[must_use]
    pub fn aligned_rows(&self) -> Vec<[Option<NaiveDate>; 7]> {
        let Some(first) = self.days.first() else {
            return Vec::new();
        };
        let lead = first.weekday().num_days_from_monday() as usize;

        let cells: Vec<Option<NaiveDate>> = std::iter::repeat_n(None, lead)
            .chain(self.days.iter().copied().map(Some))
            .collect();

        cells
            .chunks(7)
            .map(|chunk| {
                let mut row = [None; 7];
                row[..chunk.len()].copy_from_slice(chunk);
                row
            })
            .collect()
    }

    /// The month this grid shows.
    #[must_use]
    pub const fn year_month(&self) -> YearMonth {
        YearMonth {
            year: self.year,
            month: self.month,
        }
    }
}

/// Builds the grid for a month after normalising `month` into `1..=12`.
///
/// Returns `None` only for years chrono cannot represent.
#[must_use]
pub fn month_grid(year: i32, month: i32) -> Option<MonthGrid> {
    let ym = YearMonth::normalized(year, month);
    let first = ym.first_day()?;
    let len = ym.days_in_month()?;

    let days: Vec<NaiveDate> = (0..len)
        .map(|offset| first + Duration::days(i64::from(offset)))
        .collect();
    let weeks = days.chunks(7).map(<[NaiveDate]>::to_vec).collect();

    Some(MonthGrid {
        year: ym.year,
        month: ym.month,
        days,
        weeks,
        prev: ym.prev(),
        next: ym.next(),
    })
}

/// Monday of the week containing `date`.
#[must_use]
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Seven consecutive dates beginning at `start`.
#[must_use]
pub fn week_days(start: NaiveDate) -> Vec<NaiveDate> {
    (0..7).map(|offset| start + Duration::days(offset)).collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_normalize_carries_into_year() {
        assert_eq!(
            YearMonth::normalized(2024, 0),
            YearMonth {
                year: 2023,
                month: 12
            }
        );
        assert_eq!(
            YearMonth::normalized(2024, 13),
            YearMonth {
                year: 2025,
                month: 1
            }
        );
        assert_eq!(
            YearMonth::normalized(2024, -12),
            YearMonth {
                year: 2022,
                month: 12
            }
        );
        assert_eq!(
            YearMonth::normalized(2024, 8),
            YearMonth {
                year: 2024,
                month: 8
            }
        );
    }

    #[test]
    fn test_day_count_matches_month_length() {
        let cases = [
            (2024, 2, 29),
            (2023, 2, 28),
            (2024, 4, 30),
            (2024, 8, 31),
            (2024, 12, 31),
        ];
        for (year, month, len) in cases {
            let grid = month_grid(year, month).unwrap();
            assert_eq!(grid.days.len(), len, "{year}-{month}");
            assert_eq!(grid.days[0], date(year, month as u32, 1));
        }
    }

    #[test]
    fn test_weeks_start_on_first_and_last_week_is_short() {
        let grid = month_grid(2024, 8).unwrap();
        assert_eq!(grid.weeks.len(), 5);
        assert_eq!(grid.weeks[0][0], date(2024, 8, 1));
        assert_eq!(grid.weeks[2][5], date(2024, 8, 20));
        assert_eq!(grid.weeks[3][1], date(2024, 8, 23));
        assert_eq!(grid.weeks[4], vec![date(2024, 8, 29), date(2024, 8, 30), date(2024, 8, 31)]);

        let february = month_grid(2026, 2).unwrap();
        assert_eq!(february.weeks.len(), 4);
        assert!(february.weeks.iter().all(|w| w.len() == 7));
    }

    #[test]
    fn test_neighbours_roll_over_year() {
        let january = month_grid(2025, 1).unwrap();
        assert_eq!(january.prev, YearMonth { year: 2024, month: 12 });
        assert_eq!(january.next, YearMonth { year: 2025, month: 2 });

        let december = month_grid(2024, 12).unwrap();
        assert_eq!(december.next, YearMonth { year: 2025, month: 1 });
    }

    #[test]
    fn test_aligned_rows_are_monday_first() {
        let grid = month_grid(2024, 8).unwrap();
        let rows = grid.aligned_rows();

        // 1 August 2024 is a Thursday
        assert_eq!(rows[0][..3], [None, None, None]);
        assert_eq!(rows[0][3], Some(date(2024, 8, 1)));
        assert_eq!(rows[3][1], Some(date(2024, 8, 20)));
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[4][5], Some(date(2024, 8, 31)));
        assert_eq!(rows[4][6], None);
    }

    #[test]
    fn test_week_start_is_monday() {
        assert_eq!(week_start(date(2024, 8, 20)), date(2024, 8, 19));
        assert_eq!(week_start(date(2024, 8, 19)), date(2024, 8, 19));
        assert_eq!(week_start(date(2024, 8, 25)), date(2024, 8, 19));

        let days = week_days(date(2024, 12, 30));
        assert_eq!(days.len(), 7);
        assert_eq!(days[6], date(2025, 1, 5));
    }
}
