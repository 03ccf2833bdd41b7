use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Display status of a grant relative to a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    Inactive,
    Expired,
    ActiveToday,
    ActiveNotToday,
    Scheduled,
}

/// Set of weekdays, numbered 0 = Sunday through 6 = Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaysOfWeek(u8);

impl DaysOfWeek {
    const ALL_BITS: u8 = 0b0111_1111;

    pub fn all() -> Self {
        Self(Self::ALL_BITS)
    }

    pub fn none() -> Self {
        Self(0)
    }

    /// Builds a set from request input. Out-of-range numbers are rejected.
    pub fn from_numbers(days: &[i32]) -> Result<Self, AppError> {
        let mut bits = 0u8;
        for &day in days {
            if !(0..=6).contains(&day) {
                return Err(AppError::Validation(format!(
                    "Invalid day of week {} (expected 0 = Sunday through 6 = Saturday)",
                    day
                )));
            }
            bits |= 1u8 << day;
        }
        Ok(Self(bits))
    }

    /// Interprets a stored column: NULL means every day, an empty array
    /// means no day, and stray values are ignored.
    pub fn from_stored(days: Option<&[i32]>) -> Self {
        match days {
            None => Self::all(),
            Some(days) => Self(
                days.iter()
                    .filter(|d| (0..=6).contains(*d))
                    .fold(0u8, |bits, d| bits | (1u8 << *d)),
            ),
        }
    }

    pub fn to_numbers(self) -> Vec<i32> {
        (0..7i32).filter(|d| self.0 & (1u8 << *d) != 0).collect()
    }

    pub fn contains_weekday(self, weekday: u32) -> bool {
        weekday < 7 && self.0 & (1u8 << weekday) != 0
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        self.contains_weekday(weekday_number(date))
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for DaysOfWeek {
    fn default() -> Self {
        Self::all()
    }
}

/// The evaluated fields of a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub allowed_days: DaysOfWeek,
    pub is_active: bool,
}

/// Parses a `YYYY-MM-DD` calendar date without any timezone conversion.
pub fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    let invalid =
        || AppError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", value));

    // chrono alone accepts unpadded fields and signed years
    let trimmed = value.trim();
    let well_formed = trimmed.len() == 10
        && trimmed.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| invalid())
}

/// The caller's local wall-clock date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// 0 = Sunday .. 6 = Saturday.
pub fn weekday_number(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_sunday()
}

pub fn is_expired(end_date: NaiveDate, today: NaiveDate) -> bool {
    end_date < today
}

pub fn is_within_range(start_date: NaiveDate, end_date: NaiveDate, today: NaiveDate) -> bool {
    start_date <= today && today <= end_date
}

pub fn is_exercisable_today(
    start_date: NaiveDate,
    end_date: NaiveDate,
    allowed_days: DaysOfWeek,
    today: NaiveDate,
) -> bool {
    is_within_range(start_date, end_date, today) && allowed_days.contains(today)
}

impl AuthorizationWindow {
    /// Active flag, date range and weekday all pass on `day`.
    pub fn is_exercisable_on(&self, day: NaiveDate) -> bool {
        self.is_active && is_exercisable_today(self.start_date, self.end_date, self.allowed_days, day)
    }

    pub fn status_on(&self, today: NaiveDate) -> AuthorizationStatus {
        status_of(self, today)
    }
}

pub fn status_of(window: &AuthorizationWindow, today: NaiveDate) -> AuthorizationStatus {
    if !window.is_active {
        return AuthorizationStatus::Inactive;
    }
    if is_expired(window.end_date, today) {
        return AuthorizationStatus::Expired;
    }

    let in_range = is_within_range(window.start_date, window.end_date, today);
    if in_range
        && is_exercisable_today(window.start_date, window.end_date, window.allowed_days, today)
    {
        AuthorizationStatus::ActiveToday
    } else if in_range {
        AuthorizationStatus::ActiveNotToday
    } else {
        AuthorizationStatus::Scheduled
    }
}

/// Rejects windows whose start falls after their end.
pub fn validate_date_order(start_date: NaiveDate, end_date: NaiveDate) -> Result<(), AppError> {
    if start_date > end_date {
        return Err(AppError::Validation(
            "Start date must be on or before end date".to_string(),
        ));
    }
    Ok(())
}
