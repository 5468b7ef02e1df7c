//! JSON request bodies and their conversion into service inputs.
//!
//! Parsing problems (a malformed date, an unknown choice) become field errors
//! here; rules that need the database are checked by the services.

use crate::{
    core::{
        account::NewAccount,
        child::{StudentInput, StudentType},
        session::{SessionInput, parse_start},
        subscription::PlanChoice,
        subscription_type::PlanInput,
    },
    entities::Gender,
    errors::{FieldErrors, Result},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const REQUIRED: &str = "This field is required.";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionForm {
    /// `YYYY-MM-DDTHH:MM`, seconds optional
    pub start: String,
    pub duration_minutes: Option<i32>,
    pub participants: Vec<i64>,
    pub notes: String,
    /// Repeat weekly until the end of the month (create only)
    pub fill_month: bool,
}

impl SessionForm {
    pub fn into_input(self, default_duration: i32) -> Result<SessionInput> {
        let Some(start) = parse_start(&self.start) else {
            let message = if self.start.trim().is_empty() {
                REQUIRED
            } else {
                "Enter a valid date/time."
            };
            return Err(FieldErrors::single("start", message).into());
        };

        Ok(SessionInput {
            start,
            duration_minutes: self.duration_minutes.unwrap_or(default_duration),
            participant_ids: self.participants,
            notes: self.notes,
        })
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentForm {
    /// `child` or `adult`
    pub student_type: String,
    pub parent: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    /// `YYYY-MM-DD` or empty
    pub birth_date: Option<String>,
    /// `M`, `F`, `U` or empty
    pub gender: Option<String>,
    pub notes: String,
    pub account_username: String,
    pub account_email: String,
}

impl StudentForm {
    pub fn into_input(self) -> Result<StudentInput> {
        let mut errors = FieldErrors::new();

        let student_type = match self.student_type.trim() {
            "child" | "" => StudentType::Child,
            "adult" => StudentType::Adult,
            _ => {
                errors.add("student_type", "Select a valid choice.");
                StudentType::Child
            }
        };

        let birth_date = match self.birth_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok();
                if parsed.is_none() {
                    errors.add("birth_date", "Enter a valid date.");
                }
                parsed
            }
        };

        let gender = match self.gender.as_deref().map(str::trim) {
            None | Some("" | "U") => Gender::Unspecified,
            Some("M") => Gender::Male,
            Some("F") => Gender::Female,
            Some(_) => {
                errors.add("gender", "Select a valid choice.");
                Gender::Unspecified
            }
        };

        errors.into_result()?;
        Ok(StudentInput {
            student_type,
            parent_id: self.parent,
            first_name: self.first_name,
            last_name: self.last_name,
            birth_date,
            gender,
            notes: self.notes,
            account_username: self.account_username,
            account_email: self.account_email,
        })
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanForm {
    pub name: String,
    pub lessons_count: Option<i32>,
    pub price: Option<f64>,
}

impl PlanForm {
    pub fn into_input(self) -> Result<PlanInput> {
        let mut errors = FieldErrors::new();
        if self.lessons_count.is_none() {
            errors.add("lessons_count", REQUIRED);
        }
        if self.price.is_none() {
            errors.add("price", REQUIRED);
        }
        errors.into_result()?;

        Ok(PlanInput {
            name: self.name,
            lessons_count: self.lessons_count.unwrap_or_default(),
            price: self.price.unwrap_or_default(),
        })
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueForm {
    pub sub_type: Option<i64>,
    pub price: Option<f64>,
    pub mark_paid: bool,
}

impl IssueForm {
    pub fn into_choice(self) -> Result<PlanChoice> {
        let Some(sub_type_id) = self.sub_type else {
            return Err(FieldErrors::single("sub_type", REQUIRED).into());
        };
        Ok(PlanChoice {
            sub_type_id,
            price: self.price,
            mark_paid: self.mark_paid,
        })
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParentForm {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<ParentForm> for NewAccount {
    fn from(form: ParentForm) -> Self {
        Self {
            username: form.username,
            email: form.email,
            first_name: form.first_name,
            last_name: form.last_name,
            is_staff: false,
        }
    }
}

/// Body of the visit and payment actions
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChildAction {
    pub child_id: Option<i64>,
}
