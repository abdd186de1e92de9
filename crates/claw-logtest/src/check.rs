//! Pure entry predicates.
//!
//! A [`Checker`] inspects an [`Entry`] and either accepts it or explains,
//! with a [`FieldError`], why it does not. Checkers never see a mutable view
//! of the entry, so evaluating them in any order or any number of times has
//! no effect on what they observe.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeDelta};
use serde_json::{Map, Value};

use crate::config::Level;
use crate::entry::Entry;
use crate::error::{FieldError, FieldErrorKind};
use crate::field;

type CheckFn = dyn Fn(&Entry) -> Result<(), FieldError> + Send + Sync;

/// A pure predicate over a log entry.
#[derive(Clone)]
pub struct Checker {
    name: &'static str,
    check: Arc<CheckFn>,
}

fn value_error(field: &str, want: impl fmt::Display, have: impl fmt::Display) -> FieldError {
    FieldError::new(FieldErrorKind::Value, field).want_have(want, have)
}

fn contain_error(field: &str, want: &str, have: &str) -> FieldError {
    FieldError::new(FieldErrorKind::Value, field)
        .with("reason", "expected field value to contain")
        .want_have(want, have)
}

impl Checker {
    /// Wraps an arbitrary predicate.
    pub fn from_fn<F>(check: F) -> Self
    where
        F: Fn(&Entry) -> Result<(), FieldError> + Send + Sync + 'static,
    {
        Self::named("custom", check)
    }

    fn named<F>(name: &'static str, check: F) -> Self
    where
        F: Fn(&Entry) -> Result<(), FieldError> + Send + Sync + 'static,
    {
        Self {
            name,
            check: Arc::new(check),
        }
    }

    /// Evaluates the predicate.
    ///
    /// # Errors
    ///
    /// Returns the reason the entry does not satisfy the predicate.
    pub fn check(&self, entry: &Entry) -> Result<(), FieldError> {
        (self.check)(entry)
    }

    /// Returns true if the entry satisfies the predicate.
    #[must_use]
    pub fn matches(&self, entry: &Entry) -> bool {
        self.check(entry).is_ok()
    }

    /// Field is a boolean equal to `want`.
    #[must_use]
    pub fn bool(field: &str, want: bool) -> Self {
        let field = field.to_string();
        Self::named("bool", move |ent| {
            let have = field::has_bool(ent, &field)?;
            if have == want {
                Ok(())
            } else {
                Err(value_error(&field, want, have))
            }
        })
    }

    /// Field is a string equal to `want`.
    #[must_use]
    pub fn str(field: &str, want: &str) -> Self {
        let field = field.to_string();
        let want = want.to_string();
        Self::named("str", move |ent| {
            let have = field::has_str(ent, &field)?;
            if have == want {
                Ok(())
            } else {
                Err(value_error(&field, &want, have))
            }
        })
    }

    /// Field is a string equal to the error's message.
    #[must_use]
    pub fn str_err(field: &str, want: &dyn std::error::Error) -> Self {
        Self::str(field, &want.to_string())
    }

    /// Field is a string containing `want`.
    #[must_use]
    pub fn contain(field: &str, want: &str) -> Self {
        let field = field.to_string();
        let want = want.to_string();
        Self::named("contain", move |ent| {
            let have = field::has_str(ent, &field)?;
            if have.contains(want.as_str()) {
                Ok(())
            } else {
                Err(contain_error(&field, &want, have))
            }
        })
    }

    /// Message field equals `want`.
    #[must_use]
    pub fn msg(want: &str) -> Self {
        let want = want.to_string();
        Self::named("msg", move |ent| {
            let name = &ent.config().message_field;
            let have = field::has_str(ent, name)?;
            if have == want {
                Ok(())
            } else {
                Err(value_error(name, &want, have))
            }
        })
    }

    /// Message field contains `want`.
    #[must_use]
    pub fn msg_contain(want: &str) -> Self {
        let want = want.to_string();
        Self::named("msg_contain", move |ent| {
            let name = &ent.config().message_field;
            let have = field::has_str(ent, name)?;
            if have.contains(want.as_str()) {
                Ok(())
            } else {
                Err(contain_error(name, &want, have))
            }
        })
    }

    /// Error field equals `want`.
    #[must_use]
    pub fn error(want: &str) -> Self {
        let want = want.to_string();
        Self::named("error", move |ent| {
            let name = &ent.config().error_field;
            let have = field::has_str(ent, name)?;
            if have == want {
                Ok(())
            } else {
                Err(value_error(name, &want, have))
            }
        })
    }

    /// Error field contains `want`.
    #[must_use]
    pub fn err_contain(want: &str) -> Self {
        let want = want.to_string();
        Self::named("err_contain", move |ent| {
            let name = &ent.config().error_field;
            let have = field::has_str(ent, name)?;
            if have.contains(want.as_str()) {
                Ok(())
            } else {
                Err(contain_error(name, &want, have))
            }
        })
    }

    /// Field is a time denoting the same instant as `want`.
    #[must_use]
    pub fn time(field: &str, want: impl Into<DateTime<FixedOffset>>) -> Self {
        let field = field.to_string();
        let want = want.into();
        Self::named("time", move |ent| {
            let have = field::has_time(ent, &field)?;
            if have == want {
                Ok(())
            } else {
                Err(value_error(&field, want.to_rfc3339(), have.to_rfc3339()))
            }
        })
    }

    /// Field is a numeric duration equal to `want` in the configured unit.
    #[must_use]
    pub fn duration(field: &str, want: TimeDelta) -> Self {
        let field = field.to_string();
        Self::named("duration", move |ent| {
            let have = field::has_duration(ent, &field)?;
            let unit = ent.config().duration_unit;
            if unit.units_in(have) == unit.units_in(want) {
                Ok(())
            } else {
                Err(value_error(&field, want, have))
            }
        })
    }

    /// Level field equals `want` verbatim.
    #[must_use]
    pub fn level(want: &str) -> Self {
        let want = want.to_string();
        Self::named("level", move |ent| {
            let name = &ent.config().level_field;
            let have = field::has_str(ent, name)?;
            if have == want {
                Ok(())
            } else {
                Err(value_error(name, &want, have))
            }
        })
    }

    /// Level field holds the configured value for `level`.
    #[must_use]
    pub fn level_is(level: Level) -> Self {
        Self::named("level_is", move |ent| {
            let name = &ent.config().level_field;
            let want = ent.config().level_value(level);
            let have = field::has_str(ent, name)?;
            if have == want {
                Ok(())
            } else {
                Err(value_error(name, want, have))
            }
        })
    }

    /// Field is a number equal to `want`.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn number(field: &str, want: f64) -> Self {
        let field = field.to_string();
        Self::named("number", move |ent| {
            let have = field::has_number(ent, &field)?;
            if have == want {
                Ok(())
            } else {
                Err(value_error(&field, want, have))
            }
        })
    }

    /// Field is an object deeply equal to `want`.
    #[must_use]
    pub fn map(field: &str, want: Map<String, Value>) -> Self {
        let field = field.to_string();
        Self::named("map", move |ent| {
            let have = field::has_map(ent, &field)?;
            if *have == want {
                Ok(())
            } else {
                Err(value_error(
                    &field,
                    Value::Object(want.clone()),
                    Value::Object(have.clone()),
                ))
            }
        })
    }
}

impl fmt::Debug for Checker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checker").field("name", &self.name).finish()
    }
}

/// Runs every checker against the entry, stopping at the first failure.
///
/// # Errors
///
/// Returns the first checker failure.
pub fn check_all(entry: &Entry, checks: &[Checker]) -> Result<(), FieldError> {
    checks.iter().try_for_each(|chk| chk.check(entry))
}
