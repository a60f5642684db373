//! The archive job: which period prefix to package, and where.

use std::path::{Path, PathBuf};

use chrono::{Datelike, Local, Months, NaiveDate};
use regex::Regex;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// One invocation's worth of work. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveJob {
    period_prefix: String,
    working_directory: PathBuf,
}

impl ArchiveJob {
    /// Builds a job from an explicit `YYYY-MM` period.
    pub fn for_period(period: &str, working_directory: impl Into<PathBuf>) -> Result<Self> {
        let period_prefix = parse_period(period)?;
        Ok(Self::new(period_prefix, working_directory.into()))
    }

    /// Builds a job for the calendar month before today (local time).
    pub fn for_previous_month(working_directory: impl Into<PathBuf>) -> Self {
        Self::previous_month_of(Local::now().date_naive(), working_directory)
    }

    /// Builds a job for the calendar month before `today`.
    pub fn previous_month_of(today: NaiveDate, working_directory: impl Into<PathBuf>) -> Self {
        let first_of_month = today.with_day(1).unwrap_or(today);
        let previous = first_of_month
            .checked_sub_months(Months::new(1))
            .unwrap_or(first_of_month);
        debug!(%today, %previous, "Defaulting period to previous month");
        Self::new(previous.format("%Y-%m").to_string(), working_directory.into())
    }

    fn new(period_prefix: String, working_directory: PathBuf) -> Self {
        info!(
            period_prefix = %period_prefix,
            working_directory = %working_directory.display(),
            "[ARCHIVE] Job created"
        );
        ArchiveJob {
            period_prefix,
            working_directory,
        }
    }

    pub fn period_prefix(&self) -> &str {
        &self.period_prefix
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    /// `{working_directory}/{prefix}`, where the selection is staged.
    pub fn staging_directory(&self) -> PathBuf {
        self.working_directory.join(&self.period_prefix)
    }

    /// `{working_directory}/{prefix}.zip`.
    pub fn archive_path(&self) -> PathBuf {
        self.working_directory
            .join(format!("{}.zip", self.period_prefix))
    }
}

/// Validates a `YYYY-MM` period and returns it in canonical form.
pub fn parse_period(input: &str) -> Result<String> {
    let invalid = || Error::InvalidPeriodFormat {
        input: input.to_string(),
    };

    let shape = Regex::new(r"^\d{4}-\d{2}$").map_err(|_| invalid())?;
    if !shape.is_match(input) {
        return Err(invalid());
    }

    // Day 01 makes the month check a full calendar check (rejects 00 and 13).
    let date = NaiveDate::parse_from_str(&format!("{input}-01"), "%Y-%m-%d")
        .map_err(|_| invalid())?;
    Ok(format!("{:04}-{:02}", date.year(), date.month()))
}
