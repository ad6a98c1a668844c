//! Job keys
//!
//! A job key is the only persistent handle on an in-flight job. It is both
//! the entry pushed onto the broker list and the key its payload is stored
//! under:
//!
//! ```text
//! <job_type>_<id>                  eligible immediately
//! <job_type>_<id>_<RFC3339 time>   eligible once the time has passed
//! ```

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use std::fmt;
use uuid::Uuid;

/// Separator between key segments
pub const DELIMITER: char = '_';

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum KeyError {
    #[error("expected 2 or 3 segments, found {0}")]
    SegmentCount(usize),
    #[error("invalid not-before timestamp {0:?}")]
    Timestamp(String),
}

/// Decoded form of a job key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobKey {
    pub job_type: String,
    pub id: String,
    /// Whole seconds; the wire form carries no fraction
    pub not_before: Option<DateTime<Utc>>,
}

impl JobKey {
    /// Build the key for a freshly minted job id.
    pub fn new(job_type: &str, id: Uuid, not_before: Option<DateTime<Utc>>) -> Self {
        Self {
            job_type: job_type.to_string(),
            id: id.to_string(),
            not_before: not_before.map(|at| at.trunc_subsecs(0)),
        }
    }

    /// Parse the wire form.
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        let parts: Vec<&str> = raw.split(DELIMITER).collect();
        match parts.as_slice() {
            [job_type, id] => Ok(Self {
                job_type: job_type.to_string(),
                id: id.to_string(),
                not_before: None,
            }),
            [job_type, id, at] => {
                let at = DateTime::parse_from_rfc3339(at)
                    .map_err(|_| KeyError::Timestamp(at.to_string()))?;
                Ok(Self {
                    job_type: job_type.to_string(),
                    id: id.to_string(),
                    not_before: Some(at.with_timezone(&Utc)),
                })
            }
            other => Err(KeyError::SegmentCount(other.len())),
        }
    }

    /// Whether the job may run at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.not_before.map_or(true, |at| at <= now)
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.job_type, DELIMITER, self.id)?;
        if let Some(at) = self.not_before {
            write!(
                f,
                "{}{}",
                DELIMITER,
                at.to_rfc3339_opts(SecondsFormat::Secs, true)
            )?;
        }
        Ok(())
    }
}
