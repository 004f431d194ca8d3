//! Mailing schedule vocabulary
//!
//! The string forms of these types are what the database stores and what the
//! API accepts, so parsing doubles as input validation.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use super::DomainError;

/// Hour of the day a mailing is sent at, written as `HH:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StartTime(u8);

impl StartTime {
    pub fn from_hour(hour: u8) -> Result<Self, DomainError> {
        if hour > 23 {
            return Err(DomainError::Validation(format!(
                "start hour must be between 0 and 23, got {}",
                hour
            )));
        }
        Ok(Self(hour))
    }

    pub fn hour(&self) -> u8 {
        self.0
    }

    pub fn as_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(u32::from(self.0), 0, 0).unwrap_or(NaiveTime::MIN)
    }

    /// True once the wall clock has reached the start time.
    pub fn is_due(&self, now: NaiveTime) -> bool {
        self.as_time() <= now.with_nanosecond(0).unwrap_or(now)
    }

    /// All valid start times, `00:00` through `23:00`.
    pub fn choices() -> impl Iterator<Item = StartTime> {
        (0..24).map(StartTime)
    }
}

impl fmt::Display for StartTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00", self.0)
    }
}

impl FromStr for StartTime {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::Validation(format!("invalid start time '{}', expected HH:00", s));

        let (hour, minute) = s.split_once(':').ok_or_else(invalid)?;
        if hour.len() != 2 || !hour.bytes().all(|b| b.is_ascii_digit()) || minute != "00" {
            return Err(invalid());
        }
        let hour: u8 = hour.parse().map_err(|_| invalid())?;
        StartTime::from_hour(hour).map_err(|_| invalid())
    }
}

impl TryFrom<String> for StartTime {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StartTime> for String {
    fn from(value: StartTime) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub const ALL: [Frequency; 3] = [Frequency::Daily, Frequency::Weekly, Frequency::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Frequency::Daily => "Every day",
            Frequency::Weekly => "Once a week",
            Frequency::Monthly => "Once a month",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(DomainError::Validation(format!(
                "invalid frequency '{}'. Must be 'daily', 'weekly' or 'monthly'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailingStatus {
    Created,
    Started,
    Completed,
}

impl MailingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MailingStatus::Created => "created",
            MailingStatus::Started => "started",
            MailingStatus::Completed => "completed",
        }
    }

    /// A mailing starts exactly once: only from `Created`, and only when due.
    pub fn should_start(&self, start: StartTime, now: NaiveTime) -> bool {
        *self == MailingStatus::Created && start.is_due(now)
    }
}

impl fmt::Display for MailingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MailingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(MailingStatus::Created),
            "started" => Ok(MailingStatus::Started),
            "completed" => Ok(MailingStatus::Completed),
            other => Err(DomainError::Validation(format!(
                "invalid mailing status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(DeliveryStatus::Sent),
            "failed" => Ok(DeliveryStatus::Failed),
            other => Err(DomainError::Validation(format!(
                "invalid delivery status '{}'",
                other
            ))),
        }
    }
}
