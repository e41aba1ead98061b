// src/models.rs
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::BotError;

/// Roster entry; unique per (guild, user)
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Student {
    pub user_id: String,
    pub username: String,
}

/// Raw `attendance` row as stored; timestamps are still text
#[derive(Debug, Clone, FromRow)]
pub struct AttendanceRow {
    pub id: i64,
    pub guild_id: String,
    pub user_id: String,
    pub join_time: String,
    pub leave_time: Option<String>,
    pub voice_channel: String,
}

/// One stay in a voice channel. `leave_time` is `None` while still connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceEvent {
    pub id: i64,
    pub join_time: DateTime<Utc>,
    pub leave_time: Option<DateTime<Utc>>,
    pub voice_channel: String,
}

impl TryFrom<AttendanceRow> for AttendanceEvent {
    type Error = BotError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let join_time = parse_db_timestamp(&row.join_time).map_err(|e| BotError::DataIntegrity {
            id: row.id,
            message: format!("join_time {:?}: {}", row.join_time, e),
        })?;

        let leave_time = match row.leave_time.as_deref() {
            Some(raw) => Some(parse_db_timestamp(raw).map_err(|e| BotError::DataIntegrity {
                id: row.id,
                message: format!("leave_time {:?}: {}", raw, e),
            })?),
            None => None,
        };

        if let Some(leave) = leave_time {
            if leave < join_time {
                return Err(BotError::DataIntegrity {
                    id: row.id,
                    message: "leave_time precedes join_time".to_string(),
                });
            }
        }

        Ok(Self {
            id: row.id,
            join_time,
            leave_time,
            voice_channel: row.voice_channel,
        })
    }
}

/// Message whose ✅ reaction grants a role
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ReactionRoleBinding {
    pub message_id: String,
    pub guild_id: String,
    pub channel_id: String,
    pub role_id: String,
}

/// Fixed-width UTC text so that SQL string comparison is chronological
pub fn to_db_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_db_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(join: &str, leave: Option<&str>) -> AttendanceRow {
        AttendanceRow {
            id: 7,
            guild_id: "1".to_string(),
            user_id: "2".to_string(),
            join_time: join.to_string(),
            leave_time: leave.map(str::to_string),
            voice_channel: "backend".to_string(),
        }
    }

    #[test]
    fn test_db_timestamps_are_fixed_width() {
        let a = Utc.with_ymd_and_hms(2024, 5, 6, 8, 5, 0).unwrap();
        let b = a + chrono::Duration::microseconds(123_456);
        assert_eq!(to_db_timestamp(a), "2024-05-06T08:05:00.000000Z");
        assert_eq!(to_db_timestamp(a).len(), to_db_timestamp(b).len());
        assert!(to_db_timestamp(a) < to_db_timestamp(b));
        assert_eq!(parse_db_timestamp(&to_db_timestamp(b)).unwrap(), b);
    }

    #[test]
    fn test_row_conversion() {
        let event = AttendanceEvent::try_from(row(
            "2024-05-06T08:50:00.000000Z",
            Some("2024-05-06T09:05:00.000000Z"),
        ))
        .unwrap();
        assert_eq!(event.id, 7);
        assert_eq!(
            event.leave_time.unwrap() - event.join_time,
            chrono::Duration::minutes(15)
        );

        let open = AttendanceEvent::try_from(row("2024-05-06T08:50:00Z", None)).unwrap();
        assert!(open.leave_time.is_none());
    }

    #[test]
    fn test_row_conversion_rejects_corrupt_rows() {
        let bad_join = AttendanceEvent::try_from(row("yesterday", None));
        assert!(matches!(bad_join, Err(BotError::DataIntegrity { id: 7, .. })));

        let inverted = AttendanceEvent::try_from(row(
            "2024-05-06T09:00:00Z",
            Some("2024-05-06T08:00:00Z"),
        ));
        assert!(matches!(inverted, Err(BotError::DataIntegrity { .. })));
    }
}
