use chrono::Duration;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceStatus {
    Absent,
    /// Late by the given amount, measured from the nominal class start
    Late { late_by: Duration },
    Present,
}

/// Computed attendance for one student in one class session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceVerdict {
    pub status: AttendanceStatus,
    /// Always within 0..=100
    pub percentage: u8,
}

impl AttendanceVerdict {
    pub fn absent() -> Self {
        Self {
            status: AttendanceStatus::Absent,
            percentage: 0,
        }
    }

    pub fn is_late(&self) -> bool {
        matches!(self.status, AttendanceStatus::Late { .. })
    }
}

/// Sheet cell text: `A 0%`, `L {m}m{s}s {p}%` or `X {p}%`
impl fmt::Display for AttendanceVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            AttendanceStatus::Absent => write!(f, "A {}%", self.percentage),
            AttendanceStatus::Late { late_by } => write!(
                f,
                "L {}m{}s {}%",
                late_by.num_minutes(),
                late_by.num_seconds() % 60,
                self.percentage
            ),
            AttendanceStatus::Present => write!(f, "X {}%", self.percentage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text() {
        assert_eq!(AttendanceVerdict::absent().to_string(), "A 0%");
        assert_eq!(
            AttendanceVerdict {
                status: AttendanceStatus::Present,
                percentage: 16
            }
            .to_string(),
            "X 16%"
        );
        assert_eq!(
            AttendanceVerdict {
                status: AttendanceStatus::Late {
                    late_by: Duration::seconds(25 * 60 + 7)
                },
                percentage: 33
            }
            .to_string(),
            "L 25m7s 33%"
        );
    }
}
