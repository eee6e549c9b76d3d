use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::AssignmentRecord;

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

/// 待排序的任务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEntry {
    pub id: String,
    pub due: DateTime<Utc>,
    pub weight: f64,
    pub estimated_minutes: u32,
    pub status: TaskStatus,
}

impl TaskEntry {
    pub fn new(id: impl Into<String>, due: DateTime<Utc>, weight: f64, estimated_minutes: u32) -> Self {
        Self {
            id: id.into(),
            due,
            weight,
            estimated_minutes,
            status: TaskStatus::Pending,
        }
    }

    /// 从作业记录创建，截止日期无法解析时返回 None
    pub fn from_record(record: &AssignmentRecord, weight: f64, estimated_minutes: u32) -> Option<Self> {
        let due = parse_due_date(&record.due_date_raw)?;
        Some(Self::new(record.id.clone(), due, weight, estimated_minutes))
    }

    /// 优先级分数：`weight * 1_000_000 / (距截止秒数 * 预计分钟数)`
    ///
    /// 距截止秒数和预计分钟数都至少按 1 计算，已过期的任务分数最高。
    pub fn priority_score(&self, now: DateTime<Utc>) -> f64 {
        let seconds_until_due = (self.due - now).num_seconds().max(1) as f64;
        let minutes = self.estimated_minutes.max(1) as f64;
        self.weight * 1_000_000.0 / (seconds_until_due * minutes)
    }
}

/// 解析页面上的截止日期文本
///
/// 支持 RFC 3339、`%Y-%m-%d %H:%M:%S` 和 `%Y-%m-%d`，不带时区的按 UTC 处理。
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(23, 59, 59))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_priority_score_matches_formula() {
        let a = TaskEntry::new("A", now() + Duration::seconds(86_400), 1.0, 60);
        let b = TaskEntry::new("B", now() + Duration::seconds(432_000), 5.0, 30);

        assert!((a.priority_score(now()) - 0.192_901).abs() < 1e-4);
        assert!((b.priority_score(now()) - 0.385_802).abs() < 1e-4);
    }

    #[test]
    fn test_priority_score_guards_zero_denominator() {
        let due_now = TaskEntry::new("now", now(), 1.0, 0);
        let overdue = TaskEntry::new("late", now() - Duration::hours(2), 1.0, 30);

        assert!(due_now.priority_score(now()).is_finite());
        assert_eq!(due_now.priority_score(now()), 1_000_000.0);
        assert!(overdue.priority_score(now()) > 0.0);
    }

    #[test]
    fn test_parse_due_date_formats() {
        assert_eq!(
            parse_due_date("2024-09-03T10:00:00Z"),
            Some(Utc.with_ymd_and_hms(2024, 9, 3, 10, 0, 0).unwrap())
        );
        assert_eq!(
            parse_due_date("2024-09-03 10:00:00"),
            Some(Utc.with_ymd_and_hms(2024, 9, 3, 10, 0, 0).unwrap())
        );
        assert_eq!(
            parse_due_date("2024-09-03"),
            Some(Utc.with_ymd_and_hms(2024, 9, 3, 23, 59, 59).unwrap())
        );
        assert_eq!(parse_due_date("No due date specified"), None);
    }

    #[test]
    fn test_from_record_uses_record_id() {
        let record = AssignmentRecord {
            id: "42".to_string(),
            due_date_raw: "2024-09-03".to_string(),
            ..Default::default()
        };
        let entry = TaskEntry::from_record(&record, 2.0, 45).unwrap();
        assert_eq!(entry.id, "42");
        assert_eq!(entry.status, TaskStatus::Pending);
    }
}
