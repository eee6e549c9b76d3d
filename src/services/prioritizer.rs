//! 作业优先级排序
//!
//! 按截止时间、权重和预计耗时计算分数，分数越高越先做。

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::models::{TaskEntry, TaskStatus};

#[derive(Debug, Default)]
pub struct Prioritizer {
    tasks: Vec<TaskEntry>,
}

impl Prioritizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, task: TaskEntry) {
        debug!("加入任务: {} (截止 {})", task.id, task.due);
        self.tasks.push(task);
    }

    pub fn tasks(&self) -> &[TaskEntry] {
        &self.tasks
    }

    /// 全部任务按分数从高到低排列
    pub fn prioritized(&self, now: DateTime<Utc>) -> Vec<&TaskEntry> {
        let mut sorted: Vec<&TaskEntry> = self.tasks.iter().collect();
        sorted.sort_by(|a, b| b.priority_score(now).total_cmp(&a.priority_score(now)));
        sorted
    }

    /// 分数最高的待处理任务
    pub fn get_next(&self, now: DateTime<Utc>) -> Option<&TaskEntry> {
        self.prioritized(now)
            .into_iter()
            .find(|task| task.status == TaskStatus::Pending)
    }

    /// 截止时间落在 `[now, now + days]` 内的任务
    pub fn mark_due_soon(&self, days: i64, now: DateTime<Utc>) -> Vec<&TaskEntry> {
        let horizon = now + Duration::days(days);
        self.tasks
            .iter()
            .filter(|task| task.due >= now && task.due <= horizon)
            .collect()
    }

    /// 更新任务状态，任务不存在时返回 false
    pub fn update_status(&mut self, id: &str, status: TaskStatus) -> bool {
        match self.tasks.iter_mut().find(|task| task.id == id) {
            Some(task) => {
                task.status = status;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap()
    }

    fn sample() -> Prioritizer {
        let mut p = Prioritizer::new();
        p.add(TaskEntry::new("A", now() + Duration::seconds(86_400), 1.0, 60));
        p.add(TaskEntry::new("B", now() + Duration::seconds(432_000), 5.0, 30));
        p
    }

    #[test]
    fn test_get_next_ranks_by_score() {
        let p = sample();
        let ranking: Vec<&str> = p.prioritized(now()).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ranking, vec!["B", "A"]);
        assert_eq!(p.get_next(now()).unwrap().id, "B");
    }

    #[test]
    fn test_get_next_skips_non_pending() {
        let mut p = sample();
        assert!(p.update_status("B", TaskStatus::Completed));
        assert_eq!(p.get_next(now()).unwrap().id, "A");

        assert!(p.update_status("A", TaskStatus::InProgress));
        assert!(p.get_next(now()).is_none());
        assert!(!p.update_status("missing", TaskStatus::Completed));
    }

    #[test]
    fn test_mark_due_soon_is_inclusive() {
        let mut p = sample();
        p.add(TaskEntry::new("edge", now() + Duration::days(3), 1.0, 10));
        p.add(TaskEntry::new("past", now() - Duration::minutes(1), 1.0, 10));
        p.add(TaskEntry::new("now", now(), 1.0, 10));

        let soon: Vec<&str> = p
            .mark_due_soon(3, now())
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(soon, vec!["A", "edge", "now"]);
    }

    #[test]
    fn test_empty_prioritizer() {
        let p = Prioritizer::new();
        assert!(p.get_next(now()).is_none());
        assert!(p.mark_due_soon(7, now()).is_empty());
    }
}
