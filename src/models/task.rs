use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 任务（领域模型）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// UTC 毫秒时间戳
    pub due_date: Option<i64>,
}

impl Task {
    pub fn new(id: String, title: String) -> Self {
        Self {
            id,
            title,
            description: None,
            due_date: None,
        }
    }

    /// 生成新的任务 id
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_is_unique() {
        let a = Task::generate_id();
        let b = Task::generate_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn test_new_task_has_no_optional_fields() {
        let task = Task::new("t1".to_string(), "Buy milk".to_string());
        assert_eq!(task.id, "t1");
        assert!(task.description.is_none());
        assert!(task.due_date.is_none());
    }
}
