use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::fs::parser::{generate_task_md, parse_task_md};
use crate::models::Task;

/// 任务在磁盘上的表示（一个 markdown 文件）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntity {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<i64>,
    /// unix 秒
    pub created_at: i64,
    /// unix 秒
    pub updated_at: i64,
}

impl TaskEntity {
    /// Build the entity to write for `task`, keeping the creation time of an
    /// already stored version when there is one.
    pub fn from_task(task: Task, existing: Option<&TaskEntity>, now: i64) -> Self {
        Self {
            created_at: existing.map(|e| e.created_at).unwrap_or(now),
            updated_at: now,
            id: task.id,
            title: single_line_title(task.title),
            description: task.description.filter(|d| !d.is_empty()),
            due_date: task.due_date,
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut metadata = BTreeMap::new();
        metadata.insert("id".to_string(), self.id.clone());
        metadata.insert("created".to_string(), self.created_at.to_string());
        metadata.insert("updated".to_string(), self.updated_at.to_string());
        if let Some(due) = self.due_date {
            metadata.insert("due".to_string(), due.to_string());
        }

        generate_task_md(
            &self.title,
            &metadata,
            self.description.as_deref().unwrap_or_default(),
        )
    }

    pub fn from_markdown(content: &str) -> Result<Self, String> {
        let parsed = parse_task_md(content)?;

        let id = parsed
            .metadata
            .get("id")
            .cloned()
            .ok_or_else(|| "Task file missing 'id' field".to_string())?;

        let parse_number = |key: &str| -> Result<Option<i64>, String> {
            parsed
                .metadata
                .get(key)
                .map(|v| v.parse::<i64>().map_err(|e| format!("Invalid '{}' value {:?}: {}", key, v, e)))
                .transpose()
        };

        let due_date = parse_number("due")?;
        let created_at = parse_number("created")?.unwrap_or(0);
        let updated_at = parse_number("updated")?.unwrap_or(created_at);

        Ok(Self {
            id,
            title: parsed.title,
            description: Some(parsed.content).filter(|c| !c.is_empty()),
            due_date,
            created_at,
            updated_at,
        })
    }
}

/// 标题写在 `# ` 行上，换行会破坏文件结构，所以折叠成空格
fn single_line_title(title: String) -> String {
    if !title.contains(['\n', '\r']) {
        return title;
    }
    title
        .split(['\n', '\r'])
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl From<TaskEntity> for Task {
    fn from(entity: TaskEntity) -> Self {
        Task {
            id: entity.id,
            title: entity.title,
            description: entity.description,
            due_date: entity.due_date,
        }
    }
}

/// 任务 id 直接作为文件名，只允许安全的字符
pub fn is_valid_task_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn task_file_path(tasks_dir: &Path, id: &str) -> PathBuf {
    tasks_dir.join(format!("{}.md", id))
}

/// Load a single task by id. `Ok(None)` when no file exists for it.
pub fn load_task(tasks_dir: &Path, id: &str) -> Result<Option<TaskEntity>, String> {
    let path = task_file_path(tasks_dir, id);

    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path).map_err(|e| e.to_string())?;
    let entity = TaskEntity::from_markdown(&content)
        .map_err(|e| format!("{}: {}", path.display(), e))?;

    if entity.id != id {
        return Err(format!(
            "{}: id field {:?} does not match file name",
            path.display(),
            entity.id
        ));
    }

    Ok(Some(entity))
}

/// 从任务目录加载所有任务，解析失败的文件跳过
pub fn load_all_tasks(tasks_dir: &Path) -> Result<Vec<TaskEntity>, String> {
    if !tasks_dir.exists() {
        return Ok(Vec::new());
    }

    let mut tasks = Vec::new();

    for entry in fs::read_dir(tasks_dir).map_err(|e| e.to_string())? {
        let entry = entry.map_err(|e| e.to_string())?;
        let path = entry.path();

        if path.extension().and_then(|s| s.to_str()) != Some("md") {
            continue;
        }

        match fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|content| TaskEntity::from_markdown(&content))
        {
            Ok(entity) => tasks.push(entity),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable task file"),
        }
    }

    Ok(tasks)
}

/// 写入 `<tasks_dir>/<id>.md`（先写临时文件再重命名）
pub fn save_task(tasks_dir: &Path, entity: &TaskEntity) -> Result<PathBuf, String> {
    if !tasks_dir.exists() {
        fs::create_dir_all(tasks_dir).map_err(|e| e.to_string())?;
    }

    let file_path = task_file_path(tasks_dir, &entity.id);
    let tmp_path = file_path.with_extension("md.tmp");

    fs::write(&tmp_path, entity.to_markdown()).map_err(|e| e.to_string())?;
    fs::rename(&tmp_path, &file_path).map_err(|e| e.to_string())?;

    Ok(file_path)
}

/// Delete a task file. Returns `Ok(false)` when there was nothing to delete.
pub fn delete_task(tasks_dir: &Path, id: &str) -> Result<bool, String> {
    let path = task_file_path(tasks_dir, id);

    match fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.to_string()),
    }
}
