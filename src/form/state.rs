pub const CREATING_TITLE: &str = "Creating a task";
pub const EDITING_TITLE: &str = "Editing task";

/// 表单渲染所需的全部状态
///
/// 每次更新整体替换，界面只读
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormUiState {
    pub title: String,
    pub description: String,
    /// 格式为 `dd/MM/yyyy`
    pub due_date: Option<String>,
    pub top_app_bar_title: String,
    /// 只有编辑已保存的任务时为 true
    pub is_delete_enabled: bool,
    /// 正在保存或删除
    pub is_processing: bool,
    /// 表单已完成，应当关闭
    pub is_saved_or_deleted: bool,
    /// 最近一次保存/删除失败的原因，下次操作时清除
    pub error: Option<String>,
}

impl Default for FormUiState {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            due_date: None,
            top_app_bar_title: CREATING_TITLE.to_string(),
            is_delete_enabled: false,
            is_processing: false,
            is_saved_or_deleted: false,
            error: None,
        }
    }
}
