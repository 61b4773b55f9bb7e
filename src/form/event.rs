/// 表单界面发给 view-model 的用户操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    TitleChanged(String),
    DescriptionChanged(String),
    /// UTC 毫秒时间戳，`None` 清除日期
    DueDateChanged(Option<i64>),
    Save,
    Delete,
}
