use chrono::{NaiveDate, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Instant;
use tokio::sync::watch;
use tracing::debug;

use crate::form::{FormEvent, FormUiState, TaskFormViewModel};
use crate::ui::dialogs::{ConfirmDialog, DatePicker};
use crate::ui::text_input::{HelixTextArea, InputAction};
use crate::utils::date::{date_to_millis, millis_to_date};
use crate::utils::parse_due_input;

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// 通知消息
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    pub created_at: Instant,
}

impl Notification {
    /// 检查通知是否已过期（3秒后自动消失）
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed().as_secs() >= 3
    }
}

/// 当前聚焦的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    DueDate,
    Title,
    Description,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::DueDate => Focus::Title,
            Focus::Title => Focus::Description,
            Focus::Description => Focus::DueDate,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::DueDate => Focus::Description,
            Focus::Title => Focus::DueDate,
            Focus::Description => Focus::Title,
        }
    }
}

/// 表单界面状态
pub struct App {
    view_model: TaskFormViewModel,
    ui_state: watch::Receiver<FormUiState>,
    /// 最近一次渲染用的快照
    pub state: FormUiState,
    pub focus: Focus,
    pub title_input: HelixTextArea,
    pub description_input: HelixTextArea,
    pub date_picker: Option<DatePicker>,
    pub confirm_delete: Option<ConfirmDialog>,
    pub notification: Option<Notification>,
    /// 用户选择不保存离开
    pub should_quit: bool,
    /// 已发出保存/删除，等待结果
    awaiting_result: bool,
}

impl App {
    pub fn new(view_model: TaskFormViewModel) -> Self {
        let ui_state = view_model.ui_state();
        let state = view_model.snapshot();

        Self {
            title_input: HelixTextArea::new(&state.title, true),
            description_input: HelixTextArea::new(&state.description, false),
            view_model,
            ui_state,
            state,
            focus: Focus::Title,
            date_picker: None,
            confirm_delete: None,
            notification: None,
            should_quit: false,
            awaiting_result: false,
        }
    }

    pub fn view_model(&self) -> &TaskFormViewModel {
        &self.view_model
    }

    /// 表单结束：已保存、已删除或放弃编辑
    pub fn is_done(&self) -> bool {
        self.should_quit || self.state.is_saved_or_deleted
    }

    /// 拉取最新状态；内容与屏幕不同时（比如任务刚加载）同步到输入框
    pub fn sync(&mut self) {
        if !self.ui_state.has_changed().unwrap_or(false) {
            return;
        }
        let state = self.ui_state.borrow_and_update().clone();

        if state.title != self.title_input.content() {
            self.title_input.set_content(&state.title);
        }
        if state.description != self.description_input.content() {
            self.description_input.set_content(&state.description);
        }
        // 每次保存/删除结束都要提示，即使错误信息和上一次相同
        if self.awaiting_result && !state.is_processing {
            self.awaiting_result = false;
            if let Some(message) = &state.error {
                self.show_notification(message.clone(), NotificationLevel::Error);
            }
        }
        if !state.is_delete_enabled {
            self.confirm_delete = None;
        }

        self.state = state;
    }

    /// 处理键盘输入，返回 false 表示退出
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        self.sync();

        if self.confirm_delete.is_some() {
            self.handle_confirm_key(key);
            return !self.is_done();
        }
        if self.date_picker.is_some() {
            self.handle_picker_key(key);
            return !self.is_done();
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Char('s') => self.dispatch(FormEvent::Save),
                KeyCode::Char('d') => self.open_confirm_delete(),
                _ => {}
            }
            return !self.is_done();
        }

        match key.code {
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            _ => match self.focus {
                Focus::DueDate => self.handle_due_date_key(key),
                Focus::Title => {
                    let action = self.title_input.handle_key(key);
                    self.handle_input_action(action);
                }
                Focus::Description => {
                    let action = self.description_input.handle_key(key);
                    self.handle_input_action(action);
                }
            },
        }

        !self.is_done()
    }

    fn handle_input_action(&mut self, action: InputAction) {
        match action {
            InputAction::Continue => {}
            InputAction::Changed => {
                let event = match self.focus {
                    Focus::Description => {
                        FormEvent::DescriptionChanged(self.description_input.content())
                    }
                    _ => FormEvent::TitleChanged(self.title_input.content()),
                };
                self.dispatch(event);
            }
            InputAction::Save => self.dispatch(FormEvent::Save),
            InputAction::Quit => self.should_quit = true,
        }
    }

    fn handle_due_date_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Char(' ') => {
                let cursor = self
                    .state
                    .due_date
                    .as_deref()
                    .and_then(parse_due_input)
                    .map(millis_to_date)
                    .unwrap_or_else(today);
                self.date_picker = Some(DatePicker::new(cursor));
            }
            KeyCode::Char('x') | KeyCode::Backspace | KeyCode::Delete => {
                self.dispatch(FormEvent::DueDateChanged(None));
            }
            KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }

    fn handle_picker_key(&mut self, key: KeyEvent) {
        let Some(picker) = self.date_picker.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char('h') | KeyCode::Left => picker.shift_days(-1),
            KeyCode::Char('l') | KeyCode::Right => picker.shift_days(1),
            KeyCode::Char('k') | KeyCode::Up => picker.shift_days(-7),
            KeyCode::Char('j') | KeyCode::Down => picker.shift_days(7),
            KeyCode::Char('t') => picker.cursor = today(),
            KeyCode::Enter => {
                let millis = date_to_millis(picker.cursor);
                self.date_picker = None;
                self.dispatch(FormEvent::DueDateChanged(Some(millis)));
            }
            KeyCode::Char('x') => {
                self.date_picker = None;
                self.dispatch(FormEvent::DueDateChanged(None));
            }
            KeyCode::Esc => self.date_picker = None,
            _ => {}
        }
    }

    fn open_confirm_delete(&mut self) {
        if !self.state.is_delete_enabled {
            debug!("delete requested on a task that is not stored");
            return;
        }
        self.confirm_delete = Some(ConfirmDialog {
            title: "Delete task".to_string(),
            message: format!("Delete \"{}\"?\nThis cannot be undone.", self.state.title),
            yes_selected: false,
        });
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        let Some(dialog) = self.confirm_delete.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc | KeyCode::Char('n') => {
                self.confirm_delete = None;
                self.show_notification("Delete cancelled".to_string(), NotificationLevel::Info);
            }
            KeyCode::Left | KeyCode::Char('h') => dialog.yes_selected = false,
            KeyCode::Right | KeyCode::Char('l') => dialog.yes_selected = true,
            KeyCode::Enter => {
                let confirmed = dialog.yes_selected;
                self.confirm_delete = None;
                if confirmed {
                    self.dispatch(FormEvent::Delete);
                } else {
                    self.show_notification("Delete cancelled".to_string(), NotificationLevel::Info);
                }
            }
            KeyCode::Char('y') => {
                self.confirm_delete = None;
                self.dispatch(FormEvent::Delete);
            }
            _ => {}
        }
    }

    fn dispatch(&mut self, event: FormEvent) {
        if matches!(event, FormEvent::Save | FormEvent::Delete) {
            self.awaiting_result = true;
        }
        self.view_model.on_event(event);
        self.sync();
    }

    /// 显示通知消息
    pub fn show_notification(&mut self, message: String, level: NotificationLevel) {
        self.notification = Some(Notification {
            message,
            level,
            created_at: Instant::now(),
        });
    }

    /// 清除已过期的通知
    pub fn clear_expired_notification(&mut self) {
        if let Some(ref notification) = self.notification {
            if notification.is_expired() {
                self.notification = None;
            }
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::LateEmissionPolicy;
    use crate::models::Task;
    use crate::repository::memory::InMemoryTaskRepository;
    use std::sync::Arc;
    use tokio::runtime::Handle;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn open(repo: &Arc<InMemoryTaskRepository>, id: Option<&str>) -> App {
        let view_model = TaskFormViewModel::new(
            repo.clone(),
            id.map(str::to_string),
            LateEmissionPolicy::KeepEdits,
            Handle::current(),
        );
        App::new(view_model)
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_typing_title_dispatches_title_changed() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let mut app = open(&repo, None);

        app.handle_key(key(KeyCode::Char('i')));
        for c in "Buy milk".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }

        assert_eq!(app.view_model().snapshot().title, "Buy milk");
        assert_eq!(app.state.title, "Buy milk");
    }

    #[tokio::test]
    async fn test_description_edits_reach_view_model() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let mut app = open(&repo, None);

        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.focus, Focus::Description);
        app.handle_key(key(KeyCode::Char('i')));
        app.handle_key(key(KeyCode::Char('a')));
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Char('b')));

        assert_eq!(app.view_model().snapshot().description, "a\nb");
    }

    #[tokio::test]
    async fn test_loaded_task_fills_inputs() {
        let mut task = Task::new("t1".into(), "Buy milk".into());
        task.description = Some("2%".into());
        let repo = Arc::new(InMemoryTaskRepository::with_task(task));
        let mut app = open(&repo, Some("t1"));

        settle().await;
        app.sync();

        assert_eq!(app.title_input.content(), "Buy milk");
        assert_eq!(app.description_input.content(), "2%");
        assert!(app.state.is_delete_enabled);
    }

    #[tokio::test]
    async fn test_picker_sets_due_date() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let mut app = open(&repo, None);

        app.handle_key(key(KeyCode::BackTab));
        assert_eq!(app.focus, Focus::DueDate);
        app.handle_key(key(KeyCode::Enter));
        assert!(app.date_picker.is_some());

        app.handle_key(key(KeyCode::Char('l')));
        app.handle_key(key(KeyCode::Enter));

        assert!(app.date_picker.is_none());
        let expected = crate::utils::format_due_date(Some(date_to_millis(
            today().succ_opt().unwrap(),
        )));
        assert_eq!(app.state.due_date, expected);

        app.handle_key(key(KeyCode::Char('x')));
        assert_eq!(app.state.due_date, None);
    }

    #[tokio::test]
    async fn test_ctrl_d_ignored_when_creating() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let mut app = open(&repo, None);

        assert!(app.handle_key(ctrl('d')));
        assert!(app.confirm_delete.is_none());
    }

    #[tokio::test]
    async fn test_confirmed_delete_closes_form() {
        let repo = Arc::new(InMemoryTaskRepository::with_task(Task::new(
            "t1".into(),
            "Buy milk".into(),
        )));
        let mut app = open(&repo, Some("t1"));
        settle().await;

        app.handle_key(ctrl('d'));
        assert!(app.confirm_delete.is_some());
        app.handle_key(key(KeyCode::Char('y')));

        settle().await;
        app.sync();
        assert!(app.is_done());
        assert_eq!(repo.deleted(), vec!["t1".to_string()]);
    }

    #[tokio::test]
    async fn test_ctrl_s_saves_and_finishes() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let mut app = open(&repo, None);

        app.handle_key(key(KeyCode::Char('i')));
        app.handle_key(key(KeyCode::Char('x')));
        app.handle_key(ctrl('s'));

        settle().await;
        app.sync();
        assert!(app.state.is_saved_or_deleted);
        assert_eq!(repo.saved()[0].title, "x");
    }

    #[tokio::test]
    async fn test_failed_save_shows_notification() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        repo.fail_writes(true);
        let mut app = open(&repo, None);

        app.handle_key(ctrl('s'));
        settle().await;
        app.sync();

        assert!(!app.is_done());
        let notification = app.notification.as_ref().unwrap();
        assert_eq!(notification.level, NotificationLevel::Error);
        assert!(notification.message.contains("disk is full"));
    }

    #[tokio::test]
    async fn test_repeated_failure_notifies_each_time() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        repo.fail_writes(true);
        let mut app = open(&repo, None);

        for _ in 0..2 {
            app.notification = None;
            app.handle_key(ctrl('s'));
            settle().await;
            app.sync();

            let notification = app.notification.as_ref().unwrap();
            assert_eq!(notification.level, NotificationLevel::Error);
            assert!(notification.message.contains("disk is full"));
        }
    }

    #[tokio::test]
    async fn test_failure_notified_when_intermediate_state_skipped() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        repo.fail_writes(true);
        let mut app = open(&repo, None);

        app.handle_key(ctrl('s'));
        settle().await;
        app.sync();
        app.notification = None;

        // 第二次保存不经过 App，processing 和清空错误的中间状态都不会被看到
        app.awaiting_result = true;
        app.view_model().on_event(FormEvent::Save);
        settle().await;
        app.sync();

        assert!(app.notification.is_some());
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let mut app = open(&repo, None);
        assert!(!app.handle_key(ctrl('q')));

        let mut app = open(&repo, None);
        // 标题输入框默认是普通模式
        assert!(!app.handle_key(key(KeyCode::Esc)));
        assert!(repo.saved().is_empty());
    }
}
