use crossterm::event::{KeyCode, KeyEvent};
use std::time::Instant;
use tui_textarea::{CursorMove, TextArea};

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::Span,
};

/// 编辑模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    /// 插入模式 - 直接输入文本
    Insert,
    /// 普通模式 - 导航和命令
    Normal,
    /// 命令模式 (:w, :q)
    Command,
}

/// 输入动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// 继续编辑
    Continue,
    /// 内容已改变
    Changed,
    /// 保存表单 (:w)
    Save,
    /// 不保存离开 (:q 或普通模式下 Esc)
    Quit,
}

/// Helix 风格的文本输入区域
pub struct HelixTextArea {
    textarea: TextArea<'static>,
    mode: EditMode,
    /// Enter 不换行
    single_line: bool,
    command_buffer: String,
    /// 按键序列缓冲区（用于 dd, gg 等）
    key_sequence: Vec<char>,
    last_key_time: Instant,
}

impl HelixTextArea {
    pub fn new(initial_value: &str, single_line: bool) -> Self {
        let mut input = Self {
            textarea: TextArea::default(),
            mode: EditMode::Normal,
            single_line,
            command_buffer: String::new(),
            key_sequence: Vec::new(),
            last_key_time: Instant::now(),
        };
        input.set_content(initial_value);
        input
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn content(&self) -> String {
        self.textarea.lines().join("\n")
    }

    /// 替换内容，保持当前模式，光标移到末尾
    pub fn set_content(&mut self, value: &str) {
        let lines: Vec<String> = value.split('\n').map(|s| s.to_string()).collect();
        let mut textarea = TextArea::new(lines);

        // Nord 主题
        textarea.set_style(
            Style::default()
                .fg(Color::Rgb(236, 239, 244))
                .bg(Color::Rgb(46, 52, 64)),
        );
        textarea.set_cursor_style(
            Style::default()
                .bg(Color::Rgb(136, 192, 208))
                .fg(Color::Rgb(46, 52, 64)),
        );
        textarea.set_cursor_line_style(Style::default());
        textarea.move_cursor(CursorMove::Bottom);
        textarea.move_cursor(CursorMove::End);

        self.textarea = textarea;
    }

    /// 处理按键事件
    pub fn handle_key(&mut self, key: KeyEvent) -> InputAction {
        let before = self.textarea.lines().to_vec();

        let action = match self.mode {
            EditMode::Insert => self.handle_insert_mode(key),
            EditMode::Normal => self.handle_normal_mode(key),
            EditMode::Command => self.handle_command_mode(key),
        };

        if action == InputAction::Continue && self.textarea.lines() != before.as_slice() {
            InputAction::Changed
        } else {
            action
        }
    }

    fn handle_insert_mode(&mut self, key: KeyEvent) -> InputAction {
        match key.code {
            KeyCode::Esc => self.mode = EditMode::Normal,
            KeyCode::Char(c) => self.textarea.insert_char(c),
            KeyCode::Enter if !self.single_line => self.textarea.insert_newline(),
            KeyCode::Backspace => {
                self.textarea.delete_char();
            }
            KeyCode::Delete => {
                self.textarea.delete_next_char();
            }
            KeyCode::Left => self.textarea.move_cursor(CursorMove::Back),
            KeyCode::Right => self.textarea.move_cursor(CursorMove::Forward),
            KeyCode::Up => self.textarea.move_cursor(CursorMove::Up),
            KeyCode::Down => self.textarea.move_cursor(CursorMove::Down),
            KeyCode::Home => self.textarea.move_cursor(CursorMove::Head),
            KeyCode::End => self.textarea.move_cursor(CursorMove::End),
            _ => {}
        }
        InputAction::Continue
    }

    fn handle_normal_mode(&mut self, key: KeyEvent) -> InputAction {
        // 按键序列超时（500ms）
        if self.last_key_time.elapsed().as_millis() > 500 {
            self.key_sequence.clear();
        }
        self.last_key_time = Instant::now();

        match key.code {
            KeyCode::Esc => return InputAction::Quit,

            // 进入插入模式
            KeyCode::Char('i') => self.mode = EditMode::Insert,
            KeyCode::Char('a') => {
                self.textarea.move_cursor(CursorMove::Forward);
                self.mode = EditMode::Insert;
            }
            KeyCode::Char('I') => {
                self.textarea.move_cursor(CursorMove::Head);
                self.mode = EditMode::Insert;
            }
            KeyCode::Char('A') => {
                self.textarea.move_cursor(CursorMove::End);
                self.mode = EditMode::Insert;
            }
            KeyCode::Char('o') if !self.single_line => {
                self.textarea.move_cursor(CursorMove::End);
                self.textarea.insert_newline();
                self.mode = EditMode::Insert;
            }

            // 移动
            KeyCode::Char('h') | KeyCode::Left => self.textarea.move_cursor(CursorMove::Back),
            KeyCode::Char('j') | KeyCode::Down => self.textarea.move_cursor(CursorMove::Down),
            KeyCode::Char('k') | KeyCode::Up => self.textarea.move_cursor(CursorMove::Up),
            KeyCode::Char('l') | KeyCode::Right => self.textarea.move_cursor(CursorMove::Forward),
            KeyCode::Char('w') => self.textarea.move_cursor(CursorMove::WordForward),
            KeyCode::Char('b') => self.textarea.move_cursor(CursorMove::WordBack),
            KeyCode::Char('e') => self.textarea.move_cursor(CursorMove::WordEnd),
            KeyCode::Char('0') | KeyCode::Home => self.textarea.move_cursor(CursorMove::Head),
            KeyCode::Char('$') | KeyCode::End => self.textarea.move_cursor(CursorMove::End),
            KeyCode::Char('G') => self.textarea.move_cursor(CursorMove::Bottom),

            // 删除
            KeyCode::Char('x') | KeyCode::Delete => {
                self.textarea.delete_next_char();
            }

            KeyCode::Char('u') => {
                self.textarea.undo();
            }
            KeyCode::Char('U') => {
                self.textarea.redo();
            }

            KeyCode::Char(':') => {
                self.mode = EditMode::Command;
                self.command_buffer.clear();
            }

            KeyCode::Char(c) => {
                self.key_sequence.push(c);
                self.handle_key_sequence();
            }

            _ => {}
        }
        InputAction::Continue
    }

    /// 处理按键序列（dd, cc, gg）
    fn handle_key_sequence(&mut self) {
        match self.key_sequence.as_slice() {
            ['g', 'g'] => self.textarea.move_cursor(CursorMove::Top),
            ['d', 'd'] => {
                self.textarea.move_cursor(CursorMove::Head);
                self.textarea.delete_line_by_end();
            }
            ['c', 'c'] => {
                self.textarea.move_cursor(CursorMove::Head);
                self.textarea.delete_line_by_end();
                self.mode = EditMode::Insert;
            }
            _ => {
                if self.key_sequence.len() >= 2 {
                    self.key_sequence.clear();
                }
                return;
            }
        }
        self.key_sequence.clear();
    }

    fn handle_command_mode(&mut self, key: KeyEvent) -> InputAction {
        match key.code {
            KeyCode::Esc => {
                self.mode = EditMode::Normal;
                self.command_buffer.clear();
            }
            KeyCode::Enter => {
                let action = match self.command_buffer.trim() {
                    "w" | "write" | "wq" | "x" => InputAction::Save,
                    "q" | "quit" | "q!" => InputAction::Quit,
                    _ => InputAction::Continue,
                };
                self.command_buffer.clear();
                self.mode = EditMode::Normal;
                return action;
            }
            KeyCode::Char(c) => self.command_buffer.push(c),
            KeyCode::Backspace => {
                self.command_buffer.pop();
            }
            _ => {}
        }
        InputAction::Continue
    }

    /// 渲染输入框，只有获得焦点时才显示光标
    pub fn render(&mut self, f: &mut Frame, area: Rect, focused: bool) {
        let cursor_style = if focused {
            Style::default()
                .bg(Color::Rgb(136, 192, 208))
                .fg(Color::Rgb(46, 52, 64))
        } else {
            Style::default()
        };
        self.textarea.set_cursor_style(cursor_style);
        f.render_widget(&self.textarea, area);
    }

    /// 模式指示器
    pub fn mode_indicator(&self) -> Span<'static> {
        match self.mode() {
            EditMode::Insert => Span::styled(
                " INSERT ",
                Style::default().fg(Color::Rgb(46, 52, 64)).bg(Color::Rgb(163, 190, 140)),
            ),
            EditMode::Normal => Span::styled(
                " NORMAL ",
                Style::default().fg(Color::Rgb(46, 52, 64)).bg(Color::Rgb(136, 192, 208)),
            ),
            EditMode::Command => Span::styled(
                format!(" :{}█ ", self.command_buffer),
                Style::default().fg(Color::Rgb(235, 203, 139)),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(input: &mut HelixTextArea, code: KeyCode) -> InputAction {
        input.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(input: &mut HelixTextArea, text: &str) {
        for c in text.chars() {
            press(input, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_insert_reports_change() {
        let mut input = HelixTextArea::new("", true);
        assert_eq!(press(&mut input, KeyCode::Char('i')), InputAction::Continue);
        assert_eq!(press(&mut input, KeyCode::Char('a')), InputAction::Changed);
        assert_eq!(input.content(), "a");
    }

    #[test]
    fn test_single_line_ignores_enter() {
        let mut input = HelixTextArea::new("Buy", true);
        press(&mut input, KeyCode::Char('A'));
        assert_eq!(press(&mut input, KeyCode::Enter), InputAction::Continue);
        assert_eq!(input.content(), "Buy");
    }

    #[test]
    fn test_multi_line_keeps_newlines() {
        let mut input = HelixTextArea::new("", false);
        press(&mut input, KeyCode::Char('i'));
        type_str(&mut input, "one");
        press(&mut input, KeyCode::Enter);
        type_str(&mut input, "two");
        assert_eq!(input.content(), "one\ntwo");
    }

    #[test]
    fn test_esc_in_normal_mode_quits() {
        let mut input = HelixTextArea::new("x", true);
        press(&mut input, KeyCode::Char('i'));
        assert_eq!(press(&mut input, KeyCode::Esc), InputAction::Continue);
        assert_eq!(input.mode(), EditMode::Normal);
        assert_eq!(press(&mut input, KeyCode::Esc), InputAction::Quit);
    }

    #[test]
    fn test_command_mode_write_and_quit() {
        let mut input = HelixTextArea::new("", true);
        press(&mut input, KeyCode::Char(':'));
        type_str(&mut input, "w");
        assert_eq!(press(&mut input, KeyCode::Enter), InputAction::Save);

        press(&mut input, KeyCode::Char(':'));
        type_str(&mut input, "q");
        assert_eq!(press(&mut input, KeyCode::Enter), InputAction::Quit);
        assert_eq!(input.mode(), EditMode::Normal);
    }

    #[test]
    fn test_set_content_replaces_text() {
        let mut input = HelixTextArea::new("old", false);
        input.set_content("new\ntext");
        assert_eq!(input.content(), "new\ntext");
        input.set_content("");
        assert_eq!(input.content(), "");
    }
}
