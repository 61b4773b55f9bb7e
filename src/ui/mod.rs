pub mod dialogs;
pub mod text_input;

use crate::app::{App, Focus, Notification, NotificationLevel};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

/// 主渲染函数
pub fn render(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // 顶栏
            Constraint::Length(3), // 截止日期
            Constraint::Length(3), // 标题
            Constraint::Min(3),    // 描述
            Constraint::Length(1), // 状态栏
        ])
        .split(f.area());

    render_top_bar(f, chunks[0], app);
    render_due_date(f, chunks[1], app);

    let title_block = field_block("Title", app.focus == Focus::Title);
    let title_inner = title_block.inner(chunks[2]);
    f.render_widget(title_block, chunks[2]);
    let focused = app.focus == Focus::Title;
    app.title_input.render(f, title_inner, focused);

    let description_block = field_block("Description", app.focus == Focus::Description);
    let description_inner = description_block.inner(chunks[3]);
    f.render_widget(description_block, chunks[3]);
    let focused = app.focus == Focus::Description;
    app.description_input.render(f, description_inner, focused);

    render_status_line(f, chunks[4], app);

    if let Some(picker) = &app.date_picker {
        dialogs::render_date_picker(f, picker);
    }
    if let Some(dialog) = &app.confirm_delete {
        dialogs::render_confirm_dialog(f, dialog);
    }
    if let Some(notification) = &app.notification {
        render_notification(f, f.area(), notification);
    }
}

fn field_block(title: &str, focused: bool) -> Block<'static> {
    let border_style = if focused {
        Style::default().fg(Color::Rgb(136, 192, 208))
    } else {
        Style::default().fg(Color::Rgb(76, 86, 106))
    };
    Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(border_style)
        .border_type(ratatui::widgets::BorderType::Rounded)
}

/// 顶栏：表单标题和快捷键
fn render_top_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut hints = vec!["Tab next", "Ctrl+S save"];
    if app.state.is_delete_enabled {
        hints.push("Ctrl+D delete");
    }
    hints.push("Ctrl+Q quit");

    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", app.state.top_app_bar_title),
            Style::default()
                .fg(Color::Rgb(46, 52, 64))
                .bg(Color::Rgb(129, 161, 193))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            hints.join("  "),
            Style::default().fg(Color::Rgb(76, 86, 106)),
        ),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn render_due_date(f: &mut Frame, area: Rect, app: &App) {
    let block = field_block("Due date", app.focus == Focus::DueDate);
    let text = match &app.state.due_date {
        Some(date) => Span::raw(date.clone()),
        None => Span::styled(
            "No due date (Enter to pick)",
            Style::default().fg(Color::Rgb(76, 86, 106)),
        ),
    };
    f.render_widget(Paragraph::new(Line::from(text)).block(block), area);
}

/// 状态栏：编辑模式、处理中、错误
fn render_status_line(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();
    match app.focus {
        Focus::Title => spans.push(app.title_input.mode_indicator()),
        Focus::Description => spans.push(app.description_input.mode_indicator()),
        Focus::DueDate => {}
    }

    if app.state.is_processing {
        spans.push(Span::styled(
            "  Working...",
            Style::default().fg(Color::Rgb(235, 203, 139)),
        ));
    } else if let Some(error) = &app.state.error {
        spans.push(Span::styled(
            format!("  {}", error),
            Style::default().fg(Color::Rgb(191, 97, 106)),
        ));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// 渲染通知栏
fn render_notification(f: &mut Frame, area: Rect, notification: &Notification) {
    // 通知栏占据顶部 3 行
    let notification_area = Rect {
        x: area.x,
        y: area.y,
        width: area.width,
        height: area.height.min(3),
    };

    let (bg_color, fg_color, prefix) = match notification.level {
        NotificationLevel::Info => (Color::Blue, Color::White, "ℹ"),
        NotificationLevel::Error => (Color::Red, Color::White, "✗"),
    };

    let content = Line::from(vec![
        Span::styled(
            format!(" {} ", prefix),
            Style::default()
                .fg(fg_color)
                .bg(bg_color)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(&notification.message, Style::default().fg(fg_color)),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(bg_color))
        .style(Style::default().bg(bg_color));

    f.render_widget(Paragraph::new(content).block(block), notification_area);
}
