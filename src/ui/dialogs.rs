use chrono::{Datelike, Duration, NaiveDate};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

/// 确认对话框
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmDialog {
    pub title: String,
    pub message: String,
    pub yes_selected: bool,
}

/// 截止日期选择器，`cursor` 是高亮的那一天
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePicker {
    pub cursor: NaiveDate,
}

impl DatePicker {
    pub fn new(cursor: NaiveDate) -> Self {
        Self { cursor }
    }

    pub fn shift_days(&mut self, days: i64) {
        if let Some(date) = self.cursor.checked_add_signed(Duration::days(days)) {
            self.cursor = date;
        }
    }
}

/// 渲染确认对话框
pub fn render_confirm_dialog(f: &mut Frame, dialog: &ConfirmDialog) {
    render_backdrop(f, f.area());

    let area = centered_rect(50, 30, f.area());
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(format!("  {}  ", dialog.title))
        .title_alignment(Alignment::Left)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Rgb(235, 203, 139))) // Nord yellow
        .border_type(ratatui::widgets::BorderType::Rounded)
        .style(Style::default().bg(Color::Rgb(46, 52, 64)));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // 消息
            Constraint::Length(3), // 按钮
        ])
        .split(inner);

    let message_text = Paragraph::new(dialog.message.as_str())
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Rgb(216, 222, 233)));
    f.render_widget(message_text, chunks[0]);

    let button_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(chunks[1]);

    // 否按钮在左，是按钮在右
    let no_style = if !dialog.yes_selected {
        Style::default()
            .bg(Color::Rgb(191, 97, 106))
            .fg(Color::Rgb(46, 52, 64))
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(Color::Rgb(191, 97, 106))
            .add_modifier(Modifier::DIM)
    };
    f.render_widget(
        Paragraph::new("[ n ] No")
            .style(no_style)
            .alignment(Alignment::Center),
        button_chunks[1],
    );

    let yes_style = if dialog.yes_selected {
        Style::default()
            .bg(Color::Rgb(163, 190, 140))
            .fg(Color::Rgb(46, 52, 64))
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(Color::Rgb(163, 190, 140))
            .add_modifier(Modifier::DIM)
    };
    f.render_widget(
        Paragraph::new("[ y ] Yes")
            .style(yes_style)
            .alignment(Alignment::Center),
        button_chunks[2],
    );
}

/// 光标所在月份的日历
pub fn render_date_picker(f: &mut Frame, picker: &DatePicker) {
    let area = centered_rect(40, 50, f.area());
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(format!("  {}  ", picker.cursor.format("%B %Y")))
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Rgb(136, 192, 208)))
        .border_type(ratatui::widgets::BorderType::Rounded)
        .style(Style::default().bg(Color::Rgb(46, 52, 64)));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines = vec![Line::from(Span::styled(
        "Mo Tu We Th Fr Sa Su",
        Style::default().fg(Color::Rgb(129, 161, 193)),
    ))];
    lines.extend(month_rows(picker.cursor).into_iter().map(|week| {
        let spans: Vec<Span> = week
            .iter()
            .map(|day| match day {
                Some(date) if *date == picker.cursor => Span::styled(
                    format!("{:>2} ", date.day()),
                    Style::default()
                        .bg(Color::Rgb(136, 192, 208))
                        .fg(Color::Rgb(46, 52, 64))
                        .add_modifier(Modifier::BOLD),
                ),
                Some(date) => Span::raw(format!("{:>2} ", date.day())),
                None => Span::raw("   "),
            })
            .collect();
        Line::from(spans)
    }));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "h/l day  j/k week  t today  x clear  Enter pick  Esc close",
        Style::default().fg(Color::Rgb(76, 86, 106)),
    )));

    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: false }),
        inner,
    );
}

/// 按周切分当月日期，周一开头
fn month_rows(cursor: NaiveDate) -> Vec<[Option<NaiveDate>; 7]> {
    let mut rows = Vec::new();
    let Some(first) = cursor.with_day(1) else {
        return rows;
    };

    let mut week = [None; 7];
    let mut date = first;
    while date.month() == first.month() {
        let column = date.weekday().num_days_from_monday() as usize;
        week[column] = Some(date);
        if column == 6 {
            rows.push(week);
            week = [None; 7];
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    if week.iter().any(Option::is_some) {
        rows.push(week);
    }
    rows
}

/// 渲染半透明背景遮罩
fn render_backdrop(f: &mut Frame, area: Rect) {
    let block = Block::default().style(Style::default().bg(Color::Rgb(0, 0, 0)));
    f.render_widget(block, area);
}

/// 创建一个居中的矩形区域
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
