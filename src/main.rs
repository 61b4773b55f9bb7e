use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::sync::Arc;
use tracing::{error, info};

mod app;
mod cli;
mod config;
mod form;
mod fs;
mod logging;
mod models;
mod repository;
mod ui;
mod utils;

use app::App;
use cli::{Cli, CliOutcome, Command};
use form::TaskFormViewModel;
use repository::FileTaskRepository;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 配置命令不需要打开任务目录
    if let Some(Command::Config { action }) = cli.command {
        return cli::handle_config_command(action);
    }

    let mut config = config::load_config()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    logging::init(&config)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let repository = Arc::new(FileTaskRepository::open(config.tasks_dir()?)?);

    let task_id = match cli::handle_command(cli.command, repository.as_ref(), &runtime)? {
        CliOutcome::Done => return Ok(()),
        CliOutcome::OpenForm { task_id } => task_id,
    };

    let view_model = TaskFormViewModel::new(
        repository.clone(),
        task_id,
        config.late_emission,
        runtime.handle().clone(),
    );
    info!(
        id = ?view_model.task_id(),
        dir = %repository.tasks_dir().display(),
        "opening task form"
    );

    // 设置终端
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(view_model);
    let res = run_app(&mut terminal, &mut app);

    // 恢复终端
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.view_model().close();

    match res {
        Ok(()) => info!(finished = app.state.is_saved_or_deleted, "task form closed"),
        Err(err) => {
            error!(error = ?err, "task form failed");
            eprintln!("Error: {:?}", err);
        }
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        app.sync();
        app.clear_expired_notification();
        if app.is_done() {
            return Ok(());
        }

        terminal.draw(|f| ui::render(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && !app.handle_key(key) {
                    return Ok(());
                }
            }
        }
    }
}
