use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::runtime::Runtime;

use crate::form::LateEmissionPolicy;
use crate::fs;
use crate::models::Task;
use crate::repository::{RepositoryError, TaskRepository};
use crate::utils::{format_due_date, parse_due_input};

/// Terminal to-do list with a Helix-style task form.
/// Running without a command opens the form for a new task.
#[derive(Parser)]
#[command(name = "hxt", version, about)]
pub struct Cli {
    /// Directory holding the task files (overrides the config file)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Open the form to create a task
    New,
    /// Open the form for an existing task
    Edit { id: String },
    /// Create a task without opening the form
    Add {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        /// dd/mm/yyyy, yyyy-mm-dd, today, tomorrow, "in 3d", "in 2w"
        #[arg(long)]
        due: Option<String>,
    },
    /// List all tasks
    List {
        #[arg(long)]
        json: bool,
    },
    /// Print one task
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Delete a task
    #[command(alias = "delete")]
    Rm { id: String },
    /// Show or change the configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    Show,
    /// What the open form does when its task changes on disk
    Policy { policy: LateEmissionPolicy },
    /// Where task files are stored
    DataDir { path: PathBuf },
}

/// 命令处理结果
#[derive(Debug, PartialEq, Eq)]
pub enum CliOutcome {
    /// 命令已处理完毕，直接退出
    Done,
    /// 进入 TUI 表单
    OpenForm { task_id: Option<String> },
}

/// Config commands work without opening the task store
pub fn handle_config_command(action: Option<ConfigAction>) -> Result<()> {
    match action {
        None | Some(ConfigAction::Show) => crate::config::show_config(),
        Some(ConfigAction::Policy { policy }) => crate::config::set_policy(policy),
        Some(ConfigAction::DataDir { path }) => crate::config::set_data_dir(path),
    }
}

/// 处理 CLI 命令
pub fn handle_command(
    command: Option<Command>,
    repository: &dyn TaskRepository,
    runtime: &Runtime,
) -> Result<CliOutcome> {
    match command {
        None | Some(Command::New) => Ok(CliOutcome::OpenForm { task_id: None }),
        Some(Command::Edit { id }) => {
            if !fs::is_valid_task_id(&id) {
                bail!("Invalid task id: {:?}", id);
            }
            if runtime.block_on(repository.find_by_id(&id))?.is_none() {
                eprintln!("No task with id {}; saving the form will create it.", id);
            }
            Ok(CliOutcome::OpenForm { task_id: Some(id) })
        }
        Some(Command::Add {
            title,
            description,
            due,
        }) => {
            let due_date = match due {
                Some(input) => match parse_due_input(&input) {
                    Some(millis) => Some(millis),
                    None => bail!("Unrecognised due date: {:?}", input),
                },
                None => None,
            };
            let task = Task {
                description: description.filter(|d| !d.is_empty()),
                due_date,
                ..Task::new(Task::generate_id(), title)
            };
            let id = task.id.clone();
            runtime.block_on(repository.save(task))?;
            println!("✓ Created task {}", id);
            Ok(CliOutcome::Done)
        }
        Some(Command::List { json }) => {
            let tasks = runtime.block_on(repository.find_all())?;
            task_list(&tasks, json)?;
            Ok(CliOutcome::Done)
        }
        Some(Command::Show { id, json }) => {
            let task = runtime
                .block_on(repository.find_by_id(&id))?
                .ok_or(RepositoryError::NotFound(id))?;
            task_show(&task, json)?;
            Ok(CliOutcome::Done)
        }
        Some(Command::Rm { id }) => {
            runtime.block_on(repository.delete_by_id(&id))?;
            println!("Deleted task {}", id);
            Ok(CliOutcome::Done)
        }
        Some(Command::Config { action }) => {
            handle_config_command(action)?;
            Ok(CliOutcome::Done)
        }
    }
}

fn task_list(tasks: &[Task], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(tasks)?);
        return Ok(());
    }

    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    print!("{}", format_task_table(tasks));
    Ok(())
}

/// 表格输出；ID 列完整显示，可以直接交给 edit/show/rm
fn format_task_table(tasks: &[Task]) -> String {
    let id_width = tasks
        .iter()
        .map(|task| task.id.chars().count())
        .max()
        .unwrap_or(0)
        .max(2);

    let mut output = format!("{:<id_width$}  {:<10}  TITLE\n", "ID", "DUE");
    output.push_str(&format!(
        "{}  ----------  -----------------------------------\n",
        "-".repeat(id_width)
    ));
    for task in tasks {
        output.push_str(&format!(
            "{:<id_width$}  {:<10}  {}\n",
            task.id,
            format_due_date(task.due_date).unwrap_or_else(|| "-".to_string()),
            truncate(&task.title, 35)
        ));
    }
    output
}

fn task_show(task: &Task, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(task)?);
        return Ok(());
    }

    println!("Task {}", task.id);
    println!("Title: {}", task.title);
    println!(
        "Due: {}",
        format_due_date(task.due_date).unwrap_or_else(|| "-".to_string())
    );
    if let Some(description) = &task.description {
        println!("\n{}", description);
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        s.chars().take(max_len).collect()
    }
}
