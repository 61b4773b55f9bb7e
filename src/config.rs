/// 应用配置管理
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::form::LateEmissionPolicy;

const APP_DIR: &str = "helix-todo";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// 任务文件目录（默认在系统数据目录下）
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// 表单打开期间任务被外部修改时的处理方式
    #[serde(default)]
    pub late_emission: LateEmissionPolicy,
    /// 调试日志文件
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// tracing filter directive, e.g. "hxt=debug"
    #[serde(default)]
    pub log_filter: Option<String>,
}

impl Config {
    /// 存放任务 markdown 文件的目录
    pub fn tasks_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(default_data_dir()?.join("tasks")),
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("helix_todo_debug.log"))
    }
}

fn base_dirs() -> Result<directories::BaseDirs> {
    directories::BaseDirs::new().context("Failed to get user directories")
}

/// 获取配置文件路径
/// Windows: %APPDATA%\helix-todo\config.toml
/// macOS: ~/Library/Application Support/helix-todo/config.toml
/// Linux: ~/.config/helix-todo/config.toml
pub fn get_config_path() -> Result<PathBuf> {
    Ok(base_dirs()?.config_dir().join(APP_DIR).join("config.toml"))
}

/// Linux: ~/.local/share/helix-todo
fn default_data_dir() -> Result<PathBuf> {
    Ok(base_dirs()?.data_dir().join(APP_DIR))
}

/// 加载配置
pub fn load_config() -> Result<Config> {
    load_config_from(&get_config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        // 配置文件不存在，返回默认配置
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;

    Ok(config)
}

/// 保存配置
pub fn save_config(config: &Config) -> Result<()> {
    save_config_to(config, &get_config_path()?)
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    // 确保目录存在
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;

    Ok(())
}

/// 更新迟到数据的处理策略
pub fn set_policy(policy: LateEmissionPolicy) -> Result<()> {
    let mut config = load_config()?;
    config.late_emission = policy;
    save_config(&config)?;
    println!("✓ Late update policy set to: {}", policy_name(policy));
    Ok(())
}

/// 更新任务目录
pub fn set_data_dir(dir: PathBuf) -> Result<()> {
    let mut config = load_config()?;
    config.data_dir = Some(dir);
    save_config(&config)?;
    println!("✓ Task directory set to: {}", config.tasks_dir()?.display());
    Ok(())
}

/// 显示当前配置
pub fn show_config() -> Result<()> {
    let config = load_config()?;
    println!("Current configuration:");
    println!("  Task directory:     {}", config.tasks_dir()?.display());
    println!("  Late update policy: {}", policy_name(config.late_emission));
    println!("  Debug log:          {}", config.log_path().display());
    println!();
    println!("Config file: {}", get_config_path()?.display());
    Ok(())
}

fn policy_name(policy: LateEmissionPolicy) -> &'static str {
    match policy {
        LateEmissionPolicy::KeepEdits => "keep-edits",
        LateEmissionPolicy::Overwrite => "overwrite",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.late_emission, LateEmissionPolicy::KeepEdits);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            data_dir: Some(dir.path().join("tasks")),
            late_emission: LateEmissionPolicy::Overwrite,
            log_file: None,
            log_filter: Some("hxt=debug".to_string()),
        };

        save_config_to(&config, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), config);
    }

    #[test]
    fn test_policy_is_kebab_case() {
        let config: Config = toml::from_str("late_emission = \"overwrite\"\n").unwrap();
        assert_eq!(config.late_emission, LateEmissionPolicy::Overwrite);

        let config: Config = toml::from_str("late_emission = \"keep-edits\"\n").unwrap();
        assert_eq!(config.late_emission, LateEmissionPolicy::KeepEdits);
    }

    #[test]
    fn test_bad_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "late_emission = \"sometimes\"\n").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing"));
    }

    #[test]
    fn test_explicit_data_dir_wins() {
        let config = Config {
            data_dir: Some(PathBuf::from("/srv/todo")),
            ..Config::default()
        };
        assert_eq!(config.tasks_dir().unwrap(), PathBuf::from("/srv/todo"));
    }
}
