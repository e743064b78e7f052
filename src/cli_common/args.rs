//! Общие аргументы командной строки для CLI утилит

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::settings::{
    ServiceSettings, ENV_DEFAULT_LIMIT, ENV_DIST_DIR, ENV_INPUT_DIR, ENV_QUERY_TIMEOUT,
    ENV_RESCAN_INTERVAL,
};

/// Общие аргументы для всех CLI команд
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl CommonArgs {
    /// Определяет уровень логирования на основе флагов
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

/// Аргументы, из которых собираются настройки сервиса
#[derive(Args, Debug, Clone, Default)]
pub struct ServiceArgs {
    /// TOML settings file with a [metadata] table
    #[arg(long = "settings", global = true)]
    pub settings_file: Option<PathBuf>,

    /// Directory with exported configuration JSON files
    #[arg(long = "input-dir", env = ENV_INPUT_DIR, global = true)]
    pub input_dir: Option<PathBuf>,

    /// Directory for the derived index cache
    #[arg(long = "dist-dir", env = ENV_DIST_DIR, global = true)]
    pub dist_dir: Option<PathBuf>,

    /// Result limit used when a query does not set one
    #[arg(long = "default-limit", env = ENV_DEFAULT_LIMIT, global = true)]
    pub default_limit: Option<i64>,

    /// Minimum interval between source directory rescans, seconds
    #[arg(long = "rescan-interval", env = ENV_RESCAN_INTERVAL, global = true)]
    pub rescan_interval_secs: Option<u64>,

    /// Per-query timeout, milliseconds
    #[arg(long = "query-timeout", env = ENV_QUERY_TIMEOUT, global = true)]
    pub query_timeout_ms: Option<u64>,
}

impl ServiceArgs {
    /// Файл настроек, окружение, затем флаги
    pub fn settings(&self) -> Result<ServiceSettings> {
        let mut settings = ServiceSettings::load(self.settings_file.as_deref())?;

        if let Some(dir) = &self.input_dir {
            settings.input_dir = dir.clone();
        }
        if let Some(dir) = &self.dist_dir {
            settings.dist_dir = dir.clone();
        }
        if let Some(limit) = self.default_limit {
            settings.default_limit = limit;
        }
        if let Some(interval) = self.rescan_interval_secs {
            settings.rescan_interval_secs = interval;
        }
        if let Some(timeout) = self.query_timeout_ms {
            settings.query_timeout_ms = Some(timeout);
        }

        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = ServiceArgs {
            input_dir: Some(PathBuf::from("exports")),
            default_limit: Some(12),
            ..ServiceArgs::default()
        };
        let settings = args.settings().unwrap();
        assert_eq!(settings.input_dir, PathBuf::from("exports"));
        assert_eq!(settings.default_limit, 12);
    }

    #[test]
    fn test_log_level_from_flags() {
        let mut args = CommonArgs {
            verbose: false,
            format: "text".to_string(),
            quiet: false,
        };
        assert_eq!(args.log_level(), tracing::Level::INFO);
        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_invalid_limit_flag() {
        let args = ServiceArgs {
            default_limit: Some(0),
            ..ServiceArgs::default()
        };
        assert!(args.settings().is_err());
    }
}
