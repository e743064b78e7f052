/*!
# Service Settings

Настройки сервиса поиска метаданных. Источники в порядке приоритета
(каждый следующий перекрывает предыдущий):

1. значения по умолчанию;
2. TOML-файл с таблицей `[metadata]`;
3. переменные окружения `INPUT_METADATA_DIR`, `DIST_METADATA_DIR`,
   `METADATA_DEFAULT_LIMIT`, `METADATA_RESCAN_INTERVAL_SECS`, `METADATA_QUERY_TIMEOUT_MS`;
4. флаги командной строки (применяются в бинарниках).
*/

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_INPUT_DIR: &str = "INPUT_METADATA_DIR";
pub const ENV_DIST_DIR: &str = "DIST_METADATA_DIR";
pub const ENV_DEFAULT_LIMIT: &str = "METADATA_DEFAULT_LIMIT";
pub const ENV_RESCAN_INTERVAL: &str = "METADATA_RESCAN_INTERVAL_SECS";
pub const ENV_QUERY_TIMEOUT: &str = "METADATA_QUERY_TIMEOUT_MS";

/// Настройки сервиса
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Каталог с JSON-выгрузками конфигураций
    pub input_dir: PathBuf,
    /// Каталог для производных артефактов (кэш индекса)
    pub dist_dir: PathBuf,
    /// Лимит результатов, если запрос его не задал
    pub default_limit: i64,
    /// Как часто запрос может проверять каталог на изменения; 0 - при каждом запросе
    pub rescan_interval_secs: u64,
    pub query_timeout_ms: Option<u64>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("metadata_src"),
            dist_dir: PathBuf::from("metadata_dist"),
            default_limit: 5,
            rescan_interval_secs: 2,
            query_timeout_ms: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    metadata: ServiceSettings,
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("Invalid value '{}' for {}: {}", value, name, e))
}

impl ServiceSettings {
    /// Значения по умолчанию, перекрытые переменными окружения
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();
        settings.apply_env()?;
        Ok(settings)
    }

    /// Файл настроек, затем переменные окружения
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut settings = match config_file {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Загрузка таблицы `[metadata]` из TOML-файла
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).with_context(|| {
            format!("Failed to read settings from {}", path.as_ref().display())
        })?;

        let file: SettingsFile = toml::from_str(&content).with_context(|| {
            format!(
                "Failed to parse TOML settings from {}",
                path.as_ref().display()
            )
        })?;

        file.metadata.validate()?;
        Ok(file.metadata)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Перекрытие значений из произвольного источника пар имя-значение
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(dir) = lookup(ENV_INPUT_DIR) {
            self.input_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_DIST_DIR) {
            self.dist_dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup(ENV_DEFAULT_LIMIT) {
            self.default_limit = parse_env(ENV_DEFAULT_LIMIT, &value)?;
        }
        if let Some(value) = lookup(ENV_RESCAN_INTERVAL) {
            self.rescan_interval_secs = parse_env(ENV_RESCAN_INTERVAL, &value)?;
        }
        if let Some(value) = lookup(ENV_QUERY_TIMEOUT) {
            self.query_timeout_ms = Some(parse_env(ENV_QUERY_TIMEOUT, &value)?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_limit <= 0 {
            bail!(
                "default_limit must be a positive integer, got {}",
                self.default_limit
            );
        }
        if self.query_timeout_ms == Some(0) {
            bail!("query_timeout_ms must be positive when set");
        }
        Ok(())
    }

    pub fn rescan_interval(&self) -> Duration {
        Duration::from_secs(self.rescan_interval_secs)
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let settings = ServiceSettings::default();
        assert_eq!(settings.input_dir, PathBuf::from("metadata_src"));
        assert_eq!(settings.dist_dir, PathBuf::from("metadata_dist"));
        assert_eq!(settings.default_limit, 5);
        assert_eq!(settings.rescan_interval(), Duration::from_secs(2));
        assert_eq!(settings.query_timeout(), None);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_toml_then_overrides() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(
            temp_file.path(),
            "[metadata]\ninput_dir = \"exports\"\ndefault_limit = 10\n",
        )
        .unwrap();

        let mut settings = ServiceSettings::load_from_file(temp_file.path()).unwrap();
        assert_eq!(settings.input_dir, PathBuf::from("exports"));
        assert_eq!(settings.default_limit, 10);
        assert_eq!(settings.dist_dir, PathBuf::from("metadata_dist"));

        let env: HashMap<&str, &str> = [
            (ENV_DIST_DIR, "/tmp/dist"),
            (ENV_QUERY_TIMEOUT, "250"),
            (ENV_INPUT_DIR, "  "),
        ]
        .into_iter()
        .collect();
        settings
            .apply_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(settings.input_dir, PathBuf::from("exports"));
        assert_eq!(settings.dist_dir, PathBuf::from("/tmp/dist"));
        assert_eq!(settings.query_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut settings = ServiceSettings::default();
        let result = settings.apply_overrides(|name| {
            (name == ENV_DEFAULT_LIMIT).then(|| "five".to_string())
        });
        assert!(result.is_err());

        settings.default_limit = 0;
        assert!(settings.validate().is_err());

        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "[metadata]\ndefault_limit = -1\n").unwrap();
        assert!(ServiceSettings::load_from_file(temp_file.path()).is_err());
    }
}
