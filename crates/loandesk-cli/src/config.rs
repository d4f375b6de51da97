// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use loandesk_app::{DEFAULT_PAGE_SIZE, FilterAuthority, PAGE_SIZE_CHOICES};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "loandesk";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub show_dashboard: Option<bool>,
    pub page_size: Option<usize>,
    pub filter_authority: Option<String>,
    pub strict_status_workflow: Option<bool>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            show_dashboard: Some(true),
            page_size: Some(DEFAULT_PAGE_SIZE),
            filter_authority: Some("local".to_owned()),
            strict_status_workflow: Some(false),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            file: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("LOANDESK_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set LOANDESK_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and keep values under [api], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1. Regenerate it with `loandesk --print-example-config`",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(timeout) = &self.api.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "api.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(base_url) = &self.api.base_url
            && !(base_url.starts_with("http://") || base_url.starts_with("https://"))
        {
            bail!(
                "api.base_url in {} must start with http:// or https://, got {:?}",
                path.display(),
                base_url
            );
        }

        if let Some(size) = self.ui.page_size
            && !PAGE_SIZE_CHOICES.contains(&size)
        {
            bail!(
                "ui.page_size in {} must be one of {:?}, got {}",
                path.display(),
                PAGE_SIZE_CHOICES,
                size
            );
        }

        if let Some(authority) = &self.ui.filter_authority
            && FilterAuthority::parse(authority).is_none()
        {
            bail!(
                "ui.filter_authority in {} must be \"local\" or \"server\", got {:?}",
                path.display(),
                authority
            );
        }

        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.api
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn show_dashboard(&self) -> bool {
        self.ui.show_dashboard.unwrap_or(true)
    }

    pub fn page_size(&self) -> usize {
        self.ui.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn filter_authority(&self) -> FilterAuthority {
        self.ui
            .filter_authority
            .as_deref()
            .and_then(FilterAuthority::parse)
            .unwrap_or_default()
    }

    pub fn strict_status_workflow(&self) -> bool {
        self.ui.strict_status_workflow.unwrap_or(false)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        match &self.log.file {
            Some(path) => Ok(PathBuf::from(path)),
            None => default_log_path(),
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# loandesk config\n# Place this file at: {}\n\nversion = 1\n\n[api]\nbase_url = \"{}\"\n# <N>ms, <N>s or <N>m\ntimeout = \"{}\"\n\n[ui]\nshow_dashboard = true\n# one of 5, 10, 25, 50\npage_size = {}\n# \"local\" fetches whole lists and filters here; \"server\" sends filters as query parameters\nfilter_authority = \"local\"\n# only allow pending -> approved|rejected and approved -> disbursed\nstrict_status_workflow = false\n\n[log]\nlevel = \"{}\"\n# Optional. Default is platform data dir (for example ~/.local/share/loandesk/loandesk.log)\n# file = \"/absolute/path/to/loandesk.log\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
            DEFAULT_PAGE_SIZE,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn default_log_path() -> Result<PathBuf> {
    let data_root = dirs::data_dir()
        .ok_or_else(|| anyhow!("cannot resolve data directory; set [log].file in the config"))?;
    Ok(data_root.join(APP_NAME).join("loandesk.log"))
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 10s)")
}

#[cfg(test)]
mod tests {
    use super::{Config, parse_duration};
    use anyhow::Result;
    use loandesk_app::FilterAuthority;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert!(config.show_dashboard());
        assert_eq!(config.page_size(), 10);
        assert_eq!(config.timeout()?, Duration::from_secs(10));
        assert_eq!(config.filter_authority(), FilterAuthority::Local);
        assert!(!config.strict_status_workflow());
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[api]\nbase_url = \"https://lender.test/api\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[api], [ui], and [log]"));
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[api]\nbase_url = \"https://lender.test/api/\"\ntimeout = \"2500ms\"\n[ui]\nshow_dashboard = false\npage_size = 25\nfilter_authority = \"server\"\nstrict_status_workflow = true\n[log]\nlevel = \"debug\"\nfile = \"/tmp/loandesk-test.log\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.base_url(), "https://lender.test/api");
        assert_eq!(config.timeout()?, Duration::from_millis(2500));
        assert!(!config.show_dashboard());
        assert_eq!(config.page_size(), 25);
        assert_eq!(config.filter_authority(), FilterAuthority::Server);
        assert!(config.strict_status_workflow());
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.log_path()?, PathBuf::from("/tmp/loandesk-test.log"));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 7\n")?;
        let error = Config::load(&path).expect_err("v7 config should fail");
        assert!(error.to_string().contains("unsupported config version 7"));
        Ok(())
    }

    #[test]
    fn invalid_values_are_rejected() -> Result<()> {
        for (content, needle) in [
            ("version = 1\n[api]\ntimeout = \"0s\"\n", "must be positive"),
            ("version = 1\n[api]\nbase_url = \"ftp://lender.test\"\n", "http://"),
            ("version = 1\n[ui]\npage_size = 7\n", "ui.page_size"),
            ("version = 1\n[ui]\nfilter_authority = \"both\"\n", "filter_authority"),
        ] {
            let (_temp, path) = write_config(content)?;
            let error = Config::load(&path).expect_err("invalid value should fail");
            assert!(
                error.to_string().contains(needle),
                "{content:?} gave {error}"
            );
        }
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("LOANDESK_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("LOANDESK_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn default_log_path_lives_under_app_dir() -> Result<()> {
        let config = Config::default();
        let path = config.log_path()?;
        assert!(path.ends_with("loandesk/loandesk.log"), "got {}", path.display());
        Ok(())
    }

    #[test]
    fn durations_parse_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("10s")?, Duration::from_secs(10));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        let error = parse_duration("soon").expect_err("invalid duration should fail");
        assert!(error.to_string().contains("invalid"));
        Ok(())
    }

    #[test]
    fn example_config_round_trips() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, Config::example_config(&path))?;
        let config = Config::load(&path)?;
        assert_eq!(config.base_url(), "http://localhost:5000/api");
        assert_eq!(config.page_size(), 10);
        Ok(())
    }
}
