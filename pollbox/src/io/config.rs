//! Pollbox configuration stored under `.pollbox/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Pollbox configuration (TOML).
///
/// Intended to be edited by humans. Missing fields fall back to the defaults
/// the application has always shipped with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct PollboxConfig {
    pub auth: AuthConfig,
    pub provisioning: ProvisioningConfig,
}

/// Shared passwords for the two credential classes.
///
/// Stored in plain text; this is a demo login, not a security boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuthConfig {
    pub admin_password: String,
    pub employee_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_password: "123".to_string(),
            employee_password: "321".to_string(),
        }
    }
}

/// Employee accounts created on first login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProvisioningConfig {
    /// First employee number (inclusive) that may be auto-created.
    pub first_id: u32,
    /// Last employee number (inclusive) that may be auto-created.
    pub last_id: u32,
    pub default_department: String,
    pub email_domain: String,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            first_id: 1001,
            last_id: 1200,
            default_department: "General".to_string(),
            email_domain: "company.com".to_string(),
        }
    }
}

impl PollboxConfig {
    pub fn validate(&self) -> Result<()> {
        if self.auth.admin_password.is_empty() {
            return Err(anyhow!("auth.admin_password must be non-empty"));
        }
        if self.auth.employee_password.is_empty() {
            return Err(anyhow!("auth.employee_password must be non-empty"));
        }
        let range = &self.provisioning;
        if range.first_id > range.last_id {
            return Err(anyhow!(
                "provisioning.first_id {} exceeds last_id {}",
                range.first_id,
                range.last_id
            ));
        }
        if range.last_id > 9999 {
            return Err(anyhow!("provisioning.last_id must fit in four digits"));
        }
        if range.email_domain.trim().is_empty() {
            return Err(anyhow!("provisioning.email_domain must be non-empty"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `PollboxConfig::default()`.
pub fn load_config(path: &Path) -> Result<PollboxConfig> {
    if !path.exists() {
        let cfg = PollboxConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: PollboxConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &PollboxConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
