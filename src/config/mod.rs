use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::Serialize;

use crate::board::BoardSettings;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ConfigFile {
    pub src: Option<String>,
    pub base_url: Option<String>,
    pub title: Option<String>,
    pub cta: Option<String>,
    #[serde(alias = "contribution_address")]
    pub xmr: Option<String>,
    pub filter: Option<String>,
    pub sort: Option<String>,
    // any scalar; non-numeric limits degrade to 0
    pub limit: Option<serde_yaml::Value>,
    pub timeout: Option<u64>,
    pub proxy: Option<String>,
    pub output: Option<String>,
    pub output_format: Option<String>,
    pub no_color: Option<bool>,
}

impl ConfigFile {
    pub fn limit_text(&self) -> Option<String> {
        match self.limit.as_ref()? {
            serde_yaml::Value::String(s) => Some(s.clone()),
            serde_yaml::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn board_settings(&self) -> BoardSettings {
        BoardSettings {
            src: self.src.clone(),
            title: self.title.clone(),
            cta: self.cta.clone(),
            xmr: self.xmr.clone(),
            filter: self.filter.clone(),
            sort: self.sort.clone(),
            limit: self.limit_text(),
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .or_else(|| {
            let drive = env::var_os("HOMEDRIVE")?;
            let path = env::var_os("HOMEPATH")?;
            Some(PathBuf::from(drive).join(path))
        })
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".mycelial-board").join("config.yml"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn expand_tilde_string(path: &str) -> String {
    expand_tilde(path).to_string_lossy().to_string()
}

pub fn load_config(path: &Path, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_yaml::from_str::<ConfigFile>(&contents)
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}

fn default_config_yaml() -> String {
    r#"# mycelial-board config
#
# Location (default):
#   ~/.mycelial-board/config.yml

# Source document (URL or local path)
src: /sitemap.json
# Relative sources are joined onto this when set
# base_url: https://archive.example/

# Presentation
title: "Planetary Restoration Archive — Grandmaster Board"
cta: "If this moved you, let it move through you."
# xmr: ""

# View
filter: "status:master,grand"
sort: rep
limit: 0

# HTTP
timeout: 10
# proxy: http://127.0.0.1:8080

# Output
# output: ./board.html
# output_format: html
no_color: false
"#
    .to_string()
}

pub fn ensure_default_config_file(path: &Path) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid config path '{}'", path.display()))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        format!(
            "failed to create config directory '{}': {e}",
            parent.display()
        )
    })?;
    std::fs::write(path, default_config_yaml())
        .map_err(|e| format!("failed to write config file '{}': {e}", path.display()))?;
    Ok(())
}
