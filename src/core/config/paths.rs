//! File locations. Everything lives under one data directory;
//! `RAGLINE_CONFIG_PATH` may move the public config file elsewhere.

use std::env;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "ragline";

#[derive(Debug, Clone, PartialEq)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
    pub secrets_file: PathBuf,
    pub log_dir: PathBuf,
}

impl AppPaths {
    pub fn from_env() -> Self {
        Self::resolve(|key| env::var(key).ok())
    }

    /// `RAGLINE_DATA_DIR` wins over the platform data directory.
    pub fn resolve<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = non_empty(lookup("RAGLINE_DATA_DIR"))
            .map(PathBuf::from)
            .unwrap_or_else(|| platform_data_dir(&lookup).join(APP_DIR));

        let mut paths = Self::in_dir(data_dir);
        if let Some(config_file) = non_empty(lookup("RAGLINE_CONFIG_PATH")) {
            paths.config_file = PathBuf::from(config_file);
        }
        paths
    }

    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            config_file: data_dir.join("config.yml"),
            secrets_file: data_dir.join("secrets.yaml"),
            log_dir: data_dir.join("logs"),
            data_dir,
        }
    }
}

fn platform_data_dir<F>(lookup: &F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if cfg!(target_os = "windows") {
        if let Some(local) = non_empty(lookup("LOCALAPPDATA")) {
            return PathBuf::from(local);
        }
    }
    if let Some(xdg) = non_empty(lookup("XDG_DATA_HOME")) {
        return PathBuf::from(xdg);
    }

    let Some(home) = non_empty(lookup("HOME")).or_else(|| non_empty(lookup("USERPROFILE"))) else {
        return PathBuf::from(".");
    };
    if cfg!(target_os = "macos") {
        Path::new(&home).join("Library").join("Application Support")
    } else {
        Path::new(&home).join(".local").join("share")
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve_with(vars: &[(&str, &str)]) -> AppPaths {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppPaths::resolve(|key| vars.get(key).cloned())
    }

    #[test]
    fn data_dir_override_holds_every_file() {
        let paths = resolve_with(&[("RAGLINE_DATA_DIR", "/srv/ragline")]);
        assert_eq!(paths, AppPaths::in_dir("/srv/ragline"));
        assert_eq!(paths.secrets_file, PathBuf::from("/srv/ragline/secrets.yaml"));
        assert_eq!(paths.log_dir, PathBuf::from("/srv/ragline/logs"));
    }

    #[test]
    fn config_path_override_moves_only_the_public_file() {
        let paths = resolve_with(&[
            ("RAGLINE_DATA_DIR", "/srv/ragline"),
            ("RAGLINE_CONFIG_PATH", "/etc/ragline.yml"),
        ]);
        assert_eq!(paths.config_file, PathBuf::from("/etc/ragline.yml"));
        assert_eq!(paths.secrets_file, PathBuf::from("/srv/ragline/secrets.yaml"));
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn falls_back_to_xdg_then_home() {
        let paths = resolve_with(&[("XDG_DATA_HOME", "/data"), ("RAGLINE_DATA_DIR", "  ")]);
        assert_eq!(paths.data_dir, PathBuf::from("/data/ragline"));

        let paths = resolve_with(&[("HOME", "/home/dev")]);
        assert_eq!(paths.data_dir, PathBuf::from("/home/dev/.local/share/ragline"));
    }
}
