// ABOUTME: Platform locations for the widget database, log files and config file
// ABOUTME: Resolved through directories::ProjectDirs with working-directory fallbacks

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

fn shopchat_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "klassy", "shopchat")
}

/// Where the session database lives unless `storage.path` overrides it.
/// `./data` when the platform has no home directory.
pub fn data_dir() -> PathBuf {
    match shopchat_dirs() {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => PathBuf::from("./data"),
    }
}

/// Rolling TUI log files sit under `<data dir>/logs`
pub fn log_dir_in(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

/// Default `config.toml` location, next to the binary's working directory as a fallback
pub fn config_file() -> PathBuf {
    let dir = match shopchat_dirs() {
        Some(dirs) => dirs.config_dir().to_path_buf(),
        None => PathBuf::from("."),
    };
    dir.join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_dir_is_inside_data_dir() {
        let data = PathBuf::from("/var/lib/shopchat");
        assert_eq!(log_dir_in(&data), PathBuf::from("/var/lib/shopchat/logs"));
    }

    #[test]
    fn test_config_file_name() {
        assert_eq!(config_file().file_name().unwrap(), "config.toml");
    }
}
