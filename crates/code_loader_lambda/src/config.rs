use std::path::PathBuf;

pub const SCRATCH_PATH_ENV: &str = "CODE_LOADER_SCRATCH_PATH";
pub const CAPTURE_CONSOLE_ENV: &str = "CODE_LOADER_CAPTURE_CONSOLE";
pub const DEFAULT_SCRATCH_PATH: &str = "/tmp/lambda_function.js";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub scratch_path: PathBuf,
    pub capture_console: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            scratch_path: PathBuf::from(DEFAULT_SCRATCH_PATH),
            capture_console: true,
        }
    }
}

impl LoaderConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let scratch_path = match lookup(SCRATCH_PATH_ENV) {
            Some(value) if !value.trim().is_empty() => PathBuf::from(value.trim()),
            _ => PathBuf::from(DEFAULT_SCRATCH_PATH),
        };

        let capture_console = match lookup(CAPTURE_CONSOLE_ENV) {
            None => true,
            Some(value) => parse_flag(&value).ok_or_else(|| {
                format!("{CAPTURE_CONSOLE_ENV} must be true or false, got '{value}'")
            })?,
        };

        Ok(Self {
            scratch_path,
            capture_console,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
