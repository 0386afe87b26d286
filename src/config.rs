use std::{path::PathBuf, time::Duration};

use crate::{
    constants::{DEFAULT_OUTPUT_LIMIT_BYTES, DEFAULT_TIME_LIMIT_MS},
    native::runtime::Runtime,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: String, value: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct JudgeConfig {
    pub addr: String,
    pub interpreter: PathBuf,
    pub interpreter_args: Vec<String>,
    pub program_extension: String,
    pub staging_dir: PathBuf,
    pub time_limit: Duration,
    /// Bytes kept per output stream before the program is stopped.
    pub output_limit: usize,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            addr: "[::1]:50051".to_string(),
            interpreter: PathBuf::from("node"),
            interpreter_args: Vec::new(),
            program_extension: "js".to_string(),
            staging_dir: std::env::temp_dir().join("stdio-judge"),
            time_limit: Duration::from_millis(DEFAULT_TIME_LIMIT_MS),
            output_limit: DEFAULT_OUTPUT_LIMIT_BYTES,
        }
    }
}

impl JudgeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Unset or blank variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(addr) = get("JUDGE_ADDR") {
            config.addr = addr;
        }
        if let Some(interpreter) = get("JUDGE_INTERPRETER") {
            config.interpreter = interpreter.into();
        }
        if let Some(args) = get("JUDGE_INTERPRETER_ARGS") {
            config.interpreter_args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(extension) = get("JUDGE_PROGRAM_EXTENSION") {
            config.program_extension = extension;
        }
        if let Some(dir) = get("JUDGE_STAGING_DIR") {
            config.staging_dir = dir.into();
        }
        if let Some(value) = get("JUDGE_TIME_LIMIT_MS") {
            let ms = positive("JUDGE_TIME_LIMIT_MS", &value)?;
            config.time_limit = Duration::from_millis(ms);
        }
        if let Some(value) = get("JUDGE_OUTPUT_LIMIT_BYTES") {
            config.output_limit = positive("JUDGE_OUTPUT_LIMIT_BYTES", &value)?;
        }

        Ok(config)
    }

    pub fn runtime(&self) -> Runtime {
        Runtime::new(&self.interpreter, self.interpreter_args.clone())
    }
}

fn positive<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    value
        .trim()
        .parse::<T>()
        .ok()
        .filter(|parsed| *parsed > T::default())
        .ok_or_else(|| ConfigError::InvalidValue {
            var: var.to_string(),
            value: value.to_string(),
        })
}
