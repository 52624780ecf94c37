use std::fs::File;
use std::path::Path;

pub use ingest::config::Config;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    InvalidError(#[from] ingest::config::ValidationError),
}

pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
    let file = File::open(path)?;
    let config: Config = serde_yaml::from_reader(file)?;
    config.validate()?;
    Ok(config)
}
