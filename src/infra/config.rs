use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};

/// Name written by `gotest-util init`
pub const CONFIG_FILE: &str = "gotest-util.toml";

/// Highest `go1.N` release tag assumed when none is configured
pub const DEFAULT_GO_MINOR: u32 = 23;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Build tags applied to every command (comma separated on the CLI)
    pub tags: Vec<String>,

    /// Executable used to run tests
    pub go_command: String,

    /// Highest release tag (`go1.<go_minor>`) considered satisfied
    pub go_minor: u32,

    /// Default log filter when neither RUST_LOG nor -v is given
    pub log_level: String,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            tags: Vec::new(),
            go_command: "go".to_string(),
            go_minor: DEFAULT_GO_MINOR,
            log_level: "warn".to_string(),
        }
    }
}

pub fn load_config() -> Result<Config>
{
    let mut builder = config::Config::builder();

    // Load from config files in priority order
    let config_paths = [CONFIG_FILE, ".gotest-util.toml"];

    for path in &config_paths
    {
        if Path::new(path).exists()
        {
            builder = builder.add_source(config::File::with_name(path));
            break;
        }
    }

    // Add environment variables with GOTEST_UTIL_ prefix
    builder = builder.add_source(
        config::Environment::with_prefix("GOTEST_UTIL")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("tags"),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILE);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        eprintln!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() -> Result<()>
    {
        let text = toml::to_string_pretty(&Config::default())?;
        let back: Config = toml::from_str(&text)?;

        assert_eq!(back.go_command, "go");
        assert_eq!(back.go_minor, DEFAULT_GO_MINOR);
        assert!(back.tags.is_empty());
        Ok(())
    }

    #[test]
    fn partial_config_fills_defaults() -> Result<()>
    {
        let back: Config = toml::from_str("tags = [\"integration\"]\n")?;

        assert_eq!(back.tags, vec!["integration".to_string()]);
        assert_eq!(back.go_command, "go");
        Ok(())
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() -> Result<()>
    {
        let dir = tempfile::TempDir::new()?;
        let ctx = AppContext { quiet: true, no_color: true };

        init(InitArgs { path: dir.path().to_path_buf(), force: false }, &ctx)?;
        assert!(dir.path().join(CONFIG_FILE).exists());

        let err = init(InitArgs { path: dir.path().to_path_buf(), force: false }, &ctx)
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));

        init(InitArgs { path: dir.path().to_path_buf(), force: true }, &ctx)?;
        Ok(())
    }
}
