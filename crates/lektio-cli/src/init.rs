use clap::Args;

use crate::config::{Config, ConfigError, ConfigPaths};

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Overwrite an existing config file with defaults.
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: &InitArgs, paths: &ConfigPaths) -> Result<(), ConfigError> {
    if paths.config_path.exists() && !args.force {
        println!(
            "config already exists at {} (use --force to overwrite)",
            paths.config_path.display()
        );
        return Ok(());
    }

    Config::write(paths, &Config::default())?;
    println!("wrote default config to {}", paths.config_path.display());
    println!("set auth.api_key (or export GROQ_API_KEY) before running");
    Ok(())
}
