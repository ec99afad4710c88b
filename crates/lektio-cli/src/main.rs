mod config;
mod config_cmd;
mod init;
mod output;
mod runner;

use clap::{Parser, Subcommand};
use config::{Config, ConfigPaths};

#[derive(Parser)]
#[command(name = "lektio", version, about = "lecture recording study package engine")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    run: runner::RunArgs,
}

#[derive(Subcommand)]
enum Command {
    Init(init::InitArgs),
    Config(config_cmd::ConfigArgs),
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let paths = match ConfigPaths::from_home() {
        Ok(paths) => paths,
        Err(err) => {
            eprintln!("config paths error: {err}");
            std::process::exit(1);
        }
    };

    let mut config = match Config::load_or_create(&paths) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config load failed: {err}");
            std::process::exit(1);
        }
    };

    if let Some(command) = cli.command {
        match command {
            Command::Init(args) => {
                if let Err(e) = init::run(&args, &paths) {
                    eprintln!("init failed: {e}");
                    std::process::exit(1);
                }
                return;
            }
            Command::Config(args) => {
                if let Err(e) = config_cmd::run(&args, &paths) {
                    eprintln!("config failed: {e}");
                    std::process::exit(1);
                }
                return;
            }
        }
    }

    apply_env_overrides(&mut config);

    if let Err(e) = runner::run(&config, &cli.run) {
        eprintln!("run failed: {e}");
        std::process::exit(1);
    }
}

fn env_override(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn apply_env_overrides(config: &mut Config) {
    if let Some(value) = env_override("LEKTIO_TRANSCRIBE_MODEL") {
        config.transcribe.model = value;
    }
    if let Some(value) = env_override("LEKTIO_CHAT_MODEL") {
        config.generate.model = value;
    }
}
