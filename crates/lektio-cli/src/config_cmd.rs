use crate::config::{Config, ConfigError, ConfigPaths};
use clap::Args;
use std::process::Command;

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Print config with secrets redacted
    #[arg(long)]
    pub print: bool,

    /// Edit config in $EDITOR
    #[arg(long)]
    pub edit: bool,

    /// Set a config value (dotted key=value)
    #[arg(long, value_name = "key=value")]
    pub set: Vec<String>,
}

pub fn run(args: &ConfigArgs, paths: &ConfigPaths) -> Result<(), ConfigError> {
    if args.edit && (!args.set.is_empty() || args.print) {
        return Err(ConfigError::Validation(
            "--edit cannot be combined with --set or --print".into(),
        ));
    }

    let mut config = Config::load_or_create(paths)?;

    if args.edit {
        edit_config(paths)?;
        config = Config::load(paths)?;
        config.validate()?;
        return Ok(());
    }

    if !args.set.is_empty() {
        for assignment in &args.set {
            apply_set(&mut config, assignment)?;
        }
        config.validate()?;
        Config::write(paths, &config)?;
    }

    if args.print || args.set.is_empty() {
        let redacted = config.redacted();
        let output = toml::to_string_pretty(&redacted)?;
        println!("{output}");
    }

    Ok(())
}

fn edit_config(paths: &ConfigPaths) -> Result<(), ConfigError> {
    let editor = std::env::var("EDITOR")
        .map_err(|_| ConfigError::Validation("$EDITOR not set; use --set or set EDITOR".into()))?;
    let parts = split_editor_command(&editor)?;
    let (program, args) = parts
        .split_first()
        .ok_or_else(|| ConfigError::Validation("$EDITOR is empty".into()))?;
    let status = Command::new(program)
        .args(args)
        .arg(&paths.config_path)
        .status()
        .map_err(ConfigError::Io)?;
    if !status.success() {
        return Err(ConfigError::Validation(
            "editor exited with a non-zero status".into(),
        ));
    }
    Ok(())
}

fn split_editor_command(editor: &str) -> Result<Vec<String>, ConfigError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut chars = editor.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' if !in_double => {
                in_single = !in_single;
            }
            '"' if !in_single => {
                in_double = !in_double;
            }
            '\\' if !in_single => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ch if ch.is_whitespace() && !in_single && !in_double => {
                if !current.is_empty() {
                    parts.push(current.clone());
                    current.clear();
                }
            }
            _ => current.push(ch),
        }
    }

    if in_single || in_double {
        return Err(ConfigError::Validation(
            "$EDITOR has unmatched quotes".into(),
        ));
    }
    if !current.is_empty() {
        parts.push(current);
    }

    if parts.is_empty() {
        return Err(ConfigError::Validation("$EDITOR is empty".into()));
    }

    Ok(parts)
}

fn apply_set(config: &mut Config, assignment: &str) -> Result<(), ConfigError> {
    let (key, value) = assignment
        .split_once('=')
        .ok_or_else(|| ConfigError::Validation("expected key=value for --set".into()))?;
    let value = value.trim();
    match key {
        "auth.api_key" => {
            config.auth.api_key = value.to_string();
        }
        "transcribe.model" => {
            config.transcribe.model = value.to_string();
        }
        "transcribe.language" => {
            config.transcribe.language = value.to_string();
        }
        "transcribe.window_secs" => {
            config.transcribe.window_secs = parse_u64(value, key)?;
        }
        "generate.model" => {
            config.generate.model = value.to_string();
        }
        "generate.temperature" => {
            config.generate.temperature = parse_f32(value, key)?;
        }
        "generate.max_tokens" => {
            config.generate.max_tokens = parse_u32(value, key)?;
        }
        "generate.summary_words_min" => {
            config.generate.summary_words_min = parse_usize(value, key)?;
        }
        "generate.summary_words_max" => {
            config.generate.summary_words_max = parse_usize(value, key)?;
        }
        "generate.questions" => {
            config.generate.questions = parse_usize(value, key)?;
        }
        "generate.flashcards" => {
            config.generate.flashcards = parse_usize(value, key)?;
        }
        "generate.glossary" => {
            config.generate.glossary = parse_usize(value, key)?;
        }
        "generate.chunk_chars" => {
            config.generate.chunk_chars = parse_usize(value, key)?;
        }
        "output.dir" => {
            config.output.dir = value.to_string();
        }
        _ => {
            return Err(ConfigError::Validation(format!(
                "unknown config key: {key}"
            )));
        }
    }
    Ok(())
}

fn parse_u32(value: &str, key: &str) -> Result<u32, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Validation(format!("{key} expects an unsigned integer")))
}

fn parse_u64(value: &str, key: &str) -> Result<u64, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Validation(format!("{key} expects an unsigned integer")))
}

fn parse_usize(value: &str, key: &str) -> Result<usize, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Validation(format!("{key} expects an unsigned integer")))
}

fn parse_f32(value: &str, key: &str) -> Result<f32, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Validation(format!("{key} expects a number")))
}
