//! Template Composer CLI
//!
//! Usage:
//!   template-composer [OPTIONS] <TEMPLATE>
//!
//! Options:
//!   -p, --template-path <DIR>  Template root (repeatable, searched in order)
//!   -c, --config <FILE>        Engine configuration file (TOML format)
//!   -o, --option <KEY=VALUE>   Render option (repeatable)
//!   -f, --format <FORMAT>      Output format (html, text, graph)
//!   -v, --verbose              Increase log verbosity
//!   -h, --help                 Print help

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use template_composer::{Engine, EngineConfig, Options, TemplateError};

#[derive(Parser)]
#[command(name = "template-composer")]
#[command(about = "Render hierarchical section templates")]
struct Cli {
    /// Logical path of the template to render, e.g. `default/class/html`
    template: String,

    /// Template root directory (repeatable, searched in order)
    #[arg(short = 'p', long = "template-path")]
    template_paths: Vec<PathBuf>,

    /// Engine configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Render option as KEY=VALUE; VALUE is read as TOML, falling back to a string
    #[arg(short = 'o', long = "option", value_parser = parse_option)]
    options: Vec<(String, toml::Value)>,

    /// Output format selecting the capability set
    #[arg(short, long)]
    format: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_option(raw: &str) -> Result<(String, toml::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("option key must not be empty".to_string());
    }
    let parsed = toml::from_str::<toml::Table>(&format!("value = {}", value))
        .ok()
        .and_then(|mut table| table.remove("value"))
        .unwrap_or_else(|| toml::Value::String(value.to_string()));
    Ok((key.to_string(), parsed))
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => match EngineConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };
    for path in cli.template_paths {
        config = config.with_template_path(path);
    }
    if config.template_paths.is_empty() {
        config = config.with_template_path(".");
    }

    let mut options = Options::new();
    for (key, value) in cli.options {
        options = options.with(key, value);
    }
    if let Some(format) = cli.format {
        options = options.with("format", format);
    }

    let engine = Engine::new(config);
    match engine.run(&cli.template, options) {
        Ok(output) => print!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", describe(&e));
            process::exit(1);
        }
    }
}

/// Syntax errors get a source excerpt when the file is still readable
fn describe(err: &TemplateError) -> String {
    match err {
        TemplateError::Syntax { file, .. } => match std::fs::read_to_string(file) {
            Ok(source) => err.report(&source),
            Err(_) => err.to_string(),
        },
        _ => err.to_string(),
    }
}
