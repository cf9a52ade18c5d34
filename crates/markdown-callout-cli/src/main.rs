use anyhow::{anyhow, Context, Result};
use clap::Parser;
use markdown_callout::{split_front_matter, Engine};
use markdown_callout_config::{Config, LoadOptions};
use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Render Liquid/Markdown documents with callout blocks", long_about = None)]
struct Cli {
    /// Document to render ('-' reads stdin)
    #[arg(value_name = "FILE", required_unless_present = "list_tags")]
    file: Option<PathBuf>,

    /// Write the rendered document to PATH instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Use this config file on top of the discovered ones
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Template global, repeatable; overrides [variables] from config
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    vars: Vec<(String, String)>,

    /// Copy the document's front matter to the output unchanged
    #[arg(long)]
    keep_front_matter: bool,

    /// Print the registered block tags and exit
    #[arg(long)]
    list_tags: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut options = LoadOptions::default();
    if let Some(path) = &cli.config {
        options = options.with_override_path(path);
    }
    let config = Config::load(options).context("Failed to load configuration")?;
    info!(
        layers = config.sources.layers.len(),
        "configuration resolved"
    );

    let engine = Engine::new(&config.markdown).context("Failed to initialise template engine")?;

    if cli.list_tags {
        let listing: String = engine
            .registry()
            .names()
            .map(|name| format!("{name}\n"))
            .collect();
        return emit(cli.output.as_deref(), &listing);
    }

    let path = cli
        .file
        .as_ref()
        .ok_or_else(|| anyhow!("No input document given"))?;
    let source = read_source(path)
        .with_context(|| format!("Unable to read document: {}", path.display()))?;

    let mut globals = config.variables.clone();
    globals.extend(cli.vars.iter().cloned());

    let split = split_front_matter(&source);
    let rendered = engine
        .render(split.body, &globals)
        .with_context(|| format!("Failed to render {}", path.display()))?;
    info!(path = %path.display(), "document rendered");

    let output = match split.front_matter {
        Some(front_matter) if cli.keep_front_matter => format!("{front_matter}{rendered}"),
        _ => rendered,
    };

    emit(cli.output.as_deref(), &output)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

fn read_source(path: &Path) -> io::Result<String> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        io::stdin().lock().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        fs::read_to_string(path)
    }
}

fn emit(output: Option<&Path>, contents: &str) -> Result<()> {
    if let Some(path) = output {
        return fs::write(path, contents)
            .with_context(|| format!("Failed to write output: {}", path.display()));
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match handle.write_all(contents.as_bytes()) {
        Ok(_) => {}
        Err(err) if should_ignore_pipe_error(&err) => return Ok(()),
        Err(err) => return Err(err).context("Failed to write to stdout"),
    }

    match handle.flush() {
        Ok(_) => Ok(()),
        Err(err) if should_ignore_pipe_error(&err) => Ok(()),
        Err(err) => Err(err).context("Failed to flush stdout"),
    }
}

fn should_ignore_pipe_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::WouldBlock
    )
}
