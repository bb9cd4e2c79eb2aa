//! CLI command definitions, routing, and tracing setup.

use std::io::Write as _;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};

use bookforge_core::pipeline::{
    self, GenerateConfig, GenerateResult, ProgressReporter, TocReady,
};
use bookforge_openai::{ChatClient, ImageClient};
use bookforge_research::Researcher;
use bookforge_shared::{AppConfig, TableOfContents, init_config, load_config, validate_api_keys};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// BookForge — generate a reviewed, research-backed e-book from a topic.
#[derive(Parser)]
#[command(
    name = "bookforge",
    version,
    about = "Generate an e-book (TOC, chapters, optional artwork) from a topic.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate a new e-book for the given topic.
    Generate {
        /// Book topic (at least 5 characters).
        topic: String,

        /// Generate cover and chapter artwork.
        #[arg(long)]
        images: bool,

        /// Output directory (defaults to the configured output_dir).
        #[arg(short, long)]
        out: Option<String>,

        /// Skip the TOC review pause and generate immediately.
        #[arg(long)]
        skip_review: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate {
            topic,
            images,
            out,
            skip_review,
        } => cmd_generate(&topic, images, out.as_deref(), skip_review).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// generate
// ---------------------------------------------------------------------------

async fn cmd_generate(
    topic: &str,
    images_flag: bool,
    out: Option<&str>,
    skip_review: bool,
) -> Result<()> {
    // Missing credentials are fatal before any work starts.
    let config = load_config()?;
    validate_api_keys(&config)?;

    let generate_images = images_flag || config.defaults.generate_images;

    let search_key = std::env::var(&config.search.api_key_env)?;
    let openai_key = std::env::var(&config.openai.api_key_env)?;

    let researcher = Researcher::new(&config.search.endpoint, search_key)?;
    let chat = ChatClient::new(
        openai_key.clone(),
        config.openai.text_model.clone(),
        config.openai.max_tokens,
        config.openai.temperature,
    )?;
    let image = if generate_images {
        Some(ImageClient::new(
            openai_key,
            config.openai.image_model.clone(),
        )?)
    } else {
        None
    };

    let output_root = match out {
        Some(p) => PathBuf::from(p),
        None => expand_home(&config.defaults.output_dir),
    };

    let gen_config = GenerateConfig {
        topic: topic.to_string(),
        output_root,
        generate_images,
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    info!(topic, generate_images, "starting book generation");

    let reporter = CliProgress::new();
    let TocReady { project } = pipeline::start(&gen_config, &researcher, &chat, &reporter).await?;
    reporter.suspend();

    // Review suspension point: the TOC goes to disk as editable text and
    // generation resumes only after the user confirms.
    let toc_path = project.folder.join("toc.txt");
    std::fs::write(&toc_path, project.toc.to_text())
        .map_err(|e| eyre!("cannot write {}: {e}", toc_path.display()))?;

    println!();
    println!("  Table of contents:");
    for entry in &project.toc.entries {
        println!("    {entry}");
    }
    println!();

    let edited_toc = if skip_review {
        project.toc.clone()
    } else {
        println!(
            "  Review and edit {} as needed, then press Enter to continue.",
            toc_path.display()
        );
        print!("  > ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;

        let edited = std::fs::read_to_string(&toc_path)
            .map_err(|e| eyre!("cannot read {}: {e}", toc_path.display()))?;
        TableOfContents::from_text(&edited)
    };

    let reporter = CliProgress::new();
    let result = pipeline::resume(
        project,
        edited_toc,
        &gen_config,
        &chat,
        image.as_ref(),
        &reporter,
    )
    .await?;

    // Print summary
    println!();
    println!("  Book generated successfully!");
    println!("  ID:       {}", result.book_id);
    println!("  Chapters: {}", result.chapter_count);
    if generate_images {
        println!("  Images:   {}", result.images_written);
    }
    println!("  File:     {}", result.book_path.display());
    println!("  Folder:   {}", result.folder.display());
    println!("  Time:     {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

/// Expand a leading `~/` against the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif bar.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30}] {pos:>3}% {msg}")
                .unwrap()
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }

    /// Clear the bar at the review pause so the prompt renders cleanly.
    fn suspend(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn percent(&self, value: f64) {
        self.bar.set_position(value.round() as u64);
    }

    fn chapter_written(&self, title: &str, current: usize, total: usize) {
        self.bar
            .set_message(format!("Wrote [{current}/{total}] {title}"));
    }

    fn done(&self, _result: &GenerateResult) {
        self.bar.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
