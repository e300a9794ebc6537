//! CLI command definitions, routing, and tracing setup.

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use jbooknav_contents::ContentsClient;
use jbooknav_core::book::{ConfigValidation, try_load_book_config};
use jbooknav_core::{
    DocumentOpener, FixedBrowser, Navigator, OpenOutcome, TocFragment, TocNode, TocTree,
    extract_book_author, extract_book_title, extract_title, reconcile,
};
use jbooknav_shared::{AppConfig, ServerSettings, ViewMode, init_config, load_config};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// jbook-nav: table-of-contents navigation for unbuilt Jupyter Books.
#[derive(Parser)]
#[command(
    name = "jbook-nav",
    version,
    about = "Navigate a cloned, unbuilt Jupyter Book through a running Jupyter server.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Jupyter server base URL (overrides the config file).
    #[arg(long, env = "JBOOKNAV_BASE_URL", global = true)]
    pub base_url: Option<String>,

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
    /// Show the table of contents for a browser directory.
    Toc {
        /// Directory the file browser is in, relative to the server root.
        #[arg(short, long, default_value = "")]
        browser_path: String,

        /// Expand every subsection.
        #[arg(long)]
        all: bool,

        /// Print the parsed tree as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Open a book entry and report its metadata.
    Open {
        /// Book-relative file path (as in data-file-path).
        file: String,

        /// Directory the file browser is in, relative to the server root.
        #[arg(short, long)]
        browser_path: String,

        /// Book root as the server reports it. Fetched from the TOC if omitted.
        #[arg(long)]
        book_dir: Option<String>,

        /// Print the outcome as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Extract the title of a notebook or Markdown file.
    Title {
        /// Server-relative path.
        path: String,
    },

    /// Show book title and author from a _config.yml.
    Book {
        /// Server-relative path to the config file.
        config_path: String,
    },

    /// List a directory through the contents API.
    Ls {
        /// Server-relative directory path.
        #[arg(default_value = "")]
        path: String,
    },

    /// Reconcile a book root with a browser path (no server needed).
    Resolve {
        /// Book root as reported by the server.
        book_root: String,
        /// File browser directory.
        browser_path: String,
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
        0 => "jbooknav=warn",
        1 => "jbooknav=info",
        2 => "jbooknav=debug",
        _ => "jbooknav=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let base_url = cli.base_url.as_deref();
    match cli.command {
        Command::Toc {
            browser_path,
            all,
            json,
        } => cmd_toc(base_url, &browser_path, all, json).await,
        Command::Open {
            file,
            browser_path,
            book_dir,
            json,
        } => cmd_open(base_url, &file, &browser_path, book_dir.as_deref(), json).await,
        Command::Title { path } => cmd_title(base_url, &path).await,
        Command::Book { config_path } => cmd_book(base_url, &config_path).await,
        Command::Ls { path } => cmd_ls(base_url, &path).await,
        Command::Resolve {
            book_root,
            browser_path,
        } => cmd_resolve(&book_root, &browser_path),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(base_url),
        },
    }
}

// ---------------------------------------------------------------------------
// Host stand-ins
// ---------------------------------------------------------------------------

/// Opens documents by printing them; the terminal is the host.
struct StdoutOpener;

impl DocumentOpener for StdoutOpener {
    fn open_or_reveal(&self, path: &str, view: ViewMode) -> jbooknav_shared::Result<()> {
        eprintln!("  open {path} [{view}]");
        Ok(())
    }
}

fn build_client(base_url: Option<&str>) -> Result<(AppConfig, ContentsClient)> {
    let config = load_config()?;
    let settings = ServerSettings::from_config(&config, base_url)?;
    info!(base_url = %settings.base_url, token = settings.token.is_some(), "connecting");
    let client = ContentsClient::new(settings)?;
    Ok((config, client))
}

fn build_navigator(
    base_url: Option<&str>,
    browser_path: &str,
) -> Result<Navigator<FixedBrowser, StdoutOpener>> {
    let (config, client) = build_client(base_url)?;
    let browser = FixedBrowser(browser_path.to_string());
    Ok(Navigator::new(client, Some(browser), StdoutOpener)
        .with_config_file(config.extension.config_file))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_toc(base_url: Option<&str>, browser_path: &str, all: bool, json: bool) -> Result<()> {
    let nav = build_navigator(base_url, browser_path)?;

    let fragment = nav.load_toc().await.ok_or_else(|| {
        eyre!("could not load the table of contents; is the jupyterlab_jupyterbook_navigation server extension installed?")
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&fragment)?);
        return Ok(());
    }

    match fragment {
        TocFragment::NotABook { message } => println!("{message}"),
        TocFragment::Book(tree) => print_tree(&tree, all),
    }
    Ok(())
}

fn print_tree(tree: &TocTree, all: bool) {
    println!();
    println!("  {}", tree.title.as_deref().unwrap_or("(untitled)"));
    if let Some(author) = &tree.author {
        println!("  Author: {author}");
    }
    println!("  Root:   {}", tree.book_dir);
    println!();
    print_nodes(&tree.nodes, all);
    println!();
}

fn print_nodes(nodes: &[TocNode], all: bool) {
    for node in nodes {
        match node {
            TocNode::Caption { text } => println!("  {text}"),
            TocNode::Link { title, url, level } => {
                println!("{}  {title} <{url}>", indent(*level));
            }
            TocNode::Entry(entry) => {
                let marker = match entry.chevron() {
                    Some(_) if all || entry.expanded => "▾",
                    Some(_) => "▸",
                    None => " ",
                };
                println!(
                    "{}{marker} [{}] {}  ({})",
                    indent(entry.level),
                    entry.id,
                    entry.title,
                    entry.file_path.as_deref().unwrap_or("?")
                );
                if all || entry.expanded {
                    print_nodes(&entry.children, all);
                }
            }
        }
    }
}

fn indent(level: u32) -> String {
    "  ".repeat(level as usize)
}

async fn cmd_open(
    base_url: Option<&str>,
    file: &str,
    browser_path: &str,
    book_dir: Option<&str>,
    json: bool,
) -> Result<()> {
    let nav = build_navigator(base_url, browser_path)?;

    let book_dir = match book_dir {
        Some(dir) => dir.to_string(),
        None => match nav.load_toc().await {
            Some(TocFragment::Book(tree)) => tree.book_dir,
            Some(TocFragment::NotABook { message }) => return Err(eyre!("{message}")),
            None => return Err(eyre!("could not load the table of contents to find the book root")),
        },
    };

    info!(file, browser_path, %book_dir, "opening entry");

    match nav.open_file(&book_dir, file).await {
        OpenOutcome::Aborted(e) => Err(eyre!("open aborted: {e}")),
        OpenOutcome::Opened { target, metadata } => {
            if json {
                let out = serde_json::json!({ "target": target, "metadata": metadata });
                println!("{}", serde_json::to_string_pretty(&out)?);
                return Ok(());
            }

            println!();
            println!("  Path:   {}", target.path);
            println!("  View:   {}", target.view);
            if let Some(meta) = metadata {
                println!("  Title:  {}", meta.title);
                println!("  Book:   {}", meta.book_title);
                println!("  Author: {}", meta.author);
                if let Some(listing) = meta.listing {
                    println!("  Files:  {}", listing.entries().len());
                }
            }
            println!();
            Ok(())
        }
    }
}

async fn cmd_title(base_url: Option<&str>, path: &str) -> Result<()> {
    let (_, client) = build_client(base_url)?;
    println!("{}", extract_title(&client, path).await);
    Ok(())
}

async fn cmd_book(base_url: Option<&str>, config_path: &str) -> Result<()> {
    let (_, client) = build_client(base_url)?;

    let (title, author) = tokio::join!(
        extract_book_title(&client, config_path),
        extract_book_author(&client, config_path),
    );
    println!("  Title:  {title}");
    println!("  Author: {author}");

    // Say why, when the extractors could only return their sentinels.
    if let Ok(ConfigValidation::Invalid(reason)) = try_load_book_config(&client, config_path).await
    {
        println!("  Config: {reason}");
    }
    Ok(())
}

async fn cmd_ls(base_url: Option<&str>, path: &str) -> Result<()> {
    let (_, client) = build_client(base_url)?;

    let listing = client
        .list_directory(path)
        .await
        .ok_or_else(|| eyre!("could not list '{path}'"))?;

    for entry in listing.entries() {
        let suffix = if entry.kind == "directory" { "/" } else { "" };
        println!("{}{suffix}", entry.name);
    }
    Ok(())
}

fn cmd_resolve(book_root: &str, browser_path: &str) -> Result<()> {
    let resolved = reconcile(book_root, browser_path)?;
    println!("{resolved}");
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(base_url: Option<&str>) -> Result<()> {
    let mut config: AppConfig = load_config()?;
    if let Some(url) = base_url {
        config.server.base_url = url.to_string();
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
