//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use readwatch_api::ApiClient;
use readwatch_core::{
    AcceptOutcome, Coordinator, CoordinatorHandle, ReviewOutcome, ReviewSession, TabHost,
};
use readwatch_inference::{InferenceEngine, ModelLoader, OpenAiCompatEngine};
use readwatch_observer::PageSnapshot;
use readwatch_shared::{
    AppConfig, ContentDraft, LocalStore, Settings, init_config, load_config, local_store_path,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// User-Agent string for page fetches.
const USER_AGENT: &str = concat!("ReadWatch/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ReadWatch — spot articles and videos worth keeping.
#[derive(Parser)]
#[command(
    name = "readwatch",
    version,
    about = "Classify pages, summarize drafts and save articles and videos to your reading list.",
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
    /// Sign in and store the session token locally.
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "READWATCH_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and sign in.
    Register {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "READWATCH_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session.
    Logout,

    /// Show or change analysis settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Fetch a page and print its article/video verdict.
    Classify {
        url: String,

        /// Also print the extracted draft as JSON.
        #[arg(long)]
        extract: bool,
    },

    /// Review a page: classify, summarize, then accept or discard.
    Review { url: String },

    /// Read tab events as JSON lines on stdin and print notifications.
    Watch,

    /// List saved content.
    Saved {
        /// Show the public feed instead of your own list.
        #[arg(long)]
        feed: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Settings subcommands.
#[derive(Subcommand)]
pub(crate) enum SettingsAction {
    /// Print the current settings.
    Show,
    /// Change one or both settings.
    Set {
        /// Analyze pages in the background while browsing.
        #[arg(long)]
        auto_analyze: Option<bool>,

        /// Save new content as public.
        #[arg(long)]
        default_public: Option<bool>,
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

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout stays
/// free for command output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "readwatch=info",
        1 => "readwatch=debug",
        _ => "readwatch=trace",
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
    match cli.command {
        Command::Login { email, password } => cmd_login(&email, &password).await,
        Command::Register {
            username,
            email,
            password,
        } => cmd_register(&username, &email, &password).await,
        Command::Logout => cmd_logout(),
        Command::Settings { action } => match action {
            SettingsAction::Show => cmd_settings_show(),
            SettingsAction::Set {
                auto_analyze,
                default_public,
            } => cmd_settings_set(auto_analyze, default_public),
        },
        Command::Classify { url, extract } => cmd_classify(&url, extract).await,
        Command::Review { url } => cmd_review(&url).await,
        Command::Watch => crate::watch::run(load_config()?, open_store()?).await,
        Command::Saved { feed } => cmd_saved(feed).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub(crate) fn open_store() -> Result<Arc<LocalStore>> {
    Ok(Arc::new(LocalStore::open_default()?))
}

pub(crate) fn http_client(config: &AppConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(config.backend.timeout_secs))
        .build()
        .map_err(|e| eyre!("failed to build HTTP client: {e}"))
}

/// GET a page and return its HTML.
pub(crate) async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| eyre!("failed to fetch {url}: {e}"))?;

    let status = response.status();
    if !status.is_success() {
        return Err(eyre!("GET {url} returned {status}"));
    }
    Ok(response.text().await?)
}

/// Start loading the inference engine in the background. Readiness is
/// reported to the coordinator when the load settles.
pub(crate) fn start_model_loading(
    config: &AppConfig,
    coordinator: &CoordinatorHandle,
    show_progress: bool,
) -> Result<(Arc<dyn InferenceEngine>, JoinHandle<bool>)> {
    let engine: Arc<dyn InferenceEngine> = Arc::new(OpenAiCompatEngine::new(&config.inference)?);

    let bar = if show_progress {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} Loading model {percent}%")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    } else {
        ProgressBar::hidden()
    };

    let progress_bar = bar.clone();
    let coordinator = coordinator.clone();
    let loader = ModelLoader::spawn(
        engine.clone(),
        move |fraction| progress_bar.set_position((fraction * 100.0).round() as u64),
        move |ready| {
            bar.finish_and_clear();
            coordinator.model_ready(ready);
        },
    );

    Ok((engine, loader))
}

fn print_draft(draft: &ContentDraft) {
    println!();
    println!("  {} [{}]", draft.title, draft.content_type);
    println!("  Source: {}", draft.source);
    println!("  URL:    {}", draft.url);
    if let Some(thumbnail) = &draft.thumbnail {
        println!("  Thumb:  {thumbnail}");
    }
    if let Some(summary) = &draft.summary {
        println!();
        println!("  {summary}");
    }
    println!();
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_login(email: &str, password: &str) -> Result<()> {
    let config = load_config()?;
    let store = open_store()?;
    let api = ApiClient::new(&config.backend)?;

    let auth = api.login(email, password).await?;
    let username = auth.user.username.clone();
    store.set_auth(auth.token, auth.user)?;

    info!(%username, "logged in");
    println!("Logged in as {username}");
    Ok(())
}

async fn cmd_register(username: &str, email: &str, password: &str) -> Result<()> {
    let config = load_config()?;
    let store = open_store()?;
    let api = ApiClient::new(&config.backend)?;

    let auth = api.register(username, email, password).await?;
    store.set_auth(auth.token, auth.user)?;

    println!("Registered and logged in as {username}");
    Ok(())
}

fn cmd_logout() -> Result<()> {
    let store = open_store()?;
    store.clear_auth()?;
    println!("Logged out");
    Ok(())
}

fn cmd_settings_show() -> Result<()> {
    let store = open_store()?;
    let settings = store.settings();
    println!("auto_analyze   = {}", settings.auto_analyze);
    println!("default_public = {}", settings.default_public);
    match store.user() {
        Some(user) => println!("user           = {}", user.username),
        None => println!("user           = (not logged in)"),
    }
    Ok(())
}

fn cmd_settings_set(auto_analyze: Option<bool>, default_public: Option<bool>) -> Result<()> {
    if auto_analyze.is_none() && default_public.is_none() {
        return Err(eyre!("nothing to change: pass --auto-analyze and/or --default-public"));
    }

    let store = open_store()?;
    let current = store.settings();
    let settings = Settings {
        auto_analyze: auto_analyze.unwrap_or(current.auto_analyze),
        default_public: default_public.unwrap_or(current.default_public),
    };
    store.set_settings(settings)?;

    info!(?settings, "settings updated");
    println!("Settings saved");
    Ok(())
}

async fn cmd_classify(url: &str, extract: bool) -> Result<()> {
    let config = load_config()?;
    let client = http_client(&config)?;
    let html = fetch_page(&client, url).await?;

    let snapshot = PageSnapshot::new(url, html)?;
    let verdict = snapshot.classify();
    println!("article: {}", verdict.is_article);
    println!("video:   {}", verdict.is_video);

    if extract {
        match verdict.preferred_type() {
            Some(content_type) => {
                let draft = snapshot.extract(content_type);
                println!("{}", serde_json::to_string_pretty(&draft)?);
            }
            None => println!("nothing to extract"),
        }
    }
    Ok(())
}

async fn cmd_review(url: &str) -> Result<()> {
    let config = load_config()?;
    let store = open_store()?;
    if !store.is_authenticated() {
        warn!("not logged in; drafts can be reviewed but not saved");
    }

    let client = http_client(&config)?;
    let html = fetch_page(&client, url).await?;

    let host = Arc::new(TabHost::new(
        store.clone(),
        config.coordinator.probe_timeout(),
    ));
    let (coordinator, task) = Coordinator::spawn(host.clone(), store.clone(), &config.coordinator);
    host.connect(coordinator.clone());

    let (engine, loader) = start_model_loading(&config, &coordinator, true)?;
    host.open_tab(url, html).await?;

    // The load is bounded by the engine's own timeout; a failure only
    // degrades the summary.
    let ready = loader.await.unwrap_or(false);
    info!(ready, "model load settled");

    let api = Arc::new(ApiClient::new(&config.backend)?);
    let mut session = ReviewSession::new(host.clone(), coordinator.clone(), engine, api, store);

    match session.open().await {
        ReviewOutcome::Ready => review_prompt(&mut session).await?,
        ReviewOutcome::NoContent => println!("No article or video found on this page."),
        ReviewOutcome::Stale => println!("The page changed during review; nothing to show."),
    }

    coordinator.shutdown();
    let _ = task.await;
    Ok(())
}

/// Accept/discard loop for a ready draft.
async fn review_prompt(session: &mut ReviewSession) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let Some(draft) = session.draft() else {
            return Ok(());
        };
        print_draft(draft);
        print!("[a]ccept / [d]iscard / [q]uit: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        match line.trim() {
            "a" | "accept" => match session.accept().await {
                AcceptOutcome::Saved(record) => {
                    println!("Saved \"{}\" ({})", record.title, record.id);
                    return Ok(());
                }
                AcceptOutcome::Failed { message } => println!("Save failed: {message}"),
                AcceptOutcome::NothingToSave => return Ok(()),
            },
            "d" | "discard" => {
                session.discard().await;
                println!("Discarded");
                return Ok(());
            }
            "q" | "quit" => return Ok(()),
            other => println!("unknown choice '{other}'"),
        }
    }
}

async fn cmd_saved(feed: bool) -> Result<()> {
    let config = load_config()?;
    let store = open_store()?;
    let token = store
        .token()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| eyre!("not logged in: run `readwatch login` first"))?;
    let api = ApiClient::new(&config.backend)?;

    let items = if feed {
        api.feed(&token).await?
    } else {
        api.my_content(&token).await?
    };

    if items.is_empty() {
        println!("Nothing saved yet.");
        return Ok(());
    }
    for item in &items {
        let visibility = if item.is_public { "public" } else { "private" };
        println!("  {} [{}, {visibility}]", item.title, item.content_type);
        println!("    {}", item.url);
    }
    println!();
    println!("  {} item(s)", items.len());
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    println!("# local store: {}", local_store_path()?.display());
    Ok(())
}
