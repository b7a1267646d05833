//! SuperExpat CLI entry point.
//!
//! Terminal stand-in for the mobile screens: catalog listings, the onboarding
//! wizard, and the assistant chat REPL.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;

use superexpat::catalog::{self, CATEGORIES};
use superexpat::config::{load_config, runtime_paths, Config, RuntimePaths};
use superexpat::credentials::{
    enforce_private_file_permissions, load_default_credentials, CredentialSecrets,
    SecretProvider, OPENROUTER_API_KEY,
};
use superexpat::onboarding::{DemoGate, Onboarding, Plan};
use superexpat::profile::{
    AgeGroup, PersonalSituation, PlannedDuration, ProfessionalStatus, UserProfile,
};
use superexpat::providers::openrouter::OpenRouterProvider;
use superexpat::session::{AssistantSession, SessionOptions, SubmitError};
use superexpat::store::{self, FileStore, ProfileStore};

/// SuperExpat, your expatriation assistant.
#[derive(Parser)]
#[command(name = "superexpat", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Create `~/.superexpat` with a template config and credentials file.
    Init,
    /// List supported destinations.
    Countries {
        /// Only show countries whose name contains this text.
        #[arg(long)]
        search: Option<String>,
    },
    /// List chat topics and their suggested questions.
    Categories,
    /// Walk through destination, profile, paywall and topic selection.
    Onboard,
    /// Chat with the assistant.
    Chat {
        /// Override the stored destination (country code, e.g. NL).
        #[arg(long)]
        country: Option<String>,
        /// Override the stored topic (category key, e.g. cost_of_living).
        #[arg(long)]
        category: Option<String>,
    },
}

type StdinLines = Lines<BufReader<Stdin>>;

const CONFIG_TEMPLATE: &str = r#"[assistant]
model = "openai/gpt-3.5-turbo"
base_url = "https://openrouter.ai/api/v1/chat/completions"
timeout_secs = 60

[logging]
level = "info"
"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let paths = runtime_paths()?;

    match cli.command {
        Command::Init => {
            superexpat::logging::init_cli("info");
            handle_init(&paths)
        }
        Command::Countries { search } => {
            handle_countries(search.as_deref());
            Ok(())
        }
        Command::Categories => {
            handle_categories();
            Ok(())
        }
        Command::Onboard => {
            let config = load_config(&paths.config_toml)?;
            superexpat::logging::init_cli(&config.logging.level);
            handle_onboard(&config, &paths).await
        }
        Command::Chat { country, category } => {
            let config = load_config(&paths.config_toml)?;
            let _logging_guard =
                superexpat::logging::init_production(&paths.logs_dir, &config.logging.level)?;
            handle_chat(&config, &paths, country.as_deref(), category.as_deref()).await
        }
    }
}

/// Create the runtime directory, template config and private `.env`.
fn handle_init(paths: &RuntimePaths) -> anyhow::Result<()> {
    std::fs::create_dir_all(&paths.root)
        .with_context(|| format!("failed to create {}", paths.root.display()))?;

    if paths.config_toml.exists() {
        info!(path = %paths.config_toml.display(), "config already present, leaving it");
    } else {
        std::fs::write(&paths.config_toml, CONFIG_TEMPLATE)
            .with_context(|| format!("failed to write {}", paths.config_toml.display()))?;
        println!("wrote {}", paths.config_toml.display());
    }

    if !paths.env_file.exists() {
        std::fs::write(&paths.env_file, format!("{OPENROUTER_API_KEY}=\n"))
            .with_context(|| format!("failed to write {}", paths.env_file.display()))?;
        println!(
            "wrote {} (add your {OPENROUTER_API_KEY})",
            paths.env_file.display()
        );
    }
    enforce_private_file_permissions(&paths.env_file)?;

    Ok(())
}

fn handle_countries(search: Option<&str>) {
    for country in catalog::search_countries(search.unwrap_or_default()) {
        println!("{} {}  {}", country.flag, country.code, country.name);
    }
}

fn handle_categories() {
    for category in CATEGORIES {
        println!("{} {} ({})", category.icon, category.label, category.key);
        for question in category.suggested_questions {
            println!("    - {question}");
        }
    }
}

/// Interactive onboarding on stdin.
async fn handle_onboard(config: &Config, paths: &RuntimePaths) -> anyhow::Result<()> {
    let store: Arc<dyn ProfileStore> = Arc::new(FileStore::new(config.state_file(paths)));
    let mut wizard = Onboarding::new(store, Arc::new(DemoGate));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    wizard.start()?;

    println!("Choose your destination:");
    handle_countries(None);
    let country = loop {
        let Some(code) = read_line(&mut lines, "country code> ").await? else {
            return Ok(());
        };
        match wizard.select_country(&code).await {
            Ok(country) => break country,
            Err(e) => println!("{e}"),
        }
    };
    println!("{} {} selected", country.flag, country.name);

    println!("Help SuperExpat assist you better! (press enter to skip a question)");
    let profile = UserProfile {
        age_group: ask_choice(
            &mut lines,
            "Age group",
            &[
                ("18-24", AgeGroup::From18To24),
                ("25-34", AgeGroup::From25To34),
                ("35-44", AgeGroup::From35To44),
                ("45-60", AgeGroup::From45To60),
                ("60+", AgeGroup::Over60),
            ],
        )
        .await?,
        personal_situation: ask_choice(
            &mut lines,
            "Personal situation",
            &[
                ("Single", PersonalSituation::Single),
                ("Couple", PersonalSituation::Couple),
                ("Family", PersonalSituation::Family),
            ],
        )
        .await?,
        professional_status: ask_choice(
            &mut lines,
            "Professional status",
            &[
                ("Student", ProfessionalStatus::Student),
                ("Employed", ProfessionalStatus::Employed),
                ("Self-employed", ProfessionalStatus::SelfEmployed),
                ("Retired", ProfessionalStatus::Retired),
            ],
        )
        .await?,
        duration: ask_choice(
            &mut lines,
            "Planned duration of expatriation",
            &[
                ("Short-term", PlannedDuration::ShortTerm),
                ("Long-term", PlannedDuration::LongTerm),
                ("Permanent", PlannedDuration::Permanent),
            ],
        )
        .await?,
        main_concerns: read_line(&mut lines, "Main concerns> ")
            .await?
            .unwrap_or_default(),
    };
    wizard.complete_profile(&profile).await?;

    println!("Ready to go SuperExpat PRO? Demo mode - no payment required.");
    wizard.pass_paywall(Plan::WeeklyTrial).await?;

    println!("What would you like to know?");
    for (i, category) in CATEGORIES.iter().enumerate() {
        println!(
            "  {} {} {} ({})",
            i.saturating_add(1),
            category.icon,
            category.label,
            category.key
        );
    }
    loop {
        let Some(answer) = read_line(&mut lines, "category> ").await? else {
            return Ok(());
        };
        let key = answer
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| CATEGORIES.get(i))
            .map_or(answer.as_str(), |c| c.key);
        match wizard.select_category(key).await {
            Ok(category) => {
                println!(
                    "{} {} selected. Run `superexpat chat` to start.",
                    category.icon, category.label
                );
                return Ok(());
            }
            Err(e) => println!("{e}"),
        }
    }
}

/// Chat REPL.
async fn handle_chat(
    config: &Config,
    paths: &RuntimePaths,
    country: Option<&str>,
    category: Option<&str>,
) -> anyhow::Result<()> {
    let store = FileStore::new(config.state_file(paths));
    let mut context = store::load_context(&store).await;

    if let Some(code) = country {
        let entry = catalog::country_by_code(code)
            .ok_or_else(|| anyhow::anyhow!("unknown country code '{code}'"))?;
        context.country = Some(entry.to_selection());
    }
    if let Some(key) = category {
        let entry = catalog::category_by_key(key)
            .ok_or_else(|| anyhow::anyhow!("unknown category '{key}'"))?;
        context.category = Some(entry.to_selection());
    }

    let secrets = CredentialSecrets::new(load_default_credentials()?);
    let api_key = secrets.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "no API key configured: set {OPENROUTER_API_KEY} in {} or the environment",
            paths.env_file.display()
        )
    })?;

    let provider = OpenRouterProvider::with_base_url(
        config.assistant.model.clone(),
        api_key,
        config.assistant.base_url.clone(),
    );
    let session = AssistantSession::new(
        context,
        Arc::new(provider),
        SessionOptions::from(&config.assistant),
    );

    println!(
        "SuperExpat Assistant. /suggest lists shortcuts, /N sends one, \
         /country CODE switches, /quit exits."
    );
    print_suggestions(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = read_line(&mut lines, "> ").await? {
        let reply = match parse_repl_line(&line) {
            ReplCommand::Quit => break,
            ReplCommand::Suggest => {
                print_suggestions(&session);
                continue;
            }
            ReplCommand::Country(code) => {
                match catalog::country_by_code(code) {
                    Some(entry) => {
                        session.switch_country(entry.to_selection());
                        println!("{} now chatting about {}", entry.flag, entry.name);
                    }
                    None => println!("unknown country code '{code}'"),
                }
                continue;
            }
            ReplCommand::Suggestion(index) => session.submit_suggestion(index).await,
            ReplCommand::Message(text) => session.submit(text).await,
        };

        match reply {
            Ok(turn) => println!("{}\n", turn.text),
            Err(SubmitError::EmptyInput) => {}
            Err(e) => println!("{e}"),
        }
    }

    Ok(())
}

/// One line typed into the chat REPL.
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Quit,
    Suggest,
    /// `/country CODE`; the code may be empty.
    Country(&'a str),
    /// `/N`, zero-based.
    Suggestion(usize),
    Message(&'a str),
}

fn parse_repl_line(line: &str) -> ReplCommand<'_> {
    match line {
        "/quit" | "/exit" => return ReplCommand::Quit,
        "/suggest" => return ReplCommand::Suggest,
        "/country" => return ReplCommand::Country(""),
        _ => {}
    }
    if let Some(code) = line.strip_prefix("/country ") {
        return ReplCommand::Country(code.trim());
    }
    match line
        .strip_prefix('/')
        .and_then(|n| n.parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1))
    {
        Some(index) => ReplCommand::Suggestion(index),
        None => ReplCommand::Message(line),
    }
}

fn print_suggestions(session: &AssistantSession) {
    for (i, question) in session.suggested_questions().iter().enumerate() {
        println!("  /{} {question}", i.saturating_add(1));
    }
}

async fn ask_choice<T: Copy>(
    lines: &mut StdinLines,
    label: &str,
    options: &[(&str, T)],
) -> anyhow::Result<Option<T>> {
    println!("{label}:");
    for (i, (name, _)) in options.iter().enumerate() {
        println!("  {} {name}", i.saturating_add(1));
    }
    let Some(answer) = read_line(lines, "> ").await? else {
        return Ok(None);
    };
    let picked = answer
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| options.get(i))
        .or_else(|| {
            options
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(&answer))
        })
        .map(|(_, value)| *value);
    Ok(picked)
}

/// Prompt and read one trimmed line; `None` at end of input.
async fn read_line(lines: &mut StdinLines, prompt: &str) -> anyhow::Result<Option<String>> {
    use std::io::Write;

    print!("{prompt}");
    std::io::stdout().flush().context("failed to flush stdout")?;
    let line = lines.next_line().await.context("failed to read stdin")?;
    Ok(line.map(|l| l.trim().to_owned()))
}
