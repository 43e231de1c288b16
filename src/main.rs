//! # MamaGuide CLI
//!
//! Pregnancy guidance from a curated knowledge base, with an optional
//! AI assistant grounded in it.
//!
//! Usage:
//!   mamaguide serve                      # Start the HTTP API
//!   mamaguide ask "Is ibuprofen safe?"   # One-shot question
//!   mamaguide chat                       # Interactive conversation
//!   mamaguide search "car seat"          # Show retrieved sections
//!   mamaguide week 24                    # Guidance for a week
//!   mamaguide due-date 2026-09-01        # Save the due date

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mamaguide_assistant::{Answer, ChatAssistant, ChatSession, Provenance};
use mamaguide_core::config::MamaGuideConfig;
use mamaguide_knowledge::KnowledgeService;
use mamaguide_memory::SqliteStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "mamaguide",
    version,
    about = "🤰 MamaGuide: pregnancy guidance with a knowledge-grounded assistant"
)]
struct Cli {
    /// Config file (default: ~/.mamaguide/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP gateway
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Ask the assistant a question
    Ask {
        question: Vec<String>,
    },
    /// Interactive chat with the assistant
    Chat,
    /// Show the sections retrieval returns for a query
    Search {
        query: Vec<String>,
        #[arg(short = 'k', long)]
        limit: Option<usize>,
    },
    /// Guidance for a pregnancy week (defaults to the current week)
    Week {
        week: Option<u32>,
    },
    /// Medication safety lookup by drug or brand name
    Meds {
        name: String,
    },
    /// Warning signs matching a description, or all emergency signs
    Symptoms {
        sign: Option<String>,
    },
    /// List every flattened section id
    Sections,
    /// Show, set (YYYY-MM-DD) or clear the due date
    DueDate {
        date: Option<String>,
        #[arg(long, conflicts_with = "date")]
        clear: bool,
    },
    /// List the completion providers that can be configured
    Providers,
    /// Write a default config to ~/.mamaguide/config.toml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

fn load_config(path: Option<&str>) -> Result<MamaGuideConfig> {
    let config = match path {
        Some(p) => MamaGuideConfig::load_from(&expand_path(p))?,
        None => MamaGuideConfig::load()?,
    };
    Ok(config)
}

/// Build and fully initialize the knowledge service, waiting for indexing.
async fn knowledge(config: &MamaGuideConfig) -> Arc<KnowledgeService> {
    let embedder = match mamaguide_providers::create_embedder(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!("⚠️ Embedding service unavailable: {e}");
            None
        }
    };
    let service = Arc::new(KnowledgeService::from_config(config, embedder));
    service.initialize().await;
    service
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

fn print_answer(answer: &Answer) {
    let badge = match answer.provenance {
        Provenance::KnowledgeBase => "📚 From knowledge base",
        Provenance::AiGeneral => "🤖 General AI guidance",
        Provenance::Error => "⚠️ Error",
    };
    println!("{}\n\n{badge}", answer.content);
    if !answer.section_ids.is_empty() {
        println!("   sections: {}", answer.section_ids.join(", "));
    }
}

/// Read-eval loop over a chat session. A number picks a suggested question.
async fn run_chat(assistant: Arc<ChatAssistant>) -> Result<()> {
    let mut session = ChatSession::new(assistant);
    if let Some(greeting) = session.transcript().first() {
        println!("{}\n", greeting.content);
    }
    println!("Suggested questions:");
    for (i, question) in session.suggested_questions().iter().enumerate() {
        println!("  {}. {question}", i + 1);
    }
    println!("\nType a question, a number, or 'exit'.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if matches!(input, "exit" | "quit") {
            break;
        }
        let question = input
            .parse::<usize>()
            .ok()
            .and_then(|n| session.suggestion(n))
            .unwrap_or(input);
        if question != input {
            println!("{question}");
        }
        if let Some(answer) = session.send(question).await {
            println!();
            print_answer(&answer);
        }
    }

    tracing::debug!("💬 Chat ended after {} turns", session.transcript().len());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "mamaguide=debug,mamaguide_knowledge=debug,mamaguide_assistant=debug,tower_http=debug"
    } else {
        "mamaguide=info,mamaguide_knowledge=info,mamaguide_gateway=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.gateway.port = port;
            }
            println!("🤰 MamaGuide v{}", env!("CARGO_PKG_VERSION"));
            println!("   API: http://{}:{}", config.gateway.host, config.gateway.port);
            mamaguide_gateway::start(&config).await?;
        }
        Command::Ask { question } => {
            let question = question.join(" ");
            let kb = knowledge(&config).await;
            let assistant = ChatAssistant::from_config(&config, kb);
            let answer = assistant.answer(&question).await;
            print_answer(&answer);
        }
        Command::Chat => {
            let kb = knowledge(&config).await;
            let assistant = Arc::new(ChatAssistant::from_config(&config, kb));
            if !assistant.has_provider() {
                println!("⚠️ No completion provider configured; answers will explain how to set one up.\n");
            }
            run_chat(assistant).await?;
        }
        Command::Search { query, limit } => {
            let kb = knowledge(&config).await;
            let limit = limit.unwrap_or(kb.config().top_k);
            let (sections, path) = kb.search(&query.join(" "), limit).await;
            println!("🔍 {} result(s) via {:?} search", sections.len(), path);
            for (i, section) in sections.iter().enumerate() {
                println!("\n{}. [{}]\n   {}", i + 1, section.id, section.content);
            }
        }
        Command::Week { week } => {
            let week = match week {
                Some(w) => w,
                None => {
                    let store = SqliteStore::from_config(&config.memory)?;
                    store.current_week(today())?
                }
            };
            let kb = KnowledgeService::from_config(&config, None);
            kb.initialize().await;
            match kb.week_info(week) {
                Some(info) => print_json(&info)?,
                None => println!("No guidance for week {week}"),
            }
        }
        Command::Meds { name } => {
            let kb = KnowledgeService::from_config(&config, None);
            kb.initialize().await;
            let meds = kb.check_medication_safety(&name);
            if meds.is_empty() {
                println!("No medication matching '{name}'. Ask your healthcare provider.");
            } else {
                print_json(&meds)?;
            }
        }
        Command::Symptoms { sign } => {
            let kb = KnowledgeService::from_config(&config, None);
            kb.initialize().await;
            let found = match sign {
                Some(sign) => kb.symptom_info(&sign),
                None => kb.emergency_symptoms(),
            };
            print_json(&found)?;
        }
        Command::Sections => {
            let kb = KnowledgeService::from_config(&config, None);
            kb.initialize().await;
            println!("📚 {} sections ({:?})", kb.section_count(), kb.state());
            for section in kb.sections() {
                println!("  {}", section.id);
            }
        }
        Command::DueDate { date, clear } => {
            let store = SqliteStore::from_config(&config.memory)?;
            if clear {
                store.clear_due_date()?;
                println!("🗑️ Due date cleared");
            } else if let Some(date) = date {
                let due = chrono::NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
                    .with_context(|| format!("invalid date '{date}', expected YYYY-MM-DD"))?;
                store.set_due_date(due)?;
                println!("📅 Due date set to {due} (week {})", store.current_week(today())?);
            } else {
                match store.due_date()? {
                    Some(due) => println!("📅 Due {due} (week {})", store.current_week(today())?),
                    None => println!("No due date set"),
                }
            }
        }
        Command::Providers => {
            println!("Configured: {} ({})", config.llm_provider(), config.llm_model());
            println!("Available providers:");
            for name in mamaguide_providers::available_providers() {
                println!("  {name}");
            }
        }
        Command::Init { force } => {
            let path = MamaGuideConfig::default_path();
            if path.exists() && !force {
                println!("⚠️ {} already exists (use --force to overwrite)", path.display());
            } else {
                MamaGuideConfig::default().save()?;
                println!("✅ Wrote default config to {}", path.display());
            }
        }
    }

    Ok(())
}
