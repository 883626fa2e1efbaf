use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;

use job_mail_tracker::auth::{token_manager::TokenManager, token_store};
use job_mail_tracker::config::{config_path, load_config, write_template};
use job_mail_tracker::llm::Generator;
use job_mail_tracker::llm::openai::OpenAiClient;
use job_mail_tracker::mail::imap_client::ImapMailbox;
use job_mail_tracker::pipeline::driver::{self, Pipeline, RunOptions};
use job_mail_tracker::pipeline::summarizer::Summarizer;
use job_mail_tracker::store::csv_table::CsvTable;
use job_mail_tracker::terminal::run_dashboard;

#[derive(Parser)]
#[command(name = "job_mail_tracker")]
#[command(about = "Track job-application emails in a CSV table", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch one batch, classify and summarize, and rewrite the table
    Run {
        #[arg(long)]
        config: Option<PathBuf>,

        /// Overrides `output_path` from the config
        #[arg(long)]
        output: Option<PathBuf>,

        /// Overrides `batch_size` from the config
        #[arg(long)]
        batch_size: Option<u32>,
    },

    /// Browse the last table in the terminal
    Dashboard {
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// One-time browser consent; stores the refresh token in the keyring
    Authorize {
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Store the OAuth client secret in the keyring
    SetClientSecret {
        #[arg(long)]
        client_id: String,
    },

    /// Write a config template to the default location
    InitConfig,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::SetClientSecret { client_id } => {
            eprintln!("Paste client secret (end with Ctrl-D):");
            let mut secret = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut secret)?;
            token_store::save_client_secret(&client_id, secret.trim())?;
            println!("Saved client secret for client_id {client_id}");
            Ok(())
        }

        Command::InitConfig => {
            let path = config_path()?;
            if path.exists() {
                return Err(anyhow!("{} already exists", path.display()));
            }
            write_template(&path)?;
            println!("Wrote {}", path.display());
            Ok(())
        }

        Command::Authorize { config } => {
            let cfg = load_config(config.as_deref())
                .map_err(|e| anyhow!("Configuration error: {e}"))?;
            TokenManager::from_config(&cfg)?.authorize()?;
            println!("Authorized {}", cfg.user_email()?);
            Ok(())
        }

        Command::Dashboard { config, input } => {
            let path = match input {
                Some(p) => p,
                None => {
                    load_config(config.as_deref())
                        .map_err(|e| anyhow!("Configuration error: {e}"))?
                        .output_path
                }
            };
            run_dashboard(&path)
        }

        Command::Run {
            config,
            output,
            batch_size,
        } => {
            let cfg = load_config(config.as_deref())
                .map_err(|e| anyhow!("Configuration error: {e}"))?;
            let pipeline = Pipeline::from_config(&cfg)?;

            let token = TokenManager::from_config(&cfg)?.access_token()?;
            let mut mailbox = ImapMailbox::connect(cfg.imap_server(), cfg.user_email()?, &token)?;

            let generator: Option<Box<dyn Generator>> = match cfg.api_key() {
                Some(key) => Some(Box::new(OpenAiClient::new(&cfg.summarizer, key)?)),
                None => {
                    warn!("OPENAI_API_KEY not set; summaries disabled");
                    None
                }
            };
            let mut summarizer = Summarizer::new(generator);

            let store = CsvTable::new(output.unwrap_or_else(|| cfg.output_path.clone()));
            let options = RunOptions {
                query: cfg.query().map(str::to_string),
                batch_size: batch_size.unwrap_or(cfg.batch_size),
            };

            let report = driver::run(&mut mailbox, &pipeline, &mut summarizer, &store, &options)?;

            info!("{} summaries requested", report.summaries_requested);
            println!(
                "Wrote {} rows to {}",
                report.accepted,
                store.path().display()
            );
            Ok(())
        }
    }
}
