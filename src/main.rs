mod api;
mod app;
mod cli;
mod config;
mod session;
mod stats;
mod storage;
mod transcript;
mod views;

use anyhow::Result;
use clap::Parser;
use std::cell::RefCell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bookdesk", about = "Admin console for the booking service")]
pub struct Args {
    #[arg(long, env = "BOOKDESK_API_URL", help = "Booking API base URL")]
    pub base_url: Option<String>,

    #[arg(long, help = "Sign in with this email and exit")]
    pub email: Option<String>,

    #[arg(
        long,
        env = "BOOKDESK_PASSWORD",
        hide_env_values = true,
        help = "Password for --email (prompted when omitted)"
    )]
    pub password: Option<String>,

    #[arg(long, help = "Sign out and exit")]
    pub logout: bool,

    #[arg(long, help = "Print the current screen once and exit")]
    pub print: bool,

    #[arg(long, help = "Show whether a session is stored and exit")]
    pub status: bool,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Session storage file")]
    pub storage: Option<PathBuf>,

    #[arg(long, help = "Session transcripts directory")]
    pub transcripts_dir: Option<PathBuf>,

    #[arg(long, help = "Verbose output (print requests)")]
    pub verbose: bool,

    #[arg(long, help = "Debug output (print resolved settings)")]
    pub debug: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load()?
    };

    // CLI and environment override every config layer
    if let Some(base_url) = &args.base_url {
        cfg.api.base_url = Some(base_url.clone());
    }
    if let Some(storage) = &args.storage {
        cfg.storage.path = Some(storage.clone());
    }
    if let Some(dir) = &args.transcripts_dir {
        cfg.logging.dir = Some(dir.clone());
    }

    if let Err(errors) = cfg.validate() {
        for error in &errors {
            eprintln!("Config error {}", error);
        }
        return Err(anyhow::anyhow!("Invalid configuration ({} errors)", errors.len()));
    }

    if args.debug {
        eprintln!("[DEBUG] API base URL: {}", cfg.base_url());
        eprintln!("[DEBUG] Timeout: {}ms", cfg.timeout_ms());
        eprintln!("[DEBUG] Storage: {}", cfg.storage_path().display());
        eprintln!(
            "[DEBUG] Transcripts: {}",
            if cfg.logging_enabled() {
                cfg.transcripts_dir().display().to_string()
            } else {
                "disabled".to_string()
            }
        );
    }

    let storage = storage::FileStorage::new(&cfg.storage_path());
    let session = session::Session::open(Box::new(storage));
    let client = api::Client::new(cfg.base_url(), cfg.timeout_ms());
    let mut app = app::App::new(session, Box::new(client));

    let session_id = uuid::Uuid::new_v4().to_string();
    if cfg.logging_enabled() {
        let transcript_path = cfg.transcripts_dir().join(format!("{}.jsonl", session_id));
        let transcript =
            transcript::Transcript::new(&transcript_path, &session_id, cfg.base_url())?;
        app = app.with_transcript(transcript);
    }

    let ctx = cli::Context {
        args,
        config: cfg,
        session_id,
        app: RefCell::new(app),
    };

    if ctx.args.status {
        return cli::run_status(&ctx);
    }
    if ctx.args.logout {
        return cli::run_logout(&ctx);
    }
    if let Some(email) = ctx.args.email.clone() {
        let password = match ctx.args.password.clone() {
            Some(password) => password,
            None => rpassword::prompt_password("Password: ")?,
        };
        return cli::run_login(&ctx, &email, &password);
    }
    if ctx.args.print {
        return cli::run_print(&ctx);
    }

    cli::run_repl(ctx)
}
