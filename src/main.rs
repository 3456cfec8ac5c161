use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::time::Instant;

use admin_console::config::{ConfigError, ConsoleConfig, GlobalArgs};
use admin_console::console::{CollectionSpec, Dispatch, ResourceFetcher, SessionGuard};
use admin_console::csv::{write_counts, write_view};
use admin_console::session::SessionStoreError;
use admin_console::transport::{HttpTransport, TransportError};
use admin_console::{
    CollectionKind, Console, ConsoleError, MutationKind, PendingKind, RecordId, Role, Session,
    SessionStore, Target,
};
use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser)]
#[command(name = "admin-console", version, about = "Back-office console for the payments service")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a session issued by the service
    Login {
        #[arg(long, env = "CONSOLE_TOKEN", hide_env_values = true)]
        token: String,
        #[arg(long)]
        role: Role,
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Item count of every collection
    Summary,
    /// One page of a collection as csv
    List {
        /// users, deposits, withdrawals, transactions or wallets
        collection: CollectionKind,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        search: Option<String>,
    },
    /// Approve a pending deposit or withdrawal
    Approve {
        kind: PendingKind,
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Reject a pending deposit or withdrawal
    Reject {
        kind: PendingKind,
        id: String,
        #[arg(long)]
        yes: bool,
    },
    /// Top up a wallet
    Credit {
        wallet: String,
        #[arg(allow_hyphen_values = true)]
        amount: String,
        #[arg(long)]
        yes: bool,
    },
    /// Reduce a wallet
    Debit {
        wallet: String,
        #[arg(allow_hyphen_values = true)]
        amount: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionStoreError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Console(#[from] ConsoleError),
    #[error("failed to write output: {0}")]
    Output(#[from] csv::Error),
    #[error("failed to read answer: {0}")]
    Prompt(#[from] io::Error),
    #[error("token must not be empty")]
    EmptyToken,
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Console(e) if e.requires_sign_in() => ExitCode::from(2),
            _ => ExitCode::FAILURE,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ConsoleConfig::try_from(cli.global)?;
    let store = SessionStore::new(&config.session_file);

    let command = match cli.command {
        Command::Login {
            token,
            role,
            user_id,
        } => {
            if token.trim().is_empty() {
                return Err(CliError::EmptyToken);
            }
            let mut session = Session::new(token.trim(), role);
            if let Some(user_id) = user_id {
                session = session.with_user_id(user_id);
            }
            store.save(&session)?;
            info!(?role, "signed in");
            return Ok(());
        }
        Command::Logout => {
            store.clear()?;
            return Ok(());
        }
        command => command,
    };

    let transport = HttpTransport::new(config.base_url.clone(), config.request_timeout)?;
    let guard = SessionGuard::new(transport, store.load()?);
    let fetcher = ResourceFetcher::new(CollectionSpec::dashboard(), config.load_policy);
    let console = Console::new(guard, fetcher, config.confirmation);

    let result = execute(&console, command).await;

    if !console.guard().is_present() {
        store.clear()?;
    }
    result
}

async fn execute(console: &Console<HttpTransport>, command: Command) -> Result<(), CliError> {
    match command {
        Command::Summary => {
            load(console).await?;
            write_counts(&console.counts(), io::stdout().lock())?;
        }
        Command::List {
            collection,
            page,
            search,
        } => {
            load(console).await?;
            console.select(collection);
            if let Some(search) = search {
                console.input_search(&search, Instant::now());
                if let Some(deadline) = console.search_deadline() {
                    console.tick(deadline);
                }
            }
            console.set_page(page);
            console.with_view(|view| {
                write_view(collection, view, io::stdout().lock())?;
                eprintln!(
                    "page {}/{} ({} items)",
                    view.current_page, view.total_pages, view.total_count
                );
                Ok::<_, CliError>(())
            })?;
        }
        Command::Approve { kind, id, yes } => {
            let target = Target::Pending {
                kind,
                id: RecordId::new(id),
            };
            dispatch(console, MutationKind::Approve, target, yes).await?;
        }
        Command::Reject { kind, id, yes } => {
            let target = Target::Pending {
                kind,
                id: RecordId::new(id),
            };
            dispatch(console, MutationKind::Reject, target, yes).await?;
        }
        Command::Credit {
            wallet,
            amount,
            yes,
        } => {
            let id = RecordId::new(wallet);
            console.set_amount_input(&id, &amount);
            dispatch(console, MutationKind::Credit, Target::Wallet { id }, yes).await?;
        }
        Command::Debit {
            wallet,
            amount,
            yes,
        } => {
            let id = RecordId::new(wallet);
            console.set_amount_input(&id, &amount);
            dispatch(console, MutationKind::Debit, Target::Wallet { id }, yes).await?;
        }
        Command::Login { .. } | Command::Logout => {}
    }
    Ok(())
}

async fn load(console: &Console<HttpTransport>) -> Result<(), CliError> {
    console.refresh().await?;
    for kind in CollectionKind::ALL {
        if let Some(e) = console.load_error(kind) {
            warn!(collection = %kind, "{e}");
        }
    }
    Ok(())
}

async fn dispatch(
    console: &Console<HttpTransport>,
    action: MutationKind,
    target: Target,
    yes: bool,
) -> Result<(), CliError> {
    let question = format!("{action} {target}?");
    if console.request(action, target).await? == Dispatch::AwaitingConfirmation {
        if yes || ask(&question)? {
            console.confirm().await?;
        } else {
            console.cancel();
            eprintln!("cancelled");
            return Ok(());
        }
    }
    if let Some(notice) = console.notice() {
        println!("{notice}");
    }
    Ok(())
}

fn ask(question: &str) -> io::Result<bool> {
    let mut stderr = io::stderr().lock();
    write!(stderr, "{question} [y/N] ")?;
    stderr.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
