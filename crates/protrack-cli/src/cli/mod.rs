//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use protrack_core::api::ApiClient;
use protrack_core::auth::{AuthSession, RestoreOutcome};
use protrack_core::config::Config;
use protrack_core::logging;
use protrack_core::session::{SessionStore, SharedToken};

mod commands;

#[derive(Parser)]
#[command(name = "protrack")]
#[command(version)]
#[command(about = "Track urine protein test results")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Create an account and log in
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// Sex ("male" or "female")
        #[arg(long)]
        sex: String,
        /// State of residence
        #[arg(long)]
        state: String,
        /// Local government area
        #[arg(long)]
        lga: String,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        dob: String,
    },

    /// Log in with an existing account
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Log out and clear the saved session
    Logout,

    /// Show the logged-in user's profile
    Whoami,

    /// Show or update the profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// List recorded test results
    Results {
        #[command(subcommand)]
        command: ResultsCommands,
    },

    /// Submit a new test result
    Submit {
        #[command(subcommand)]
        command: SubmitCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ProfileCommands {
    /// Show the profile
    Show,
    /// Update one or more profile fields
    Update {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        sex: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        lga: Option<String>,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        dob: Option<String>,
    },
}

#[derive(clap::Subcommand)]
enum ResultsCommands {
    /// Table of results, newest first
    List,
    /// Trend series: timestamp and numeric level (0-4), ascending
    Trend,
}

#[derive(clap::Subcommand)]
enum SubmitCommands {
    /// Enter a reading by hand (shows immediately, syncs in background)
    Manual {
        /// Protein level: Negative, Trace, +1, +2, or +3
        #[arg(long)]
        result: String,
        #[arg(long)]
        notes: Option<String>,
        /// Reading date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Upload a strip photo for server-side reading
    Photo {
        /// Path to the strip image (JPEG or PNG)
        #[arg(value_name = "IMAGE")]
        image: std::path::PathBuf,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

/// Shared handles for commands that talk to the backend.
pub struct AppContext {
    pub api: ApiClient,
    pub session: AuthSession,
    restore: RestoreOutcome,
}

impl AppContext {
    async fn build(config: &Config) -> Result<Self> {
        let token = SharedToken::new();
        let api = ApiClient::from_config(config, token.clone())?;
        let session = AuthSession::new(SessionStore::new(), token);
        let restore = session.restore(&api).await;
        Ok(Self {
            api,
            session,
            restore,
        })
    }

    /// Bails unless a usable session was restored.
    fn require_auth(&self) -> Result<()> {
        match self.restore {
            // Unverified means the server couldn't confirm the token at
            // startup; the command itself will surface any real failure.
            RestoreOutcome::Active | RestoreOutcome::Unverified => Ok(()),
            RestoreOutcome::NoSession => {
                anyhow::bail!("Not logged in. Run 'protrack login' first.")
            }
            RestoreOutcome::Rejected => {
                anyhow::bail!("Session expired. Run 'protrack login' again.")
            }
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    logging::init();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    // Config commands work without a network context.
    if let Commands::Config { command } = &cli.command {
        return match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        };
    }

    let config = Config::load().context("load config")?;
    let ctx = AppContext::build(&config).await?;

    match cli.command {
        Commands::Signup {
            email,
            password,
            first_name,
            last_name,
            sex,
            state,
            lga,
            dob,
        } => {
            commands::auth::signup(
                &ctx,
                protrack_types::SignupRequest {
                    email,
                    password,
                    first_name,
                    last_name,
                    sex,
                    state,
                    lga,
                    dob,
                },
            )
            .await
        }
        Commands::Login { email, password } => commands::auth::login(&ctx, &email, &password).await,
        Commands::Logout => commands::auth::logout(&ctx).await,
        Commands::Whoami => commands::profile::show(&ctx).await,
        Commands::Profile { command } => match command {
            ProfileCommands::Show => commands::profile::show(&ctx).await,
            ProfileCommands::Update {
                email,
                first_name,
                last_name,
                sex,
                state,
                lga,
                dob,
            } => {
                commands::profile::update(
                    &ctx,
                    protrack_types::ProfileUpdate {
                        email,
                        first_name,
                        last_name,
                        sex,
                        state,
                        lga,
                        dob,
                    },
                )
                .await
            }
        },
        Commands::Results { command } => match command {
            ResultsCommands::List => commands::results::list(&ctx).await,
            ResultsCommands::Trend => commands::results::trend(&ctx).await,
        },
        Commands::Submit { command } => match command {
            SubmitCommands::Manual {
                result,
                notes,
                date,
            } => commands::submit::manual(&ctx, &result, notes, date.as_deref()).await,
            SubmitCommands::Photo { image } => commands::submit::photo(&ctx, &image).await,
        },
        Commands::Config { .. } => unreachable!("handled above"),
    }
}
