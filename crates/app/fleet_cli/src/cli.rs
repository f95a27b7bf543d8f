use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "fleet_cli", version, about = "Fleet operator tools")]
pub struct Cli {
    /// Signing secret, raw or `base64:`-prefixed. Falls back to the
    /// persisted server secret.
    #[arg(long, global = true, env = "JWT_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// Lifetime of issued tokens, in seconds.
    #[arg(long, global = true, env = "TOKEN_TTL_SECS")]
    pub ttl_secs: Option<i64>,

    /// Log at debug level regardless of `RUST_LOG`.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print version information
    Version,

    /// Issue or inspect bearer tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Print a bcrypt hash of a password
    HashPassword { password: String },
}

#[derive(Subcommand, Debug)]
pub enum TokenCommands {
    /// Issue a signed token
    Issue {
        #[arg(long)]
        subject: String,

        /// ADMIN or USER
        #[arg(long, default_value = "USER")]
        role: String,
    },

    /// Verify a token and print what it carries as JSON
    Inspect { token: String },
}
