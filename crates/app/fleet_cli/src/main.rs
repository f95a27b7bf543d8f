// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use clap::Parser;
use cli::{Cli, Commands, TokenCommands};

mod cli;
mod commands;
mod logging;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    let args = Cli::parse();
    logging::init(args.verbose)?;

    match &args.command {
        Commands::Version => {
            println!(
                "{} {} (fleet_core {})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                fleet_core::version()
            );
        }
        Commands::Token { command } => {
            let codec = commands::token::codec(args.secret.as_deref(), args.ttl_secs)?;
            match command {
                TokenCommands::Issue { subject, role } => {
                    println!("{}", commands::token::issue(&codec, subject, role)?);
                }
                TokenCommands::Inspect { token } => {
                    println!("{}", commands::token::inspect(codec, token)?);
                }
            }
        }
        Commands::HashPassword { password } => {
            println!("{}", commands::password::hash(password)?);
        }
    }

    Ok(())
}
