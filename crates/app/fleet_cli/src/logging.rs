pub mod formats;

use flexi_logger::Logger;

use crate::Error;

/// Logs go to stderr; stdout carries command output only.
pub fn init(verbose: bool) -> Result<(), Error> {
    let logger = if verbose {
        Logger::try_with_str("debug")?
    } else {
        Logger::try_with_env_or_str("info")?
    };
    logger.format(formats::cli_format).log_to_stderr().start()?;

    Ok(())
}
