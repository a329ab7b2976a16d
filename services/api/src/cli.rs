use crate::server;
use clap::{Args, Parser, Subcommand};
use lead_intake::error::AppError;
use lead_intake::workflows::intake::{national_id, normalize_digits};

#[derive(Parser, Debug)]
#[command(
    name = "Lead Intake",
    about = "Serve the loan application intake API and inspect national identity numbers",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Check or complete Turkish national identity numbers
    NationalId {
        #[command(subcommand)]
        command: NationalIdCommand,
    },
}

#[derive(Subcommand, Debug)]
enum NationalIdCommand {
    /// Report whether an identity number passes the checksum
    Check {
        /// Identity number; separators are ignored
        id: String,
    },
    /// Append both check digits to a nine digit prefix
    Complete {
        #[arg(value_parser = parse_prefix)]
        prefix: String,
    },
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

fn parse_prefix(raw: &str) -> Result<String, String> {
    let digits = normalize_digits(raw);
    if digits.len() != national_id::LENGTH - 2 {
        return Err(format!(
            "expected {} digits, got {}",
            national_id::LENGTH - 2,
            digits.len()
        ));
    }
    if digits.starts_with('0') {
        return Err("identity numbers never start with 0".to_string());
    }
    Ok(digits)
}

fn national_id_report(command: &NationalIdCommand) -> String {
    match command {
        NationalIdCommand::Check { id } => {
            let digits = normalize_digits(id);
            let verdict = if national_id::is_valid(&digits) {
                "valid"
            } else {
                "invalid"
            };
            format!("{digits}: {verdict}")
        }
        NationalIdCommand::Complete { prefix } => match national_id::complete(prefix) {
            Some(full) => full,
            None => format!("{prefix}: cannot be completed"),
        },
    }
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::NationalId { command } => {
            println!("{}", national_id_report(&command));
            Ok(())
        }
    }
}
