//! # staffpass CLI
//!
//! Issues credentials for manual testing and verifies pasted payloads.
//! Reads its configuration from `STAFFPASS_*` environment variables.

use std::io::Read as _;

use anyhow::Context as _;
use clap::Parser;
use staffpass::{
    CredentialConfig, EmployeeRecord, PresentationStatus, PresentingContext, Verifier,
};

/// Short-lived signed employee credentials.
#[derive(Parser, Debug)]
#[command(name = "staffpass", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Issue a credential and print it as JSON.
    Issue(IssueArgs),
    /// Verify a credential payload given as argument or on stdin.
    Verify(VerifyArgs),
}

#[derive(clap::Args, Debug)]
struct IssueArgs {
    /// Directory identifier.
    #[arg(long)]
    id: String,
    /// Display name.
    #[arg(long)]
    name: String,
    /// Contact handle.
    #[arg(long, default_value = "")]
    contact: String,
    /// E-mail address.
    #[arg(long, default_value = "")]
    email: String,
    /// Keep running and print the countdown until the credential expires.
    #[arg(long)]
    watch: bool,
}

#[derive(clap::Args, Debug)]
struct VerifyArgs {
    /// Credential JSON. Read from stdin when omitted.
    payload: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = CredentialConfig::from_env().context("loading configuration")?;

    match cli.command {
        Commands::Issue(args) => issue(&config, args).await,
        Commands::Verify(args) => verify(&config, args),
    }
}

async fn issue(config: &CredentialConfig, args: IssueArgs) -> anyhow::Result<()> {
    let employee = EmployeeRecord::new(args.id, args.name, args.contact, args.email);
    let mut context = PresentingContext::from_config(config)?;
    let credential = context.issue(&employee).await?;
    println!("{}", credential.to_json()?);

    if args.watch {
        if let Some(mut ticks) = context.subscribe() {
            while ticks.changed().await.is_ok() {
                match context.status() {
                    PresentationStatus::Presenting { .. } => {
                        eprintln!("{}", context.expiry_state());
                    }
                    PresentationStatus::Expired | PresentationStatus::NotIssued => break,
                }
            }
        }
        eprintln!("credential expired, generate a new one");
    }
    context.shutdown().await?;
    Ok(())
}

fn verify(config: &CredentialConfig, args: VerifyArgs) -> anyhow::Result<()> {
    let payload = match args.payload {
        Some(payload) => payload,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("reading payload from stdin")?;
            buffer
        }
    };
    let result = Verifier::new(config)?.verify(&payload);
    println!("{}", result.status());
    if let Some(credential) = result.payload() {
        let employee = credential.employee();
        println!("{} ({}) <{}>", employee.name, employee.id, employee.email);
    }
    if !result.is_valid() {
        std::process::exit(1);
    }
    Ok(())
}
