use clap::Parser;
use feedesk::application::orchestrator::TransactionOrchestrator;
use feedesk::application::session::SessionBootstrapper;
use feedesk::domain::pricing::estimate;
use feedesk::domain::transaction::TransactionStatus;
use feedesk::infrastructure::http::HttpPaymentGateway;
use feedesk::infrastructure::in_memory::InMemoryCredentialProvider;
use feedesk::interfaces::cli::{Cli, Command, PayArgs};
use feedesk::logging;
use miette::{IntoDiagnostic, Result, miette};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Estimate(args) => {
            let selection = args.selection().into_diagnostic()?;
            println!("{}", estimate(selection));
            Ok(())
        }
        Command::Pay(args) => match pay(args).await.into_diagnostic()? {
            TransactionStatus::Failed { message, .. } => Err(miette!("{message}")),
            _ => Ok(()),
        },
    }
}

/// Runs one payment and echoes its statuses; returns the terminal status.
async fn pay(args: PayArgs) -> feedesk::error::Result<TransactionStatus> {
    let amount = estimate(args.selection.selection()?);
    let gateway = HttpPaymentGateway::new(args.gateway_config()?)?;

    // Local provider: any supplied token is honoured, otherwise anonymous.
    let provider = Arc::new(InMemoryCredentialProvider::new().accepting_any_token());
    let session = SessionBootstrapper::new(provider, args.session_config());
    let orchestrator = TransactionOrchestrator::new(
        Arc::new(gateway),
        session.clone(),
        args.orchestrator_config(),
    );
    let mut statuses = orchestrator.subscribe();

    let identity = session.bootstrap().await;
    println!("session {identity}");

    let terminal = orchestrator.submit(amount)?.outcome().await?;

    // Echo every published status until the result has been dismissed.
    loop {
        match statuses.recv().await {
            Ok(status) => {
                print_status(&status);
                if status == TransactionStatus::Idle {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Status stream lagged, resyncing from current status");
                let current = orchestrator.status();
                print_status(&current);
                if current == TransactionStatus::Idle {
                    break;
                }
            }
            Err(RecvError::Closed) => break,
        }
    }

    Ok(terminal)
}

fn print_status(status: &TransactionStatus) {
    match status {
        TransactionStatus::Idle => println!("idle"),
        TransactionStatus::Processing { transaction } => println!(
            "processing amount={} user={}",
            transaction.amount, transaction.requester_id
        ),
        TransactionStatus::Succeeded { transaction } => println!(
            "succeeded reference={}",
            transaction.reference.as_deref().unwrap_or_default()
        ),
        TransactionStatus::Failed { message, .. } => println!("failed message={message:?}"),
    }
}
