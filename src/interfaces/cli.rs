use crate::config::{GatewayConfig, OrchestratorConfig, SessionConfig};
use crate::domain::pricing::PricingSelection;
use crate::error::{ConfigError, PricingError};
use clap::{Args, Parser, Subcommand};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Fee estimates and simulated fee payments", long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the fee for a grade band
    Estimate(SelectionArgs),
    /// Sign in, then pay the estimated fee through the payment endpoint
    Pay(PayArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Grade band (A, B or C)
    #[arg(long)]
    pub tier: String,

    /// Include the hostel surcharge
    #[arg(long)]
    pub hostel: bool,
}

impl SelectionArgs {
    pub fn selection(&self) -> Result<PricingSelection, PricingError> {
        PricingSelection::parse(&self.tier, self.hostel)
    }
}

#[derive(Args, Debug, Clone)]
pub struct PayArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Payment endpoint receiving the JSON POST
    #[arg(long, env = "FEEDESK_PAYMENT_URL")]
    pub endpoint: String,

    /// Credential token exchanged for a user principal at start-up
    #[arg(long, env = "FEEDESK_AUTH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Application identifier
    #[arg(long, env = "FEEDESK_APP_ID")]
    pub app_id: Option<String>,

    /// How long the payment result stays on display, in milliseconds
    #[arg(long, default_value_t = 3000)]
    pub display_window_ms: u64,
}

impl PayArgs {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.token.clone(), self.app_id.clone())
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            display_window: Duration::from_millis(self.display_window_ms),
        }
    }

    pub fn gateway_config(&self) -> Result<GatewayConfig, ConfigError> {
        GatewayConfig::parse(&self.endpoint)
    }
}
