// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Command-line entry point.
//!
//! ```text
//! tokengate check <address>   # print whether the address has access
//! tokengate mint <address>    # mint the gating token, then print the result
//! ```
//!
//! Configuration comes from `TOKENGATE_*` environment variables (a `.env`
//! file is honoured). Results are printed to stdout as JSON; logs go to
//! stderr.

use std::sync::Arc;

use alloy_provider::ProviderBuilder;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::errors::TokenGateError;
use crate::receipt::ProviderReceiptPoller;
use crate::transport::{HttpBackend, LoggingBackend};
use crate::{AccessGate, MintFlow, MintState, SyncConfig};

/// Token-gated access checks and minting
#[derive(Debug, Parser)]
#[command(name = "tokengate", version, about)]
pub struct Cli {
    /// Operation to run
    #[command(subcommand)]
    pub command: Command,
}

/// CLI operations
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check whether an address currently has access
    Check {
        /// 0x-prefixed wallet address
        address: String,
    },
    /// Mint the gating token to an address and wait for confirmation
    Mint {
        /// 0x-prefixed wallet address
        address: String,
    },
}

/// Main entry point for the application.
pub async fn run() -> Result<(), TokenGateError> {
    run_with(Cli::parse()).await
}

/// Runs an already-parsed command line.
pub async fn run_with(cli: Cli) -> Result<(), TokenGateError> {
    let config = SyncConfig::from_env()?;
    info!(api_url = %config.api_url, "Loaded configuration");

    let backend = Arc::new(LoggingBackend::new(HttpBackend::from_config(&config)?));
    let gate = AccessGate::from_config(&config, Arc::clone(&backend));

    match cli.command {
        Command::Check { address } => {
            let check = gate.check_access_detailed(&address).await;
            print_json(&json!({
                "address": address,
                "hasAccess": check.has_access,
                "record": check.record,
                "error": check.error.map(|e| e.to_string()),
            }))?;
        }
        Command::Mint { address } => {
            let provider = ProviderBuilder::new().connect_http(config.rpc_endpoint()?);
            let poller = ProviderReceiptPoller::new(provider)
                .with_interval(config.receipt_poll_interval)
                .with_timeout(config.receipt_timeout);

            let flow = MintFlow::new(Arc::clone(&backend), poller, gate.store().clone())
                .with_retry(config.mint_retry.clone());
            let snapshot = flow.mint(&address).await;
            print_json(&snapshot)?;

            if snapshot.state == MintState::Success {
                let has_access = gate.check_access(&address).await;
                info!(has_access, "Access after mint");
            }
            if let Some(error) = snapshot.error {
                return Err(error.into());
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), TokenGateError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_subcommands() {
        let cli = Cli::try_parse_from(["tokengate", "check", "0xabc"]).unwrap();
        assert!(matches!(cli.command, Command::Check { address } if address == "0xabc"));

        let cli = Cli::try_parse_from(["tokengate", "mint", "0xabc"]).unwrap();
        assert!(matches!(cli.command, Command::Mint { .. }));

        assert!(Cli::try_parse_from(["tokengate"]).is_err());
    }
}
