// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

use crate::errors::FetchError;
use crate::types::address::WalletAddress;

/// Wallet approval step of the mint flow
///
/// Implementations prompt the wallet owner and resolve once they approve.
/// A refusal should be reported as [`FetchError::UserRejected`] directly,
/// not as a message to be classified.
#[async_trait]
pub trait ApprovalProvider: Send + Sync {
    /// Requests approval to mint to `address`
    async fn request_approval(&self, address: &WalletAddress) -> Result<(), FetchError>;
}

/// Approves every request immediately. For backend-sponsored mints where the
/// recipient signs nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl ApprovalProvider for AutoApprove {
    async fn request_approval(&self, _address: &WalletAddress) -> Result<(), FetchError> {
        Ok(())
    }
}
