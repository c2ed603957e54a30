//! Per-call-chain execution state.

use tokio_util::sync::CancellationToken;

/// State carried down one logical call chain.
///
/// A strategy hands its unit of work a [`nested`](Self::nested) copy, so a
/// strategy invoked further down the chain sees that one is already active
/// and runs its operation exactly once. Unrelated chains hold unrelated
/// contexts and never observe each other.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    strategy_active: bool,
    transaction_open: bool,
    cancellation: CancellationToken,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context observing `token` for cancellation.
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancellation: token,
            ..Self::default()
        }
    }

    /// Mark a caller-managed transaction as open (or closed).
    pub fn with_open_transaction(mut self, open: bool) -> Self {
        self.transaction_open = open;
        self
    }

    /// Copy handed to a unit of work running under a strategy.
    pub fn nested(&self) -> Self {
        Self {
            strategy_active: true,
            ..self.clone()
        }
    }

    pub fn is_strategy_active(&self) -> bool {
        self.strategy_active
    }

    pub fn has_open_transaction(&self) -> bool {
        self.transaction_open
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
