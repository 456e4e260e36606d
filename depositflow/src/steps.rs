//! The three deposit pipeline steps and their assembly.
//!
//! Each step is safe to invoke more than once with the same logical input:
//! a retried or replayed attempt simply mints a fresh identifier, and no
//! earlier attempt's output is ever observed on failure.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Deposit, DepositRequest, Transaction, Wallet};
use crate::executor::Executor;
use crate::pipeline::Pipeline;
use crate::step::{Step, StepContext, StepError};

/// Executor specialization for the deposit pipeline.
pub type DepositExecutor = Executor<DepositRequest, Deposit>;

/// Creates a ledger transaction from a deposit request.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateTransaction;

#[async_trait]
impl Step for CreateTransaction {
    type Input = DepositRequest;
    type Output = Transaction;

    fn name(&self) -> &'static str {
        "create_transaction"
    }

    async fn execute(
        &self,
        _ctx: &StepContext,
        input: DepositRequest,
    ) -> Result<Transaction, StepError> {
        input.validate()?;
        Ok(Transaction {
            tx_id: Uuid::new_v4(),
            user_id: input.user_id,
            amount: input.amount,
        })
    }
}

/// Creates a wallet entry from a transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateWallet;

#[async_trait]
impl Step for CreateWallet {
    type Input = Transaction;
    type Output = Wallet;

    fn name(&self) -> &'static str {
        "create_wallet"
    }

    async fn execute(
        &self,
        _ctx: &StepContext,
        input: Transaction,
    ) -> Result<Wallet, StepError> {
        Ok(Wallet {
            wallet_id: Uuid::new_v4(),
            tx_id: input.tx_id,
            amount: input.amount,
            user_id: input.user_id,
        })
    }
}

/// Creates the terminal deposit from a wallet, binding the enclosing run's
/// identifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateDeposit;

#[async_trait]
impl Step for CreateDeposit {
    type Input = Wallet;
    type Output = Deposit;

    fn name(&self) -> &'static str {
        "create_deposit"
    }

    async fn execute(&self, ctx: &StepContext, input: Wallet) -> Result<Deposit, StepError> {
        Ok(Deposit {
            run_id: ctx.run_id,
            deposit_id: Uuid::new_v4(),
            wallet_id: input.wallet_id,
            tx_id: input.tx_id,
            amount: input.amount,
            user_id: input.user_id,
        })
    }
}

/// The fixed deposit pipeline: transaction, wallet, deposit.
#[must_use]
pub fn deposit_pipeline() -> Pipeline<DepositRequest, Deposit> {
    Pipeline::start_with("deposit", CreateTransaction)
        .then(CreateWallet)
        .then(CreateDeposit)
        .build()
}

/// Convenience constructor wiring the deposit pipeline into an executor.
pub fn deposit_executor(
    policy: crate::retry::RetryPolicy,
    journal: Arc<dyn crate::journal::RunJournal>,
    store: Arc<dyn crate::store::ResultStore<Deposit>>,
) -> DepositExecutor {
    Executor::new(Arc::new(deposit_pipeline()), policy, journal, store)
}
