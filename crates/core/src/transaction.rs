//! Transaction flows, from form input to on-chain confirmation.
//!
//! ```text
//! Idle -> FormEditing -> Submitting -> [AwaitingApproval] -> AwaitingChainConfirmation
//!                                                                 |
//!            Idle <- (acknowledge) <- Succeeded | Failed <--------+
//! FormEditing -> Cancelled -> Idle
//! ```
//!
//! A flow holds the session's in-flight slot from submission until it
//! settles, and every call is confirmed before the next one is sent.

use alloy::primitives::{B256, U256};
use dsc_chain::{ChainError, ContractCall};
use parking_lot::Mutex;
use smallvec::{smallvec, SmallVec};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::errors::{
    classify, Classification, CoreError, ErrorKind, ErrorMessage, INSUFFICIENT_DSC_BALANCE,
};
use crate::session::Session;
use crate::u256_math::{self, MathError};

/// User action selected in the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Deposit,
    Mint,
    Burn,
    Withdraw,
}

impl TransactionKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Mint => "mint",
            Self::Burn => "burn",
            Self::Withdraw => "withdraw",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "deposit" => Some(Self::Deposit),
            "mint" => Some(Self::Mint),
            "burn" => Some(Self::Burn),
            "withdraw" | "redeem" => Some(Self::Withdraw),
            _ => None,
        }
    }
}

/// Parsed form input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionIntent {
    pub kind: TransactionKind,
    /// Amount for `kind` (18 decimals)
    pub primary_amount: U256,
    /// Paired amount (mint for deposit, burn for withdraw, and back), if given
    pub secondary_amount: Option<U256>,
}

impl TransactionIntent {
    /// Parse decimal amount strings. An empty secondary means none.
    pub fn from_form(
        kind: TransactionKind,
        primary: &str,
        secondary: &str,
    ) -> Result<Self, MathError> {
        let primary_amount = u256_math::parse_wad(primary)?;
        let secondary_amount = match secondary.trim() {
            "" => None,
            s => Some(u256_math::parse_wad(s)?),
        };

        Ok(Self {
            kind,
            primary_amount,
            secondary_amount,
        })
    }

    /// DSC this intent burns, if any.
    pub fn burn_amount(&self) -> Option<U256> {
        match self.kind {
            TransactionKind::Burn => Some(self.primary_amount),
            TransactionKind::Withdraw => self.secondary_amount,
            _ => None,
        }
    }
}

/// Calls that implement `intent`, in submission order.
///
/// Burns that also redeem need an allowance first, so they are preceded
/// by an approval of exactly the burn amount.
pub fn plan_calls(intent: &TransactionIntent) -> SmallVec<[ContractCall; 2]> {
    let primary = intent.primary_amount;

    match (intent.kind, intent.secondary_amount) {
        (TransactionKind::Deposit, None) => smallvec![ContractCall::Deposit { amount: primary }],
        (TransactionKind::Deposit, Some(mint)) => smallvec![ContractCall::DepositAndMint {
            deposit: primary,
            mint,
        }],
        (TransactionKind::Mint, None) => smallvec![ContractCall::Mint { amount: primary }],
        (TransactionKind::Mint, Some(deposit)) => smallvec![ContractCall::DepositAndMint {
            deposit,
            mint: primary,
        }],
        (TransactionKind::Withdraw, None) => smallvec![ContractCall::Redeem { amount: primary }],
        (TransactionKind::Withdraw, Some(burn)) => smallvec![
            ContractCall::ApproveStable { amount: burn },
            ContractCall::BurnAndRedeem {
                burn,
                redeem: primary,
            },
        ],
        (TransactionKind::Burn, None) => smallvec![ContractCall::Burn { amount: primary }],
        (TransactionKind::Burn, Some(redeem)) => smallvec![
            ContractCall::ApproveStable { amount: primary },
            ContractCall::BurnAndRedeem {
                burn: primary,
                redeem,
            },
        ],
    }
}

/// Where a flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    FormEditing,
    Submitting,
    /// Approval sent, waiting for it to confirm
    AwaitingApproval,
    AwaitingChainConfirmation,
    Succeeded,
    Failed(ErrorKind),
    Cancelled,
}

/// Inputs that move the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionEvent {
    Open,
    Cancel,
    Close,
    Edit,
    Execute,
    ApprovalRequested,
    CallSubmitted,
    Confirmed,
    Fail(ErrorKind),
    Acknowledge,
}

impl TransactionEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Cancel => "cancel",
            Self::Close => "close",
            Self::Edit => "edit",
            Self::Execute => "execute",
            Self::ApprovalRequested => "approval-requested",
            Self::CallSubmitted => "call-submitted",
            Self::Confirmed => "confirmed",
            Self::Fail(_) => "fail",
            Self::Acknowledge => "acknowledge",
        }
    }
}

impl TransactionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FormEditing => "form-editing",
            Self::Submitting => "submitting",
            Self::AwaitingApproval => "awaiting-approval",
            Self::AwaitingChainConfirmation => "awaiting-confirmation",
            Self::Succeeded => "succeeded",
            Self::Failed(_) => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether a flow has been submitted and not yet settled.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Submitting | Self::AwaitingApproval | Self::AwaitingChainConfirmation
        )
    }

    /// Next state for `event`, or `InvalidTransition`.
    pub fn next(self, event: TransactionEvent) -> Result<Self, CoreError> {
        use TransactionEvent as E;

        let next = match (self, event) {
            (Self::Idle, E::Open) => Self::FormEditing,
            (Self::FormEditing, E::Cancel) => Self::Cancelled,
            (Self::Cancelled, E::Close) => Self::Idle,
            (Self::FormEditing, E::Edit) | (Self::Failed(_), E::Edit) => Self::FormEditing,
            (Self::FormEditing, E::Execute) => Self::Submitting,
            (Self::Submitting, E::ApprovalRequested) => Self::AwaitingApproval,
            (Self::Submitting, E::CallSubmitted) | (Self::AwaitingApproval, E::CallSubmitted) => {
                Self::AwaitingChainConfirmation
            }
            (Self::AwaitingChainConfirmation, E::Confirmed) => Self::Succeeded,
            (state, E::Fail(kind)) if state.is_in_flight() => Self::Failed(kind),
            (Self::Succeeded, E::Acknowledge) | (Self::Failed(_), E::Acknowledge) => Self::Idle,
            (from, event) => {
                return Err(CoreError::InvalidTransition {
                    from: from.name(),
                    event: event.name(),
                })
            }
        };

        Ok(next)
    }
}

/// How a submitted flow ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// Every call confirmed
    Succeeded { hashes: Vec<B256> },
    /// Classified failure, already shown
    Failed(Classification),
}

#[derive(Debug, Default)]
struct FormState {
    kind: Option<TransactionKind>,
    primary: String,
    secondary: String,
    execute_enabled: bool,
    /// Set after an unclassified failure; editing won't re-enable execute
    locked: bool,
}

#[derive(Debug)]
struct Inner {
    state: TransactionState,
    form: FormState,
}

/// Drives one action form through submission and confirmation.
#[derive(Debug)]
pub struct TransactionOrchestrator {
    session: Arc<Session>,
    inner: Mutex<Inner>,
}

impl TransactionOrchestrator {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            inner: Mutex::new(Inner {
                state: TransactionState::Idle,
                form: FormState::default(),
            }),
        }
    }

    pub fn state(&self) -> TransactionState {
        self.inner.lock().state
    }

    pub fn execute_enabled(&self) -> bool {
        self.inner.lock().form.execute_enabled
    }

    /// Open an empty form for `kind`.
    pub fn open(&self, kind: TransactionKind) -> Result<(), CoreError> {
        self.apply(TransactionEvent::Open, |form| {
            *form = FormState {
                kind: Some(kind),
                ..FormState::default()
            };
        })?;
        let presenter = self.session.presenter();
        presenter.error_message(&ErrorMessage::Clear);
        presenter.execute_enabled(false);
        Ok(())
    }

    /// Close the form without submitting.
    pub fn cancel(&self) -> Result<(), CoreError> {
        self.apply(TransactionEvent::Cancel, |_| {})?;
        self.apply(TransactionEvent::Close, |form| *form = FormState::default())?;
        Ok(())
    }

    /// Record the current field contents. Returns whether execute is enabled.
    ///
    /// Editing after a failure returns the form to `FormEditing`.
    pub fn update_form(&self, primary: &str, secondary: &str) -> Result<bool, CoreError> {
        let (enabled, changed) = {
            let mut inner = self.inner.lock();
            let next = inner.state.next(TransactionEvent::Edit)?;
            let changed = next != inner.state;
            inner.state = next;

            let form = &mut inner.form;
            form.primary = primary.to_string();
            form.secondary = secondary.to_string();
            form.execute_enabled =
                !form.locked && !(primary.trim().is_empty() && secondary.trim().is_empty());
            (form.execute_enabled, changed.then_some(next))
        };

        if let Some(state) = changed {
            self.session.presenter().transaction_state(&state);
        }
        self.session.presenter().execute_enabled(enabled);
        Ok(enabled)
    }

    /// Submit the form as currently filled.
    pub async fn execute(&self) -> Result<TransactionOutcome, CoreError> {
        let intent = {
            let inner = self.inner.lock();
            if inner.state != TransactionState::FormEditing {
                return Err(CoreError::InvalidTransition {
                    from: inner.state.name(),
                    event: TransactionEvent::Execute.name(),
                });
            }
            if !inner.form.execute_enabled {
                return Err(CoreError::ExecuteDisabled);
            }
            let kind = inner.form.kind.ok_or(CoreError::InvalidTransition {
                from: inner.state.name(),
                event: TransactionEvent::Execute.name(),
            })?;
            TransactionIntent::from_form(kind, &inner.form.primary, &inner.form.secondary)?
        };

        self.submit(intent).await
    }

    /// Submit a parsed intent for the open form's action.
    ///
    /// Chain failures never surface as `Err`: they are classified, shown,
    /// and end the flow in `Failed`.
    #[instrument(skip(self), fields(kind = intent.kind.name()))]
    pub async fn submit(&self, intent: TransactionIntent) -> Result<TransactionOutcome, CoreError> {
        {
            let inner = self.inner.lock();
            if inner.form.locked {
                return Err(CoreError::ExecuteDisabled);
            }
            if let Some(expected) = inner.form.kind {
                if expected != intent.kind {
                    return Err(CoreError::KindMismatch {
                        expected,
                        actual: intent.kind,
                    });
                }
            }
        }

        let _guard = self.session.begin_flow()?;
        self.apply(TransactionEvent::Execute, |form| form.execute_enabled = false)?;

        let presenter = self.session.presenter();
        presenter.execute_enabled(false);
        presenter.error_message(&ErrorMessage::Clear);

        match self.run(&intent).await {
            Ok(hashes) => {
                self.apply(TransactionEvent::Confirmed, |_| {})?;
                info!(txs = hashes.len(), "Transaction flow succeeded");

                if self.session.account().is_some() {
                    if let Err(e) = self.session.refresh_position().await {
                        warn!(error = %e, "Position refresh after success failed");
                    }
                }
                Ok(TransactionOutcome::Succeeded { hashes })
            }
            Err(e) => {
                let err = match e {
                    CoreError::Chain(err) => err,
                    other => ChainError::other(other.to_string()),
                };
                let classification = classify(&err);

                presenter.error_message(&classification.message);
                presenter.execute_enabled(classification.reenable);
                self.apply(TransactionEvent::Fail(classification.kind), |form| {
                    form.execute_enabled = classification.reenable;
                    form.locked = !classification.reenable;
                })?;

                info!(kind = ?classification.kind, "Transaction flow failed");
                Ok(TransactionOutcome::Failed(classification))
            }
        }
    }

    /// Dismiss a settled flow.
    pub fn acknowledge(&self) -> Result<(), CoreError> {
        self.apply(TransactionEvent::Acknowledge, |form| *form = FormState::default())?;
        Ok(())
    }

    async fn run(&self, intent: &TransactionIntent) -> Result<Vec<B256>, CoreError> {
        self.check_burn_within_debt(intent)?;

        let client = self.session.client();
        let confirmations = self.session.config().transactions.confirmations;
        let calls = plan_calls(intent);
        let mut hashes = Vec::with_capacity(calls.len());

        for call in &calls {
            if call.is_approval() {
                self.apply(TransactionEvent::ApprovalRequested, |_| {})?;
            }

            debug!(call = %call, "Submitting");
            let hash = client.submit(call).await?;
            if !call.is_approval() {
                self.apply(TransactionEvent::CallSubmitted, |_| {})?;
            }

            info!(hash = %hash, call = call.name(), confirmations, "Waiting for confirmation");
            client.await_confirmations(hash, confirmations).await?;
            hashes.push(hash);
        }

        Ok(hashes)
    }

    /// Refuse burns above the last known debt before touching the chain.
    fn check_burn_within_debt(&self, intent: &TransactionIntent) -> Result<(), ChainError> {
        let (Some(burn), Some(position)) = (intent.burn_amount(), self.session.last_position())
        else {
            return Ok(());
        };

        if burn > position.dsc_minted {
            debug!(burn = %burn, minted = %position.dsc_minted, "Burn exceeds debt");
            return Err(ChainError::other(INSUFFICIENT_DSC_BALANCE));
        }
        Ok(())
    }

    /// Apply `event`, update the form under the same lock, then report.
    fn apply(
        &self,
        event: TransactionEvent,
        update: impl FnOnce(&mut FormState),
    ) -> Result<TransactionState, CoreError> {
        let next = {
            let mut inner = self.inner.lock();
            let next = inner.state.next(event)?;
            inner.state = next;
            update(&mut inner.form);
            next
        };

        debug!(state = next.name(), event = event.name(), "Transition");
        self.session.presenter().transaction_state(&next);
        Ok(next)
    }
}
