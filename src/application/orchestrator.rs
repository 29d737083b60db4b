use super::session::SessionBootstrapper;
use super::state_cell::StateCell;
use crate::config::OrchestratorConfig;
use crate::domain::ports::{PaymentGatewayRef, PaymentRequest};
use crate::domain::transaction::{Amount, Transaction, TransactionState, TransactionStatus};
use crate::error::SubmitError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Message shown to the user for any failed payment.
pub const PAYMENT_FAILED_MESSAGE: &str = "Payment failed. Please try again.";
/// Prefix of the reference invented when the remote omits one.
pub const PLACEHOLDER_REFERENCE_PREFIX: &str = "SIM";

/// Drives at most one payment at a time and publishes its status.
///
/// `Idle -> Processing -> Succeeded | Failed -> Idle`, where the return to
/// `Idle` happens after the display window. A submission is only accepted
/// from `Idle`.
pub struct TransactionOrchestrator {
    gateway: PaymentGatewayRef,
    session: Arc<SessionBootstrapper>,
    display_window: Duration,
    inner: Arc<Inner>,
}

struct Inner {
    status: StateCell<TransactionStatus>,
    disposed: AtomicBool,
    dismissal: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    /// Commits `next` if the orchestrator is still live and `expected` is
    /// the transaction currently on display.
    fn advance(&self, expected: Uuid, next: TransactionStatus) -> bool {
        self.status.commit_if(|current| {
            if self.disposed.load(Ordering::SeqCst) {
                return None;
            }
            match current.transaction() {
                Some(tx) if tx.id == expected => Some(next),
                _ => None,
            }
        })
    }

    fn set_dismissal(&self, handle: JoinHandle<()>) {
        let mut slot = match self.dismissal.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if self.disposed.load(Ordering::SeqCst) {
            handle.abort();
            return;
        }
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    fn cancel_dismissal(&self) {
        let mut slot = match self.dismissal.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

/// Handle to an accepted submission.
pub struct TransactionHandle {
    id: Uuid,
    task: JoinHandle<TransactionStatus>,
}

impl TransactionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Waits for the payment call to finish and returns its terminal status.
    ///
    /// The result is returned even if the orchestrator was disposed and the
    /// status therefore never published.
    pub async fn outcome(self) -> crate::error::Result<TransactionStatus> {
        Ok(self.task.await?)
    }
}

impl TransactionOrchestrator {
    pub fn new(
        gateway: PaymentGatewayRef,
        session: Arc<SessionBootstrapper>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            gateway,
            session,
            display_window: config.display_window,
            inner: Arc::new(Inner {
                status: StateCell::new(TransactionStatus::Idle),
                disposed: AtomicBool::new(false),
                dismissal: Mutex::new(None),
            }),
        }
    }

    pub fn status(&self) -> TransactionStatus {
        self.inner.status.snapshot()
    }

    /// Every status transition, in the order it was committed.
    ///
    /// The stream buffers 64 transitions per receiver. A receiver that falls
    /// further behind gets `RecvError::Lagged` and should resync from
    /// [`Self::status`].
    pub fn subscribe(&self) -> broadcast::Receiver<TransactionStatus> {
        self.inner.status.subscribe()
    }

    pub fn watch(&self) -> watch::Receiver<TransactionStatus> {
        self.inner.status.watch()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Accepts a payment of `amount` and starts it in the background.
    ///
    /// Refusals are decided synchronously and leave the current status
    /// untouched. The requester id is read from the session once, here.
    pub fn submit(&self, amount: u64) -> Result<TransactionHandle, SubmitError> {
        if self.is_disposed() {
            return Err(SubmitError::Disposed);
        }
        let amount = Amount::new(amount)?;
        let identity = self
            .session
            .current_identity()
            .ok_or(SubmitError::SessionPending)?;
        if identity.is_failed() {
            return Err(SubmitError::IdentityUnavailable);
        }
        // Checked before committing so a refusal leaves the status untouched.
        let runtime = Handle::try_current().map_err(|_| SubmitError::NoRuntime)?;

        let transaction = Transaction::start(amount, identity.id());
        let id = transaction.id;
        let request = PaymentRequest {
            amount: amount.value(),
            user_id: transaction.requester_id.clone(),
        };

        let mut refusal = None;
        let accepted = self.inner.status.commit_if(|current| {
            if self.inner.disposed.load(Ordering::SeqCst) {
                refusal = Some(SubmitError::Disposed);
                return None;
            }
            match current.state() {
                TransactionState::Idle => Some(TransactionStatus::Processing {
                    transaction: transaction.clone(),
                }),
                TransactionState::Processing => {
                    refusal = Some(SubmitError::AlreadyInProgress);
                    None
                }
                TransactionState::Succeeded | TransactionState::Failed => {
                    refusal = Some(SubmitError::AwaitingDismissal);
                    None
                }
            }
        });
        if !accepted {
            let err = refusal.unwrap_or(SubmitError::AlreadyInProgress);
            debug!(error = %err, "Payment submission refused");
            return Err(err);
        }

        info!(
            transaction_id = %id,
            amount = amount.value(),
            user_id = %transaction.requester_id,
            "Payment submitted"
        );

        let task = runtime.spawn(run_payment(
            self.gateway.clone(),
            self.inner.clone(),
            transaction,
            request,
            self.display_window,
        ));

        Ok(TransactionHandle { id, task })
    }

    /// Stops publishing status and cancels the pending auto-dismissal.
    ///
    /// A payment call already on the wire runs to completion but its result
    /// is not published.
    pub fn dispose(&self) {
        // Taken under the status lock so no commit can interleave.
        self.inner.status.commit_if(|_| {
            self.inner.disposed.store(true, Ordering::SeqCst);
            None
        });
        self.inner.cancel_dismissal();
        debug!("Transaction orchestrator disposed");
    }
}

impl Drop for TransactionOrchestrator {
    fn drop(&mut self) {
        if !self.is_disposed() {
            self.dispose();
        }
    }
}

async fn run_payment(
    gateway: PaymentGatewayRef,
    inner: Arc<Inner>,
    transaction: Transaction,
    request: PaymentRequest,
    display_window: Duration,
) -> TransactionStatus {
    let id = transaction.id;
    let terminal = match gateway.submit(request).await {
        Ok(receipt) => {
            let reference = receipt
                .transaction_id
                .filter(|r| !r.is_empty())
                .unwrap_or_else(placeholder_reference);
            info!(transaction_id = %id, reference = %reference, "Payment succeeded");
            TransactionStatus::Succeeded {
                transaction: transaction.succeed(reference),
            }
        }
        Err(err) => {
            warn!(transaction_id = %id, error = %err, "Payment failed");
            TransactionStatus::Failed {
                transaction: transaction.fail(),
                message: PAYMENT_FAILED_MESSAGE.to_string(),
            }
        }
    };

    if inner.advance(id, terminal.clone()) {
        schedule_dismissal(&inner, id, display_window);
    } else {
        debug!(transaction_id = %id, "Orchestrator disposed, result not published");
    }

    terminal
}

fn schedule_dismissal(inner: &Arc<Inner>, id: Uuid, display_window: Duration) {
    let state = Arc::clone(inner);
    let handle = tokio::spawn(async move {
        tokio::time::sleep(display_window).await;
        if state.advance(id, TransactionStatus::Idle) {
            debug!(transaction_id = %id, "Payment result dismissed");
        }
    });
    inner.set_dismissal(handle);
}

fn placeholder_reference() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!(
        "{PLACEHOLDER_REFERENCE_PREFIX}-{}",
        simple[..12].to_ascii_uppercase()
    )
}
