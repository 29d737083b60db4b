use super::state_cell::StateCell;
use crate::config::SessionConfig;
use crate::domain::identity::{Identity, IdentityOrigin, Principal};
use crate::domain::ports::CredentialProviderRef;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

/// Where the session is in its sign-in chain.
///
/// `Pending -> ResolvingExisting -> [ResolvingToken] -> ResolvingAnonymous`
/// with `Ready` reachable from each resolving state and `Failed` only from
/// `ResolvingAnonymous`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    ResolvingExisting,
    ResolvingToken,
    ResolvingAnonymous,
    Ready(Identity),
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Ready(_) | SessionState::Failed)
    }

    /// The identity the rest of the system should see.
    ///
    /// `None` while resolution is still running; the failed sentinel once
    /// every strategy has been exhausted.
    pub fn identity(&self) -> Option<Identity> {
        match self {
            SessionState::Ready(identity) => Some(identity.clone()),
            SessionState::Failed => Some(Identity::failed()),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Pending => f.write_str("pending"),
            SessionState::ResolvingExisting => f.write_str("resolving-existing"),
            SessionState::ResolvingToken => f.write_str("resolving-token"),
            SessionState::ResolvingAnonymous => f.write_str("resolving-anonymous"),
            SessionState::Ready(identity) => write!(f, "ready: {identity}"),
            SessionState::Failed => f.write_str("failed"),
        }
    }
}

/// Establishes the process identity once and keeps it current.
pub struct SessionBootstrapper {
    provider: CredentialProviderRef,
    config: SessionConfig,
    state: StateCell<SessionState>,
    /// Latest principal reported while resolution was still running.
    deferred_change: Mutex<Option<Principal>>,
}

impl SessionBootstrapper {
    pub fn new(provider: CredentialProviderRef, config: SessionConfig) -> Arc<Self> {
        Arc::new(Self {
            provider,
            config,
            state: StateCell::new(SessionState::Pending),
            deferred_change: Mutex::new(None),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state.snapshot()
    }

    /// Snapshot of the current identity, `None` while pending.
    pub fn current_identity(&self) -> Option<Identity> {
        self.state.snapshot().identity()
    }

    /// Every state transition, in the order it was committed.
    ///
    /// The stream buffers 64 transitions per receiver. A receiver that falls
    /// further behind gets `RecvError::Lagged` and should resync from
    /// [`Self::state`].
    pub fn subscribe(&self) -> broadcast::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.watch()
    }

    pub fn app_id(&self) -> &str {
        self.config.app_id()
    }

    /// Starts identity resolution and waits for its outcome.
    ///
    /// Only the first call starts work. Later calls, concurrent or not,
    /// wait on the attempt already running. Resolution runs on its own
    /// task and completes even if every caller stops waiting.
    pub async fn bootstrap(self: &Arc<Self>) -> Identity {
        let started = self.state.commit_if(|state| {
            matches!(state, SessionState::Pending).then_some(SessionState::ResolvingExisting)
        });

        if started {
            info!(
                app_id = self.config.app_id(),
                token_configured = self.config.credential_token().is_some(),
                "Bootstrapping session"
            );
            if !self.config.has_app_id() {
                debug!("No application identifier configured, using default");
            }
            self.listen_for_identity_changes();
            self.spawn_resolution();
        }

        self.wait_for_identity().await
    }

    /// Waits until the session is `Ready` or `Failed`.
    pub async fn wait_for_identity(&self) -> Identity {
        let mut rx = self.state.watch();
        let identity = match rx.wait_for(SessionState::is_terminal).await {
            Ok(state) => state.identity(),
            Err(_) => None,
        };
        identity.unwrap_or_else(Identity::failed)
    }

    fn spawn_resolution(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let worker = Arc::clone(&this);
            if let Err(err) = tokio::spawn(async move { worker.resolve().await }).await {
                error!(error = %err, "Session resolution task aborted");
                this.state.commit(SessionState::Failed);
                this.apply_deferred_identity_change();
            }
        });
    }

    async fn resolve(&self) {
        let mut state = self.state.snapshot();
        while !state.is_terminal() {
            state = self.step(&state).await;
            debug!(state = %state, "Session transition");
            self.state.commit(state.clone());
        }

        match &state {
            SessionState::Ready(identity) => {
                info!(user_id = identity.id(), origin = %identity.origin(), "Session ready")
            }
            _ => error!("Identity resolution exhausted, continuing with failed session"),
        }
        self.apply_deferred_identity_change();
    }

    /// One transition of the sign-in chain.
    async fn step(&self, state: &SessionState) -> SessionState {
        match state {
            SessionState::Pending => SessionState::ResolvingExisting,
            SessionState::ResolvingExisting => self.resolve_existing().await,
            SessionState::ResolvingToken => self.resolve_token().await,
            SessionState::ResolvingAnonymous => self.resolve_anonymous().await,
            terminal => terminal.clone(),
        }
    }

    async fn resolve_existing(&self) -> SessionState {
        match self.provider.resolve_existing().await {
            Ok(Some(principal)) => {
                SessionState::Ready(Identity::new(principal, IdentityOrigin::Existing))
            }
            Ok(None) => self.after_existing(),
            Err(err) => {
                warn!(error = %err, "Could not check for an existing session");
                self.after_existing()
            }
        }
    }

    fn after_existing(&self) -> SessionState {
        if self.config.credential_token().is_some() {
            SessionState::ResolvingToken
        } else {
            debug!("No credential token configured, falling back to anonymous sign-in");
            SessionState::ResolvingAnonymous
        }
    }

    async fn resolve_token(&self) -> SessionState {
        let Some(token) = self.config.credential_token() else {
            return SessionState::ResolvingAnonymous;
        };

        // Any failure falls through to anonymous; causes are not distinguished.
        match self.provider.exchange_token(token).await {
            Ok(principal) => {
                SessionState::Ready(Identity::new(principal, IdentityOrigin::TokenExchanged))
            }
            Err(err) => {
                warn!(error = %err, "Credential token exchange failed, falling back to anonymous sign-in");
                SessionState::ResolvingAnonymous
            }
        }
    }

    async fn resolve_anonymous(&self) -> SessionState {
        match self.provider.resolve_anonymous().await {
            Ok(principal) => {
                SessionState::Ready(Identity::new(principal, IdentityOrigin::Anonymous))
            }
            Err(err) => {
                warn!(error = %err, "Anonymous sign-in failed");
                SessionState::Failed
            }
        }
    }

    fn listen_for_identity_changes(self: &Arc<Self>) {
        let session = Arc::downgrade(self);
        self.provider.on_identity_change(Arc::new(move |principal| {
            if let Some(session) = session.upgrade() {
                session.apply_identity_change(principal);
            }
        }));
    }

    /// Replaces the identity when the provider reports a different
    /// principal. A report that arrives mid-resolution is held until
    /// resolution settles; only the latest one is kept.
    fn apply_identity_change(&self, principal: Principal) {
        let mut deferred = false;
        let applied = self.state.commit_if(|state| {
            let mut held = self.deferred_change();
            if state.is_terminal() {
                // A direct report supersedes any held one.
                held.take();
                changed_identity(state, &principal)
            } else {
                *held = Some(principal.clone());
                deferred = true;
                None
            }
        });

        if applied {
            info!(user_id = %principal.id, "Session identity changed");
        } else if deferred {
            debug!(user_id = %principal.id, "Identity change deferred until resolution settles");
        } else {
            debug!(user_id = %principal.id, "Ignoring identity change notification");
        }
    }

    fn apply_deferred_identity_change(&self) {
        let mut principal = None;
        let applied = self.state.commit_if(|state| {
            let held = self.deferred_change().take()?;
            let next = changed_identity(state, &held);
            principal = Some(held);
            next
        });

        if let Some(principal) = principal {
            if applied {
                info!(user_id = %principal.id, "Session identity changed during resolution");
            } else {
                debug!(user_id = %principal.id, "Deferred identity change matches resolved identity");
            }
        }
    }

    fn deferred_change(&self) -> MutexGuard<'_, Option<Principal>> {
        match self.deferred_change.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// The state after `principal` is reported against a settled `state`, if
/// it differs.
fn changed_identity(state: &SessionState, principal: &Principal) -> Option<SessionState> {
    match state {
        SessionState::Ready(current) if current.id() == principal.id => None,
        SessionState::Ready(_) | SessionState::Failed => Some(SessionState::Ready(
            Identity::new(principal.clone(), IdentityOrigin::Existing),
        )),
        _ => None,
    }
}
