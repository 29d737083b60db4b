mod common;

use common::ScriptedProvider;
use feedesk::application::session::{SessionBootstrapper, SessionState};
use feedesk::config::SessionConfig;
use feedesk::domain::identity::{Identity, IdentityOrigin, Principal};
use feedesk::error::CredentialError;
use feedesk::infrastructure::in_memory::InMemoryCredentialProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::Receiver;

fn with_token(token: &str) -> SessionConfig {
    SessionConfig::new(Some(token.to_string()), Some("school-site".to_string()))
}

async fn collect_until_terminal(rx: &mut Receiver<SessionState>) -> Vec<SessionState> {
    let mut seen = Vec::new();
    loop {
        let state = rx.recv().await.unwrap();
        let done = state.is_terminal();
        seen.push(state);
        if done {
            return seen;
        }
    }
}

#[tokio::test]
async fn test_no_token_never_enters_token_state() {
    let provider = Arc::new(ScriptedProvider::new());
    let session = SessionBootstrapper::new(provider.clone(), SessionConfig::default());
    let mut rx = session.subscribe();

    let identity = session.bootstrap().await;

    let transitions = collect_until_terminal(&mut rx).await;
    assert_eq!(
        transitions,
        vec![
            SessionState::ResolvingExisting,
            SessionState::ResolvingAnonymous,
            SessionState::Ready(identity.clone()),
        ]
    );
    assert_eq!(identity.origin(), IdentityOrigin::Anonymous);
    assert_eq!(provider.calls(), vec!["existing", "anonymous"]);
}

#[tokio::test]
async fn test_token_exchange_success() {
    let provider =
        Arc::new(ScriptedProvider::new().exchange(Ok(Principal::new("student-42"))));
    let session = SessionBootstrapper::new(provider.clone(), with_token("opaque"));
    let mut rx = session.subscribe();

    let identity = session.bootstrap().await;

    assert_eq!(identity.id(), "student-42");
    assert_eq!(identity.origin(), IdentityOrigin::TokenExchanged);
    assert_eq!(
        collect_until_terminal(&mut rx).await,
        vec![
            SessionState::ResolvingExisting,
            SessionState::ResolvingToken,
            SessionState::Ready(identity),
        ]
    );
    assert_eq!(provider.calls(), vec!["existing", "exchange"]);
}

#[tokio::test]
async fn test_token_failure_falls_back_to_anonymous() {
    let provider = Arc::new(ScriptedProvider::new().exchange(Err(CredentialError::Unavailable(
        "network down".to_string(),
    ))));
    let session = SessionBootstrapper::new(provider.clone(), with_token("expired"));
    let mut rx = session.subscribe();

    let identity = session.bootstrap().await;

    assert_eq!(identity.origin(), IdentityOrigin::Anonymous);
    assert_eq!(
        collect_until_terminal(&mut rx).await,
        vec![
            SessionState::ResolvingExisting,
            SessionState::ResolvingToken,
            SessionState::ResolvingAnonymous,
            SessionState::Ready(identity),
        ]
    );
}

#[tokio::test]
async fn test_existing_lookup_error_is_not_fatal() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .existing(Err(CredentialError::Unavailable("offline".to_string())))
            .exchange(Ok(Principal::new("student-7"))),
    );
    let session = SessionBootstrapper::new(provider.clone(), with_token("opaque"));

    let identity = session.bootstrap().await;

    assert_eq!(identity.id(), "student-7");
    assert_eq!(provider.calls(), vec!["existing", "exchange"]);
}

#[tokio::test]
async fn test_exhausted_resolution_presents_failed_sentinel() {
    let provider = Arc::new(ScriptedProvider::new().anonymous(Err(
        CredentialError::Unavailable("anonymous auth disabled".to_string()),
    )));
    let session = SessionBootstrapper::new(provider, with_token("bad"));
    let mut rx = session.subscribe();

    let identity = session.bootstrap().await;

    assert_eq!(identity, Identity::failed());
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(session.current_identity(), Some(Identity::failed()));
    assert_eq!(
        collect_until_terminal(&mut rx).await.last(),
        Some(&SessionState::Failed)
    );
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_bootstrap_resolves_once() {
    let provider = Arc::new(ScriptedProvider::new().delay(Duration::from_millis(50)));
    let session = SessionBootstrapper::new(provider.clone(), SessionConfig::default());
    let mut rx = session.subscribe();

    let (first, second) = tokio::join!(session.bootstrap(), session.bootstrap());

    assert_eq!(first, second);
    assert_eq!(provider.calls(), vec!["existing", "anonymous"]);
    assert_eq!(
        collect_until_terminal(&mut rx).await,
        vec![
            SessionState::ResolvingExisting,
            SessionState::ResolvingAnonymous,
            SessionState::Ready(first.clone()),
        ]
    );
    assert!(rx.try_recv().is_err());

    // A late call observes the settled outcome without new work.
    assert_eq!(session.bootstrap().await, first);
    assert_eq!(provider.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_resolution_survives_abandoned_caller() {
    let provider = Arc::new(ScriptedProvider::new().delay(Duration::from_millis(100)));
    let session = SessionBootstrapper::new(provider.clone(), SessionConfig::default());

    let abandoned =
        tokio::time::timeout(Duration::from_millis(10), session.bootstrap()).await;
    assert!(abandoned.is_err());
    assert_eq!(session.current_identity(), None);

    let identity = session.wait_for_identity().await;
    assert_eq!(identity.origin(), IdentityOrigin::Anonymous);
    assert_eq!(provider.calls(), vec!["existing", "anonymous"]);
}

#[tokio::test]
async fn test_identity_change_replaces_identity() {
    let provider =
        Arc::new(InMemoryCredentialProvider::new().with_existing(Principal::new("parent-1")));
    let session = SessionBootstrapper::new(provider.clone(), SessionConfig::default());
    let before = session.bootstrap().await;
    let mut rx = session.subscribe();

    provider.sign_in(Principal::new("parent-2")).await;

    let after = session.current_identity().unwrap();
    assert_eq!(before.id(), "parent-1");
    assert_eq!(after.id(), "parent-2");
    assert_eq!(after.origin(), IdentityOrigin::Existing);
    assert_eq!(rx.recv().await.unwrap(), SessionState::Ready(after));
}

#[tokio::test(start_paused = true)]
async fn test_identity_change_during_resolution_applies_once_settled() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .exchange(Ok(Principal::new("student-1")))
            .delay(Duration::from_millis(50)),
    );
    let session = SessionBootstrapper::new(provider.clone(), with_token("opaque"));
    let mut rx = session.subscribe();

    let bootstrap = tokio::spawn({
        let session = session.clone();
        async move { session.bootstrap().await }
    });
    tokio::time::sleep(Duration::from_millis(75)).await;
    assert_eq!(session.state(), SessionState::ResolvingToken);

    provider.emit(Principal::new("parent-2"));
    assert_eq!(session.state(), SessionState::ResolvingToken);

    bootstrap.await.unwrap();

    let resolved = Identity::new(Principal::new("student-1"), IdentityOrigin::TokenExchanged);
    let changed = Identity::new(Principal::new("parent-2"), IdentityOrigin::Existing);
    assert_eq!(
        collect_until_terminal(&mut rx).await,
        vec![
            SessionState::ResolvingExisting,
            SessionState::ResolvingToken,
            SessionState::Ready(resolved),
        ]
    );
    assert_eq!(rx.recv().await.unwrap(), SessionState::Ready(changed.clone()));
    assert_eq!(session.current_identity(), Some(changed));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_sign_in_after_failure_recovers() {
    let provider = Arc::new(InMemoryCredentialProvider::new().without_anonymous());
    let session = SessionBootstrapper::new(provider.clone(), SessionConfig::default());
    assert!(session.bootstrap().await.is_failed());

    provider.sign_in(Principal::new("parent-9")).await;

    assert_eq!(session.current_identity().unwrap().id(), "parent-9");
}

#[tokio::test]
async fn test_app_id_defaults_when_absent() {
    let session = SessionBootstrapper::new(
        Arc::new(InMemoryCredentialProvider::new()),
        SessionConfig::default(),
    );
    assert_eq!(session.app_id(), feedesk::config::DEFAULT_APP_ID);

    let session = SessionBootstrapper::new(
        Arc::new(InMemoryCredentialProvider::new()),
        with_token("t"),
    );
    assert_eq!(session.app_id(), "school-site");
}
