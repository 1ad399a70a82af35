//! SSRF guard policy: private destinations and the host allowlist

use pricewatch::tracking::{GuardError, UrlGuard};

#[tokio::test]
async fn private_destination_is_rejected() {
    let guard = UrlGuard::default();
    let err = guard.validate("http://10.0.0.5/").await.unwrap_err();
    assert_eq!(err, GuardError::PrivateDestination);
    assert_eq!(err.kind(), "private_destination");
}

#[tokio::test]
async fn allowlist_rejects_unlisted_host() {
    let guard = UrlGuard::new(["example.org"]);
    let err = guard.validate("http://example.com/").await.unwrap_err();
    assert_eq!(err, GuardError::NotAllowlisted);
    assert_eq!(err.kind(), "not_allowlisted");
}

#[tokio::test]
async fn allowlist_check_precedes_resolution() {
    // A host that could never resolve still gets the allowlist verdict
    let guard = UrlGuard::new(["example.org"]);
    let err = guard
        .validate("http://no-such-host.invalid/")
        .await
        .unwrap_err();
    assert_eq!(err, GuardError::NotAllowlisted);
}

#[tokio::test]
async fn scheme_and_localhost_policy() {
    let guard = UrlGuard::default();
    assert_eq!(
        guard.validate("ftp://example.com/").await.unwrap_err(),
        GuardError::SchemeForbidden
    );
    assert_eq!(
        guard.validate("http://localhost:8080/").await.unwrap_err(),
        GuardError::LocalhostRefused
    );
    assert_eq!(
        guard.validate("%%%").await.unwrap_err(),
        GuardError::InvalidUrl
    );
}

#[tokio::test]
async fn link_local_and_ula_ranges() {
    let guard = UrlGuard::default();
    for target in ["http://169.254.169.254/latest/meta-data/", "http://[fd12:3456::1]/"] {
        assert_eq!(
            guard.validate(target).await.unwrap_err(),
            GuardError::PrivateDestination,
            "expected rejection for {target}"
        );
    }
}
