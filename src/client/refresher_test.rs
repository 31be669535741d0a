use std::sync::Arc;

use super::*;
use crate::Error;
use crate::ServerDetail;
use crate::SystemError;

fn detail(
    server_id: &str,
    connection_string: &str,
) -> ServerDetail {
    ServerDetail::new(server_id, connection_string, Some("1.0".to_string()))
}

#[tokio::test]
async fn test_in_memory_registry_tracks_latest_detail() {
    let registry = InMemoryServiceRegistry::new();
    assert_eq!(registry.lookup_server("S1").await.unwrap(), None);

    registry.register_server(detail("S1", "h1:100"));
    registry.register_server(detail("S1", "h2:100"));
    assert_eq!(registry.lookup_server("S1").await.unwrap(), Some(detail("S1", "h2:100")));

    assert_eq!(registry.unregister_server("S1"), Some(detail("S1", "h2:100")));
    assert_eq!(registry.lookup_server("S1").await.unwrap(), None);
}

#[tokio::test]
async fn test_registry_refresher_returns_current_location() {
    let registry = Arc::new(InMemoryServiceRegistry::new());
    registry.register_server(detail("S1", "h2:100"));
    let refresher = RegistryServerConnectionRefresher::new(registry);

    let refreshed = refresher.refresh_connection(&detail("S1", "h1:100")).await.unwrap();
    assert_eq!(refreshed.connection_string(), "h2:100");
    assert!(refreshed.is_same_server(&detail("S1", "h1:100")));
}

#[tokio::test]
async fn test_registry_refresher_reports_unknown_server() {
    let refresher = RegistryServerConnectionRefresher::new(Arc::new(InMemoryServiceRegistry::new()));

    let e = refresher.refresh_connection(&detail("S9", "h1:100")).await.unwrap_err();
    assert!(matches!(e, Error::System(SystemError::ServerNotFound(ref id)) if id == "S9"));
}

#[tokio::test]
async fn test_registry_refresher_propagates_lookup_failure() {
    let mut registry = MockServiceRegistry::new();
    registry
        .expect_lookup_server()
        .withf(|server_id| server_id == "S1")
        .times(1)
        .returning(|_| Err(Error::Fatal("registry unavailable".to_string())));
    let refresher = RegistryServerConnectionRefresher::new(Arc::new(registry));

    let e = refresher.refresh_connection(&detail("S1", "h1:100")).await.unwrap_err();
    assert!(matches!(e, Error::Fatal(_)));
}
