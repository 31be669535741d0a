use super::*;

fn create_test_registry() -> Registry {
    let registry = Registry::new_custom(Some("shuffle".to_string()), None).unwrap();
    register_custom_metrics(&registry);
    registry
}

#[test]
fn test_custom_registry() {
    let registry = create_test_registry();

    POOL_LEASES.with_label_values(&["created"]).inc();
    CONNECT_REJECTIONS.with_label_values(&["server_id"]).inc();
    let metrics = registry.gather();
    assert!(!metrics.is_empty());

    let metric_names: Vec<_> = metrics.iter().map(|m| m.get_name()).collect();
    assert!(
        metric_names.contains(&"shuffle_pool_leases"),
        "Missing shuffle_pool_leases"
    );
    assert!(
        metric_names.contains(&"shuffle_connect_rejections"),
        "Missing shuffle_connect_rejections"
    );
}

#[test]
fn test_counter_increment() {
    let before = CONNECT_REJECTIONS.with_label_values(&["test_only"]).get();

    CONNECT_REJECTIONS.with_label_values(&["test_only"]).inc();
    CONNECT_REJECTIONS.with_label_values(&["test_only"]).inc();

    let value = CONNECT_REJECTIONS.with_label_values(&["test_only"]).get();
    assert_eq!(value, before + 2, "Counter should increment correctly");
}
