//! Activation behavior of the plugin registry.

use lumen_plugin_api::{
    AutoStart, FilterDecision, PluginDescriptor, PluginError, PluginFilter, PluginId, PluginState, Token,
};
use lumen_plugin_runtime::PluginRegistry;
use mockall::mock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct App;

#[derive(Debug, PartialEq)]
struct Value {
    value: u32,
}

fn registry() -> PluginRegistry<App> {
    PluginRegistry::new(Arc::new(App))
}

fn id(value: &str) -> PluginId {
    PluginId::new(value)
}

/// A plugin that counts its activations and provides nothing.
fn counted(name: &str, calls: &Arc<AtomicUsize>) -> PluginDescriptor<App> {
    let calls = Arc::clone(calls);
    PluginDescriptor::builder(name)
        .activate(move |_app, _deps| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .build()
        .unwrap()
}

mock! {
    pub Filter {}

    impl PluginFilter for Filter {
        fn decide(&self, id: &PluginId) -> FilterDecision;
    }
}

#[tokio::test]
async fn test_dependent_sees_provider_value() {
    let token_a = Token::<Value>::new("TokenA");
    let token_b = Token::<Value>::new("TokenB");
    let registry = registry();

    registry
        .register(
            PluginDescriptor::builder("A")
                .provides(&token_a)
                .activate(|_app, _deps| async { Ok(Value { value: 1 }) })
                .build()
                .unwrap(),
        )
        .unwrap();

    let requires_a = token_a.clone();
    registry
        .register(
            PluginDescriptor::builder("B")
                .requires(&token_a)
                .provides(&token_b)
                .activate(move |_app, deps| {
                    let a = deps.required(&requires_a);
                    async move {
                        let a = a?;
                        Ok::<_, anyhow::Error>(Value { value: a.value + 1 })
                    }
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    let service = registry.activate(&id("B")).await.unwrap().unwrap();
    let b = service.downcast::<Value>().unwrap();
    assert_eq!(*b, Value { value: 2 });

    let a_info = registry.plugin_info(&id("A")).unwrap();
    let b_info = registry.plugin_info(&id("B")).unwrap();
    assert_eq!(a_info.state, PluginState::Activated);
    assert_eq!(b_info.state, PluginState::Activated);
    assert!(a_info.finished_seq.unwrap() < b_info.started_seq.unwrap());
    assert!(a_info.finished_at.unwrap() <= b_info.finished_at.unwrap());
}

#[tokio::test]
async fn test_sequential_activation_is_idempotent() {
    let token = Token::<Value>::new("counter");
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = registry();

    let counter = Arc::clone(&calls);
    registry
        .register(
            PluginDescriptor::builder("counter")
                .provides(&token)
                .activate(move |_app, _deps| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Ok(Value { value: 7 }) }
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    let first = registry.activate(&id("counter")).await.unwrap().unwrap();
    let second = registry.activate(&id("counter")).await.unwrap().unwrap();
    let resolved = registry.resolve(&token).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(resolved.value, 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_activation_runs_body_once() {
    let token = Token::<Value>::new("slow");
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = registry();

    let counter = Arc::clone(&calls);
    registry
        .register(
            PluginDescriptor::builder("slow")
                .provides(&token)
                .activate(move |_app, _deps| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(Value { value: 3 })
                    }
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            tokio::spawn(async move { registry.activate(&id("slow")).await })
        })
        .collect();

    let mut services = Vec::new();
    for handle in handles {
        services.push(handle.await.unwrap().unwrap().unwrap());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(services.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

#[tokio::test]
async fn test_shared_dependency_built_once() {
    let base = Token::<Value>::new("base");
    let left = Token::<Value>::new("left");
    let right = Token::<Value>::new("right");
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = registry();

    let counter = Arc::clone(&calls);
    registry
        .register(
            PluginDescriptor::builder("base")
                .provides(&base)
                .activate(move |_app, _deps| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Ok(Value { value: 1 }) }
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    for (name, token) in [("left", &left), ("right", &right)] {
        registry
            .register(
                PluginDescriptor::builder(name)
                    .requires(&base)
                    .provides(token)
                    .activate(|_app, _deps| async { Ok(Value { value: 2 }) })
                    .build()
                    .unwrap(),
            )
            .unwrap();
    }

    registry
        .register(
            PluginDescriptor::builder("top")
                .requires(&left)
                .requires(&right)
                .activate(|_app, _deps| async { Ok(()) })
                .build()
                .unwrap(),
        )
        .unwrap();

    assert!(registry.activate(&id("top")).await.unwrap().is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let left_info = registry.plugin_info(&id("left")).unwrap();
    let right_info = registry.plugin_info(&id("right")).unwrap();
    let top_info = registry.plugin_info(&id("top")).unwrap();
    // Required tokens resolve in declaration order.
    assert!(left_info.finished_seq.unwrap() < right_info.started_seq.unwrap());
    assert!(right_info.finished_seq.unwrap() < top_info.started_seq.unwrap());
}

fn cyclic_registry(calls: &Arc<AtomicUsize>) -> PluginRegistry<App> {
    let ta = Token::<Value>::new("ta");
    let tb = Token::<Value>::new("tb");
    let registry = registry();

    for (name, provides, requires) in [("a", &ta, &tb), ("b", &tb, &ta)] {
        let counter = Arc::clone(calls);
        registry
            .register(
                PluginDescriptor::builder(name)
                    .provides(provides)
                    .requires(requires)
                    .activate(move |_app, _deps| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        async { Ok(Value { value: 0 }) }
                    })
                    .build()
                    .unwrap(),
            )
            .unwrap();
    }

    registry
}

#[tokio::test]
async fn test_cycle_detected_without_running_bodies() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = cyclic_registry(&calls);

    let err = registry.activate(&id("a")).await.unwrap_err();
    match &err {
        PluginError::CyclicDependency { cycle } => {
            assert_eq!(cycle, &vec![id("a"), id("b"), id("a")]);
        }
        other => panic!("expected a cycle, got {other:?}"),
    }

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(registry.state(&id("a")), Some(PluginState::Failed));
    assert_eq!(registry.state(&id("b")), Some(PluginState::Failed));

    // The failure is cached for both members.
    let err = registry.activate(&id("b")).await.unwrap_err();
    assert!(matches!(err, PluginError::CyclicDependency { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_cycle_does_not_deadlock() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = cyclic_registry(&calls);

    let first = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.activate(&id("a")).await })
    };
    let second = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.activate(&id("b")).await })
    };

    let (first, second) = tokio::time::timeout(Duration::from_secs(5), async {
        (first.await.unwrap(), second.await.unwrap())
    })
    .await
    .expect("cyclic activation must settle");

    assert!(first.unwrap_err().is_cycle());
    assert!(second.unwrap_err().is_cycle());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_dependent_of_cycle_fails_with_dependency_error() {
    let ta = Token::<Value>::new("ta");
    let tb = Token::<Value>::new("tb");
    let registry = registry();

    registry
        .register(
            PluginDescriptor::builder("a")
                .provides(&ta)
                .requires(&tb)
                .activate(|_app, _deps| async { Ok(Value { value: 0 }) })
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register(
            PluginDescriptor::builder("b")
                .provides(&tb)
                .optional(&ta)
                .activate(|_app, _deps| async { Ok(Value { value: 0 }) })
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register(
            PluginDescriptor::builder("c")
                .requires(&ta)
                .activate(|_app, _deps| async { Ok(()) })
                .build()
                .unwrap(),
        )
        .unwrap();

    let err = registry.activate(&id("c")).await.unwrap_err();
    match &err {
        PluginError::DependencyFailed { plugin, dependency, .. } => {
            assert_eq!(plugin, &id("c"));
            assert_eq!(dependency, "a");
        }
        other => panic!("expected a dependency failure, got {other:?}"),
    }
    assert!(matches!(
        err.root_cause(),
        PluginError::CyclicDependency { cycle } if cycle == &vec![id("a"), id("b"), id("a")]
    ));

    // The optional edge still closes the cycle for its members.
    assert!(registry.activate(&id("b")).await.unwrap_err().is_cycle());
}

#[tokio::test]
async fn test_missing_required_provider() {
    let absent = Token::<Value>::new("absent");
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = registry();

    let counter = Arc::clone(&calls);
    registry
        .register(
            PluginDescriptor::builder("needy")
                .requires(&absent)
                .activate(move |_app, _deps| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    let err = registry.activate(&id("needy")).await.unwrap_err();
    assert!(matches!(
        &err,
        PluginError::DependencyFailed { cause, .. } if matches!(**cause, PluginError::NoProvider { .. })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let info = registry.plugin_info(&id("needy")).unwrap();
    assert_eq!(info.state, PluginState::Failed);
    assert!(info.started_seq.is_none());
    assert!(info.error.unwrap().contains("needy"));
}

#[tokio::test]
async fn test_failure_is_cached() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = registry();

    let counter = Arc::clone(&calls);
    registry
        .register(
            PluginDescriptor::builder("broken")
                .activate(move |_app, _deps| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>(anyhow::anyhow!("boom")) }
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    for _ in 0..3 {
        let err = registry.activate(&id("broken")).await.unwrap_err();
        assert_eq!(err.error_code(), "ACTIVATION_FAILED");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_optional_dependency_absent_or_failed() {
    let missing = Token::<Value>::new("missing");
    let flaky = Token::<Value>::new("flaky");
    let registry = registry();

    registry
        .register(
            PluginDescriptor::builder("flaky")
                .provides(&flaky)
                .activate(|_app, _deps| async { Err::<Value, _>(anyhow::anyhow!("no luck")) })
                .build()
                .unwrap(),
        )
        .unwrap();

    let (missing_probe, flaky_probe) = (missing.clone(), flaky.clone());
    registry
        .register(
            PluginDescriptor::builder("consumer")
                .optional(&missing)
                .optional(&flaky)
                .activate(move |_app, deps| {
                    let seen = (
                        deps.optional(&missing_probe).is_none(),
                        deps.optional(&flaky_probe).is_none(),
                    );
                    async move { Ok(seen) }
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    registry.activate(&id("consumer")).await.unwrap();
    assert!(registry.is_activated(&id("consumer")));
    assert_eq!(registry.state(&id("flaky")), Some(PluginState::Failed));

    assert!(registry.resolve_optional(&missing).await.is_none());
    assert!(registry.resolve_optional(&flaky).await.is_none());
}

#[tokio::test]
async fn test_duplicate_provider_rejected() {
    let token = Token::<Value>::new("shared");
    let registry = registry();

    let provider = |name: &str| {
        PluginDescriptor::<App>::builder(name)
            .provides(&token)
            .activate(|_app, _deps| async { Ok(Value { value: 1 }) })
            .build()
            .unwrap()
    };

    registry.register(provider("first")).unwrap();
    let err = registry.register(provider("second")).unwrap_err();

    match err {
        PluginError::DuplicateProvider { existing, rejected, .. } => {
            assert_eq!(existing, id("first"));
            assert_eq!(rejected, id("second"));
        }
        other => panic!("expected duplicate provider, got {other:?}"),
    }
    assert!(!registry.has_plugin(&id("second")));
    assert_eq!(registry.provider_of(token.erased()), Some(id("first")));
}

#[tokio::test]
async fn test_activate_all_isolates_failures() {
    let fragile = Token::<Value>::new("fragile");
    let registry = registry();

    registry
        .register(
            PluginDescriptor::builder("fragile")
                .provides(&fragile)
                .auto_start(true)
                .activate(|_app, _deps| async { Err::<Value, _>(anyhow::anyhow!("fragile")) })
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register(
            PluginDescriptor::builder("dependent")
                .requires(&fragile)
                .auto_start(true)
                .activate(|_app, _deps| async { Ok(()) })
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register(
            PluginDescriptor::builder("healthy")
                .auto_start(true)
                .activate(|_app, _deps| async { Ok(()) })
                .build()
                .unwrap(),
        )
        .unwrap();

    let report = registry.activate_all(true).await;

    assert_eq!(report.activated, vec![id("healthy")]);
    assert_eq!(report.failed_ids(), vec![&id("fragile"), &id("dependent")]);
    assert!(matches!(
        report.failure(&id("dependent")),
        Some(PluginError::DependencyFailed { .. })
    ));
    assert!(registry.is_activated(&id("healthy")));
}

#[tokio::test]
async fn test_activate_all_respects_auto_start_only() {
    let eager = Arc::new(AtomicUsize::new(0));
    let lazy = Arc::new(AtomicUsize::new(0));
    let registry = registry();

    let eager_counter = Arc::clone(&eager);
    registry
        .register(
            PluginDescriptor::builder("eager")
                .auto_start(AutoStart::Always)
                .activate(move |_app, _deps| {
                    eager_counter.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                })
                .build()
                .unwrap(),
        )
        .unwrap();
    registry.register(counted("lazy", &lazy)).unwrap();

    let report = registry.activate_all(true).await;
    assert_eq!(report.activated, vec![id("eager")]);
    assert_eq!(lazy.load(Ordering::SeqCst), 0);

    let report = registry.activate_all(false).await;
    assert_eq!(report.activated, vec![id("eager"), id("lazy")]);
    assert_eq!(eager.load(Ordering::SeqCst), 1);
    assert_eq!(lazy.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_deferred_phase() {
    let deferred_calls = Arc::new(AtomicUsize::new(0));
    let registry = registry();

    let counter = Arc::clone(&deferred_calls);
    registry
        .register(
            PluginDescriptor::builder("help")
                .auto_start(AutoStart::Defer)
                .activate(move |_app, _deps| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    let report = registry.activate_all(true).await;
    assert_eq!(report.deferred, vec![id("help")]);
    assert_eq!(registry.deferred_plugins(), vec![id("help")]);
    assert_eq!(registry.state(&id("help")), Some(PluginState::Pending));

    let report = registry.activate_deferred().await;
    assert_eq!(report.activated, vec![id("help")]);
    assert!(registry.deferred_plugins().is_empty());
    assert_eq!(deferred_calls.load(Ordering::SeqCst), 1);

    // The list was drained.
    let report = registry.activate_deferred().await;
    assert!(report.activated.is_empty());
}

#[tokio::test]
async fn test_filter_decisions() {
    let base = Token::<Value>::new("base");
    let registry = registry();

    registry
        .register(
            PluginDescriptor::builder("base")
                .provides(&base)
                .auto_start(true)
                .activate(|_app, _deps| async { Ok(Value { value: 1 }) })
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register(
            PluginDescriptor::builder("user")
                .requires(&base)
                .auto_start(true)
                .activate(|_app, _deps| async { Ok(()) })
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register(
            PluginDescriptor::builder("later")
                .auto_start(true)
                .activate(|_app, _deps| async { Ok(()) })
                .build()
                .unwrap(),
        )
        .unwrap();

    let mut filter = MockFilter::new();
    filter
        .expect_decide()
        .withf(|id| id.as_str() == "base")
        .times(1)
        .return_const(FilterDecision::Disabled);
    filter
        .expect_decide()
        .withf(|id| id.as_str() == "later")
        .times(1)
        .return_const(FilterDecision::Deferred);
    filter
        .expect_decide()
        .withf(|id| id.as_str() == "user")
        .times(1)
        .return_const(FilterDecision::Enabled);

    let report = registry.activate_all_with(true, &filter).await;

    assert_eq!(report.skipped, vec![id("base")]);
    assert_eq!(report.deferred, vec![id("later")]);
    assert_eq!(report.activated, vec![id("user")]);
    // A disabled plugin still activates on demand as a dependency.
    assert!(registry.is_activated(&id("base")));
    assert_eq!(registry.state(&id("later")), Some(PluginState::Pending));
}

#[tokio::test]
async fn test_deregister_and_recover() {
    let token = Token::<Value>::new("recoverable");
    let registry = registry();

    registry
        .register(
            PluginDescriptor::builder("recoverable")
                .provides(&token)
                .activate(|_app, _deps| async { Err::<Value, _>(anyhow::anyhow!("first try")) })
                .build()
                .unwrap(),
        )
        .unwrap();
    assert!(registry.resolve(&token).await.is_err());

    // Failed plugins can be removed without force.
    let old = registry.deregister(&id("recoverable"), false).unwrap();
    assert_eq!(old.id(), &id("recoverable"));
    assert!(registry.provider_of(token.erased()).is_none());

    registry
        .register(
            PluginDescriptor::builder("recoverable")
                .provides(&token)
                .activate(|_app, _deps| async { Ok(Value { value: 42 }) })
                .build()
                .unwrap(),
        )
        .unwrap();
    assert_eq!(registry.state(&id("recoverable")), Some(PluginState::Pending));
    assert_eq!(registry.resolve(&token).await.unwrap().value, 42);

    let err = registry.deregister(&id("recoverable"), false).unwrap_err();
    assert!(matches!(err, PluginError::StillActivated { .. }));
    assert!(registry.deregister(&id("recoverable"), true).is_ok());
    assert!(!registry.has_plugin(&id("recoverable")));

    let err = registry.deregister(&id("recoverable"), true).unwrap_err();
    assert!(matches!(err, PluginError::UnknownPlugin { .. }));
}

#[tokio::test]
async fn test_activation_body_can_use_registry() {
    let inner = Token::<Value>::new("inner");
    let registry = registry();

    registry
        .register(
            PluginDescriptor::builder("inner")
                .provides(&inner)
                .activate(|_app, _deps| async { Ok(Value { value: 5 }) })
                .build()
                .unwrap(),
        )
        .unwrap();

    let handle = registry.clone();
    let lookup = inner.clone();
    registry
        .register(
            PluginDescriptor::builder("outer")
                .activate(move |_app, _deps| {
                    let handle = handle.clone();
                    let lookup = lookup.clone();
                    async move {
                        let value = handle.resolve(&lookup).await?;
                        anyhow::ensure!(value.value == 5, "unexpected value");
                        Ok(())
                    }
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    registry.activate(&id("outer")).await.unwrap();
    assert!(registry.is_activated(&id("inner")));
}

#[tokio::test]
async fn test_reentrant_request_closing_cycle_fails() {
    let first = Token::<Value>::new("first");
    let second = Token::<Value>::new("second");
    let registry = registry();

    let handle = registry.clone();
    let lookup = second.clone();
    registry
        .register(
            PluginDescriptor::builder("a")
                .provides(&first)
                .activate(move |_app, _deps| {
                    let handle = handle.clone();
                    let lookup = lookup.clone();
                    async move {
                        let value = handle.resolve(&lookup).await?;
                        Ok(Value { value: value.value })
                    }
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    let needed = first.clone();
    registry
        .register(
            PluginDescriptor::builder("b")
                .requires(&first)
                .provides(&second)
                .activate(move |_app, deps| {
                    let value = deps.required(&needed);
                    async move { Ok(Value { value: value?.value + 1 }) }
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    let err = tokio::time::timeout(Duration::from_secs(5), registry.activate(&id("a")))
        .await
        .expect("re-entrant cycle must settle")
        .unwrap_err();

    let expected = vec![id("a"), id("b"), id("a")];
    assert!(matches!(&err, PluginError::CyclicDependency { cycle } if *cycle == expected));
    assert_eq!(registry.state(&id("a")), Some(PluginState::Failed));
    assert_eq!(registry.state(&id("b")), Some(PluginState::Failed));
    assert!(registry.activate(&id("b")).await.unwrap_err().is_cycle());
}

#[tokio::test]
async fn test_dependency_body_requesting_its_dependent_fails() {
    let upper = Token::<Value>::new("upper");
    let lower = Token::<Value>::new("lower");
    let lower_calls = Arc::new(AtomicUsize::new(0));
    let upper_calls = Arc::new(AtomicUsize::new(0));
    let registry = registry();

    let counter = Arc::clone(&upper_calls);
    let needed = lower.clone();
    registry
        .register(
            PluginDescriptor::builder("upper")
                .requires(&lower)
                .provides(&upper)
                .activate(move |_app, deps| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let value = deps.required(&needed);
                    async move { Ok(Value { value: value?.value }) }
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    let counter = Arc::clone(&lower_calls);
    let handle = registry.clone();
    let lookup = upper.clone();
    registry
        .register(
            PluginDescriptor::builder("lower")
                .provides(&lower)
                .activate(move |_app, _deps| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let handle = handle.clone();
                    let lookup = lookup.clone();
                    async move {
                        handle.resolve(&lookup).await?;
                        Ok(Value { value: 1 })
                    }
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    let err = tokio::time::timeout(Duration::from_secs(5), registry.activate(&id("upper")))
        .await
        .expect("re-entrant cycle must settle")
        .unwrap_err();

    assert!(err.is_cycle());
    let lower_err = registry.activate(&id("lower")).await.unwrap_err();
    let expected = vec![id("lower"), id("upper"), id("lower")];
    assert!(matches!(&lower_err, PluginError::CyclicDependency { cycle } if *cycle == expected));
    assert_eq!(lower_calls.load(Ordering::SeqCst), 1);
    assert_eq!(upper_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_activate_all_without_auto_start_only_includes_deferred() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = registry();

    let counter = Arc::clone(&calls);
    registry
        .register(
            PluginDescriptor::builder("help")
                .auto_start(AutoStart::Defer)
                .activate(move |_app, _deps| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    let report = registry.activate_all(false).await;
    assert_eq!(report.activated, vec![id("help")]);
    assert!(report.deferred.is_empty());
    assert!(registry.deferred_plugins().is_empty());
    assert_eq!(registry.state(&id("help")), Some(PluginState::Activated));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_resolve_without_provider() {
    let token = Token::<Value>::new("nobody");
    let err = registry().resolve(&token).await.unwrap_err();
    assert!(matches!(err, PluginError::NoProvider { ref token } if token == "nobody"));
}

#[test]
fn test_diagnose_registered_graph() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = cyclic_registry(&calls);
    registry.register(counted("standalone", &calls)).unwrap();

    let diagnostics = registry.diagnose();
    assert_eq!(diagnostics.cycles, vec![vec![id("a"), id("b")]]);
    assert_eq!(diagnostics.activation_order, vec![id("standalone")]);
    assert!(!diagnostics.is_healthy());
}
