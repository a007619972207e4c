//! Integration tests for shared registry identity and teardown.

mod common;

use common::descriptor;
use shellreg::{
    CommandRegistry, CommandResolver, ContextError, OwningContext, RegistryError,
    SharedRegistryLocator,
};

#[tokio::test]
async fn test_shared_registry_is_one_instance() {
    let ctx = OwningContext::new().unwrap();
    let a = CommandRegistry::get_shared(&ctx).unwrap();
    let b = CommandRegistry::get_shared(&ctx).unwrap();
    assert!(a.same_registry(&b));

    a.register_command(descriptor("echo")).unwrap();
    assert!(b.resolve_command("echo").is_some());
    b.unregister_command("echo").unwrap();
    assert!(a.resolve_command("echo").is_none());

    ctx.shutdown();
}

#[tokio::test]
async fn test_created_registries_are_independent() {
    let ctx = OwningContext::new().unwrap();
    let a = CommandRegistry::create(&ctx);
    let b = CommandRegistry::create(&ctx);
    assert!(!a.same_registry(&b));

    a.register_command(descriptor("echo")).unwrap();
    assert!(b.resolve_command("echo").is_none());
    b.register_command(descriptor("echo")).unwrap();
    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 1);
    assert_ne!(a.resolve_command("echo"), b.resolve_command("echo"));
}

#[tokio::test]
async fn test_shutdown_removes_global_entry() {
    let ctx = OwningContext::new().unwrap();
    let shared = CommandRegistry::get_shared(&ctx).unwrap();
    shared.register_command(descriptor("echo")).unwrap();
    assert!(SharedRegistryLocator::global().contains(ctx.id()));

    ctx.shutdown();
    assert!(!SharedRegistryLocator::global().contains(ctx.id()));
    assert!(shared.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_access_yields_one_registry() {
    let locator = SharedRegistryLocator::new();
    let ctx = OwningContext::new().unwrap();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let locator = locator.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move { locator.get_shared(&ctx) })
        })
        .collect();

    let registries: Vec<_> = futures_util::future::try_join_all(handles)
        .await
        .unwrap()
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(registries.iter().all(|r| r.same_registry(&registries[0])));
    assert_eq!(locator.len(), 1);

    ctx.shutdown();
    assert!(locator.is_empty());
}

#[tokio::test]
async fn test_shared_registry_refused_after_shutdown() {
    let ctx = OwningContext::new().unwrap();
    let shared = CommandRegistry::get_shared(&ctx).unwrap();
    ctx.shutdown();

    assert_eq!(
        CommandRegistry::get_shared(&ctx).unwrap_err(),
        ContextError::ShutDown(ctx.id())
    );
    assert!(!SharedRegistryLocator::global().contains(ctx.id()));
    assert_eq!(
        shared.register_command(descriptor("echo")).unwrap_err(),
        RegistryError::Discarded(ctx.id())
    );
    assert!(shared.resolve_command("echo").is_none());
}

#[tokio::test]
async fn test_dropped_context_leaves_no_global_entry() {
    let ids: Vec<_> = (0..8)
        .map(|i| {
            let ctx = OwningContext::new().unwrap();
            let shared = CommandRegistry::get_shared(&ctx).unwrap();
            shared.register_command(descriptor(&format!("c{i}"))).unwrap();
            ctx.id()
        })
        .collect();

    for id in ids {
        assert!(!SharedRegistryLocator::global().contains(id));
    }
}
