//! Integration tests for the callback-based registry operations.

mod common;

use common::{descriptor, descriptors};
use parking_lot::Mutex;
use shellreg::{CommandRegistry, CommandResolver, OwningContext, RegistryError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::oneshot;

#[tokio::test]
async fn test_register_callback_success_and_failure() {
    let ctx = OwningContext::new().unwrap();
    let registry = CommandRegistry::create(&ctx);

    let (tx1, rx1) = oneshot::channel();
    let (tx2, rx2) = oneshot::channel();
    registry.register_command_with(descriptor("echo"), move |r| {
        let _ = tx1.send(r);
    });
    registry.register_command_with(descriptor("echo"), move |r| {
        let _ = tx2.send(r);
    });

    assert_eq!(rx1.await.unwrap(), Ok(()));
    assert_eq!(
        rx2.await.unwrap(),
        Err(RegistryError::DuplicateCommand("echo".into()))
    );
}

#[tokio::test]
async fn test_bulk_callback_returns_registered() {
    let ctx = OwningContext::new().unwrap();
    let registry = CommandRegistry::create(&ctx);
    let batch = descriptors("bulk", 3);

    let (tx, rx) = oneshot::channel();
    registry.register_commands_with(batch.clone(), move |r| {
        let _ = tx.send(r);
    });
    assert_eq!(rx.await.unwrap(), Ok(batch));
}

#[tokio::test]
async fn test_callbacks_preserve_submission_order() {
    let ctx = OwningContext::new().unwrap();
    let registry = CommandRegistry::create(&ctx);
    let order = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, done_rx) = oneshot::channel();

    for i in 0..100 {
        let order = Arc::clone(&order);
        registry.register_command_with(descriptor(&format!("c{i}")), move |r| {
            assert!(r.is_ok());
            order.lock().push(i);
        });
    }
    registry.unregister_command_with("c0", move |r| {
        let _ = done_tx.send(r);
    });

    assert_eq!(done_rx.await.unwrap(), Ok(()));
    assert_eq!(*order.lock(), (0..100).collect::<Vec<_>>());
    assert!(registry.resolve_command("c0").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_callbacks_never_overlap() {
    let ctx = OwningContext::new().unwrap();
    let registry = CommandRegistry::create(&ctx);
    let running = Arc::new(AtomicBool::new(false));
    let delivered = Arc::new(AtomicUsize::new(0));
    let total = 64;

    let submitters: Vec<_> = (0..total)
        .map(|i| {
            let registry = registry.clone();
            let running = Arc::clone(&running);
            let delivered = Arc::clone(&delivered);
            tokio::spawn(async move {
                registry.register_command_with(descriptor(&format!("n{i}")), move |_| {
                    assert!(!running.swap(true, Ordering::SeqCst), "callbacks overlapped");
                    std::thread::sleep(std::time::Duration::from_micros(50));
                    running.store(false, Ordering::SeqCst);
                    delivered.fetch_add(1, Ordering::SeqCst);
                });
            })
        })
        .collect();
    for s in submitters {
        s.await.unwrap();
    }

    while delivered.load(Ordering::SeqCst) < total {
        tokio::task::yield_now().await;
    }
    assert_eq!(delivered.load(Ordering::SeqCst), total);
}

#[tokio::test]
async fn test_queued_callbacks_survive_shutdown() {
    let ctx = OwningContext::new().unwrap();
    let registry = CommandRegistry::create(&ctx);
    let delivered = Arc::new(AtomicUsize::new(0));

    for i in 0..10 {
        let delivered = Arc::clone(&delivered);
        registry.register_command_with(descriptor(&format!("s{i}")), move |_| {
            delivered.fetch_add(1, Ordering::SeqCst);
        });
    }
    ctx.shutdown();

    // Submissions after shutdown are still delivered exactly once, and refused.
    let d = Arc::clone(&delivered);
    let (tx, rx) = tokio::sync::oneshot::channel();
    registry.unregister_command_with("s0", move |result| {
        d.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(result);
    });
    assert_eq!(rx.await.unwrap(), Err(RegistryError::Discarded(ctx.id())));

    while delivered.load(Ordering::SeqCst) < 11 {
        tokio::task::yield_now().await;
    }
    assert_eq!(delivered.load(Ordering::SeqCst), 11);
}
