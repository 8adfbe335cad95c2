use sfs_op_system::{Canceled, OpSystem, SystemError};

use std::time::Duration;

use thiserror::Error;
use tokio::{sync::oneshot, time::timeout};
use tracing_test::traced_test;

#[derive(Debug, Error)]
enum SampleError {
	#[error(transparent)]
	System(#[from] SystemError),
	#[error(transparent)]
	Canceled(#[from] Canceled),
	#[error("broken on purpose")]
	Broken,
}

type System = OpSystem<String, String, SampleError>;

#[tokio::test]
#[traced_test]
async fn wait_consumes_the_outcome() {
	let system = System::new();
	let id = system.make_op_id();

	system
		.start(id, "ready".to_string(), |_| async { Ok(()) })
		.unwrap();

	system.wait(id).await.unwrap();
	assert!(matches!(
		system.wait(id).await,
		Err(SampleError::System(SystemError::NoSuchHandle(other))) if other == id
	));
}

#[tokio::test]
#[traced_test]
async fn failures_surface_on_wait() {
	let system = System::new();
	let id = system.make_op_id();

	system
		.start(id, "broken".to_string(), |_| async { Err::<(), _>(SampleError::Broken) })
		.unwrap();

	assert!(matches!(system.wait(id).await, Err(SampleError::Broken)));
	assert!(system.ops().is_empty());
}

#[tokio::test]
#[traced_test]
async fn ids_cannot_be_registered_twice() {
	let system = System::new();
	let id = system.make_op_id();
	let (release_tx, release_rx) = oneshot::channel::<()>();

	system
		.start(id, "first".to_string(), |_| async move {
			release_rx.await.ok();
			Ok(())
		})
		.unwrap();

	assert_eq!(
		system.start(id, "second".to_string(), |_| async { Ok(()) }),
		Err(SystemError::OperationInProgress(id))
	);
	assert_eq!(system.ops(), vec!["first".to_string()]);

	release_tx.send(()).unwrap();
	system.wait(id).await.unwrap();
}

#[tokio::test]
#[traced_test]
async fn cancel_consumes_everything() {
	let system = System::new();
	let id = system.make_op_id();
	let (stopped_tx, stopped_rx) = oneshot::channel();

	system
		.start(id, "never".to_string(), |ctx| async move {
			ctx.interrupter().canceled().await;
			stopped_tx.send(()).ok();
			ctx.interrupter().check()?;
			Ok::<_, SampleError>(())
		})
		.unwrap();
	system.insert_handle(id, "resource".to_string());

	assert_eq!(system.cancel(id), Some("resource".to_string()));

	assert!(matches!(
		system.wait(id).await,
		Err(SampleError::System(SystemError::NoSuchHandle(_)))
	));
	assert_eq!(system.check(id), Err(SystemError::NoResult(id)));
	assert!(system.ops().is_empty());

	// The work still notices the cancellation on its own
	timeout(Duration::from_secs(5), stopped_rx)
		.await
		.unwrap()
		.unwrap();

	// Nothing left, so a second cancel is a no-op
	assert_eq!(system.cancel(id), None);
}

#[tokio::test]
#[traced_test]
async fn release_does_not_cancel() {
	let system = System::new();
	let id = system.make_op_id();
	let (release_tx, release_rx) = oneshot::channel::<()>();
	let (canceled_tx, canceled_rx) = oneshot::channel();

	system
		.start(id, "released".to_string(), |ctx| async move {
			release_rx.await.ok();
			canceled_tx.send(ctx.interrupter().is_canceled()).ok();
			Ok(())
		})
		.unwrap();
	system.insert_handle(id, "file".to_string());

	assert_eq!(system.release(id), Some("file".to_string()));
	assert!(!system.is_pending(id));

	release_tx.send(()).unwrap();
	assert!(!canceled_rx.await.unwrap());
}

#[tokio::test]
#[traced_test]
async fn check_reports_progress_and_handles() {
	let system = System::new();
	let id = system.make_op_id();
	let (release_tx, release_rx) = oneshot::channel::<()>();
	let (counted_tx, counted_rx) = oneshot::channel();

	system
		.start(id, "copy".to_string(), |ctx| async move {
			ctx.progress().set_totals(100, 1);
			ctx.progress().add_read(50, 0);
			counted_tx.send(()).ok();
			release_rx.await.ok();
			Ok(())
		})
		.unwrap();

	counted_rx.await.unwrap();

	let progress = system.check(id).unwrap();
	assert_eq!(progress.bytes_total, 100);
	assert_eq!(progress.bytes_read, 50);
	assert_eq!(progress.files_total, 1);
	assert!(progress.start.is_some());

	release_tx.send(()).unwrap();
	system.wait(id).await.unwrap();

	let handle_only = system.make_op_id();
	system.insert_handle(handle_only, "listing".to_string());
	assert_eq!(system.check(handle_only), Ok(Default::default()));

	let unknown = system.make_op_id();
	assert_eq!(system.check(unknown), Err(SystemError::NoResult(unknown)));
}

#[tokio::test]
#[traced_test]
async fn results_are_published_only_while_pending() {
	let system = System::new();

	let id = system.make_op_id();
	let (release_tx, release_rx) = oneshot::channel::<()>();
	system
		.start(id, "list".to_string(), |_| async move {
			release_rx.await.ok();
			Ok(())
		})
		.unwrap();

	assert!(system.publish(id, "entries".to_string()));
	assert_eq!(system.handle(id), Ok("entries".to_string()));

	release_tx.send(()).unwrap();
	system.wait(id).await.unwrap();

	// The handle outlives the pending entry
	assert_eq!(
		system.with_handle(id, |listing| std::mem::take(listing)),
		Ok("entries".to_string())
	);
	assert_eq!(system.remove_handle(id), Some(String::new()));

	let canceled = system.make_op_id();
	system
		.start(canceled, "list".to_string(), |ctx| async move {
			ctx.interrupter().canceled().await;
			Err(SampleError::from(Canceled))
		})
		.unwrap();
	system.cancel(canceled);

	assert!(!system.publish(canceled, "late".to_string()));
	assert_eq!(
		system.handle(canceled),
		Err(SystemError::NoSuchHandle(canceled))
	);
}

#[tokio::test]
#[traced_test]
async fn tracked_ops_complete_once() {
	let system = System::new();
	let id = system.make_op_id();

	let tracked = system.begin_tracked(id, "read".to_string()).unwrap();
	tracked.progress().set_totals(10, 1);
	assert_eq!(system.ops(), vec!["read".to_string()]);
	assert_eq!(system.check(id).unwrap().bytes_total, 10);

	let waiter = tokio::spawn({
		let system = system.clone();
		async move { system.wait(id).await }
	});

	// Give the waiter a chance to take the completion signal
	tokio::task::yield_now().await;

	assert_eq!(tracked.finish(Ok::<_, SampleError>(7)).unwrap(), 7);
	assert!(system.ops().is_empty());

	// Either the waiter got the success or it came too late and found nothing
	match waiter.await.unwrap() {
		Ok(()) | Err(SampleError::System(SystemError::NoSuchHandle(_))) => {}
		Err(e) => panic!("unexpected outcome: {e}"),
	}
}

#[tokio::test]
#[traced_test]
async fn failed_tracked_ops_return_the_error_to_the_caller() {
	let system = System::new();
	let id = system.make_op_id();

	let tracked = system.begin_tracked(id, "write".to_string()).unwrap();
	assert!(matches!(
		tracked.finish::<()>(Err(SampleError::Broken)),
		Err(SampleError::Broken)
	));
	assert!(!system.is_pending(id));
}

#[tokio::test]
#[traced_test]
async fn dropped_tracked_ops_unregister() {
	let system = System::new();
	let id = system.make_op_id();

	{
		let _tracked = system.begin_tracked(id, "read".to_string()).unwrap();
		assert!(system.is_pending(id));
		assert!(matches!(
			system.begin_tracked(id, "read".to_string()),
			Err(SystemError::OperationInProgress(_))
		));
	}

	assert!(!system.is_pending(id));
	assert!(system.begin_tracked(id, "read".to_string()).is_ok());
}
