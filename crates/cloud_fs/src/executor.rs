//! Background operation execution
//!
//! Every coordinated operation runs on a dedicated multi-thread runtime,
//! never on the caller's thread. Submission returns an
//! [`OperationHandle`] immediately; the result is delivered through it
//! exactly once, either by `.await` or by the blocking [`OperationHandle::wait`].

use crate::error::{CloudError, Result};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Owns the background I/O runtime operations are spawned onto
pub struct Executor {
    runtime: tokio::runtime::Runtime,
}

impl Executor {
    pub fn new(worker_threads: usize) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("cloud-fs-io")
            .enable_all()
            .build()?;
        Ok(Self { runtime })
    }

    /// Submit an operation for background execution
    pub fn submit<T, F>(&self, operation: F) -> OperationHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.runtime.spawn(async move {
            let result = operation.await;
            // Receiver may have been dropped by a caller that chose to
            // ignore the completion; that is not an error here
            let _ = tx.send(result);
        });
        OperationHandle {
            inner: HandleInner::Pending(rx),
        }
    }
}

enum HandleInner<T> {
    /// Result produced synchronously, without a background hop
    Ready(Option<Result<T>>),
    Pending(oneshot::Receiver<Result<T>>),
}

/// Completion handle for a submitted operation.
///
/// Resolves exactly once with either a result or a normalized error.
/// Await it from async code, or call [`wait`](Self::wait) from
/// synchronous code.
pub struct OperationHandle<T> {
    inner: HandleInner<T>,
}

impl<T> OperationHandle<T> {
    /// A handle that is already complete (fast-fail validation path)
    pub fn ready(result: Result<T>) -> Self {
        Self {
            inner: HandleInner::Ready(Some(result)),
        }
    }

    /// Block the calling thread until the operation completes.
    ///
    /// Must not be called from within an async runtime; use `.await`
    /// there instead.
    pub fn wait(self) -> Result<T> {
        match self.inner {
            HandleInner::Ready(result) => {
                result.unwrap_or_else(|| Err(CloudError::file_access("operation abandoned")))
            }
            HandleInner::Pending(rx) => rx
                .blocking_recv()
                .unwrap_or_else(|_| Err(CloudError::file_access("operation abandoned"))),
        }
    }
}

impl<T> Unpin for OperationHandle<T> {}

impl<T> Future for OperationHandle<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            HandleInner::Ready(result) => match result.take() {
                Some(result) => Poll::Ready(result),
                None => panic!("OperationHandle polled after completion"),
            },
            HandleInner::Pending(rx) => Pin::new(rx).poll(cx).map(|received| {
                received.unwrap_or_else(|_| Err(CloudError::file_access("operation abandoned")))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_submit_runs_off_the_calling_thread() {
        let executor = Executor::new(2).unwrap();
        let caller = std::thread::current().id();

        let worker = executor
            .submit(async move { Ok(std::thread::current().id()) })
            .wait()
            .unwrap();
        assert_ne!(caller, worker);
    }

    #[test]
    fn test_ready_handle_resolves_without_a_hop() {
        let handle = OperationHandle::ready(Ok(7u32));
        assert_eq!(handle.wait().unwrap(), 7);

        let failed: OperationHandle<u32> =
            OperationHandle::ready(Err(CloudError::connection("offline")));
        assert_eq!(failed.wait().unwrap_err().code(), ErrorCode::ConnectionError);
    }

    #[test]
    fn test_errors_propagate_through_the_handle() {
        let executor = Executor::new(1).unwrap();
        let handle: OperationHandle<()> =
            executor.submit(async { Err(CloudError::file_access("boom")) });
        assert_eq!(handle.wait().unwrap_err().code(), ErrorCode::FileAccessFailed);
    }

    #[test]
    fn test_handle_can_be_awaited() {
        let executor = Executor::new(1).unwrap();
        let handle = executor.submit(async { Ok(21u32 * 2) });

        // Await from an unrelated runtime, the way an async caller would
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        assert_eq!(rt.block_on(handle).unwrap(), 42);
    }
}
