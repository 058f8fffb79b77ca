use std::future::Future;
use std::sync::Mutex;

use super::lock;
use crate::error::{ClientResult, Failure};

/// Loading/error state every store exposes to the view layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestStatus {
    pub loading: bool,
    pub error: Option<String>,
}

/// The shared request envelope.
///
/// `run` marks the store as loading and clears the previous error, awaits the
/// request, hands a successful payload to the operation's mutation, records a
/// display message on failure, and always clears `loading` afterwards, even
/// when the future is dropped before it resolves.
#[derive(Debug, Default)]
pub struct RequestTracker {
    status: Mutex<RequestStatus>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> RequestStatus {
        lock(&self.status).clone()
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.status).loading
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.status).error.clone()
    }

    pub async fn run<T, R, Fut, F>(
        &self,
        op: &'static str,
        request: Fut,
        on_success: F,
    ) -> Result<R, Failure>
    where
        Fut: Future<Output = ClientResult<T>>,
        F: FnOnce(T) -> ClientResult<R>,
    {
        let _loading = self.begin();

        match request.await.and_then(on_success) {
            Ok(value) => Ok(value),
            Err(err) => {
                let failure = Failure::from(&err);
                tracing::warn!(op, error = %err, "request failed");
                self.record(failure.clone());
                Err(failure)
            }
        }
    }

    /// Store a failure that did not go through [`RequestTracker::run`].
    pub fn record(&self, failure: Failure) {
        lock(&self.status).error = Some(failure.message);
    }

    fn begin(&self) -> LoadingGuard<'_> {
        let mut status = lock(&self.status);
        status.loading = true;
        status.error = None;
        LoadingGuard(&self.status)
    }
}

struct LoadingGuard<'a>(&'a Mutex<RequestStatus>);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        lock(self.0).loading = false;
    }
}
