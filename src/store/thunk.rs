//! Thunk dispatch.
//!
//! A thunk is a deferred procedure that receives the store and may dispatch
//! any number of actions or read state along the way. The store never
//! inspects a thunk body; errors inside it are the thunk's own business.

use std::future::Future;

use tokio::task::JoinHandle;

use super::Store;
use crate::flow::Reducer;

impl<R: Reducer> Store<R> {
    /// Runs a synchronous thunk against this store.
    pub fn dispatch_thunk<T>(&self, thunk: impl FnOnce(&Store<R>) -> T) -> T {
        thunk(self)
    }

    /// Runs an asynchronous thunk and waits for it.
    ///
    /// Other dispatches proceed while the thunk is suspended.
    pub async fn dispatch_async<F, Fut>(&self, thunk: F) -> Fut::Output
    where
        F: FnOnce(Store<R>) -> Fut,
        Fut: Future,
    {
        thunk(self.clone()).await
    }

    /// Runs an asynchronous thunk on the tokio runtime without waiting.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_thunk<F, Fut>(&self, thunk: F) -> JoinHandle<Fut::Output>
    where
        F: FnOnce(Store<R>) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let store = self.clone();
        tokio::spawn(async move { thunk(store).await })
    }
}
