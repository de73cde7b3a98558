//! Tracks which activations are being polled on the current thread.
//!
//! An activation body that calls back into its registry does so while its
//! own activation future is being polled. Recording that future here lets
//! the registry see who is waiting when a re-entrant request arrives.

use futures::future::BoxFuture;
use lumen_plugin_api::PluginId;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

thread_local! {
    static POLLING: RefCell<Vec<(usize, PluginId)>> = const { RefCell::new(Vec::new()) };
}

/// The innermost activation of `registry` being polled on this thread.
pub(crate) fn current(registry: usize) -> Option<PluginId> {
    POLLING.with(|polling| {
        polling
            .borrow()
            .iter()
            .rev()
            .find(|(owner, _)| *owner == registry)
            .map(|(_, id)| id.clone())
    })
}

/// Wraps an activation future so that it is recorded while polled.
pub(crate) struct ActivationScope<T> {
    registry: usize,
    plugin: PluginId,
    inner: BoxFuture<'static, T>,
}

impl<T> ActivationScope<T> {
    pub(crate) fn new(registry: usize, plugin: PluginId, inner: BoxFuture<'static, T>) -> Self {
        Self {
            registry,
            plugin,
            inner,
        }
    }
}

struct PopOnDrop;

impl Drop for PopOnDrop {
    fn drop(&mut self) {
        POLLING.with(|polling| {
            polling.borrow_mut().pop();
        });
    }
}

impl<T> Future for ActivationScope<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = &mut *self;
        POLLING.with(|polling| polling.borrow_mut().push((this.registry, this.plugin.clone())));
        let _pop = PopOnDrop;
        this.inner.as_mut().poll(cx)
    }
}
