//! Component traits
//!
//! Every heavyweight engine managed by the [`ComponentManager`](super::ComponentManager)
//! implements [`Component`]. Teardown is part of the contract: there is no
//! optional cleanup hook to probe for.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::error::Result;

/// Upcast helper so `Arc<dyn Component>` can be downcast to its concrete type
pub trait AsAnyArc: Any + Send + Sync {
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAnyArc for T {
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A heavyweight processing engine with an explicit teardown
#[async_trait]
pub trait Component: AsAnyArc {
    /// Short type label used in logs and stats (e.g. "pdf_processor")
    fn kind(&self) -> &'static str;

    /// Rough resident size of the instance, for stats only
    fn estimated_memory_bytes(&self) -> u64 {
        0
    }

    /// Release everything the instance holds
    ///
    /// Called exactly once per instance by the default unloader.
    async fn cleanup(&self) -> Result<()>;
}

/// Zero-argument async factory producing a fresh instance
pub type Loader = Arc<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn Component>>> + Send + Sync>;

/// Teardown function invoked with the instance being unloaded
pub type Unloader = Arc<dyn Fn(Arc<dyn Component>) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Unloader that delegates to [`Component::cleanup`]
pub fn cleanup_unloader() -> Unloader {
    Arc::new(|instance: Arc<dyn Component>| -> BoxFuture<'static, Result<()>> {
        Box::pin(async move { instance.cleanup().await })
    })
}

/// Build a [`Loader`] from an async closure returning a concrete component
///
/// ```rust,ignore
/// let loader = loader_fn(move || {
///     let config = config.clone();
///     async move { PdfProcessor::load(config).await }
/// });
/// ```
pub fn loader_fn<C, F, Fut>(f: F) -> Loader
where
    C: Component,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<C>> + Send + 'static,
{
    Arc::new(move || -> BoxFuture<'static, Result<Arc<dyn Component>>> {
        let fut = f();
        Box::pin(async move {
            let component = fut.await?;
            Ok(Arc::new(component) as Arc<dyn Component>)
        })
    })
}

/// Build an [`Unloader`] from an async closure
pub fn unloader_fn<F, Fut>(f: F) -> Unloader
where
    F: Fn(Arc<dyn Component>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |instance: Arc<dyn Component>| -> BoxFuture<'static, Result<()>> {
        Box::pin(f(instance))
    })
}

/// Downcast a shared component to its concrete type
pub fn downcast_component<T: Component>(instance: Arc<dyn Component>) -> Option<Arc<T>> {
    instance.as_any_arc().downcast::<T>().ok()
}
