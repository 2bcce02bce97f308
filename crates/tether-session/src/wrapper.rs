//! Scoped resources engaged while a session is active.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// A resource entered when its session becomes active and exited when the
/// outermost activation ends.
pub trait Wrapper: Send {
    fn enter(&mut self);
    fn exit(&mut self);
}

/// Shared handle to an engaged or ready wrapper instance.
pub(crate) type WrapperHandle = Arc<Mutex<Box<dyn Wrapper>>>;

type WrapperFactory = dyn Fn() -> Box<dyn Wrapper> + Send + Sync;

/// How a registered wrapper is obtained on each activation.
#[derive(Clone)]
pub enum WrapperSource {
    /// One instance, re-entered on every activation.
    Ready(WrapperHandle),
    /// A fresh instance per activation.
    Factory(Arc<WrapperFactory>),
}

impl WrapperSource {
    pub fn ready(wrapper: impl Wrapper + 'static) -> Self {
        WrapperSource::Ready(Arc::new(Mutex::new(Box::new(wrapper))))
    }

    pub fn factory<W, F>(factory: F) -> Self
    where
        W: Wrapper + 'static,
        F: Fn() -> W + Send + Sync + 'static,
    {
        WrapperSource::Factory(Arc::new(move || Box::new(factory()) as Box<dyn Wrapper>))
    }

    /// The instance to engage now.
    pub(crate) fn instance(&self) -> WrapperHandle {
        match self {
            WrapperSource::Ready(handle) => Arc::clone(handle),
            WrapperSource::Factory(factory) => Arc::new(Mutex::new(factory())),
        }
    }
}

impl fmt::Debug for WrapperSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WrapperSource::Ready(_) => f.write_str("WrapperSource::Ready"),
            WrapperSource::Factory(_) => f.write_str("WrapperSource::Factory"),
        }
    }
}
