//! Sessions and reentrant activation.
//!
//! A [`Session`] serves one mirror over one [`Channel`]. It owns the
//! component arena, remembers which view types the mirror already knows, and
//! routes inbound requests to their components.
//!
//! Activation is explicit: [`Session::enter`] returns a guard that makes the
//! session current on this thread. Each session carries its own reentrant
//! lock, so only one thread is inside a given session at a time while
//! different sessions proceed in parallel. Nested entry into the same session
//! only bumps a depth counter; wrappers are engaged on the outermost entry and
//! released, in reverse order, on the outermost exit.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use tether_compiler::{ViewDefinition, ViewRef};

use crate::channel::Channel;
use crate::codec::{ComponentId, Message};
use crate::component::{next_component_id, Component, ComponentKind};
use crate::config::SessionConfig;
use crate::diagnostic::Diagnostic;
use crate::error::{ComponentError, ComponentResult, HandlerError, SessionError, SessionResult};
use crate::wrapper::{WrapperHandle, WrapperSource};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Sessions entered on this thread, innermost last.
    static CURRENT: RefCell<Vec<Session>> = const { RefCell::new(Vec::new()) };
}

pub(crate) struct SessionShared {
    id: u64,
    channel: Arc<dyn Channel>,
    config: SessionConfig,
    /// Activation depth on the owning thread.
    activation: ReentrantMutex<Cell<usize>>,
    registry: Mutex<Registry>,
    wrappers: Mutex<Wrappers>,
    closed: AtomicBool,
}

#[derive(Default)]
struct Registry {
    components: HashMap<ComponentId, Component>,
    /// View types already sent to the mirror, in registration order.
    views: IndexMap<ViewRef, Arc<ViewDefinition>>,
    /// Component showing the latest handler failure.
    diagnostic: Option<Component>,
}

#[derive(Default)]
struct Wrappers {
    registered: IndexMap<String, WrapperSource>,
    engaged: IndexMap<String, WrapperHandle>,
}

/// Handle to a session. Clones share the same session.
#[derive(Clone)]
pub struct Session {
    shared: Arc<SessionShared>,
}

impl Session {
    pub fn new(channel: Arc<dyn Channel>) -> Self {
        Self::with_config(channel, SessionConfig::default())
    }

    pub fn with_config(channel: Arc<dyn Channel>, config: SessionConfig) -> Self {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(session = id, "session opened");
        Session {
            shared: Arc::new(SessionShared {
                id,
                channel,
                config,
                activation: ReentrantMutex::new(Cell::new(0)),
                registry: Mutex::new(Registry::default()),
                wrappers: Mutex::new(Wrappers::default()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<SessionShared>) -> Self {
        Session { shared }
    }

    /// The innermost session entered on this thread.
    pub fn current() -> Option<Session> {
        CURRENT.with(|stack| stack.borrow().last().cloned())
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Closed explicitly, or the channel reported its peer gone.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst) || self.shared.channel.is_closed()
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Activation
    // ══════════════════════════════════════════════════════════════════════════

    /// Make this session current until the guard is dropped.
    ///
    /// Blocks while another thread is inside this session.
    pub fn enter(&self) -> SessionGuard<'_> {
        let activation = self.shared.activation.lock();
        let depth = activation.get();
        activation.set(depth + 1);
        CURRENT.with(|stack| stack.borrow_mut().push(self.clone()));
        if depth == 0 {
            self.engage_all();
        }
        SessionGuard {
            session: self,
            activation,
        }
    }

    /// Activation depth seen from this thread; zero unless this thread is
    /// inside the session.
    pub fn depth(&self) -> usize {
        match self.shared.activation.try_lock() {
            Some(activation) => activation.get(),
            None => 0,
        }
    }

    fn engage_all(&self) {
        let sources: Vec<(String, WrapperSource)> = self
            .shared
            .wrappers
            .lock()
            .registered
            .iter()
            .map(|(name, source)| (name.clone(), source.clone()))
            .collect();
        for (name, source) in sources {
            self.engage(name, &source);
        }
    }

    fn engage(&self, name: String, source: &WrapperSource) {
        // A removed wrapper of the same name may still be engaged.
        let stale = self.shared.wrappers.lock().engaged.shift_remove(&name);
        if let Some(stale) = stale {
            stale.lock().exit();
            tracing::trace!(session = self.id(), wrapper = %name, "replaced wrapper released");
        }
        let instance = source.instance();
        instance.lock().enter();
        tracing::trace!(session = self.id(), wrapper = %name, "wrapper engaged");
        self.shared.wrappers.lock().engaged.insert(name, instance);
    }

    fn release_all(&self) {
        loop {
            let Some((name, instance)) = self.shared.wrappers.lock().engaged.pop() else {
                break;
            };
            instance.lock().exit();
            tracing::trace!(session = self.id(), wrapper = %name, "wrapper released");
        }
    }

    // ── Wrappers ──────────────────────────────────────────────────────────────

    /// Register a named wrapper. It is engaged at once if the session is
    /// active, otherwise on the next activation.
    pub fn add_wrapper(&self, name: &str, source: WrapperSource) -> SessionResult<()> {
        let activation = self.shared.activation.lock();
        {
            let mut wrappers = self.shared.wrappers.lock();
            if wrappers.registered.contains_key(name) {
                return Err(SessionError::DuplicateWrapper(name.to_string()));
            }
            wrappers.registered.insert(name.to_string(), source.clone());
        }
        if activation.get() > 0 {
            self.engage(name.to_string(), &source);
        }
        Ok(())
    }

    /// Unregister a wrapper.
    ///
    /// An engaged instance stays engaged until the outermost exit unless
    /// `exit_now` forces its release immediately.
    pub fn remove_wrapper(&self, name: &str, exit_now: bool) -> SessionResult<()> {
        let engaged = {
            let mut wrappers = self.shared.wrappers.lock();
            if wrappers.registered.shift_remove(name).is_none() {
                return Err(SessionError::UnknownWrapper(name.to_string()));
            }
            if exit_now {
                wrappers.engaged.shift_remove(name)
            } else {
                None
            }
        };
        if let Some(instance) = engaged {
            instance.lock().exit();
            tracing::trace!(session = self.id(), wrapper = %name, "wrapper released early");
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Components
    // ══════════════════════════════════════════════════════════════════════════

    /// Create a component of `kind` in this session.
    ///
    /// Compiles and registers the view type on first use, instantiates the
    /// mirror, then runs the initializer with all of its writes coalesced into
    /// one `state_change`. A failing initializer destroys the component.
    ///
    /// A different view type already registered under the same reference
    /// fails with [`ComponentError::DuplicateViewRef`].
    pub fn create_component(&self, kind: impl ComponentKind) -> ComponentResult<Component> {
        let _guard = self.enter();
        let definition = kind.view_type().definition()?;

        let id = next_component_id();
        let component = Component::new_constructing(id, Box::new(kind), Arc::downgrade(&self.shared));

        let first_use = {
            let mut registry = self.shared.registry.lock();
            let first_use = match registry.views.entry(definition.view_ref.clone()) {
                indexmap::map::Entry::Occupied(slot) => {
                    if slot.get().digest != definition.digest {
                        return Err(ComponentError::DuplicateViewRef(definition.view_ref.clone()));
                    }
                    false
                }
                indexmap::map::Entry::Vacant(slot) => {
                    slot.insert(Arc::clone(&definition));
                    true
                }
            };
            registry.components.insert(id, component.clone());
            first_use
        };
        let view_ref = definition.view_ref.to_string();
        if first_use {
            tracing::debug!(session = self.id(), view_ref = %view_ref, "view type registered");
            self.send(&Message::RegisterType {
                view_ref: view_ref.clone(),
                name: definition.name.clone(),
                source: definition.source.clone(),
            });
        }
        self.send(&Message::Instantiate {
            comp_id: id,
            view_ref: view_ref.clone(),
        });
        tracing::debug!(session = self.id(), component = id, view_ref = %view_ref, "component created");

        if let Err(error) = component.initialize() {
            let _ = component.destroy();
            return Err(error);
        }
        Ok(component)
    }

    /// Look up a live component.
    pub fn component(&self, id: ComponentId) -> Option<Component> {
        self.shared.registry.lock().components.get(&id).cloned()
    }

    pub fn component_count(&self) -> usize {
        self.shared.registry.lock().components.len()
    }

    /// View types sent to the mirror, in registration order.
    pub fn registered_views(&self) -> Vec<ViewRef> {
        self.shared.registry.lock().views.keys().cloned().collect()
    }

    pub(crate) fn forget(&self, id: ComponentId) {
        self.shared.registry.lock().components.remove(&id);
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Wire
    // ══════════════════════════════════════════════════════════════════════════

    /// Send one message. Dropped without error once the session is closed.
    pub fn send(&self, message: &Message) {
        if self.is_closed() {
            tracing::debug!(session = self.id(), kind = message.kind(), "session closed, message dropped");
            return;
        }
        let text = match message.encode() {
            Ok(text) => text,
            Err(error) => {
                tracing::error!(session = self.id(), kind = message.kind(), %error, "failed to encode message");
                return;
            }
        };
        tracing::trace!(session = self.id(), kind = message.kind(), "send");
        if self.shared.channel.send(&text).is_err() {
            self.shared.closed.store(true, Ordering::SeqCst);
            tracing::debug!(session = self.id(), kind = message.kind(), "channel closed, message dropped");
        }
    }

    /// Handle one inbound frame.
    ///
    /// Failures, panics included, are logged and optionally rendered as a
    /// diagnostic; they never escape, so the session keeps serving.
    pub fn on_message(&self, text: &str) {
        let _guard = self.enter();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(text)));
        let result = outcome.unwrap_or_else(|payload| Err(SessionError::Panicked(panic_message(payload))));
        if let Err(error) = result {
            self.report(&error);
        }
    }

    /// Decode one inbound frame and route it to its component.
    pub fn dispatch(&self, text: &str) -> SessionResult<()> {
        let _guard = self.enter();
        match Message::decode(text)? {
            Message::Request { comp_id, payload } => {
                let component = self
                    .component(comp_id)
                    .ok_or(SessionError::UnknownComponent(comp_id))?;
                component
                    .handle_request(payload)
                    .map_err(|error| SessionError::Handler(error.to_string()))
            }
            other => Err(SessionError::UnexpectedMessage(other.kind())),
        }
    }

    /// Run application code inside the session.
    ///
    /// Failures are isolated like inbound dispatch; `None` means `f` failed.
    pub fn run<T>(&self, f: impl FnOnce() -> Result<T, HandlerError>) -> Option<T> {
        let _guard = self.enter();
        let outcome = panic::catch_unwind(AssertUnwindSafe(f));
        let error = match outcome {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(error)) => SessionError::Handler(error.to_string()),
            Err(payload) => SessionError::Panicked(panic_message(payload)),
        };
        self.report(&error);
        None
    }

    fn report(&self, error: &SessionError) {
        tracing::error!(session = self.id(), %error, "handler failed");
        if !self.shared.config.render_diagnostics || self.is_closed() {
            return;
        }
        let text = error.to_string();
        let shown = self
            .shared
            .registry
            .lock()
            .diagnostic
            .clone()
            .filter(|diagnostic| !diagnostic.is_destroyed());
        let rendered = match shown {
            Some(diagnostic) => Diagnostic::show(&diagnostic, &text),
            None => self.create_component(Diagnostic::new(text)).map(|diagnostic| {
                self.shared.registry.lock().diagnostic = Some(diagnostic);
            }),
        };
        if let Err(render_error) = rendered {
            tracing::warn!(session = self.id(), error = %render_error, "failed to render diagnostic");
        }
    }

    /// Close the session. Later sends are dropped and every component is
    /// released without notifying the mirror.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        let components: Vec<Component> = {
            let mut registry = self.shared.registry.lock();
            registry.diagnostic = None;
            registry.components.drain().map(|(_, component)| component).collect()
        };
        for component in &components {
            component.detach();
        }
        tracing::debug!(session = self.id(), released = components.len(), "session closed");
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Session {}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id())
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// An activation of a session. See [`Session::enter`].
#[must_use = "the session is only active while the guard is held"]
pub struct SessionGuard<'a> {
    session: &'a Session,
    activation: ReentrantMutexGuard<'a, Cell<usize>>,
}

impl SessionGuard<'_> {
    pub fn session(&self) -> &Session {
        self.session
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        let depth = self.activation.get().saturating_sub(1);
        self.activation.set(depth);
        if depth == 0 {
            self.session.release_all();
        }
        // Guards of different sessions may be dropped out of order.
        CURRENT.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(position) = stack.iter().rposition(|session| session == self.session) {
                stack.remove(position);
            }
        });
    }
}
