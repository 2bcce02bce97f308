//! Component state engine.
//!
//! A [`Component`] is a cheap, cloneable handle to a stateful entity that is
//! mirrored by an instance of its view type on the other end of the session's
//! channel. Field changes are applied locally first, then forwarded to the
//! mirror as one `state_change` message and announced to listeners as one
//! set of changed field names.
//!
//! Lifecycle: constructing → active → destroyed. Everything the initializer
//! writes is coalesced into a single message sent right after `new`. The
//! adjustment hook only runs once the component is active.
//!
//! No lock is held while user code runs: hooks, handlers and listeners may
//! freely read and write this or any other component.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use tether_compiler::ViewType;

use crate::change::{self, action_key, parse_action_key, ChangeSet, ChangedFields, ListAction};
use crate::codec::{component_ref, ComponentId, Message};
use crate::error::{AbortUpdate, ComponentError, ComponentResult, HandlerError};
use crate::session::{Session, SessionShared};

static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_component_id() -> ComponentId {
    NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed)
}

// ══════════════════════════════════════════════════════════════════════════════
// Component kinds
// ══════════════════════════════════════════════════════════════════════════════

/// Backend behaviour of one kind of component.
pub trait ComponentKind: Send + Sync + 'static {
    /// The mirror-side implementation.
    fn view_type(&self) -> &'static ViewType;

    /// Set initial state. Runs once inside a batch.
    fn init(&self, _component: &Component) -> ComponentResult<()> {
        Ok(())
    }

    /// Inspect a proposed change set before it is applied.
    ///
    /// May edit `changes` in place (clamp a value, drop a field) or return
    /// [`AbortUpdate`] to cancel the whole update.
    fn adjust(&self, _component: &Component, _changes: &mut ChangeSet) -> Result<(), AbortUpdate> {
        Ok(())
    }

    /// Handle a `user_event` request from the mirror.
    fn on_request(&self, component: &Component, payload: Value) -> Result<(), HandlerError> {
        let _ = payload;
        Err(format!("component {} does not accept requests", component.id()).into())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Options & listeners
// ══════════════════════════════════════════════════════════════════════════════

/// Where an update is propagated. Local state is always updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Send a `state_change` message to the mirror.
    pub forward: bool,
    /// Invoke change listeners.
    pub notify: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            forward: true,
            notify: true,
        }
    }
}

impl UpdateOptions {
    /// Update local state and listeners without telling the mirror, e.g.
    /// when applying a change the mirror itself requested.
    pub fn local() -> Self {
        Self {
            forward: false,
            notify: true,
        }
    }
}

/// Handle for removing a change listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ListenerFn = dyn Fn(&Component, &ChangedFields) + Send + Sync;

#[derive(Clone)]
struct Listener {
    id: ListenerId,
    /// Fire only when one of these fields changed.
    fields: Option<HashSet<String>>,
    callback: Arc<ListenerFn>,
}

impl Listener {
    fn wants(&self, changed: &ChangedFields) -> bool {
        match &self.fields {
            Some(fields) => changed.iter().any(|field| fields.contains(field)),
            None => true,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Component
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Constructing,
    Active,
    Destroyed,
}

struct ComponentState {
    fields: IndexMap<String, Value>,
    listeners: Vec<Listener>,
    next_listener: u64,
    /// Open batch buffer and the options it will flush with.
    batch: Option<(ChangeSet, UpdateOptions)>,
    phase: Phase,
}

struct ComponentInner {
    id: ComponentId,
    kind: Box<dyn ComponentKind>,
    session: Weak<SessionShared>,
    state: Mutex<ComponentState>,
}

/// Handle to a live component. Clones share the same component.
#[derive(Clone)]
pub struct Component {
    inner: Arc<ComponentInner>,
}

impl Component {
    /// Create a component in the session active on this thread.
    pub fn create(kind: impl ComponentKind) -> ComponentResult<Component> {
        let session = Session::current().ok_or(ComponentError::NoActiveSession)?;
        session.create_component(kind)
    }

    pub(crate) fn new_constructing(
        id: ComponentId,
        kind: Box<dyn ComponentKind>,
        session: Weak<SessionShared>,
    ) -> Component {
        Component {
            inner: Arc::new(ComponentInner {
                id,
                kind,
                session,
                state: Mutex::new(ComponentState {
                    fields: IndexMap::new(),
                    listeners: Vec::new(),
                    next_listener: 0,
                    batch: None,
                    phase: Phase::Constructing,
                }),
            }),
        }
    }

    pub fn id(&self) -> ComponentId {
        self.inner.id
    }

    pub fn phase(&self) -> Phase {
        self.inner.state.lock().phase
    }

    pub fn is_destroyed(&self) -> bool {
        self.phase() == Phase::Destroyed
    }

    pub fn view_type(&self) -> &'static ViewType {
        self.inner.kind.view_type()
    }

    /// The owning session, unless it has been dropped.
    pub fn session(&self) -> Option<Session> {
        self.inner.session.upgrade().map(Session::from_shared)
    }

    /// The `{"comp_id": ID}` value used to embed this component in state.
    pub fn reference(&self) -> Value {
        component_ref(self.id())
    }

    // ── Field access ──────────────────────────────────────────────────────────

    /// Current value of `field`.
    pub fn get(&self, field: &str) -> ComponentResult<Value> {
        self.inner
            .state
            .lock()
            .fields
            .get(field)
            .cloned()
            .ok_or_else(|| self.unknown_field(field))
    }

    /// Copy of every field.
    pub fn snapshot(&self) -> IndexMap<String, Value> {
        self.inner.state.lock().fields.clone()
    }

    /// Write one field. An action key (`items__append`) applies a list delta.
    pub fn set(&self, field: &str, value: impl Into<Value>) -> ComponentResult<()> {
        let mut changes = ChangeSet::new();
        changes.insert(field.to_string(), value.into());
        self.update(changes)
    }

    pub fn append_to(&self, field: &str, value: impl Into<Value>) -> ComponentResult<()> {
        self.set(&action_key(field, ListAction::Append), value)
    }

    pub fn remove_from(&self, field: &str, value: impl Into<Value>) -> ComponentResult<()> {
        self.set(&action_key(field, ListAction::Remove), value)
    }

    fn unknown_field(&self, field: &str) -> ComponentError {
        ComponentError::UnknownField {
            component: self.id(),
            field: field.to_string(),
        }
    }

    // ── Updates ───────────────────────────────────────────────────────────────

    /// Apply `changes`, forward them to the mirror and notify listeners.
    pub fn update(&self, changes: ChangeSet) -> ComponentResult<()> {
        self.update_with(changes, UpdateOptions::default())
    }

    /// Apply `changes` with explicit propagation.
    ///
    /// Local state is updated even when nothing is forwarded. Inside a batch
    /// the changes are buffered for the flush instead of being propagated,
    /// so `options` must match the ones the batch was opened with.
    pub fn update_with(&self, mut changes: ChangeSet, options: UpdateOptions) -> ComponentResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        match self.phase() {
            Phase::Destroyed => return Err(ComponentError::Destroyed(self.id())),
            Phase::Active => {
                self.inner.kind.adjust(self, &mut changes)?;
                if changes.is_empty() {
                    return Ok(());
                }
            }
            Phase::Constructing => {}
        }

        let mut state = self.inner.state.lock();
        if state.phase == Phase::Destroyed {
            return Err(ComponentError::Destroyed(self.id()));
        }

        if let Some((_, batch_options)) = &state.batch {
            if *batch_options != options {
                return Err(ComponentError::BatchOptionsMismatch(self.id()));
            }
            if let Some(key) = changes.keys().find(|key| parse_action_key(key).is_some()) {
                return Err(ComponentError::ActionInBatch(key.clone()));
            }
            change::apply(&mut state.fields, &changes);
            if let Some((buffer, _)) = state.batch.as_mut() {
                buffer.extend(changes);
            }
            return Ok(());
        }

        let resolved = change::resolve(&state.fields, changes, |field| self.unknown_field(field))?;
        change::apply(&mut state.fields, &resolved);
        let listeners = if options.notify {
            state.listeners.clone()
        } else {
            Vec::new()
        };
        drop(state);

        self.dispatch(resolved, options, &listeners);
        Ok(())
    }

    /// Forward and announce an applied change set. Called with no lock held.
    fn dispatch(&self, changes: ChangeSet, options: UpdateOptions, listeners: &[Listener]) {
        let changed: ChangedFields = changes.keys().cloned().collect();
        if options.forward {
            if let Some(session) = self.session() {
                session.send(&Message::Apply {
                    comp_id: self.id(),
                    changes,
                });
            }
        }
        if options.notify {
            for listener in listeners.iter().filter(|l| l.wants(&changed)) {
                (listener.callback)(self, &changed);
            }
        }
    }

    // ── Batching ──────────────────────────────────────────────────────────────

    /// Open a batch: later updates are buffered until [`Batch::commit`].
    ///
    /// Dropping the handle without committing discards the buffer; changes
    /// already applied to local state stay.
    pub fn begin_batch(&self) -> ComponentResult<Batch<'_>> {
        self.begin_batch_with(UpdateOptions::default())
    }

    pub fn begin_batch_with(&self, options: UpdateOptions) -> ComponentResult<Batch<'_>> {
        let mut state = self.inner.state.lock();
        if state.phase == Phase::Destroyed {
            return Err(ComponentError::Destroyed(self.id()));
        }
        if state.batch.is_some() {
            return Err(ComponentError::BatchAlreadyOpen(self.id()));
        }
        state.batch = Some((ChangeSet::new(), options));
        Ok(Batch {
            component: self,
            open: true,
        })
    }

    /// Run `f` inside a batch and flush once if it succeeds.
    pub fn batch<T, E>(&self, f: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<ComponentError>,
    {
        let batch = self.begin_batch()?;
        let value = f()?;
        batch.commit()?;
        Ok(value)
    }

    fn close_batch(&self) -> Option<(ChangeSet, UpdateOptions)> {
        self.inner.state.lock().batch.take()
    }

    // ── Listeners ─────────────────────────────────────────────────────────────

    /// Register a change listener.
    ///
    /// With `fields`, the callback only fires when one of them changed. With
    /// `immediate`, it fires right away with every current field name, so a
    /// late subscriber can catch up.
    pub fn on_change<F>(&self, fields: Option<&[&str]>, immediate: bool, callback: F) -> ListenerId
    where
        F: Fn(&Component, &ChangedFields) + Send + Sync + 'static,
    {
        let mut state = self.inner.state.lock();
        let id = ListenerId(state.next_listener);
        state.next_listener += 1;
        let listener = Listener {
            id,
            fields: fields.map(|fields| fields.iter().map(|f| f.to_string()).collect()),
            callback: Arc::new(callback),
        };
        state.listeners.push(listener.clone());
        let current: ChangedFields = state.fields.keys().cloned().collect();
        drop(state);

        if immediate && listener.wants(&current) {
            (listener.callback)(self, &current);
        }
        id
    }

    /// Detach a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut state = self.inner.state.lock();
        let before = state.listeners.len();
        state.listeners.retain(|listener| listener.id != id);
        state.listeners.len() != before
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Run the initializer with every write coalesced into one message.
    pub(crate) fn initialize(&self) -> ComponentResult<()> {
        self.batch(|| self.inner.kind.init(self))?;
        self.inner.state.lock().phase = Phase::Active;
        Ok(())
    }

    pub(crate) fn handle_request(&self, payload: Value) -> Result<(), HandlerError> {
        if self.is_destroyed() {
            return Err(ComponentError::Destroyed(self.id()).into());
        }
        self.inner.kind.on_request(self, payload)
    }

    /// Mark destroyed without touching the session or the wire.
    pub(crate) fn detach(&self) {
        let mut state = self.inner.state.lock();
        state.phase = Phase::Destroyed;
        state.listeners.clear();
        state.batch = None;
    }

    /// Remove the component from its session and destroy its mirror.
    ///
    /// Later mutations fail with [`ComponentError::Destroyed`]; reads keep
    /// working on the final state.
    pub fn destroy(&self) -> ComponentResult<()> {
        {
            let mut state = self.inner.state.lock();
            if state.phase == Phase::Destroyed {
                return Err(ComponentError::Destroyed(self.id()));
            }
            state.phase = Phase::Destroyed;
            state.listeners.clear();
            state.batch = None;
        }
        if let Some(session) = self.session() {
            session.forget(self.id());
            session.send(&Message::Destroy { comp_id: self.id() });
            tracing::debug!(session = session.id(), component = self.id(), "component destroyed");
        }
        Ok(())
    }
}

impl From<&Component> for Value {
    fn from(component: &Component) -> Value {
        component.reference()
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Component {}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.id())
            .field("view_ref", &self.view_type().view_ref())
            .field("phase", &self.phase())
            .finish()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Batch handle
// ══════════════════════════════════════════════════════════════════════════════

/// An open batch on one component. See [`Component::begin_batch`].
#[must_use = "dropping a batch discards its buffered changes"]
pub struct Batch<'a> {
    component: &'a Component,
    open: bool,
}

impl Batch<'_> {
    /// Close the batch and flush the buffered changes as one message and one
    /// listener dispatch. An empty buffer sends and notifies nothing.
    pub fn commit(mut self) -> ComponentResult<()> {
        self.open = false;
        let Some((changes, options)) = self.component.close_batch() else {
            return Ok(());
        };
        if changes.is_empty() {
            return Ok(());
        }
        let listeners = if options.notify {
            self.component.inner.state.lock().listeners.clone()
        } else {
            Vec::new()
        };
        self.component.dispatch(changes, options, &listeners);
        Ok(())
    }
}

impl Drop for Batch<'_> {
    fn drop(&mut self) {
        if self.open {
            self.component.close_batch();
        }
    }
}
