//! Tether sessions: the backend half of a mirrored component UI.
//!
//! ```text
//! Component::update → local state → state_change frame → Channel → mirror
//!                                 → change listeners
//! mirror → user_event frame → Session::on_message → ComponentKind::on_request
//! ```
//!
//! A [`Session`] serves one connection. Components are created inside it,
//! keep their state on the backend, and are mirrored by instances of their
//! compiled view type on the other end of the [`Channel`]. View types are
//! compiled by `tether-compiler` and sent to the mirror once per session.

pub mod change;
pub mod channel;
pub mod codec;
pub mod component;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod scheduler;
pub mod session;
pub mod wrapper;

pub use change::{action_key, parse_action_key, ChangeSet, ChangedFields, ListAction};
pub use channel::{Channel, ChannelClosed, MemoryChannel};
pub use codec::{component_ref, decode_component_ref, ComponentId, Message};
pub use component::{Batch, Component, ComponentKind, ListenerId, Phase, UpdateOptions};
pub use config::SessionConfig;
pub use diagnostic::{Diagnostic, DIAGNOSTIC_VIEW};
pub use error::{
    AbortUpdate, ComponentError, ComponentResult, HandlerError, SessionError, SessionResult,
};
pub use scheduler::{Debouncer, ManualScheduler, PeriodicTask, Scheduler, Task, TaskId};
pub use session::{Session, SessionGuard};
pub use wrapper::{Wrapper, WrapperSource};

pub use tether_compiler::{view_type, ViewType};
