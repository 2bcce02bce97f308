//! Component state engine tests.
//!
//! Covers: construction and registration messages, updates and their
//! propagation, batching, list actions, the adjustment hook, listeners,
//! and destruction.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tether_session::{
    view_type, AbortUpdate, ChangeSet, Component, ComponentError, ComponentKind, ComponentResult,
    HandlerError, MemoryChannel, Message, Phase, Session, UpdateOptions, ViewType,
};

view_type!(
    static COUNTER_VIEW = "Counter", "CounterView", r#"
        class CounterView:
            def constructor():
                this.domNode = document.createElement("span")

            def handle(change):
                if change.count != undefined:
                    this.domNode.innerText = change.count
    "#
);

view_type!(
    static BROKEN_VIEW = "Broken", "BrokenView", r#"
        class BrokenView:
            def handle(change):
                this.first = change.items[0:1]
    "#
);

view_type!(
    static PLAIN_BADGE_VIEW = "Badge", "BadgeView", r#"
        class BadgeView:
            def constructor():
                this.domNode = document.createElement("span")
    "#
);

view_type!(
    static BOLD_BADGE_VIEW = "Badge", "BadgeView", r#"
        class BadgeView:
            def constructor():
                this.domNode = document.createElement("b")
    "#
);

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Counter {
    start: i64,
    max: Option<i64>,
}

impl Counter {
    fn capped(max: i64) -> Self {
        Counter {
            start: 0,
            max: Some(max),
        }
    }
}

impl ComponentKind for Counter {
    fn view_type(&self) -> &'static ViewType {
        &COUNTER_VIEW
    }

    fn init(&self, component: &Component) -> ComponentResult<()> {
        component.set("count", self.start)?;
        component.set("items", json!([]))
    }

    fn adjust(&self, _component: &Component, changes: &mut ChangeSet) -> Result<(), AbortUpdate> {
        if changes.get("label") == Some(&json!("")) {
            changes.shift_remove("label");
        }
        if let Some(count) = changes.get("count").and_then(Value::as_i64) {
            if count < 0 {
                return Err(AbortUpdate::new("negative count"));
            }
            if let Some(max) = self.max.filter(|max| count > *max) {
                changes.insert("count".to_string(), json!(max));
            }
        }
        Ok(())
    }

    fn on_request(&self, component: &Component, payload: Value) -> Result<(), HandlerError> {
        let step = payload
            .get("increment")
            .and_then(Value::as_i64)
            .ok_or("missing increment")?;
        let count = component.get("count")?.as_i64().unwrap_or(0);
        component.set("count", count + step)?;
        Ok(())
    }
}

struct FailingInit;

impl ComponentKind for FailingInit {
    fn view_type(&self) -> &'static ViewType {
        &COUNTER_VIEW
    }

    fn init(&self, component: &Component) -> ComponentResult<()> {
        component.set("count", 1)?;
        Err(ComponentError::NotAList {
            field: "count".to_string(),
        })
    }
}

struct Badge(&'static ViewType);

impl ComponentKind for Badge {
    fn view_type(&self) -> &'static ViewType {
        self.0
    }
}

struct Broken;

impl ComponentKind for Broken {
    fn view_type(&self) -> &'static ViewType {
        &BROKEN_VIEW
    }
}

fn session() -> (Session, Arc<MemoryChannel>) {
    let channel = Arc::new(MemoryChannel::new());
    (Session::new(channel.clone()), channel)
}

/// A session plus one counter, with the construction frames drained.
fn counter_in(kind: Counter) -> (Session, Arc<MemoryChannel>, Component) {
    let (session, channel) = session();
    let counter = session.create_component(kind).expect("counter");
    channel.take();
    (session, channel, counter)
}

fn kinds(channel: &MemoryChannel) -> Vec<&'static str> {
    channel.messages().iter().map(Message::kind).collect()
}

/// The change sets of every `state_change` frame sent so far.
fn applied(channel: &MemoryChannel) -> Vec<ChangeSet> {
    channel
        .messages()
        .into_iter()
        .filter_map(|message| match message {
            Message::Apply { changes, .. } => Some(changes),
            _ => None,
        })
        .collect()
}

fn keys(changes: &ChangeSet) -> Vec<&str> {
    changes.keys().map(String::as_str).collect()
}

fn changes(value: Value) -> ChangeSet {
    match value {
        Value::Object(object) => object.into_iter().collect(),
        other => panic!("expected an object, got {other}"),
    }
}

/// Record the changed field names of every listener call.
fn record(component: &Component, fields: Option<&[&str]>) -> Arc<Mutex<Vec<Vec<String>>>> {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    component.on_change(fields, false, move |_, changed| {
        sink.lock().push(changed.iter().cloned().collect());
    });
    calls
}

// ─────────────────────────────────────────────────────────────────────
// Construction
// ─────────────────────────────────────────────────────────────────────

#[test]
fn construction_sends_register_instantiate_and_one_apply() {
    let (session, channel) = session();
    let counter = session.create_component(Counter::default()).unwrap();

    let messages = channel.messages();
    assert_eq!(kinds(&channel), vec!["class", "new", "state_change"]);
    match &messages[0] {
        Message::RegisterType {
            view_ref,
            name,
            source,
        } => {
            assert_eq!(view_ref, "component_tests::Counter::CounterView");
            assert_eq!(name, "CounterView");
            assert!(source.starts_with("class CounterView {"));
        }
        other => panic!("expected a registration, got {other:?}"),
    }
    assert_eq!(
        messages[1],
        Message::Instantiate {
            comp_id: counter.id(),
            view_ref: "component_tests::Counter::CounterView".to_string(),
        }
    );
    let init = &applied(&channel)[0];
    assert_eq!(keys(init), vec!["count", "items"]);
    assert_eq!(counter.phase(), Phase::Active);
}

#[test]
fn view_type_registered_once_per_session() {
    let (session, channel) = session();
    let first = session.create_component(Counter::default()).unwrap();
    let second = session.create_component(Counter::default()).unwrap();

    assert_ne!(first.id(), second.id());
    assert_eq!(
        kinds(&channel),
        vec!["class", "new", "state_change", "new", "state_change"]
    );
    assert_eq!(session.registered_views().len(), 1);
}

#[test]
fn conflicting_view_types_under_one_ref_are_rejected() {
    let (session, channel) = session();
    session.create_component(Badge(&PLAIN_BADGE_VIEW)).unwrap();
    channel.take();

    let result = session.create_component(Badge(&BOLD_BADGE_VIEW));

    match result {
        Err(ComponentError::DuplicateViewRef(view_ref)) => {
            assert_eq!(view_ref.to_string(), "component_tests::Badge::BadgeView");
        }
        other => panic!("expected a duplicate view ref, got {other:?}"),
    }
    assert!(channel.frames().is_empty());
    assert_eq!(session.component_count(), 1);
    // The same view type may still be instantiated again.
    session.create_component(Badge(&PLAIN_BADGE_VIEW)).unwrap();
    assert_eq!(kinds(&channel), vec!["new"]);
}

#[test]
fn each_session_registers_its_own_view_types() {
    let (first, first_channel) = session();
    let (second, second_channel) = session();
    first.create_component(Counter::default()).unwrap();
    second.create_component(Counter::default()).unwrap();

    assert_eq!(kinds(&first_channel)[0], "class");
    assert_eq!(kinds(&second_channel)[0], "class");
}

#[test]
fn adjust_is_skipped_during_construction() {
    let (_session, _channel, counter) = counter_in(Counter {
        start: 50,
        max: Some(10),
    });
    assert_eq!(counter.get("count").unwrap(), json!(50));
}

#[test]
fn create_uses_current_session() {
    let (session, channel) = session();
    let counter = {
        let _active = session.enter();
        Component::create(Counter::default()).unwrap()
    };
    assert_eq!(counter.session(), Some(session.clone()));
    assert_eq!(session.component(counter.id()), Some(counter));
    assert_eq!(channel.messages().len(), 3);
}

#[test]
fn create_without_session_fails() {
    let result = Component::create(Counter::default());
    assert!(matches!(result, Err(ComponentError::NoActiveSession)));
}

#[test]
fn failing_init_destroys_the_component() {
    let (session, channel) = session();
    let result = session.create_component(FailingInit);

    assert!(matches!(result, Err(ComponentError::NotAList { .. })));
    assert_eq!(kinds(&channel), vec!["class", "new", "delete"]);
    assert_eq!(session.component_count(), 0);
}

#[test]
fn untranslatable_view_fails_before_sending() {
    let (session, channel) = session();
    let result = session.create_component(Broken);

    match result {
        Err(ComponentError::Compile(error)) => {
            let diagnostics = error.diagnostics();
            assert!(diagnostics[0].message.contains("slices are not handled"));
        }
        other => panic!("expected a compile error, got {other:?}"),
    }
    assert!(channel.frames().is_empty());
    assert_eq!(session.component_count(), 0);
}

// ─────────────────────────────────────────────────────────────────────
// Updates
// ─────────────────────────────────────────────────────────────────────

#[test]
fn empty_update_sends_and_notifies_nothing() {
    let (_session, channel, counter) = counter_in(Counter::default());
    let calls = record(&counter, None);

    counter.update(ChangeSet::new()).unwrap();

    assert!(channel.frames().is_empty());
    assert!(calls.lock().is_empty());
}

#[test]
fn update_applies_sends_then_notifies() {
    let (_session, channel, counter) = counter_in(Counter::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let frames = Arc::clone(&channel);
    counter.on_change(None, false, move |component, changed| {
        let count = component.get("count").unwrap();
        sink.lock().push((frames.frames().len(), count, changed.len()));
    });

    counter.set("count", 3).unwrap();

    assert_eq!(counter.get("count").unwrap(), json!(3));
    assert_eq!(applied(&channel), vec![changes(json!({ "count": 3 }))]);
    assert_eq!(*seen.lock(), vec![(1, json!(3), 1)]);
}

#[test]
fn local_update_skips_the_mirror() {
    let (_session, channel, counter) = counter_in(Counter::default());
    let calls = record(&counter, None);

    counter
        .update_with(changes(json!({ "count": 4 })), UpdateOptions::local())
        .unwrap();

    assert_eq!(counter.get("count").unwrap(), json!(4));
    assert!(channel.frames().is_empty());
    assert_eq!(calls.lock().len(), 1);
}

#[test]
fn silent_update_skips_listeners() {
    let (_session, channel, counter) = counter_in(Counter::default());
    let calls = record(&counter, None);
    let options = UpdateOptions {
        forward: true,
        notify: false,
    };

    counter.update_with(changes(json!({ "count": 2 })), options).unwrap();

    assert_eq!(channel.frames().len(), 1);
    assert!(calls.lock().is_empty());
}

#[test]
fn new_fields_are_created_on_write() {
    let (_session, _channel, counter) = counter_in(Counter::default());
    counter.set("label", "clicks").unwrap();
    assert_eq!(counter.get("label").unwrap(), json!("clicks"));
    assert_eq!(counter.snapshot().len(), 3);
}

#[test]
fn reading_a_missing_field_fails() {
    let (_session, _channel, counter) = counter_in(Counter::default());
    let err = counter.get("missing").unwrap_err();
    assert!(matches!(err, ComponentError::UnknownField { field, .. } if field == "missing"));
}

#[test]
fn component_references_travel_as_ids() {
    let (session, channel, counter) = counter_in(Counter::default());
    let child = session.create_component(Counter::default()).unwrap();
    channel.take();

    counter.set("child", &child).unwrap();

    let sent = &applied(&channel)[0];
    assert_eq!(sent["child"], json!({ "comp_id": child.id() }));
}

// ─────────────────────────────────────────────────────────────────────
// Adjustment hook
// ─────────────────────────────────────────────────────────────────────

#[test]
fn abort_leaves_everything_untouched() {
    let (_session, channel, counter) = counter_in(Counter::default());
    counter.set("count", 5).unwrap();
    channel.take();
    let calls = record(&counter, None);
    let before = counter.snapshot();

    let err = counter
        .update(changes(json!({ "count": -1, "label": "x" })))
        .unwrap_err();

    assert!(matches!(err, ComponentError::Aborted(ref abort) if abort.reason == "negative count"));
    assert_eq!(counter.snapshot(), before);
    assert!(channel.frames().is_empty());
    assert!(calls.lock().is_empty());
}

#[test]
fn adjust_can_clamp_a_value() {
    let (_session, channel, counter) = counter_in(Counter::capped(10));
    counter.set("count", 50).unwrap();

    assert_eq!(counter.get("count").unwrap(), json!(10));
    assert_eq!(applied(&channel), vec![changes(json!({ "count": 10 }))]);
}

#[test]
fn adjust_dropping_every_field_is_a_no_op() {
    let (_session, channel, counter) = counter_in(Counter::default());
    let calls = record(&counter, None);

    counter.set("label", "").unwrap();

    assert!(counter.get("label").is_err());
    assert!(channel.frames().is_empty());
    assert!(calls.lock().is_empty());
}

// ─────────────────────────────────────────────────────────────────────
// Batching
// ─────────────────────────────────────────────────────────────────────

#[test]
fn unbatched_writes_send_one_message_each() {
    let (_session, channel, counter) = counter_in(Counter::default());
    let calls = record(&counter, None);

    counter.set("count", 1).unwrap();
    counter.set("label", "a").unwrap();
    counter.set("count", 2).unwrap();

    assert_eq!(applied(&channel).len(), 3);
    assert_eq!(calls.lock().len(), 3);
}

#[test]
fn batched_writes_flush_once() {
    let (_session, channel, counter) = counter_in(Counter::default());
    let calls = record(&counter, None);

    counter
        .batch(|| {
            counter.set("count", 1)?;
            counter.set("label", "a")?;
            counter.set("count", 2)
        })
        .unwrap();

    let sent = applied(&channel);
    assert_eq!(sent.len(), 1);
    assert_eq!(keys(&sent[0]), vec!["count", "label"]);
    assert_eq!(sent[0], changes(json!({ "count": 2, "label": "a" })));
    assert_eq!(*calls.lock(), vec![vec!["count".to_string(), "label".to_string()]]);
}

#[test]
fn state_updates_immediately_inside_a_batch() {
    let (_session, channel, counter) = counter_in(Counter::default());
    let batch = counter.begin_batch().unwrap();
    counter.set("count", 7).unwrap();

    assert_eq!(counter.get("count").unwrap(), json!(7));
    assert!(channel.frames().is_empty());

    batch.commit().unwrap();
    assert_eq!(channel.frames().len(), 1);
}

#[test]
fn failed_batch_discards_its_buffer() {
    let (_session, channel, counter) = counter_in(Counter::default());

    let result: ComponentResult<()> = counter.batch(|| {
        counter.set("count", 3)?;
        counter.set("items__append", "x")
    });

    assert!(matches!(result, Err(ComponentError::ActionInBatch(ref key)) if key == "items__append"));
    assert!(channel.frames().is_empty());
    // Local state keeps what was written before the failure.
    assert_eq!(counter.get("count").unwrap(), json!(3));
    // The buffer is gone, so a new batch can open.
    counter.begin_batch().unwrap().commit().unwrap();
}

#[test]
fn batch_rejects_updates_with_other_options() {
    let (_session, channel, counter) = counter_in(Counter::default());
    let batch = counter.begin_batch().unwrap();

    let err = counter
        .update_with(changes(json!({ "count": 1 })), UpdateOptions::local())
        .unwrap_err();

    assert!(matches!(err, ComponentError::BatchOptionsMismatch(id) if id == counter.id()));
    assert_eq!(counter.get("count").unwrap(), json!(0));
    batch.commit().unwrap();
    assert!(channel.frames().is_empty());
}

#[test]
fn local_batch_is_not_forwarded() {
    let (_session, channel, counter) = counter_in(Counter::default());
    let calls = record(&counter, None);
    let batch = counter.begin_batch_with(UpdateOptions::local()).unwrap();

    counter
        .update_with(changes(json!({ "count": 1 })), UpdateOptions::local())
        .unwrap();
    batch.commit().unwrap();

    assert_eq!(counter.get("count").unwrap(), json!(1));
    assert!(channel.frames().is_empty());
    assert_eq!(calls.lock().len(), 1);
}

#[test]
fn batches_do_not_nest() {
    let (_session, _channel, counter) = counter_in(Counter::default());
    let _outer = counter.begin_batch().unwrap();
    let inner = counter.begin_batch();
    assert!(matches!(inner, Err(ComponentError::BatchAlreadyOpen(id)) if id == counter.id()));
}

#[test]
fn empty_batch_sends_nothing() {
    let (_session, channel, counter) = counter_in(Counter::default());
    let calls = record(&counter, None);
    counter.batch(|| Ok::<_, ComponentError>(())).unwrap();
    assert!(channel.frames().is_empty());
    assert!(calls.lock().is_empty());
}

// ─────────────────────────────────────────────────────────────────────
// List actions
// ─────────────────────────────────────────────────────────────────────

#[test]
fn append_and_remove_carry_both_keys() {
    let (_session, channel, counter) = counter_in(Counter::default());
    counter.set("items", json!(["a", "b"])).unwrap();
    channel.take();

    counter.append_to("items", "c").unwrap();
    assert_eq!(counter.get("items").unwrap(), json!(["a", "b", "c"]));

    counter.remove_from("items", "b").unwrap();
    assert_eq!(counter.get("items").unwrap(), json!(["a", "c"]));

    let sent = applied(&channel);
    assert_eq!(keys(&sent[0]), vec!["items__append", "items"]);
    assert_eq!(sent[0]["items__append"], json!("c"));
    assert_eq!(sent[0]["items"], json!(["a", "b", "c"]));
    assert_eq!(keys(&sent[1]), vec!["items__remove", "items"]);
    assert_eq!(sent[1]["items"], json!(["a", "c"]));
}

#[test]
fn listeners_see_action_and_base_keys() {
    let (_session, _channel, counter) = counter_in(Counter::default());
    let calls = record(&counter, Some(&["items"]));

    counter.append_to("items", 1).unwrap();

    assert_eq!(
        *calls.lock(),
        vec![vec!["items__append".to_string(), "items".to_string()]]
    );
}

#[test]
fn action_and_plain_write_to_same_field_collide() {
    let (_session, channel, counter) = counter_in(Counter::default());
    let err = counter
        .update(changes(json!({ "items": [], "items__append": 1 })))
        .unwrap_err();
    assert!(matches!(err, ComponentError::KeyCollision { field } if field == "items"));
    assert!(channel.frames().is_empty());
}

#[test]
fn list_action_errors() {
    let (_session, _channel, counter) = counter_in(Counter::default());

    let err = counter.remove_from("items", "ghost").unwrap_err();
    assert!(matches!(err, ComponentError::NotInList { .. }));

    let err = counter.append_to("count", 1).unwrap_err();
    assert!(matches!(err, ComponentError::NotAList { field } if field == "count"));

    let err = counter.append_to("missing", 1).unwrap_err();
    assert!(matches!(err, ComponentError::UnknownField { .. }));
}

// ─────────────────────────────────────────────────────────────────────
// Listeners
// ─────────────────────────────────────────────────────────────────────

#[test]
fn filtered_listener_ignores_other_fields() {
    let (_session, _channel, counter) = counter_in(Counter::default());
    let calls = record(&counter, Some(&["label"]));

    counter.set("count", 1).unwrap();
    assert!(calls.lock().is_empty());

    counter.set("label", "now").unwrap();
    assert_eq!(calls.lock().len(), 1);
}

#[test]
fn immediate_listener_catches_up() {
    let (_session, _channel, counter) = counter_in(Counter::default());
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);

    counter.on_change(None, true, move |_, changed| {
        sink.lock().push(changed.iter().cloned().collect::<Vec<_>>());
    });

    assert_eq!(
        *calls.lock(),
        vec![vec!["count".to_string(), "items".to_string()]]
    );
}

#[test]
fn removed_listener_stops_firing() {
    let (_session, _channel, counter) = counter_in(Counter::default());
    let calls = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&calls);
    let id = counter.on_change(None, false, move |_, _| *sink.lock() += 1);

    counter.set("count", 1).unwrap();
    assert!(counter.remove_listener(id));
    assert!(!counter.remove_listener(id));
    counter.set("count", 2).unwrap();

    assert_eq!(*calls.lock(), 1);
}

#[test]
fn listener_may_write_back() {
    let (_session, channel, counter) = counter_in(Counter::default());
    counter.on_change(Some(&["count"]), false, |component, _| {
        let count = component.get("count").unwrap();
        component.set("label", format!("count is {count}")).unwrap();
    });

    counter.set("count", 9).unwrap();

    assert_eq!(counter.get("label").unwrap(), json!("count is 9"));
    assert_eq!(applied(&channel).len(), 2);
}

// ─────────────────────────────────────────────────────────────────────
// Destruction
// ─────────────────────────────────────────────────────────────────────

#[test]
fn destroy_removes_and_notifies_the_mirror() {
    let (session, channel, counter) = counter_in(Counter::default());
    counter.set("count", 4).unwrap();
    channel.take();

    counter.destroy().unwrap();

    assert_eq!(
        channel.messages(),
        vec![Message::Destroy {
            comp_id: counter.id()
        }]
    );
    assert!(session.component(counter.id()).is_none());
    assert!(counter.is_destroyed());
    assert_eq!(counter.get("count").unwrap(), json!(4));
    assert!(matches!(counter.set("count", 5), Err(ComponentError::Destroyed(_))));
    assert!(matches!(counter.destroy(), Err(ComponentError::Destroyed(_))));
}
