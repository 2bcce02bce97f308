//! Change sets and the list-action key convention.
//!
//! A key of the form `field__append` or `field__remove` carries a list delta
//! for `field`. Resolving a change set against current state expands every
//! action into the action key plus the recomputed `field`, so the mirror and
//! listeners always see the full list next to the delta.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use crate::error::{ComponentError, ComponentResult};

/// Ordered field name → new value.
pub type ChangeSet = IndexMap<String, Value>;

/// Names of the fields touched by one dispatched change set.
pub type ChangedFields = IndexSet<String>;

/// Separates a field name from its list action.
pub const ACTION_SEPARATOR: &str = "__";

/// A list delta encoded in a change-set key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListAction {
    Append,
    Remove,
}

impl ListAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ListAction::Append => "append",
            ListAction::Remove => "remove",
        }
    }
}

/// `field` + separator + action.
pub fn action_key(field: &str, action: ListAction) -> String {
    format!("{field}{ACTION_SEPARATOR}{}", action.as_str())
}

/// Split an action key into its base field and action.
pub fn parse_action_key(key: &str) -> Option<(&str, ListAction)> {
    let (field, action) = key.rsplit_once(ACTION_SEPARATOR)?;
    let action = match action {
        "append" => ListAction::Append,
        "remove" => ListAction::Remove,
        _ => return None,
    };
    (!field.is_empty()).then_some((field, action))
}

/// Expand list actions against `fields` without touching it.
///
/// Fails if an action targets a missing or non-list field, removes a value
/// that is not present, or shares a change set with a plain write to its
/// base field. `unknown_field` builds the error for a missing field.
pub fn resolve(
    fields: &IndexMap<String, Value>,
    changes: ChangeSet,
    unknown_field: impl Fn(&str) -> ComponentError,
) -> ComponentResult<ChangeSet> {
    let mut resolved = ChangeSet::with_capacity(changes.len());
    // Lists already modified by an earlier action in this change set.
    let mut working: HashMap<String, Vec<Value>> = HashMap::new();

    for (key, value) in &changes {
        let Some((field, action)) = parse_action_key(key) else {
            resolved.insert(key.clone(), value.clone());
            continue;
        };
        if changes.contains_key(field) {
            return Err(ComponentError::KeyCollision {
                field: field.to_string(),
            });
        }

        let mut list = match working.remove(field) {
            Some(list) => list,
            None => match fields.get(field) {
                Some(Value::Array(items)) => items.clone(),
                Some(_) => {
                    return Err(ComponentError::NotAList {
                        field: field.to_string(),
                    })
                }
                None => return Err(unknown_field(field)),
            },
        };
        match action {
            ListAction::Append => list.push(value.clone()),
            ListAction::Remove => {
                let position = list.iter().position(|item| item == value).ok_or_else(|| {
                    ComponentError::NotInList {
                        field: field.to_string(),
                        value: value.clone(),
                    }
                })?;
                list.remove(position);
            }
        }

        resolved.insert(key.clone(), value.clone());
        resolved.insert(field.to_string(), Value::Array(list.clone()));
        working.insert(field.to_string(), list);
    }
    Ok(resolved)
}

/// Store a resolved change set; action keys are not state.
pub fn apply(fields: &mut IndexMap<String, Value>, resolved: &ChangeSet) {
    for (key, value) in resolved {
        if parse_action_key(key).is_none() {
            fields.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn changes(pairs: &[(&str, Value)]) -> ChangeSet {
        state(pairs)
    }

    fn unknown(field: &str) -> ComponentError {
        ComponentError::UnknownField {
            component: 0,
            field: field.to_string(),
        }
    }

    #[test]
    fn action_keys_round_trip() {
        assert_eq!(action_key("items", ListAction::Append), "items__append");
        assert_eq!(
            parse_action_key("items__remove"),
            Some(("items", ListAction::Remove))
        );
        assert_eq!(
            parse_action_key("my__items__append"),
            Some(("my__items", ListAction::Append))
        );
    }

    #[test]
    fn plain_keys_are_not_actions() {
        assert_eq!(parse_action_key("items"), None);
        assert_eq!(parse_action_key("items__clear"), None);
        assert_eq!(parse_action_key("__append"), None);
    }

    #[test]
    fn append_carries_action_and_base_key() {
        let fields = state(&[("items", json!(["a", "b"]))]);
        let out = resolve(&fields, changes(&[("items__append", json!("c"))]), unknown)
            .expect("resolves");
        let keys: Vec<&str> = out.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["items__append", "items"]);
        assert_eq!(out["items"], json!(["a", "b", "c"]));
        // Resolution never mutates its input.
        assert_eq!(fields["items"], json!(["a", "b"]));
    }

    #[test]
    fn sequential_actions_on_one_field() {
        let fields = state(&[("items", json!([1, 2]))]);
        let out = resolve(
            &fields,
            changes(&[("items__append", json!(3)), ("items__remove", json!(1))]),
            unknown,
        )
        .expect("resolves");
        assert_eq!(out["items"], json!([2, 3]));
    }

    #[test]
    fn remove_missing_value_fails() {
        let fields = state(&[("items", json!([1]))]);
        let err = resolve(&fields, changes(&[("items__remove", json!(9))]), unknown);
        assert!(matches!(err, Err(ComponentError::NotInList { .. })));
    }

    #[test]
    fn action_on_non_list_fails() {
        let fields = state(&[("count", json!(1))]);
        let err = resolve(&fields, changes(&[("count__append", json!(2))]), unknown);
        assert!(matches!(err, Err(ComponentError::NotAList { .. })));
        let err = resolve(&fields, changes(&[("missing__append", json!(2))]), unknown);
        assert!(matches!(err, Err(ComponentError::UnknownField { .. })));
    }

    #[test]
    fn base_and_action_collide() {
        let fields = state(&[("items", json!([]))]);
        let err = resolve(
            &fields,
            changes(&[("items", json!([1])), ("items__append", json!(2))]),
            unknown,
        );
        assert!(matches!(err, Err(ComponentError::KeyCollision { .. })));
    }

    #[test]
    fn apply_skips_action_keys() {
        let mut fields = state(&[("items", json!([1]))]);
        let resolved = changes(&[("items__append", json!(2)), ("items", json!([1, 2]))]);
        apply(&mut fields, &resolved);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["items"], json!([1, 2]));
    }
}
