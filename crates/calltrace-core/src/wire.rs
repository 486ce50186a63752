//! Tagged term tree used by the JSON and CBOR wire formats
//!
//! Every event becomes
//!
//! ```text
//! {time: <unix nanos>,
//!  event: pair(<name>(<args>...), pair(<results>...))}
//! ```
//!
//! where `pair` and `<name>` are function terms and every argument or result
//! is a constant leaf. Empty fields are left out of the encoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::Event;

/// Function name of the binary node joining call and results
pub const PAIR_FUNCTION_NAME: &str = "pair";

/// Kind tag of a [`Term`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermKind {
    Function,
    Constant,
}

/// A node of the term tree
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Term {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TermKind>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Term>,
}

impl Term {
    /// A function term with the given children
    pub fn function(name: impl Into<String>, args: Vec<Term>) -> Self {
        Self {
            name: name.into(),
            kind: Some(TermKind::Function),
            value: String::new(),
            args,
        }
    }

    /// A constant leaf
    pub fn constant(value: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            kind: Some(TermKind::Constant),
            value: value.into(),
            args: Vec::new(),
        }
    }

    fn constants(values: &[String]) -> Vec<Term> {
        values.iter().map(|v| Term::constant(v.as_str())).collect()
    }

    fn leaf_values(&self) -> Vec<String> {
        self.args.iter().map(|t| t.value.clone()).collect()
    }
}

/// Top-level wire record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEvent {
    /// Nanoseconds since the Unix epoch
    pub time: i64,
    pub event: Term,
}

impl TimedEvent {
    /// Build the term tree for an event
    pub fn from_event(event: &Event) -> Self {
        Self {
            time: event.unix_nanos(),
            event: Term::function(
                PAIR_FUNCTION_NAME,
                vec![
                    Term::function(event.name.as_str(), Term::constants(&event.args)),
                    Term::function(PAIR_FUNCTION_NAME, Term::constants(&event.results)),
                ],
            ),
        }
    }

    /// Recover the event a term tree was built from
    ///
    /// Returns `None` if the tree does not have the `pair(call, pair(...))`
    /// shape.
    pub fn into_event(self) -> Option<Event> {
        let mut children = self.event.args.into_iter();
        let call = children.next()?;
        let results = children.next()?;
        if results.name != PAIR_FUNCTION_NAME {
            return None;
        }
        Some(Event {
            args: call.leaf_values(),
            results: results.leaf_values(),
            name: call.name,
            timestamp: DateTime::<Utc>::from_timestamp_nanos(self.time),
        })
    }
}

impl From<&Event> for TimedEvent {
    fn from(event: &Event) -> Self {
        Self::from_event(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Event {
        Event::new("test_func", vec!["1".into(), "2".into()], vec!["3".into()])
    }

    #[test]
    fn test_tree_shape() {
        let timed = TimedEvent::from_event(&sample());
        assert_eq!(timed.event.name, PAIR_FUNCTION_NAME);
        assert_eq!(timed.event.kind, Some(TermKind::Function));
        assert_eq!(timed.event.args.len(), 2);

        let call = &timed.event.args[0];
        assert_eq!(call.name, "test_func");
        assert_eq!(call.args, vec![Term::constant("1"), Term::constant("2")]);

        let results = &timed.event.args[1];
        assert_eq!(results.name, PAIR_FUNCTION_NAME);
        assert_eq!(results.args, vec![Term::constant("3")]);
    }

    #[test]
    fn test_empty_fields_omitted() {
        let event = Event::new("noop_Enter", vec![], vec![]);
        let json = serde_json::to_value(TimedEvent::from_event(&event)).unwrap();
        let results = &json["event"]["args"][1];
        assert_eq!(results["name"], "pair");
        assert!(results.get("args").is_none());
        assert!(results.get("value").is_none());
        assert_eq!(json["event"]["args"][0]["type"], "function");
    }

    #[test]
    fn test_into_event_restores_fields() {
        let event = sample();
        let restored = TimedEvent::from_event(&event).into_event().unwrap();
        assert_eq!(restored, event);
    }

    #[test]
    fn test_into_event_rejects_malformed_tree() {
        let timed = TimedEvent {
            time: 0,
            event: Term::function(PAIR_FUNCTION_NAME, vec![Term::constant("x")]),
        };
        assert!(timed.into_event().is_none());
    }
}
