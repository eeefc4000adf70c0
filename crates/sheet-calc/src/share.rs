//! Shareable query string for the pending inputs

use crate::debounce::Debouncer;
use crate::evaluator::{labeled_overrides, LabeledInputs, PendingInputs};
use serde_json::Value;
use sheet_graph::Graph;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use url::form_urlencoded;

/// Default quiet period before the share state is published
pub const DEFAULT_SHARE_DELAY: Duration = Duration::from_millis(500);

/// Render label-keyed inputs as `label=value&...`
///
/// Strings are written raw, other values as JSON.
#[must_use]
pub fn share_query(inputs: &LabeledInputs) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    for (label, input) in inputs {
        let value = match &input.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        query.append_pair(label, &value);
    }
    query.finish()
}

/// Parse a share query back into label-keyed values
///
/// Values that parse as JSON scalars keep their type; the rest are strings.
#[must_use]
pub fn parse_share_query(query: &str) -> BTreeMap<String, Value> {
    form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .map(|(label, raw)| {
            let value = match serde_json::from_str::<Value>(&raw) {
                Ok(v @ (Value::Number(_) | Value::Bool(_) | Value::Null)) => v,
                _ => Value::String(raw.into_owned()),
            };
            (label.into_owned(), value)
        })
        .collect()
}

/// Publishes the pending inputs as a share query after a quiet period
#[derive(Debug)]
pub struct ShareStatePublisher {
    debouncer: Debouncer,
    state: Arc<watch::Sender<String>>,
}

impl ShareStatePublisher {
    /// Create publisher with `delay` quiet period
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        let (state, _) = watch::channel(String::new());
        Self {
            debouncer: Debouncer::new(delay),
            state: Arc::new(state),
        }
    }

    /// Reflect `pending` once input edits settle
    pub fn update(&self, graph: &Graph, pending: &PendingInputs) {
        let query = share_query(&labeled_overrides(graph, pending));
        let state = Arc::clone(&self.state);
        self.debouncer.schedule(async move {
            state.send_if_modified(|current| {
                if *current == query {
                    return false;
                }
                *current = query;
                true
            });
        });
    }

    /// Last published query
    #[must_use]
    pub fn current(&self) -> String {
        self.state.borrow().clone()
    }

    /// Watch published queries
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::InputValue;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use sheet_graph::{NewNode, NodeKind};

    #[test]
    fn query_encodes_labels_and_values() {
        let inputs = LabeledInputs::from([
            ("rate".to_string(), InputValue::new(json!(0.5))),
            ("city name".to_string(), InputValue::new(json!("São Paulo"))),
        ]);
        let query = share_query(&inputs);
        assert_eq!(query, "city+name=S%C3%A3o+Paulo&rate=0.5");

        let parsed = parse_share_query(&format!("?{query}"));
        assert_eq!(parsed["rate"], json!(0.5));
        assert_eq!(parsed["city name"], json!("São Paulo"));
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_after_quiet_period() {
        let mut graph = Graph::new();
        let rate = graph.add_node(NewNode::new(NodeKind::Input, "rate"));
        let publisher = ShareStatePublisher::new(DEFAULT_SHARE_DELAY);

        for v in 1..=3 {
            publisher.update(&graph, &PendingInputs::from([(rate, json!(v))]));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(publisher.current(), "");

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(publisher.current(), "rate=3");
    }
}
