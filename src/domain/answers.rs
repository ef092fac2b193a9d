use crate::domain::questionnaire::GATE_JOIN_KEY;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Collected answer for one question, shaped by the question kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Answer {
    Choice(String),
    /// Oldest selection first; the order drives FIFO eviction.
    Selection(Vec<String>),
    Text(String),
    Gate(GateAnswer),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GateAnswer {
    pub join: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl GateAnswer {
    pub fn field(&self, id: &str) -> &str {
        self.fields.get(id).map(String::as_str).unwrap_or("")
    }
}

/// One user interaction with the current question.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerInput {
    /// Picks an option on select questions, toggles it on multi-valued ones.
    Select { option_id: String },
    Text { value: String },
    Join { option_id: String },
    FollowUp { field_id: String, value: String },
}

impl Answer {
    pub fn is_empty(&self) -> bool {
        match self {
            Answer::Choice(v) => v.is_empty(),
            Answer::Selection(v) => v.is_empty(),
            Answer::Text(v) => v.trim().is_empty(),
            Answer::Gate(g) => g.join.is_none(),
        }
    }

    /// Submission encoding: text is trimmed, gate follow-ups are trimmed and
    /// flattened next to the join decision.
    pub fn to_json(&self) -> Value {
        match self {
            Answer::Choice(v) => json!(v),
            Answer::Selection(v) => json!(v),
            Answer::Text(v) => json!(v.trim()),
            Answer::Gate(g) => {
                let mut map = serde_json::Map::new();
                map.insert(GATE_JOIN_KEY.to_string(), json!(g.join));
                for (k, v) in &g.fields {
                    map.insert(k.clone(), json!(v.trim()));
                }
                Value::Object(map)
            }
        }
    }
}

/// Toggles `option` in a multi-valued selection.
///
/// A new pick beyond `max` evicts the oldest one. Picking the exclusive
/// option clears everything else; picking anything else drops it.
pub fn toggle_selection(
    selection: &mut Vec<String>,
    option: &str,
    max: Option<usize>,
    exclusive: Option<&str>,
) {
    if let Some(pos) = selection.iter().position(|v| v == option) {
        selection.remove(pos);
        return;
    }

    if exclusive == Some(option) {
        selection.clear();
        selection.push(option.to_string());
        return;
    }

    if let Some(exclusive) = exclusive {
        selection.retain(|v| v != exclusive);
    }
    selection.push(option.to_string());
    if let Some(max) = max {
        while selection.len() > max {
            selection.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picks(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let mut sel = Vec::new();
        for opt in ["a", "b", "c", "d"] {
            toggle_selection(&mut sel, opt, Some(3), None);
        }
        assert_eq!(sel, picks(&["b", "c", "d"]));

        toggle_selection(&mut sel, "e", Some(3), None);
        assert_eq!(sel, picks(&["c", "d", "e"]));
    }

    #[test]
    fn test_toggle_removes_existing() {
        let mut sel = picks(&["a", "b"]);
        toggle_selection(&mut sel, "a", Some(2), None);
        assert_eq!(sel, picks(&["b"]));
    }

    #[test]
    fn test_exclusive_option() {
        let mut sel = picks(&["a", "b"]);
        toggle_selection(&mut sel, "none", None, Some("none"));
        assert_eq!(sel, picks(&["none"]));

        toggle_selection(&mut sel, "c", None, Some("none"));
        assert_eq!(sel, picks(&["c"]));

        toggle_selection(&mut sel, "none", Some(1), Some("none"));
        assert_eq!(sel, picks(&["none"]));
    }

    #[test]
    fn test_gate_json_is_flat_and_trimmed() {
        let mut gate = GateAnswer {
            join: Some("yes".into()),
            ..Default::default()
        };
        gate.fields.insert("email".into(), "  a@b.c ".into());
        let value = Answer::Gate(gate).to_json();
        assert_eq!(value, json!({ "join": "yes", "email": "a@b.c" }));
    }

    #[test]
    fn test_input_wire_format() {
        let input: AnswerInput =
            serde_json::from_str(r#"{"kind":"follow_up","field_id":"email","value":"x"}"#).unwrap();
        assert_eq!(
            input,
            AnswerInput::FollowUp {
                field_id: "email".into(),
                value: "x".into()
            }
        );
    }
}
