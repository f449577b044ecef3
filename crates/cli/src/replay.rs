use anyhow::{Context as AnyhowContext, Result};
use portal_protocol::FetchIntent;
use portal_search::{Action, Dispatch, RootState, Store};
use serde::Serialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepOutcome {
    Applied,
    Ignored,
    Discarded,
    Unhandled,
    Rejected,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub step: usize,
    #[serde(rename = "type")]
    pub action_type: String,
    pub outcome: StepOutcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub intents: Vec<FetchIntent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub steps: Vec<StepReport>,
    pub snapshot: RootState,
}

/// Read an action script: a JSON array, or one JSON action per line.
pub fn read_script(path: &Path) -> Result<Vec<Action>> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read action script from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read action script {}", path.display()))?
    };
    parse_script(&raw)
}

pub fn parse_script(raw: &str) -> Result<Vec<Action>> {
    if raw.trim_start().starts_with('[') {
        return serde_json::from_str(raw).context("Invalid action script");
    }
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Invalid action on line {}", index + 1))
        })
        .collect()
}

fn action_type(action: &Action) -> String {
    serde_json::to_value(action)
        .ok()
        .and_then(|value| value.get("type").and_then(|t| t.as_str()).map(str::to_string))
        .unwrap_or_default()
}

/// Apply actions in order without performing any fetch. Rejected actions are
/// reported and leave the store as it was.
pub fn replay(store: &mut Store, actions: &[Action]) -> ReplayReport {
    let steps = actions
        .iter()
        .enumerate()
        .map(|(step, action)| {
            let (outcome, intents, error) = match store.dispatch(action) {
                Ok(Dispatch::Applied(intents)) => (StepOutcome::Applied, intents, None),
                Ok(Dispatch::Ignored) => (StepOutcome::Ignored, Vec::new(), None),
                Ok(Dispatch::Discarded) => (StepOutcome::Discarded, Vec::new(), None),
                Ok(Dispatch::Unhandled) => (StepOutcome::Unhandled, Vec::new(), None),
                Err(err) => (StepOutcome::Rejected, Vec::new(), Some(err.to_string())),
            };
            StepReport {
                step,
                action_type: action_type(action),
                outcome,
                intents,
                error,
            }
        })
        .collect();
    ReplayReport {
        steps,
        snapshot: store.snapshot(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_accepts_array_or_lines() {
        let array = r#"[{"type": "ANIMATION_TOGGLED"}, {"type": "ERROR_DISMISSED"}]"#;
        let lines = "{\"type\": \"ANIMATION_TOGGLED\"}\n\n{\"type\": \"ERROR_DISMISSED\"}\n";
        assert_eq!(parse_script(array).unwrap(), parse_script(lines).unwrap());
        assert_eq!(parse_script(lines).unwrap().len(), 2);
    }

    #[test]
    fn bad_line_is_reported_with_its_number() {
        let err = parse_script("{\"type\": \"ANIMATION_TOGGLED\"}\nnot json\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn replay_reports_each_step() {
        let mut store = Store::new(Vec::new());
        let report = replay(
            &mut store,
            &[
                Action::AnimationToggled,
                Action::ErrorDismissed,
                Action::ResultsRequested {
                    perspective_id: "ghost".to_string(),
                },
            ],
        );
        let outcomes: Vec<StepOutcome> = report.steps.iter().map(|s| s.outcome).collect();
        assert_eq!(
            outcomes,
            vec![StepOutcome::Applied, StepOutcome::Ignored, StepOutcome::Unhandled]
        );
        assert_eq!(report.steps[0].action_type, "ANIMATION_TOGGLED");
    }
}
