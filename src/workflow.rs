//! Workflow status and parameter resolution.
//!
//! The workflow add-on is optional. When a status document exists, the owner
//! and relevance parameters are read from the flat parameters document if
//! there is one. Some workflow configurations only expose parameters on
//! transition definitions, so without a flat document the `submit`
//! transition is scanned first, then each `select` transition for whatever
//! is still missing.

use crate::client::ContentApi;
use crate::config::WorkflowConfig;
use crate::models::{WorkflowInfo, WorkflowParameter, WorkflowParameters, WorkflowStatus};

/// Fetch and resolve workflow data for one item. `None` when no workflow is
/// attached or the lookup fails.
pub async fn lookup_workflow(
    api: &dyn ContentApi,
    page_id: &str,
    config: &WorkflowConfig,
) -> Option<WorkflowInfo> {
    let status = match api.workflow_status(page_id).await {
        Ok(Some(status)) => status,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(page_id, error = %e, "failed to retrieve workflow status");
            return None;
        }
    };

    let parameters = match api.workflow_parameters(page_id).await {
        Ok(parameters) => parameters,
        Err(e) => {
            tracing::warn!(page_id, error = %e, "failed to retrieve workflow parameters");
            None
        }
    };

    Some(resolve_workflow(&status, parameters.as_ref(), config))
}

/// Combine a status document and an optional flat parameters document.
pub fn resolve_workflow(
    status: &WorkflowStatus,
    parameters: Option<&WorkflowParameters>,
    config: &WorkflowConfig,
) -> WorkflowInfo {
    let mut info = WorkflowInfo {
        workflow_name: status.workflow_name.clone(),
        ..Default::default()
    };

    if let Some(flat) = parameters.and_then(|p| p.workflow_parameters.as_ref()) {
        let mut slots = ParamSlots::new(config, &mut info);
        slots.fill_from(flat);
        return info;
    }

    let transitions = match &status.state {
        Some(state) => &state.transitions,
        None => return info,
    };

    let mut slots = ParamSlots::new(config, &mut info);
    if let Some(submit) = &transitions.submit {
        slots.fill_from(&submit.parameters);
    }
    for transition in &transitions.select {
        if slots.complete() {
            break;
        }
        slots.fill_from(&transition.parameters);
    }

    info
}

/// The two configured parameter ids and where their values land.
struct ParamSlots<'a> {
    owner_id: &'a str,
    relevance_id: &'a str,
    info: &'a mut WorkflowInfo,
}

impl<'a> ParamSlots<'a> {
    fn new(config: &'a WorkflowConfig, info: &'a mut WorkflowInfo) -> Self {
        Self {
            owner_id: &config.owner_param_id,
            relevance_id: &config.relevance_param_id,
            info,
        }
    }

    fn complete(&self) -> bool {
        !self.info.owner_value.is_empty() && !self.info.project_relevance.is_empty()
    }

    /// Take the first non-empty value per id; never overwrite.
    fn fill_from(&mut self, params: &[WorkflowParameter]) {
        for param in params {
            let slot = if param.id == self.owner_id {
                &mut self.info.owner_value
            } else if param.id == self.relevance_id {
                &mut self.info.project_relevance
            } else {
                continue;
            };
            if slot.is_empty() {
                *slot = param.value_text();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeApi;
    use crate::models::{Transition, Transitions, WorkflowState};
    use serde_json::json;

    fn param(id: &str, value: &str) -> WorkflowParameter {
        WorkflowParameter {
            id: id.to_string(),
            value: json!(value),
        }
    }

    fn status_with(
        submit: Option<Vec<WorkflowParameter>>,
        select: Vec<Vec<WorkflowParameter>>,
    ) -> WorkflowStatus {
        WorkflowStatus {
            workflow_name: "Approval".to_string(),
            state: Some(WorkflowState {
                transitions: Transitions {
                    submit: submit.map(|parameters| Transition { parameters }),
                    select: select
                        .into_iter()
                        .map(|parameters| Transition { parameters })
                        .collect(),
                },
            }),
        }
    }

    #[test]
    fn flat_document_wins_over_transitions() {
        let status = status_with(Some(vec![param("owner", "Bob")]), vec![]);
        let flat = WorkflowParameters {
            workflow_parameters: Some(vec![param("owner", "Alice"), param("relevance", "High")]),
        };

        let info = resolve_workflow(&status, Some(&flat), &WorkflowConfig::default());

        assert_eq!(info.workflow_name, "Approval");
        assert_eq!(info.owner_value, "Alice");
        assert_eq!(info.project_relevance, "High");
    }

    #[test]
    fn flat_document_is_exclusive_even_when_incomplete() {
        let status = status_with(Some(vec![param("relevance", "Low")]), vec![]);
        let flat = WorkflowParameters {
            workflow_parameters: Some(vec![param("owner", "Alice")]),
        };

        let info = resolve_workflow(&status, Some(&flat), &WorkflowConfig::default());

        assert_eq!(info.owner_value, "Alice");
        assert_eq!(info.project_relevance, "");
    }

    #[test]
    fn submit_transition_is_scanned_first() {
        let status = status_with(
            Some(vec![param("owner", "Bob")]),
            vec![vec![param("owner", "Carol"), param("relevance", "Medium")]],
        );

        let info = resolve_workflow(&status, None, &WorkflowConfig::default());

        assert_eq!(info.owner_value, "Bob");
        assert_eq!(info.project_relevance, "Medium");
    }

    #[test]
    fn select_transitions_take_first_match() {
        let status = status_with(
            None,
            vec![
                vec![param("relevance", "High")],
                vec![param("owner", "Dan"), param("relevance", "Low")],
                vec![param("owner", "Eve")],
            ],
        );

        let info = resolve_workflow(&status, None, &WorkflowConfig::default());

        assert_eq!(info.owner_value, "Dan");
        assert_eq!(info.project_relevance, "High");
    }

    #[test]
    fn document_without_parameter_list_falls_back() {
        let status = status_with(Some(vec![param("owner", "Bob")]), vec![]);
        let flat = WorkflowParameters {
            workflow_parameters: None,
        };

        let info = resolve_workflow(&status, Some(&flat), &WorkflowConfig::default());

        assert_eq!(info.owner_value, "Bob");
    }

    #[test]
    fn uses_configured_parameter_ids() {
        let config = WorkflowConfig {
            enabled: true,
            owner_param_id: "p-17".to_string(),
            relevance_param_id: "p-18".to_string(),
        };
        let flat = WorkflowParameters {
            workflow_parameters: Some(vec![param("owner", "ignored"), param("p-17", "Fay")]),
        };

        let info = resolve_workflow(&WorkflowStatus::default(), Some(&flat), &config);

        assert_eq!(info.owner_value, "Fay");
    }

    #[test]
    fn broken_transition_block_keeps_name_and_flat_values() {
        let status: WorkflowStatus = serde_json::from_str(
            r#"{"workflowName": "Approval", "state": {"transitions": {"select": null}}}"#,
        )
        .unwrap();
        let flat: WorkflowParameters = serde_json::from_str(
            r#"{"workflowParameters": [{"id": "owner", "value": "Alice"}]}"#,
        )
        .unwrap();

        let without = resolve_workflow(&status, None, &WorkflowConfig::default());
        assert_eq!(without.workflow_name, "Approval");
        assert_eq!(without.owner_value, "");

        let with = resolve_workflow(&status, Some(&flat), &WorkflowConfig::default());
        assert_eq!(with.owner_value, "Alice");
    }

    #[test]
    fn numeric_parameter_ids_match_configured_ids() {
        let status: WorkflowStatus = serde_json::from_str(
            r#"{"workflowName": "Approval", "state": {"transitions": {
                "submit": {"parameters": [{"id": 17, "value": "Fay"}]}
            }}}"#,
        )
        .unwrap();
        let config = WorkflowConfig {
            owner_param_id: "17".to_string(),
            ..WorkflowConfig::default()
        };

        let info = resolve_workflow(&status, None, &config);

        assert_eq!(info.owner_value, "Fay");
    }

    #[tokio::test]
    async fn no_status_skips_parameter_lookup() {
        let api = FakeApi::default();

        let info = lookup_workflow(&api, "1", &WorkflowConfig::default()).await;

        assert!(info.is_none());
        assert_eq!(api.calls_matching("parameters:"), 0);
    }

    #[tokio::test]
    async fn failed_status_lookup_is_absent() {
        let mut api = FakeApi::default();
        api.failing.insert("1".to_string());

        assert!(lookup_workflow(&api, "1", &WorkflowConfig::default()).await.is_none());
    }

    #[tokio::test]
    async fn status_triggers_parameter_lookup() {
        let mut api = FakeApi::default();
        api.statuses.insert(
            "1".to_string(),
            status_with(Some(vec![param("owner", "Bob")]), vec![]),
        );
        api.parameters.insert(
            "1".to_string(),
            WorkflowParameters {
                workflow_parameters: Some(vec![param("owner", "Alice")]),
            },
        );

        let info = lookup_workflow(&api, "1", &WorkflowConfig::default())
            .await
            .unwrap();

        assert_eq!(info.owner_value, "Alice");
        assert_eq!(api.calls_matching("parameters:1"), 1);
    }
}
