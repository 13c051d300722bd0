// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn debian() -> HostInventory {
    HostInventory {
        os_short_name: "debian".to_string(),
        os_version: "12.4".to_string(),
        architecture: "x86_64".to_string(),
    }
}

#[test]
fn empty_filter_matches_anything() {
    let filter = InventoryFilter::default();
    assert!(filter.matches(&debian()));
}

#[test]
fn os_short_name_filter_is_case_insensitive() {
    let filter = InventoryFilter {
        os_short_name: Some("DEBIAN".to_string()),
        ..Default::default()
    };
    assert!(filter.matches(&debian()));
}

#[test]
fn os_version_filter_matches_prefix() {
    let filter = InventoryFilter {
        os_version: Some("12".to_string()),
        ..Default::default()
    };
    assert!(filter.matches(&debian()));

    let filter = InventoryFilter {
        os_version: Some("11".to_string()),
        ..Default::default()
    };
    assert!(!filter.matches(&debian()));
}

#[test]
fn mismatched_architecture_fails_the_filter() {
    let filter = InventoryFilter {
        architecture: Some("arm64".to_string()),
        ..Default::default()
    };
    assert!(!filter.matches(&debian()));
}

#[test]
fn compliance_report_helpers_set_expected_state() {
    let ok = ComplianceReport::compliant("res-1");
    assert_eq!(ok.state, ComplianceState::Compliant);
    assert!(ok.cause.is_none());

    let err = ComplianceReport::error("res-2", "boom");
    assert_eq!(err.state, ComplianceState::Error);
    assert_eq!(err.cause.as_deref(), Some("boom"));
}

#[test]
fn task_notification_round_trips_through_json() {
    let note = TaskNotification {
        task_id: "t-1".to_string(),
        task_type: TaskType::ApplyPolicies,
        payload: serde_json::json!({"policies": []}),
    };
    let encoded = serde_json::to_string(&note).expect("serialize");
    let decoded: TaskNotification = serde_json::from_str(&encoded).expect("deserialize");
    assert_eq!(decoded, note);
}

#[test]
fn unrecognized_task_type_tag_deserializes_to_unknown_instead_of_failing() {
    let json = r#"{"task_id":"t-2","task_type":"SOME_FUTURE_TYPE","payload":null}"#;
    let decoded: TaskNotification = serde_json::from_str(json).expect("deserialize");
    assert_eq!(decoded.task_type, TaskType::Unknown);
}

#[test]
fn agent_state_update_config_replaces_snapshot() {
    let mut state = AgentState::new("1.0.0");
    assert!(state.config.task_notification_enabled);

    let mut next = ConfigSnapshot::default();
    next.task_notification_enabled = false;
    state.update_config(next);

    assert!(!state.config.task_notification_enabled);
    assert_eq!(state.version, "1.0.0");
}
