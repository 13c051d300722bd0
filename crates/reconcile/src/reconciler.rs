// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The reconciler (§4.5): group selection, then validate → check → enforce
//! → report → cleanup for one `PolicyAssignment`.

use fleet_core::{ComplianceReport, ComplianceState, HostInventory, PolicyAssignment, PolicyMode};

use crate::caps::HostCaps;
use crate::kinds::ManagedResource;
use crate::registry::ResourceRegistry;

/// Outcome of applying one `PolicyAssignment` (§4.5 step 1).
pub enum GroupOutcome {
    /// No group's filter matched this host's inventory; the policy is
    /// skipped entirely (§4.5 "record NO_MATCHING_GROUP and skip").
    NoMatchingGroup,
    /// The per-resource reports for the one group that was selected.
    Applied(Vec<ComplianceReport>),
}

/// One resource's progress through validate/check/enforce. `outcome` is set
/// as soon as a terminal result (an error, or a final compliant/
/// non-compliant state) is known; `managed` stays available for `cleanup`
/// regardless.
struct Slot {
    id: String,
    kind: String,
    managed: Option<Box<dyn ManagedResource>>,
    outcome: Option<ComplianceReport>,
    in_desired_state: Option<bool>,
}

/// Executes one `ApplyPolicies` payload's assignment against the active
/// group (§4.5).
pub async fn apply_policy(
    assignment: &PolicyAssignment,
    inventory: &HostInventory,
    registry: &ResourceRegistry,
    caps: &HostCaps,
) -> GroupOutcome {
    let Some(group) = assignment.groups.iter().find(|g| g.filter.matches(inventory)) else {
        tracing::warn!(policy = %assignment.id, "no resource group matched this host's inventory");
        return GroupOutcome::NoMatchingGroup;
    };

    let mut slots: Vec<Slot> = Vec::with_capacity(group.resources.len());

    // Validate pass (§4.5 step 2): every resource in the active group is
    // validated before any enforce is attempted in that group.
    for resource in &group.resources {
        match registry.get(&resource.kind) {
            None => {
                tracing::warn!(resource = %resource.id, kind = %resource.kind, "unsupported resource kind");
                slots.push(Slot {
                    id: resource.id.clone(),
                    kind: resource.kind.clone(),
                    managed: None,
                    outcome: Some(ComplianceReport::error(&resource.id, "UNSUPPORTED_KIND")),
                    in_desired_state: None,
                });
            }
            Some(kind) => match kind.validate(resource, caps).await {
                Ok(managed) => slots.push(Slot {
                    id: resource.id.clone(),
                    kind: resource.kind.clone(),
                    managed: Some(managed),
                    outcome: None,
                    in_desired_state: None,
                }),
                Err(e) => {
                    tracing::warn!(resource = %resource.id, error = %e, "resource validation failed");
                    slots.push(Slot {
                        id: resource.id.clone(),
                        kind: resource.kind.clone(),
                        managed: None,
                        outcome: Some(ComplianceReport::error(&resource.id, e.to_string())),
                        in_desired_state: None,
                    });
                }
            },
        }
    }

    // Check pass (§4.5 step 3): side-effect-free, only for validated slots.
    for slot in slots.iter_mut() {
        if slot.outcome.is_some() {
            continue;
        }
        let Some(managed) = &slot.managed else { continue };
        match managed.check().await {
            Ok(state) => slot.in_desired_state = Some(state),
            Err(e) => {
                tracing::warn!(resource = %slot.id, error = %e, "resource check failed");
                slot.outcome = Some(ComplianceReport::error(&slot.id, e.to_string()));
            }
        }
    }

    // Enforce pass (§4.5 step 4): only in ENFORCEMENT mode, only for slots
    // that validated, checked, and are not already in the desired state.
    // Ordered by kind priority (repositories, then files, then packages,
    // ...), tie-broken by declaration order (§4.5 "Ordering rules").
    if assignment.mode == PolicyMode::Enforcement {
        let mut order: Vec<usize> = slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.outcome.is_none() && s.in_desired_state == Some(false))
            .map(|(i, _)| i)
            .collect();
        order.sort_by_key(|&i| {
            let priority = registry.get(&slots[i].kind).map(|k| k.priority()).unwrap_or(u8::MAX);
            (priority, i)
        });

        for i in order {
            let outcome = {
                let Some(managed) = &slots[i].managed else { continue };
                enforce_and_recheck(slots[i].id.as_str(), managed.as_ref()).await
            };
            slots[i].outcome = Some(outcome);
        }
    }

    // Remaining slots validated, checked, and never entered the enforce
    // pass (either mode = VALIDATION, or they were already compliant).
    for slot in slots.iter_mut() {
        if slot.outcome.is_some() {
            continue;
        }
        let report = match (&slot.managed, slot.in_desired_state) {
            (Some(managed), Some(true)) => ComplianceReport {
                resource_id: slot.id.clone(),
                state: ComplianceState::Compliant,
                cause: None,
                outputs: managed.populate_output(),
            },
            (Some(managed), Some(false)) => ComplianceReport {
                resource_id: slot.id.clone(),
                state: ComplianceState::NonCompliant,
                cause: None,
                outputs: managed.populate_output(),
            },
            _ => ComplianceReport::error(&slot.id, "internal: resource left unreported"),
        };
        slot.outcome = Some(report);
    }

    // Cleanup pass (§4.5 step 6): runs regardless of outcome, errors logged
    // only — `ManagedResource::cleanup` itself never returns a `Result`.
    for slot in &slots {
        if let Some(managed) = &slot.managed {
            managed.cleanup().await;
        }
    }

    let reports = slots
        .into_iter()
        .map(|s| s.outcome.unwrap_or_else(|| ComplianceReport::error(&s.id, "internal: no outcome recorded")))
        .collect();

    GroupOutcome::Applied(reports)
}

async fn enforce_and_recheck(resource_id: &str, managed: &dyn ManagedResource) -> ComplianceReport {
    if let Err(e) = managed.enforce().await {
        tracing::warn!(resource = %resource_id, error = %e, "resource enforce failed");
        return ComplianceReport::error(resource_id, e.to_string());
    }
    match managed.check().await {
        Ok(true) => ComplianceReport {
            resource_id: resource_id.to_string(),
            state: ComplianceState::Compliant,
            cause: None,
            outputs: managed.populate_output(),
        },
        Ok(false) => ComplianceReport {
            resource_id: resource_id.to_string(),
            state: ComplianceState::NonCompliant,
            cause: Some("enforce ran but the resource is still not in the desired state".to_string()),
            outputs: managed.populate_output(),
        },
        Err(e) => {
            tracing::warn!(resource = %resource_id, error = %e, "post-enforce check failed");
            ComplianceReport::error(resource_id, e.to_string())
        }
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
