//! Toolchain matching.
//!
//! Given the target platform, the required toolchain types and the execution
//! constraints of a request, pick one execution platform and one toolchain
//! per required type. Execution candidates are tried in priority order; for
//! each candidate the registered toolchains are scanned in registration
//! order and the first match per type wins. The first candidate for which
//! every type has a match, and which satisfies the execution constraints, is
//! selected. Candidate order therefore outranks registration order.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::{ConstraintValue, Label, PlatformDescriptor, ToolchainDescriptor, ToolchainTypeRef};
use crate::resolution::ToolchainError;

/// Inputs of one resolution, all fully resolved.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionRequest<'a> {
    pub target_platform: &'a PlatformDescriptor,
    pub required_types: &'a BTreeSet<ToolchainTypeRef>,
    pub exec_constraints: &'a [ConstraintValue],
    /// Execution candidates in priority order
    pub candidates: &'a [PlatformDescriptor],
    /// Registered toolchains in registration order
    pub toolchains: &'a [ToolchainDescriptor],
}

/// A selected execution platform with one implementation per required type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub execution_platform: PlatformDescriptor,
    pub resolved: BTreeMap<ToolchainTypeRef, Label>,
}

/// Select an execution platform and toolchains for `request`.
pub fn resolve(request: ResolutionRequest<'_>) -> Result<Resolution, ToolchainError> {
    for candidate in request.candidates {
        if !candidate.satisfies(request.exec_constraints) {
            tracing::debug!(
                "rejected execution platform {}: does not satisfy the execution constraints",
                candidate
            );
            continue;
        }

        if let Some(resolved) = toolchains_for(candidate, &request) {
            tracing::debug!("selected execution platform {}", candidate);
            return Ok(Resolution {
                execution_platform: candidate.clone(),
                resolved,
            });
        }
    }

    Err(no_match(&request))
}

/// First matching toolchain per required type on `exec`, if every type has one.
fn toolchains_for(
    exec: &PlatformDescriptor,
    request: &ResolutionRequest<'_>,
) -> Option<BTreeMap<ToolchainTypeRef, Label>> {
    let mut resolved = BTreeMap::new();

    for &required in request.required_types {
        let found = request
            .toolchains
            .iter()
            .find(|t| t.toolchain_type == required && t.matches(exec, request.target_platform));

        match found {
            Some(toolchain) => {
                tracing::debug!(
                    "type {}: execution platform {} selected {}",
                    required,
                    exec,
                    toolchain.implementation
                );
                resolved.insert(required, toolchain.implementation);
            }
            None => {
                tracing::debug!(
                    "rejected execution platform {}: no toolchain of type {}",
                    exec,
                    required
                );
                return None;
            }
        }
    }

    Some(resolved)
}

/// Distinguish types nobody registered a toolchain for from a conflict.
fn no_match(request: &ResolutionRequest<'_>) -> ToolchainError {
    let unregistered: Vec<ToolchainTypeRef> = request
        .required_types
        .iter()
        .copied()
        .filter(|&t| !request.toolchains.iter().any(|d| d.toolchain_type == t))
        .collect();

    if unregistered.is_empty() {
        ToolchainError::NoMatchingPlatform {
            constraints: request.exec_constraints.to_vec(),
        }
    } else {
        ToolchainError::UnresolvedToolchains {
            types: unregistered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConstraintSetting;

    fn label(s: &str) -> Label {
        Label::parse(s).unwrap()
    }

    struct World {
        linux: ConstraintValue,
        mac: ConstraintValue,
        host: PlatformDescriptor,
        linux_platform: PlatformDescriptor,
        mac_platform: PlatformDescriptor,
        test_type: ToolchainTypeRef,
    }

    fn world() -> World {
        let os = ConstraintSetting::new(label("//constraints:os"));
        let linux = ConstraintValue::new(label("//constraints:linux"), os);
        let mac = ConstraintValue::new(label("//constraints:mac"), os);
        World {
            linux,
            mac,
            host: PlatformDescriptor::new(label("//host:host"), []).unwrap(),
            linux_platform: PlatformDescriptor::new(label("//platforms:linux"), [linux]).unwrap(),
            mac_platform: PlatformDescriptor::new(label("//platforms:mac"), [mac]).unwrap(),
            test_type: label("//toolchain:test_toolchain").into(),
        }
    }

    fn toolchain(
        name: &str,
        toolchain_type: ToolchainTypeRef,
        exec: &[ConstraintValue],
        target: &[ConstraintValue],
    ) -> ToolchainDescriptor {
        ToolchainDescriptor {
            label: label(&format!("//toolchains:{}", name)),
            toolchain_type,
            exec_constraints: exec.to_vec(),
            target_constraints: target.to_vec(),
            implementation: label(&format!("//toolchains:{}_impl", name)),
        }
    }

    fn types(items: &[ToolchainTypeRef]) -> BTreeSet<ToolchainTypeRef> {
        items.iter().copied().collect()
    }

    #[test]
    fn test_candidate_order_outranks_registration_order() {
        let w = world();
        // The linux toolchain is registered first, but mac is the earlier candidate
        let toolchains = [
            toolchain("on_linux", w.test_type, &[w.linux], &[w.linux]),
            toolchain("on_mac", w.test_type, &[w.mac], &[w.linux]),
        ];
        let candidates = [w.host.clone(), w.mac_platform.clone(), w.linux_platform.clone()];
        let required = types(&[w.test_type]);

        let resolution = resolve(ResolutionRequest {
            target_platform: &w.linux_platform,
            required_types: &required,
            exec_constraints: &[],
            candidates: &candidates,
            toolchains: &toolchains,
        })
        .unwrap();

        assert_eq!(resolution.execution_platform, w.mac_platform);
        assert_eq!(
            resolution.resolved[&w.test_type],
            label("//toolchains:on_mac_impl")
        );
    }

    #[test]
    fn test_registration_order_breaks_ties_within_a_platform() {
        let w = world();
        let toolchains = [
            toolchain("first", w.test_type, &[w.linux], &[]),
            toolchain("second", w.test_type, &[w.linux], &[]),
        ];
        let candidates = [w.linux_platform.clone()];
        let required = types(&[w.test_type]);

        let resolution = resolve(ResolutionRequest {
            target_platform: &w.linux_platform,
            required_types: &required,
            exec_constraints: &[],
            candidates: &candidates,
            toolchains: &toolchains,
        })
        .unwrap();

        assert_eq!(resolution.resolved[&w.test_type], label("//toolchains:first_impl"));
    }

    #[test]
    fn test_exec_constraint_narrows_selection() {
        let w = world();
        let toolchains = [
            toolchain("on_linux", w.test_type, &[w.linux], &[w.linux]),
            toolchain("on_mac", w.test_type, &[w.mac], &[w.linux]),
        ];
        let candidates = [w.host.clone(), w.mac_platform.clone(), w.linux_platform.clone()];
        let required = types(&[w.test_type]);

        let resolution = resolve(ResolutionRequest {
            target_platform: &w.linux_platform,
            required_types: &required,
            exec_constraints: &[w.linux],
            candidates: &candidates,
            toolchains: &toolchains,
        })
        .unwrap();

        assert_eq!(resolution.execution_platform, w.linux_platform);
        assert_eq!(
            resolution.resolved[&w.test_type],
            label("//toolchains:on_linux_impl")
        );
    }

    #[test]
    fn test_no_types_selects_host_without_toolchains() {
        let w = world();
        let candidates = [w.host.clone(), w.linux_platform.clone()];
        let required = BTreeSet::new();

        let resolution = resolve(ResolutionRequest {
            target_platform: &w.linux_platform,
            required_types: &required,
            exec_constraints: &[],
            candidates: &candidates,
            toolchains: &[],
        })
        .unwrap();

        assert_eq!(resolution.execution_platform, w.host);
        assert!(resolution.resolved.is_empty());
    }

    #[test]
    fn test_no_types_with_constraint_skips_host() {
        let w = world();
        let candidates = [w.host.clone(), w.linux_platform.clone(), w.mac_platform.clone()];
        let required = BTreeSet::new();

        let resolution = resolve(ResolutionRequest {
            target_platform: &w.linux_platform,
            required_types: &required,
            exec_constraints: &[w.mac],
            candidates: &candidates,
            toolchains: &[],
        })
        .unwrap();
        assert_eq!(resolution.execution_platform, w.mac_platform);

        let only_linux = [w.host.clone(), w.linux_platform.clone()];
        let err = resolve(ResolutionRequest {
            target_platform: &w.linux_platform,
            required_types: &required,
            exec_constraints: &[w.mac],
            candidates: &only_linux,
            toolchains: &[],
        })
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "no available execution platform satisfies all requested toolchain types along with constraints: //constraints:mac"
        );
    }

    #[test]
    fn test_platform_without_setting_does_not_satisfy() {
        let w = world();
        let toolchains = [toolchain("on_linux", w.test_type, &[w.linux], &[])];
        let candidates = [w.host.clone()];
        let required = types(&[w.test_type]);

        let err = resolve(ResolutionRequest {
            target_platform: &w.host,
            required_types: &required,
            exec_constraints: &[],
            candidates: &candidates,
            toolchains: &toolchains,
        })
        .unwrap_err();

        assert!(matches!(err, ToolchainError::NoMatchingPlatform { .. }));
    }

    #[test]
    fn test_target_constraints_are_checked() {
        let w = world();
        let toolchains = [toolchain("for_mac", w.test_type, &[w.linux], &[w.mac])];
        let candidates = [w.linux_platform.clone()];
        let required = types(&[w.test_type]);

        let err = resolve(ResolutionRequest {
            target_platform: &w.linux_platform,
            required_types: &required,
            exec_constraints: &[],
            candidates: &candidates,
            toolchains: &toolchains,
        })
        .unwrap_err();

        assert!(matches!(err, ToolchainError::NoMatchingPlatform { .. }));
    }

    #[test]
    fn test_unregistered_type_vs_conflicting_types() {
        let w = world();
        let type_a: ToolchainTypeRef = label("//fake/toolchain:type_a").into();
        let type_b: ToolchainTypeRef = label("//fake/toolchain:type_b").into();
        let toolchains = [
            toolchain("a_on_mac", type_a, &[w.mac], &[]),
            toolchain("b_on_linux", type_b, &[w.linux], &[]),
        ];
        let candidates = [w.host.clone(), w.mac_platform.clone(), w.linux_platform.clone()];

        // Each type resolves alone, but never on the same platform
        let both = types(&[type_a, type_b]);
        let err = resolve(ResolutionRequest {
            target_platform: &w.linux_platform,
            required_types: &both,
            exec_constraints: &[],
            candidates: &candidates,
            toolchains: &toolchains,
        })
        .unwrap_err();
        assert!(matches!(err, ToolchainError::NoMatchingPlatform { .. }));

        let unknown: ToolchainTypeRef = label("//fake/toolchain:type_1").into();
        let with_unknown = types(&[type_a, unknown]);
        let err = resolve(ResolutionRequest {
            target_platform: &w.linux_platform,
            required_types: &with_unknown,
            exec_constraints: &[],
            candidates: &candidates,
            toolchains: &toolchains,
        })
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "no matching toolchains found for types //fake/toolchain:type_1"
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let w = world();
        let toolchains = [
            toolchain("on_linux", w.test_type, &[w.linux], &[w.linux]),
            toolchain("on_mac", w.test_type, &[w.mac], &[w.linux]),
        ];
        let candidates = [w.host.clone(), w.linux_platform.clone(), w.mac_platform.clone()];
        let required = types(&[w.test_type]);
        let request = ResolutionRequest {
            target_platform: &w.linux_platform,
            required_types: &required,
            exec_constraints: &[],
            candidates: &candidates,
            toolchains: &toolchains,
        };

        assert_eq!(resolve(request).unwrap(), resolve(request).unwrap());
    }
}
