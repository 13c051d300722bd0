// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn builtin_kinds_are_registered() {
    let registry = ResourceRegistry::with_builtin_kinds();
    for kind in ["Package", "Repository", "File", "Exec", "ServiceAccount"] {
        assert!(registry.get(kind).is_some(), "missing kind {kind}");
    }
}

#[test]
fn unknown_kind_is_absent() {
    let registry = ResourceRegistry::with_builtin_kinds();
    assert!(registry.get("NoSuchKind").is_none());
}

#[test]
fn repository_enforces_before_package_and_file_before_package() {
    let registry = ResourceRegistry::with_builtin_kinds();
    let repo_priority = registry.get("Repository").unwrap().priority();
    let file_priority = registry.get("File").unwrap().priority();
    let package_priority = registry.get("Package").unwrap().priority();
    assert!(repo_priority < file_priority);
    assert!(file_priority < package_priority);
}
