// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use datamap::{DescriptorRegistry, Entity, RegistryExt};

#[derive(Entity)]
#[entity(rename_all = "camelCase")]
pub struct AuditEntry {
    pub entry_id:   i64,
    pub created_by: String
}

fn main() {
    let registry = DescriptorRegistry::new();
    let entry = registry.describe::<AuditEntry>().unwrap();
    assert_eq!(entry.table(), "AuditEntry");
    assert_eq!(entry.require_member("createdBy").unwrap().name(), "createdBy");
    assert!(!entry.has_default_constructor());
}
