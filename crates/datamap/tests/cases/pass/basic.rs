// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use datamap::{DescriptorRegistry, Entity, RegistryExt};

#[derive(Entity, Debug, Clone, Default)]
#[entity(table = "users")]
pub struct User {
    pub id:    i64,
    pub name:  String,
    pub email: Option<String>
}

fn main() {
    let registry = DescriptorRegistry::new();
    let user = registry.describe::<User>().unwrap();
    assert_eq!(user.table(), "users");
    assert_eq!(user.key_names(), ["id"]);
    assert_eq!(user.constructors().len(), 1);
}
