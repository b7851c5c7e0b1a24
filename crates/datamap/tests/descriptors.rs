// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Descriptors produced from derived mappings.

mod common;

use common::client;
use datamap::{
    AccessTier, DescriptorRegistry, Entity, RegistryExt, Select, TypeKey, TypeRegistry, Value, Visibility, col
};

#[derive(Entity, Debug, Default, PartialEq)]
pub struct Order {
    pub orderid: i64,
    pub total:   f64
}

#[derive(Entity, Debug, Default)]
#[entity(table = "invoices")]
pub struct Invoice {
    #[key]
    pub number: String,
    pub id:     i64,
    pub amount: f64
}

#[derive(Entity, Debug, Default)]
#[entity(rename_all = "PascalCase")]
pub struct Legacy {
    pub id:        i64,
    pub full_name: String
}

#[test]
fn key_falls_back_to_id_then_table_id() {
    let registry = DescriptorRegistry::new();

    let order = registry.describe::<Order>().unwrap();
    assert_eq!(order.table(), "Order");
    assert_eq!(order.key_names(), ["orderid"]);
    assert_eq!(order.column_mapped().map(|m| m.name()).collect::<Vec<_>>(), ["total"]);

    let invoice = registry.describe::<Invoice>().unwrap();
    assert_eq!(invoice.key_names(), ["number"]);
    let mapped: Vec<&str> = invoice.column_mapped().map(|m| m.name()).collect();
    assert_eq!(mapped, ["id", "amount"]);

    let legacy = registry.describe::<Legacy>().unwrap();
    assert_eq!(legacy.key_names(), ["Id"]);
    assert_eq!(legacy.member("fullname").map(|m| m.name()), Some("FullName"));
    assert_eq!(legacy.require_member("FullName").unwrap().column(), "FullName");
}

#[derive(Default)]
pub struct Scratch {
    pub hits: u32
}

#[derive(Entity, Default)]
#[entity(table = "accounts", schema = "bank", default)]
pub struct Account {
    pub id: i64,

    #[column]
    #[display(name = "Holder", description = "Account holder", group = "General")]
    pub owner: String,

    #[foreign_key(references = "branches")]
    pub branch_id: i64,

    pub note: String,

    balance: i64,

    #[not_mapped]
    pub scratch: Scratch
}

impl Account {
    pub fn balance(&self) -> i64 {
        self.balance
    }
}

#[test]
fn annotations_drive_the_column_set() {
    let registry = DescriptorRegistry::new();
    let account = registry.describe::<Account>().unwrap();

    assert_eq!(account.schema(), Some("bank"));
    assert!(account.has_default_constructor());

    let mapped: Vec<&str> = account.column_mapped().map(|m| m.name()).collect();
    assert_eq!(mapped, ["owner", "branch_id"]);

    let branch = account.require_member("branch_id").unwrap();
    assert!(branch.is_foreign_key());
    assert_eq!(branch.references(), Some("branches"));

    let owner = account.require_member("owner").unwrap();
    assert_eq!(owner.display_name(), "Holder");
    assert_eq!(account.require_member("note").unwrap().display_name(), "note");
}

#[test]
fn private_and_ignored_fields() {
    let registry = DescriptorRegistry::new();
    let account = registry.describe::<Account>().unwrap();

    let balance = account.require_member("balance").unwrap();
    assert_eq!(balance.visibility(), Visibility::Private);
    assert!(!balance.is_column_mapped());
    assert_eq!(balance.tier(), AccessTier::Compiled);

    let scratch = account.require_member("scratch").unwrap();
    assert!(scratch.is_not_mapped());
    assert!(!scratch.can_read() && !scratch.can_write());
    assert_eq!(scratch.tier(), AccessTier::Unavailable);
    assert!(scratch.get(&Account::default()).is_err());

    let mut item = Account::default();
    balance.set(&mut item, Value::Int(250)).unwrap();
    assert_eq!(item.balance(), 250);
    assert_eq!(item.scratch.hits, 0);
}

#[derive(Entity, Debug, Default, Clone, PartialEq)]
#[entity(table = "nodes", default)]
pub struct Node {
    pub id:       i64,
    pub name:     String,
    pub children: Vec<Node>,
    pub parent:   Option<Box<Node>>
}

#[test]
fn self_referential_types_terminate() {
    let registry = DescriptorRegistry::new();
    let node = registry.describe::<Node>().unwrap();

    let key = TypeKey::of::<Node>();
    assert_eq!(node.require_member("children").unwrap().nested_key(), Some(key));
    assert_eq!(node.require_member("parent").unwrap().nested_key(), Some(key));

    let nested = node.require_member("children").unwrap().nested(&registry).unwrap().unwrap();
    assert!(std::sync::Arc::ptr_eq(&nested, &node));
    assert_eq!(node.column_mapped().map(|m| m.name()).collect::<Vec<_>>(), ["name"]);
    assert_eq!(registry.len(), 1);
}

#[test]
fn self_referential_rows_materialize() {
    let (_dir, mut client) = client(&["CREATE TABLE nodes (id INTEGER PRIMARY KEY, name TEXT NOT NULL)"]);
    let mut root = Node {
        name: "root".into(),
        ..Node::default()
    };
    client.insert(&mut root).unwrap();

    let mut leaf = Node {
        name: "leaf".into(),
        parent: Some(Box::new(root.clone())),
        ..Node::default()
    };
    client.insert(&mut leaf).unwrap();

    let found = client.first::<Node>(col("name").eq("leaf")).unwrap().unwrap();
    assert_eq!(found.id, leaf.id);
    assert!(found.parent.is_none());
    assert!(found.children.is_empty());
    assert_eq!(client.to_list::<Node>(Select::new()).unwrap().len(), 2);
}

#[test]
fn descriptors_are_shared_per_type() {
    let registry = DescriptorRegistry::new();
    let first = registry.describe::<Order>().unwrap();
    let second = registry.describe::<Order>().unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert_eq!(first.require_member("total").unwrap().owner().map(|o| o.key()), Some(first.key()));
}
