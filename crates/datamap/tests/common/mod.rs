// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Shared fixtures for the end-to-end tests.

#![allow(dead_code)]

use datamap::{DataClient, Entity, SqliteConnection};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Install a test subscriber once; `RUST_LOG` selects the events.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Entity, Debug, Clone, Default, PartialEq)]
#[entity(table = "people", default)]
pub struct Person {
    pub id:   i64,
    pub name: String,
    pub age:  i32
}

impl Person {
    pub fn new(name: &str, age: i32) -> Self {
        Self {
            id: 0,
            name: name.to_owned(),
            age
        }
    }
}

pub const PEOPLE: &str = "CREATE TABLE people (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, age INTEGER NOT NULL)";

/// A client over a fresh database file holding the tables created by
/// `schema`. Keep the directory alive for the duration of the test.
pub fn client(schema: &[&str]) -> (TempDir, DataClient<SqliteConnection>) {
    init_tracing();
    let dir = tempfile::tempdir().expect("temp dir");
    let mut client = DataClient::new(SqliteConnection::file(dir.path().join("test.db")));
    for statement in schema {
        client.execute(statement, &()).expect("schema");
    }
    (dir, client)
}
