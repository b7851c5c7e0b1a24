// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Blocking data client against SQLite files.

mod common;

use std::collections::HashMap;

use common::{PEOPLE, Person, client};
use datamap::{ClientOptions, Connection, Entity, Error, MappingError, Order, Pagination, Pair, Select, Value, col, params};

#[test]
fn insert_then_first_round_trips() {
    let (_dir, mut client) = client(&[PEOPLE]);
    let mut ann = Person::new("Ann", 30);

    let identity = client.insert(&mut ann).unwrap();
    assert_eq!(identity, Some(Value::Int(ann.id)));
    assert!(ann.id > 0);

    let found = client.first::<Person>(col("id").eq(ann.id)).unwrap().unwrap();
    assert_eq!(found, ann);
    assert!(!client.connection().state().is_open());
}

#[test]
fn first_without_match_is_none() {
    let (_dir, mut client) = client(&[PEOPLE]);
    assert!(client.first::<Person>(col("id").eq(42)).unwrap().is_none());
}

#[test]
fn update_is_idempotent() {
    let (_dir, mut client) = client(&[PEOPLE]);
    let mut ann = Person::new("Ann", 30);
    client.insert(&mut ann).unwrap();

    ann.age = 31;
    assert_eq!(client.update(&ann).unwrap(), 1);
    assert_eq!(client.update(&ann).unwrap(), 1);

    let rows = client.to_list::<Person>(Select::new()).unwrap();
    assert_eq!(rows, vec![ann]);
}

#[test]
fn update_selected_columns_only() {
    let (_dir, mut client) = client(&[PEOPLE]);
    let mut ann = Person::new("Ann", 30);
    client.insert(&mut ann).unwrap();

    let changed = Person {
        name: "Anna".into(),
        age: 99,
        ..ann.clone()
    };
    client.update_columns(&changed, &["name"]).unwrap();

    let stored = client.first::<Person>(col("id").eq(ann.id)).unwrap().unwrap();
    assert_eq!(stored.name, "Anna");
    assert_eq!(stored.age, 30);
}

#[test]
fn update_where_ignores_the_key() {
    let (_dir, mut client) = client(&[PEOPLE]);
    for (name, age) in [("Ann", 30), ("Bob", 17), ("Cid", 45)] {
        client.insert(&mut Person::new(name, age)).unwrap();
    }
    let template = Person::new("adult", 0);
    let changed = client
        .update_where(&template, Some(col("age").ge(18)), &["name"])
        .unwrap();
    assert_eq!(changed, 2);
    assert_eq!(client.count::<Person>(Some(col("name").eq("adult"))).unwrap(), 2);
}

#[test]
fn delete_by_key_and_by_predicate() {
    let (_dir, mut client) = client(&[PEOPLE]);
    let mut ann = Person::new("Ann", 30);
    let mut bob = Person::new("Bob", 17);
    client.insert(&mut ann).unwrap();
    client.insert(&mut bob).unwrap();

    assert_eq!(client.delete(&ann).unwrap(), 1);
    assert_eq!(client.delete(&ann).unwrap(), 0);
    assert_eq!(client.delete_where::<Person>(col("age").lt(18)).unwrap(), 1);
    assert_eq!(client.count::<Person>(None).unwrap(), 0);
}

#[test]
fn queries_with_ordering_and_limits() {
    let (_dir, mut client) = client(&[PEOPLE]);
    for (name, age) in [("Ann", 30), ("Bob", 17), ("Cid", 45)] {
        client.insert(&mut Person::new(name, age)).unwrap();
    }

    let oldest: Vec<String> = client
        .to_list::<Person>(Select::new().order_by(Order::desc("age")).limit(2))
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(oldest, ["Cid", "Ann"]);

    let skipped = client
        .to_list::<Person>(Select::new().order_by(Order::asc("age")).offset(1))
        .unwrap();
    assert_eq!(skipped.len(), 2);
    assert_eq!(skipped[0].name, "Ann");
}

#[test]
fn default_row_limit_applies_without_explicit_limit() {
    let (_dir, client) = client(&[PEOPLE]);
    let mut client = client.with_options(ClientOptions::new().row_limit(2));
    for age in 0..5 {
        client.insert(&mut Person::new("x", age)).unwrap();
    }
    assert_eq!(client.to_list::<Person>(Select::new()).unwrap().len(), 2);
    assert_eq!(client.to_list::<Person>(Select::new().limit(4)).unwrap().len(), 4);
}

#[test]
fn dictionary_and_data_table() {
    let (_dir, mut client) = client(&[PEOPLE]);
    for (name, age) in [("Ann", 30), ("Bob", 17)] {
        client.insert(&mut Person::new(name, age)).unwrap();
    }

    let by_name: HashMap<String, Person> = client
        .to_dictionary(Select::new(), |p: &Person| p.name.clone())
        .unwrap();
    assert_eq!(by_name["Bob"].age, 17);

    let table = client.to_data_table::<Person>(Select::new().columns(["name"])).unwrap();
    assert_eq!(table.columns(), ["name"]);
    assert_eq!(table.len(), 2);
}

#[test]
fn raw_queries_accept_any_parameter_source() {
    let (_dir, mut client) = client(&[PEOPLE]);
    for (name, age) in [("Ann", 30), ("Bob", 17), ("Cid", 45)] {
        client.insert(&mut Person::new(name, age)).unwrap();
    }
    let text = "SELECT id, name, age FROM people WHERE age >= @min ORDER BY age";

    let by_macro: Vec<Person> = client.query(text, &params! { "min" => 18 }).unwrap();
    assert_eq!(by_macro.len(), 2);

    let by_pair: Vec<Person> = client.query(text, &Pair::new("MIN", 40)).unwrap();
    assert_eq!(by_pair[0].name, "Cid");

    let mut map = HashMap::new();
    map.insert("min".to_owned(), Value::Int(0));
    let by_map: Vec<Person> = client.query(text, &map).unwrap();
    assert_eq!(by_map.len(), 3);

    let names: Vec<String> = client
        .query("SELECT name FROM people WHERE age < @age", &Person::new("", 20))
        .unwrap();
    assert_eq!(names, ["Bob"]);
}

#[test]
fn scalars() {
    let (_dir, mut client) = client(&[PEOPLE]);
    client.insert(&mut Person::new("Ann", 30)).unwrap();

    let total: i64 = client.query_scalar("SELECT SUM(age) FROM people", &()).unwrap();
    assert_eq!(total, 30);

    let missing: Option<String> = client
        .query_scalar("SELECT name FROM people WHERE age > @age", &params! { "age" => 100 })
        .unwrap();
    assert!(missing.is_none());
}

#[test]
fn count_on_empty_table_is_zero() {
    let (_dir, mut client) = client(&[PEOPLE]);
    assert_eq!(client.count::<Person>(None).unwrap(), 0);
    assert_eq!(client.sum::<Person>("age", None).unwrap(), Value::Null);
    assert!(client.get_pages::<Person>(10, None).unwrap().is_empty());
    assert_eq!(client.get_pages_count::<Person>(10, None).unwrap(), 0);
}

#[test]
fn aggregates_and_pages() {
    let (_dir, mut client) = client(&[PEOPLE]);
    for age in [10, 20, 30, 40, 50, 60, 70] {
        client.insert(&mut Person::new("x", age)).unwrap();
    }

    assert_eq!(client.count::<Person>(Some(col("age").gt(30))).unwrap(), 4);
    assert_eq!(client.min::<Person>("age", None).unwrap(), Value::Int(10));
    assert_eq!(client.max::<Person>("age", None).unwrap(), Value::Int(70));
    assert_eq!(client.avg::<Person>("age", None).unwrap(), Value::Float(40.0));

    let aggs = client.get_aggs::<Person>(&["age", "id"], None).unwrap();
    assert_eq!(aggs["age"].count, 7);
    assert_eq!(aggs["age"].sum, Value::Int(280));
    assert_eq!(aggs["id"].min, Value::Int(1));

    let pages = client.get_pages::<Person>(3, None).unwrap();
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[&1], Pagination::new(3, 0));
    assert_eq!(pages[&2], Pagination::new(3, 3));
    assert_eq!(pages[&3], Pagination::new(1, 6));
    assert_eq!(client.get_pages_count::<Person>(3, Some(col("age").le(30))).unwrap(), 1);
}

#[test]
fn unknown_column_is_a_mapping_error() {
    let (_dir, mut client) = client(&[PEOPLE]);
    let err = client.sum::<Person>("salary", None).unwrap_err();
    assert!(matches!(err, Error::Mapping(MappingError::UnknownMember { .. })));
}

#[test]
fn driver_failures_carry_the_command() {
    let (_dir, mut client) = client(&[]);
    let err = client.count::<Person>(None).unwrap_err();
    let Error::Command(failure) = err else {
        panic!("expected a command error, got {err:?}");
    };
    assert!(failure.text.contains("\"people\""));
    assert!(!client.connection().state().is_open());
}

#[derive(Entity, Debug, Default, PartialEq)]
#[entity(table = "members", default)]
pub struct Member {
    #[key]
    pub code: String,

    #[column(name = "full_name")]
    pub name: String,

    #[column]
    pub active: bool,

    pub note: String
}

#[test]
fn explicit_keys_and_renamed_columns() {
    let (_dir, mut client) = client(&[
        "CREATE TABLE members (code TEXT PRIMARY KEY, full_name TEXT, active INTEGER, note TEXT)"
    ]);
    let mut ada = Member {
        code:   "A1".into(),
        name:   "Ada".into(),
        active: true,
        note:   "not stored".into()
    };

    assert_eq!(client.insert_columns(&mut ada, &["code", "name", "active"]).unwrap(), None);
    let stored = client.first::<Member>(col("code").eq("A1")).unwrap().unwrap();
    assert_eq!(stored.name, "Ada");
    assert!(stored.active);
    assert!(stored.note.is_empty());

    ada.active = false;
    client.update(&ada).unwrap();
    let note: Option<String> = client
        .query_scalar("SELECT note FROM members WHERE code = @code", &params! { "code" => "A1" })
        .unwrap();
    assert!(note.is_none());
    assert!(!client.first::<Member>(col("code").eq("A1")).unwrap().unwrap().active);
}

#[derive(Entity, Debug, PartialEq)]
#[entity(table = "pets")]
pub struct Pet {
    pub id:   i64,
    pub name: String
}

#[test]
fn objects_bind_without_prior_description() {
    let (_dir, mut client) = client(&["CREATE TABLE pets (id INTEGER PRIMARY KEY, name TEXT NOT NULL)"]);
    let rex = Pet {
        id:   0,
        name: "Rex".into()
    };

    assert_eq!(client.execute("INSERT INTO pets (name) VALUES (@name)", &rex).unwrap(), 1);
    let names: Vec<String> = client
        .query("SELECT name FROM pets WHERE name = @name", &rex)
        .unwrap();
    assert_eq!(names, ["Rex"]);
}

#[test]
fn tuples_bind_plain_values() {
    let (_dir, mut client) = client(&[PEOPLE]);
    for (name, age) in [("Ann", 30), ("Bob", 17)] {
        client.insert(&mut Person::new(name, age)).unwrap();
    }

    let adults: i64 = client
        .query_scalar("SELECT COUNT(*) FROM people WHERE age >= @age", &("age", 18_i64))
        .unwrap();
    assert_eq!(adults, 1);

    let bounds = vec![("low".to_owned(), 10_i64), ("high".to_owned(), 20_i64)];
    let teens: Vec<String> = client
        .query("SELECT name FROM people WHERE age BETWEEN @low AND @high", &bounds)
        .unwrap();
    assert_eq!(teens, ["Bob"]);
}
