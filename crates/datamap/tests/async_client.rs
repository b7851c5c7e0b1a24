// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Non-blocking client surface.

mod common;

use common::{PEOPLE, Person, client};
use datamap::{AsyncConnection, Pagination, Select, Value, col, params};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn crud_round_trip() {
    let (_dir, mut client) = client(&[PEOPLE]);
    let cancel = CancellationToken::new();

    let mut ann = Person::new("Ann", 30);
    let identity = client.insert_async(&mut ann, &cancel).await.unwrap();
    assert_eq!(identity, Some(Value::Int(ann.id)));

    ann.age = 31;
    assert_eq!(client.update_async(&ann, &cancel).await.unwrap(), 1);
    let found = client.first_async::<Person>(col("id").eq(ann.id), &cancel).await.unwrap();
    assert_eq!(found, Some(ann.clone()));

    assert_eq!(client.delete_async(&ann, &cancel).await.unwrap(), 1);
    assert_eq!(client.count_async::<Person>(None, &cancel).await.unwrap(), 0);
    assert!(!client.connection().state_async().is_open());
}

#[tokio::test]
async fn matches_the_blocking_surface() {
    let (_dir, mut client) = client(&[PEOPLE]);
    let cancel = CancellationToken::new();
    let mut people = vec![Person::new("Ann", 30), Person::new("Bob", 17), Person::new("Cid", 45)];
    assert_eq!(client.insert_range_async(&mut people, None, &cancel).await.unwrap(), 3);

    let listed = client.to_list_async::<Person>(Select::new(), &cancel).await.unwrap();
    assert_eq!(listed, client.to_list::<Person>(Select::new()).unwrap());

    let names: Vec<String> = client
        .query_async("SELECT name FROM people WHERE age > @age ORDER BY age", &params! { "age" => 18 }, &cancel)
        .await
        .unwrap();
    assert_eq!(names, ["Ann", "Cid"]);

    let oldest: i64 = client
        .query_scalar_async("SELECT MAX(age) FROM people", &(), &cancel)
        .await
        .unwrap();
    assert_eq!(oldest, 45);

    let aggs = client.get_aggs_async::<Person>(&["age"], None, &cancel).await.unwrap();
    assert_eq!(aggs, client.get_aggs::<Person>(&["age"], None).unwrap());

    let pages = client.get_pages_async::<Person>(2, None, &cancel).await.unwrap();
    assert_eq!(pages[&2], Pagination::new(1, 2));
    assert_eq!(client.get_pages_count_async::<Person>(2, None, &cancel).await.unwrap(), 2);

    let removed = client
        .delete_where_async::<Person>(col("age").lt(18), &cancel)
        .await
        .unwrap();
    assert_eq!(removed, 1);
}

#[tokio::test]
async fn transactions_roll_back() {
    let (_dir, mut client) = client(&[PEOPLE]);
    let cancel = CancellationToken::new();

    let tx = client.begin_transaction_async(&cancel).await.unwrap();
    client
        .insert_range_async(&mut [Person::new("Ann", 30)], Some(&tx), &cancel)
        .await
        .unwrap();
    assert_eq!(client.count_async::<Person>(None, &cancel).await.unwrap(), 1);
    client.rollback_async(tx).await.unwrap();

    assert_eq!(client.count_async::<Person>(None, &cancel).await.unwrap(), 0);
}

#[tokio::test]
async fn cancelled_before_start() {
    let (_dir, mut client) = client(&[PEOPLE]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client.to_list_async::<Person>(Select::new(), &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    let err = client.insert_async(&mut Person::new("Ann", 30), &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(client.begin_transaction_async(&cancel).await.unwrap_err().is_cancelled());
    assert!(!client.in_transaction());
    assert!(!client.connection().state_async().is_open());

    assert_eq!(client.count::<Person>(None).unwrap(), 0);
}

#[tokio::test]
async fn cancellation_inside_a_range_rolls_back() {
    let (_dir, mut client) = client(&[PEOPLE]);
    let live = CancellationToken::new();
    let tx = client.begin_transaction_async(&live).await.unwrap();
    client
        .insert_range_async(&mut [Person::new("Ann", 30)], Some(&tx), &live)
        .await
        .unwrap();

    let stopped = CancellationToken::new();
    stopped.cancel();
    let err = client
        .insert_range_async(&mut [Person::new("Bob", 17)], Some(&tx), &stopped)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(!client.in_transaction());
    assert_eq!(client.count_async::<Person>(None, &live).await.unwrap(), 0);
}
