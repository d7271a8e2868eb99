//! Notifications flowing through the watch task into the index.

mod common;

use std::collections::BTreeMap;
use std::thread;

use common::*;
use dnsname_resolver::index::IndexSnapshot;
use dnsname_resolver::{ApplyOutcome, Notification, Partition};
use serde_json::json;

fn entry(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(ns, obj)| (ns.to_string(), obj.to_string()))
        .collect()
}

#[tokio::test]
async fn add_then_delete_leaves_no_key() {
    let mut harness = Harness::new(&[TEAM_A]).await;
    harness.start_synced().await;
    let registration = reg(TEAM_A, "resolver-1", "svc.example.com");

    let outcome = harness.apply(Notification::added(&registration)).await;
    assert_eq!(outcome, ApplyOutcome::Applied);

    let mut expected = IndexSnapshot::default();
    expected
        .regular
        .insert("svc.example.com".into(), entry(&[(TEAM_A, "resolver-1")]));
    assert_eq!(harness.resolver.index().snapshot(), expected);

    let outcome = harness.apply(Notification::deleted(&registration)).await;
    assert_eq!(outcome, ApplyOutcome::Applied);
    assert_eq!(harness.resolver.index().snapshot(), IndexSnapshot::default());
}

#[tokio::test]
async fn duplicate_delivery_is_idempotent() {
    let mut harness = Harness::new(&[]).await;
    harness.start_synced().await;
    let registration = reg(TEAM_A, "resolver-1", "*.example.com.");

    harness.apply(Notification::added(&registration)).await;
    let once = harness.resolver.index().snapshot();
    assert_eq!(
        harness.apply(Notification::added(&registration)).await,
        ApplyOutcome::Unchanged
    );
    assert_eq!(harness.resolver.index().snapshot(), once);

    harness.apply(Notification::deleted(&registration)).await;
    assert_eq!(
        harness.apply(Notification::deleted(&registration)).await,
        ApplyOutcome::Stale
    );
    assert!(harness.resolver.index().is_empty());
}

#[tokio::test]
async fn conflicting_owner_is_ignored() {
    let mut harness = Harness::new(&[]).await;
    harness.start_synced().await;
    let first = reg("team-x", "a", "n.example.com.");
    let second = reg("team-x", "b", "n.example.com.");

    harness.apply(Notification::added(&first)).await;
    assert_eq!(
        harness.apply(Notification::added(&second)).await,
        ApplyOutcome::Conflict
    );
    assert_eq!(
        harness.apply(Notification::deleted(&second)).await,
        ApplyOutcome::Stale
    );

    let owners = harness
        .resolver
        .index()
        .owners(Partition::Regular, "n.example.com.")
        .unwrap();
    assert_eq!(owners["team-x"], "a");

    harness.apply(Notification::deleted(&first)).await;
    assert!(harness.resolver.index().is_empty());
}

#[tokio::test]
async fn delayed_delete_does_not_remove_new_owner() {
    let mut harness = Harness::new(&[]).await;
    harness.start_synced().await;
    let old = reg(TEAM_A, "resolver-old", "svc.example.com.");
    let new = reg(TEAM_A, "resolver-new", "svc.example.com.");

    harness.apply(Notification::added(&old)).await;
    harness.apply(Notification::deleted(&old)).await;
    harness.apply(Notification::added(&new)).await;
    // The old object's delete is redelivered late.
    assert_eq!(
        harness.apply(Notification::deleted(&old)).await,
        ApplyOutcome::Stale
    );

    let found = harness.resolver.index().lookup("svc.example.com.").unwrap();
    assert_eq!(found.owners[TEAM_A], "resolver-new");
}

#[tokio::test]
async fn unconfigured_namespace_and_malformed_payloads_are_dropped() {
    let mut harness = Harness::new(&[TEAM_A]).await;
    harness.start_synced().await;

    harness.send(Notification::added(&reg(TEAM_B, "x", "*.example.com.")));
    harness.send(Notification::added(&reg(TEAM_B, "x", "www.example.com.")));
    harness.send(Notification::Added {
        object: json!({"metadata": {"name": "broken"}}),
    });
    harness.send(Notification::Deleted { object: json!([]) });

    // The observer only sees in-scope events, so this one marks the point
    // where every earlier notification has been handled.
    let marker = reg(TEAM_A, "marker", "marker.example.com.");
    assert_eq!(
        harness.apply(Notification::added(&marker)).await,
        ApplyOutcome::Applied
    );

    let snapshot = harness.resolver.index().snapshot();
    assert!(snapshot.wildcard.is_empty());
    assert_eq!(
        snapshot.regular.keys().collect::<Vec<_>>(),
        vec!["marker.example.com."]
    );
}

#[tokio::test]
async fn update_with_same_name_keeps_index() {
    let mut harness = Harness::new(&[]).await;
    harness.start_synced().await;
    let registration = reg(TEAM_A, "resolver-1", "svc.example.com.");

    harness.apply(Notification::added(&registration)).await;
    assert_eq!(
        harness
            .apply(Notification::updated(&registration, &registration))
            .await,
        ApplyOutcome::Unchanged
    );
    assert!(harness.resolver.index().lookup("svc.example.com.").is_some());
}

#[tokio::test]
async fn shared_name_across_namespaces() {
    let mut harness = Harness::new(&[]).await;
    harness.start_synced().await;

    harness
        .apply(Notification::added(&reg(TEAM_A, "a", "*.example.com.")))
        .await;
    harness
        .apply(Notification::added(&reg(TEAM_B, "b", "*.example.com.")))
        .await;
    harness
        .apply(Notification::added(&reg(TEAM_B, "c", "www.example.com.")))
        .await;

    let matches = harness.resolver.index().matches("www.example.com.");
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].partition, Partition::Regular);
    assert_eq!(matches[1].owners.len(), 2);

    harness
        .apply(Notification::deleted(&reg(TEAM_A, "a", "*.example.com.")))
        .await;
    let wildcard = harness
        .resolver
        .index()
        .owners(Partition::Wildcard, "*.example.com.")
        .unwrap();
    assert_eq!(wildcard.len(), 1);
    assert_eq!(wildcard[TEAM_B], "b");
}

#[tokio::test]
async fn concurrent_readers_see_consistent_entries() {
    let mut harness = Harness::new(&[]).await;
    harness.start_synced().await;

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let index = harness.resolver.index().clone();
            thread::spawn(move || {
                for _ in 0..1_000 {
                    for found in index.matches("a.svc.example.com.") {
                        // A key is never visible without an owner.
                        assert!(!found.owners.is_empty());
                    }
                }
            })
        })
        .collect();

    for i in 0..50 {
        let registration = reg(TEAM_A, &format!("resolver-{i}"), "*.svc.example.com.");
        harness.apply(Notification::added(&registration)).await;
        harness.apply(Notification::deleted(&registration)).await;
    }

    for reader in readers {
        reader.join().unwrap();
    }
    assert!(harness.resolver.index().is_empty());
}
