//! Cross-node invalidation over Redis Pub/Sub: EVICT/CLEAR events from one
//! node invalidate the peer's L1 near-cache, JOIN/QUIT bookkeeping tracks
//! known peers, and self-echo never double-evicts. Requires a reachable
//! Redis at `REDIS_URL`.

mod common;
use common::test_data::User;
use common::*;
use std::time::Duration;

#[tokio::test]
async fn put_on_one_node_invalidates_peers_l1_copy() {
    let (node_a, node_b) = init_pair().await;
    let key = format!("u{}", rand::random::<u32>());
    let user = User::new(1);

    node_a.put("users", &key, &user).await.expect("put failed");
    let _: Option<User> = node_b.get("users", &key).await.expect("get failed");
    assert!(node_b.get_l1("users", &key).is_some());

    let updated = User::new(2);
    node_a
        .put("users", &key, &updated)
        .await
        .expect("put failed");

    let invalidated = wait_for(|| node_b.get_l1("users", &key).is_none(), 2_000).await;
    assert!(invalidated, "peer's L1 copy was not invalidated");

    let cached: Option<User> = node_b.get("users", &key).await.expect("get failed");
    assert_eq!(cached, Some(updated));

    node_a.shutdown().await.expect("shutdown failed");
    node_b.shutdown().await.expect("shutdown failed");
}

#[tokio::test]
async fn explicit_evict_on_one_node_propagates_to_peer() {
    let (node_a, node_b) = init_pair().await;
    let key = format!("u{}", rand::random::<u32>());
    let user = User::new(3);

    node_a.put("users", &key, &user).await.expect("put failed");
    let _: Option<User> = node_b.get("users", &key).await.expect("get failed");
    assert!(node_b.get_l1("users", &key).is_some());

    node_a
        .evict("users", &[key.clone()])
        .await
        .expect("evict failed");

    let invalidated = wait_for(|| node_b.get_l1("users", &key).is_none(), 2_000).await;
    assert!(invalidated, "peer's L1 copy was not invalidated by EVICT");

    node_a.shutdown().await.expect("shutdown failed");
    node_b.shutdown().await.expect("shutdown failed");
}

#[tokio::test]
async fn clear_on_one_node_empties_peers_region() {
    let (node_a, node_b) = init_pair().await;
    let region = unique_region("clearprop");

    for i in 0..5u64 {
        let key = format!("k{i}");
        node_a
            .put(&region, &key, &User::new(i))
            .await
            .expect("put failed");
        let _: Option<User> = node_b.get(&region, &key).await.expect("get failed");
    }
    assert_eq!(node_b.keys_l1(&region).len(), 5);

    node_a.clear(&region).await.expect("clear failed");

    let cleared = wait_for(|| node_b.keys_l1(&region).is_empty(), 2_000).await;
    assert!(cleared, "peer's L1 region was not cleared");

    node_a.shutdown().await.expect("shutdown failed");
    node_b.shutdown().await.expect("shutdown failed");
}

#[tokio::test]
async fn self_echo_does_not_double_evict_own_l1() {
    let manager = init_single().await;
    let key = format!("u{}", rand::random::<u32>());
    let user = User::new(4);

    manager.put("users", &key, &user).await.expect("put failed");
    // The node's own EVICT publish for this put must not bounce back and
    // remove its own fresh L1 entry — give the subscriber loop a window
    // to have processed any (wrongly) received self-echo, then assert
    // the entry is still the fresh one.
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(
        manager.get_l1("users", &key).is_some(),
        "self-published EVICT must not evict the node's own fresh L1 entry"
    );
    manager.shutdown().await.expect("shutdown failed");
}

#[tokio::test]
async fn join_and_quit_update_known_peers() {
    let (node_a, node_b) = init_pair().await;

    let joined = wait_for(
        || {
            node_a
                .known_peers()
                .contains(&node_b.sender_id().to_string())
        },
        2_000,
    )
    .await;
    assert!(joined, "node_a never observed node_b's JOIN");

    node_b.shutdown().await.expect("shutdown failed");

    let quit = wait_for(
        || {
            !node_a
                .known_peers()
                .contains(&node_b.sender_id().to_string())
        },
        2_000,
    )
    .await;
    assert!(quit, "node_a never observed node_b's QUIT");

    node_a.shutdown().await.expect("shutdown failed");
}
