#![allow(clippy::unwrap_used)]
// Integration tests for `CatalogBrowser` and its load queue, against a
// wiremock catalog.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use audtek_api::{CatalogClient, Credentials, Session};
use audtek_core::{
    BrowserConfig, CatalogBrowser, CoreError, LoadStatus, NodeId, NodeKind, StaticCollection,
    TreeEvent,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup(page_size: u32) -> (MockServer, CatalogBrowser) {
    let server = MockServer::start().await;
    let client = CatalogClient::from_reqwest(
        &server.uri(),
        reqwest::Client::new(),
        Credentials::new("reader@example.com", "pw".to_string(), "device-1"),
    )
    .unwrap();
    client.session().restore(Session {
        token: "tok-1".into(),
        refresh_id: "ref-1".into(),
        device_id: "device-1".into(),
        expires_at: Utc::now() + chrono::Duration::hours(1),
    });
    let browser = CatalogBrowser::with_config(
        client,
        BrowserConfig {
            page_size,
            ..BrowserConfig::default()
        },
    );
    (server, browser)
}

fn titles(total: u64, ids: &[&str]) -> Value {
    let items: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "id": id, "name": format!("Title {id}") }))
        .collect();
    json!({ "total": total, "_embedded": { "app:product": items } })
}

fn tracks(ids: &[u64]) -> Value {
    let items: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "id": id, "title": format!("Track {id}") }))
        .collect();
    json!({ "total": ids.len(), "_embedded": { "app:track": items } })
}

fn ok(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

/// Expand the root and return the id of one of its containers.
async fn container(browser: &CatalogBrowser, collection: StaticCollection) -> NodeId {
    let root = browser.root();
    browser.expand(root).unwrap().wait().await.unwrap();
    browser
        .children(root)
        .unwrap()
        .into_iter()
        .find(|node| node.kind == NodeKind::StaticContainer(collection))
        .unwrap()
        .id
}

async fn next_event(events: &mut broadcast::Receiver<TreeEvent>) -> TreeEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap()
}

fn child_paths(browser: &CatalogBrowser, id: NodeId) -> Vec<String> {
    browser
        .children(id)
        .unwrap()
        .into_iter()
        .map(|node| node.path)
        .collect()
}

// ── Root and containers ─────────────────────────────────────────────

#[tokio::test]
async fn test_root_expands_to_static_containers_without_requests() {
    let (server, browser) = setup(100).await;
    let root = browser.root();

    assert_eq!(browser.node(root).unwrap().status, LoadStatus::NotLoaded);
    browser.expand(root).unwrap().wait().await.unwrap();

    assert_eq!(child_paths(&browser, root), ["shelf", "favourites", "categories"]);
    assert!(browser.node(root).unwrap().is_loaded());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_container_children_keep_service_order() {
    let (server, browser) = setup(100).await;
    mount(&server, "/me/shelf", ok(titles(3, &["b-3", "b-1", "b-2"])), 1).await;

    let shelf = container(&browser, StaticCollection::Shelf).await;
    browser.expand(shelf).unwrap().wait().await.unwrap();

    assert_eq!(child_paths(&browser, shelf), ["b-3", "b-1", "b-2"]);
    let first = &browser.children(shelf).unwrap()[0];
    assert_eq!(first.name, "Title b-3");
    assert_eq!(first.parent, Some(shelf));
    assert!(first.is_container());
    assert_eq!(browser.path_of(first.id).unwrap(), "/shelf/b-3");
}

#[tokio::test]
async fn test_empty_container_loads_with_no_children() {
    let (server, browser) = setup(100).await;
    mount(&server, "/me/favourites", ok(json!({ "total": 0 })), 1).await;

    let favourites = container(&browser, StaticCollection::Favourites).await;
    let mut events = browser.subscribe();
    browser.expand(favourites).unwrap().wait().await.unwrap();

    let node = browser.node(favourites).unwrap();
    assert!(node.is_loaded());
    assert!(node.children.is_empty());
    assert_eq!(
        next_event(&mut events).await,
        TreeEvent::ChildrenChanged {
            node: favourites,
            children: vec![],
        }
    );
}

#[tokio::test]
async fn test_loaded_node_is_not_fetched_again() {
    let (server, browser) = setup(100).await;
    mount(&server, "/me/shelf", ok(titles(1, &["b-1"])), 1).await;

    let shelf = container(&browser, StaticCollection::Shelf).await;
    browser.expand(shelf).unwrap().wait().await.unwrap();

    let again = browser.expand(shelf).unwrap();
    assert!(again.is_ready());
    again.wait().await.unwrap();
}

// ── Single flight ───────────────────────────────────────────────────

#[tokio::test]
async fn test_double_expand_fetches_and_notifies_once() {
    let (server, browser) = setup(100).await;
    mount(
        &server,
        "/me/shelf",
        ok(titles(2, &["b-1", "b-2"])).set_delay(Duration::from_millis(100)),
        1,
    )
    .await;

    let shelf = container(&browser, StaticCollection::Shelf).await;
    let mut events = browser.subscribe();

    let first = browser.expand(shelf).unwrap();
    let second = browser.expand(shelf).unwrap();
    assert_eq!(browser.node(shelf).unwrap().status, LoadStatus::Pending);
    first.wait().await.unwrap();
    second.wait().await.unwrap();

    let event = next_event(&mut events).await;
    assert!(matches!(event, TreeEvent::ChildrenChanged { node, ref children } if node == shelf && children.len() == 2));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(matches!(
        events.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn test_reload_replaces_children_wholesale() {
    let (server, browser) = setup(100).await;
    Mock::given(method("GET"))
        .and(path("/me/shelf"))
        .respond_with(ok(titles(3, &["b-1", "b-2", "b-3"])))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    mount(&server, "/me/shelf", ok(titles(2, &["b-2", "b-4"])), 1).await;

    let shelf = container(&browser, StaticCollection::Shelf).await;
    browser.expand(shelf).unwrap().wait().await.unwrap();
    let old = browser.children(shelf).unwrap();
    assert_eq!(old.len(), 3);

    browser.reload(shelf).unwrap().wait().await.unwrap();

    assert_eq!(child_paths(&browser, shelf), ["b-2", "b-4"]);
    for node in old {
        assert_eq!(
            browser.node(node.id).unwrap_err(),
            CoreError::NodeNotFound { id: node.id }
        );
    }
}

#[tokio::test]
async fn test_reload_of_pending_node_joins_it() {
    let (server, browser) = setup(100).await;
    mount(
        &server,
        "/me/shelf",
        ok(titles(1, &["b-1"])).set_delay(Duration::from_millis(100)),
        1,
    )
    .await;

    let shelf = container(&browser, StaticCollection::Shelf).await;
    let first = browser.expand(shelf).unwrap();
    let reload = browser.reload(shelf).unwrap();
    first.wait().await.unwrap();
    reload.wait().await.unwrap();
    assert_eq!(child_paths(&browser, shelf), ["b-1"]);
}

#[tokio::test]
async fn test_reload_detaches_pending_descendants() {
    let (server, browser) = setup(100).await;
    mount(&server, "/me/shelf", ok(titles(1, &["b-1"])), 2).await;
    mount(
        &server,
        "/audiobooks/b-1/tracks",
        ok(tracks(&[1, 2])).set_delay(Duration::from_millis(200)),
        1,
    )
    .await;

    let shelf = container(&browser, StaticCollection::Shelf).await;
    browser.expand(shelf).unwrap().wait().await.unwrap();
    let title = browser.children(shelf).unwrap()[0].id;

    let tracks = browser.expand(title).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let reload = browser.reload(shelf).unwrap();

    assert_eq!(
        tracks.wait().await.unwrap_err(),
        CoreError::NodeDetached { id: title }
    );
    reload.wait().await.unwrap();
    let fresh = browser.children(shelf).unwrap();
    assert_eq!(fresh.len(), 1);
    assert_ne!(fresh[0].id, title);
    assert_eq!(fresh[0].status, LoadStatus::NotLoaded);
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_failed_expansion_is_reported_and_worker_survives() {
    let (server, browser) = setup(100).await;
    mount(
        &server,
        "/me/favourites",
        ResponseTemplate::new(500).set_body_string("boom"),
        1,
    )
    .await;
    mount(&server, "/me/shelf", ok(titles(1, &["b-1"])), 1).await;

    let favourites = container(&browser, StaticCollection::Favourites).await;
    let shelf = container(&browser, StaticCollection::Shelf).await;
    let mut events = browser.subscribe();

    let err = browser.expand(favourites).unwrap().wait().await.unwrap_err();
    assert!(matches!(err, CoreError::Api { status: 500, .. }), "got {err:?}");

    let event = next_event(&mut events).await;
    assert_eq!(event.node(), favourites);
    assert!(matches!(event, TreeEvent::ExpansionFailed { .. }));

    let node = browser.node(favourites).unwrap();
    assert_eq!(node.status, LoadStatus::NotLoaded);
    assert!(node.children.is_empty());

    browser.expand(shelf).unwrap().wait().await.unwrap();
    assert_eq!(child_paths(&browser, shelf), ["b-1"]);
}

#[tokio::test]
async fn test_unknown_node_is_rejected() {
    let (_server, browser) = setup(100).await;
    let root = browser.root();
    browser.expand(root).unwrap().wait().await.unwrap();
    let shelf = browser.children(root).unwrap()[0].id;
    browser.reload(root).unwrap().wait().await.unwrap();

    assert_eq!(
        browser.expand(shelf).unwrap_err(),
        CoreError::NodeNotFound { id: shelf }
    );
}

// ── Cancellation ────────────────────────────────────────────────────

#[tokio::test]
async fn test_cancel_finishes_in_flight_and_drops_queued() {
    let (server, browser) = setup(100).await;
    mount(
        &server,
        "/me/shelf",
        ok(titles(2, &["b-1", "b-2"])).set_delay(Duration::from_millis(300)),
        1,
    )
    .await;
    mount(&server, "/me/favourites", ok(titles(0, &[])), 0).await;

    let shelf = container(&browser, StaticCollection::Shelf).await;
    let favourites = container(&browser, StaticCollection::Favourites).await;
    let mut events = browser.subscribe();

    let a = browser.expand(shelf).unwrap();
    let b = browser.expand(favourites).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    browser.cancel();

    a.wait().await.unwrap();
    assert_eq!(child_paths(&browser, shelf), ["b-1", "b-2"]);
    assert_eq!(next_event(&mut events).await.node(), shelf);

    assert_eq!(b.wait().await.unwrap_err(), CoreError::Cancelled);
    assert_eq!(
        browser.node(favourites).unwrap().status,
        LoadStatus::NotLoaded
    );
    assert!(browser.is_cancelled());
    assert_eq!(
        browser.expand(favourites).unwrap_err(),
        CoreError::QueueClosed
    );
}

#[tokio::test]
async fn test_cancel_between_pages_leaves_children_unset() {
    let (server, browser) = setup(2).await;
    Mock::given(method("GET"))
        .and(path("/me/shelf"))
        .and(query_param("page", "1"))
        .respond_with(ok(titles(4, &["b-1", "b-2"])).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me/shelf"))
        .and(query_param("page", "2"))
        .respond_with(ok(titles(4, &["b-3", "b-4"])))
        .expect(0)
        .mount(&server)
        .await;

    let shelf = container(&browser, StaticCollection::Shelf).await;
    let expansion = browser.expand(shelf).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    browser.cancel();

    assert_eq!(expansion.wait().await.unwrap_err(), CoreError::Cancelled);
    let node = browser.node(shelf).unwrap();
    assert_eq!(node.status, LoadStatus::NotLoaded);
    assert!(node.children.is_empty());
}

#[tokio::test]
async fn test_restart_reopens_the_queue() {
    let (server, browser) = setup(100).await;
    mount(&server, "/me/shelf", ok(titles(1, &["b-1"])), 1).await;

    let shelf = container(&browser, StaticCollection::Shelf).await;
    browser.cancel();
    assert_eq!(browser.expand(shelf).unwrap_err(), CoreError::QueueClosed);

    browser.restart();
    assert!(!browser.is_cancelled());
    browser.expand(shelf).unwrap().wait().await.unwrap();
    assert_eq!(child_paths(&browser, shelf), ["b-1"]);
}

#[tokio::test]
async fn test_result_from_cancelled_queue_is_not_published_after_restart() {
    let (server, browser) = setup(100).await;
    // The cancelled worker's fetch lands first, the restarted queue's later.
    Mock::given(method("GET"))
        .and(path("/me/shelf"))
        .respond_with(ok(titles(1, &["old-1"])).set_delay(Duration::from_millis(200)))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount(
        &server,
        "/me/shelf",
        ok(titles(2, &["b-1", "b-2"])).set_delay(Duration::from_millis(500)),
        1,
    )
    .await;

    let shelf = container(&browser, StaticCollection::Shelf).await;
    let stale = browser.expand(shelf).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    browser.cancel();
    browser.restart();
    let fresh = browser.reload(shelf).unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(browser.node(shelf).unwrap().status, LoadStatus::Pending);
    assert!(browser.children(shelf).unwrap().is_empty());

    fresh.wait().await.unwrap();
    stale.wait().await.unwrap();
    assert_eq!(child_paths(&browser, shelf), ["b-1", "b-2"]);
}

#[tokio::test]
async fn test_reload_all_restarts_and_rebuilds_the_tree() {
    let (_server, browser) = setup(100).await;
    let root = browser.root();
    browser.expand(root).unwrap().wait().await.unwrap();
    let before = browser.children(root).unwrap();
    browser.cancel();

    browser.reload_all().unwrap().wait().await.unwrap();

    let after = browser.children(root).unwrap();
    assert_eq!(after.len(), 3);
    assert!(after.iter().all(|node| before.iter().all(|old| old.id != node.id)));
}

// ── Leaves, paths and detail ────────────────────────────────────────

#[tokio::test]
async fn test_tracks_are_leaves() {
    let (server, browser) = setup(100).await;
    mount(&server, "/me/shelf", ok(titles(1, &["b-1"])), 1).await;
    mount(&server, "/audiobooks/b-1/tracks", ok(tracks(&[10, 11])), 1).await;

    let title = browser.resolve("/shelf/b-1").await.unwrap();
    browser.expand(title).unwrap().wait().await.unwrap();
    let track = browser.children(title).unwrap()[0].clone();
    assert_eq!(track.path, "10");
    assert!(!track.is_container());

    let expansion = browser.expand(track.id).unwrap();
    assert!(expansion.is_ready());
    expansion.wait().await.unwrap();
    assert!(browser.children(track.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_resolve_walks_and_reports_missing_segments() {
    let (server, browser) = setup(100).await;
    mount(&server, "/me/shelf", ok(titles(2, &["b-1", "b-2"])), 1).await;

    let id = browser.resolve("/shelf/b-2").await.unwrap();
    assert_eq!(browser.path_of(id).unwrap(), "/shelf/b-2");
    assert_eq!(browser.resolve("/").await.unwrap(), browser.root());

    assert_eq!(
        browser.resolve("/shelf/b-9").await.unwrap_err(),
        CoreError::PathNotFound {
            path: "/shelf/b-9".into()
        }
    );
}

#[tokio::test]
async fn test_detail_is_fetched_once_for_concurrent_callers() {
    let (server, browser) = setup(100).await;
    mount(&server, "/me/shelf", ok(titles(1, &["b-1"])), 1).await;
    mount(
        &server,
        "/audiobooks/b-1",
        ok(json!({ "id": "b-1", "name": "Title b-1", "description": "long" }))
            .set_delay(Duration::from_millis(100)),
        1,
    )
    .await;

    let title = browser.resolve("/shelf/b-1").await.unwrap();
    let (a, b) = tokio::join!(browser.detail(title), browser.detail(title));
    let a = a.unwrap();
    assert!(Arc::ptr_eq(&a, &b.unwrap()));
    assert_eq!(a["description"], "long");

    let cached = browser.detail(title).await.unwrap();
    assert!(Arc::ptr_eq(&a, &cached));
}

#[tokio::test]
async fn test_detail_runs_outside_a_cancelled_queue() {
    let (server, browser) = setup(100).await;
    mount(&server, "/me/shelf", ok(titles(1, &["b-1"])), 1).await;
    mount(&server, "/audiobooks/b-1", ok(json!({ "id": "b-1", "name": "Title b-1" })), 1).await;

    let title = browser.resolve("/shelf/b-1").await.unwrap();
    browser.cancel();

    assert_eq!(browser.detail(title).await.unwrap()["id"], "b-1");
    assert_eq!(browser.expand(title).unwrap_err(), CoreError::QueueClosed);
}

#[tokio::test]
async fn test_failed_detail_is_retried() {
    let (server, browser) = setup(100).await;
    mount(&server, "/me/shelf", ok(titles(1, &["b-1"])), 1).await;
    Mock::given(method("GET"))
        .and(path("/audiobooks/b-1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    mount(&server, "/audiobooks/b-1", ok(json!({ "id": "b-1" })), 1).await;

    let title = browser.resolve("/shelf/b-1").await.unwrap();
    assert!(browser.detail(title).await.is_err());
    assert_eq!(browser.detail(title).await.unwrap()["id"], "b-1");
}

#[tokio::test]
async fn test_detail_of_other_records_is_their_summary() {
    let (server, browser) = setup(100).await;
    mount(&server, "/me/shelf", ok(titles(1, &["b-1"])), 1).await;
    mount(&server, "/audiobooks/b-1/tracks", ok(tracks(&[7])), 1).await;

    let track = browser.resolve("/shelf/b-1/7").await.unwrap();
    let detail = browser.detail(track).await.unwrap();
    assert_eq!(detail["title"], "Track 7");

    let root = browser.root();
    assert_eq!(
        browser.detail(root).await.unwrap_err(),
        CoreError::NoRecord { id: root }
    );
}
