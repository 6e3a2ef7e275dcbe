//! Two real nodes on ephemeral ports replicating over HTTP

use node_server::core::serve;
use node_server::{Config, ServerState};
use serde_json::{Value, json};
use shared::NodeStatus;
use shared::replication::MAX_SYNC_BATCH_ENTRIES;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Node {
    url: String,
    state: ServerState,
    handle: JoinHandle<node_server::core::Result<()>>,
    _dir: tempfile::TempDir,
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    (listener, url)
}

fn start(node_id: &str, listener: TcpListener, url: String, peers: &[&str], shutdown: &CancellationToken) -> Node {
    let dir = tempfile::tempdir().unwrap();
    let port = listener.local_addr().unwrap().port();
    let mut config = Config::with_overrides(node_id, dir.path().to_string_lossy(), port, peers);
    config.probe_timeout_ms = 1000;
    config.replication_timeout_ms = 30_000;

    let state = ServerState::initialize(&config).unwrap();
    let handle = tokio::spawn(serve(listener, state.clone(), shutdown.clone()));

    Node {
        url,
        state,
        handle,
        _dir: dir,
    }
}

async fn get(client: &reqwest::Client, url: String) -> Value {
    client.get(url).send().await.unwrap().json().await.unwrap()
}

async fn replicate(client: &reqwest::Client, node: &Node) -> Value {
    client
        .post(format!("{}/api/replication/replicate", node.url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_mutation_replicates_to_peer() {
    let shutdown = CancellationToken::new();
    let (la, url_a) = bind().await;
    let (lb, url_b) = bind().await;
    let a = start("nodo1", la, url_a.clone(), &[url_b.as_str()], &shutdown);
    let b = start("nodo2", lb, url_b.clone(), &[url_a.as_str()], &shutdown);
    let client = reqwest::Client::new();

    a.state
        .mutations
        .insert("clientes", 7, json!({"nombre": "Ana", "telefono": null}))
        .unwrap();

    let body = replicate(&client, &a).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["logs_replicated"], 1);
    assert_eq!(body["results"][0]["peer"], url_b.as_str());
    assert_eq!(body["results"][0]["status"], "success");

    assert_eq!(
        b.state.mutations.get("clientes", 7).unwrap(),
        Some(json!({"nombre": "Ana", "telefono": null}))
    );
    // the receiver does not re-log, so nothing bounces back
    assert!(b.state.oplog.fetch_pending().unwrap().is_empty());
    assert!(a.state.oplog.fetch_pending().unwrap().is_empty());

    // replicating again sends nothing
    let body = replicate(&client, &a).await;
    assert_eq!(body["message"], "No pending logs to replicate");

    shutdown.cancel();
}

#[tokio::test]
async fn test_probe_and_liveness_over_http() {
    let shutdown = CancellationToken::new();
    let (la, url_a) = bind().await;
    let (lb, url_b) = bind().await;
    let a = start("nodo1", la, url_a.clone(), &[url_b.as_str()], &shutdown);
    let _b = start("nodo2", lb, url_b.clone(), &[url_a.as_str()], &shutdown);
    let client = reqwest::Client::new();

    let ping = get(&client, format!("{url_b}/api/health/ping")).await;
    assert_eq!(ping, json!({"success": true, "message": "pong", "node": "nodo2"}));

    let replicas = get(&client, format!("{}/api/health/replicas", a.url)).await;
    assert_eq!(replicas["replicas"][0]["status"], "active");
    assert_eq!(replicas["replicas"][0]["node"], "nodo2");

    assert_eq!(a.state.peers.select_peer().await, Some(url_b.clone()));
    assert!(a.state.liveness.active_nodes().unwrap().contains("nodo2"));

    get(&client, format!("{}/api/health", a.url)).await;
    let nodes = get(&client, format!("{}/api/health/nodes", a.url)).await;
    assert_eq!(nodes["total_active"], 2);

    shutdown.cancel();
}

#[tokio::test]
async fn test_unreachable_peer_still_marks_propagated() {
    let shutdown = CancellationToken::new();
    let (la, url_a) = bind().await;
    // bound then dropped: nothing listens there
    let (dead, url_dead) = bind().await;
    drop(dead);
    let a = start("nodo1", la, url_a, &[url_dead.as_str()], &shutdown);
    let client = reqwest::Client::new();

    a.state
        .mutations
        .insert("pedidos", 1, json!({"total": 25.5}))
        .unwrap();

    let body = replicate(&client, &a).await;
    assert_eq!(body["logs_replicated"], 1);
    assert_eq!(body["results"][0]["status"], "failure");
    assert!(body["results"][0]["error"].is_string());
    assert!(a.state.oplog.fetch_pending().unwrap().is_empty());

    assert_eq!(a.state.peers.select_peer().await, None);

    shutdown.cancel();
}

#[tokio::test]
async fn test_backlog_above_batch_limit_reaches_peer() {
    let shutdown = CancellationToken::new();
    let (la, url_a) = bind().await;
    let (lb, url_b) = bind().await;
    let a = start("nodo1", la, url_a.clone(), &[url_b.as_str()], &shutdown);
    let b = start("nodo2", lb, url_b.clone(), &[url_a.as_str()], &shutdown);
    let client = reqwest::Client::new();

    let total = MAX_SYNC_BATCH_ENTRIES + 1;
    for i in 0..total {
        a.state
            .mutations
            .insert("clientes", i as i64, json!({"nombre": format!("cliente {i}")}))
            .unwrap();
    }

    let body = replicate(&client, &a).await;
    assert_eq!(body["logs_replicated"], total);
    assert_eq!(body["results"][0]["status"], "success");

    assert_eq!(b.state.mutations.list("clientes").unwrap().len(), total);
    assert_eq!(
        b.state.mutations.get("clientes", total as i64 - 1).unwrap(),
        Some(json!({"nombre": format!("cliente {}", total - 1)}))
    );
    assert!(a.state.oplog.fetch_pending().unwrap().is_empty());

    shutdown.cancel();
}

#[tokio::test]
async fn test_shutdown_marks_node_inactive() {
    let shutdown = CancellationToken::new();
    let (la, url_a) = bind().await;
    let a = start("nodo1", la, url_a, &[], &shutdown);
    let client = reqwest::Client::new();

    get(&client, format!("{}/api/health", a.url)).await;
    assert!(a.state.liveness.active_nodes().unwrap().contains("nodo1"));

    drop(client);
    shutdown.cancel();
    a.handle.await.unwrap().unwrap();

    let row = a.state.liveness.lookup("nodo1").unwrap().unwrap();
    assert_eq!(row.status, NodeStatus::Inactive);
    assert!(a.state.liveness.active_nodes().unwrap().is_empty());
}
