use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use ybf_db::Database;
use ybf_types::admin::AdminAction;
use ybf_types::events::{FeedCommand, FeedEvent};
use ybf_types::query::{Filter, ListQuery, OrderBy, QueryError, Table};

use crate::dispatcher::Dispatcher;
use crate::live::LiveCollection;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

const MAX_SUBSCRIPTIONS: usize = 32;

/// Resolves an admin session token to the scope it grants.
pub trait TokenVerifier: Send + Sync + 'static {
    fn scope(&self, token: &str) -> Option<AdminAction>;
}

/// Handle one realtime WebSocket. Clients subscribe to live lists and get a
/// full snapshot each time the list changes.
pub async fn handle_connection(
    socket: WebSocket,
    db: Arc<Database>,
    dispatcher: Dispatcher,
    verifier: Arc<dyn TokenVerifier>,
) {
    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<FeedEvent>();

    info!("Realtime client connected");

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = out_rx.recv() => {
                    let Some(event) = event else { break };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to serialize feed event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        let mut subscriptions = Subscriptions::default();

        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<FeedCommand>(&text) {
                    Ok(cmd) => {
                        handle_command(cmd, &db, &dispatcher, verifier.as_ref(), &out_tx, &mut subscriptions)
                            .await;
                    }
                    Err(e) => {
                        warn!("Bad realtime command: {} -- raw: {}", e, preview(&text, 200));
                        let _ = out_tx.send(FeedEvent::Error {
                            id: None,
                            message: format!("invalid command: {}", e),
                        });
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("Realtime client disconnected");
}

async fn handle_command(
    cmd: FeedCommand,
    db: &Arc<Database>,
    dispatcher: &Dispatcher,
    verifier: &dyn TokenVerifier,
    out: &mpsc::UnboundedSender<FeedEvent>,
    subscriptions: &mut Subscriptions,
) {
    match cmd {
        FeedCommand::Subscribe {
            id,
            table,
            filter,
            order,
            token,
        } => {
            if !subscriptions.contains(&id) && subscriptions.len() >= MAX_SUBSCRIPTIONS {
                send_error(out, &id, "too many subscriptions");
                return;
            }

            let query = match build_query(&table, filter.as_deref(), order.as_deref(), token.as_deref(), verifier) {
                Ok(query) => query,
                Err(message) => {
                    send_error(out, &id, &message);
                    return;
                }
            };

            let live = match LiveCollection::open(db.clone(), dispatcher, query).await {
                Ok(live) => live,
                Err(e) => {
                    warn!("Subscription {} failed to open: {}", id, e);
                    send_error(out, &id, "failed to load list");
                    return;
                }
            };

            debug!("Subscription {} opened on {}", id, table);
            let forwarder = tokio::spawn(forward_snapshots(id.clone(), live, out.clone()));
            subscriptions.insert(id, forwarder);
        }
        FeedCommand::Unsubscribe { id } => {
            if subscriptions.remove(&id) {
                debug!("Subscription {} closed", id);
            }
        }
    }
}

/// Send the current list, then again after every refetch.
async fn forward_snapshots(id: String, mut live: LiveCollection, out: mpsc::UnboundedSender<FeedEvent>) {
    let mut rows = live.snapshot();
    loop {
        let event = FeedEvent::Snapshot {
            id: id.clone(),
            rows: rows.as_ref().clone(),
        };
        if out.send(event).is_err() {
            break;
        }
        match live.changed().await {
            Some(next) => rows = next,
            None => break,
        }
    }
}

/// At most `max_chars` characters of client text, cut on a char boundary.
fn preview(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map_or(text, |(i, _)| &text[..i])
}

fn send_error(out: &mpsc::UnboundedSender<FeedEvent>, id: &str, message: &str) {
    let _ = out.send(FeedEvent::Error {
        id: Some(id.to_string()),
        message: message.to_string(),
    });
}

/// Turn a subscribe request into a validated query. Private tables need a
/// token for their read scope; public readers of filtered tables get the
/// public filter forced on.
pub fn build_query(
    table: &str,
    filter: Option<&str>,
    order: Option<&str>,
    token: Option<&str>,
    verifier: &dyn TokenVerifier,
) -> Result<ListQuery, String> {
    let table: Table = table.parse().map_err(|e: QueryError| e.to_string())?;

    let mut privileged = false;
    if let Some(required) = table.read_scope() {
        let granted = token.and_then(|t| verifier.scope(t));
        if granted != Some(required) {
            return Err(format!("{} requires an admin session", table));
        }
        privileged = true;
    }

    let mut query = ListQuery::new(table);
    if let Some(filter) = filter {
        query = query.filter(Filter::parse(filter).map_err(|e| e.to_string())?);
    }
    if let Some(order) = order {
        query = query.order(OrderBy::parse(order).map_err(|e| e.to_string())?);
    }
    if !privileged {
        if let Some(forced) = table.public_filter() {
            query = query.filter(forced);
        }
    }

    query.validate().map_err(|e| e.to_string())?;
    Ok(query)
}

/// Per-connection forwarders, aborted when replaced, removed, or dropped.
#[derive(Default)]
struct Subscriptions {
    tasks: HashMap<String, JoinHandle<()>>,
}

impl Subscriptions {
    fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    fn len(&self) -> usize {
        self.tasks.len()
    }

    fn insert(&mut self, id: String, task: JoinHandle<()>) {
        if let Some(old) = self.tasks.insert(id, task) {
            old.abort();
        }
    }

    fn remove(&mut self, id: &str) -> bool {
        match self.tasks.remove(id) {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
