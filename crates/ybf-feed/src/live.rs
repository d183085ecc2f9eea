use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use ybf_db::Database;
use ybf_types::query::ListQuery;

use crate::dispatcher::Dispatcher;

/// A list that keeps itself current.
///
/// Holds the full result of a `ListQuery` and refetches it whenever a change
/// that could affect the list is published. The change stream is subscribed
/// before the initial fetch, so no commit can fall between the two.
pub struct LiveCollection {
    rows: watch::Receiver<Arc<Vec<Value>>>,
    task: JoinHandle<()>,
}

impl LiveCollection {
    pub async fn open(db: Arc<Database>, dispatcher: &Dispatcher, query: ListQuery) -> Result<Self> {
        query.validate()?;

        let mut changes = dispatcher.subscribe();
        let initial = fetch(&db, &query).await?;
        let (tx, rx) = watch::channel(Arc::new(initial));

        let task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(event) if query.matches(&event) => {}
                    Ok(_) => continue,
                    Err(RecvError::Lagged(n)) => {
                        warn!("Live {} list lagged by {} changes, refetching", query.table, n);
                    }
                    Err(RecvError::Closed) => break,
                }

                // The refetch reads current state, so anything already queued is covered.
                loop {
                    match changes.try_recv() {
                        Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Closed) => return,
                    }
                }

                match fetch(&db, &query).await {
                    Ok(rows) => {
                        debug!("Live {} list refetched ({} rows)", query.table, rows.len());
                        if tx.send(Arc::new(rows)).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Live {} list refetch failed: {}", query.table, e),
                }
            }
        });

        Ok(Self { rows: rx, task })
    }

    /// Current contents.
    pub fn snapshot(&self) -> Arc<Vec<Value>> {
        self.rows.borrow().clone()
    }

    /// Wait for the next refetch. `None` once the collection has stopped.
    pub async fn changed(&mut self) -> Option<Arc<Vec<Value>>> {
        self.rows.changed().await.ok()?;
        Some(self.rows.borrow_and_update().clone())
    }
}

impl Drop for LiveCollection {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn fetch(db: &Arc<Database>, query: &ListQuery) -> Result<Vec<Value>> {
    let db = db.clone();
    let query = query.clone();
    tokio::task::spawn_blocking(move || db.list_values(&query)).await?
}
