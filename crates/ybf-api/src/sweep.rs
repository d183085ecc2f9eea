use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use ybf_storage::object_ref;
use ybf_types::models::Bucket;

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiResult;
use crate::uploads;

/// Background task that deletes orphaned objects.
///
/// Runs on an interval and removes objects older than the grace period that
/// no content row references: leftovers of uploads whose row never landed or
/// whose row was deleted while the object delete failed.
pub async fn run_sweep_loop(state: AppState, interval: Duration) {
    let mut interval = tokio::time::interval(interval);

    loop {
        interval.tick().await;

        match sweep_orphans(&state).await {
            Ok(count) => {
                if count > 0 {
                    info!("Sweep: removed {} orphaned objects", count);
                }
            }
            Err(e) => {
                warn!("Sweep error: {}", e);
            }
        }
    }
}

pub async fn sweep_orphans(state: &AppState) -> ApiResult<usize> {
    let cutoff = Utc::now() - state.settings.sweep_grace;

    let db = state.db.clone();
    let (candidates, referenced_urls) = blocking(move || {
        Ok((db.storage_objects_created_before(cutoff)?, db.referenced_urls()?))
    })
    .await?;
    // Rows keep the URL they were issued under; compare by bucket and key.
    let referenced: HashSet<(Bucket, String)> = referenced_urls
        .iter()
        .filter_map(|url| object_ref(url))
        .collect();

    let mut removed = 0;
    for object in candidates {
        let Ok(bucket) = object.bucket.parse::<Bucket>() else {
            warn!("Sweep: unknown bucket '{}' for {}", object.bucket, object.key);
            continue;
        };
        if referenced.contains(&(bucket, object.key.clone())) {
            continue;
        }
        match uploads::remove_object(state, bucket, &object.key).await {
            Ok(()) => removed += 1,
            Err(e) => warn!("Sweep: failed to remove {}/{}: {}", bucket, object.key, e),
        }
    }

    Ok(removed)
}
