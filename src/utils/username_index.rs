//! In-memory username index used before asking the database.
//!
//! The cuckoo filter answers "definitely free" (fast negative), the moka cache answers
//! "definitely taken" (fast positive). Everything else falls through to a query.

use std::{sync::RwLock, time::Duration};

use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use tracing::info;

const FILTER_CAPACITY: usize = 10_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static USERNAME_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

static USERNAME_CACHE: Lazy<Cache<String, ()>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(50_000)
        .time_to_live(Duration::from_secs(86_400))
        .build()
});

#[inline]
fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

/// False positives possible. A poisoned lock answers "maybe" so the caller hits the database.
fn might_exist(username: &String) -> bool {
    USERNAME_FILTER
        .read()
        .map(|filter| filter.contains(username))
        .unwrap_or(true)
}

fn insert_batch(usernames: &[String]) {
    if let Ok(mut filter) = USERNAME_FILTER.write() {
        for username in usernames {
            filter.add(username);
        }
    }
}

/// Records a freshly created account in both structures.
pub async fn mark_taken(username: &str) {
    let username = normalize(username);
    insert_batch(std::slice::from_ref(&username));
    USERNAME_CACHE.insert(username, ()).await;
}

/// `true` when nobody holds `username`.
pub async fn is_username_available(pool: &MySqlPool, username: &str) -> Result<bool, sqlx::Error> {
    let username = normalize(username);

    if !might_exist(&username) {
        return Ok(true);
    }
    if USERNAME_CACHE.contains_key(&username) {
        return Ok(false);
    }

    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = ? LIMIT 1)",
    )
    .bind(&username)
    .fetch_one(pool)
    .await?
        != 0;

    if exists {
        USERNAME_CACHE.insert(username, ()).await;
    }
    Ok(!exists)
}

/// Streams every username into the filter and recently active ones into the cache.
pub async fn warmup(pool: &MySqlPool, batch_size: usize, recent_days: u32) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT username,
               COALESCE(last_login_at >= NOW() - INTERVAL ? DAY, FALSE) AS recent
        FROM users
        "#,
    )
    .bind(recent_days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;
    let mut cached = 0usize;

    while let Some(row) = stream.next().await {
        let (username, recent) = row.map_err(|e| anyhow!("DB row fetch failed: {e}"))?;
        let username = normalize(&username);

        if recent != 0 {
            USERNAME_CACHE.insert(username.clone(), ()).await;
            cached += 1;
        }
        batch.push(username);
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    info!(total, cached, "Username index warmup complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn marked_usernames_hit_both_fast_paths() {
        mark_taken("  Dean.Reyes ").await;

        assert!(might_exist(&"dean.reyes".to_string()));
        assert!(USERNAME_CACHE.contains_key("dean.reyes"));
    }

    #[test]
    fn normalization_is_case_and_space_insensitive() {
        assert_eq!(normalize("  HR.Jane "), "hr.jane");
    }
}
