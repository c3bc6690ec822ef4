#![cfg(feature = "sqlite")]

mod common;

use std::sync::Arc;

use common::{company_pool, text};
use eo_access::prelude::*;
use tokio::sync::Semaphore;

#[tokio::test]
async fn interact_runs_on_blocking_pool() -> Result<(), EoAccessError> {
    let pool = company_pool("interact")?;
    let rows = pool
        .interact(|channel| {
            Ok(channel
                .perform_sql("SELECT name FROM person WHERE id = 1")
                .map(ResultSet::into_records)
                .unwrap_or_default())
        })
        .await?;
    assert_eq!(text(rows[0].get("name")), "Scrooge");
    assert_eq!(pool.status().available, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_interactions_share_the_pool() -> Result<(), Box<dyn std::error::Error>> {
    let pool = company_pool("interact_concurrent")?;
    let limit = Arc::new(Semaphore::new(8));

    let mut handles = Vec::new();
    for id in 100..132_i64 {
        let pool = pool.clone();
        let limit = Arc::clone(&limit);
        handles.push(tokio::spawn(async move {
            let _permit = limit.acquire().await;
            pool.interact(move |channel| {
                let row = Record::from_pairs([
                    ("id", Value::Int(id)),
                    ("title", Value::from(format!("role {id}"))),
                ]);
                if channel.insert_row("role", &row) {
                    Ok(())
                } else {
                    Err(channel
                        .consume_last_error()
                        .unwrap_or_else(|| EoAccessError::Other("insert failed".into())))
                }
            })
            .await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let count = pool
        .interact(|channel| {
            Ok(channel
                .perform_sql("SELECT COUNT(*) AS n FROM role")
                .map(ResultSet::into_records)
                .unwrap_or_default())
        })
        .await?;
    assert_eq!(count[0].get("n").and_then(Value::as_int), Some(&34));
    assert!(pool.status().total() <= 4);
    Ok(())
}

#[tokio::test]
async fn interact_reports_closure_errors() -> Result<(), EoAccessError> {
    let pool = company_pool("interact_error")?;
    let result: Result<(), _> = pool
        .interact(|_channel| Err(EoAccessError::Other("nope".into())))
        .await;
    assert!(matches!(result, Err(EoAccessError::Other(_))));
    assert_eq!(pool.status().total(), 0);
    Ok(())
}
