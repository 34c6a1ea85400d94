//! The worker loop and per-task execution.
//!
//! A worker holds no state between iterations and never assumes exclusivity
//! over its assigned task — every output file goes through the atomic
//! writer, so a task re-executed after a stall reap is harmless: the last
//! rename wins.

use std::path::Path;
use std::time::Duration;

use rayon::prelude::*;
use tarpc::context;
use tracing::{info, warn};

use crate::mr::atomic::write_atomic;
use crate::mr::coordinator::{final_file, intermediate_file};
use crate::mr::function::Application;
use crate::mr::hash;
use crate::mr::kv::KeyValue;
use crate::mr::rpc::{CoordinatorClient, TaskAssignment, TaskReport, TaskType};

const WAIT_INTERVAL: Duration = Duration::from_secs(1);

/// Read the input file, run the user map callback, partition by key, and
/// atomically emit all `n_reduce` intermediate files (one may be empty —
/// we always write every bucket rather than omitting empty ones).
pub async fn execute_map(
    app: Application,
    task_id: usize,
    file: &str,
    n_reduce: usize,
) -> crate::mr::Result<()> {
    let contents = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| crate::mr::Error::io(file, e))?;

    let pairs = (app.map)(file, &contents);

    let mut buckets: Vec<Vec<KeyValue>> = vec![Vec::new(); n_reduce];
    let indexed: Vec<(usize, KeyValue)> = pairs
        .into_par_iter()
        .map(|(k, v)| (hash::partition(&k, n_reduce), KeyValue::new(k, v)))
        .collect();
    for (bucket, kv) in indexed {
        buckets[bucket].push(kv);
    }

    for (r, records) in buckets.into_iter().enumerate() {
        let mut blob = String::new();
        for kv in &records {
            blob.push_str(&kv.encode_line()?);
        }
        let path = intermediate_file(task_id, r);
        write_atomic(Path::new(&path), blob.as_bytes()).await?;
    }

    info!(task_id, n_reduce, "map task complete");
    Ok(())
}

/// Read every `mr-<m>-<task_id>` file (tolerating absence as empty), group
/// by key, run the user reduce callback per group, and atomically emit the
/// final output file.
pub async fn execute_reduce(
    app: Application,
    task_id: usize,
    files: &[String],
) -> crate::mr::Result<()> {
    let mut all_kvs = Vec::new();
    for path in files {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => all_kvs.extend(KeyValue::decode_all(path, &contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // A completed map task guarantees every bucket file exists or
                // was legitimately empty; treat a missing file as empty.
            }
            Err(e) => return Err(crate::mr::Error::io(path, e)),
        }
    }

    // Stable sort: within a key, relative order of values from different
    // map tasks is preserved, though the reduce contract doesn't require it.
    all_kvs.sort_by(|a, b| a.key.cmp(&b.key));

    let mut output = String::new();
    let mut i = 0;
    while i < all_kvs.len() {
        let mut j = i;
        while j < all_kvs.len() && all_kvs[j].key == all_kvs[i].key {
            j += 1;
        }
        let key = &all_kvs[i].key;
        let values: Vec<&str> = all_kvs[i..j].iter().map(|kv| kv.value.as_str()).collect();
        let result = (app.reduce)(key, &values);
        output.push_str(&format!("{key} {result}\n"));
        i = j;
    }

    let path = final_file(task_id);
    write_atomic(Path::new(&path), output.as_bytes()).await?;

    info!(task_id, "reduce task complete");
    Ok(())
}

/// Drives the worker loop until the coordinator replies `Exit` or the RPC
/// transport fails (the latter is treated as a clean shutdown — the
/// coordinator has almost certainly exited).
pub async fn run(client: CoordinatorClient, app: Application) -> anyhow::Result<()> {
    loop {
        let assignment = match client.get_task(context::current()).await {
            Ok(a) => a,
            Err(e) => {
                warn!(error = %e, "lost contact with coordinator, exiting");
                return Ok(());
            }
        };

        match assignment {
            TaskAssignment::Map {
                task_id,
                file,
                n_reduce,
            } => {
                let success = execute_map(app, task_id, &file, n_reduce).await.is_ok();
                if !success {
                    warn!(task_id, %file, "map task failed");
                }
                report(&client, TaskType::Map, task_id, success).await?;
            }
            TaskAssignment::Reduce { task_id, files, .. } => {
                let success = execute_reduce(app, task_id, &files).await.is_ok();
                if !success {
                    warn!(task_id, "reduce task failed");
                }
                report(&client, TaskType::Reduce, task_id, success).await?;
            }
            TaskAssignment::Wait => {
                tokio::time::sleep(WAIT_INTERVAL).await;
            }
            TaskAssignment::Exit => {
                info!("coordinator reports all work done, exiting");
                return Ok(());
            }
        }
    }
}

async fn report(
    client: &CoordinatorClient,
    task_type: TaskType,
    task_id: usize,
    success: bool,
) -> anyhow::Result<()> {
    if let Err(e) = client
        .report_task(
            context::current(),
            TaskReport {
                task_type,
                task_id,
                success,
            },
        )
        .await
    {
        warn!(error = %e, "lost contact with coordinator while reporting, exiting");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mr::function::lookup;
    use serial_test::serial;

    // These tests change the process-wide current directory, so they must
    // not run concurrently with each other.

    #[tokio::test]
    #[serial]
    async fn map_then_reduce_round_trips_word_count() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let app = lookup("wc").unwrap();

        tokio::fs::write("in-0.txt", "the cat sat").await.unwrap();
        execute_map(app, 0, "in-0.txt", 2).await.unwrap();

        // Both intermediate files for map 0 must exist: we always emit all
        // R files, even if empty.
        assert!(Path::new(&intermediate_file(0, 0)).exists());
        assert!(Path::new(&intermediate_file(0, 1)).exists());

        let files: Vec<String> = (0..1).map(|m| intermediate_file(m, 0)).collect();
        execute_reduce(app, 0, &files).await.unwrap();
        let files1: Vec<String> = (0..1).map(|m| intermediate_file(m, 1)).collect();
        execute_reduce(app, 1, &files1).await.unwrap();

        let out0 = tokio::fs::read_to_string(final_file(0)).await.unwrap();
        let out1 = tokio::fs::read_to_string(final_file(1)).await.unwrap();
        let mut lines: Vec<&str> = out0.lines().chain(out1.lines()).collect();
        lines.sort();
        assert_eq!(lines, vec!["cat 1", "sat 1", "the 1"]);
    }

    #[tokio::test]
    #[serial]
    async fn reduce_tolerates_missing_intermediate_file() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let app = lookup("wc").unwrap();
        // Neither mr-0-0 nor mr-1-0 exists; reduce should still succeed with
        // empty output.
        let files = vec!["mr-0-0".to_string(), "mr-1-0".to_string()];
        execute_reduce(app, 0, &files).await.unwrap();
        let out = tokio::fs::read_to_string(final_file(0)).await.unwrap();
        assert!(out.is_empty());
    }
}
