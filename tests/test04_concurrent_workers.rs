#![cfg(feature = "sqlite")]

use std::thread;

use sql_scope::prelude::*;
use tempfile::tempdir;

#[test]
fn auto_committed_insert_is_visible_to_other_workers() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let engine = sqlite_engine(dir.path().join("workers.db").to_string_lossy());
    engine
        .context()
        .update("create table user (id integer primary key, name text)", &[])?;

    let mut writer = engine.context();
    writer.insert("user", &record! { "id" => 1_i64, "name" => "Alice" })?;

    let seen = thread::scope(|s| {
        s.spawn(|| {
            engine
                .context()
                .select_int("select name from user where id=?", &[1_i64.into()])
        })
        .join()
    })
    .map_err(|_| "reader panicked")??;
    assert_eq!(seen, Some(RowValues::Text("Alice".into())));
    Ok(())
}

#[test]
fn uncommitted_work_stays_private_to_its_worker() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let engine = sqlite_engine(dir.path().join("private.db").to_string_lossy());
    engine
        .context()
        .update("create table user (id integer primary key, name text)", &[])?;

    let mut writer = engine.context();
    let mut tx = TransactionScope::begin(&mut writer)?;
    tx.insert("user", &record! { "id" => 1_i64, "name" => "Alice" })?;

    let before = engine.context().select_int("select count(*) from user", &[])?;
    assert_eq!(before, Some(RowValues::Int(0)));

    tx.commit()?;
    let after = engine.context().select_int("select count(*) from user", &[])?;
    assert_eq!(after, Some(RowValues::Int(1)));
    Ok(())
}

#[test]
fn workers_keep_separate_contexts() -> Result<(), Box<dyn std::error::Error>> {
    const WORKERS: i64 = 4;
    const ROWS_PER_WORKER: i64 = 10;

    let dir = tempdir()?;
    let engine = sqlite_engine(dir.path().join("many.db").to_string_lossy());
    engine
        .context()
        .update("create table item (id integer primary key, worker integer)", &[])?;

    thread::scope(|s| {
        let handles: Vec<_> = (0..WORKERS)
            .map(|worker| {
                let engine = &engine;
                s.spawn(move || -> Result<(), SqlScopeError> {
                    let mut ctx = engine.context();
                    ctx.transaction(|ctx| {
                        for n in 0..ROWS_PER_WORKER {
                            assert_eq!(ctx.transaction_depth(), 1);
                            ctx.insert(
                                "item",
                                &record! {
                                    "id" => worker * ROWS_PER_WORKER + n,
                                    "worker" => worker,
                                },
                            )?;
                        }
                        Ok(())
                    })
                })
            })
            .collect();
        for handle in handles {
            handle.join().map_err(|_| "worker panicked")??;
        }
        Ok::<_, Box<dyn std::error::Error>>(())
    })?;

    let total = engine.context().select_int("select count(*) from item", &[])?;
    assert_eq!(total, Some(RowValues::Int(WORKERS * ROWS_PER_WORKER)));
    let per_worker = engine
        .context()
        .select_all("select worker, count(*) as n from item group by worker", &[])?;
    assert_eq!(per_worker.len(), 4);
    assert!(
        per_worker
            .iter()
            .all(|r| r.get("n") == Some(&RowValues::Int(ROWS_PER_WORKER)))
    );
    Ok(())
}
