#![cfg(feature = "sqlite")]

use nado::prelude::*;
use tempfile::tempdir;
use tokio::runtime::Runtime;

fn unique_db_path(prefix: &str) -> String {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(format!("{prefix}.db"));
    // Leak the tempdir so the file persists for the duration of the test binary.
    std::mem::forget(dir);
    path.to_string_lossy().into_owned()
}

async fn ledger_driver(config: DbConfig) -> Result<Driver, NadoError> {
    let driver = Driver::new_sqlite(config).await?;
    let mut ctx = driver.context();
    ctx.execute_batch(
        "create table if not exists ledger (
            id integer primary key,
            label text not null
        );",
    )
    .await?;
    Ok(driver)
}

async fn insert_label(ctx: &mut DbContext, id: i64, label: &str) -> Result<usize, NadoError> {
    ctx.execute(
        "insert into ledger (id, label) values ({}, {})",
        &[SqlValue::Int(id), SqlValue::Text(label.to_string())],
    )
    .await
}

async fn count_rows(ctx: &mut DbContext) -> Result<i64, NadoError> {
    let rows = ctx.query("select count(*) from ledger", &[]).await?;
    let row = rows
        .first()
        .ok_or_else(|| NadoError::ExecutionError("count returned no rows".to_string()))?;
    row.get_by_index(0)
        .and_then(SqlValue::as_int)
        .copied()
        .ok_or_else(|| NadoError::ExecutionError("count returned no integer".to_string()))
}

#[test]
fn commit_persists_and_rollback_discards() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let driver = ledger_driver(DbConfig::sqlite(unique_db_path("tx_commit"))).await?;
        let mut ctx = driver.context();

        let tx = ctx.begin().await?;
        insert_label(&mut ctx, 1, "kept").await?;
        ctx.commit(&tx).await?;
        assert!(!ctx.in_transaction());

        let tx = ctx.begin().await?;
        insert_label(&mut ctx, 2, "discarded").await?;
        ctx.rollback(&tx).await?;

        // A second context sees only the committed row.
        let mut check = driver.context();
        assert_eq!(count_rows(&mut check).await?, 1);
        println!("commit/rollback behaved");
        Ok::<(), NadoError>(())
    })?;
    Ok(())
}

#[test]
fn nested_savepoint_rolls_back_inner_work_only() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let config = DbConfig {
            ignore_nested_transactions: false,
            ..DbConfig::sqlite(unique_db_path("tx_savepoint"))
        };
        let driver = ledger_driver(config).await?;
        let mut ctx = driver.context();

        let outer = ctx.begin().await?;
        insert_label(&mut ctx, 1, "outer").await?;

        let inner = ctx.begin().await?;
        assert_eq!(ctx.transaction_depth(), 2);
        insert_label(&mut ctx, 2, "inner").await?;
        ctx.rollback(&inner).await?;
        assert_eq!(ctx.transaction_depth(), 1);

        ctx.commit(&outer).await?;

        let mut check = driver.context();
        assert_eq!(count_rows(&mut check).await?, 1);
        let rows = check.query("select label from ledger", &[]).await?;
        assert_eq!(
            rows.first().unwrap().get("label").unwrap().as_text().unwrap(),
            "outer"
        );
        Ok::<(), NadoError>(())
    })?;
    Ok(())
}

#[test]
fn ignored_nested_frames_are_noops() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        // Default config: nested begin/rollback pairs do nothing.
        let driver = ledger_driver(DbConfig::sqlite(unique_db_path("tx_ignored"))).await?;
        let mut ctx = driver.context();

        let outer = ctx.begin().await?;
        insert_label(&mut ctx, 1, "outer").await?;
        let inner = ctx.begin().await?;
        insert_label(&mut ctx, 2, "inner").await?;
        ctx.rollback(&inner).await?;
        ctx.commit(&outer).await?;

        let mut check = driver.context();
        assert_eq!(count_rows(&mut check).await?, 2);
        Ok::<(), NadoError>(())
    })?;
    Ok(())
}

#[test]
fn autocommit_makes_transaction_calls_noops() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let config = DbConfig {
            autocommit: true,
            ..DbConfig::sqlite(unique_db_path("tx_autocommit"))
        };
        let driver = ledger_driver(config).await?;
        let mut ctx = driver.context();

        let tx = ctx.begin().await?;
        insert_label(&mut ctx, 1, "written anyway").await?;
        ctx.rollback(&tx).await?;

        let mut check = driver.context();
        assert_eq!(count_rows(&mut check).await?, 1);
        Ok::<(), NadoError>(())
    })?;
    Ok(())
}

#[test]
fn finalizing_a_closed_frame_is_a_noop() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let driver = ledger_driver(DbConfig::sqlite(unique_db_path("tx_closed"))).await?;
        let mut ctx = driver.context();

        let tx = ctx.begin().await?;
        insert_label(&mut ctx, 1, "kept").await?;
        ctx.commit(&tx).await?;
        ctx.commit(&tx).await?;
        ctx.rollback(&tx).await?;

        let mut check = driver.context();
        assert_eq!(count_rows(&mut check).await?, 1);
        Ok::<(), NadoError>(())
    })?;
    Ok(())
}

#[test]
fn scoped_transaction_commits_on_ok_and_rolls_back_on_err(
) -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let driver = ledger_driver(DbConfig::sqlite(unique_db_path("tx_scoped"))).await?;
        let mut ctx = driver.context();

        let affected = ctx
            .transaction(|ctx| {
                Box::pin(async move {
                    ctx.execute(
                        "insert into ledger (id, label) values ({}, {})",
                        &[SqlValue::Int(1), SqlValue::Text("committed".to_string())],
                    )
                    .await
                })
            })
            .await?;
        assert_eq!(affected, 1);

        let result = ctx
            .transaction(|ctx| {
                Box::pin(async move {
                    ctx.execute(
                        "insert into ledger (id, label) values ({}, {})",
                        &[SqlValue::Int(2), SqlValue::Text("doomed".to_string())],
                    )
                    .await?;
                    Err::<usize, _>(NadoError::ExecutionError("forced failure".to_string()))
                })
            })
            .await;
        assert!(result.is_err());

        let mut check = driver.context();
        assert_eq!(count_rows(&mut check).await?, 1);
        Ok::<(), NadoError>(())
    })?;
    Ok(())
}

#[test]
fn dropping_a_context_rolls_back_open_work() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let driver = ledger_driver(DbConfig::sqlite(unique_db_path("tx_drop"))).await?;
        let mut ctx = driver.context();

        let _tx = ctx.begin().await?;
        insert_label(&mut ctx, 1, "abandoned").await?;
        drop(ctx);

        // Give the rollback task spawned by Drop a chance to run.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let mut check = driver.context();
        assert_eq!(count_rows(&mut check).await?, 0);
        println!("drop guard rolled the transaction back");
        Ok::<(), NadoError>(())
    })?;
    Ok(())
}
