#![cfg(feature = "test-utils")]

use sql_scope::prelude::*;
use sql_scope::test_utils::{DriverStats, RecordingDriver};
use sql_scope::{LazyConnection, PlaceholderStyle};

#[test]
fn scope_without_statements_never_connects() -> Result<(), Box<dyn std::error::Error>> {
    let driver = RecordingDriver::new();
    let engine = driver.engine();
    let mut ctx = engine.context();

    let scope = ConnectionScope::enter(&mut ctx)?;
    assert!(scope.owns_connection());
    assert!(scope.is_open());
    scope.exit()?;

    assert!(!ctx.is_open());
    assert_eq!(driver.stats(), DriverStats::default());
    Ok(())
}

#[test]
fn nested_scopes_share_one_connection() -> Result<(), Box<dyn std::error::Error>> {
    let driver = RecordingDriver::new();
    let engine = driver.engine();
    let mut ctx = engine.context();

    let mut outer = ConnectionScope::enter(&mut ctx)?;
    outer.select_all("select 1", &[])?;
    {
        let mut inner = ConnectionScope::enter(&mut *outer)?;
        assert!(!inner.owns_connection());
        inner.select_all("select 2", &[])?;
        {
            let mut innermost = ConnectionScope::enter(&mut *inner)?;
            innermost.select_one("select 3", &[])?;
        }
        inner.exit()?;
    }
    assert!(outer.is_open());
    outer.select_all("select 4", &[])?;
    outer.exit()?;

    let stats = driver.stats();
    assert_eq!(stats.connects, 1);
    assert_eq!(stats.closes, 1);
    assert_eq!(stats.statements, 4);
    assert!(driver.executed().iter().all(|s| s.connection == 1));
    Ok(())
}

#[test]
fn standalone_queries_each_open_and_close() -> Result<(), Box<dyn std::error::Error>> {
    let driver = RecordingDriver::new();
    let engine = driver.engine();
    let mut ctx = engine.context();

    ctx.select_all("select 1", &[])?;
    ctx.select_all("select 2", &[])?;
    assert_eq!(driver.stats().connects, 2);
    assert_eq!(driver.stats().open_connections(), 0);

    ctx.with_connection(|ctx| {
        ctx.select_all("select 3", &[])?;
        ctx.select_all("select 4", &[])
    })?;
    assert_eq!(driver.stats().connects, 3);
    assert_eq!(driver.stats().closes, 3);
    Ok(())
}

#[test]
fn placeholders_follow_the_driver_style() -> Result<(), Box<dyn std::error::Error>> {
    let driver = RecordingDriver::new().with_style(PlaceholderStyle::Postgres);
    let engine = driver.engine();
    let mut ctx = engine.context();
    ctx.select_all(
        "select * from user where name=? and note='?'",
        &["Alice".into()],
    )?;

    let untranslated = RecordingDriver::new();
    let engine = untranslated.engine_with(EngineOptions::default().with_translation(false));
    engine.context().select_all("select ? from dual", &[1_i64.into()])?;

    let format = RecordingDriver::new();
    let engine = format.engine();
    engine.context().select_all("select ? from t where pct like '5%'", &[1_i64.into()])?;

    assert_eq!(
        driver.executed_sql(),
        ["select * from user where name=$1 and note='?'"]
    );
    assert_eq!(untranslated.executed_sql(), ["select ? from dual"]);
    assert_eq!(
        format.executed_sql(),
        ["select %s from t where pct like '5%%'"]
    );
    assert_eq!(driver.executed()[0].params, [RowValues::Text("Alice".into())]);
    Ok(())
}

#[test]
fn open_twice_and_cursor_without_open_are_rejected() {
    let driver = RecordingDriver::new();
    let engine = driver.engine();
    let mut ctx = engine.context();

    assert!(matches!(ctx.cursor(), Err(SqlScopeError::NotConnected)));
    ctx.open().unwrap();
    assert!(matches!(ctx.open(), Err(SqlScopeError::AlreadyOpen)));
    ctx.close().unwrap();
    ctx.close().unwrap();
    assert_eq!(driver.stats().connects, 0);
}

#[test]
fn release_twice_closes_once() -> Result<(), Box<dyn std::error::Error>> {
    let driver = RecordingDriver::new();
    let engine = driver.engine();
    let mut lazy = LazyConnection::new(&engine);

    assert!(matches!(lazy.commit(), Err(SqlScopeError::NotConnected)));
    lazy.cursor()?.execute("select 1", &[])?;
    lazy.cursor()?.execute("select 2", &[])?;
    assert!(lazy.is_connected());
    lazy.release()?;
    lazy.release()?;
    drop(lazy);

    let stats = driver.stats();
    assert_eq!(stats.connects, 1);
    assert_eq!(stats.closes, 1);
    Ok(())
}

#[test]
fn connect_failure_leaves_the_context_closed() {
    let driver = RecordingDriver::new();
    let engine = driver.engine();
    let mut ctx = engine.context();

    driver.fail_next_connect();
    let err = ctx.select_one("select 1", &[]).unwrap_err();
    assert!(matches!(err, SqlScopeError::Driver(_)));
    assert!(!ctx.is_open());

    assert!(ctx.select_one("select 1", &[]).is_ok());
    assert_eq!(driver.stats().connects, 1);
}

#[test]
fn close_errors_surface_only_when_the_body_succeeded() {
    let driver = RecordingDriver::new();
    let engine = driver.engine();
    let mut ctx = engine.context();

    driver.fail_next_close();
    let err = ctx.select_all("select 1", &[]).unwrap_err();
    assert!(matches!(err, SqlScopeError::ExecutionError(ref m) if m == "close failed"));

    driver.fail_next_close();
    driver.push_error("syntax error");
    let err = ctx.select_all("selec 1", &[]).unwrap_err();
    assert!(matches!(err, SqlScopeError::ExecutionError(ref m) if m == "syntax error"));
    assert!(!ctx.is_open());
    assert_eq!(driver.stats().open_connections(), 0);
}

#[test]
fn dropped_scope_releases_its_connection() {
    let driver = RecordingDriver::new();
    let engine = driver.engine();
    let mut ctx = engine.context();
    {
        let mut scope = ConnectionScope::enter(&mut ctx).unwrap();
        scope.select_all("select 1", &[]).unwrap();
    }
    assert!(!ctx.is_open());
    assert_eq!(driver.stats().closes, 1);
}
