#![cfg(feature = "sqlite")]

use chrono::NaiveDate;
use sql_scope::prelude::*;
use sql_scope::sqlite::SqliteDriver;
use tempfile::{TempDir, tempdir};

const USER_DDL: &str = "create table user (
    id integer primary key,
    name text not null,
    email text,
    admin integer not null default 0,
    last_modified text
)";

fn setup() -> Result<(TempDir, Engine<SqliteDriver>), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("queries.db");
    let engine = sqlite_engine(path.to_string_lossy());
    engine.context().update(USER_DDL, &[])?;
    Ok((dir, engine))
}

fn insert_user(
    ctx: &mut ExecutionContext<'_, SqliteDriver>,
    id: i64,
    name: &str,
) -> Result<usize, SqlScopeError> {
    ctx.insert("user", &record! { "id" => id, "name" => name })
}

#[test]
fn insert_then_select_one() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, engine) = setup()?;
    let mut ctx = engine.context();

    assert_eq!(insert_user(&mut ctx, 1, "Alice")?, 1);
    let user = ctx
        .select_one("select * from user where id=?", &[1_i64.into()])?
        .ok_or("user 1 missing")?;
    assert_eq!(user.field("name")?.as_text(), Some("Alice"));
    assert_eq!(user.columns(), ["id", "name", "email", "admin", "last_modified"]);
    assert!(user.field("email")?.is_null());
    assert!(matches!(
        user.field("nickname"),
        Err(SqlScopeError::FieldNotFound(ref f)) if f == "nickname"
    ));
    Ok(())
}

#[test]
fn failure_after_update_rolls_the_update_back() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, engine) = setup()?;
    let mut ctx = engine.context();
    insert_user(&mut ctx, 1, "Alice")?;

    let result = ctx.transaction(|ctx| {
        ctx.update("update user set name=? where id=?", &["Bob".into(), 1_i64.into()])?;
        // read-your-writes inside the transaction
        let name = ctx.select_int("select name from user where id=?", &[1_i64.into()])?;
        assert_eq!(name, Some(RowValues::Text("Bob".into())));
        Err::<(), _>(SqlScopeError::ParameterError("abort".into()))
    });
    assert!(result.is_err());

    let name = ctx.select_int("select name from user where id=?", &[1_i64.into()])?;
    assert_eq!(name, Some(RowValues::Text("Alice".into())));
    Ok(())
}

#[test]
fn handled_inner_failure_keeps_the_outer_update() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, engine) = setup()?;
    let mut ctx = engine.context();
    insert_user(&mut ctx, 1, "Alice")?;

    ctx.transaction(|ctx| {
        ctx.update("update user set name=? where id=?", &["Bob".into(), 1_i64.into()])?;
        let inner = ctx.transaction(|_| {
            Err::<(), _>(SqlScopeError::ParameterError("inner".into()))
        });
        assert!(inner.is_err());
        Ok::<_, SqlScopeError>(())
    })?;

    let name = ctx.select_int("select name from user where id=?", &[1_i64.into()])?;
    assert_eq!(name, Some(RowValues::Text("Bob".into())));
    Ok(())
}

#[test]
fn committed_transaction_persists() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, engine) = setup()?;
    let mut ctx = engine.context();

    ctx.transaction(|ctx| {
        insert_user(ctx, 1, "Alice")?;
        ctx.transaction(|ctx| insert_user(ctx, 2, "Bob"))?;
        Ok::<_, SqlScopeError>(())
    })?;

    let other = engine.context().select_int("select count(*) from user", &[])?;
    assert_eq!(other, Some(RowValues::Int(2)));
    Ok(())
}

#[test]
fn select_one_returns_first_row_or_none() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, engine) = setup()?;
    let mut ctx = engine.context();
    insert_user(&mut ctx, 2, "Bob")?;
    insert_user(&mut ctx, 1, "Alice")?;

    assert!(ctx.select_one("select * from user where id=?", &[99_i64.into()])?.is_none());
    let first = ctx
        .select_one("select id, name from user order by id desc", &[])?
        .ok_or("no rows")?;
    assert_eq!(first.field("name")?, &RowValues::Text("Bob".into()));

    let all = ctx.select_all("select name from user order by name", &[])?;
    let names: Vec<_> = all
        .iter()
        .filter_map(|r| r.get("name").and_then(RowValues::as_text))
        .collect();
    assert_eq!(names, ["Alice", "Bob"]);
    assert!(ctx.select_all("select * from user where id > ?", &[5_i64.into()])?.is_empty());
    Ok(())
}

#[test]
fn select_int_needs_exactly_one_column() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, engine) = setup()?;
    let mut ctx = engine.context();
    insert_user(&mut ctx, 1, "Alice")?;

    assert_eq!(
        ctx.select_int("select count(*) from user", &[])?,
        Some(RowValues::Int(1))
    );
    assert_eq!(ctx.select_int("select id from user where id=-1", &[])?, None);
    assert!(matches!(
        ctx.select_int("select id, name from user", &[]),
        Err(SqlScopeError::MultiColumns)
    ));
    assert!(matches!(
        ctx.select_int("select id, name from user where id=-1", &[]),
        Err(SqlScopeError::MultiColumns)
    ));
    Ok(())
}

#[test]
fn duplicate_insert_fails_and_changes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, engine) = setup()?;
    let mut ctx = engine.context();
    insert_user(&mut ctx, 1, "Alice")?;

    let err = insert_user(&mut ctx, 1, "Impostor").unwrap_err();
    assert!(err.is_database_error());
    assert!(matches!(err, SqlScopeError::SqliteError(_)));
    assert!(!ctx.is_open());

    let all = ctx.select_all("select name from user", &[])?;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].field("name")?.as_text(), Some("Alice"));
    Ok(())
}

#[test]
fn empty_insert_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, engine) = setup()?;
    let err = engine.context().insert("user", &Record::default()).unwrap_err();
    assert!(matches!(err, SqlScopeError::ParameterError(_)));
    Ok(())
}

#[test]
fn values_come_back_in_sqlite_storage_classes() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, engine) = setup()?;
    let mut ctx = engine.context();
    let modified = NaiveDate::from_ymd_opt(2024, 5, 6)
        .ok_or("bad date")?
        .and_hms_opt(7, 8, 9)
        .ok_or("bad time")?;
    ctx.insert(
        "user",
        &record! {
            "id" => 7_i64,
            "name" => "Carol",
            "email" => None::<String>,
            "admin" => true,
            "last_modified" => modified,
        },
    )?;

    let row = ctx
        .select_one("select * from user where id=?", &[7_i64.into()])?
        .ok_or("user 7 missing")?;
    assert_eq!(row.field("admin")?.as_bool(), Some(&true));
    assert_eq!(row.field("last_modified")?.as_timestamp(), Some(modified));
    assert_eq!(
        serde_json::to_value(&row)?,
        serde_json::json!({
            "id": 7,
            "name": "Carol",
            "email": null,
            "admin": 1,
            "last_modified": "2024-05-06 07:08:09",
        })
    );
    Ok(())
}

#[test]
fn generated_ids_work_as_text_keys() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, engine) = setup()?;
    let mut ctx = engine.context();
    ctx.update("create table note (id text primary key, body text)", &[])?;

    let first = next_id();
    let second = next_id();
    ctx.transaction(|ctx| {
        ctx.insert("note", &record! { "id" => first.as_str(), "body" => "one" })?;
        ctx.insert("note", &record! { "id" => second.as_str(), "body" => "two" })
    })?;

    let ids = ctx.select_all("select id from note order by id", &[])?;
    let ids: Vec<_> = ids
        .iter()
        .filter_map(|r| r.get("id").and_then(RowValues::as_text))
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first.as_str()) && ids.contains(&second.as_str()));
    assert!(ids.iter().all(|id| id.len() == sql_scope::ID_LEN));
    Ok(())
}

#[test]
fn bad_sql_surfaces_the_driver_error() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, engine) = setup()?;
    let mut ctx = engine.context();
    let err = ctx.select_all("select * from missing_table", &[]).unwrap_err();
    assert!(matches!(err, SqlScopeError::SqliteError(_)));
    assert!(!ctx.is_open());
    Ok(())
}
