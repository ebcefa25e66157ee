use serde_json::json;
use sql_scope::prelude::*;
use sql_scope::sqlite::SqliteDriver;

type Ctx<'e> = ExecutionContext<'e, SqliteDriver>;

const USER_DDL: &str = "create table user (
    id text primary key,
    name text not null,
    email text not null,
    passwd text not null,
    last_modified real not null
)";

pub(crate) fn run_all(engine: &Engine<SqliteDriver>) -> Result<(), SqlScopeError> {
    let mut ctx = engine.context();
    reset_schema(&mut ctx)?;
    let alice = insert_and_select(&mut ctx)?;
    rollback_on_failure(&mut ctx, &alice)?;
    nested_commit(&mut ctx)?;
    scalar_queries(&mut ctx)?;
    list_users(&mut ctx)?;
    Ok(())
}

fn reset_schema(ctx: &mut Ctx<'_>) -> Result<(), SqlScopeError> {
    ctx.with_connection(|ctx| {
        ctx.update("drop table if exists user", &[])?;
        ctx.update(USER_DDL, &[])?;
        Ok(())
    })
}

fn new_user(name: &str, email: &str) -> Record {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64());
    record! {
        "id" => next_id(),
        "name" => name,
        "email" => email,
        "passwd" => "********",
        "last_modified" => now,
    }
}

fn show(label: &str, value: &impl serde::Serialize) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string());
    println!("{label}: {rendered}");
}

fn insert_and_select(ctx: &mut Ctx<'_>) -> Result<String, SqlScopeError> {
    let user = new_user("Alice", "alice@example.com");
    let id = user.field("id")?.as_text().unwrap_or_default().to_string();
    ctx.insert("user", &user)?;

    let stored = ctx.select_one("select * from user where id=?", &[id.as_str().into()])?;
    show("inserted", &stored);
    Ok(id)
}

fn rollback_on_failure(ctx: &mut Ctx<'_>, id: &str) -> Result<(), SqlScopeError> {
    let result = ctx.transaction(|ctx| {
        ctx.update("update user set name=? where id=?", &["Bob".into(), id.into()])?;
        Err::<(), _>(SqlScopeError::ExecutionError("simulated failure".into()))
    });
    if let Err(err) = result {
        println!("transaction failed as planned: {err}");
    }

    let name = ctx.select_int("select name from user where id=?", &[id.into()])?;
    show("name after rollback", &name);
    Ok(())
}

fn nested_commit(ctx: &mut Ctx<'_>) -> Result<(), SqlScopeError> {
    ctx.transaction(|ctx| {
        ctx.insert("user", &new_user("Bob", "bob@example.com"))?;
        ctx.transaction(|ctx| ctx.insert("user", &new_user("Carol", "carol@example.com")))?;
        Ok(())
    })
}

fn scalar_queries(ctx: &mut Ctx<'_>) -> Result<(), SqlScopeError> {
    let count = ctx.select_int("select count(*) from user", &[])?;
    show("user count", &count);

    match ctx.select_int("select id, name from user", &[]) {
        Err(err @ SqlScopeError::MultiColumns) => println!("select_int on two columns: {err}"),
        other => show("unexpected select_int result", &json!(format!("{other:?}"))),
    }
    Ok(())
}

fn list_users(ctx: &mut Ctx<'_>) -> Result<(), SqlScopeError> {
    let users = ctx.select_all("select id, name, email from user order by name", &[])?;
    show("users", &users);
    Ok(())
}
