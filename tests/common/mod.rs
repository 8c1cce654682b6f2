#![allow(dead_code)]

use crudcrate_params::{FilterContext, ParameterConfig, Parameters, WhereClause};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Set, EntityTrait};

pub mod user_entity;

pub const USER_COLUMNS: [&str; 5] = ["id", "name", "age", "role", "department_id"];

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory database with `users` and `departments` seeded.
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    init_tracing();
    let db = Database::connect("sqlite::memory:").await?;

    db.execute_unprepared(
        "CREATE TABLE departments (id INTEGER PRIMARY KEY, title TEXT NOT NULL)",
    )
    .await?;
    db.execute_unprepared(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            age INTEGER NOT NULL,
            role TEXT NOT NULL,
            department_id INTEGER NOT NULL
        )",
    )
    .await?;
    db.execute_unprepared(
        "INSERT INTO departments (id, title) VALUES (1, 'Sales'), (2, 'Engineering')",
    )
    .await?;

    let users = [
        (1, "Alice", 17, "admin", 1),
        (2, "Albert", 25, "editor", 2),
        (3, "Bob", 30, "editor", 2),
        (4, "Carol", 42, "viewer", 1),
        (5, "Malia", 19, "viewer", 2),
    ];
    user_entity::Entity::insert_many(users.map(|(id, name, age, role, department_id)| {
        user_entity::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            age: Set(age),
            role: Set(role.to_string()),
            department_id: Set(department_id),
        }
    }))
    .exec(&db)
    .await?;

    Ok(db)
}

pub fn user_context() -> FilterContext {
    FilterContext::new(USER_COLUMNS)
}

pub fn params(query: &str) -> Parameters {
    crudcrate_params::extract_from_url(
        &format!("/admin/info/users?{query}"),
        &ParameterConfig::default(),
        true,
    )
}

pub fn compile(query: &str) -> WhereClause {
    params(query).statement(&user_context(), WhereClause::new())
}
