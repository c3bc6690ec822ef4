#![allow(dead_code)]

use std::sync::Arc;

use eo_access::prelude::*;
use tempfile::tempdir;

pub const MODEL_JSON: &str = r#"{
  "name": "company",
  "entities": [
    {
      "name": "Person",
      "tableName": "person",
      "primaryKeyNames": ["id"],
      "attributes": [
        { "name": "id", "externalType": "INTEGER", "allowsNull": false },
        { "name": "name" },
        { "name": "managerId", "columnName": "manager_id", "externalType": "INTEGER" }
      ],
      "relationships": [
        {
          "name": "toManager",
          "destination": "Person",
          "joins": [{ "sourceAttribute": "managerId", "destinationAttribute": "id" }]
        },
        {
          "name": "toRoleLinks",
          "destination": "RoleLink",
          "isToMany": true,
          "joins": [{ "sourceAttribute": "id", "destinationAttribute": "personId" }]
        },
        { "name": "roles", "definition": "toRoleLinks.toRole", "isToMany": true }
      ]
    },
    {
      "name": "RoleLink",
      "tableName": "person_role",
      "attributes": [
        { "name": "personId", "columnName": "person_id", "externalType": "INTEGER" },
        { "name": "roleId", "columnName": "role_id", "externalType": "INTEGER" }
      ],
      "relationships": [
        {
          "name": "toRole",
          "destination": "Role",
          "joins": [{ "sourceAttribute": "roleId", "destinationAttribute": "id" }]
        }
      ]
    },
    {
      "name": "Role",
      "tableName": "role",
      "primaryKeyNames": ["id"],
      "attributes": [
        { "name": "id", "externalType": "INTEGER", "allowsNull": false },
        { "name": "title" }
      ]
    }
  ]
}"#;

pub const SCHEMA: &str = "
    CREATE TABLE person (id INTEGER PRIMARY KEY, name TEXT NOT NULL, manager_id INTEGER);
    CREATE TABLE role (id INTEGER PRIMARY KEY, title TEXT NOT NULL);
    CREATE TABLE person_role (person_id INTEGER NOT NULL, role_id INTEGER NOT NULL);
    INSERT INTO person (id, name, manager_id) VALUES
        (1, 'Scrooge', NULL), (2, 'Donald', 1), (3, 'Daisy', 1), (4, 'Huey', 2);
    INSERT INTO role (id, title) VALUES (1, 'admin'), (2, 'pilot');
    INSERT INTO person_role (person_id, role_id) VALUES (2, 1), (2, 2), (3, 2);
";

pub fn unique_db_path(prefix: &str) -> String {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(format!("{prefix}.db"));
    // Leak the tempdir so the file persists for the duration of the test binary.
    std::mem::forget(dir);
    path.to_string_lossy().into_owned()
}

pub fn model() -> Arc<Model> {
    Arc::new(Model::from_json(MODEL_JSON).expect("model"))
}

/// A pool over a fresh file database loaded with the company schema.
pub fn company_pool(prefix: &str) -> Result<Pool, EoAccessError> {
    let factory = SqliteConnectionFactory::builder(unique_db_path(prefix))
        .wal(true)
        .build();
    let pool = Pool::new(factory, PoolConfig::default().with_max_size(4))?;
    pool.with_channel(|channel| channel.execute_batch(SCHEMA))?;
    Ok(pool)
}

pub fn text(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_text)
        .map(str::to_string)
        .unwrap_or_default()
}
