use querymap_core::{bootstrap, BootConfig, BootstrapError, DataValue};
use std::path::Path;
use tempfile::TempDir;

fn write_file(root: &Path, relative: &str, body: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().expect("parent dir")).expect("create dirs");
    std::fs::write(path, body).expect("write file");
}

fn seed_database(path: &Path) {
    let conn = querymap_core::open_database(path).expect("seed connection");
    conn.execute_batch(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         INSERT INTO users (id, name) VALUES (1, 'alice'), (2, 'bob');",
    )
    .expect("seed schema");
}

fn write_fixture(root: &Path) {
    write_file(
        root,
        "contracts/app/dao/IUserDao.contract.json",
        r#"{
            "name": "app.dao.IUserDao",
            "methods": [
                {"name": "queryUserNameById", "param": "integer", "returns": "text"},
                {"name": "countUsers", "returns": "integer"},
                {"name": "queryUserScoreById", "param": "integer", "returns": "real"}
            ]
        }"#,
    );
    write_file(
        root,
        "statements.json",
        r#"{
            "statements": [
                {
                    "id": "app.dao.IUserDao.queryUserNameById",
                    "sql": "SELECT name FROM users WHERE id = ?1",
                    "result": "text"
                },
                {
                    "id": "app.dao.IUserDao.countUsers",
                    "sql": "SELECT COUNT(*) FROM users",
                    "result": "integer"
                }
            ]
        }"#,
    );
    let database = root.join("users.sqlite3");
    seed_database(&database);
    write_file(
        root,
        "config.json",
        &format!(
            r#"{{
                "base_namespace": "app.dao",
                "contracts_root": "contracts",
                "statements": "statements.json",
                "database": "{}"
            }}"#,
            database.display()
        ),
    );
}

#[test]
fn bootstrap_wires_a_runnable_registry_from_one_config_resource() {
    let dir = TempDir::new().expect("temp dir");
    write_fixture(dir.path());

    let config = BootConfig::from_path(dir.path().join("config.json")).expect("config");
    let bootstrapped = bootstrap(&config).expect("bootstrap");

    assert_eq!(
        bootstrapped.report.component_ids,
        vec!["iUserDao".to_string()]
    );

    let proxy = bootstrapped.registry.get("iUserDao").expect("proxy");
    assert_eq!(
        proxy.invoke("queryUserNameById", &[DataValue::Integer(1)]),
        DataValue::Text("alice".to_string())
    );
    assert_eq!(proxy.invoke("countUsers", &[]), DataValue::Integer(2));

    // No matching row: generated methods resolve to the declared default.
    assert_eq!(
        proxy.invoke("queryUserNameById", &[DataValue::Integer(99)]),
        DataValue::Text(String::new())
    );

    // Declared method without a registered statement: the engine fault is
    // swallowed and the declared default comes back.
    assert_eq!(
        proxy.invoke("queryUserScoreById", &[DataValue::Integer(1)]),
        DataValue::Real(0.0)
    );
}

#[test]
fn bootstrap_fails_when_the_statements_resource_is_missing() {
    let dir = TempDir::new().expect("temp dir");
    write_fixture(dir.path());
    std::fs::remove_file(dir.path().join("statements.json")).expect("drop statements");

    let config = BootConfig::from_path(dir.path().join("config.json")).expect("config");
    let err = bootstrap(&config).expect_err("missing statements must fail");
    assert!(matches!(err, BootstrapError::Statements(_)));
}

#[test]
fn bootstrap_fails_when_the_namespace_is_missing() {
    let dir = TempDir::new().expect("temp dir");
    write_fixture(dir.path());
    std::fs::remove_dir_all(dir.path().join("contracts")).expect("drop contracts");

    let config = BootConfig::from_path(dir.path().join("config.json")).expect("config");
    let err = bootstrap(&config).expect_err("missing namespace must fail");
    assert!(matches!(err, BootstrapError::Scan(_)));
}

#[test]
fn config_resolves_relative_paths_against_its_own_directory() {
    let dir = TempDir::new().expect("temp dir");
    write_fixture(dir.path());

    let config = BootConfig::from_path(dir.path().join("config.json")).expect("config");
    assert_eq!(config.contracts_root, dir.path().join("contracts"));
    assert_eq!(config.statements, dir.path().join("statements.json"));
}
