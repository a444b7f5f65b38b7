use querymap_core::{
    scan_contracts, BindingRegistry, ComponentScope, DataValue, DuplicatePolicy, EngineHandle,
    EngineResult, OperationEngine, OperationSession, RegistrationRecord, RegistryError, ScanError,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

struct StaticEngine {
    value: DataValue,
}

impl OperationEngine for StaticEngine {
    fn open_session(&self) -> EngineResult<Box<dyn OperationSession + '_>> {
        Ok(Box::new(StaticSession {
            value: self.value.clone(),
        }))
    }
}

struct StaticSession {
    value: DataValue,
}

impl OperationSession for StaticSession {
    fn fetch_one(&mut self, _operation_id: &str, _param: &DataValue) -> EngineResult<Option<DataValue>> {
        Ok(Some(self.value.clone()))
    }
}

fn static_engine(value: DataValue) -> EngineHandle {
    Arc::new(StaticEngine { value })
}

fn write_resource(root: &Path, relative: &str, body: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().expect("parent dir")).expect("create namespace dirs");
    std::fs::write(path, body).expect("write declaration");
}

fn user_dao_declaration(name: &str) -> String {
    format!(
        r#"{{
            "name": "{name}",
            "methods": [
                {{"name": "queryUserInfoById", "param": "integer", "returns": "text"}}
            ]
        }}"#
    )
}

#[test]
fn scan_registers_every_declaration_under_the_namespace() {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();
    write_resource(
        root,
        "app/dao/IUserDao.contract.json",
        &user_dao_declaration("app.dao.IUserDao"),
    );
    write_resource(
        root,
        "app/dao/IOrderDao.contract.json",
        &user_dao_declaration("app.dao.IOrderDao"),
    );
    write_resource(
        root,
        "app/dao/internal/IAuditDao.contract.json",
        &user_dao_declaration("app.dao.internal.IAuditDao"),
    );
    // Non-declaration files are not qualifying resources.
    write_resource(root, "app/dao/README.md", "notes");
    write_resource(root, "app/dao/fixtures.json", "{}");

    let mut registry = BindingRegistry::new();
    let report = scan_contracts(root, "app.dao", static_engine(DataValue::Null), &mut registry)
        .expect("scan should succeed");

    assert_eq!(
        report.component_ids,
        vec![
            "iAuditDao".to_string(),
            "iOrderDao".to_string(),
            "iUserDao".to_string()
        ]
    );
    assert!(report.overwritten.is_empty());
    assert_eq!(registry.component_ids(), report.component_ids);

    let record = registry.record("iUserDao").expect("record");
    assert_eq!(record.contract_name, "app.dao.IUserDao");
    assert_eq!(record.scope, ComponentScope::Singleton);
}

#[test]
fn scanning_an_empty_namespace_yields_zero_records() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::create_dir_all(dir.path().join("app/dao")).expect("empty namespace dir");

    let mut registry = BindingRegistry::new();
    let report = scan_contracts(
        dir.path(),
        "app.dao",
        static_engine(DataValue::Null),
        &mut registry,
    )
    .expect("empty scan should succeed");

    assert!(report.is_empty());
    assert!(registry.is_empty());
}

#[test]
fn rescanning_an_unchanged_namespace_reproduces_the_id_set() {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();
    write_resource(
        root,
        "app/dao/IUserDao.contract.json",
        &user_dao_declaration("app.dao.IUserDao"),
    );
    write_resource(
        root,
        "app/dao/IOrderDao.contract.json",
        &user_dao_declaration("app.dao.IOrderDao"),
    );

    let engine = static_engine(DataValue::Null);
    let mut first_registry = BindingRegistry::new();
    let first = scan_contracts(root, "app.dao", engine.clone(), &mut first_registry)
        .expect("first scan");
    let mut second_registry = BindingRegistry::new();
    let second = scan_contracts(root, "app.dao", engine, &mut second_registry)
        .expect("second scan");

    assert_eq!(first.component_ids, second.component_ids);
}

#[test]
fn missing_namespace_directory_aborts_the_scan() {
    let dir = TempDir::new().expect("temp dir");
    let mut registry = BindingRegistry::new();
    let err = scan_contracts(
        dir.path(),
        "app.dao",
        static_engine(DataValue::Null),
        &mut registry,
    )
    .expect_err("missing namespace must fail");
    assert!(matches!(err, ScanError::NamespaceNotFound(_)));
}

#[test]
fn malformed_namespace_strings_are_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let mut registry = BindingRegistry::new();
    for namespace in ["", "app..dao", "app/dao", "app.2dao"] {
        let err = scan_contracts(
            dir.path(),
            namespace,
            static_engine(DataValue::Null),
            &mut registry,
        )
        .expect_err("malformed namespace must fail");
        assert!(matches!(err, ScanError::InvalidNamespace(_)));
    }
}

#[test]
fn declaration_without_a_name_aborts_the_scan() {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();
    write_resource(root, "app/dao/Broken.contract.json", r#"{"methods": []}"#);

    let mut registry = BindingRegistry::new();
    let err = scan_contracts(root, "app.dao", static_engine(DataValue::Null), &mut registry)
        .expect_err("nameless declaration must abort");
    assert!(matches!(err, ScanError::MissingContractName(_)));
}

#[test]
fn duplicate_ids_overwrite_and_are_reported_under_the_default_policy() {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();
    write_resource(
        root,
        "app/dao/users/IUserDao.contract.json",
        &user_dao_declaration("app.dao.users.IUserDao"),
    );
    write_resource(
        root,
        "app/dao/legacy/IUserDao.contract.json",
        &user_dao_declaration("app.dao.legacy.IUserDao"),
    );

    let mut registry = BindingRegistry::new();
    let report = scan_contracts(root, "app.dao", static_engine(DataValue::Null), &mut registry)
        .expect("overwrite policy scan should succeed");

    assert_eq!(report.component_ids, vec!["iUserDao".to_string()]);
    assert_eq!(report.overwritten, vec!["iUserDao".to_string()]);
    assert_eq!(registry.len(), 1);
}

#[test]
fn duplicate_ids_fail_the_scan_under_the_reject_policy() {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();
    write_resource(
        root,
        "app/dao/users/IUserDao.contract.json",
        &user_dao_declaration("app.dao.users.IUserDao"),
    );
    write_resource(
        root,
        "app/dao/legacy/IUserDao.contract.json",
        &user_dao_declaration("app.dao.legacy.IUserDao"),
    );

    let mut registry = BindingRegistry::with_policy(DuplicatePolicy::Reject);
    let err = scan_contracts(root, "app.dao", static_engine(DataValue::Null), &mut registry)
        .expect_err("duplicate ids must fail under Reject");
    assert!(matches!(
        err,
        ScanError::Registration {
            component_id,
            source: RegistryError::DuplicateComponentId(_),
        } if component_id == "iUserDao"
    ));
}

#[test]
fn registry_materializes_singleton_proxies_lazily() {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();
    write_resource(
        root,
        "app/dao/IUserDao.contract.json",
        &user_dao_declaration("app.dao.IUserDao"),
    );

    let mut registry = BindingRegistry::new();
    scan_contracts(
        root,
        "app.dao",
        static_engine(DataValue::Text("alice".to_string())),
        &mut registry,
    )
    .expect("scan");

    let proxy = registry.get("iUserDao").expect("materialized proxy");
    assert_eq!(proxy.contract_name(), "app.dao.IUserDao");
    assert_eq!(
        proxy.invoke("queryUserInfoById", &[DataValue::Integer(1)]),
        DataValue::Text("alice".to_string())
    );

    let again = registry.get("iUserDao").expect("cached proxy");
    assert!(Arc::ptr_eq(&proxy, &again));
}

#[test]
fn unsuitable_declarations_fail_their_own_component_only() {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();
    write_resource(
        root,
        "app/dao/IUserDao.contract.json",
        &user_dao_declaration("app.dao.IUserDao"),
    );
    write_resource(
        root,
        "app/dao/UserRow.contract.json",
        r#"{
            "name": "app.dao.UserRow",
            "kind": "record",
            "fields": ["id", "name"],
            "methods": []
        }"#,
    );

    let mut registry = BindingRegistry::new();
    let report = scan_contracts(root, "app.dao", static_engine(DataValue::Null), &mut registry)
        .expect("scan reads names only and must not abort");
    assert_eq!(report.len(), 2);

    let err = registry
        .get("userRow")
        .expect_err("record declaration must fail materialization");
    assert!(matches!(err, RegistryError::Proxy { .. }));

    // The sibling component is unaffected.
    registry.get("iUserDao").expect("pure contract materializes");
}

#[test]
fn materialization_rejects_contract_name_drift() {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();
    write_resource(
        root,
        "app/dao/IUserDao.contract.json",
        &user_dao_declaration("app.dao.IUserDao"),
    );

    let mut registry = BindingRegistry::new();
    registry
        .register(RegistrationRecord {
            component_id: "iUserDao".to_string(),
            contract_name: "app.dao.ISomethingElse".to_string(),
            resource: root.join("app/dao/IUserDao.contract.json"),
            scope: ComponentScope::Singleton,
            engine: static_engine(DataValue::Null),
        })
        .expect("registration");

    let err = registry.get("iUserDao").expect_err("name drift must fail");
    assert!(matches!(err, RegistryError::ContractMismatch { .. }));
}
