//! Company store integration tests over a temporary data root: posting CRUD,
//! eligibility attach/check and upload path handling.

use anyhow::Result;
use tempfile::tempdir;

use easyprep::eligibility::extract_register_column;
use easyprep::storage::{NewCompany, Store};

fn posting(name: &str) -> NewCompany {
    NewCompany {
        name: name.to_string(),
        role_title: "Graduate Engineer Trainee".into(),
        description: "Campus drive".into(),
        package: Some("6.5 LPA".into()),
        visit_date: Some("2026-09-15".into()),
        eligible_departments: vec!["Information Technology".into()],
        eligible_students_file: None,
    }
}

#[test]
fn add_list_get_delete_round_trip() -> Result<()> {
    let tmp = tempdir()?;
    let store = Store::new(tmp.path())?;

    assert!(store.list_companies()?.is_empty());

    let a = store.add_company(posting("Acme"))?;
    let b = store.add_company(posting("Globex"))?;
    assert_eq!(store.list_companies()?.len(), 2);

    let got = store.get_company(&a.id).unwrap();
    assert_eq!(got.name, "Acme");
    assert_eq!(got.created_at, a.created_at);

    store.delete_company(&b.id).unwrap();
    assert_eq!(store.list_companies()?.len(), 1);

    let miss = store.get_company(&b.id).unwrap_err();
    assert_eq!(miss.http_status(), 404);
    let miss = store.delete_company("no-such-id").unwrap_err();
    assert_eq!(miss.http_status(), 404);
    Ok(())
}

#[test]
fn postings_persist_across_store_reopen() -> Result<()> {
    let tmp = tempdir()?;
    let id = {
        let store = Store::new(tmp.path())?;
        store.add_company(posting("Acme"))?.id
    };

    let store = Store::new(tmp.path())?;
    assert_eq!(store.get_company(&id).unwrap().name, "Acme");
    Ok(())
}

#[test]
fn eligibility_attach_and_membership_check() -> Result<()> {
    let tmp = tempdir()?;
    let store = Store::new(tmp.path())?;
    let company = store.add_company(posting("Acme"))?;
    assert!(company.eligibility.is_none());

    let grid: Vec<Vec<String>> = vec![
        vec!["Name".into(), "Register Number".into()],
        vec!["Alice".into(), "CS101".into()],
        vec!["Bob".into(), " cs102 ".into()],
        vec!["Carol".into(), "CS101".into()],
    ];
    let list = extract_register_column(&grid)?;
    let updated = store.set_eligibility(&company.id, list).unwrap();

    let attached = updated.eligibility.expect("list attached");
    assert_eq!(attached.raw().len(), 3);
    assert_eq!(attached.unique_count(), 2);
    assert!(attached.is_eligible("CS102"));
    assert!(!attached.is_eligible("CS999"));

    // The attached list survives a reopen with the raw values intact.
    let store = Store::new(tmp.path())?;
    let reread = store.get_company(&company.id).unwrap();
    let list = reread.eligibility.expect("persisted list");
    assert_eq!(list.raw(), &["CS101".to_string(), " cs102 ".to_string(), "CS101".to_string()]);
    assert!(list.is_eligible(" cs101"));
    Ok(())
}

#[test]
fn set_eligibility_on_missing_company_is_not_found() -> Result<()> {
    let tmp = tempdir()?;
    let store = Store::new(tmp.path())?;
    let grid: Vec<Vec<String>> = vec![
        vec!["Register Number".into()],
        vec!["CS101".into()],
    ];
    let err = store.set_eligibility("no-such-id", extract_register_column(&grid)?).unwrap_err();
    assert_eq!(err.http_status(), 404);
    Ok(())
}

#[test]
fn upload_paths_stay_inside_the_uploads_dir() -> Result<()> {
    let tmp = tempdir()?;
    let store = Store::new(tmp.path())?;

    assert!(store.upload_path("../users.json").is_err());
    assert!(store.upload_path("a/b.xlsx").is_err());
    assert!(store.upload_path("..\\users.json").is_err());

    let err = store.read_upload("missing.xlsx").unwrap_err();
    assert_eq!(err.http_status(), 404);

    std::fs::write(store.uploads_dir().join("list.xlsx"), b"stub")?;
    assert_eq!(store.read_upload("list.xlsx").unwrap(), b"stub");
    Ok(())
}
