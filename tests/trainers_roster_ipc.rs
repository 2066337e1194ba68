mod common;

use common::spawn_sidecar;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn trainer_crud_records_creator_and_edit_history() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut s = spawn_sidecar(dir.path());
    s.open_workspace(dir.path());

    let anon = s.request_ok(
        "1",
        "trainers.create",
        json!({ "name": "Anon", "subject": "Art" }),
    );
    assert_eq!(anon["trainer"]["creatorEmail"], json!("Unknown"));

    s.request_ok("2", "admins.add", json!({ "email": "head@school.test" }));
    s.request_ok("3", "session.signIn", json!({ "email": "head@school.test" }));
    let created = s.request_ok(
        "4",
        "trainers.create",
        json!({
            "name": "John Doe",
            "email": "john@school.test",
            "subject": "Computer Science",
            "batches": ["SOC1", "SOC2"]
        }),
    );
    let tid = created["trainerId"].as_str().expect("trainerId").to_string();
    assert_eq!(created["trainer"]["creatorEmail"], json!("head@school.test"));
    assert_eq!(created["trainer"]["editHistory"], json!([]));

    let updated = s.request_ok(
        "5",
        "trainers.update",
        json!({ "trainerId": tid, "patch": { "subject": "Data Science", "batches": ["SOC2", "SOC1"] } }),
    );
    let history = updated["trainer"]["editHistory"].as_array().expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["editorEmail"], json!("head@school.test"));
    assert_eq!(history[0]["changedFields"], json!(["subject"]));

    let unchanged = s.request_ok(
        "6",
        "trainers.update",
        json!({ "trainerId": tid, "patch": { "name": "John Doe" } }),
    );
    assert_eq!(unchanged["trainer"]["editHistory"].as_array().map(Vec::len), Some(1));

    assert_eq!(
        s.request_err("7", "trainers.create", json!({ "name": "No Subject" })),
        "bad_params"
    );
    s.request_ok("8", "trainers.delete", json!({ "trainerId": tid }));
    assert_eq!(
        s.request_err("9", "trainers.get", json!({ "trainerId": tid })),
        "not_found"
    );
}

#[test]
fn batch_labels_add_and_remove_one_occurrence() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut s = spawn_sidecar(dir.path());
    s.open_workspace(dir.path());

    let created = s.request_ok(
        "1",
        "trainers.create",
        json!({ "name": "John", "subject": "CS", "batches": ["SOC1", "SOC2"] }),
    );
    let tid = created["trainerId"].as_str().expect("trainerId").to_string();

    let added = s.request_ok(
        "2",
        "trainers.addBatch",
        json!({ "trainerId": tid, "batch": "  SOC3 " }),
    );
    assert_eq!(added["trainer"]["batches"], json!(["SOC1", "SOC2", "SOC3"]));
    assert_eq!(added["notice"], json!("Batch SOC3 added successfully"));

    assert_eq!(
        s.request_err("3", "trainers.addBatch", json!({ "trainerId": tid, "batch": "SOC1" })),
        "bad_params"
    );

    let removed = s.request_ok(
        "4",
        "trainers.removeBatch",
        json!({ "trainerId": tid, "batch": "SOC2" }),
    );
    assert_eq!(removed["trainer"]["batches"], json!(["SOC1", "SOC3"]));
    assert_eq!(
        s.request_err("5", "trainers.removeBatch", json!({ "trainerId": tid, "batch": "SOC2" })),
        "not_found"
    );
}

#[test]
fn roster_index_and_search_filters() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut s = spawn_sidecar(dir.path());
    s.open_workspace(dir.path());

    s.request_ok(
        "1",
        "trainers.create",
        json!({ "name": "John", "subject": "CS", "batches": ["SOC1", "SOC2"] }),
    );
    s.request_ok(
        "2",
        "trainers.create",
        json!({ "name": "Mary", "subject": "Math", "batches": ["SOC2", "MTH1"] }),
    );
    s.request_ok(
        "3",
        "students.create",
        json!({ "name": "Ali", "email": "ali@school.test", "phone": "0300-1", "batches": ["SOC1", "LOST"] }),
    );

    let roster = s.request_ok("4", "roster.batches", json!({}));
    assert_eq!(roster["labels"], json!(["SOC1", "SOC2", "MTH1"]));
    assert_eq!(roster["orphans"], json!(["LOST"]));
    let soc1 = roster["batches"]
        .as_array()
        .expect("batches")
        .iter()
        .find(|b| b["label"] == json!("SOC1"))
        .cloned()
        .expect("SOC1 summary");
    assert_eq!(soc1["hasTrainer"], json!(true));
    assert_eq!(soc1["studentIds"].as_array().map(Vec::len), Some(1));

    let subjects = s.request_ok("5", "roster.subjects", json!({}));
    assert_eq!(subjects["subjects"], json!(["CS", "Math"]));
    let math = s.request_ok("6", "roster.batchesForSubject", json!({ "subject": "Math" }));
    assert_eq!(math["batches"], json!(["SOC2", "MTH1"]));

    let by_batch = s.request_ok("7", "trainers.list", json!({ "query": "mth" }));
    assert_eq!(by_batch["trainers"].as_array().map(Vec::len), Some(1));
    assert_eq!(by_batch["trainers"][0]["name"], json!("Mary"));

    let sorted = s.request_ok(
        "8",
        "trainers.list",
        json!({ "sort": { "key": "name", "direction": "desc" } }),
    );
    let names: Vec<_> = sorted["trainers"]
        .as_array()
        .expect("trainers")
        .iter()
        .map(|t| t["name"].clone())
        .collect();
    assert_eq!(names, vec![json!("Mary"), json!("John")]);

    let by_phone = s.request_ok("9", "students.list", json!({ "query": "0300" }));
    assert_eq!(by_phone["students"].as_array().map(Vec::len), Some(1));
}

#[test]
fn student_update_preserves_creator_and_created_at() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut s = spawn_sidecar(dir.path());
    s.open_workspace(dir.path());
    s.request_ok("0", "session.signIn", json!({ "email": "desk@school.test" }));

    let created = s.request_ok(
        "1",
        "students.create",
        json!({ "name": "Ali", "email": "ali@school.test" }),
    );
    let sid = created["studentId"].as_str().expect("studentId").to_string();
    s.request_ok("2", "session.signIn", json!({ "email": "other@school.test" }));

    let updated = s.request_ok(
        "3",
        "students.update",
        json!({ "studentId": sid, "patch": { "phone": "0300-9", "batches": ["SOC1"] } }),
    );
    assert_eq!(updated["student"]["creatorEmail"], json!("desk@school.test"));
    assert_eq!(updated["student"]["createdAt"], created["student"]["createdAt"]);
    assert_eq!(updated["student"]["phone"], json!("0300-9"));

    let fetched = s.request_ok("4", "students.get", json!({ "studentId": sid }));
    assert_eq!(fetched["student"], updated["student"]);

    s.request_ok("5", "students.delete", json!({ "studentId": sid }));
    assert_eq!(
        s.request_err("6", "students.delete", json!({ "studentId": sid })),
        "not_found"
    );
}

#[test]
fn slash_batch_labels_are_refused_on_every_write() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut s = spawn_sidecar(dir.path());
    s.open_workspace(dir.path());

    assert_eq!(
        s.request_err(
            "1",
            "trainers.create",
            json!({ "name": "John", "subject": "CS", "batches": ["A/B"] }),
        ),
        "bad_params"
    );
    assert_eq!(
        s.request_err(
            "2",
            "students.create",
            json!({ "name": "Ali", "email": "ali@school.test", "batches": ["A/B"] }),
        ),
        "bad_params"
    );

    let trainer = s.request_ok(
        "3",
        "trainers.create",
        json!({ "name": "John", "subject": "CS", "batches": ["SOC1"] }),
    );
    let tid = trainer["trainerId"].as_str().expect("trainerId").to_string();
    assert_eq!(
        s.request_err("4", "trainers.addBatch", json!({ "trainerId": tid, "batch": "SOC/2" })),
        "bad_params"
    );
    assert_eq!(
        s.request_err(
            "5",
            "trainers.update",
            json!({ "trainerId": tid, "patch": { "batches": ["X/Y"] } }),
        ),
        "bad_params"
    );

    let student = s.request_ok(
        "6",
        "students.create",
        json!({ "name": "Ali", "email": "ali@school.test", "batches": ["SOC1"] }),
    );
    let sid = student["studentId"].as_str().expect("studentId").to_string();
    assert_eq!(
        s.request_err(
            "7",
            "students.update",
            json!({ "studentId": sid, "patch": { "batches": ["A/B"] } }),
        ),
        "bad_params"
    );

    let roster = s.request_ok("8", "roster.batches", json!({}));
    assert_eq!(roster["labels"], json!(["SOC1"]));
    s.request_ok("9", "session.signIn", json!({ "email": "ali@school.test" }));
    let profile = s.request_ok("10", "session.profile", json!({}));
    assert_eq!(profile["defaultBatch"], json!("SOC1"));
}
