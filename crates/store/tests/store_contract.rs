use std::io::Write;

use chrono::{TimeZone, Utc};

use cotiza_core::period::Window;
use cotiza_store::{DemoDataset, JsonDatasetSource, RecordLoader};

fn demo_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create dataset file");
    file.write_all(DemoDataset::JSON.as_bytes()).expect("write dataset file");
    file
}

#[tokio::test]
async fn json_loader_round_trips_the_demo_export() {
    let file = demo_file();
    let loader = RecordLoader::from_json(JsonDatasetSource::open(file.path()));

    let snapshot = loader.load().await.expect("load snapshot");

    let verification = DemoDataset::verify(&snapshot);
    assert!(verification.all_present, "failed checks: {:?}", verification.checks);
}

#[tokio::test]
async fn loaded_snapshot_correlates_to_latest_versions_only() {
    let file = demo_file();
    let loader = RecordLoader::from_json(JsonDatasetSource::open(file.path()));
    let snapshot = loader.load().await.expect("load snapshot");

    let window = Window::explicit(
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap(),
    );
    let view = snapshot.correlate(&window);

    let revised = view
        .latest_budgets
        .iter()
        .find(|document| document.budget_id == "1001")
        .expect("revised budget");
    assert_eq!(revised.version, 3);

    // Budget 3001 has no quotation row; the assignee resolves from the
    // document's embedded snapshot with id 0.
    let drifted = view
        .latest_budgets
        .iter()
        .find(|document| document.budget_id == "3001")
        .expect("drifted budget");
    let assignee = view.resolve_assignee(drifted);
    assert_eq!(assignee.id, 0);
    assert_eq!(assignee.name, "Marta Suarez");
}
