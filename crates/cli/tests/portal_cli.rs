use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[allow(deprecated)]
fn portal() -> Command {
    Command::cargo_bin("portal").expect("binary")
}

fn write(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn setup_portal() -> tempfile::TempDir {
    let temp = tempdir().unwrap();
    let root = temp.path();
    write(
        &root.join("portalConfig.json"),
        r#"{
          "portalID": "mmm",
          "perspectives": {
            "searchPerspectives": ["manuscripts", "clientFSPlaces"],
            "onlyInstancePages": ["places"]
          }
        }"#,
    );
    let base = root.join("mmm/perspective_configs");
    write(
        &base.join("search_perspectives/manuscripts.json"),
        r#"{
          "id": "manuscripts",
          "searchMode": "faceted-search",
          "resultClasses": { "manuscripts": { "paginatedResultsConfig": { "pagesize": 5 } } },
          "facets": { "author": { "label": "Author" }, "creationPlace": {} }
        }"#,
    );
    write(
        &base.join("search_perspectives/clientFSPlaces.toml"),
        r#"
id = "clientFSPlaces"
searchMode = "federated-search"

[datasets.tgn]
endpoint = "http://tgn.example/sparql"

[datasets.pnr]
endpoint = "http://pnr.example/sparql"
"#,
    );
    write(
        &base.join("only_instance_pages/places.json"),
        r#"{ "id": "places", "resultClasses": { "places": {} } }"#,
    );
    temp
}

#[test]
fn check_lists_keys_per_perspective() {
    let temp = setup_portal();
    let output = portal()
        .arg("check")
        .arg(temp.path())
        .arg("--json")
        .output()
        .expect("command run");
    assert!(output.status.success());

    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(body["portalId"], "mmm");
    assert_eq!(
        body["perspectives"][0]["keys"],
        serde_json::json!(["manuscripts", "manuscriptsFacets", "manuscriptsFacetsConstrainSelf"])
    );
    assert_eq!(body["perspectives"][1]["mode"], "federated-search");
    assert_eq!(body["perspectives"][2]["mode"], "instance-page");
}

#[test]
fn check_fails_on_unknown_search_mode() {
    let temp = setup_portal();
    write(
        &temp
            .path()
            .join("mmm/perspective_configs/search_perspectives/manuscripts.json"),
        r#"{ "id": "manuscripts", "searchMode": "map-search" }"#,
    );
    portal()
        .arg("check")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("map-search"));
}

#[test]
fn replay_reports_transitions_and_final_state() {
    let temp = setup_portal();
    let script = temp.path().join("script.jsonl");
    fs::write(
        &script,
        concat!(
            r#"{"type": "FACET_SELECTED", "perspectiveId": "manuscripts", "property": "author", "value": "a1"}"#,
            "\n",
            r#"{"type": "DATASET_TOGGLED", "perspectiveId": "clientFSPlaces", "datasetId": "nope"}"#,
            "\n",
            r#"{"type": "MAP_TOGGLED", "perspectiveId": "ghost", "mapId": "m"}"#,
            "\n"
        ),
    )
    .unwrap();

    let output = portal()
        .arg("replay")
        .arg(temp.path())
        .arg("--script")
        .arg(&script)
        .arg("--quiet")
        .output()
        .expect("command run");
    assert!(output.status.success());

    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    let steps = body["steps"].as_array().unwrap();
    assert_eq!(steps[0]["outcome"], "applied");
    assert_eq!(steps[0]["intents"].as_array().unwrap().len(), 4);
    assert_eq!(steps[1]["outcome"], "rejected");
    assert_eq!(steps[2]["outcome"], "unhandled");
    assert_eq!(
        body["snapshot"]["manuscriptsFacetsConstrainSelf"]["facets"]["author"]["selectionsSet"],
        serde_json::json!(["a1"])
    );
}

#[test]
fn simulate_loads_every_perspective_from_fixtures() {
    let temp = setup_portal();
    let fixtures = temp.path().join("fixtures.json");
    fs::write(
        &fixtures,
        r#"{
          "manuscripts": {
            "rows": [{"id": "m1"}, {"id": "m2"}],
            "totalResults": 2,
            "facetValues": { "author": [{ "value": "a1", "count": 2 }] }
          },
          "clientFSPlaces": {
            "datasets": [
              { "datasetId": "tgn", "rows": [{"id": "t1"}], "totalResults": 1 },
              { "datasetId": "pnr", "rows": [{"id": "p1"}], "totalResults": 1 }
            ]
          },
          "places": { "rows": [{"id": "pl1"}] }
        }"#,
    )
    .unwrap();

    let output = portal()
        .arg("simulate")
        .arg(temp.path())
        .arg("--fixtures")
        .arg(&fixtures)
        .arg("--quiet")
        .output()
        .expect("command run");
    assert!(output.status.success());

    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(body["manuscripts"]["totalResults"], 2);
    assert_eq!(body["manuscripts"]["fetchStatus"], "success");
    assert_eq!(
        body["manuscriptsFacets"]["facets"]["author"]["availableValues"][0]["value"],
        "a1"
    );
    assert_eq!(body["clientFSPlaces"]["totalResults"], 2);
    assert_eq!(body["places"]["rows"][0]["id"], "pl1");
}

#[test]
fn toc_picks_first_overlapping_part() {
    let temp = tempdir().unwrap();
    let toc = temp.path().join("toc.json");
    fs::write(
        &toc,
        r#"[
          { "id": "p1", "beginTimeInSeconds": 0, "endTimeInSeconds": 60 },
          { "id": "p2", "beginTimeInSeconds": 30, "endTimeInSeconds": 90 }
        ]"#,
    )
    .unwrap();

    portal()
        .arg("toc")
        .arg(&toc)
        .arg("--at")
        .arg("45")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"p1\""));
}

#[test]
fn simulate_pages_into_the_second_dataset() {
    let temp = setup_portal();
    let fixtures = temp.path().join("fixtures.json");
    fs::write(
        &fixtures,
        r#"{
          "clientFSPlaces": {
            "datasets": [
              { "datasetId": "tgn", "totalResults": 6,
                "rows": [{"id": "t0"}, {"id": "t1"}, {"id": "t2"}, {"id": "t3"}, {"id": "t4"}, {"id": "t5"}] },
              { "datasetId": "pnr", "totalResults": 4,
                "rows": [{"id": "p0"}, {"id": "p1"}, {"id": "p2"}, {"id": "p3"}] }
            ]
          }
        }"#,
    )
    .unwrap();
    let script = temp.path().join("page.json");
    fs::write(
        &script,
        r#"[{"type": "PAGE_CHANGED", "perspectiveId": "clientFSPlaces", "page": 1}]"#,
    )
    .unwrap();

    let output = portal()
        .arg("simulate")
        .arg(temp.path())
        .arg("--fixtures")
        .arg(&fixtures)
        .arg("--script")
        .arg(&script)
        .arg("--quiet")
        .output()
        .expect("command run");
    assert!(output.status.success());

    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    let federated = &body["clientFSPlaces"];
    assert_eq!(federated["currentPage"], 1);
    assert_eq!(federated["totalResults"], 10);
    let ids: Vec<&str> = federated["rows"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|row| row["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["t5", "p0", "p1", "p2", "p3"]);
}
