//! BigQuery client against an in-process fake of the jobs API.

mod common;

use serde_json::json;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use common::fake_bigquery::{BROKEN_TABLE, FORBIDDEN_PROJECT, TOKEN, start_fake};
use walrus::config::BigQueryConfig;
use walrus::warehouse::{BigQueryWarehouse, TokenSource};
use walrus::{
    LoadError, LoadRequest, StorageObjectRef, StorageProvider, TableRef, WarehouseError,
    WarehouseLoader, WarehouseService,
};

fn warehouse(endpoint: &str) -> BigQueryWarehouse {
    let config = BigQueryConfig {
        endpoint: endpoint.to_string(),
        poll_interval_ms: 5,
        ..BigQueryConfig::default()
    };
    BigQueryWarehouse::with_token_source(config, TokenSource::Static(TOKEN.to_string())).unwrap()
}

fn request(project: &str, table: &str) -> LoadRequest {
    LoadRequest::parquet(
        StorageObjectRef::new("gs://de-porto", format!("qoala/{table}.parquet")),
        TableRef::new(project, "tmdb", table),
    )
}

#[tokio::test]
async fn test_load_job_polled_until_done() {
    let (endpoint, state) = start_fake().await;
    let warehouse = warehouse(&endpoint);

    let mut job = warehouse
        .submit_load(&request("de-porto", "movies"))
        .await
        .unwrap();
    assert!(job.id().starts_with("walrus_load_"));
    job.wait().await.unwrap();

    let state = state.lock().unwrap();
    assert_eq!(state.inserts.len(), 1);

    let load = &state.inserts[0]["configuration"]["load"];
    assert_eq!(load["sourceUris"], json!(["gs://de-porto/qoala/movies.parquet"]));
    assert_eq!(load["sourceFormat"], "PARQUET");
    assert_eq!(load["destinationTable"]["datasetId"], "tmdb");
    assert_eq!(load["destinationTable"]["tableId"], "movies");

    // RUNNING, then DONE; the location comes from the insert response.
    assert_eq!(state.polls.values().copied().collect::<Vec<_>>(), vec![2]);
    assert!(
        state
            .poll_locations
            .iter()
            .all(|location| location.as_deref() == Some("US"))
    );
}

#[tokio::test]
async fn test_job_error_result_fails_wait() {
    let (endpoint, _state) = start_fake().await;
    let warehouse = warehouse(&endpoint);

    let mut job = warehouse
        .submit_load(&request("de-porto", BROKEN_TABLE))
        .await
        .unwrap();
    let err = job.wait().await.unwrap_err();

    match err {
        WarehouseError::JobFailed {
            job_id,
            reason,
            message,
        } => {
            assert_eq!(job_id, job.id());
            assert_eq!(reason, "invalid");
            assert!(message.contains("does not match the target STRING"));
        }
        other => panic!("expected job failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_insert_rejected_with_api_message() {
    let (endpoint, state) = start_fake().await;
    let warehouse = warehouse(&endpoint);

    let err = match warehouse
        .submit_load(&request(FORBIDDEN_PROJECT, "movies"))
        .await
    {
        Ok(_) => panic!("insert into a forbidden project succeeded"),
        Err(err) => err,
    };

    assert!(matches!(
        err,
        WarehouseError::Api { operation: "jobs.insert", status: 403, ref message }
            if message.starts_with("Access Denied")
    ));
    assert!(state.lock().unwrap().inserts.is_empty());
}

#[tokio::test]
async fn test_bad_token_is_api_error() {
    let (endpoint, _state) = start_fake().await;
    let warehouse = BigQueryWarehouse::with_token_source(
        BigQueryConfig {
            endpoint,
            ..BigQueryConfig::default()
        },
        TokenSource::Static("stale".to_string()),
    )
    .unwrap();

    let err = match warehouse.submit_load(&request("de-porto", "movies")).await {
        Ok(_) => panic!("insert with a stale token succeeded"),
        Err(err) => err,
    };
    assert!(matches!(err, WarehouseError::Api { status: 401, .. }));
}

#[tokio::test]
async fn test_loader_against_fake_bigquery() {
    let (endpoint, state) = start_fake().await;

    let dir = TempDir::new().unwrap();
    let parts = dir.path().join("qoala").join("series.parquet");
    fs::create_dir_all(&parts).unwrap();
    fs::write(parts.join("_SUCCESS"), b"").unwrap();
    fs::write(parts.join("part-00000.snappy.parquet"), b"PAR1").unwrap();
    fs::write(parts.join("part-00001.snappy.parquet"), b"PAR1").unwrap();

    let provider = StorageProvider::for_url(&dir.path().display().to_string()).unwrap();
    let root = provider.root_uri().to_string();
    let loader = WarehouseLoader::new(Arc::new(provider), Arc::new(warehouse(&endpoint)));

    let report = loader
        .load_to_table("qoala/series.parquet", &TableRef::new("de-porto", "tmdb", "series"))
        .await
        .unwrap();
    assert_eq!(report.objects_loaded, 2);

    let mut uris: Vec<String> = state
        .lock()
        .unwrap()
        .inserts
        .iter()
        .map(|body| body["configuration"]["load"]["sourceUris"][0].as_str().unwrap().to_string())
        .collect();
    uris.sort();
    assert_eq!(
        uris,
        vec![
            format!("{root}/qoala/series.parquet/part-00000.snappy.parquet"),
            format!("{root}/qoala/series.parquet/part-00001.snappy.parquet"),
        ]
    );
}

#[tokio::test]
async fn test_loader_stops_after_failed_job() {
    let (endpoint, state) = start_fake().await;

    let dir = TempDir::new().unwrap();
    let parts = dir.path().join("qoala").join("broken.parquet");
    fs::create_dir_all(&parts).unwrap();
    for part in 0..3 {
        fs::write(parts.join(format!("part-0000{part}.parquet")), b"PAR1").unwrap();
    }

    let provider = StorageProvider::for_url(&dir.path().display().to_string()).unwrap();
    let loader = WarehouseLoader::new(Arc::new(provider), Arc::new(warehouse(&endpoint)));

    let err = loader
        .load_to_table(
            "qoala/broken.parquet",
            &TableRef::new("de-porto", "tmdb", BROKEN_TABLE),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, LoadError::Complete { .. }));
    assert_eq!(state.lock().unwrap().inserts.len(), 1);
}
