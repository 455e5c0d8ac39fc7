//! Behavioural smoke tests for the CLI entrypoint.

use assert_cmd::cargo::cargo_bin_cmd;
use camino::Utf8PathBuf;
use cap_std::{ambient_authority, fs_utf8::Dir};
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn cli_without_arguments_prints_help() {
    let mut cmd = cargo_bin_cmd!("terraform-provider-osc");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn version_matches_package_manifest() {
    let mut cmd = cargo_bin_cmd!("terraform-provider-osc");
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn resources_lists_builtin_catalog() {
    let mut cmd = cargo_bin_cmd!("terraform-provider-osc");
    cmd.arg("resources")
        .assert()
        .success()
        .stdout(predicate::str::contains("osc_valkey_instance\n"))
        .stdout(predicate::str::contains("osc_minio_instance\n"));
}

#[test]
fn schema_prints_json_with_computed_attributes() {
    let mut cmd = cargo_bin_cmd!("terraform-provider-osc");
    cmd.args(["schema", "osc_valkey_instance"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"external_port\""))
        .stdout(predicate::str::contains("\"computed\": true"));
}

#[test]
fn schema_rejects_unknown_resource_type() {
    let mut cmd = cargo_bin_cmd!("terraform-provider-osc");
    cmd.args(["schema", "osc_missing_instance"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown resource type: osc_missing_instance"));
}

#[test]
fn catalog_file_adds_resource_types() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
        .unwrap_or_else(|path| panic!("temp dir should be utf8: {}", path.display()));
    let catalog = json!({
        "services": [{
            "resource_type": "osc_example_instance",
            "service_id": "example-service",
            "description": "Example"
        }]
    });
    Dir::open_ambient_dir(&root, ambient_authority())
        .unwrap_or_else(|err| panic!("open temp dir: {err}"))
        .write("extra.json", catalog.to_string())
        .unwrap_or_else(|err| panic!("write catalog: {err}"));

    let mut cmd = cargo_bin_cmd!("terraform-provider-osc");
    cmd.args(["--catalog", root.join("extra.json").as_str(), "resources"])
        .assert()
        .success()
        .stdout(predicate::str::contains("osc_example_instance\n"));
}

#[test]
fn create_without_token_reports_configuration_error() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let mut cmd = cargo_bin_cmd!("terraform-provider-osc");
    cmd.current_dir(tmp.path())
        .env_remove("OSC_PERSONAL_ACCESS_TOKEN")
        .args(["create", "osc_valkey_instance", "--name", "cache1"])
        .assert()
        .code(1)
        .stdout("");
}

#[test]
fn create_rejects_malformed_assignments() {
    let mut cmd = cargo_bin_cmd!("terraform-provider-osc");
    cmd.args([
        "create",
        "osc_channel_engine_instance",
        "--name",
        "demo",
        "--set",
        "novalue",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("expected KEY=VALUE"));
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_calls_the_platform() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/servicetoken"))
        .and(header("x-pat-jwt", "Bearer cli-pat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "svc-token" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/valkey-io-valkey/valkey-io-valkey/cache1"))
        .and(header("x-jwt", "Bearer svc-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let mut cmd = cargo_bin_cmd!("terraform-provider-osc");
    cmd.current_dir(tmp.path())
        .env("OSC_PERSONAL_ACCESS_TOKEN", "cli-pat")
        .env("OSC_TOKEN_URL", format!("{}/servicetoken", server.uri()))
        .env(
            "OSC_API_URL_TEMPLATE",
            format!("{}/{{service_id}}", server.uri()),
        )
        .args(["delete", "osc_valkey_instance", "--name", "cache1"])
        .assert()
        .success()
        .stdout("");
}
