use assert_cmd::Command;

#[test]
fn test_create_open_list_close_round_trip() {
    let temp_dir = tempfile::tempdir().unwrap();
    let data_dir = temp_dir.path().join("appdata");
    let nb_root = temp_dir.path().join("nb1");

    let mut cmd = Command::cargo_bin("vx").unwrap();
    cmd.env("VX_DATA_DIR", &data_dir)
        .arg("notebook")
        .arg("create")
        .arg(nb_root.to_str().unwrap())
        .arg("--properties")
        .arg(r#"{"name":"Trip Notes"}"#)
        .assert()
        .success()
        .stdout(predicates::str::contains("created notebook"));

    let mut cmd = Command::cargo_bin("vx").unwrap();
    cmd.env("VX_DATA_DIR", &data_dir)
        .arg("notebook")
        .arg("list")
        .assert()
        .success()
        .stdout(predicates::str::contains(nb_root.to_str().unwrap()));

    let mut cmd = Command::cargo_bin("vx").unwrap();
    cmd.env("VX_DATA_DIR", &data_dir)
        .arg("notebook")
        .arg("get-props")
        .arg(nb_root.to_str().unwrap())
        .assert()
        .success()
        .stdout(predicates::str::contains("Trip Notes"));

    let mut cmd = Command::cargo_bin("vx").unwrap();
    cmd.env("VX_DATA_DIR", &data_dir)
        .arg("notebook")
        .arg("close")
        .arg(nb_root.to_str().unwrap())
        .assert()
        .success()
        .stdout(predicates::str::contains("closed notebook"));

    let mut cmd = Command::cargo_bin("vx").unwrap();
    cmd.env("VX_DATA_DIR", &data_dir)
        .arg("notebook")
        .arg("list")
        .assert()
        .success()
        .stdout(predicates::str::contains("no open notebooks"));
}

#[test]
fn test_tag_create_add_list_round_trip() {
    let temp_dir = tempfile::tempdir().unwrap();
    let data_dir = temp_dir.path().join("appdata");
    let nb_root = temp_dir.path().join("nb1");

    Command::cargo_bin("vx")
        .unwrap()
        .env("VX_DATA_DIR", &data_dir)
        .arg("notebook")
        .arg("create")
        .arg(nb_root.to_str().unwrap())
        .assert()
        .success();

    std::fs::write(nb_root.join("readme.md"), "hello").unwrap();

    Command::cargo_bin("vx")
        .unwrap()
        .env("VX_DATA_DIR", &data_dir)
        .arg("tag")
        .arg("create")
        .arg("--root")
        .arg(nb_root.to_str().unwrap())
        .arg("work/urgent")
        .assert()
        .success();

    Command::cargo_bin("vx")
        .unwrap()
        .env("VX_DATA_DIR", &data_dir)
        .arg("tag")
        .arg("list")
        .arg("--root")
        .arg(nb_root.to_str().unwrap())
        .assert()
        .success()
        .stdout(predicates::str::contains("work"))
        .stdout(predicates::str::contains("work/urgent"));
}

#[test]
fn test_version_prints_package_version() {
    Command::cargo_bin("vx")
        .unwrap()
        .arg("version")
        .assert()
        .success()
        .stdout(predicates::str::contains("vx "));
}

#[test]
fn test_config_dump_prints_defaults() {
    let temp_dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("vx")
        .unwrap()
        .env("VX_DATA_DIR", temp_dir.path())
        .arg("config")
        .arg("dump")
        .assert()
        .success()
        .stdout(predicates::str::contains("search_backend"));
}

#[test]
fn test_unknown_kind_reports_invalid_param_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let nb_root = temp_dir.path().join("nb1");

    Command::cargo_bin("vx")
        .unwrap()
        .env("VX_DATA_DIR", temp_dir.path().join("appdata"))
        .arg("notebook")
        .arg("create")
        .arg(nb_root.to_str().unwrap())
        .arg("--kind")
        .arg("bogus")
        .assert()
        .failure()
        .stderr(predicates::str::contains("unknown notebook kind"));
}
