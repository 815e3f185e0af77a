//! Integration tests for freshcache

mod scenario;

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const ENV_VARS: [&str; 7] = [
        "FRESHCACHE_CONFIG",
        "CACHE_DEFAULT_TTL",
        "PRELOAD_CACHE",
        "MAX_CACHE_ITEMS",
        "CACHE_RECENT_WINDOW",
        "CACHE_DATA_DIR",
        "CACHE_LOOKUP_DIR",
    ];

    fn freshcache() -> Command {
        let mut cmd = cargo_bin_cmd!("freshcache");
        for var in ENV_VARS {
            cmd.env_remove(var);
        }
        cmd.env("CI", "1");
        cmd
    }

    /// Temp workspace with a CSV pivot table, one mapping and a config file
    fn workspace() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        write(
            &root.join("data/wps/pivot.csv"),
            "period,id,value\n2020-01-03,W_EPC0,1\n",
        );
        write(
            &root.join("lookup/steo/mapping_dpr.csv"),
            "id,region\nP1,Permian\n",
        );

        let config = root.join("config.toml");
        write(
            &config,
            &format!(
                "[data]\ndata_dir = {:?}\nlookup_dir = {:?}\n\n[datasets.wps_pivot]\npath = \"wps/pivot.csv\"\n",
                root.join("data"),
                root.join("lookup"),
            ),
        );
        (dir, config)
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn help_displays() {
        freshcache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("file-fingerprinted dataset cache"));
    }

    #[test]
    fn version_displays() {
        freshcache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("freshcache"));
    }

    #[test]
    fn config_path() {
        freshcache()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let (_dir, config) = workspace();
        freshcache()
            .arg("-c")
            .arg(&config)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("recent_window_secs = 300"));
    }

    #[test]
    fn config_init_and_set() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("nested").join("config.toml");

        freshcache()
            .arg("-c")
            .arg(&config)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));

        freshcache()
            .arg("-c")
            .arg(&config)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));

        freshcache()
            .arg("-c")
            .arg(&config)
            .args(["config", "set", "cache.recent_window_secs", "30"])
            .assert()
            .success();

        let content = fs::read_to_string(&config).unwrap();
        assert!(content.contains("recent_window_secs = 30"));
    }

    #[test]
    fn config_set_unknown_key_fails() {
        let dir = TempDir::new().unwrap();
        freshcache()
            .arg("-c")
            .arg(dir.path().join("config.toml"))
            .args(["config", "set", "cache.size", "1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn invalid_config_reports_hint() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("config.toml");
        write(&config, "[cache]\nmax_items = \"many\"\n");

        freshcache()
            .arg("-c")
            .arg(&config)
            .arg("stats")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"))
            .stderr(predicate::str::contains("config init --force"));
    }

    #[test]
    fn invalid_env_override_fails() {
        let (_dir, config) = workspace();
        freshcache()
            .arg("-c")
            .arg(&config)
            .env("CACHE_DEFAULT_TTL", "soon")
            .arg("stats")
            .assert()
            .failure()
            .stderr(predicate::str::contains("CACHE_DEFAULT_TTL"));
    }

    #[test]
    fn preload_reports_each_dataset() {
        let (_dir, config) = workspace();
        freshcache()
            .arg("-c")
            .arg(&config)
            .args(["preload", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"dataset\": \"wps_pivot\""))
            .stdout(predicate::str::contains("\"error\": null"))
            .stdout(predicate::str::contains("Path not found"));
    }

    #[test]
    fn preload_plain_sequential() {
        let (_dir, config) = workspace();
        freshcache()
            .arg("-c")
            .arg(&config)
            .args(["preload", "--sequential", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("wps_pivot\tok"))
            .stdout(predicate::str::contains("steo_pivot\tfailed"));
    }

    #[test]
    fn stats_json_after_warmup() {
        let (_dir, config) = workspace();
        freshcache()
            .arg("-c")
            .arg(&config)
            .args(["stats", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"total_entries\": 2"))
            .stdout(predicate::str::contains("\"max_items\": 500"))
            .stdout(predicate::str::contains("pivot.csv"));
    }

    #[test]
    fn stats_without_preload_is_empty() {
        let (_dir, config) = workspace();
        freshcache()
            .arg("-c")
            .arg(&config)
            .args(["--no-preload", "stats", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"total_entries\": 0"));
    }

    #[test]
    fn check_reports_recent_and_missing_files() {
        let (_dir, config) = workspace();
        freshcache()
            .arg("-c")
            .arg(&config)
            .args(["check", "--no-refresh", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("recently modified"))
            .stdout(predicate::str::contains("unknown"));
    }

    #[test]
    fn check_refreshes_on_recent_change() {
        let (_dir, config) = workspace();
        freshcache()
            .arg("-c")
            .arg(&config)
            .args(["check", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"refreshed\": true"));
    }

    #[test]
    fn check_old_files_do_not_refresh() {
        let (_dir, config) = workspace();
        let pivot = config.parent().unwrap().join("data/wps/pivot.csv");
        let old = std::time::UNIX_EPOCH + std::time::Duration::from_secs(1_600_000_000);
        for path in [pivot, config.parent().unwrap().join("lookup/steo/mapping_dpr.csv")] {
            fs::File::options()
                .write(true)
                .open(path)
                .unwrap()
                .set_modified(old)
                .unwrap();
        }

        freshcache()
            .arg("-c")
            .arg(&config)
            .args(["check", "--window", "60", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"refreshed\": false"));
    }

    #[test]
    fn clear_does_not_warm_first() {
        let (_dir, config) = workspace();
        freshcache()
            .arg("-c")
            .arg(&config)
            .arg("-v")
            .arg("clear")
            .assert()
            .success()
            .stdout(predicate::str::contains("Cache cleared"))
            .stdout(predicate::str::contains("0 entries removed"))
            .stderr(predicate::str::contains("Preloaded").not());
    }
}
