//! Map lifecycle and configuration

use crate::common::*;
use cachet::{MapStatus, CONFIG_FILE_NAME};

#[test]
fn closed_map_rejects_every_surface() {
    let map = new_map("lc-closed");
    assert_eq!(map.status(), MapStatus::Running);
    map.write_only().eval(key("a"), |v| v.set(1)).join().unwrap();

    let other_handle = map.read_write();
    map.close();
    assert_eq!(map.status(), MapStatus::Terminated);
    assert_eq!(other_handle.status(), MapStatus::Terminated);

    let ro = map.read_only().eval(key("a"), |v| v.find().copied()).join();
    assert!(matches!(ro, Err(Error::MapClosed(_))));

    let wo = map.write_only().eval_many(keys(3), |v| v.set(1)).join();
    assert!(matches!(wo, Err(Error::MapClosed(_))));

    let rw: Vec<_> = other_handle.eval_many(keys(2), |v| v.set(1)).collect();
    assert!(rw.iter().all(|r| matches!(r, Err(Error::MapClosed(_)))));

    // Idempotent
    map.close();
}

#[test]
fn close_waits_for_queued_functions() {
    let map = new_map("lc-drain");
    let futures: Vec<_> = (0..50)
        .map(|i| map.write_only().eval(format!("k{}", i), move |v| v.set(i)))
        .collect();
    map.close();
    for f in futures {
        f.join().unwrap();
    }
}

#[test]
fn map_built_from_toml() {
    init_tracing();
    let cfg = FunctionalConfig::from_toml_str(
        r#"
        name = "from-toml"
        worker_threads = 2

        [params]
        persistence = "skip"
        locking = "try_lock"
        "#,
    )
    .unwrap();
    let map: FunctionalMap<String, i64> = FunctionalMap::new(cfg).unwrap();
    assert_eq!(map.name(), "from-toml");
    assert_eq!(map.params().locking(), LockingMode::TryLock);
    assert_eq!(map.params().persistence(), PersistenceMode::Skip);
    assert_eq!(map.params().execution(), ExecutionMode::All);
    map.close();
}

#[test]
fn invalid_mode_is_rejected_at_start() {
    let mut cfg = FunctionalConfig::named("lc-invalid");
    cfg.params.locking = "sometimes".to_string();
    let result: Result<FunctionalMap<String, i64>> = FunctionalMap::new(cfg);
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}

#[test]
fn default_config_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    FunctionalConfig::write_default_if_missing(&path).unwrap();

    let cfg = FunctionalConfig::from_file(&path).unwrap();
    assert_eq!(cfg, FunctionalConfig::default());

    let map: FunctionalMap<String, i64> = FunctionalMap::new(cfg).unwrap();
    assert_eq!(map.name(), "default");
    map.close();
}
