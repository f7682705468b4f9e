//! Shared integration-test server bootstrap helpers.

use axum_test::TestServer;
use keyvault_core::ManualClock;
use keyvault_server::{create_app, AppState, Config, Database};
use std::path::Path;
use tempfile::TempDir;

pub(crate) const START_MILLIS: i64 = 1_700_000_000_000;

pub(crate) fn test_config_for_db_path(db_path: &Path) -> Config {
    Config {
        port: 0,
        db_path: db_path.to_str().expect("db path").to_string(),
        max_paste_size: 1024,
        authorized_origins: vec!["https://vault.example".to_string()],
        allow_public_access: false,
        bind: None,
    }
}

pub(crate) fn test_server_for_config(config: Config, clock: ManualClock) -> TestServer {
    let db = Database::new(config.db_path.as_str()).expect("open db");
    let state = AppState::with_clock(config, db, clock);
    let app = create_app(state);
    TestServer::new(app).expect("server")
}

pub(crate) fn setup_test_server() -> (TestServer, TempDir, ManualClock) {
    let temp_dir = TempDir::new().expect("temp dir");
    let db_path = temp_dir.path().join("db");
    let config = test_config_for_db_path(&db_path);
    let clock = ManualClock::new(START_MILLIS);
    let server = test_server_for_config(config, clock.clone());
    (server, temp_dir, clock)
}
