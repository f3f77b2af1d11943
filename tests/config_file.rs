//! Configuration file lifecycle: init writes a default, load reads it back.

use meshparrot::config::Config;
use meshparrot::parrot::ParrotServer;

#[tokio::test]
async fn create_default_then_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    let path = path.to_str().unwrap();

    Config::create_default(path).await.expect("write default");
    let config = Config::load(path).await.expect("load");

    assert_eq!(config.channel.name, "LongFast");
    assert_eq!(config.mqtt.root_topic, "msh/ANZ/2/c/");
    assert_eq!(config.parrot.reply_delay_seconds, 1);

    // The default config must construct a working server (valid key and id).
    assert!(ParrotServer::new(config).is_ok());
}

#[tokio::test]
async fn load_reports_missing_file() {
    let err = Config::load("/nonexistent/meshparrot.toml").await.unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[tokio::test]
async fn load_reports_parse_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    tokio::fs::write(&path, "this is not toml [").await.unwrap();

    let err = Config::load(path.to_str().unwrap()).await.unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}
