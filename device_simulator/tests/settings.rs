use device_simulator::config::settings::{
    Settings, DEFAULT_ENDPOINT_URL, DEFAULT_NAMESPACE_URI, DEFAULT_SERVER_NAME,
};
use device_simulator::device::structures::SensorRange;
use std::fs;
use std::path::PathBuf;

fn temp_config_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("device_simulator_{}_{}.toml", name, std::process::id()))
}

#[test]
fn defaults_when_file_is_missing() {
    let path = temp_config_path("missing");
    let _ = fs::remove_file(&path);

    let settings = Settings::load(&path).expect("defaults should load");
    assert_eq!(settings.server.endpoint_url, DEFAULT_ENDPOINT_URL);
    assert_eq!(settings.server.server_name, DEFAULT_SERVER_NAME);
    assert_eq!(settings.server.namespace_uri, DEFAULT_NAMESPACE_URI);
    assert_eq!(settings.simulation.tick_interval_ms, 1000);
    assert_eq!(settings.simulation.temperature, SensorRange::temperature());
    assert_eq!(settings.simulation.pressure, SensorRange::pressure());
    assert_eq!(settings.simulation.counter_initial, 0);
    assert!(!settings.api.enabled);
    assert_eq!(settings.log_level, "info");

    let endpoint = settings.endpoint().unwrap();
    assert_eq!(endpoint.port, 4840);
    assert_eq!(endpoint.path, "/freeopcua/server/");
}

#[test]
fn partial_file_overrides_defaults() {
    let path = temp_config_path("partial");
    fs::write(
        &path,
        r#"
log_level = "debug"

[server]
endpoint_url = "opc.tcp://127.0.0.1:4850/test/"
server_name = "Line 3 Simulator"
namespace_uri = "http://example.org/test/"

[simulation]
tick_interval_ms = 250
"#,
    )
    .unwrap();

    let settings = Settings::load(&path).expect("config should load");
    fs::remove_file(&path).unwrap();

    assert_eq!(settings.log_level, "debug");
    assert_eq!(settings.server.namespace_uri, "http://example.org/test/");
    assert_eq!(settings.simulation.tick_interval_ms, 250);
    // Untouched keys keep their defaults.
    assert_eq!(settings.simulation.temperature, SensorRange::temperature());
    assert_eq!(settings.api.bind_address, "127.0.0.1:3000");
    assert_eq!(settings.endpoint().unwrap().port, 4850);
}

#[test]
fn save_then_load() {
    let path = temp_config_path("saved");
    let mut settings = Settings::default();
    settings.api.enabled = true;
    settings.simulation.pressure = SensorRange::new(0.5, 1.5, 1.0);

    settings.save(&path).unwrap();
    let loaded = Settings::load(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(loaded, settings);
}

#[test]
fn invalid_files_are_rejected() {
    let cases = [
        ("scheme", "[server]\nendpoint_url = \"http://localhost:4840/\"\n"),
        ("namespace", "[server]\nnamespace_uri = \"  \"\n"),
        ("interval", "[simulation]\ntick_interval_ms = 0\n"),
        (
            "range",
            "[simulation.temperature]\nlow = 30.0\nhigh = 10.0\ninitial = 20.0\n",
        ),
    ];

    for (name, contents) in cases {
        let path = temp_config_path(name);
        fs::write(&path, contents).unwrap();
        let result = Settings::load(&path);
        fs::remove_file(&path).unwrap();
        assert!(result.is_err(), "case '{}' should be rejected", name);
    }
}

#[test]
fn validate_default_settings() {
    assert!(Settings::default().validate().is_ok());
}
