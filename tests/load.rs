use pretty_assertions::assert_eq;
use prometheus_receiver::promconfig::{Action, ServiceDiscoveryConfig};
use prometheus_receiver::{ConfMap, Config, DecodeError, Error, ValidationError};
use std::error::Error as _;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn receiver_section(collector_yaml: &str) -> ConfMap {
    ConfMap::from_yaml_str(collector_yaml)
        .and_then(|conf| conf.sub("receivers"))
        .and_then(|receivers| receivers.sub("prometheus"))
        .expect("collector config should contain a prometheus receiver")
}

#[test]
fn loads_a_complete_receiver_config() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("nodes.json"),
        r#"[{"targets": ["node-1:9100", "node-2:9100"], "labels": {"dc": "eu"}}]"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("services.yml"),
        "- targets: [\"svc:8080\"]\n  labels:\n    team: payments\n",
    )
    .unwrap();
    let ca = dir.path().join("ca.pem");
    let cert = dir.path().join("client.pem");
    let key = dir.path().join("client.key");
    for path in [&ca, &cert, &key] {
        fs::write(path, "pem").unwrap();
    }

    let collector_yaml = format!(
        r#"
receivers:
  prometheus:
    buffer_period: 10s
    buffer_count: 100
    config:
      global:
        scrape_interval: 30s
        external_labels:
          cluster: test
      scrape_configs:
        - job_name: nodes
          file_sd_configs:
            - files: ["{dir}/*.json", "{dir}/*.yml"]
              refresh_interval: 1m
          metric_relabel_configs:
            - source_labels: [__name__]
              regex: "node_scrape_.*"
              action: drop
        - job_name: pods
          scheme: https
          tls_config:
            ca_file: "{ca}"
            cert_file: "{cert}"
            key_file: "{key}"
          kubernetes_sd_configs:
            - role: pod
              namespaces:
                names: [default]
        - job_name: discovered
          http_sd_configs:
            - url: http://sd.local/targets
    target_allocator:
      endpoint: http://target-allocator:80
      interval: 30s
      collector_id: collector-0
exporters:
  debug: {{}}
"#,
        dir = dir.path().display(),
        ca = ca.display(),
        cert = cert.display(),
        key = key.display(),
    );

    let config = Config::load(&receiver_section(&collector_yaml)).expect("config should load");

    assert_eq!(config.buffer_period, Duration::from_secs(10));
    assert_eq!(config.buffer_count, 100);

    let prometheus_config = config.prometheus_config.as_ref().unwrap();
    assert_eq!(prometheus_config.global.external_labels["cluster"], "test");

    let jobs: Vec<_> = prometheus_config
        .scrape_configs
        .iter()
        .map(|sc| sc.job_name.as_str())
        .collect();
    assert_eq!(jobs, vec!["nodes", "pods", "discovered"]);

    let nodes = &prometheus_config.scrape_configs[0];
    assert_eq!(nodes.scrape_interval, Some(Duration::from_secs(30)));
    assert_eq!(nodes.metric_relabel_configs[0].action, Action::Drop);
    let kinds: Vec<_> = prometheus_config.scrape_configs[1]
        .service_discovery_configs()
        .map(|sd| sd.name())
        .collect();
    assert_eq!(kinds, vec!["kubernetes"]);
    assert!(matches!(
        prometheus_config.scrape_configs[2]
            .service_discovery_configs()
            .next(),
        Some(ServiceDiscoveryConfig::Http(_))
    ));

    let target_allocator = config.target_allocator.as_ref().unwrap();
    assert_eq!(target_allocator.collector_id, "collector-0");

    // A validated config validates again.
    config.validate().unwrap();
}

#[test]
fn empty_receiver_section_fails_validation() {
    let conf = receiver_section("receivers:\n  prometheus:\n");
    match Config::load(&conf) {
        Err(Error::Validation(ValidationError::NoScrapeConfigs)) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn decode_errors_stop_before_validation() {
    let conf = receiver_section(
        r#"
receivers:
  prometheus:
    config:
      scrape_configs:
        - job_name: a
          consul_sd_configs:
            - server: localhost:8500
"#,
    );

    let err = Config::load(&conf).unwrap_err();
    assert!(matches!(
        err,
        Error::Decode(DecodeError::PrometheusConfig(_))
    ));
    assert!(err.to_string().contains("consul_sd_configs"), "{err}");
    // The cause is part of the message and not repeated as a source.
    assert!(err.source().is_none());
}

#[test]
fn loads_from_a_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("receiver.yaml");
    fs::write(
        &path,
        "target_allocator:\n  endpoint: http://localhost:8080\n  collector_id: col-1\n",
    )
    .unwrap();

    let config = Config::load(&ConfMap::from_yaml_file(&path).unwrap()).unwrap();
    assert!(config.prometheus_config.is_none());

    let missing = ConfMap::from_yaml_file(dir.path().join("missing.yaml")).unwrap_err();
    assert!(matches!(missing, DecodeError::Read { .. }));
    assert!(missing.to_string().contains("missing.yaml"), "{missing}");
    assert!(missing.source().is_none());
}
