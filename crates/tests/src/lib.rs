//! # Integration Tests
//!
//! End-to-end tests across crates.
//!
//! Covers:
//! - contract smoke tests
//! - source -> dispatcher -> transport flows (no external services)
//! - shutdown behavior under slow publishers

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
        assert_eq!(contracts::MAX_DETECTIONS, 128);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use config_loader::{resolve_class_selection, ConfigFormat, ConfigLoader};
    use contracts::{
        BoundingBox, ClassSelection, Detection, DetectionSet, FormatterConfig, FormatterKind,
        InferenceResult, PublisherConfig, TransportConfig,
    };
    use dispatcher::{class_counts, create_dispatcher, Formatter, PipelineState, ShutdownCoordinator};
    use ingestion::{MockDetectionConfig, MockDetectionSource, ReplayConfig, ReplaySource};
    use serde_json::Value;
    use tokio::net::UdpSocket;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn detection(class_id: i32, class_name: &str, confidence: f32) -> Detection {
        Detection::new(
            class_id,
            class_name,
            confidence,
            BoundingBox {
                left: 10,
                top: 20,
                right: 110,
                bottom: 220,
            },
        )
    }

    fn set_at(secs: i64, detections: Vec<Detection>) -> DetectionSet {
        DetectionSet::new(Utc.timestamp_opt(secs, 0).unwrap(), detections)
    }

    fn publisher(name: &str, rate_hz: f64, kind: FormatterKind, transport: TransportConfig) -> PublisherConfig {
        PublisherConfig {
            name: name.to_string(),
            rate_hz,
            formatter: FormatterConfig::new(kind),
            transport,
        }
    }

    /// Replay -> Dispatcher -> FileTransport
    ///
    /// The snapshot file ends up holding the rendering of the last set.
    #[tokio::test]
    async fn test_e2e_replay_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("results.json");
        let full_path = dir.path().join("full.json");

        let sets = vec![
            set_at(1_700_000_000, vec![detection(2, "car", 0.8)]),
            set_at(1_700_000_001, vec![detection(0, "person", 0.9), detection(-1, "", 0.5)]),
            set_at(
                1_700_000_002,
                vec![
                    detection(0, "person", 0.9),
                    detection(0, "person", 0.7),
                    detection(16, "dog", 0.6),
                    detection(2, "car", 0.0),
                ],
            ),
        ];
        let last = sets[2].clone();

        let source = ReplaySource::from_sets(
            sets,
            ReplayConfig {
                fps: 200.0,
                ..Default::default()
            },
        )
        .unwrap();
        let input_rx = source.start(4, None);

        let coordinator = Arc::new(ShutdownCoordinator::new());
        let dispatcher = create_dispatcher(
            vec![
                publisher("json_file", 50.0, FormatterKind::Json, TransportConfig::file(&json_path)),
                publisher("full_file", 50.0, FormatterKind::FullJson, TransportConfig::file(&full_path)),
            ],
            ClassSelection::default(),
            input_rx,
            Arc::clone(&coordinator),
        )
        .await
        .unwrap();

        let report = timeout(Duration::from_secs(5), dispatcher.spawn())
            .await
            .expect("pipeline finished")
            .unwrap();

        assert_eq!(report.results, 3);
        assert_eq!(report.summary.total_results, 3);
        assert_eq!(coordinator.state(), PipelineState::Stopped);
        for (name, metrics) in &report.publishers {
            assert!(metrics.sent_count >= 1, "{name} sent nothing");
            assert_eq!(metrics.failure_count, 0);
        }

        let expected = InferenceResult::from_detection_set(last, &ClassSelection::default());

        let written = std::fs::read_to_string(&json_path).unwrap();
        let mut counts: serde_json::Map<String, Value> = serde_json::from_str(&written).unwrap();
        assert_eq!(counts.remove("timestamp"), Some(Value::from(1_700_000_002)));
        let counts: BTreeMap<String, u32> = counts
            .into_iter()
            .map(|(class, count)| (class, count.as_u64().unwrap() as u32))
            .collect();
        assert_eq!(counts, class_counts(&expected, None));
        assert_eq!(counts["person"], 2);
        assert_eq!(counts["dog"], 1);
        assert!(!counts.contains_key("car"));

        let full: Value = serde_json::from_str(&std::fs::read_to_string(&full_path).unwrap()).unwrap();
        assert_eq!(full["detection_count"], 3);
        assert_eq!(full["detections"].as_array().unwrap().len(), 3);
        assert!(!dir.path().join("results.json.tmp").exists());
    }

    /// TOML config + labels file -> Dispatcher -> UDP SelectiveBs
    #[tokio::test]
    async fn test_e2e_config_to_udp_selective() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("labels.txt"), "person\nbicycle\ncar\n").unwrap();

        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = receiver.local_addr().unwrap().port();

        let toml = format!(
            r#"
[classes]
labels_path = "labels.txt"
selected = "car"

[[publishers]]
name = "selective_bs"
rate_hz = 20.0
formatter = {{ kind = "selective_bs", class_mapping = {{ car = "vehicle" }} }}
transport = {{ type = "udp", host = "127.0.0.1", port = {port} }}
"#
        );
        let blueprint = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        let selection = resolve_class_selection(&blueprint.classes, Some(dir.path())).unwrap();
        assert!(selection.filter.is_selected(0));
        assert!(selection.filter.is_selected(2));
        assert!(!selection.filter.is_selected(1));

        let (tx, rx) = mpsc::channel(4);
        let coordinator = Arc::new(ShutdownCoordinator::new());
        let dispatcher = create_dispatcher(
            blueprint.publishers.clone(),
            selection.clone(),
            rx,
            Arc::clone(&coordinator),
        )
        .await
        .unwrap();
        let handle = dispatcher.spawn();

        let set = set_at(
            1_715_196_409,
            vec![
                detection(0, "person", 0.9),
                detection(2, "car", 0.8),
                detection(2, "car", 0.7),
                detection(1, "bicycle", 0.9),
            ],
        );
        let expected = Formatter::from_config(&blueprint.publishers[0].formatter)
            .format(&InferenceResult::from_detection_set(set.clone(), &selection));
        tx.send(set).await.unwrap();

        let mut buf = vec![0u8; 2048];
        let (len, _) = timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
            .await
            .expect("datagram received")
            .unwrap();
        let message = std::str::from_utf8(&buf[..len]).unwrap();

        assert_eq!(message, expected);
        assert!(message.contains("vehicle:2"));
        assert!(message.contains("person:1"));
        assert!(!message.contains("bicycle"));
        assert!(message.ends_with("timestamp:1715196409"));

        drop(tx);
        let report = timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        assert_eq!(report.publishers[0].1.sent_count, 1);
    }

    /// Suppressed FullJson never creates its file
    #[tokio::test]
    async fn test_e2e_suppress_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("full.json");

        let mut config = publisher("full", 100.0, FormatterKind::FullJson, TransportConfig::file(&path));
        config.formatter.suppress_empty = true;

        let (tx, rx) = mpsc::channel(4);
        let dispatcher = create_dispatcher(
            vec![config],
            ClassSelection::default(),
            rx,
            Arc::new(ShutdownCoordinator::new()),
        )
        .await
        .unwrap();
        let handle = dispatcher.spawn();

        tx.send(set_at(1, vec![detection(-1, "", 0.9), detection(3, "motorbike", 0.0)]))
            .await
            .unwrap();
        drop(tx);

        let report = timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        let metrics = report.publishers[0].1;
        assert_eq!(metrics.received_count, 1);
        assert_eq!(metrics.suppressed_count, 1);
        assert_eq!(metrics.sent_count, 0);
        assert!(!path.exists());
    }

    /// External shutdown interrupts slow publishers and an endless source
    #[tokio::test]
    async fn test_e2e_shutdown_with_slow_publisher() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faces.json");

        let source = MockDetectionSource::new(MockDetectionConfig {
            fps: 100.0,
            seed: Some(42),
            ..Default::default()
        })
        .unwrap();
        let input_rx = source.start(8, None);

        let coordinator = Arc::new(ShutdownCoordinator::new());
        let dispatcher = create_dispatcher(
            vec![publisher("faces", 0.2, FormatterKind::FacesJson, TransportConfig::file(&path))],
            ClassSelection::default(),
            input_rx,
            Arc::clone(&coordinator),
        )
        .await
        .unwrap();
        let handle = dispatcher.spawn();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(coordinator.begin_shutdown());

        let report = timeout(Duration::from_secs(2), handle)
            .await
            .expect("shutdown is not blocked by the 5s publish interval")
            .unwrap();
        source.stop();

        assert!(report.results > 1);
        let metrics = report.publishers[0].1;
        assert!(metrics.sent_count >= 1);
        assert!(metrics.overwritten_count > 0);

        let faces: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(faces["faces_in_frame_total"], faces["faces_attending"]);
        assert_eq!(coordinator.state(), PipelineState::Stopped);
    }

    /// A bad publisher aborts startup without leaking running publishers
    #[tokio::test]
    async fn test_e2e_invalid_rate_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (_tx, rx) = mpsc::channel(1);

        let result = create_dispatcher(
            vec![
                publisher("ok", 1.0, FormatterKind::Json, TransportConfig::file(dir.path().join("a.json"))),
                publisher("bad", 0.0, FormatterKind::Json, TransportConfig::file(dir.path().join("b.json"))),
            ],
            ClassSelection::default(),
            rx,
            Arc::new(ShutdownCoordinator::new()),
        )
        .await;

        assert!(result.is_err());
    }
}
