//! Integration tests for mapping-configuration template rendering

#[cfg(test)]
mod template_render_tests {
    use std::fs;

    use assert_matches::assert_matches;
    use tempfile::tempdir;

    use mcapconv::error::ConfigError;
    use mcapconv::{ConfigTemplate, ConverterFunctions, EpisodeId};

    const TEMPLATE: &str = "
time:
  column: timestamp
  unit: seconds
channels:
  - topic: /{{ episode_id }}/data
    converter: float_array
    columns: [observation.state]
";

    #[test]
    fn test_render_from_file_substitutes_episode_stem() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, TEMPLATE).unwrap();

        let template = ConfigTemplate::from_path(&path).unwrap();
        let config = template.render(EpisodeId(3)).unwrap();
        assert_eq!(config.channels[0].topic, "/episode_000003/data");
    }

    #[test]
    fn test_each_episode_gets_its_own_rendering() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, TEMPLATE).unwrap();
        let template = ConfigTemplate::from_path(&path).unwrap();

        for id in [0u64, 7, 123, 999_999] {
            let config = template.render(EpisodeId(id)).unwrap();
            assert_eq!(
                config.channels[0].topic,
                format!("/{}/data", EpisodeId(id).stem())
            );
        }
    }

    #[test]
    fn test_invalid_yaml_error_references_template_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "time: [unclosed\n").unwrap();

        let err = ConfigTemplate::from_path(&path)
            .unwrap()
            .render(EpisodeId(0))
            .unwrap_err();
        assert_matches!(err, ConfigError::Parse { .. });
        assert!(err.to_string().contains("broken.yaml"), "{err}");
    }

    #[test]
    fn test_validation_error_names_field_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dup.yaml");
        fs::write(
            &path,
            "
time:
  column: ts
channels:
  - topic: /{{ episode_id }}/a
    converter: float_array
    columns: [x]
  - topic: /{{ episode_id }}/a
    converter: float_array
    columns: [y]
",
        )
        .unwrap();

        let err = ConfigTemplate::from_path(&path)
            .unwrap()
            .render(EpisodeId(1))
            .unwrap_err();
        let message = err.to_string();
        assert_matches!(err, ConfigError::Invalid { .. });
        assert!(message.contains("channels[1].topic"), "{message}");
        assert!(message.contains("dup.yaml"), "{message}");
    }

    #[test]
    fn test_missing_template_file_is_a_read_error() {
        let dir = tempdir().unwrap();
        let err = ConfigTemplate::from_path(&dir.path().join("absent.yaml")).unwrap_err();
        assert_matches!(err, ConfigError::Read { .. });
        assert!(err.to_string().contains("absent.yaml"));
    }

    #[test]
    fn test_converter_functions_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("functions.yaml");
        fs::write(
            &path,
            "
functions:
  joints:
    kind: array
    field: positions
  reward:
    kind: scalar
    scale: 100.0
",
        )
        .unwrap();

        let functions = ConverterFunctions::from_path(&path).unwrap();
        assert!(functions.get("joints").is_some());
        assert!(functions.get("reward").is_some());
        assert!(functions.get("absent").is_none());
    }

    #[test]
    fn test_missing_functions_file_is_a_read_error() {
        let dir = tempdir().unwrap();
        let err = ConverterFunctions::from_path(&dir.path().join("absent.yaml")).unwrap_err();
        assert_matches!(err, ConfigError::Read { .. });
    }

    #[test]
    fn test_packaged_defaults_work_together() {
        let functions = ConverterFunctions::builtin_default();
        let config = ConfigTemplate::builtin_default()
            .render(EpisodeId(42))
            .unwrap();
        for channel in &config.channels {
            assert!(channel.topic.starts_with("/episode_000042/"));
            assert!(
                functions.get(&channel.converter).is_some(),
                "default config references unknown function '{}'",
                channel.converter
            );
        }
    }
}
