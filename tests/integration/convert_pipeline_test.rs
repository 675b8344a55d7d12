//! End-to-end conversion pipeline tests: parquet episodes in, MCAP logs out

#[cfg(test)]
mod convert_pipeline_tests {
    use std::fs::{self, File};
    use std::path::Path;
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use parquet::data_type::{DoubleType, Int64Type};
    use parquet::file::properties::WriterProperties;
    use parquet::file::writer::SerializedFileWriter;
    use parquet::schema::parser::parse_message_type;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    use mcapconv::error::EpisodeError;
    use mcapconv::{
        convert_all, dataset, BatchOptions, ConfigTemplate, ConverterFunctions, EpisodeId,
    };

    const TEMPLATE: &str = "
time:
  column: timestamp
  unit: seconds
channels:
  - topic: /{{ episode_id }}/state
    schema:
      name: ObservationState
    converter: float_array
    columns: [state]
  - topic: /{{ episode_id }}/frame
    converter: frame_record
    columns: [frame_index, timestamp]
";

    fn quiet() -> BatchOptions {
        BatchOptions {
            jobs: 1,
            quiet: true,
        }
    }

    /// Write a minimal episode source file with the low-level parquet writer.
    fn write_episode(path: &Path, rows: &[(f64, i64, f64)]) {
        let schema = Arc::new(
            parse_message_type(
                "message frame {
                    required double timestamp;
                    required int64 frame_index;
                    required double state;
                }",
            )
            .unwrap(),
        );
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let file = File::create(path).unwrap();
        let mut writer =
            SerializedFileWriter::new(file, schema, Arc::new(WriterProperties::builder().build()))
                .unwrap();
        let mut group = writer.next_row_group().unwrap();

        let timestamps: Vec<f64> = rows.iter().map(|row| row.0).collect();
        let frames: Vec<i64> = rows.iter().map(|row| row.1).collect();
        let states: Vec<f64> = rows.iter().map(|row| row.2).collect();

        let mut column = group.next_column().unwrap().unwrap();
        column
            .typed::<DoubleType>()
            .write_batch(&timestamps, None, None)
            .unwrap();
        column.close().unwrap();

        let mut column = group.next_column().unwrap().unwrap();
        column
            .typed::<Int64Type>()
            .write_batch(&frames, None, None)
            .unwrap();
        column.close().unwrap();

        let mut column = group.next_column().unwrap().unwrap();
        column
            .typed::<DoubleType>()
            .write_batch(&states, None, None)
            .unwrap();
        column.close().unwrap();

        group.close().unwrap();
        writer.close().unwrap();
    }

    /// Read every message of an MCAP file as (topic, log_time, payload).
    fn read_messages(path: &Path) -> Vec<(String, u64, serde_json::Value)> {
        let bytes = fs::read(path).unwrap();
        mcap::MessageStream::new(&bytes)
            .unwrap()
            .map(|message| {
                let message = message.unwrap();
                (
                    message.channel.topic.clone(),
                    message.log_time,
                    serde_json::from_slice(&message.data).unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn test_discovered_episodes_convert_end_to_end() {
        let input = tempdir().unwrap();
        write_episode(
            &input.path().join("data/chunk-000/episode_000001.parquet"),
            &[(0.25, 0, 1.5), (0.5, 1, 2.5), (0.75, 2, -3.0)],
        );
        write_episode(
            &input.path().join("data/chunk-000/episode_000002.parquet"),
            &[(0.25, 0, 4.0)],
        );
        let out = input.path().join("mcap");

        let episodes = dataset::select(input.path(), None).unwrap();
        assert_eq!(episodes, vec![EpisodeId(1), EpisodeId(2)]);

        let outcome = convert_all(
            &episodes,
            input.path(),
            &out,
            &ConfigTemplate::from_text("test.yaml", TEMPLATE),
            &ConverterFunctions::builtin_default(),
            &quiet(),
        )
        .unwrap();

        assert_eq!(outcome.succeeded, 2);
        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.messages_written, 8);

        let messages = read_messages(&out.join("episode_000001.mcap"));
        assert_eq!(messages.len(), 6);

        let state_messages: Vec<_> = messages
            .iter()
            .filter(|(topic, _, _)| topic == "/episode_000001/state")
            .collect();
        assert_eq!(state_messages.len(), 3);
        assert_eq!(state_messages[0].1, 250_000_000);
        assert_eq!(state_messages[0].2, json!({"data": [1.5]}));
        assert_eq!(state_messages[2].1, 750_000_000);
        assert_eq!(state_messages[2].2, json!({"data": [-3.0]}));

        let frame_messages: Vec<_> = messages
            .iter()
            .filter(|(topic, _, _)| topic == "/episode_000001/frame")
            .collect();
        assert_eq!(frame_messages[1].2, json!({"frame_index": 1, "timestamp": 0.5}));

        let messages = read_messages(&out.join("episode_000002.mcap"));
        assert!(messages
            .iter()
            .all(|(topic, _, _)| topic.starts_with("/episode_000002/")));
    }

    #[test]
    fn test_rerun_overwrites_with_identical_output() {
        let input = tempdir().unwrap();
        write_episode(
            &input.path().join("episode_000005.parquet"),
            &[(0.25, 0, 1.0), (0.5, 1, 2.0)],
        );
        let out = input.path().join("mcap");
        let template = ConfigTemplate::from_text("test.yaml", TEMPLATE);
        let functions = ConverterFunctions::builtin_default();
        let episodes = [EpisodeId(5)];

        let first = convert_all(&episodes, input.path(), &out, &template, &functions, &quiet())
            .unwrap();
        assert_eq!(first.succeeded, 1);
        let first_bytes = fs::read(out.join("episode_000005.mcap")).unwrap();

        let second = convert_all(&episodes, input.path(), &out, &template, &functions, &quiet())
            .unwrap();
        assert_eq!(second.succeeded, 1);
        let second_bytes = fs::read(out.join("episode_000005.mcap")).unwrap();

        assert_eq!(first_bytes, second_bytes);
        // One output file per episode, never a duplicate
        assert_eq!(fs::read_dir(&out).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_source_fails_only_that_episode() {
        let input = tempdir().unwrap();
        write_episode(&input.path().join("episode_000001.parquet"), &[(0.25, 0, 1.0)]);
        let out = input.path().join("mcap");

        let episodes = [EpisodeId(1), EpisodeId(3)];
        let outcome = convert_all(
            &episodes,
            input.path(),
            &out,
            &ConfigTemplate::from_text("test.yaml", TEMPLATE),
            &ConverterFunctions::builtin_default(),
            &quiet(),
        )
        .unwrap();

        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].episode, EpisodeId(3));
        assert_matches!(outcome.failed[0].error, EpisodeError::SourceNotFound { .. });

        assert!(out.join("episode_000001.mcap").is_file());
        assert!(!out.join("episode_000003.mcap").exists());
    }

    #[test]
    fn test_failed_conversion_leaves_no_partial_output() {
        let input = tempdir().unwrap();
        write_episode(&input.path().join("episode_000001.parquet"), &[(0.25, 0, 1.0)]);
        let out = input.path().join("mcap");

        // The template asks for a column the source does not have, so the
        // conversion fails after the output writer has started
        let template = ConfigTemplate::from_text(
            "test.yaml",
            "
time:
  column: timestamp
channels:
  - topic: /{{ episode_id }}/gripper
    converter: float_array
    columns: [gripper_position]
",
        );

        let outcome = convert_all(
            &[EpisodeId(1)],
            input.path(),
            &out,
            &template,
            &ConverterFunctions::builtin_default(),
            &quiet(),
        )
        .unwrap();

        assert_eq!(outcome.succeeded, 0);
        assert_eq!(outcome.failed.len(), 1);
        assert_matches!(outcome.failed[0].error, EpisodeError::Conversion(_));
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_corrupt_source_is_recorded_not_fatal() {
        let input = tempdir().unwrap();
        fs::write(input.path().join("episode_000002.parquet"), b"not a parquet file").unwrap();
        let out = input.path().join("mcap");

        let outcome = convert_all(
            &[EpisodeId(2)],
            input.path(),
            &out,
            &ConfigTemplate::from_text("test.yaml", TEMPLATE),
            &ConverterFunctions::builtin_default(),
            &quiet(),
        )
        .unwrap();

        assert_eq!(outcome.succeeded, 0);
        assert_eq!(outcome.failed.len(), 1);
        assert_matches!(outcome.failed[0].error, EpisodeError::Conversion(_));
    }

    #[test]
    fn test_parallel_batch_matches_sequential() {
        let input = tempdir().unwrap();
        for id in 1u64..=4 {
            write_episode(
                &input.path().join(format!("episode_{id:06}.parquet")),
                &[(0.25, 0, id as f64)],
            );
        }
        let out = input.path().join("mcap");
        let episodes: Vec<EpisodeId> = (1u64..=4).map(EpisodeId).collect();

        let outcome = convert_all(
            &episodes,
            input.path(),
            &out,
            &ConfigTemplate::from_text("test.yaml", TEMPLATE),
            &ConverterFunctions::builtin_default(),
            &BatchOptions {
                jobs: 4,
                quiet: true,
            },
        )
        .unwrap();

        assert_eq!(outcome.succeeded, 4);
        assert!(outcome.failed.is_empty());
        for id in 1u64..=4 {
            assert!(out.join(format!("episode_{id:06}.mcap")).is_file());
        }
    }
}
