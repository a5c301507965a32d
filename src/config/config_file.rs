use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use compio::fs;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::{debug, warn};

use crate::ext::BestEffortPathExt;

const KNOWN_KEYS: [&str; 5] = ["source", "replica", "interval", "log_file", "append_log"];

/// Settings read from a YAML configuration file.
///
/// Every key is optional; values given on the command line take precedence.
///
/// ```yaml
/// source: /data/photos
/// replica: /backup/photos
/// interval: 60
/// log_file: /var/log/mirrorsync.log
/// append_log: true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub source: Option<PathBuf>,
    pub replica: Option<PathBuf>,
    pub interval: Option<i64>,
    pub log_file: Option<PathBuf>,
    pub append_log: Option<bool>,
}

impl ConfigFile {
    pub async fn from_path(path: &Path) -> Result<Self, ConfigFileError> {
        debug!("Reading config file: {}", path.best_effort_path_display());
        let bytes = fs::read(path).await.context(ReadSnafu {
            file_path: path.best_effort_path_display(),
        })?;
        debug!("Successfully read config file: {} bytes", bytes.len());

        let contents = String::from_utf8(bytes).context(EncodingSnafu {
            file_path: path.best_effort_path_display(),
        })?;
        contents.as_str().try_into()
    }

    fn path_setting(key: &'static str, value: Option<&Yaml>) -> Result<Option<PathBuf>, ConfigFileError> {
        match value {
            None | Some(Yaml::Value(Scalar::Null)) => Ok(None),
            Some(Yaml::Value(Scalar::String(text))) => Ok(Some(PathBuf::from(&**text))),
            Some(_) => InvalidValueSnafu {
                key,
                expected: "a path",
            }
            .fail(),
        }
    }

    fn integer_setting(key: &'static str, value: Option<&Yaml>) -> Result<Option<i64>, ConfigFileError> {
        match value {
            None | Some(Yaml::Value(Scalar::Null)) => Ok(None),
            Some(Yaml::Value(Scalar::Integer(number))) => Ok(Some(*number)),
            Some(_) => InvalidValueSnafu {
                key,
                expected: "a whole number of seconds",
            }
            .fail(),
        }
    }

    fn bool_setting(key: &'static str, value: Option<&Yaml>) -> Result<Option<bool>, ConfigFileError> {
        match value {
            None | Some(Yaml::Value(Scalar::Null)) => Ok(None),
            Some(Yaml::Value(Scalar::Boolean(flag))) => Ok(Some(*flag)),
            Some(_) => InvalidValueSnafu {
                key,
                expected: "true or false",
            }
            .fail(),
        }
    }

    fn warn_unknown_keys(top_level: &LinkedHashMap<Yaml, Yaml>) {
        for key in top_level.keys() {
            match key {
                Yaml::Value(Scalar::String(name)) if KNOWN_KEYS.contains(&&**name) => {}
                other => warn!("Ignoring unknown config key: {:?}", other),
            }
        }
    }
}

impl TryFrom<&str> for ConfigFile {
    type Error = ConfigFileError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let document = documents.first().context(MalformedConfigSnafu)?;
        let top_level = document.as_mapping().context(TopLevelNotMapSnafu)?;

        Self::warn_unknown_keys(top_level);
        let setting = |key: &'static str| top_level.get(&Yaml::Value(Scalar::String(Cow::Borrowed(key))));

        Ok(ConfigFile {
            source: Self::path_setting("source", setting("source"))?,
            replica: Self::path_setting("replica", setting("replica"))?,
            interval: Self::integer_setting("interval", setting("interval"))?,
            log_file: Self::path_setting("log_file", setting("log_file"))?,
            append_log: Self::bool_setting("append_log", setting("append_log"))?,
        })
    }
}

#[derive(Debug, Snafu)]
pub enum ConfigFileError {
    #[snafu(display("Failed to read the config file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Config file {} is not valid UTF-8", file_path))]
    EncodingError {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Improperly formatted config file"))]
    MalformedConfig,
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Config key '{}' should be {}", key, expected))]
    InvalidValue {
        key: &'static str,
        expected: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[compio::test]
    async fn config_returns_error_on_nonexistent_file() {
        let result = ConfigFile::from_path(Path::new("nonexistent.yaml")).await;
        assert!(matches!(result, Err(ConfigFileError::ReadError { .. })));
    }

    #[compio::test]
    async fn config_reads_file_from_disk() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("mirror.yaml");
        std::fs::write(&path, "source: /data/in\nreplica: /data/out\ninterval: 30\n").unwrap();

        let config = ConfigFile::from_path(&path).await.expect("Failed to read config");

        assert_eq!(config.source, Some(PathBuf::from("/data/in")));
        assert_eq!(config.replica, Some(PathBuf::from("/data/out")));
        assert_eq!(config.interval, Some(30));
    }

    #[test]
    fn config_parses_every_key() {
        let yaml = r#"
source: /data/photos
replica: "/backup/photos"
interval: 60
log_file: sync.log
append_log: true
"#;
        let config: ConfigFile = yaml.try_into().expect("Valid config");
        assert_eq!(
            config,
            ConfigFile {
                source: Some(PathBuf::from("/data/photos")),
                replica: Some(PathBuf::from("/backup/photos")),
                interval: Some(60),
                log_file: Some(PathBuf::from("sync.log")),
                append_log: Some(true),
            }
        );
    }

    #[test]
    fn config_keys_are_optional() {
        let config: ConfigFile = "interval: 5".try_into().unwrap();
        assert_eq!(
            config,
            ConfigFile {
                interval: Some(5),
                ..ConfigFile::default()
            }
        );
    }

    #[test]
    fn config_keeps_negative_interval_for_validation() {
        let config: ConfigFile = "interval: -3".try_into().unwrap();
        assert_eq!(config.interval, Some(-3));
    }

    #[test]
    fn config_treats_null_as_missing() {
        let config: ConfigFile = "log_file: ~\nsource: null".try_into().unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn config_ignores_unknown_keys() {
        let config: ConfigFile = "replica: out\nexclude: [\"*.tmp\"]".try_into().unwrap();
        assert_eq!(config.replica, Some(PathBuf::from("out")));
    }

    #[test]
    fn config_returns_error_on_invalid_yaml() {
        let result: Result<ConfigFile, _> = "invalid: yaml: content: [unclosed".try_into();
        assert!(matches!(result, Err(ConfigFileError::ParseError { .. })));
    }

    #[test]
    fn config_returns_error_on_empty_file() {
        let result: Result<ConfigFile, _> = "".try_into();
        assert!(matches!(result, Err(ConfigFileError::MalformedConfig)));
    }

    #[rstest]
    #[case("- item1\n- item2")]
    #[case("just a string")]
    fn config_returns_error_when_top_level_is_not_map(#[case] yaml: &str) {
        let result: Result<ConfigFile, _> = yaml.try_into();
        assert!(matches!(result, Err(ConfigFileError::TopLevelNotMap)));
    }

    #[rstest]
    #[case("interval: soon", "interval")]
    #[case("interval: 1.5", "interval")]
    #[case("source: [a, b]", "source")]
    #[case("replica: 42", "replica")]
    #[case("append_log: sometimes", "append_log")]
    fn config_rejects_wrongly_typed_values(#[case] yaml: &str, #[case] expected_key: &str) {
        let result: Result<ConfigFile, _> = yaml.try_into();
        match result {
            Err(ConfigFileError::InvalidValue { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("Expected InvalidValue, got {other:?}"),
        }
    }
}
