//! Plugin configuration parsing.
//!
//! The host hands the plugin a JSON configuration value. Only `space` is
//! required; everything else falls back to a default. `space` is a URI whose
//! path (leading slash stripped) becomes the served resource path.

use std::collections::HashMap;

use axum::http::Uri;
use serde_json::Value;
use thiserror::Error;

/// Default minimum wait between two accepted tells from one session, seconds.
pub const DEFAULT_TELL_TIMEOUT: f64 = 1.0;

/// Default minimum cooldown between two quiz questions, seconds.
pub const DEFAULT_MIN_QUESTION_COOLDOWN: f64 = 10.0;

/// Default maximum cooldown between two quiz questions, seconds.
pub const DEFAULT_MAX_QUESTION_COOLDOWN: f64 = 30.0;

/// Configuration errors that fail the plugin load.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no 'space' URI in configuration")]
    MissingSpace,

    #[error("unable to parse 'space' URI in configuration")]
    InvalidSpace,
}

/// Parsed chat room configuration.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Resource path served by the room, without the leading slash.
    pub space: String,
    /// Initial pool of claimable nicknames. Empty pool means every claim fails.
    pub nicknames: Vec<String>,
    /// Starting score per nickname; absent nicknames start at zero.
    pub initial_points: HashMap<String, i64>,
    /// Minimum wait between two accepted tells from one session, seconds.
    pub tell_timeout: f64,
    /// Minimum cooldown between two quiz questions, seconds.
    pub min_question_cooldown: f64,
    /// Maximum cooldown between two quiz questions, seconds.
    pub max_question_cooldown: f64,
}

impl RoomConfig {
    /// Parse the configuration value handed to the plugin entry point.
    pub fn from_value(configuration: &Value) -> Result<Self, ConfigError> {
        let space = configuration.get("space").ok_or(ConfigError::MissingSpace)?;
        let space = space.as_str().ok_or(ConfigError::InvalidSpace)?;
        let space: Uri = space.parse().map_err(|_| ConfigError::InvalidSpace)?;
        let space = space.path().trim_start_matches('/').to_string();

        let nicknames = configuration
            .get("nicknames")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let initial_points = configuration
            .get("initialPoints")
            .and_then(Value::as_object)
            .map(|points| {
                points
                    .iter()
                    .filter_map(|(nickname, value)| {
                        value.as_i64().map(|points| (nickname.clone(), points))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let tell_timeout = configuration
            .get("tellTimeout")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_TELL_TIMEOUT);

        let math_quiz = configuration.get("mathQuiz");
        let mut min_question_cooldown = math_quiz
            .and_then(|quiz| quiz.get("minCoolDown"))
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_MIN_QUESTION_COOLDOWN);
        let mut max_question_cooldown = math_quiz
            .and_then(|quiz| quiz.get("maxCoolDown"))
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_MAX_QUESTION_COOLDOWN);
        if min_question_cooldown > max_question_cooldown {
            std::mem::swap(&mut min_question_cooldown, &mut max_question_cooldown);
        }

        Ok(Self {
            space,
            nicknames,
            initial_points,
            tell_timeout,
            min_question_cooldown,
            max_question_cooldown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_configuration_is_parsed() {
        // テスト項目: 全ての設定項目が正しくパースされる
        // given (前提条件):
        let configuration = json!({
            "space": "http://www.example.com/chat",
            "nicknames": ["Alice", "Bob", "Carol"],
            "initialPoints": {"Bob": 5},
            "tellTimeout": 2.5,
            "mathQuiz": {"minCoolDown": 1.0, "maxCoolDown": 3.0},
        });

        // when (操作):
        let config = RoomConfig::from_value(&configuration).unwrap();

        // then (期待する結果):
        assert_eq!(config.space, "chat");
        assert_eq!(config.nicknames, vec!["Alice", "Bob", "Carol"]);
        assert_eq!(config.initial_points.get("Bob"), Some(&5));
        assert_eq!(config.tell_timeout, 2.5);
        assert_eq!(config.min_question_cooldown, 1.0);
        assert_eq!(config.max_question_cooldown, 3.0);
    }

    #[test]
    fn test_missing_space_fails() {
        // テスト項目: space が無い設定はロードに失敗する
        // given (前提条件):
        let configuration = json!({"nicknames": ["Alice"]});

        // when (操作):
        let result = RoomConfig::from_value(&configuration);

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), ConfigError::MissingSpace);
    }

    #[test]
    fn test_unparsable_space_fails() {
        // テスト項目: URI としてパースできない space はロードに失敗する
        // given (前提条件):
        let non_string = json!({"space": 42});
        let bad_uri = json!({"space": ""});

        // when (操作) / then (期待する結果):
        assert_eq!(
            RoomConfig::from_value(&non_string).unwrap_err(),
            ConfigError::InvalidSpace
        );
        assert_eq!(
            RoomConfig::from_value(&bad_uri).unwrap_err(),
            ConfigError::InvalidSpace
        );
    }

    #[test]
    fn test_defaults_apply_when_options_are_absent() {
        // テスト項目: 省略された設定項目にはデフォルト値が適用される
        // given (前提条件):
        let configuration = json!({"space": "/chat"});

        // when (操作):
        let config = RoomConfig::from_value(&configuration).unwrap();

        // then (期待する結果):
        assert_eq!(config.space, "chat");
        assert!(config.nicknames.is_empty());
        assert!(config.initial_points.is_empty());
        assert_eq!(config.tell_timeout, DEFAULT_TELL_TIMEOUT);
        assert_eq!(config.min_question_cooldown, DEFAULT_MIN_QUESTION_COOLDOWN);
        assert_eq!(config.max_question_cooldown, DEFAULT_MAX_QUESTION_COOLDOWN);
    }

    #[test]
    fn test_inverted_cooldown_bounds_are_swapped() {
        // テスト項目: min > max の場合はクールダウンの上下限が入れ替わる
        // given (前提条件):
        let configuration = json!({
            "space": "/chat",
            "mathQuiz": {"minCoolDown": 30.0, "maxCoolDown": 10.0},
        });

        // when (操作):
        let config = RoomConfig::from_value(&configuration).unwrap();

        // then (期待する結果):
        assert_eq!(config.min_question_cooldown, 10.0);
        assert_eq!(config.max_question_cooldown, 30.0);
    }

    #[test]
    fn test_integer_timings_are_accepted() {
        // テスト項目: 整数で書かれた時間設定も受け付ける
        // given (前提条件):
        let configuration = json!({
            "space": "/chat",
            "tellTimeout": 2,
            "mathQuiz": {"minCoolDown": 5, "maxCoolDown": 15},
        });

        // when (操作):
        let config = RoomConfig::from_value(&configuration).unwrap();

        // then (期待する結果):
        assert_eq!(config.tell_timeout, 2.0);
        assert_eq!(config.min_question_cooldown, 5.0);
        assert_eq!(config.max_question_cooldown, 15.0);
    }
}
