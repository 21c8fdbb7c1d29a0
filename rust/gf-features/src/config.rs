//! YAML run configuration for `gf`.
//!
//! ```yaml
//! corpus:
//!   games_dir: data/games
//! feature_set:
//!   name: color_words
//!   order: [words, clicked]
//!   utterances: {kind: sender, sender: speaker}
//!   features:
//!     - {name: words, kind: token_enumerable, annotation: tokens, lower_case: true}
//!     - {name: clicked, kind: action_enumerable, prefix: click}
//! examples: {kind: utterance_then_action, action_sender: listener}
//! output:
//!   feature_set_dir: out/feature_set
//! ```

use std::path::{Path, PathBuf};

use gf_corpus::{ActionExtractor, PairExtractor, UtteranceExtractor};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::definition::{Extractors, FeatureSpec};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    pub corpus: CorpusConfig,
    pub feature_set: FeatureSetConfig,
    /// Which (utterance, action) pairs become datums.
    #[serde(default)]
    pub examples: PairExtractor,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CorpusConfig {
    /// Directory of `*.json` game records.
    pub games_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeatureSetConfig {
    pub name: String,
    /// Column layout; defaults to declaration order.
    #[serde(default)]
    pub order: Vec<String>,
    pub features: Vec<FeatureSpec>,
    #[serde(default)]
    pub utterances: UtteranceExtractor,
    #[serde(default)]
    pub actions: ActionExtractor,
}

impl FeatureSetConfig {
    pub fn extractors(&self) -> Extractors {
        Extractors {
            utterances: self.utterances.clone(),
            actions: self.actions.clone(),
        }
    }

    /// `order`, or the declaration order when none is given.
    pub fn resolved_order(&self) -> Vec<String> {
        if self.order.is_empty() {
            self.features.iter().map(|f| f.name.clone()).collect()
        } else {
            self.order.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_feature_set_dir")]
    pub feature_set_dir: PathBuf,
    #[serde(default = "default_matrices_file")]
    pub matrices_file: PathBuf,
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
    /// Flush the NDJSON log every N lines (0 = only on close).
    #[serde(default = "default_flush_every_lines")]
    pub flush_every_lines: u64,
}

fn default_feature_set_dir() -> PathBuf {
    PathBuf::from("out/feature_set")
}

fn default_matrices_file() -> PathBuf {
    PathBuf::from("out/matrices.json")
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("out/logs")
}

fn default_flush_every_lines() -> u64 {
    100
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            feature_set_dir: default_feature_set_dir(),
            matrices_file: default_matrices_file(),
            logs_dir: default_logs_dir(),
            flush_every_lines: default_flush_every_lines(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Resolve relative paths against `base` (typically the config file's directory).
    pub fn rebase(mut self, base: &Path) -> Self {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.corpus.games_dir);
        join(&mut self.output.feature_set_dir);
        join(&mut self.output.matrices_file);
        join(&mut self.output.logs_dir);
        for f in &mut self.feature_set.features {
            if let crate::definition::FeatureParams::TokenEmbedding { model_file, .. } = &mut f.params {
                join(model_file);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{Encoding, FeatureKind, FeatureParams};

    const YAML: &str = r#"
corpus:
  games_dir: data/games
feature_set:
  name: color_words
  order: [clicked, words]
  utterances: {kind: sender, sender: speaker}
  features:
    - {name: words, kind: token_enumerable, annotation: tokens, lower_case: true, min_count: 2}
    - {name: clicked, kind: action_enumerable, prefix: click, encoding: index}
    - {name: vec, kind: token_embedding, annotation: tokens, model_file: vectors.txt}
examples: {kind: utterance_then_action, action_sender: listener}
output:
  feature_set_dir: fs
  flush_every_lines: 5
"#;

    #[test]
    fn test_parse_yaml_string() {
        let c = Config::from_yaml(YAML).unwrap();
        assert_eq!(c.feature_set.name, "color_words");
        assert_eq!(c.feature_set.resolved_order(), vec!["clicked", "words"]);
        assert_eq!(
            c.feature_set.utterances,
            UtteranceExtractor::Sender {
                sender: "speaker".to_string()
            }
        );
        assert_eq!(c.feature_set.actions, ActionExtractor::All);

        let words = &c.feature_set.features[0];
        assert_eq!(words.params.kind(), FeatureKind::TokenEnumerable);
        assert_eq!(
            words.params,
            FeatureParams::TokenEnumerable {
                annotation: "tokens".to_string(),
                min_count: 2,
                encoding: Encoding::OneHot,
                lower_case: true,
            }
        );
        assert_eq!(
            c.feature_set.features[1].params,
            FeatureParams::ActionEnumerable {
                prefix: "click".to_string(),
                min_count: 1,
                encoding: Encoding::Index,
            }
        );

        assert_eq!(
            c.examples,
            PairExtractor::UtteranceThenAction {
                utterance_sender: None,
                action_sender: Some("listener".to_string()),
            }
        );
        assert_eq!(c.output.feature_set_dir, PathBuf::from("fs"));
        assert_eq!(c.output.flush_every_lines, 5);
        assert_eq!(c.output.matrices_file, default_matrices_file());
    }

    #[test]
    fn test_defaults_and_rebase() {
        let yaml = r#"
corpus: {games_dir: games}
feature_set:
  name: s
  features:
    - {name: a, kind: action_scalar}
    - {name: b, kind: token_scalar, annotation: pos}
"#;
        let c = Config::from_yaml(yaml).unwrap();
        assert_eq!(c.feature_set.resolved_order(), vec!["a", "b"]);
        assert_eq!(c.examples, PairExtractor::default());
        assert_eq!(c.output, OutputConfig::default());

        let c = Config::from_yaml(YAML).unwrap().rebase(Path::new("/base"));
        assert_eq!(c.corpus.games_dir, PathBuf::from("/base/data/games"));
        assert_eq!(c.output.feature_set_dir, PathBuf::from("/base/fs"));
        match &c.feature_set.features[2].params {
            FeatureParams::TokenEmbedding { model_file, .. } => {
                assert_eq!(model_file, &PathBuf::from("/base/vectors.txt"))
            }
            other => panic!("unexpected params {other:?}"),
        }
    }

    #[test]
    fn test_load_file_and_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gf.yaml");
        std::fs::write(&path, YAML).unwrap();
        assert_eq!(Config::load(&path).unwrap(), Config::from_yaml(YAML).unwrap());

        assert!(matches!(
            Config::load(dir.path().join("missing.yaml")),
            Err(ConfigError::Io(_))
        ));
        assert!(matches!(
            Config::from_yaml("corpus: [unclosed"),
            Err(ConfigError::Yaml(_))
        ));
        // Unknown feature kinds are rejected.
        let bad = "corpus: {games_dir: g}\nfeature_set: {name: s, features: [{name: a, kind: nope}]}\n";
        assert!(Config::from_yaml(bad).is_err());
    }
}
