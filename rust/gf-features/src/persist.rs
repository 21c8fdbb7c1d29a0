//! On-disk layout of feature sets and matrix collections.
//!
//! A saved feature set is a directory holding:
//! - `<set>.json`: the [`FeatureSetMeta`] document
//! - `_f.<set>.<feature>.json`: one [`FeatureDefinition`] per feature
//!
//! Every file is written to `*.tmp` first and renamed into place.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::builder::FeatureMatrixCollection;
use crate::definition::{FeatureDefinition, FeatureError};
use crate::schema::FEATURE_FILE_PREFIX;
use crate::set::{FeatureSet, FeatureSetMeta};

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> FeatureError + '_ {
    move |source| FeatureError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), FeatureError> {
    let tmp = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| FeatureError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(&tmp, bytes).map_err(io_err(&tmp))?;
    fs::rename(&tmp, path).map_err(io_err(path))?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, FeatureError> {
    let bytes = fs::read(path).map_err(io_err(path))?;
    serde_json::from_slice(&bytes).map_err(|source| FeatureError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn metadata_file_name(set: &str) -> String {
    format!("{set}.json")
}

pub fn feature_file_name(set: &str, feature: &str) -> String {
    format!("{FEATURE_FILE_PREFIX}{set}.{feature}.json")
}

/// Write `set` into `dir`, replacing sidecars left by an earlier save of the same set.
pub fn save_feature_set(set: &FeatureSet, dir: impl AsRef<Path>) -> Result<(), FeatureError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(io_err(dir))?;

    let own_prefix = format!("{FEATURE_FILE_PREFIX}{}.", set.name());
    let keep: Vec<String> = set
        .features()
        .map(|f| feature_file_name(set.name(), f.name()))
        .collect();
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let path = entry.map_err(io_err(dir))?.path();
        let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        if name.starts_with(&own_prefix) && name.ends_with(".json") && !keep.iter().any(|k| k == name) {
            fs::remove_file(&path).map_err(io_err(&path))?;
        }
    }

    for f in set.features() {
        write_json_atomic(&dir.join(feature_file_name(set.name(), f.name())), f)?;
    }
    write_json_atomic(&dir.join(metadata_file_name(set.name())), &set.meta())
}

/// Reload a set written by [`save_feature_set`] without touching the corpus.
///
/// Embedding models are not loaded; call [`FeatureSet::ensure_models`] before computing.
pub fn load_feature_set(dir: impl AsRef<Path>) -> Result<FeatureSet, FeatureError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(FeatureError::NotFound(dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let path = entry.map_err(io_err(dir))?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "json") {
            files.push(path);
        }
    }
    files.sort();

    let mut metas: Vec<(PathBuf, FeatureSetMeta)> = Vec::new();
    let mut definitions = Vec::new();
    for path in files {
        let is_feature = path
            .file_name()
            .and_then(|s| s.to_str())
            .is_some_and(|n| n.starts_with(FEATURE_FILE_PREFIX));
        if is_feature {
            definitions.push(read_json::<FeatureDefinition>(&path)?);
        } else {
            let meta = read_json::<FeatureSetMeta>(&path)?;
            metas.push((path, meta));
        }
    }

    let meta = match metas.len() {
        1 => metas.remove(0).1,
        0 => {
            return Err(FeatureError::MalformedInput {
                context: dir.display().to_string(),
                msg: "no feature set metadata document".to_string(),
            })
        }
        n => {
            let names: Vec<String> = metas.iter().map(|(p, _)| p.display().to_string()).collect();
            return Err(FeatureError::MalformedInput {
                context: dir.display().to_string(),
                msg: format!("expected one metadata document, found {n}: {names:?}"),
            });
        }
    };

    FeatureSet::from_parts(meta, definitions).map_err(|e| e.within(dir.display().to_string()))
}

pub fn save_collection(
    collection: &FeatureMatrixCollection,
    path: impl AsRef<Path>,
) -> Result<(), FeatureError> {
    let path = path.as_ref();
    // JSON has no NaN or infinity; serde_json would write them as null.
    for datum in collection.iter() {
        let bad = datum.matrix.iter_rows().flat_map(|r| r.iter()).find(|(_, x)| !x.is_finite());
        if let Some((column, x)) = bad {
            return Err(FeatureError::MalformedInput {
                context: format!("example {:?}", datum.id),
                msg: format!("column {column} holds {x}, which JSON cannot store"),
            });
        }
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    write_json_atomic(path, collection)
}

pub fn load_collection(path: impl AsRef<Path>) -> Result<FeatureMatrixCollection, FeatureError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(FeatureError::NotFound(path.to_path_buf()));
    }
    read_json(path)
}
