//! Persisted transformation state.
//!
//! Every fitted artifact is one JSON file in a single directory, named by a
//! fixed convention keyed on the column name:
//!
//! - `scaler_<column>.json`
//! - `label_encoder_<column>.json`
//!
//! Downstream stages (attribute selection, model) put their own files in the
//! same directory through [`ArtifactStore::save_json`] / [`ArtifactStore::load_json`].
//!
//! A [`FittedState`] is loaded once and never mutated afterwards; it can be
//! shared read-only across threads.

mod encoder;
mod scaler;

pub use encoder::{EncoderState, EncoderStore};
pub use scaler::{ScalerState, ScalerStore};

use crate::error::{PipelineError, Result, ResultExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const SCALER_KIND: &str = "scaler";
pub const ENCODER_KIND: &str = "label_encoder";

/// A directory of JSON artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of an artifact of `kind` for `column`, e.g. `scaler_renda.json`.
    pub fn artifact_path(&self, kind: &str, column: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.json", kind, column))
    }

    pub fn scaler_path(&self, column: &str) -> PathBuf {
        self.artifact_path(SCALER_KIND, column)
    }

    pub fn encoder_path(&self, column: &str) -> PathBuf {
        self.artifact_path(ENCODER_KIND, column)
    }

    /// Serialize `value` to `<dir>/<file_name>`, creating the directory.
    pub fn save_json<T: Serialize>(&self, file_name: &str, value: &T) -> Result<PathBuf> {
        let path = self.dir.join(file_name);
        self.write_to(&path, value)?;
        Ok(path)
    }

    /// Deserialize `<dir>/<file_name>`.
    ///
    /// An absent file is `MissingState` labelled with `kind` and `column`.
    pub fn load_json<T: DeserializeOwned>(
        &self,
        file_name: &str,
        kind: &'static str,
        column: &str,
    ) -> Result<T> {
        self.read_from(&self.dir.join(file_name), kind, column)
    }

    pub fn save_scaler(&self, state: &ScalerState) -> Result<PathBuf> {
        let path = self.scaler_path(&state.column);
        self.write_to(&path, state)?;
        Ok(path)
    }

    pub fn load_scaler(&self, column: &str) -> Result<ScalerState> {
        self.read_from(&self.scaler_path(column), SCALER_KIND, column)
    }

    pub fn save_encoder(&self, state: &EncoderState) -> Result<PathBuf> {
        let path = self.encoder_path(state.column());
        self.write_to(&path, state)?;
        Ok(path)
    }

    pub fn load_encoder(&self, column: &str) -> Result<EncoderState> {
        self.read_from(&self.encoder_path(column), ENCODER_KIND, column)
    }

    fn write_to<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .context(format!("Failed to create artifact directory {}", self.dir.display()))?;

        let file = File::create(path).context(format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;

        debug!("Wrote artifact {}", path.display());
        Ok(())
    }

    fn read_from<T: DeserializeOwned>(
        &self,
        path: &Path,
        kind: &'static str,
        column: &str,
    ) -> Result<T> {
        if !path.is_file() {
            return Err(PipelineError::MissingState {
                kind,
                column: column.to_string(),
                path: path.to_path_buf(),
            });
        }

        let file = File::open(path).context(format!("Failed to open {}", path.display()))?;
        let value = serde_json::from_reader(BufReader::new(file))
            .map_err(PipelineError::from)
            .context(format!("Corrupt {} artifact {}", kind, path.display()))?;
        Ok(value)
    }
}

/// All scaler and encoder state needed by the transform path.
#[derive(Debug, Clone, Default)]
pub struct FittedState {
    artifact_dir: PathBuf,
    scalers: BTreeMap<String, ScalerState>,
    encoders: BTreeMap<String, EncoderState>,
}

impl FittedState {
    /// Build from freshly fitted states.
    pub fn from_parts(
        artifact_dir: impl Into<PathBuf>,
        scalers: Vec<ScalerState>,
        encoders: Vec<EncoderState>,
    ) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
            scalers: scalers.into_iter().map(|s| (s.column.clone(), s)).collect(),
            encoders: encoders
                .into_iter()
                .map(|e| (e.column().to_string(), e))
                .collect(),
        }
    }

    /// Load the scaler of every numeric column and the encoder of every
    /// categorical column. Any absent artifact fails the whole load.
    pub fn load(
        store: &ArtifactStore,
        numeric_columns: &[String],
        categorical_columns: &[String],
    ) -> Result<Self> {
        let scalers = numeric_columns
            .iter()
            .map(|col| store.load_scaler(col))
            .collect::<Result<Vec<_>>>()?;
        let encoders = categorical_columns
            .iter()
            .map(|col| store.load_encoder(col))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Loaded {} scaler(s) and {} encoder(s) from {}",
            scalers.len(),
            encoders.len(),
            store.dir().display()
        );
        Ok(Self::from_parts(store.dir(), scalers, encoders))
    }

    pub fn scaler(&self, column: &str) -> Result<&ScalerState> {
        self.scalers
            .get(column)
            .ok_or_else(|| PipelineError::MissingState {
                kind: SCALER_KIND,
                column: column.to_string(),
                path: ArtifactStore::new(&self.artifact_dir).scaler_path(column),
            })
    }

    pub fn encoder(&self, column: &str) -> Result<&EncoderState> {
        self.encoders
            .get(column)
            .ok_or_else(|| PipelineError::MissingState {
                kind: ENCODER_KIND,
                column: column.to_string(),
                path: ArtifactStore::new(&self.artifact_dir).encoder_path(column),
            })
    }

    pub fn scalers(&self) -> impl Iterator<Item = &ScalerState> {
        self.scalers.values()
    }

    pub fn encoders(&self) -> impl Iterator<Item = &EncoderState> {
        self.encoders.values()
    }
}
