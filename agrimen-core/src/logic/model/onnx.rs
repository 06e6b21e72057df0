//! ONNX predictor (feature `onnx`)
//!
//! For models exported with skl2onnx / onnxmltools. The first graph output is
//! read: `int64` labels for classifiers, `float` values for regressors.

use ndarray::{Array2, ArrayView2};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;

use super::inference::{check_shape, Predictor, TaskKind};
use crate::error::{ArtifactError, InferenceError};

pub struct OnnxPredictor {
    /// `run` needs `&mut Session`
    session: Mutex<Session>,
    output_name: String,
    n_features: usize,
    task: TaskKind,
    n_classes: Option<usize>,
}

impl std::fmt::Debug for OnnxPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxPredictor")
            .field("output_name", &self.output_name)
            .field("n_features", &self.n_features)
            .field("task", &self.task)
            .finish()
    }
}

impl OnnxPredictor {
    /// Load ONNX model from bytes (already checksum-verified by the artifact source)
    pub fn from_bytes(
        model_bytes: &[u8],
        n_features: usize,
        task: TaskKind,
        n_classes: Option<usize>,
    ) -> Result<Self, ArtifactError> {
        log::info!("Loading ONNX model from memory ({} bytes)", model_bytes.len());

        let session = Session::builder()
            .map_err(|e| ArtifactError::InvalidModel(format!("Session builder error: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ArtifactError::InvalidModel(format!("Optimization error: {}", e)))?
            .commit_from_memory(model_bytes)
            .map_err(|e| ArtifactError::InvalidModel(format!("Load from memory error: {}", e)))?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| ArtifactError::InvalidModel("No output defined".to_string()))?;

        log::info!("ONNX model loaded successfully (output '{}')", output_name);

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            n_features,
            task,
            n_classes,
        })
    }
}

impl Predictor for OnnxPredictor {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn task(&self) -> TaskKind {
        self.task
    }

    fn n_classes(&self) -> Option<usize> {
        self.n_classes
    }

    fn method(&self) -> &'static str {
        "onnx"
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>, InferenceError> {
        check_shape(self.n_features, features.ncols())?;

        let input: Array2<f32> = features.mapv(|v| v as f32);
        let input_tensor =
            Value::from_array(input).map_err(|e| InferenceError::Runtime(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError::Runtime(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| InferenceError::Runtime("No output".to_string()))?;

        match self.task {
            TaskKind::Classification => {
                let (_, labels) = output
                    .try_extract_tensor::<i64>()
                    .map_err(|e| InferenceError::Runtime(format!("Extract error: {}", e)))?;
                Ok(labels.iter().map(|&l| l as f64).collect())
            }
            TaskKind::Regression => {
                let (_, values) = output
                    .try_extract_tensor::<f32>()
                    .map_err(|e| InferenceError::Runtime(format!("Extract error: {}", e)))?;
                Ok(values.iter().map(|&v| f64::from(v)).collect())
            }
        }
    }
}
