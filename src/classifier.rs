use std::path::Path;

use tract_onnx::prelude::*;

use crate::error::{InferenceError, ModelLoadError};
use crate::preprocess::{ImageBatch, CHANNELS, INPUT_SIZE};

/// A binary image classifier producing one score in `[0, 1]` per image.
pub trait Classifier: Send + Sync {
    fn predict(&self, batch: &ImageBatch) -> Result<f32, InferenceError>;
}

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX export of the classifier, loaded and optimized once at startup.
#[derive(Debug)]
pub struct OnnxClassifier {
    plan: Plan,
}

impl OnnxClassifier {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        let side = INPUT_SIZE as usize;
        let fail = |e: TractError| ModelLoadError {
            path: path.to_path_buf(),
            reason: format!("{e:#}"),
        };

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(fail)?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, side, side, CHANNELS)),
            )
            .map_err(fail)?
            .into_optimized()
            .map_err(fail)?
            .into_runnable()
            .map_err(fail)?;

        Ok(Self { plan })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, batch: &ImageBatch) -> Result<f32, InferenceError> {
        let data = batch
            .as_slice()
            .ok_or_else(|| InferenceError::new("input batch is not contiguous"))?;
        let input = Tensor::from_shape(batch.shape(), data)
            .map_err(|e| InferenceError::new(format!("could not build input tensor: {e:#}")))?;

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::new(format!("model run failed: {e:#}")))?;

        let first = outputs
            .first()
            .ok_or_else(|| InferenceError::new("model returned no outputs"))?;
        let view = first
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::new(format!("unexpected output type: {e:#}")))?;

        first_score(view.iter().copied())
    }
}

/// Pulls the single score out of a `[1, 1]` style batch output.
pub(crate) fn first_score(mut values: impl Iterator<Item = f32>) -> Result<f32, InferenceError> {
    values
        .next()
        .ok_or_else(|| InferenceError::new("model output is empty"))
}
