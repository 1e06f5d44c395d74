// binfronts/src/classify/traits.rs

use super::input::ClassifierInput;
use crate::errors::ClassifyError;
use humantime::format_duration;
use log::debug;
use ndarray::{Array1, ArrayView1};
use std::time::Instant;

/// Front detection over a dense AOI grid.
///
/// Implementations must be pure and reentrant: the batch driver calls one
/// shared classifier from several threads, each with its own grid. The
/// returned array is parallel to `input.values()`; every bin holding the
/// sentinel in the input holds `input.code_sentinel()` in the output.
pub trait FrontClassifier: Send + Sync {
    fn name(&self) -> &str;

    fn classify(&self, input: &ClassifierInput<'_>) -> Result<Array1<i32>, ClassifyError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    codes: Array1<i32>,
    sentinel: i32,
}

impl ClassificationResult {
    pub fn new(codes: Array1<i32>, sentinel: i32) -> Self {
        Self { codes, sentinel }
    }

    pub fn codes(&self) -> ArrayView1<'_, i32> {
        self.codes.view()
    }

    pub fn sentinel(&self) -> i32 {
        self.sentinel
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn is_missing(&self, local: usize) -> bool {
        self.codes[local] == self.sentinel
    }
}

/// Runs `classifier` and checks its output against the input contract.
pub fn classify_checked(
    classifier: &dyn FrontClassifier,
    input: &ClassifierInput<'_>,
) -> Result<ClassificationResult, ClassifyError> {
    let start = Instant::now();
    let codes = classifier.classify(input)?;
    if codes.len() != input.len() {
        return Err(ClassifyError::OutputLengthMismatch {
            expected: input.len(),
            found: codes.len(),
        });
    }
    let sentinel = input.code_sentinel();
    if let Some(local) = (0..input.len()).find(|&i| input.is_missing(i) && codes[i] != sentinel) {
        return Err(ClassifyError::SentinelNotPropagated(local));
    }
    debug!(
        "Classifier '{}' handled {} bins in {} rows in {}",
        classifier.name(),
        input.len(),
        input.nrows(),
        format_duration(start.elapsed())
    );
    Ok(ClassificationResult::new(codes, sentinel))
}
