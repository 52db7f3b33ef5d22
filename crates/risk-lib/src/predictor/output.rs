//! Post-processing of raw classifier outputs
//!
//! Classifiers report their label as a float so that ONNX int64 and float
//! label tensors and the native models share one path. The label is
//! truncated toward zero and must land on 0 or 1.

use crate::error::PredictionError;

/// Coerce a raw label into a binary outcome
pub fn coerce_label(raw: f64) -> Result<u8, PredictionError> {
    if !raw.is_finite() {
        return Err(PredictionError::NonFinite(raw));
    }

    // `as` saturates, so out-of-range values still fail the match below
    match raw.trunc() as i64 {
        0 => Ok(0),
        1 => Ok(1),
        other => Err(PredictionError::NonBinary(other)),
    }
}
