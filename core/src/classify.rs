//! Digit classification from raw accelerator logits.
//!
//! The accelerator emits one signed 8-bit logit per digit class. This module
//! turns those into a probability distribution with a max-shifted softmax and
//! picks the most likely class.

use serde::Serialize;

/// Number of digit classes produced by the network.
pub const NUM_CLASSES: usize = 10;

/// Outcome of classifying one logit vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    /// Raw logits as read from the output tensor.
    pub logits: [i8; NUM_CLASSES],
    /// Softmax of `logits`.
    pub probabilities: [f32; NUM_CLASSES],
    /// Index of the highest probability, lowest index on ties.
    pub predicted: usize,
}

impl Classification {
    /// Probability assigned to the predicted class.
    pub fn confidence(&self) -> f32 {
        self.probabilities[self.predicted]
    }
}

/// Numerically stable softmax over a logit vector.
///
/// Every exponent is `logit - max <= 0`, so no term exceeds 1.
pub fn softmax(logits: &[i8; NUM_CLASSES]) -> [f32; NUM_CLASSES] {
    let max = logits.iter().copied().max().unwrap_or(0);

    let mut probabilities = [0.0f32; NUM_CLASSES];
    let mut sum = 0.0f32;
    for (p, &logit) in probabilities.iter_mut().zip(logits) {
        // Widened so -128 - 127 does not wrap.
        *p = ((i32::from(logit) - i32::from(max)) as f32).exp();
        sum += *p;
    }

    for p in &mut probabilities {
        *p /= sum;
    }
    probabilities
}

/// Index of the maximum value; a later entry must be strictly greater to win.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Run softmax and argmax over a logit vector.
pub fn classify(logits: &[i8; NUM_CLASSES]) -> Classification {
    let probabilities = softmax(logits);
    let predicted = argmax(&probabilities);
    Classification {
        logits: *logits,
        probabilities,
        predicted,
    }
}
