use crate::config::GestureConfig;
use crate::error::GestureError;
use api::{ActionKind, GestureEvent, LandmarkFrame};
use serde::{Deserialize, Serialize};

/// Standard 21-point hand landmark indices.
pub const WRIST: usize = 0;
pub const THUMB_TIP: usize = 4;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_TIP: usize = 12;
pub const RING_TIP: usize = 16;
pub const PINKY_TIP: usize = 20;
pub const HAND_POINTS: usize = 21;

const TIPS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

/// 5 tip-to-wrist distances plus 10 pairwise tip distances, all divided
/// by the wrist-to-middle-knuckle span.
pub const DESCRIPTOR_LEN: usize = 15;

/// Similarity decay gain; exp(-GAIN * mse) keeps an exact match at 1.0
/// and separates near-misses enough for the tie epsilon to bite.
const SIMILARITY_GAIN: f32 = 8.0;

const THRESHOLD_MARGIN: f32 = 0.02;
const THRESHOLD_FLOOR: f32 = 0.5;

/// Scale- and rotation-invariant geometric signature of a hand pose.
/// Distances only, so in-plane rotation and camera distance drop out.
/// `None` when the frame does not hold a full hand landmark set or the
/// palm span degenerates.
pub fn descriptor(frame: &LandmarkFrame) -> Option<[f32; DESCRIPTOR_LEN]> {
    if frame.points.len() < HAND_POINTS {
        return None;
    }
    let p = &frame.points;
    let palm = p[WRIST].distance(p[MIDDLE_MCP]);
    if palm < 1e-5 {
        return None;
    }

    let mut out = [0.0f32; DESCRIPTOR_LEN];
    let mut k = 0;
    for &tip in &TIPS {
        out[k] = p[WRIST].distance(p[tip]) / palm;
        k += 1;
    }
    for i in 0..TIPS.len() {
        for j in (i + 1)..TIPS.len() {
            out[k] = p[TIPS[i]].distance(p[TIPS[j]]) / palm;
            k += 1;
        }
    }
    Some(out)
}

/// Similarity in (0, 1]; 1.0 for an exact descriptor match.
pub fn similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mse: f32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        / a.len() as f32;
    (-SIMILARITY_GAIN * mse).exp()
}

/// Named gesture with its reference signature, the trained acceptance
/// threshold, and the desktop action it is bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureProfile {
    pub name: String,
    pub action: ActionKind,
    pub descriptor: Vec<f32>,
    pub threshold: f32,
}

/// Train a profile from sample frames of the user holding the pose.
/// The threshold comes from the intra-class score spread: tight samples
/// earn a strict threshold, sloppy ones a forgiving one.
pub fn train_profile(
    name: &str,
    action: ActionKind,
    samples: &[LandmarkFrame],
    config: &GestureConfig,
) -> Result<GestureProfile, GestureError> {
    if samples.len() < config.min_train_samples {
        return Err(GestureError::InsufficientSamples {
            have: samples.len(),
            need: config.min_train_samples,
        });
    }

    let descriptors: Vec<[f32; DESCRIPTOR_LEN]> =
        samples.iter().filter_map(descriptor).collect();
    if descriptors.len() < config.min_train_samples {
        return Err(GestureError::MalformedSamples);
    }

    let mut mean = [0.0f32; DESCRIPTOR_LEN];
    for d in &descriptors {
        for (m, v) in mean.iter_mut().zip(d.iter()) {
            *m += v;
        }
    }
    for m in &mut mean {
        *m /= descriptors.len() as f32;
    }

    let scores: Vec<f32> = descriptors.iter().map(|d| similarity(&mean, d)).collect();
    let score_mean = scores.iter().sum::<f32>() / scores.len() as f32;
    let score_var = scores
        .iter()
        .map(|s| (s - score_mean) * (s - score_mean))
        .sum::<f32>()
        / scores.len() as f32;
    let threshold =
        (score_mean - 2.0 * score_var.sqrt() - THRESHOLD_MARGIN).clamp(THRESHOLD_FLOOR, 0.98);

    Ok(GestureProfile {
        name: name.to_string(),
        action,
        descriptor: mean.to_vec(),
        threshold,
    })
}

/// Matches conditioned hand frames against the loaded profile set.
pub struct GestureClassifier {
    profiles: Vec<GestureProfile>,
    tie_epsilon: f32,
}

impl GestureClassifier {
    pub fn new(profiles: Vec<GestureProfile>, config: &GestureConfig) -> Self {
        Self {
            profiles,
            tie_epsilon: config.tie_epsilon,
        }
    }

    pub fn profiles(&self) -> &[GestureProfile] {
        &self.profiles
    }

    /// Replace the profile set, e.g. after retraining.
    pub fn set_profiles(&mut self, profiles: Vec<GestureProfile>) {
        self.profiles = profiles;
    }

    /// Classify one conditioned hand frame. No match and ambiguous
    /// matches both yield `None`; that is the expected common case, not
    /// an error. Two profiles within the tie epsilon of each other
    /// resolve to `None` rather than an arbitrary pick.
    pub fn classify(&self, conditioned: &LandmarkFrame) -> Option<GestureEvent> {
        let desc = descriptor(conditioned)?;

        let mut best: Option<(&GestureProfile, f32)> = None;
        let mut runner_up = f32::NEG_INFINITY;
        for profile in &self.profiles {
            let score = similarity(&profile.descriptor, &desc);
            match best {
                Some((_, best_score)) if score <= best_score => {
                    runner_up = runner_up.max(score);
                }
                _ => {
                    if let Some((_, prev)) = best {
                        runner_up = runner_up.max(prev);
                    }
                    best = Some((profile, score));
                }
            }
        }

        let (profile, score) = best?;
        if score < profile.threshold {
            return None;
        }
        if (score - runner_up).abs() < self.tie_epsilon {
            return None;
        }

        Some(GestureEvent {
            name: profile.name.clone(),
            confidence: score,
            timestamp: conditioned.timestamp,
        })
    }

    /// Action bound to a gesture name, for the fusion mapper.
    pub fn action_for(&self, name: &str) -> Option<ActionKind> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.action)
    }
}
