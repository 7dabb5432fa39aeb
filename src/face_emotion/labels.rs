use std::fs;
use std::path::Path;

use anyhow::Error;

use crate::face_emotion::types::Emotion;

/// Class order of the FER-2013 style models this demo is usually paired with.
pub const DEFAULT_LABEL_ORDER: [Emotion; 7] = [
    Emotion::Angry,
    Emotion::Disgust,
    Emotion::Fear,
    Emotion::Happy,
    Emotion::Sad,
    Emotion::Surprise,
    Emotion::Neutral,
];

/// Ordered class-index to label mapping shipped alongside a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<Emotion>,
}

impl Default for LabelSet {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABEL_ORDER.to_vec(),
        }
    }
}

impl LabelSet {
    pub fn new(labels: Vec<Emotion>) -> Self {
        Self { labels }
    }

    /// Parse a JSON array of label names, e.g. `["Angry", "Disgust", ...]`.
    pub fn from_json(json: &str) -> Result<LabelSet, Error> {
        let labels: Vec<Emotion> = serde_json::from_str(json)?;
        if labels.is_empty() {
            return Err(Error::msg("label file contains no labels"));
        }
        Ok(LabelSet { labels })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<LabelSet, Error> {
        let json = fs::read_to_string(path.as_ref())
            .map_err(|e| Error::msg(format!("failed to read labels {:?}: {}", path.as_ref(), e)))?;
        Self::from_json(&json)
    }

    pub fn get(&self, index: usize) -> Option<Emotion> {
        self.labels.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// How a predicted class index becomes an overlay label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LabelPolicy {
    /// The branch chain the demo has always shipped with: 0 is Angry, 1 is
    /// Disgust and every other index falls through to Surprise. Fear, Happy,
    /// Neutral and Sad can never be produced.
    #[default]
    Legacy,
    /// Look the index up in an ordered label set.
    Direct(LabelSet),
}

impl LabelPolicy {
    pub fn label(&self, index: usize) -> Option<Emotion> {
        match self {
            LabelPolicy::Legacy => Some(legacy_label(index)),
            LabelPolicy::Direct(labels) => labels.get(index),
        }
    }

    /// Number of model classes that map to no label.
    pub fn unlabelled_classes(&self, num_classes: usize) -> usize {
        match self {
            LabelPolicy::Legacy => 0,
            LabelPolicy::Direct(labels) => num_classes.saturating_sub(labels.len()),
        }
    }
}

fn legacy_label(index: usize) -> Emotion {
    // every branch after the first two compares against 1 as well, so they never match
    match index {
        0 => Emotion::Angry,
        1 => Emotion::Disgust,
        _ => Emotion::Surprise,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[rstest]
    #[case(0, Emotion::Angry)]
    #[case(1, Emotion::Disgust)]
    #[case(2, Emotion::Surprise)]
    #[case(3, Emotion::Surprise)]
    #[case(4, Emotion::Surprise)]
    #[case(5, Emotion::Surprise)]
    #[case(6, Emotion::Surprise)]
    #[case(42, Emotion::Surprise)]
    fn test_legacy_policy(#[case] index: usize, #[case] expected: Emotion) {
        assert_eq!(LabelPolicy::Legacy.label(index), Some(expected));
    }

    #[test]
    fn test_legacy_policy_unreachable_labels() {
        let produced: Vec<Emotion> = (0..7).filter_map(|i| LabelPolicy::Legacy.label(i)).collect();
        for unreachable in [Emotion::Fear, Emotion::Happy, Emotion::Neutral, Emotion::Sad] {
            assert!(!produced.contains(&unreachable));
        }
    }

    #[rstest]
    #[case(0, Some(Emotion::Angry))]
    #[case(3, Some(Emotion::Happy))]
    #[case(6, Some(Emotion::Neutral))]
    #[case(7, None)]
    fn test_direct_policy(#[case] index: usize, #[case] expected: Option<Emotion>) {
        let policy = LabelPolicy::Direct(LabelSet::default());
        assert_eq!(policy.label(index), expected);
    }

    #[rstest]
    #[case(LabelPolicy::Legacy, 12, 0)]
    #[case(LabelPolicy::Direct(LabelSet::default()), 7, 0)]
    #[case(LabelPolicy::Direct(LabelSet::default()), 5, 0)]
    #[case(LabelPolicy::Direct(LabelSet::default()), 10, 3)]
    fn test_unlabelled_classes(#[case] policy: LabelPolicy, #[case] num_classes: usize, #[case] expected: usize) {
        assert_eq!(policy.unlabelled_classes(num_classes), expected);
    }

    #[test]
    fn test_label_set_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"["Happy", "sad", "Neutral"]"#).unwrap();

        let labels = LabelSet::from_file(file.path()).unwrap();
        assert_eq!(labels, LabelSet::new(vec![Emotion::Happy, Emotion::Sad, Emotion::Neutral]));
    }

    #[test]
    fn test_label_set_rejects_bad_input() {
        assert!(LabelSet::from_json("[]").is_err());
        assert!(LabelSet::from_json(r#"["Angry", "Contempt"]"#).is_err());
        assert!(LabelSet::from_json("{").is_err());
    }
}
