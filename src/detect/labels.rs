use serde::{Deserialize, Serialize};

/// Fixed, ordered class names the model's output indices map to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(Vec<String>);

impl LabelSet {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(labels.into_iter().map(Into::into).collect())
    }

    /// Six-symbol alphabet used by the 48x48 grayscale model.
    pub fn alphabet() -> Self {
        Self::new(["A", "M", "N", "S", "T", "blank"])
    }

    /// Generic three-class set used by the 224x224 color model.
    pub fn generic() -> Self {
        Self::new(["Sign_A", "Sign_B", "Sign_C"])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Label for a class index. Indices past the end degrade to `Unknown_<index>`.
    pub fn label_for(&self, index: usize) -> String {
        match self.0.get(index) {
            Some(label) => label.clone(),
            None => format!("Unknown_{index}"),
        }
    }
}

/// Index and score of the highest score; ties go to the lowest index, NaN never wins.
pub fn top_class(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if score <= current => {}
            _ => best = Some((index, score)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_index_synthesises_label() {
        let labels = LabelSet::alphabet();
        assert_eq!(labels.label_for(0), "A");
        assert_eq!(labels.label_for(5), "blank");
        assert_eq!(labels.label_for(6), "Unknown_6");
        assert_eq!(labels.label_for(41), "Unknown_41");
    }

    #[test]
    fn top_class_prefers_first_maximum() {
        assert_eq!(top_class(&[0.1, 0.4, 0.4, 0.1]), Some((1, 0.4)));
        assert_eq!(top_class(&[0.9]), Some((0, 0.9)));
    }

    #[test]
    fn top_class_skips_nan_and_rejects_empty() {
        assert_eq!(top_class(&[f32::NAN, 0.2, 0.1]), Some((1, 0.2)));
        assert_eq!(top_class(&[f32::NAN]), None);
        assert_eq!(top_class(&[]), None);
    }

    #[test]
    fn labels_deserialize_from_plain_array() {
        let labels: LabelSet = serde_json::from_str(r#"["one","two"]"#).unwrap();
        assert_eq!(labels, LabelSet::new(["one", "two"]));
    }
}
