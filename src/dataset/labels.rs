//! Class label ordering and raw class counts

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// The caller-supplied, ordered list of class names.
///
/// The position of a name is its integer label. The ordering never comes from
/// filesystem iteration and never changes within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ClassLabels {
    names: Vec<String>,
}

impl ClassLabels {
    pub fn new<I, S>(names: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        Self::try_from(names).map_err(PipelineError::ClassList)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name for `label`, if in range
    pub fn name(&self, label: usize) -> Option<&str> {
        self.names.get(label).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().map(String::as_str).enumerate()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl TryFrom<Vec<String>> for ClassLabels {
    type Error = String;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        if names.is_empty() {
            return Err("at least one class is required".into());
        }
        for (i, name) in names.iter().enumerate() {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(format!("class {} has an empty name", i));
            }
            if trimmed.contains('/') || trimmed.contains('\\') || trimmed == "." || trimmed == ".." {
                return Err(format!("class name '{}' is not a plain folder name", name));
            }
            if names[..i].contains(name) {
                return Err(format!("class '{}' listed more than once", name));
            }
        }
        Ok(Self { names })
    }
}

impl From<ClassLabels> for Vec<String> {
    fn from(labels: ClassLabels) -> Self {
        labels.names
    }
}

/// Raw (pre-augmentation) file count per label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassCounts {
    counts: Vec<usize>,
}

impl ClassCounts {
    pub fn new(counts: Vec<usize>) -> Self {
        Self { counts }
    }

    pub fn get(&self, label: usize) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.counts
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Label with the most files; ties go to the lowest label.
    /// `None` when every count is zero.
    pub fn majority(&self) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for (label, &count) in self.counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            match best {
                Some((_, best_count)) if best_count >= count => {}
                _ => best = Some((label, count)),
            }
        }
        best.map(|(label, _)| label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_follow_given_order() {
        let labels = ClassLabels::new(["tired", "hungry", "burping"]).unwrap();
        assert_eq!(labels.name(0), Some("tired"));
        assert_eq!(labels.name(2), Some("burping"));
        assert_eq!(labels.name(3), None);
    }

    #[test]
    fn test_labels_reject_duplicates_and_paths() {
        assert!(ClassLabels::new(["a", "b", "a"]).is_err());
        assert!(ClassLabels::new(Vec::<String>::new()).is_err());
        assert!(ClassLabels::new(["ok", "../escape"]).is_err());
        assert!(ClassLabels::new(["", "b"]).is_err());
    }

    #[test]
    fn test_labels_serde_validates() {
        let json = serde_json::to_string(&ClassLabels::new(["x", "y"]).unwrap()).unwrap();
        assert_eq!(json, r#"["x","y"]"#);
        assert!(serde_json::from_str::<ClassLabels>(r#"["x","x"]"#).is_err());
    }

    #[test]
    fn test_majority_argmax() {
        let counts = ClassCounts::new(vec![30, 45, 10, 50, 20]);
        assert_eq!(counts.majority(), Some(3));
        assert_eq!(counts.total(), 155);
    }

    #[test]
    fn test_majority_tie_goes_to_first() {
        assert_eq!(ClassCounts::new(vec![5, 9, 9, 2]).majority(), Some(1));
    }

    #[test]
    fn test_majority_undefined_when_empty() {
        assert_eq!(ClassCounts::new(vec![0, 0]).majority(), None);
        assert_eq!(ClassCounts::new(vec![]).majority(), None);
    }
}
