//! Word-set text similarity.

use std::collections::HashSet;

/// Lower-case `text`, strip punctuation, and split on whitespace.
pub fn word_set(text: &str) -> HashSet<String> {
  let cleaned: String = text
    .to_lowercase()
    .chars()
    .filter(|c| c.is_alphanumeric() || c.is_whitespace())
    .collect();
  cleaned.split_whitespace().map(str::to_owned).collect()
}

/// Jaccard similarity `|A ∩ B| / |A ∪ B|` over the word sets of two texts.
///
/// Symmetric. Absent or empty texts have similarity 0.
pub fn jaccard(a: Option<&str>, b: Option<&str>) -> f64 {
  let (Some(a), Some(b)) = (a, b) else {
    return 0.0;
  };
  let a = word_set(a);
  let b = word_set(b);

  let union = a.union(&b).count();
  if union == 0 {
    return 0.0;
  }
  let intersection = a.intersection(&b).count();
  intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identical_texts_are_one() {
    let t = "Covered entities must file an annual report.";
    assert_eq!(jaccard(Some(t), Some(t)), 1.0);
  }

  #[test]
  fn punctuation_and_case_are_ignored() {
    assert_eq!(
      jaccard(Some("File the REPORT, now!"), Some("file the report now")),
      1.0
    );
  }

  #[test]
  fn empty_and_absent_are_zero() {
    assert_eq!(jaccard(None, None), 0.0);
    assert_eq!(jaccard(Some(""), Some("")), 0.0);
    assert_eq!(jaccard(Some("   "), Some("...")), 0.0);
    assert_eq!(jaccard(Some("anything"), None), 0.0);
  }

  #[test]
  fn partial_overlap() {
    // {a, b, c} vs {b, c, d}: 2 / 4
    assert_eq!(jaccard(Some("a b c"), Some("b c d")), 0.5);
  }

  #[test]
  fn symmetric() {
    let pairs = [
      ("the rule applies to lenders", "the rule applies to all banks"),
      ("", "non-empty text"),
      ("One, two; three.", "three two one four"),
      ("stay", "stayed"),
    ];
    for (a, b) in pairs {
      assert_eq!(jaccard(Some(a), Some(b)), jaccard(Some(b), Some(a)));
    }
  }

  #[test]
  fn duplicate_words_count_once() {
    assert_eq!(jaccard(Some("report report report"), Some("report")), 1.0);
  }
}
