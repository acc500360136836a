/// Classification of a single target position against the live input
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
    Pending,
}

/// Result of comparing the live input against the snippet being typed
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Comparison {
    pub correct_chars: usize,
    pub total_chars: usize,
    pub error_positions: Vec<usize>,
    pub is_complete: bool,
}

impl Comparison {
    pub fn error_count(&self) -> usize {
        self.error_positions.len()
    }

    /// Fraction of the target covered by the input, capped at 1.0
    pub fn progress(&self, target_len: usize) -> f64 {
        if target_len == 0 {
            return if self.total_chars == 0 { 1.0 } else { 0.0 };
        }
        (self.total_chars as f64 / target_len as f64).min(1.0)
    }
}

/// Compare `input` with `target` character by character.
///
/// Positions are char indices. Every input position past the end of the
/// target is an error, so an overlong input can never be complete.
pub fn compare_texts(input: &str, target: &str) -> Comparison {
    let mut expected = target.chars();
    let mut comparison = Comparison::default();

    for (idx, c) in input.chars().enumerate() {
        comparison.total_chars += 1;
        match expected.next() {
            Some(e) if e == c => comparison.correct_chars += 1,
            _ => comparison.error_positions.push(idx),
        }
    }

    comparison.is_complete =
        comparison.error_positions.is_empty() && expected.next().is_none();
    comparison
}

/// Per-position outcomes for display: one entry per target char, followed by
/// one `Incorrect` entry for each char typed past the end of the target.
pub fn classify(input: &str, target: &str) -> Vec<Outcome> {
    let typed: Vec<char> = input.chars().collect();
    let mut outcomes: Vec<Outcome> = target
        .chars()
        .enumerate()
        .map(|(idx, e)| match typed.get(idx) {
            Some(&c) if c == e => Outcome::Correct,
            Some(_) => Outcome::Incorrect,
            None => Outcome::Pending,
        })
        .collect();

    let overflow = typed.len().saturating_sub(outcomes.len());
    outcomes.extend(std::iter::repeat(Outcome::Incorrect).take(overflow));
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_trailing_error() {
        let c = compare_texts("abx", "abc");
        assert_eq!(c.error_positions, vec![2]);
        assert_eq!(c.correct_chars, 2);
        assert_eq!(c.total_chars, 3);
        assert!(!c.is_complete);
    }

    #[test]
    fn test_prefix_without_errors_is_not_complete() {
        let c = compare_texts("ab", "abc");
        assert!(c.error_positions.is_empty());
        assert_eq!(c.correct_chars, 2);
        assert!(!c.is_complete);
    }

    #[test]
    fn test_exact_match_is_complete() {
        let target = "for(int i=0;i<5;i++)";
        let c = compare_texts(target, target);
        assert_eq!(c.correct_chars, target.chars().count());
        assert_eq!(c.total_chars, target.chars().count());
        assert!(c.error_positions.is_empty());
        assert!(c.is_complete);
    }

    #[test]
    fn test_overflow_positions_are_errors() {
        let c = compare_texts("abcde", "abc");
        assert_eq!(c.error_positions, vec![3, 4]);
        assert_eq!(c.correct_chars, 3);
        assert!(!c.is_complete);
    }

    #[test]
    fn test_empty_input() {
        let c = compare_texts("", "abc");
        assert_eq!(c.total_chars, 0);
        assert!(c.error_positions.is_empty());
        assert!(!c.is_complete);

        assert!(compare_texts("", "").is_complete);
    }

    #[test]
    fn test_completion_iff_equal() {
        let cases = [
            ("", ""),
            ("a", ""),
            ("", "a"),
            ("fn main() {}", "fn main() {}"),
            ("fn main() {", "fn main() {}"),
            ("fn main() {}}", "fn main() {}"),
            ("fn nain() {}", "fn main() {}"),
        ];
        for (input, target) in cases {
            assert_eq!(
                compare_texts(input, target).is_complete,
                input == target,
                "input={input:?} target={target:?}"
            );
        }
    }

    #[test]
    fn test_compare_is_deterministic() {
        let a = compare_texts("whlie (x) {", "while (x) {");
        let b = compare_texts("whlie (x) {", "while (x) {");
        assert_eq!(a, b);
        assert_eq!(a.error_positions, vec![2, 3]);
    }

    #[test]
    fn test_multibyte_chars_use_char_positions() {
        let c = compare_texts("λx→", "λy→");
        assert_eq!(c.error_positions, vec![1]);
        assert_eq!(c.correct_chars, 2);
        assert_eq!(c.total_chars, 3);
    }

    #[test]
    fn test_progress() {
        let c = compare_texts("ab", "abcd");
        assert_eq!(c.progress(4), 0.5);
        assert_eq!(compare_texts("abcdef", "abcd").progress(4), 1.0);
        assert_eq!(compare_texts("", "").progress(0), 1.0);
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify("axcde", "abc"),
            vec![
                Outcome::Correct,
                Outcome::Incorrect,
                Outcome::Correct,
                Outcome::Incorrect,
                Outcome::Incorrect,
            ]
        );
        assert_eq!(
            classify("a", "abc"),
            vec![Outcome::Correct, Outcome::Pending, Outcome::Pending]
        );
    }
}
