/// Whitespace run the target expects starting at char index `from`
fn indentation_at(target: &[char], from: usize) -> String {
    target
        .iter()
        .skip(from)
        .take_while(|c| **c == ' ' || **c == '\t')
        .collect()
}

/// Text to insert when Enter is pressed at `cursor`: the newline plus the
/// indentation the target has on the next line. `None` when the target does
/// not expect a newline there.
pub fn newline_with_indent(target: &str, cursor: usize) -> Option<String> {
    let chars: Vec<char> = target.chars().collect();
    if chars.get(cursor) != Some(&'\n') {
        return None;
    }
    Some(format!("\n{}", indentation_at(&chars, cursor + 1)))
}

/// Text to insert when Tab is pressed at `cursor`: a tab where the target has
/// one, the whole run of spaces where it expects spaces.
pub fn tab_expansion(target: &str, cursor: usize) -> Option<String> {
    let chars: Vec<char> = target.chars().collect();
    match chars.get(cursor) {
        Some('\t') => Some("\t".to_string()),
        Some(' ') => Some(chars[cursor..].iter().take_while(|c| **c == ' ').collect()),
        _ => None,
    }
}

/// Typing buffer that separates genuine keystrokes from assisted
/// insertions, producing the manual-char hint for the session engine.
#[derive(Debug, Clone, Default)]
pub struct AssistedInput {
    buffer: String,
    // One flag per char in `buffer`: true when typed by the user
    manual: Vec<bool>,
}

impl AssistedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn manual_chars(&self) -> usize {
        self.manual.iter().filter(|m| **m).count()
    }

    pub fn cursor(&self) -> usize {
        self.manual.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.manual.clear();
    }

    pub fn type_char(&mut self, c: char) {
        self.push(c, true);
    }

    pub fn type_str(&mut self, s: &str) {
        s.chars().for_each(|c| self.type_char(c));
    }

    /// Enter: the newline counts as typed, any indentation filled in from the
    /// target does not. Without an expected newline a bare `\n` is typed.
    pub fn enter(&mut self, target: &str) {
        match newline_with_indent(target, self.cursor()) {
            Some(insert) => {
                let mut chars = insert.chars();
                if let Some(newline) = chars.next() {
                    self.push(newline, true);
                }
                chars.for_each(|c| self.push(c, false));
            }
            None => self.type_char('\n'),
        }
    }

    /// Fill in the indentation the target expects at the cursor, without any
    /// keystroke. Used at the start of a snippet, where no Enter precedes it.
    pub fn indent(&mut self, target: &str) {
        let chars: Vec<char> = target.chars().collect();
        indentation_at(&chars, self.cursor())
            .chars()
            .for_each(|c| self.push(c, false));
    }

    /// Tab: one keystroke, possibly expanding to several spaces
    pub fn tab(&mut self, target: &str) {
        match tab_expansion(target, self.cursor()) {
            Some(insert) => {
                let mut chars = insert.chars();
                if let Some(first) = chars.next() {
                    self.push(first, true);
                }
                chars.for_each(|c| self.push(c, false));
            }
            None => self.type_char('\t'),
        }
    }

    pub fn backspace(&mut self) {
        if self.buffer.pop().is_some() {
            self.manual.pop();
        }
    }

    fn push(&mut self, c: char, manual: bool) {
        self.buffer.push(c);
        self.manual.push(manual);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: &str = "fn main() {\n    let x = 1;\n\tx\n}";

    #[test]
    fn test_newline_with_indent() {
        assert_eq!(newline_with_indent(TARGET, 11), Some("\n    ".to_string()));
        assert_eq!(newline_with_indent(TARGET, 0), None);
        assert_eq!(newline_with_indent("a\nb", 1), Some("\n".to_string()));
        assert_eq!(newline_with_indent("a", 5), None);
    }

    #[test]
    fn test_tab_expansion() {
        assert_eq!(tab_expansion(TARGET, 12), Some("    ".to_string()));
        assert_eq!(tab_expansion("\tx", 0), Some("\t".to_string()));
        assert_eq!(tab_expansion(TARGET, 0), None);
    }

    #[test]
    fn test_enter_inserts_assisted_indentation() {
        let mut input = AssistedInput::new();
        input.type_str("fn main() {");
        input.enter(TARGET);

        assert_eq!(input.text(), "fn main() {\n    ");
        assert_eq!(input.cursor(), 16);
        assert_eq!(input.manual_chars(), 12);
    }

    #[test]
    fn test_enter_without_expected_newline_types_it() {
        let mut input = AssistedInput::new();
        input.type_str("fn");
        input.enter(TARGET);
        assert_eq!(input.text(), "fn\n");
        assert_eq!(input.manual_chars(), 3);
    }

    #[test]
    fn test_indent_fills_leading_whitespace() {
        let target = "    x = 1\n    y = 2";
        let mut input = AssistedInput::new();
        input.indent(target);
        assert_eq!(input.text(), "    ");
        assert_eq!(input.manual_chars(), 0);

        input.type_str("x = 1");
        input.indent(target);
        assert_eq!(input.text(), "    x = 1");
        input.enter(target);
        input.type_str("y = 2");
        assert_eq!(input.text(), target);
        assert_eq!(input.manual_chars(), 11);
    }

    #[test]
    fn test_tab_counts_one_keystroke() {
        let mut input = AssistedInput::new();
        input.type_str("fn main() {\n");
        input.tab(TARGET);
        assert_eq!(input.text(), "fn main() {\n    ");
        assert_eq!(input.manual_chars(), 13);
    }

    #[test]
    fn test_backspace_over_assisted_chars() {
        let mut input = AssistedInput::new();
        input.type_str("fn main() {");
        input.enter(TARGET);
        input.backspace();
        assert_eq!(input.text(), "fn main() {\n   ");
        assert_eq!(input.manual_chars(), 12);

        input.type_char('x');
        input.backspace();
        assert_eq!(input.manual_chars(), 12);

        input.clear();
        input.backspace();
        assert_eq!(input.text(), "");
        assert_eq!(input.manual_chars(), 0);
    }

    #[test]
    fn test_full_snippet_with_assistance() {
        let mut input = AssistedInput::new();
        input.type_str("fn main() {");
        input.enter(TARGET);
        input.type_str("let x = 1;");
        input.enter(TARGET);
        input.type_char('x');
        input.enter(TARGET);
        input.type_char('}');

        assert_eq!(input.text(), TARGET);
        // 4 indentation spaces and one tab were filled in
        assert_eq!(input.manual_chars(), TARGET.chars().count() - 5);
    }
}
