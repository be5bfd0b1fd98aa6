pub const DEFAULT_MAX_LINES: usize = 3;
pub const SEE_MORE: &str = "See more";
pub const SEE_LESS: &str = "See less";

/// Wraps `text` into lines of at most `width` characters. Explicit newlines
/// are kept, words are wrapped greedily and words longer than a line are
/// split.
pub fn layout_lines(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines: Vec<String> = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        let mut current_len = 0usize;

        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();

            while word.len() > width {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let needed = if current_len == 0 {
                word.len()
            } else {
                current_len + 1 + word.len()
            };
            if needed > width {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current_len += word.len();
            current.extend(word);
        }

        lines.push(current);
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// Collapsible text block. The toggle exists only when the laid out text is
/// longer than `max_lines`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Truncated {
    lines: Vec<String>,
    max_lines: usize,
    expanded: bool,
}

impl Truncated {
    pub fn new(text: &str, width: usize, max_lines: usize) -> Self {
        Self {
            lines: layout_lines(text, width),
            max_lines: max_lines.max(1),
            expanded: false,
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn overflows(&self) -> bool {
        self.lines.len() > self.max_lines
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Flips between collapsed and expanded. Returns false (and does
    /// nothing) for text that fits.
    pub fn toggle(&mut self) -> bool {
        if !self.overflows() {
            return false;
        }
        self.expanded = !self.expanded;
        true
    }

    pub fn visible_lines(&self) -> &[String] {
        if self.expanded || !self.overflows() {
            &self.lines
        } else {
            &self.lines[..self.max_lines]
        }
    }

    pub fn toggle_label(&self) -> Option<&'static str> {
        if !self.overflows() {
            return None;
        }
        Some(if self.expanded { SEE_LESS } else { SEE_MORE })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_wraps_on_word_boundaries() {
        let lines = layout_lines("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn layout_keeps_newlines_and_splits_long_words() {
        let lines = layout_lines("ab\nabcdefghij", 4);
        assert_eq!(lines, vec!["ab", "abcd", "efgh", "ij"]);
    }

    #[test]
    fn short_text_never_offers_toggle() {
        let mut t = Truncated::new("short bio", 40, DEFAULT_MAX_LINES);
        assert!(!t.overflows());
        assert_eq!(t.toggle_label(), None);
        assert!(!t.toggle());
        assert!(!t.is_expanded());
        assert_eq!(t.visible_lines(), &["short bio".to_string()]);
    }

    #[test]
    fn text_exactly_at_threshold_has_no_toggle() {
        let t = Truncated::new("one\ntwo\nthree", 40, 3);
        assert_eq!(t.line_count(), 3);
        assert_eq!(t.toggle_label(), None);
    }

    #[test]
    fn long_text_collapses_and_expands() {
        let mut t = Truncated::new("l1\nl2\nl3\nl4\nl5", 40, 3);
        assert_eq!(t.toggle_label(), Some(SEE_MORE));
        assert_eq!(t.visible_lines().len(), 3);
        assert!(t.toggle());
        assert_eq!(t.toggle_label(), Some(SEE_LESS));
        assert_eq!(t.visible_lines().len(), 5);
        assert!(t.toggle());
        assert_eq!(t.visible_lines().len(), 3);
    }
}
