//! Rotating list of target sentences shown in the header.

#[derive(Debug, Clone)]
pub struct TargetSentences {
    sentences: Vec<String>,
    index: usize,
}

impl TargetSentences {
    /// Blank entries are dropped; an empty list yields an empty target.
    pub fn new(sentences: &[String]) -> Self {
        Self {
            sentences: sentences
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            index: 0,
        }
    }

    pub fn current(&self) -> &str {
        self.sentences
            .get(self.index)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Moves to the next sentence, wrapping around.
    pub fn advance(&mut self) -> &str {
        if !self.sentences.is_empty() {
            self.index = (self.index + 1) % self.sentences.len();
        }
        self.current()
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_advance_wraps() {
        let mut targets = TargetSentences::new(&sentences(&["CAT", "DOG"]));

        assert_eq!(targets.current(), "CAT");
        assert_eq!(targets.advance(), "DOG");
        assert_eq!(targets.advance(), "CAT");
    }

    #[test]
    fn test_blank_entries_dropped() {
        let targets = TargetSentences::new(&sentences(&["  ", "HELLO ", ""]));
        assert_eq!(targets.len(), 1);
        assert_eq!(targets.current(), "HELLO");
    }

    #[test]
    fn test_empty_list() {
        let mut targets = TargetSentences::new(&[]);
        assert_eq!(targets.current(), "");
        assert_eq!(targets.advance(), "");
    }
}
