//! The fixed document set retrievers are built over.

use serde::{Deserialize, Serialize};

/// A single passage of text. Its identity is its position in the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Raw text of the passage.
    pub text: String,
}

impl Document {
    /// Create a new document.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// An ordered, immutable collection of documents loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    /// Build a corpus from raw passages, keeping their order.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            documents: texts.into_iter().map(Document::new).collect(),
        }
    }

    /// The five-passage Nestlé corpus used by the demos.
    pub fn nestle_sample() -> Self {
        Self::from_texts([
            "Nestlé is a Swiss multinational food and drink company headquartered in Vevey, Switzerland.",
            "Nestlé factories follow ISO 22000 and HACCP food safety standards and are ISO certified.",
            "The company was founded in 1866 by Henri Nestlé and now sells products in 188 countries.",
            "Popular Nestlé brands include Nescafé, KitKat, Maggi and Purina pet care.",
            "Nestlé runs sustainable sourcing programmes for cocoa and coffee farmers.",
        ])
    }

    /// Document at a position.
    pub fn get(&self, position: usize) -> Option<&Document> {
        self.documents.get(position)
    }

    /// Text of the document at a position.
    pub fn text(&self, position: usize) -> Option<&str> {
        self.documents.get(position).map(|d| d.text.as_str())
    }

    /// Iterate documents in corpus order.
    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the corpus holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_follow_input_order() {
        let corpus = Corpus::from_texts(["first", "second"]);
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.text(1), Some("second"));
        assert_eq!(corpus.text(2), None);
    }

    #[test]
    fn test_nestle_sample_has_five_passages() {
        assert_eq!(Corpus::nestle_sample().len(), 5);
    }
}
