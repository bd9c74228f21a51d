//! Chunk value types.

use serde::{Deserialize, Serialize};

/// How the chunker picks cut points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMethod {
    /// Prefer chapter headings, then paragraph and sentence boundaries
    Heading,
    /// Paragraph and sentence boundaries
    #[default]
    Smart,
    /// Hard cuts every `chunk_size` characters
    Fixed,
}

impl std::str::FromStr for SplitMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heading" => Ok(Self::Heading),
            "smart" => Ok(Self::Smart),
            "fixed" => Ok(Self::Fixed),
            other => Err(format!("unknown split method '{other}' (expected heading, smart or fixed)")),
        }
    }
}

/// A contiguous slice of the source document.
///
/// Offsets and lengths are in characters. Neighbouring chunks may share
/// `overlap_chars` characters of literal content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub index: usize,
    pub source_offset: usize,
}

impl Chunk {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Exclusive end offset in the source document.
    pub fn source_end(&self) -> usize {
        self.source_offset + self.char_len()
    }
}

/// A chunk after every enabled stage has run over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditedChunk {
    pub index: usize,
    pub text: String,
}

impl AsRef<str> for EditedChunk {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_method_parses_case_insensitively() {
        assert_eq!("Heading".parse::<SplitMethod>().unwrap(), SplitMethod::Heading);
        assert_eq!(" fixed ".parse::<SplitMethod>().unwrap(), SplitMethod::Fixed);
        assert!("paragraph".parse::<SplitMethod>().is_err());
    }

    #[test]
    fn source_end_is_char_based() {
        let chunk = Chunk {
            text: "第一章 开始".into(),
            index: 0,
            source_offset: 10,
        };
        assert_eq!(chunk.char_len(), 6);
        assert_eq!(chunk.source_end(), 16);
    }
}
