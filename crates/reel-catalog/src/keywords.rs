//! Script keyword extraction.
//!
//! Words are ranked by frequency with ties broken by first occurrence.
//! Han text carries no word boundaries, so each run of Han characters is
//! segmented into words with the jieba dictionary first.

use jieba_rs::Jieba;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::config::DEFAULT_KEYWORD_COUNT;

const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "could", "did", "do", "does", "each", "for", "from", "had", "has",
    "have", "he", "her", "his", "how", "if", "in", "into", "is", "it", "its", "just", "more",
    "most", "my", "no", "not", "of", "on", "one", "or", "our", "out", "over", "she", "so",
    "some", "than", "that", "the", "their", "them", "then", "there", "these", "they", "this",
    "those", "to", "up", "was", "we", "were", "what", "when", "which", "who", "will", "with",
    "would", "you", "your",
    "一个", "这个", "那个", "我们", "你们", "他们", "她们", "它们", "什么", "因为", "所以",
    "但是", "可以", "就是", "已经", "自己", "这些", "那些", "如果", "没有", "还是", "不是",
    "这样", "那样", "然后", "以及",
];

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{Han}+|[\p{L}\p{N}]+(?:['’-][\p{L}\p{N}]+)*").unwrap());

static JIEBA: LazyLock<Jieba> = LazyLock::new(Jieba::new);

/// Extracts the most frequent content words from a script.
#[derive(Debug, Clone, Copy)]
pub struct KeywordExtractor {
    top_n: usize,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORD_COUNT)
    }
}

impl KeywordExtractor {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Up to `top_n` keywords, most frequent first.
    pub fn extract(&self, text: &str) -> Vec<String> {
        // word -> (count, first position)
        let mut stats: HashMap<String, (usize, usize)> = HashMap::new();
        let mut position = 0usize;

        for m in TOKEN_RE.find_iter(text) {
            for term in terms(m.as_str()) {
                if !is_content_word(&term) {
                    continue;
                }
                let entry = stats.entry(term).or_insert((0, position));
                entry.0 += 1;
                position += 1;
            }
        }

        let mut ranked: Vec<(String, usize, usize)> = stats
            .into_iter()
            .map(|(word, (count, first))| (word, count, first))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        ranked
            .into_iter()
            .take(self.top_n)
            .map(|(word, _, _)| word)
            .collect()
    }
}

fn terms(token: &str) -> Vec<String> {
    if !token.chars().next().is_some_and(is_han_char) {
        return vec![token.to_lowercase()];
    }
    JIEBA
        .cut(token, false)
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn is_han_char(c: char) -> bool {
    matches!(c as u32, 0x4E00..=0x9FFF | 0x3400..=0x4DBF | 0xF900..=0xFAFF | 0x20000..=0x2A6DF)
}

fn is_content_word(term: &str) -> bool {
    term.chars().count() >= 2
        && !term.chars().all(|c| c.is_numeric())
        && !STOP_WORDS.contains(&term)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_ranking_with_first_occurrence_ties() {
        let extractor = KeywordExtractor::new(3);
        let keywords =
            extractor.extract("Ocean waves hit the city. The ocean is calm; city lights glow.");
        assert_eq!(keywords, vec!["ocean", "city", "waves"]);
    }

    #[test]
    fn test_stop_words_and_numbers_removed() {
        let extractor = KeywordExtractor::default();
        let keywords = extractor.extract("The 2024 forest and the river");
        assert_eq!(keywords, vec!["forest", "river"]);
    }

    #[test]
    fn test_han_text_is_segmented_into_words() {
        let extractor = KeywordExtractor::new(1);
        let keywords = extractor.extract("海洋很美。我们爱海洋，海洋是家。");
        assert_eq!(keywords, vec!["海洋"]);
    }

    #[test]
    fn test_han_segmentation_avoids_cross_word_fragments() {
        let keywords = KeywordExtractor::default().extract("欢迎收看今天的节目");
        assert!(keywords.contains(&"欢迎".to_string()));
        assert!(keywords.contains(&"节目".to_string()));
        assert!(!keywords.contains(&"迎收".to_string()));
        assert!(!keywords.contains(&"天的".to_string()));
    }

    #[test]
    fn test_respects_top_n_and_empty_text() {
        let extractor = KeywordExtractor::new(2);
        assert_eq!(extractor.extract("alpha beta gamma delta").len(), 2);
        assert!(extractor.extract("").is_empty());
        assert!(extractor.extract("  ,, !!").is_empty());
    }
}
