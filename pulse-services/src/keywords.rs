//! Keyword extraction and counting
//!
//! Turns headline text into normalized noun-phrase-like keywords. The default
//! `PhraseExtractor` approximates noun chunks: it splits text at stopwords,
//! punctuation and common headline verbs, drops numerals, lemmatizes each
//! remaining token with light English suffix rules and lower-cases it.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// Phrases shorter than this (in characters) are dropped
pub const MIN_KEYWORD_LEN: usize = 3;

/// Anything that can pull normalized keyword phrases out of text
pub trait KeywordExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Vec<String>;
}

/// Keyword → occurrence count over one time window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordCounts {
    counts: HashMap<String, u32>,
}

impl KeywordCounts {
    pub fn get(&self, keyword: &str) -> u32 {
        self.counts.get(keyword).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Keywords sorted by count desc, then keyword asc
    pub fn most_common(&self, n: usize) -> Vec<(String, u32)> {
        let mut items: Vec<(String, u32)> =
            self.counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
        items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        items.truncate(n);
        items
    }

    pub fn as_map(&self) -> &HashMap<String, u32> {
        &self.counts
    }
}

impl FromIterator<(String, u32)> for KeywordCounts {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        let mut counts = HashMap::new();
        for (k, v) in iter {
            *counts.entry(k).or_insert(0) += v;
        }
        Self { counts }
    }
}

/// Count every keyword occurrence across `texts`
pub fn count_keywords<E, S>(extractor: &E, texts: &[S]) -> KeywordCounts
where
    E: KeywordExtractor + ?Sized,
    S: AsRef<str>,
{
    let mut counts: HashMap<String, u32> = HashMap::new();
    for text in texts {
        for keyword in extractor.extract(text.as_ref()) {
            *counts.entry(keyword).or_insert(0) += 1;
        }
    }
    KeywordCounts { counts }
}

pub(crate) const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "either",
    "else", "ever", "every", "few", "for", "from", "further", "had", "has", "have", "having", "he",
    "her", "here", "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into",
    "is", "it", "its", "itself", "just", "least", "less", "may", "me", "might", "more", "most",
    "much", "must", "my", "myself", "neither", "never", "no", "nor", "not", "now", "of", "off",
    "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "per",
    "same", "she", "should", "since", "so", "some", "such", "than", "that", "the", "their",
    "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those", "though",
    "through", "to", "too", "under", "until", "up", "upon", "us", "very", "via", "was", "we",
    "were", "what", "when", "where", "whether", "which", "while", "who", "whom", "whose", "why",
    "will", "with", "within", "without", "would", "yet", "you", "your", "yours", "yourself",
    "news", "says", "said", "say", "report", "reports", "live", "update", "updates",
    "latest", "watch", "video", "photos",
];

/// Verbs frequent in headlines; treated as phrase boundaries
///
/// Words that are as often nouns ("peace talks", "tax cuts") are left out.
pub(crate) const HEADLINE_VERBS: &[&str] = &[
    "accuses", "announces", "approves", "arrested", "asks", "backs", "bans", "becomes", "beats",
    "blames", "claims", "confirms", "dies", "does", "drops", "ends", "faces", "falls", "finds",
    "gets", "gives", "goes", "hits", "holds", "joins", "kills", "launches", "leads", "leaves",
    "loses", "makes", "meets", "moves", "names", "opens", "pushes", "raises", "reaches",
    "rejects", "reveals", "rises", "rules", "seeks", "sees", "sets", "signs", "slams", "spends",
    "starts", "strikes", "sues", "takes", "tells", "threatens", "urges", "vows", "warns", "wins",
];

const NUMBER_WORDS: &[&str] = &[
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "twenty", "thirty", "forty", "fifty", "hundred", "thousand", "million",
    "billion", "trillion", "first", "second", "third", "half", "dozen", "dozens",
];

fn token_regex() -> Option<&'static Regex> {
    static TOKEN_RE: OnceLock<Option<Regex>> = OnceLock::new();
    TOKEN_RE
        .get_or_init(|| Regex::new(r"[\p{L}\p{N}]+(?:['’.\-][\p{L}\p{N}]+)*|[^\s\p{L}\p{N}]").ok())
        .as_ref()
}

/// Default noun-phrase-like keyword extractor
#[derive(Debug, Clone, Default)]
pub struct PhraseExtractor;

impl PhraseExtractor {
    pub fn new() -> Self {
        Self
    }
}

fn is_word(token: &str) -> bool {
    token.chars().next().is_some_and(|c| c.is_alphanumeric())
}

fn like_num(token: &str) -> bool {
    let stripped: String = token.chars().filter(|c| !matches!(c, ',' | '.' | '-')).collect();
    (!stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_digit()))
        || (token.chars().any(|c| c.is_ascii_digit()) && !token.chars().any(|c| c.is_alphabetic()))
        || NUMBER_WORDS.contains(&token)
}

/// Light English lemmatizer for nouns
pub fn lemmatize(word: &str) -> String {
    let word = word
        .trim_end_matches("'s")
        .trim_end_matches("’s")
        .trim_matches(|c: char| c == '\'' || c == '’');
    let len = word.chars().count();

    if len > 4 && word.ends_with("ies") {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if len > 4 && word.ends_with("sses") {
        return word[..word.len() - 2].to_string();
    }
    if len > 4
        && (word.ends_with("xes")
            || word.ends_with("zes")
            || word.ends_with("ches")
            || word.ends_with("shes"))
    {
        return word[..word.len() - 2].to_string();
    }
    if len > 3
        && word.ends_with('s')
        && !word.ends_with("ss")
        && !word.ends_with("us")
        && !word.ends_with("is")
    {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

impl KeywordExtractor for PhraseExtractor {
    fn extract(&self, text: &str) -> Vec<String> {
        let Some(token_re) = token_regex() else {
            return Vec::new();
        };
        let mut keywords = Vec::new();
        let mut chunk: Vec<String> = Vec::new();

        let mut flush = |chunk: &mut Vec<String>| {
            if !chunk.is_empty() {
                let phrase = chunk.join(" ");
                if phrase.chars().count() >= MIN_KEYWORD_LEN {
                    keywords.push(phrase);
                }
                chunk.clear();
            }
        };

        for m in token_re.find_iter(text) {
            let token = m.as_str();
            if !is_word(token) {
                flush(&mut chunk);
                continue;
            }

            let lower = token.to_lowercase();
            if STOPWORDS.contains(&lower.as_str()) || HEADLINE_VERBS.contains(&lower.as_str()) {
                flush(&mut chunk);
                continue;
            }
            if like_num(&lower) {
                continue;
            }

            let lemma = lemmatize(&lower);
            if !lemma.is_empty() && !STOPWORDS.contains(&lemma.as_str()) {
                chunk.push(lemma);
            }
        }
        flush(&mut chunk);

        keywords
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_at_stopwords_and_verbs() {
        let extractor = PhraseExtractor::new();
        let keywords = extractor.extract("Hurricane Milton hits the Florida coast");
        assert_eq!(keywords, vec!["hurricane milton", "florida coast"]);
    }

    #[test]
    fn test_noun_like_plurals_stay_in_phrase() {
        let extractor = PhraseExtractor::new();
        assert_eq!(extractor.extract("Budget talks resume"), vec!["budget talk resume"]);
        assert_eq!(
            extractor.extract("Union calls off strike as tax cuts stall"),
            vec!["union call", "strike", "tax cut stall"]
        );
        assert_eq!(extractor.extract("Senate backs rail plans"), vec!["senate", "rail plan"]);
    }

    #[test]
    fn test_drops_numerals_and_short_phrases() {
        let extractor = PhraseExtractor::new();
        let keywords = extractor.extract("5 things to watch: AI, 2026 budget, and an ox");
        assert_eq!(keywords, vec!["thing", "budget"]);
    }

    #[test]
    fn test_lemmatizes_plurals() {
        assert_eq!(lemmatize("cities"), "city");
        assert_eq!(lemmatize("tariffs"), "tariff");
        assert_eq!(lemmatize("churches"), "church");
        assert_eq!(lemmatize("crisis"), "crisis");
        assert_eq!(lemmatize("virus"), "virus");
        assert_eq!(lemmatize("trump's"), "trump");
    }

    #[test]
    fn test_punctuation_breaks_phrases() {
        let extractor = PhraseExtractor::new();
        let keywords = extractor.extract("Markets rally; oil prices slide");
        assert_eq!(keywords, vec!["market rally", "oil price slide"]);
    }

    #[test]
    fn test_count_keywords_across_texts() {
        let extractor = PhraseExtractor::new();
        let texts = vec![
            "Tariffs on steel imports",
            "Tariffs on steel imports",
            "Wildfire spreads",
        ];
        let counts = count_keywords(&extractor, &texts);
        assert_eq!(counts.get("tariff"), 2);
        assert_eq!(counts.get("steel import"), 2);
        assert_eq!(counts.get("wildfire spread"), 1);
        assert_eq!(counts.get("missing"), 0);
        assert_eq!(counts.most_common(1), vec![("steel import".to_string(), 2)]);
    }
}
