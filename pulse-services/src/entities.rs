//! Named-entity extraction
//!
//! `HeuristicEntityExtractor` finds maximal runs of capitalised tokens and
//! types them with gazetteers and suffix rules:
//! - country/city/state names → GPE
//! - event nouns ("Hurricane …", "… Summit", "Olympics") → EVENT
//! - corporate/institutional suffixes, known organisations, acronyms → ORG
//! - product gazetteer (matched case-insensitively, so "iPhone" works) → PRODUCT
//! - two or three title-case tokens, or a run after an honorific → PERSON
//! - any other multi-token run → ORG
//!
//! Single unknown capitalised words are ignored at sentence starts and in
//! headlines written in Title Case, where capitalisation carries no signal.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use pulse_core::{Article, EntityType};
use regex::Regex;
use serde::Serialize;

use crate::keywords::{HEADLINE_VERBS, STOPWORDS};

/// Entities kept per type by `extract_from_articles`
pub const TOP_ENTITIES_PER_TYPE: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMention {
    pub text: String,
    pub entity_type: EntityType,
}

/// Turns text into typed entity mentions
pub trait EntityExtractor: Send + Sync {
    fn extract_entities(&self, text: &str) -> Vec<EntityMention>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityCount {
    pub name: String,
    pub count: u32,
}

/// Most frequent entities per type
pub type EntityRanking = BTreeMap<EntityType, Vec<EntityCount>>;

/// Count mentions per type over the title and description of each article and keep
/// each type's top `TOP_ENTITIES_PER_TYPE` (count desc, then name asc).
///
/// Every type is present in the result, possibly with an empty list.
pub fn extract_from_articles(
    extractor: &dyn EntityExtractor,
    articles: &[Article],
) -> EntityRanking {
    let mut counters: HashMap<EntityType, HashMap<String, u32>> = HashMap::new();

    for article in articles {
        // Title and description are separate sentences
        let texts = std::iter::once(article.title.as_str()).chain(article.description.as_deref());
        for text in texts.filter(|t| !t.trim().is_empty()) {
            for mention in extractor.extract_entities(text) {
                *counters
                    .entry(mention.entity_type)
                    .or_default()
                    .entry(mention.text)
                    .or_insert(0) += 1;
            }
        }
    }

    EntityType::ALL
        .iter()
        .map(|entity_type| {
            let mut ranked: Vec<EntityCount> = counters
                .remove(entity_type)
                .unwrap_or_default()
                .into_iter()
                .map(|(name, count)| EntityCount { name, count })
                .collect();
            ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
            ranked.truncate(TOP_ENTITIES_PER_TYPE);
            (*entity_type, ranked)
        })
        .collect()
}

/// Names of one type in a ranking
pub fn names_of(ranking: &EntityRanking, entity_type: EntityType) -> HashSet<&str> {
    ranking
        .get(&entity_type)
        .map(|list| list.iter().map(|e| e.name.as_str()).collect())
        .unwrap_or_default()
}

const GPE_NAMES: &[&str] = &[
    "afghanistan", "africa", "argentina", "australia", "austria", "bangladesh", "beijing",
    "belgium", "berlin", "brazil", "britain", "california", "canada", "chicago", "chile", "china",
    "colombia", "cuba", "denmark", "dubai", "egypt", "england", "europe", "finland", "florida",
    "france", "gaza", "georgia", "germany", "greece", "hong kong", "houston", "india",
    "indonesia", "iran", "iraq", "ireland", "israel", "italy", "japan", "jerusalem", "kenya",
    "kyiv", "lebanon", "london", "los angeles", "mexico", "miami", "michigan", "moscow",
    "netherlands", "new jersey", "new york", "new york city", "nigeria", "north korea", "norway",
    "ohio", "pakistan", "paris", "pennsylvania", "philippines", "poland", "portugal", "qatar",
    "russia", "san francisco", "saudi arabia", "scotland", "seoul", "singapore", "south africa",
    "south korea", "spain", "sweden", "switzerland", "syria", "taiwan", "tehran", "texas",
    "tokyo", "turkey", "u.k.", "u.s.", "uk", "ukraine", "united kingdom", "united states", "us",
    "usa", "venezuela", "vietnam", "virginia", "washington", "west bank", "yemen",
];

const ORG_NAMES: &[&str] = &[
    "amazon", "apple", "boeing", "disney", "fifa", "google", "hamas", "hezbollah", "meta",
    "microsoft", "netflix", "nvidia", "openai", "pentagon", "reuters", "spacex", "tesla",
    "tiktok", "twitter", "uber", "walmart",
];

const ORG_SUFFIXES: &[&str] = &[
    "agency", "airlines", "association", "bank", "co", "co.", "commission", "committee",
    "company", "congress", "corp", "corp.", "corporation", "council", "court", "department",
    "fc", "federation", "foundation", "fund", "group", "inc", "inc.", "institute", "ltd",
    "ministry", "news", "parliament", "party", "police", "post", "reserve", "senate", "times",
    "university",
];

const EVENT_PREFIXES: &[&str] = &["hurricane", "operation", "storm", "tropical", "typhoon", "cyclone"];

const EVENT_SUFFIXES: &[&str] = &[
    "awards", "bowl", "championship", "championships", "conference", "cup", "election",
    "elections", "expo", "festival", "games", "marathon", "olympics", "open", "prix", "series",
    "summit", "war",
];

const PRODUCT_NAMES: &[&str] = &[
    "android", "chatgpt", "claude", "gemini", "ipad", "iphone", "macbook", "pixel", "playstation",
    "windows", "xbox",
];

const PERSON_TITLES: &[&str] = &[
    "chancellor", "dr", "dr.", "gov", "gov.", "governor", "judge", "king", "mayor", "minister",
    "mr", "mr.", "mrs", "mrs.", "ms", "ms.", "pope", "president", "prince", "princess", "queen",
    "rep", "rep.", "secretary", "sen", "sen.", "senator",
];

/// Lowercase run-interior words that may join capitalised tokens
const CONNECTORS: &[&str] = &["of", "for", "de", "del", "la", "van", "von", "al"];

/// Capitalised words that never start or extend an entity
const NON_ENTITY_WORDS: &[&str] = &[
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday", "january",
    "february", "march", "april", "june", "july", "august", "september", "october", "november",
    "december", "breaking", "exclusive", "opinion", "analysis", "today", "tonight",
];

fn token_regex() -> Option<&'static Regex> {
    static TOKEN_RE: OnceLock<Option<Regex>> = OnceLock::new();
    TOKEN_RE
        .get_or_init(|| {
            Regex::new(r"(?:[\p{L}]\.){2,}|[\p{L}\p{N}]+(?:['’\-&][\p{L}\p{N}]+)*\.?|[^\s\p{L}\p{N}]")
                .ok()
        })
        .as_ref()
}

fn is_word(token: &str) -> bool {
    token.chars().next().is_some_and(|c| c.is_alphanumeric())
}

fn is_sentence_break(token: &str) -> bool {
    matches!(token, "." | "!" | "?" | ":" | ";" | "|" | "-" | "–" | "—" | "\"" | "“" | "”")
}

fn is_acronym(token: &str) -> bool {
    let letters: Vec<char> = token.chars().filter(|c| c.is_alphabetic()).collect();
    (2..=6).contains(&letters.len()) && letters.iter().all(|c| c.is_uppercase())
}

fn is_capitalized(token: &str) -> bool {
    token.chars().next().is_some_and(|c| c.is_uppercase())
}

fn strip_possessive(token: &str) -> (&str, bool) {
    for suffix in ["'s", "’s"] {
        if let Some(stripped) = token.strip_suffix(suffix) {
            return (stripped, true);
        }
    }
    (token, false)
}

/// Strip a trailing sentence period unless the token is an abbreviation
fn strip_period(token: &str) -> &str {
    if token.ends_with('.') && token.matches('.').count() == 1 {
        let lower = token.to_lowercase();
        if !PERSON_TITLES.contains(&lower.as_str()) && !ORG_SUFFIXES.contains(&lower.as_str()) {
            return &token[..token.len() - 1];
        }
    }
    token
}

fn is_boundary_word(token: &str, lower: &str) -> bool {
    if is_acronym(token) {
        return false;
    }
    STOPWORDS.contains(&lower) || HEADLINE_VERBS.contains(&lower) || NON_ENTITY_WORDS.contains(&lower)
}

/// Headline written in Title Case: most longer words capitalised
fn is_title_case(words: &[&str]) -> bool {
    let long: Vec<&&str> = words.iter().filter(|w| w.chars().count() > 3).collect();
    if long.len() < 3 {
        return false;
    }
    let capitalized = long.iter().filter(|w| is_capitalized(w)).count();
    capitalized * 5 >= long.len() * 4
}

/// Default rule-based entity extractor
#[derive(Debug, Clone, Default)]
pub struct HeuristicEntityExtractor;

impl HeuristicEntityExtractor {
    pub fn new() -> Self {
        Self
    }

    fn classify(run: &[&str], sentence_initial: bool, title_case: bool) -> Option<(String, EntityType)> {
        let lowers: Vec<String> = run.iter().map(|t| t.to_lowercase()).collect();
        let joined_lower = lowers.join(" ");
        let name = run.join(" ");

        if GPE_NAMES.contains(&joined_lower.as_str()) {
            return Some((name, EntityType::Gpe));
        }

        let first = lowers.first()?.as_str();
        let last = lowers.last()?.as_str();

        if run.len() >= 2 && EVENT_PREFIXES.contains(&first) {
            return Some((name, EntityType::Event));
        }
        if EVENT_SUFFIXES.contains(&last) && (run.len() >= 2 || last == "olympics") {
            return Some((name, EntityType::Event));
        }

        if ORG_NAMES.contains(&joined_lower.as_str())
            || (run.len() >= 2 && ORG_SUFFIXES.contains(&last))
        {
            return Some((name, EntityType::Org));
        }

        if run.len() == 1 && is_acronym(run[0]) {
            return Some((name, EntityType::Org));
        }

        if run.len() >= 2 && PERSON_TITLES.contains(&first) {
            let rest = &run[1..];
            if rest.len() <= 3 && !rest.iter().any(|t| is_acronym(t)) {
                return Some((rest.join(" "), EntityType::Person));
            }
        }

        let has_connector = lowers.iter().any(|l| CONNECTORS.contains(&l.as_str()));
        if (2..=3).contains(&run.len()) && !has_connector && !run.iter().any(|t| is_acronym(t)) {
            return Some((name, EntityType::Person));
        }

        if run.len() == 1 {
            if sentence_initial || title_case {
                return None;
            }
            return Some((name, EntityType::Org));
        }

        Some((name, EntityType::Org))
    }

    fn flush(
        run: &mut Vec<&str>,
        sentence_initial: bool,
        title_case: bool,
        mentions: &mut Vec<EntityMention>,
    ) {
        while run
            .last()
            .is_some_and(|t| CONNECTORS.contains(&t.to_lowercase().as_str()))
        {
            run.pop();
        }
        if !run.is_empty() {
            if let Some((text, entity_type)) = Self::classify(run, sentence_initial, title_case) {
                if text.chars().count() > 1 {
                    mentions.push(EntityMention { text, entity_type });
                }
            }
        }
        run.clear();
    }
}

impl EntityExtractor for HeuristicEntityExtractor {
    fn extract_entities(&self, text: &str) -> Vec<EntityMention> {
        let Some(token_re) = token_regex() else {
            return Vec::new();
        };
        let tokens: Vec<&str> = token_re.find_iter(text).map(|m| m.as_str()).collect();
        let words: Vec<&str> = tokens.iter().copied().filter(|t| is_word(t)).collect();
        let title_case = is_title_case(&words);

        let mut mentions = Vec::new();
        let mut run: Vec<&str> = Vec::new();
        let mut run_sentence_initial = false;
        let mut at_sentence_start = true;

        for (i, raw) in tokens.iter().enumerate() {
            if !is_word(raw) {
                Self::flush(&mut run, run_sentence_initial, title_case, &mut mentions);
                if is_sentence_break(raw) {
                    at_sentence_start = true;
                }
                continue;
            }

            let ends_sentence = raw.ends_with('.') && strip_period(raw) != *raw;
            let (token, possessive) = strip_possessive(strip_period(raw));
            let lower = token.to_lowercase();

            if PRODUCT_NAMES.contains(&lower.as_str()) {
                Self::flush(&mut run, run_sentence_initial, title_case, &mut mentions);
                mentions.push(EntityMention {
                    text: token.to_string(),
                    entity_type: EntityType::Product,
                });
            } else if !run.is_empty()
                && CONNECTORS.contains(&lower.as_str())
                && tokens
                    .get(i + 1)
                    .is_some_and(|next| is_word(next) && is_capitalized(next))
            {
                run.push(token);
            } else if is_capitalized(token) && !is_boundary_word(token, &lower) {
                if run.is_empty() {
                    run_sentence_initial = at_sentence_start;
                }
                run.push(token);
                if possessive {
                    Self::flush(&mut run, run_sentence_initial, title_case, &mut mentions);
                }
            } else {
                Self::flush(&mut run, run_sentence_initial, title_case, &mut mentions);
            }

            at_sentence_start = false;
            if ends_sentence {
                Self::flush(&mut run, run_sentence_initial, title_case, &mut mentions);
                at_sentence_start = true;
            }
        }
        Self::flush(&mut run, run_sentence_initial, title_case, &mut mentions);

        mentions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn mentions(text: &str) -> Vec<(String, EntityType)> {
        HeuristicEntityExtractor::new()
            .extract_entities(text)
            .into_iter()
            .map(|m| (m.text, m.entity_type))
            .collect()
    }

    fn has(found: &[(String, EntityType)], name: &str, entity_type: EntityType) -> bool {
        found.iter().any(|(n, t)| n == name && *t == entity_type)
    }

    #[test]
    fn test_types_common_entities() {
        let found = mentions("President Joe Biden met Apple executives in Paris on Tuesday");
        assert!(has(&found, "Joe Biden", EntityType::Person), "{found:?}");
        assert!(has(&found, "Apple", EntityType::Org), "{found:?}");
        assert!(has(&found, "Paris", EntityType::Gpe), "{found:?}");
        assert!(!found.iter().any(|(n, _)| n == "Tuesday"));
    }

    #[test]
    fn test_events_orgs_and_products() {
        let found = mentions("Hurricane Milton forces the Federal Reserve to delay; iPhone sales slip");
        assert!(has(&found, "Hurricane Milton", EntityType::Event), "{found:?}");
        assert!(has(&found, "Federal Reserve", EntityType::Org), "{found:?}");
        assert!(has(&found, "iPhone", EntityType::Product), "{found:?}");
    }

    #[test]
    fn test_acronyms_and_connectors() {
        let found = mentions("Officials at the Bank of England and NATO respond to U.S. tariffs");
        assert!(has(&found, "Bank of England", EntityType::Org), "{found:?}");
        assert!(has(&found, "NATO", EntityType::Org), "{found:?}");
        assert!(has(&found, "U.S.", EntityType::Gpe), "{found:?}");
    }

    #[test]
    fn test_possessive_is_stripped() {
        let found = mentions("Officials reject Tesla's new plan");
        assert!(has(&found, "Tesla", EntityType::Org), "{found:?}");
    }

    #[test]
    fn test_sentence_initial_single_word_ignored() {
        let found = mentions("Storms batter the coast");
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn test_extract_from_articles_ranks_per_type() {
        let now = Utc::now();
        let article = |url: &str, title: &str| Article {
            url: url.to_string(),
            title: title.to_string(),
            description: Some("Talks continue in Geneva with Ukraine".to_string()),
            content: None,
            source_name: "Wire".to_string(),
            published_at: now,
            fetched_at: now,
        };
        let articles = vec![
            article("https://1", "Officials in Kyiv await aid"),
            article("https://2", "Aid reaches Kyiv"),
        ];

        let ranking = extract_from_articles(&HeuristicEntityExtractor::new(), &articles);

        assert_eq!(ranking.len(), EntityType::ALL.len());
        let gpe = &ranking[&EntityType::Gpe];
        assert_eq!(gpe[0], EntityCount { name: "Kyiv".to_string(), count: 2 });
        assert!(names_of(&ranking, EntityType::Gpe).contains("Ukraine"));
    }
}
