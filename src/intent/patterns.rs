//! 意图识别用的正则表与停用词表
//!
//! 进程级只读常量，首次使用时编译（OnceLock），之后并发只读。
//! 所有正则作用于已转小写的文本。

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

/// 搜索信号：检索动词 + 商品名词，或价格限定短语
pub const SEARCH_PATTERNS: &[&str] = &[
    r"^\s*(find|search|show|list|browse|look\s+for)\b",
    r"\b(find|search|show|list|get|browse)\b.*\b(products?|items?|listings?|deals?)\b",
    r"\b(find|search|show)\s+me\b",
    r"\b(under|below)\s+\$?\d",
    r"\bless\s+than\s+\$?\d",
    r"\bbetween\s+\$?\d+.*\$?\d+",
];

/// 营销信号：营销 / 广告词汇，或“目标受众”类表述
pub const MARKETING_PATTERNS: &[&str] = &[
    r"\b(marketing|advertis\w*|ads?|campaigns?|copy|copywriting|promo\w*)\b",
    r"\b(create|generate|suggest|make|write)\b.*\b(ads?|marketing|copy|slogans?|headlines?)\b",
    r"\btarget\s+(audience|segment)",
];

/// 组合信号：显式连接搜索与营销
pub const COMBINED_PATTERNS: &[&str] = &[
    r"\b(find|search|show|list)\b.*\b(and|then)\b.*\b(marketing|ads?|copy|campaigns?)\b",
    r"\b(marketing|ads?)\b.*\b(for|about)\b.*\b(find|search)\b",
];

/// 提取商品短语前剥离的触发词
const TRIGGER_WORDS: &str = r"\b(find|search|show|list|get|browse|for|about|create|generate|suggest|make|write|marketing|advertis\w*|ads?|copy|campaigns?|promo\w*|target|audiences?|segments?|and|then)\b";

/// 价格子句（及其后所有内容）
const PRICE_CLAUSE: &str = r"\b(under|below|less\s+than|between)\s+\$?\d.*";

const BETWEEN_PRICE: &str = r"\bbetween\s+\$?(\d[\d,]*(?:\.\d+)?)\s+(?:and|to|-)\s+\$?(\d[\d,]*(?:\.\d+)?)";
const UPPER_PRICE: &str = r"\b(?:under|below|less\s+than)\s+\$?(\d[\d,]*(?:\.\d+)?)";

const STOP_WORDS: &[&str] = &[
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "me", "my",
    "i", "you", "it", "is", "are", "was", "were", "be", "been", "have", "has", "had", "do",
    "does", "did", "will", "would", "could", "should", "may", "might", "a", "an", "can",
    "please", "some", "any", "want", "need", "that", "this", "what", "from", "our", "your",
    "who", "how", "there", "too",
];

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

pub fn search_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| compile_all(SEARCH_PATTERNS))
}

pub fn marketing_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| compile_all(MARKETING_PATTERNS))
}

pub fn combined_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| compile_all(COMBINED_PATTERNS))
}

/// 营销词汇（即 MARKETING_PATTERNS 第一条），决定是否填充 description
pub fn marketing_vocabulary() -> Option<&'static Regex> {
    marketing_patterns().first()
}

fn single(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

pub fn trigger_words() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    single(&RE, TRIGGER_WORDS)
}

pub fn price_clause() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    single(&RE, PRICE_CLAUSE)
}

pub fn between_price() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    single(&RE, BETWEEN_PRICE)
}

pub fn upper_price() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    single(&RE, UPPER_PRICE)
}

pub fn is_stop_word(word: &str) -> bool {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.iter().copied().collect())
        .contains(word)
}

pub fn matches_any(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|re| re.is_match(text))
}
