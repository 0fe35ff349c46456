//! 意图识别
//!
//! classify 是对小写文本的纯函数：三组正则信号决定意图类别（Combined > Marketing > Search > Unknown），
//! 再抽取商品短语、营销描述与价格区间。

pub mod patterns;

use serde::{Deserialize, Serialize};

use self::patterns::{
    between_price, combined_patterns, is_stop_word, marketing_patterns, marketing_vocabulary,
    matches_any, price_clause, search_patterns, trigger_words, upper_price,
};

/// 商品短语最多保留的词数
const MAX_PRODUCT_WORDS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Search,
    Marketing,
    Combined,
    Unknown,
}

/// 单条消息的识别结果；价格为 0 表示不限
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub kind: IntentKind,
    pub product: String,
    pub description: String,
    pub min_price: f64,
    pub max_price: f64,
}

/// 意图分类
pub fn classify(message: &str) -> Intent {
    let text = message.to_lowercase();

    let has_search = matches_any(search_patterns(), &text);
    let has_marketing = matches_any(marketing_patterns(), &text);
    let has_combined = matches_any(combined_patterns(), &text);

    let kind = if has_combined || (has_search && has_marketing) {
        IntentKind::Combined
    } else if has_marketing {
        IntentKind::Marketing
    } else if has_search {
        IntentKind::Search
    } else {
        IntentKind::Unknown
    };

    let product = extract_product(&text);
    let description = extract_description(&text, &product);
    let (min_price, max_price) = extract_price_range(&text);

    let intent = Intent {
        kind,
        product,
        description,
        min_price,
        max_price,
    };
    tracing::debug!(kind = ?intent.kind, product = %intent.product, "Intent classified");
    intent
}

/// 商品短语：去掉触发词与价格子句后，保留前 3 个非停用词且长度 > 2 的词
pub fn extract_product(message: &str) -> String {
    let text = message.to_lowercase();
    let text = match price_clause() {
        Some(re) => re.replace_all(&text, " ").into_owned(),
        None => text,
    };
    let text = match trigger_words() {
        Some(re) => re.replace_all(&text, " ").into_owned(),
        None => text,
    };

    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() > 2 && !is_stop_word(w))
        .take(MAX_PRODUCT_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// 仅当出现营销词汇时，描述取商品短语
fn extract_description(text: &str, product: &str) -> String {
    match marketing_vocabulary() {
        Some(re) if re.is_match(text) => product.to_string(),
        _ => String::new(),
    }
}

/// 价格区间：between 同时给出上下界；under / less than 只给上界；未匹配为 (0, 0)
pub fn extract_price_range(message: &str) -> (f64, f64) {
    let text = message.to_lowercase();

    if let Some(caps) = between_price().and_then(|re| re.captures(&text)) {
        let low = caps.get(1).and_then(|m| parse_amount(m.as_str()));
        let high = caps.get(2).and_then(|m| parse_amount(m.as_str()));
        if let (Some(low), Some(high)) = (low, high) {
            return (low, high);
        }
    }

    if let Some(caps) = upper_price().and_then(|re| re.captures(&text)) {
        if let Some(high) = caps.get(1).and_then(|m| parse_amount(m.as_str())) {
            return (0.0, high);
        }
    }

    (0.0, 0.0)
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_with_price_bound() {
        let intent = classify("Find laptops under $1000");
        assert_eq!(intent.kind, IntentKind::Search);
        assert_eq!(intent.product, "laptops");
        assert_eq!(intent.description, "");
        assert_eq!((intent.min_price, intent.max_price), (0.0, 1000.0));
    }

    #[test]
    fn test_search_phrases() {
        for msg in [
            "Show me gaming headphones",
            "search for running shoes",
            "list items for camping",
            "I want something less than $50",
        ] {
            assert_eq!(classify(msg).kind, IntentKind::Search, "{msg}");
        }
        assert_eq!(classify("Show me gaming headphones").product, "gaming headphones");
    }

    #[test]
    fn test_product_keeps_first_three_words() {
        let intent = classify("Find me the best gaming laptops with RGB lighting");
        assert_eq!(intent.product, "best gaming laptops");
    }

    #[test]
    fn test_marketing_intent_populates_description() {
        let intent = classify("Generate ads for wireless headphones");
        assert_eq!(intent.kind, IntentKind::Marketing);
        assert_eq!(intent.product, "wireless headphones");
        assert_eq!(intent.description, "wireless headphones");
    }

    #[test]
    fn test_target_audience_is_marketing() {
        let intent = classify("Who is the target audience for yoga mats?");
        assert_eq!(intent.kind, IntentKind::Marketing);
        assert_eq!(intent.product, "yoga mats");
    }

    #[test]
    fn test_combined_intent() {
        let intent = classify("Find laptops and create marketing copy");
        assert_eq!(intent.kind, IntentKind::Combined);
        assert_eq!(intent.product, "laptops");
        assert_eq!(intent.description, "laptops");
    }

    #[test]
    fn test_search_and_marketing_signals_make_combined() {
        let intent = classify("show me coffee makers under $80, marketing ideas too");
        assert_eq!(intent.kind, IntentKind::Combined);
        assert_eq!(intent.max_price, 80.0);
    }

    #[test]
    fn test_unrecognised_message_is_unknown() {
        let intent = classify("hello there, how are you?");
        assert_eq!(intent.kind, IntentKind::Unknown);
    }

    #[test]
    fn test_word_inside_another_word_is_not_marketing() {
        // "road" 含 "ad"，不应触发营销
        assert_eq!(classify("find a road bike").kind, IntentKind::Search);
    }

    #[test]
    fn test_price_ranges() {
        assert_eq!(extract_price_range("under $1000"), (0.0, 1000.0));
        assert_eq!(extract_price_range("between $100 and $300"), (100.0, 300.0));
        assert_eq!(extract_price_range("no price mentioned"), (0.0, 0.0));
        assert_eq!(extract_price_range("less than 49.99 dollars"), (0.0, 49.99));
        assert_eq!(extract_price_range("between 1,000 to 2,500"), (1000.0, 2500.0));
    }

    #[test]
    fn test_empty_product_is_legal() {
        assert_eq!(extract_product("find me the"), "");
    }
}
