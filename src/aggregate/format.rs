//! 面向用户的消息渲染（纯函数）

use super::{MarketingCopy, ProductSummary, SearchResultsSummary};

/// 组合结果全部缺失时的兜底消息
pub const APOLOGY_MESSAGE: &str =
    "I encountered some issues processing your request. Please try again with more specific details.";

const SEARCH_LIST_LIMIT: usize = 5;
const COMBINED_LIST_LIMIT: usize = 3;
const COMBINED_HEADLINE_LIMIT: usize = 2;

fn product_line(product: &ProductSummary) -> String {
    format!("• {} - ${:.2}\n", product.title, product.price)
}

/// 仅搜索：最多列出 5 个商品
pub fn format_search_message(results: &SearchResultsSummary) -> String {
    if results.count == 0 {
        return format!(
            "I couldn't find any products matching '{}'. Try adjusting your search terms or price range.",
            results.query
        );
    }

    let mut message = format!("I found {} products for '{}':\n\n", results.count, results.query);
    for product in results.products.iter().take(SEARCH_LIST_LIMIT) {
        message.push_str(&product_line(product));
    }
    if results.count > SEARCH_LIST_LIMIT {
        message.push_str(&format!("... and {} more results\n", results.count - SEARCH_LIST_LIMIT));
    }
    message
}

/// 仅营销：受众、标题、描述、行动号召，各段为空则省略
pub fn format_marketing_message(marketing: &MarketingCopy, product: &str) -> String {
    let mut message = if product.is_empty() {
        "Here's your marketing copy:\n\n".to_string()
    } else {
        format!("Here's marketing copy for '{}':\n\n", product)
    };

    if !marketing.segments.is_empty() {
        message.push_str(&format!("**Target Audience:** {}\n\n", marketing.segments.join(", ")));
    }
    push_bullets(&mut message, "**Headlines:**", &marketing.headlines);
    push_bullets(&mut message, "**Descriptions:**", &marketing.descriptions);
    if !marketing.call_to_action.is_empty() {
        message.push_str(&format!("**Call to Action:** {}\n", marketing.call_to_action));
    }
    message
}

fn push_bullets(message: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    message.push_str(title);
    message.push('\n');
    for item in items {
        message.push_str(&format!("• {}\n", item));
    }
    message.push('\n');
}

/// 组合：商品列表（前 3）+ 营销文案（前 2 条标题）；两段都缺失时返回致歉消息
pub fn format_combined_message(
    search: Option<&SearchResultsSummary>,
    marketing: Option<&MarketingCopy>,
    product: &str,
) -> String {
    let mut body = String::new();

    if let Some(results) = search.filter(|r| r.count > 0) {
        body.push_str("## Product Listings\n");
        body.push_str(&format!("Found {} products:\n", results.count));
        for p in results.products.iter().take(COMBINED_LIST_LIMIT) {
            body.push_str(&product_line(p));
        }
        if results.count > COMBINED_LIST_LIMIT {
            body.push_str(&format!("... and {} more\n", results.count - COMBINED_LIST_LIMIT));
        }
        body.push('\n');
    }

    if let Some(copy) = marketing.filter(|m| !m.headlines.is_empty()) {
        body.push_str("## Marketing Copy\n");
        if !copy.segments.is_empty() {
            body.push_str(&format!("**Target Audience:** {}\n\n", copy.segments.join(", ")));
        }
        body.push_str("**Top Headlines:**\n");
        for headline in copy.headlines.iter().take(COMBINED_HEADLINE_LIMIT) {
            body.push_str(&format!("• {}\n", headline));
        }
        body.push('\n');
        if !copy.call_to_action.is_empty() {
            body.push_str(&format!("**Call to Action:** {}\n", copy.call_to_action));
        }
    }

    if body.is_empty() {
        return APOLOGY_MESSAGE.to_string();
    }
    if product.is_empty() {
        body
    } else {
        format!("Here's what I found for '{}':\n\n{}", product, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn products(n: usize) -> SearchResultsSummary {
        let items = (1..=n)
            .map(|i| ProductSummary {
                title: format!("Item {i}"),
                price: i as f64 * 10.0,
                link: format!("https://shop.example/{i}"),
            })
            .collect();
        SearchResultsSummary::new("widgets", items)
    }

    fn copy() -> MarketingCopy {
        MarketingCopy {
            headlines: vec!["H1".into(), "H2".into(), "H3".into()],
            descriptions: vec!["D1".into()],
            call_to_action: "Buy now".into(),
            segments: vec!["Gamers".into(), "Students".into()],
        }
    }

    #[test]
    fn test_empty_search_apologises_with_query() {
        let msg = format_search_message(&SearchResultsSummary::empty("unicorn saddle"));
        assert!(msg.contains("couldn't find any products"));
        assert!(msg.contains("unicorn saddle"));
    }

    #[test]
    fn test_search_truncates_after_five() {
        let msg = format_search_message(&products(10));
        assert!(msg.contains("10 products"));
        assert!(msg.contains("5 more results"));
        assert!(msg.contains("• Item 5 - $50.00"));
        assert!(!msg.contains("Item 6"));
    }

    #[test]
    fn test_search_without_truncation() {
        let msg = format_search_message(&products(2));
        assert!(msg.starts_with("I found 2 products for 'widgets':"));
        assert!(!msg.contains("more results"));
    }

    #[test]
    fn test_marketing_sections() {
        let msg = format_marketing_message(&copy(), "desk lamp");
        assert!(msg.starts_with("Here's marketing copy for 'desk lamp':"));
        assert!(msg.contains("**Target Audience:** Gamers, Students"));
        assert!(msg.contains("**Headlines:**\n• H1\n• H2\n• H3\n"));
        assert!(msg.contains("**Descriptions:**\n• D1\n"));
        assert!(msg.ends_with("**Call to Action:** Buy now\n"));
    }

    #[test]
    fn test_marketing_omits_empty_sections() {
        let msg = format_marketing_message(
            &MarketingCopy {
                segments: vec!["X".into()],
                ..MarketingCopy::default()
            },
            "",
        );
        assert!(msg.starts_with("Here's your marketing copy:"));
        assert!(!msg.contains("**Headlines:**"));
        assert!(!msg.contains("**Call to Action:**"));
    }

    #[test]
    fn test_combined_limits_products_and_headlines() {
        let results = products(4);
        let marketing = copy();
        let msg = format_combined_message(Some(&results), Some(&marketing), "widgets");
        assert!(msg.starts_with("Here's what I found for 'widgets':"));
        assert!(msg.contains("## Product Listings\nFound 4 products:"));
        assert!(msg.contains("... and 1 more\n"));
        assert!(msg.contains("## Marketing Copy"));
        assert!(msg.contains("**Top Headlines:**\n• H1\n• H2\n\n"));
        assert!(!msg.contains("H3"));
    }

    #[test]
    fn test_combined_with_nothing_apologises() {
        assert_eq!(format_combined_message(None, None, "widgets"), APOLOGY_MESSAGE);
        let empty = SearchResultsSummary::empty("widgets");
        assert_eq!(format_combined_message(Some(&empty), None, ""), APOLOGY_MESSAGE);
    }
}
