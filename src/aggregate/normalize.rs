//! 能力结果规整：原生类型直接转换，JSON 按约定字段提取，无法识别的形状退化为空结果

use serde_json::Value;

use super::{MarketingCopy, ProductSummary, SearchResultsSummary};
use crate::capabilities::CapabilityOutput;

/// 画像缺失时的兜底分群
pub const DEFAULT_SEGMENT: &str = "General Consumers";

/// 搜索结果 -> SearchResultsSummary
pub fn convert_search_results(output: &CapabilityOutput, query: &str) -> SearchResultsSummary {
    let products = match output {
        CapabilityOutput::Products(products) => products.iter().map(ProductSummary::from).collect(),
        CapabilityOutput::Json(Value::Object(map)) => match map.get("products") {
            Some(Value::Array(items)) => items.iter().filter_map(product_from_json).collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    SearchResultsSummary::new(query, products)
}

fn product_from_json(item: &Value) -> Option<ProductSummary> {
    let map = item.as_object()?;
    Some(ProductSummary {
        title: map.get("title").and_then(Value::as_str).unwrap_or_default().to_string(),
        price: map.get("price").and_then(Value::as_f64).unwrap_or(0.0),
        link: map.get("link").and_then(Value::as_str).unwrap_or_default().to_string(),
    })
}

/// 画像结果 -> 分群名称；提取不到任何分群时返回 ["General Consumers"]
pub fn extract_segments(output: &CapabilityOutput) -> Vec<String> {
    let segments: Vec<String> = match output {
        CapabilityOutput::Segments(segments) => segments.iter().map(|s| s.name.clone()).collect(),
        CapabilityOutput::Json(Value::Object(map)) => match map.get("segments") {
            Some(Value::Array(items)) => segment_names(items),
            _ => Vec::new(),
        },
        CapabilityOutput::Json(Value::Array(items)) => segment_names(items),
        _ => Vec::new(),
    };

    if segments.is_empty() {
        vec![DEFAULT_SEGMENT.to_string()]
    } else {
        segments
    }
}

fn segment_names(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(name.clone()),
            Value::Object(map) => map.get("name").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect()
}

/// 文案结果 -> MarketingCopy；无法识别时只保留 segments
pub fn convert_marketing(output: &CapabilityOutput, segments: Vec<String>) -> MarketingCopy {
    match output {
        CapabilityOutput::AdCopy(copy) => MarketingCopy {
            headlines: copy.headlines.clone(),
            descriptions: copy.descriptions.clone(),
            call_to_action: copy.call_to_action.clone(),
            segments,
        },
        CapabilityOutput::Json(Value::Object(map)) => MarketingCopy {
            headlines: string_list(map.get("headlines")),
            descriptions: string_list(map.get("descriptions")),
            call_to_action: map
                .get("call_to_action")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            segments,
        },
        _ => MarketingCopy {
            segments,
            ..MarketingCopy::default()
        },
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
