//! 结果汇总与消息渲染
//!
//! normalize 把各能力的异构结果规整为统一摘要（永不失败），format 基于摘要渲染面向用户的文本。

pub mod format;
pub mod normalize;

use serde::{Deserialize, Serialize};

use crate::capabilities::Product;

pub use format::{
    format_combined_message, format_marketing_message, format_search_message, APOLOGY_MESSAGE,
};
pub use normalize::{convert_marketing, convert_search_results, extract_segments, DEFAULT_SEGMENT};

/// 平台无关的商品摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub title: String,
    pub price: f64,
    pub link: String,
}

impl From<&Product> for ProductSummary {
    fn from(p: &Product) -> Self {
        Self {
            title: p.title.clone(),
            price: p.price,
            link: p.link.clone(),
        }
    }
}

/// 搜索结果摘要；count 恒等于 products.len()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultsSummary {
    pub query: String,
    pub count: usize,
    pub products: Vec<ProductSummary>,
}

impl SearchResultsSummary {
    pub fn new(query: impl Into<String>, products: Vec<ProductSummary>) -> Self {
        Self {
            query: query.into(),
            count: products.len(),
            products,
        }
    }

    pub fn empty(query: impl Into<String>) -> Self {
        Self::new(query, Vec::new())
    }
}

/// 营销文案
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarketingCopy {
    pub headlines: Vec<String>,
    pub descriptions: Vec<String>,
    pub call_to_action: String,
    #[serde(rename = "target_segments")]
    pub segments: Vec<String>,
}
