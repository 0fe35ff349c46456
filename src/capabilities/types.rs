//! 能力调用的参数与结果类型
//!
//! 三种已知能力各有强类型参数 / 结果；来自 LLM 的调用参数先保留为原始 JSON（Raw），
//! 由各能力自行校验，结果中无法识别的形状统一落入 Json 变体。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::CapabilityError;

pub const SEARCH_MARKETPLACE: &str = "search_marketplace";
pub const GET_TASTE_PROFILE: &str = "get_taste_profile";
pub const GENERATE_AD_COPY: &str = "generate_ad_copy";

/// 一次能力调用：名称 + 参数
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityCall {
    pub name: String,
    pub args: CapabilityArgs,
}

impl CapabilityCall {
    pub fn new(name: impl Into<String>, args: CapabilityArgs) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// 搜索调用；价格为 0 表示不限
    pub fn search(query: impl Into<String>, min_price: f64, max_price: f64) -> Self {
        Self::new(
            SEARCH_MARKETPLACE,
            CapabilityArgs::Search(SearchMarketplaceArgs {
                query: query.into(),
                min_price,
                max_price,
            }),
        )
    }

    pub fn taste_profile(description: impl Into<String>) -> Self {
        Self::new(
            GET_TASTE_PROFILE,
            CapabilityArgs::TasteProfile(TasteProfileArgs {
                description: description.into(),
            }),
        )
    }

    pub fn ad_copy(product_title: impl Into<String>, segments: Vec<String>) -> Self {
        Self::new(
            GENERATE_AD_COPY,
            CapabilityArgs::AdCopy(AdCopyArgs {
                product_title: product_title.into(),
                segments,
            }),
        )
    }

    /// 由外部（LLM）给出的名称与 JSON 参数构造；非对象参数按空对象处理
    pub fn from_json(name: impl Into<String>, arguments: Value) -> Self {
        let map = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(name, CapabilityArgs::Raw(map))
    }

    /// 参数的 JSON 形式（审计日志预览用）
    pub fn args_json(&self) -> Value {
        match &self.args {
            CapabilityArgs::Search(a) => serde_json::to_value(a).unwrap_or(Value::Null),
            CapabilityArgs::TasteProfile(a) => serde_json::to_value(a).unwrap_or(Value::Null),
            CapabilityArgs::AdCopy(a) => serde_json::to_value(a).unwrap_or(Value::Null),
            CapabilityArgs::Raw(map) => Value::Object(map.clone()),
        }
    }
}

/// 能力参数：三种已知形状 + 原始 JSON（前向兼容）
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityArgs {
    Search(SearchMarketplaceArgs),
    TasteProfile(TasteProfileArgs),
    AdCopy(AdCopyArgs),
    Raw(Map<String, Value>),
}

/// search_marketplace 参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchMarketplaceArgs {
    /// 商品搜索关键词
    pub query: String,
    /// 最低价（可选，0 表示不限）
    #[serde(default)]
    pub min_price: f64,
    /// 最高价（可选，0 表示不限）
    #[serde(default)]
    pub max_price: f64,
}

/// get_taste_profile 参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TasteProfileArgs {
    /// 用于分析受众的商品描述
    pub description: String,
}

/// generate_ad_copy 参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AdCopyArgs {
    /// 商品名称
    pub product_title: String,
    /// 目标受众分群
    pub segments: Vec<String>,
}

impl SearchMarketplaceArgs {
    pub fn from_args(args: &CapabilityArgs) -> Result<Self, CapabilityError> {
        match args {
            CapabilityArgs::Search(a) => Ok(a.clone()),
            CapabilityArgs::Raw(map) => Ok(Self {
                query: required_str(map, "query")?,
                min_price: optional_number(map, "min_price"),
                max_price: optional_number(map, "max_price"),
            }),
            _ => Err(CapabilityError::InvalidArgument("query".to_string())),
        }
    }
}

impl TasteProfileArgs {
    pub fn from_args(args: &CapabilityArgs) -> Result<Self, CapabilityError> {
        match args {
            CapabilityArgs::TasteProfile(a) => Ok(a.clone()),
            CapabilityArgs::Raw(map) => Ok(Self {
                description: required_str(map, "description")?,
            }),
            _ => Err(CapabilityError::InvalidArgument("description".to_string())),
        }
    }
}

impl AdCopyArgs {
    pub fn from_args(args: &CapabilityArgs) -> Result<Self, CapabilityError> {
        match args {
            CapabilityArgs::AdCopy(a) => Ok(a.clone()),
            CapabilityArgs::Raw(map) => {
                let product_title = required_str(map, "product_title")?;
                let items = map
                    .get("segments")
                    .and_then(Value::as_array)
                    .ok_or_else(|| CapabilityError::InvalidArgument("segments".to_string()))?;
                let segments = items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| {
                        v.as_str().map(str::to_string).ok_or_else(|| {
                            CapabilityError::InvalidArgument(format!("segments[{i}]"))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self {
                    product_title,
                    segments,
                })
            }
            _ => Err(CapabilityError::InvalidArgument("product_title".to_string())),
        }
    }
}

fn required_str(map: &Map<String, Value>, key: &str) -> Result<String, CapabilityError> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CapabilityError::InvalidArgument(key.to_string()))
}

fn optional_number(map: &Map<String, Value>, key: &str) -> f64 {
    map.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

/// 平台无关的商品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub title: String,
    pub price: f64,
    pub link: String,
}

/// 受众分群及其亲和度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    pub affinity_score: f64,
}

/// generate_ad_copy 的原生结果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AdCopyResult {
    pub headlines: Vec<String>,
    pub descriptions: Vec<String>,
    pub call_to_action: String,
}

/// 能力结果：原生强类型结果，或任意 JSON（外部实现 / 未知形状）
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityOutput {
    Products(Vec<Product>),
    Segments(Vec<Segment>),
    AdCopy(AdCopyResult),
    Json(Value),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_search_args_parse_optional_prices() {
        let call = CapabilityCall::from_json(SEARCH_MARKETPLACE, json!({"query": "laptop", "max_price": 900}));
        let args = SearchMarketplaceArgs::from_args(&call.args).unwrap();
        assert_eq!(args.query, "laptop");
        assert_eq!(args.min_price, 0.0);
        assert_eq!(args.max_price, 900.0);
    }

    #[test]
    fn test_raw_search_args_missing_query_names_parameter() {
        let call = CapabilityCall::from_json(SEARCH_MARKETPLACE, json!({"max_price": 900}));
        let err = SearchMarketplaceArgs::from_args(&call.args).unwrap_err();
        assert!(err.to_string().contains("query"));
    }

    #[test]
    fn test_raw_ad_copy_rejects_non_string_segment() {
        let call = CapabilityCall::from_json(
            GENERATE_AD_COPY,
            json!({"product_title": "Lamp", "segments": ["Designers", 7]}),
        );
        let err = AdCopyArgs::from_args(&call.args).unwrap_err();
        assert!(err.to_string().contains("segments[1]"));
    }

    #[test]
    fn test_mismatched_typed_args_rejected() {
        let call = CapabilityCall::taste_profile("lamp");
        assert!(SearchMarketplaceArgs::from_args(&call.args).is_err());
    }

    #[test]
    fn test_non_object_arguments_become_empty_map() {
        let call = CapabilityCall::from_json(GET_TASTE_PROFILE, json!("oops"));
        assert_eq!(call.args, CapabilityArgs::Raw(Map::new()));
        assert_eq!(call.args_json(), json!({}));
    }
}
