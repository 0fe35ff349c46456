//! generate_ad_copy 能力：基于模板生成广告文案

use async_trait::async_trait;
use schemars::schema_for;
use serde_json::Value;

use crate::capabilities::{
    AdCopyArgs, AdCopyResult, Capability, CapabilityArgs, CapabilityOutput, GENERATE_AD_COPY,
};
use crate::core::CapabilityError;

const FALLBACK_AUDIENCE: &str = "General Consumers";
const CALL_TO_ACTION: &str = "Shop Now and Transform Your Experience!";

/// 模板文案生成器：三条标题、两段描述、一句行动号召
#[derive(Debug, Default, Clone)]
pub struct AdCopyGenerator;

impl AdCopyGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, product_title: &str, segments: &[String]) -> AdCopyResult {
        let segments: Vec<&str> = if segments.is_empty() {
            vec![FALLBACK_AUDIENCE]
        } else {
            segments.iter().map(String::as_str).collect()
        };
        let primary = segments[0];

        AdCopyResult {
            headlines: vec![
                format!("Discover {} - Perfect for {}", product_title, segments.join(" & ")),
                format!("{}: Designed for {}", product_title, primary),
                format!("Get Your {} Today!", product_title),
            ],
            descriptions: vec![
                format!(
                    "Experience the best {} tailored for {}. Premium quality meets your unique needs.",
                    product_title,
                    segments.join(", ")
                ),
                format!(
                    "Join thousands of satisfied customers who chose {}. Perfect for {} looking for quality and value.",
                    product_title, primary
                ),
            ],
            call_to_action: CALL_TO_ACTION.to_string(),
        }
    }
}

#[async_trait]
impl Capability for AdCopyGenerator {
    fn name(&self) -> &str {
        GENERATE_AD_COPY
    }

    fn description(&self) -> &str {
        "Generate marketing copy and advertisements for a product targeting specific audience segments"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schema_for!(AdCopyArgs)).unwrap_or(Value::Null)
    }

    async fn invoke(&self, args: &CapabilityArgs) -> Result<CapabilityOutput, CapabilityError> {
        let args = AdCopyArgs::from_args(args)?;
        let title = args.product_title.trim();
        if title.is_empty() {
            return Err(CapabilityError::InvalidArgument("product_title".to_string()));
        }
        Ok(CapabilityOutput::AdCopy(self.render(title, &args.segments)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CapabilityCall;

    #[tokio::test]
    async fn test_copy_targets_given_segments() {
        let out = AdCopyGenerator::new()
            .invoke(&CapabilityCall::ad_copy("Desk Lamp", vec!["Students".into(), "Designers".into()]).args)
            .await
            .unwrap();
        let CapabilityOutput::AdCopy(copy) = out else {
            panic!("expected ad copy");
        };
        assert_eq!(copy.headlines.len(), 3);
        assert_eq!(copy.descriptions.len(), 2);
        assert_eq!(copy.headlines[0], "Discover Desk Lamp - Perfect for Students & Designers");
        assert!(copy.descriptions[1].contains("Perfect for Students"));
        assert!(!copy.call_to_action.is_empty());
    }

    #[test]
    fn test_empty_segments_fall_back_to_general_audience() {
        let copy = AdCopyGenerator::new().render("Kettle", &[]);
        assert!(copy.headlines[1].ends_with("Designed for General Consumers"));
    }

    #[tokio::test]
    async fn test_blank_title_rejected() {
        let err = AdCopyGenerator::new()
            .invoke(&CapabilityCall::ad_copy(" ", vec![]).args)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "missing or invalid product_title parameter");
    }
}
