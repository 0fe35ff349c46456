//! 能力层：能力抽象、注册表、调用参数 / 结果类型，以及三个内置能力
//! （search_marketplace / get_taste_profile / generate_ad_copy）

pub mod ad_copy;
pub mod marketplace;
pub mod registry;
pub mod taste;
pub mod types;

pub use ad_copy::AdCopyGenerator;
pub use marketplace::{MarketplaceClient, MarketplaceSearch, MockMarketplace};
pub use registry::{Capability, CapabilityRegistry};
pub use taste::{KeywordTasteProvider, QlooTasteProvider, TasteProfile, TasteProfileProvider};
pub use types::{
    AdCopyArgs, AdCopyResult, CapabilityArgs, CapabilityCall, CapabilityOutput, Product,
    SearchMarketplaceArgs, Segment, TasteProfileArgs, GENERATE_AD_COPY, GET_TASTE_PROFILE,
    SEARCH_MARKETPLACE,
};
