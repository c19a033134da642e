pub use super::marketplace_analytics::Entity as MarketplaceAnalytics;
pub use super::token_prices::Entity as TokenPrices;
