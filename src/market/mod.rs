//! Market data: TTL quote cache, quote feeds and the cached quote source.

mod cache;
mod feed;
mod source;

pub use cache::{CacheEntry, QuoteCache, instant_after};
pub use feed::{
    ChartQuoteFeed, ConstantQuoteFeed, Quantity, QuoteFeed, RISK_FREE_RATE_KEY, parse_chart_price,
};
pub use source::QuoteSource;
