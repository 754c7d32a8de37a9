//! Logging payload construction
//!
//! Cost, end-user attribution and the standard logging object for a finished
//! passthrough call.

pub mod attribution;
pub mod builder;
pub mod cost;
pub mod standard;

pub use attribution::resolve_user_id;
pub use builder::{is_reserved_field, LoggingPayload, LoggingPayloadBuilder, PayloadError, RESERVED_FIELDS};
pub use cost::{CostCalculator, CostError, ModelPricing, PricingTable};
pub use standard::{DefaultStandardLogging, LogStatus, StandardLoggingBuilder, StandardLoggingError};
