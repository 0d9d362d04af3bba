pub mod action;
pub mod payment_config;
pub mod session;

pub use action::Action;
pub use payment_config::PaymentConfig;
pub use session::{Awaiting, JobId, Session};
