//! Чистая арифметика оплаты: разбор суммы и расчёт периода.

pub mod amount;
pub mod calculator;

pub use amount::{parse_amount, parse_people_count};
pub use calculator::{compute_period, compute_split, expiry, Quote, SubscriptionError};
