use std::env;
use std::time::Duration;

use reqwest::Url;

const DEFAULT_UNIT_COST: u64 = 50;
const DEFAULT_PAYMENT_URL: &str = "https://example.com/payment_link";
const DEFAULT_BILLING_UNIT_SECS: u64 = 60;
const DEFAULT_SEND_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("PAYMENT_URL is not a valid URL: {0}")]
    InvalidUrl(String),
}

/// Настройки оплаты, задаются один раз при запуске.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Цена одного периода.
    pub unit_cost: u64,
    /// Внешняя ссылка на оплату под подтверждениями. Не проверяется.
    pub payment_url: Url,
    /// Длительность одного периода (минута вместо месяца).
    pub billing_unit: Duration,
    pub send_timeout: Duration,
}

impl PaymentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let unit_cost = read_number("UNIT_COST", DEFAULT_UNIT_COST)?;
        let billing_unit_secs = read_number("BILLING_UNIT_SECS", DEFAULT_BILLING_UNIT_SECS)?;
        let send_timeout_secs = read_number("SEND_TIMEOUT_SECS", DEFAULT_SEND_TIMEOUT_SECS)?;
        let payment_url = env::var("PAYMENT_URL").unwrap_or_else(|_| DEFAULT_PAYMENT_URL.to_string());

        if unit_cost == 0 {
            return Err(ConfigError::Zero("UNIT_COST"));
        }
        if billing_unit_secs == 0 {
            return Err(ConfigError::Zero("BILLING_UNIT_SECS"));
        }

        Ok(Self {
            unit_cost,
            payment_url: Url::parse(&payment_url)
                .map_err(|e| ConfigError::InvalidUrl(e.to_string()))?,
            billing_unit: Duration::from_secs(billing_unit_secs),
            send_timeout: Duration::from_secs(send_timeout_secs),
        })
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            unit_cost: DEFAULT_UNIT_COST,
            payment_url: Url::parse(DEFAULT_PAYMENT_URL).expect("default payment url is valid"),
            billing_unit: Duration::from_secs(DEFAULT_BILLING_UNIT_SECS),
            send_timeout: Duration::from_secs(DEFAULT_SEND_TIMEOUT_SECS),
        }
    }
}

fn read_number(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
        Err(_) => Ok(default),
    }
}
