use std::time::Duration;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    #[error("{amount} does not cover a single period costing {unit_cost}")]
    InsufficientAmount { amount: u64, unit_cost: u64 },
    #[error("people count must be at least 1")]
    InvalidPeopleCount,
    #[error("{period} periods do not fit into the calendar")]
    PeriodTooLong { period: u64 },
}

/// Результат успешного расчёта.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub amount_per_person: u64,
    pub period: u64,
}

pub fn compute_period(amount: u64, unit_cost: u64) -> Result<Quote, SubscriptionError> {
    let period = amount.checked_div(unit_cost).unwrap_or(0);
    if period < 1 {
        return Err(SubscriptionError::InsufficientAmount { amount, unit_cost });
    }
    Ok(Quote {
        amount_per_person: amount,
        period,
    })
}

pub fn compute_split(
    total: u64,
    people_count: u32,
    unit_cost: u64,
) -> Result<Quote, SubscriptionError> {
    if people_count < 1 {
        return Err(SubscriptionError::InvalidPeopleCount);
    }
    compute_period(total / u64::from(people_count), unit_cost)
}

/// `now + period × unit` или `PeriodTooLong`, если время выходит за допустимый диапазон.
pub fn expiry(
    now: DateTime<Utc>,
    period: u64,
    unit: Duration,
) -> Result<DateTime<Utc>, SubscriptionError> {
    let too_long = || SubscriptionError::PeriodTooLong { period };

    let periods = u32::try_from(period).map_err(|_| too_long())?;
    let length = unit.checked_mul(periods).ok_or_else(too_long)?;
    let length = chrono::Duration::from_std(length).map_err(|_| too_long())?;
    now.checked_add_signed(length).ok_or_else(too_long)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_is_floor_division() {
        assert_eq!(compute_period(50, 50).unwrap().period, 1);
        assert_eq!(compute_period(99, 50).unwrap().period, 1);
        assert_eq!(compute_period(100, 50).unwrap().period, 2);
        assert_eq!(compute_period(2000, 50).unwrap().period, 40);
    }

    #[test]
    fn amount_below_unit_cost_is_insufficient() {
        for amount in [0, 1, 49] {
            assert_eq!(
                compute_period(amount, 50),
                Err(SubscriptionError::InsufficientAmount { amount, unit_cost: 50 })
            );
        }
    }

    #[test]
    fn split_divides_before_pricing() {
        let quote = compute_split(300, 3, 50).unwrap();
        assert_eq!(quote, Quote { amount_per_person: 100, period: 2 });
    }

    #[test]
    fn split_share_below_unit_cost_reports_share() {
        assert_eq!(
            compute_split(100, 3, 50),
            Err(SubscriptionError::InsufficientAmount { amount: 33, unit_cost: 50 })
        );
    }

    #[test]
    fn split_rejects_zero_people() {
        assert_eq!(compute_split(300, 0, 50), Err(SubscriptionError::InvalidPeopleCount));
    }

    #[test]
    fn expiry_adds_whole_units() {
        let now = Utc::now();
        let at = expiry(now, 40, Duration::from_secs(60)).unwrap();
        assert_eq!(at - now, chrono::Duration::minutes(40));
    }

    #[test]
    fn absurd_period_is_too_long() {
        let now = Utc::now();
        assert_eq!(
            expiry(now, u64::MAX, Duration::from_secs(60)),
            Err(SubscriptionError::PeriodTooLong { period: u64::MAX })
        );
        assert!(expiry(now, u64::from(u32::MAX), Duration::from_secs(u64::MAX / 2)).is_err());
    }
}
