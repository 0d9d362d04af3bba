/// Данные кнопок, которые бот отдаёт и получает обратно в callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    PayFixed,
    CustomAmount,
    Split,
    PayFixedAgain,
    CustomAmountAgain,
    SplitAgain,
    Stop,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::PayFixed,
        Action::CustomAmount,
        Action::Split,
        Action::PayFixedAgain,
        Action::CustomAmountAgain,
        Action::SplitAgain,
        Action::Stop,
    ];

    pub const fn payload(self) -> &'static str {
        match self {
            Action::PayFixed => "pay_fixed",
            Action::CustomAmount => "custom_amount",
            Action::Split => "split",
            Action::PayFixedAgain => "pay_fixed_again",
            Action::CustomAmountAgain => "custom_amount_again",
            Action::SplitAgain => "split_again",
            Action::Stop => "stop",
        }
    }

    pub fn from_payload(data: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.payload() == data)
    }
}
