use crate::models::{Action, PaymentConfig, Session};
use crate::transport::{Button, Keyboard};

pub const HELP: &str = "Я напоминаю, когда оплаченная подписка заканчивается.\n\n\
    /start – выбрать вариант оплаты\n\
    /status – текущая подписка\n\
    /stop – остановить подписку и напоминания\n\n\
    Сумму можно писать как 100, 500р, 1 000 руб или 1к.";

pub const ASK_AMOUNT: &str = "Пожалуйста, введите сумму (например, 100, 500р, 1к).";
pub const BAD_AMOUNT: &str = "Пожалуйста, введите корректную сумму (например, 1000, 1к, 500руб).";
pub const ASK_PEOPLE: &str = "На сколько человек делим подписку? Введите число.";
pub const BAD_PEOPLE: &str = "Пожалуйста, введите целое число больше нуля.";
pub const STOPPED: &str = "Подписка остановлена, напоминаний больше не будет.\n\
    Чтобы оформить её снова, отправьте /start.";

pub fn greeting(config: &PaymentConfig) -> String {
    format!(
        "Привет! Я помогу отслеживать оплату. Стоимость месяца: {} руб.\nВыберите вариант:",
        config.unit_cost
    )
}

pub fn start_keyboard(config: &PaymentConfig) -> Keyboard {
    vec![
        vec![Button::action(format!("Оплатить {} рублей", config.unit_cost), Action::PayFixed)],
        vec![Button::action("Своя сумма", Action::CustomAmount)],
        vec![Button::action("Разделить на несколько человек", Action::Split)],
    ]
}

pub fn renewal_keyboard(config: &PaymentConfig) -> Keyboard {
    vec![
        vec![Button::action(format!("Снова {} рублей", config.unit_cost), Action::PayFixedAgain)],
        vec![Button::action("Своя сумма", Action::CustomAmountAgain)],
        vec![Button::action("Разделить на несколько человек", Action::SplitAgain)],
        vec![Button::action("Остановить", Action::Stop)],
    ]
}

pub fn pay_keyboard(config: &PaymentConfig) -> Keyboard {
    vec![vec![Button::link("Оплатить", config.payment_url.clone())]]
}

pub fn fixed_selected(config: &PaymentConfig) -> String {
    format!(
        "Выбрано {} рублей. Нажмите кнопку, чтобы оплатить.\nНапоминание придёт через 1 мес.",
        config.unit_cost
    )
}

pub fn amount_accepted(amount: u64, period: u64) -> String {
    format!(
        "Вы ввели сумму: {amount} рублей. Этого хватит на {period} мес.\n\
        Нажмите кнопку, чтобы оплатить.\nНапоминание придёт через {period} мес."
    )
}

pub fn split_accepted(total: u64, people: u32, per_person: u64, period: u64) -> String {
    format!(
        "Общая сумма {total} рублей на {people} чел.: по {per_person} рублей с каждого. \
        Этого хватит на {period} мес.\n\
        Нажмите кнопку, чтобы оплатить.\nНапоминание придёт через {period} мес."
    )
}

pub fn ask_total(people: u32) -> String {
    format!("Делим на {people} чел. Теперь введите общую сумму (например, 300, 1к).")
}

pub fn insufficient(amount: u64, unit_cost: u64) -> String {
    format!(
        "Сумма {amount} рублей недостаточна для оплаты хотя бы одного месяца.\n\
        Стоимость месяца: {unit_cost} руб."
    )
}

pub fn insufficient_share(per_person: u64, unit_cost: u64) -> String {
    format!(
        "На каждого приходится {per_person} рублей, этого недостаточно для оплаты хотя бы одного месяца.\n\
        Стоимость месяца: {unit_cost} руб."
    )
}

pub fn too_long(period: u64) -> String {
    format!("Сумма покрывает {period} мес., это слишком долго. Введите сумму поменьше.")
}

pub fn reminder(session: &Session) -> String {
    format!(
        "Напоминание: оплаченный период закончился, пора оплатить {} рублей.\n\
        Выберите вариант или остановите подписку:",
        session.amount_per_person
    )
}

pub fn status(session: &Session) -> String {
    match (session.is_subscribed(), session.expire_at) {
        (true, Some(expire_at)) => {
            let reminder = if session.pending_job_id.is_some() {
                format!("Напоминание: {} UTC", expire_at.format("%d.%m.%Y %H:%M"))
            } else {
                "Период закончился, напоминание уже отправлено.".to_string()
            };
            format!(
                "Подписка: {} рублей на {} мес.\n{}",
                session.amount_per_person, session.period, reminder
            )
        }
        _ => "Активной подписки нет. Отправьте /start, чтобы оформить.".to_string(),
    }
}
