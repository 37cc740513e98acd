// src/ui.rs
//! Menu labels, reply keyboards and listing cards shown to the user.

use serde::{Deserialize, Serialize};

use crate::filter::PropertyKind;
use crate::listing::ListingRecord;

// --- top-level menu ---
pub const START: &str = "/start";
pub const MAIN_MENU: &str = "Главное меню";
pub const BROWSE_BY_AGENT: &str = "👤 По агенту";
pub const BROWSE_BY_CATEGORY: &str = "🏠 По категории";
pub const REFRESH_DATA: &str = "🔄 Обновить данные";
pub const CHANGE_FEED_URL: &str = "⚙️ Ссылка (Админ)";
/// Older button texts still present in users' cached keyboards.
pub const LEGACY_BROWSE_BY_AGENT: &str = "👤 Выбор по Агенту";
pub const LEGACY_BROWSE_BY_CATEGORY: &str = "🏠 Выбор по Категории";

// --- step keyboards ---
pub const DEAL_RENT: &str = "🏠 Аренда";
pub const DEAL_SALE: &str = "💰 Продажа";
pub const AGENT_PREFIX: &str = "👤 ";
pub const CATEGORY_LABELS: [&str; 10] = [
    "🏘️ Все",
    "🏠 1-комнатная",
    "🏠 2-комнатная",
    "🏠 3-комнатная",
    "🏠 4-комнатная",
    "🌳 Участок",
    "🏡 Дом",
    "🚗 Гараж",
    "🚪 Комната",
    "🏪 Коммерческая",
];
pub const MARKET_ANY: &str = "🌐 Любая";
pub const MARKET_INTERNAL: &str = "🟣 Внутренняя";
pub const MARKET_EXTERNAL: &str = "🟢 Внешняя";
pub const REVEAL: &str = "✅ Вывести";
pub const CANCEL: &str = "❌ Отмена";

// --- prompts ---
pub const WELCOME: &str = "🏡 Добро пожаловать в бот недвижимости!";
pub const BACK_TO_MENU: &str = "🏡 Возврат в главное меню:";
pub const MENU: &str = "Главное меню:";
pub const PICK_ACTION: &str = "Выберите действие в меню 👇";
pub const ASK_DEAL_TYPE: &str = "📊 Выберите тип сделки:";
pub const ASK_AGENT: &str = "👥 Выберите агента:";
pub const ASK_CATEGORY: &str = "📦 Выберите категорию:";
pub const ASK_MARKET: &str = "🤝 Выберите базу:";
pub const ASK_FEED_URL: &str = "🔗 Введите новую ссылку на XML:";
pub const REFRESH_OK: &str = "✅ Данные успешно обновлены!";
pub const REFRESH_FAILED: &str = "❌ Ошибка обновления! Проверьте ссылку.";
pub const URL_SAVED: &str = "✅ Ссылка успешно обновлена!";
pub const URL_INVALID: &str = "❌ Некорректная ссылка. Укажите схему (http/https) и адрес сервера.";
pub const URL_SAVE_FAILED: &str = "❌ Не удалось сохранить ссылку.";

pub fn found_count(n: usize) -> String {
    format!("🔍 Найдено объектов: {n}")
}

/// Reply keyboard as rows of button labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<String>>,
}

impl Keyboard {
    /// Lay buttons out `width` per row.
    pub fn grid<I, S>(buttons: I, width: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let width = width.max(1);
        let mut rows: Vec<Vec<String>> = Vec::new();
        for b in buttons {
            match rows.last_mut() {
                Some(row) if row.len() < width => row.push(b.into()),
                _ => rows.push(vec![b.into()]),
            }
        }
        Self { rows }
    }

    pub fn with_row<I, S>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let row: Vec<String> = row.into_iter().map(Into::into).collect();
        if !row.is_empty() {
            self.rows.push(row);
        }
        self
    }

    pub fn buttons(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.buttons().any(|b| b == label)
    }
}

pub fn main_keyboard(is_admin: bool) -> Keyboard {
    let mut buttons = vec![BROWSE_BY_AGENT, BROWSE_BY_CATEGORY, REFRESH_DATA];
    if is_admin {
        buttons.push(CHANGE_FEED_URL);
    }
    Keyboard::grid(buttons, 2)
}

pub fn deal_type_keyboard() -> Keyboard {
    Keyboard::grid([DEAL_RENT, DEAL_SALE], 2).with_row([MAIN_MENU])
}

pub fn agent_keyboard(agents: &[String]) -> Keyboard {
    Keyboard::grid(agents.iter().map(|a| format!("{AGENT_PREFIX}{a}")), 2).with_row([MAIN_MENU])
}

pub fn category_keyboard() -> Keyboard {
    Keyboard::grid(CATEGORY_LABELS, 2).with_row([MAIN_MENU])
}

pub fn market_keyboard() -> Keyboard {
    Keyboard::grid([MARKET_ANY, MARKET_INTERNAL, MARKET_EXTERNAL], 2).with_row([MAIN_MENU])
}

pub fn confirm_keyboard() -> Keyboard {
    Keyboard::grid([REVEAL, CANCEL], 2).with_row([MAIN_MENU])
}

pub fn escape_keyboard() -> Keyboard {
    Keyboard::default().with_row([MAIN_MENU])
}

/// `"3500000"` → `"3,500,000"`; anything that is not all digits stays verbatim.
pub fn format_price(raw: &str) -> String {
    let t = raw.trim();
    if t.is_empty() || !t.chars().all(|c| c.is_ascii_digit()) {
        return raw.to_string();
    }
    let digits = t.trim_start_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn category_emoji(category: &str) -> &'static str {
    match PropertyKind::from_feed_value(category) {
        Some(PropertyKind::Apartment) => "🏢",
        Some(PropertyKind::Lot) => "🌳",
        Some(PropertyKind::Garage) => "🚗",
        Some(PropertyKind::Room) => "🚪",
        Some(PropertyKind::Commercial) => "🏪",
        Some(PropertyKind::House) | None => "🏠",
    }
}

fn market_label(status: &str) -> &'static str {
    if status.trim() == crate::filter::STATUS_EXTERNAL {
        MARKET_EXTERNAL
    } else {
        MARKET_INTERNAL
    }
}

/// One listing card as sent to the chat.
pub fn format_listing(r: &ListingRecord, url_base: &str) -> String {
    format!(
        "{emoji} {category} ({deal})\n\
         📏 Площадь: {area} м²\n\
         🛏 Комнат: {rooms}\n\
         💰 Цена: {price} RUB\n\
         📍 Адрес: {address}\n\n\
         🤝 База: {market}\n\n\
         👤 Агент: {agent}\n\
         🔗 Ссылка: {url_base}{id}",
        emoji = category_emoji(&r.category),
        category = capitalize(&r.category),
        deal = capitalize(&r.deal_type),
        area = r.area,
        rooms = r.rooms,
        price = format_price(&r.price),
        address = r.address,
        market = market_label(&r.status),
        agent = r.agent,
        id = r.id,
    )
}
