use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::locale;
use crate::types::{Lang, Prayer};

/// Main menu: one row per prayer, then all-prayers, then the side actions.
pub fn prayer_keyboard(lang: Lang) -> InlineKeyboardMarkup {
    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = Prayer::ALL
        .iter()
        .map(|&prayer| {
            vec![InlineKeyboardButton::callback(
                locale::prayer_name(lang, prayer).to_string(),
                format!("prayer_{}", prayer.as_str()),
            )]
        })
        .collect();

    keyboard.push(vec![InlineKeyboardButton::callback(
        locale::all_prayers_label(lang).to_string(),
        "prayer_all".to_string(),
    )]);
    keyboard.push(vec![
        InlineKeyboardButton::callback(
            format!("🌐 {}", if lang == Lang::En { "العربية" } else { "English" }),
            "change_lang".to_string(),
        ),
        InlineKeyboardButton::callback(
            locale::change_city_label(lang).to_string(),
            "change_city".to_string(),
        ),
    ]);
    keyboard.push(vec![
        InlineKeyboardButton::callback(locale::finish_label(lang).to_string(), "finish".to_string()),
        InlineKeyboardButton::callback(
            locale::delete_all_label(lang).to_string(),
            "delete_all".to_string(),
        ),
    ]);
    keyboard.push(vec![InlineKeyboardButton::callback(
        locale::show_times_label(lang).to_string(),
        "show_times".to_string(),
    )]);

    InlineKeyboardMarkup::new(keyboard)
}

/// Offset choices, two per row. The server still accepts any integer typed
/// as text; these are just the suggested values.
pub fn minute_keyboard(lang: Lang) -> InlineKeyboardMarkup {
    const MINUTE_OPTIONS: [u32; 6] = [5, 10, 15, 20, 25, 30];

    let keyboard: Vec<Vec<InlineKeyboardButton>> = MINUTE_OPTIONS
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|&minutes| {
                    InlineKeyboardButton::callback(
                        locale::minutes_label(lang, minutes),
                        format!("minutes_{}", minutes),
                    )
                })
                .collect()
        })
        .collect();

    InlineKeyboardMarkup::new(keyboard)
}

pub fn language_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("English 🇬🇧".to_string(), "lang_en".to_string())],
        vec![InlineKeyboardButton::callback("العربية 🇸🇦".to_string(), "lang_ar".to_string())],
    ])
}

pub fn location_confirm_keyboard(lang: Lang) -> InlineKeyboardMarkup {
    let (yes, no) = match lang {
        Lang::En => ("✅ Yes", "❌ No"),
        Lang::Ar => ("✅ نعم", "❌ لا"),
    };
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(yes.to_string(), "confirm_location".to_string()),
        InlineKeyboardButton::callback(no.to_string(), "reject_location".to_string()),
    ]])
}
