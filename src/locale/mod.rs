//! Bilingual message catalogue. Every lookup is an exhaustive match on
//! `Lang`, so adding a language is a compile-time checklist.

use chrono::{DateTime, Timelike};
use chrono_tz::Tz;

use crate::types::{Lang, Prayer, ReminderEntry, ReminderTarget};

pub fn welcome() -> &'static str {
    // Shown before a language is chosen, so English only.
    "Welcome! Please select your language:"
}

pub fn city_prompt(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "Please send your city name.",
        Lang::Ar => "الرجاء إرسال اسم مدينتك.",
    }
}

pub fn city_not_found(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "City not found.",
        Lang::Ar => "لم يتم العثور على المدينة.",
    }
}

pub fn select_prayer(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "Please select a prayer first:",
        Lang::Ar => "الرجاء اختيار الصلاة أولاً:",
    }
}

pub fn enter_offset(lang: Lang, target: ReminderTarget) -> &'static str {
    match (lang, target) {
        (Lang::En, ReminderTarget::Single(_)) => {
            "Now please select how many minutes before the prayer for the reminder."
        }
        (Lang::En, ReminderTarget::All) => {
            "Now please select how many minutes before the prayers for the reminder."
        }
        (Lang::Ar, ReminderTarget::Single(_)) => {
            "الآن الرجاء اختيار عدد الدقائق قبل الصلاة للتذكير."
        }
        (Lang::Ar, ReminderTarget::All) => {
            "الآن الرجاء اختيار عدد الدقائق قبل الصلوات للتذكير."
        }
    }
}

pub fn invalid_offset(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "Please select a valid number of minutes for the reminder.",
        Lang::Ar => "الرجاء اختيار عدد دقائق صحيح للتذكير.",
    }
}

pub fn reminder_set(lang: Lang, target: ReminderTarget, offset: i64) -> String {
    match (lang, target) {
        (Lang::En, ReminderTarget::Single(p)) => format!(
            "✅ Reminder for {} set {} mins before Azan.",
            prayer_name(Lang::En, p),
            offset
        ),
        (Lang::En, ReminderTarget::All) => {
            format!("✅ Reminders for ALL prayers set {} mins before Azan.", offset)
        }
        (Lang::Ar, ReminderTarget::Single(p)) => format!(
            "✅ تم تعيين تذكير لصلاة {} قبل {} دقيقة من الأذان.",
            prayer_name(Lang::Ar, p),
            arabic_numerals(&offset.to_string())
        ),
        (Lang::Ar, ReminderTarget::All) => format!(
            "✅ تم تعيين تذكير لجميع الصلوات قبل {} دقيقة من الأذان.",
            arabic_numerals(&offset.to_string())
        ),
    }
}

pub fn city_changed(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "✅ City changed successfully!",
        Lang::Ar => "✅ تم تغيير المدينة بنجاح!",
    }
}

pub fn language_changed(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "✅ Language changed successfully!",
        Lang::Ar => "✅ تم تغيير اللغة بنجاح!",
    }
}

pub fn invalid_language() -> &'static str {
    "Invalid language selection. Please try again."
}

pub fn delete_all_success(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "✅ All reminders have been deleted successfully.",
        Lang::Ar => "✅ تم حذف جميع التذكيرات بنجاح.",
    }
}

pub fn generic_error() -> &'static str {
    "An error occurred. Please try again."
}

pub fn confirm_location(lang: Lang, display_name: &str) -> String {
    match lang {
        Lang::En => format!(
            "Is this your correct location?\n\n{}\n\nPlease confirm the location by clicking the button below.",
            display_name
        ),
        Lang::Ar => format!(
            "هل هذا هو موقعك الصحيح؟\n\n{}\n\nالرجاء تأكيد الموقع بالضغط على الزر أدناه.",
            display_name
        ),
    }
}

pub fn prayer_name(lang: Lang, prayer: Prayer) -> &'static str {
    match (lang, prayer) {
        (Lang::En, Prayer::Fajr) => "🌅 FAJR",
        (Lang::En, Prayer::Sunrise) => "🌞 SUNRISE",
        (Lang::En, Prayer::Dhuhr) => "☀️ DHUHR",
        (Lang::En, Prayer::Asr) => "🌤️ ASR",
        (Lang::En, Prayer::Maghrib) => "🌅 MAGHRIB",
        (Lang::En, Prayer::Isha) => "🌙 ISHA",
        (Lang::Ar, Prayer::Fajr) => "🌅 الفجر",
        (Lang::Ar, Prayer::Sunrise) => "🌞 الشروق",
        (Lang::Ar, Prayer::Dhuhr) => "☀️ الظهر",
        (Lang::Ar, Prayer::Asr) => "🌤️ العصر",
        (Lang::Ar, Prayer::Maghrib) => "🌅 المغرب",
        (Lang::Ar, Prayer::Isha) => "🌙 العشاء",
    }
}

pub fn all_prayers_label(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "🕌 ALL PRAYERS",
        Lang::Ar => "🕌 جميع الصلوات",
    }
}

pub fn change_city_label(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "🏙️ Change City",
        Lang::Ar => "🏙️ تغيير المدينة",
    }
}

pub fn finish_label(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "📋 Show All Reminders",
        Lang::Ar => "📋 عرض جميع التذكيرات",
    }
}

pub fn delete_all_label(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "🗑️ Delete All",
        Lang::Ar => "🗑️ حذف الكل",
    }
}

pub fn show_times_label(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "🕒 Show Prayer Times",
        Lang::Ar => "🕒 عرض مواقيت الصلاة",
    }
}

pub fn minutes_label(lang: Lang, minutes: u32) -> String {
    match lang {
        Lang::En => format!("{} minutes", minutes),
        Lang::Ar => format!("{} دقائق", minutes),
    }
}

pub fn prayer_times_header(lang: Lang, city: &str) -> String {
    match lang {
        Lang::En => format!("🕌 Prayer Times for {}:\n\n", city),
        Lang::Ar => format!("🕌 مواقيت الصلاة في {}:\n\n", city),
    }
}

pub fn reminders_list(lang: Lang, reminders: &[ReminderEntry]) -> String {
    if reminders.is_empty() {
        return match lang {
            Lang::En => "No reminders set yet.".to_string(),
            Lang::Ar => "لم يتم تعيين أي تذكيرات بعد.".to_string(),
        };
    }

    let header = match lang {
        Lang::En => "🕌 *Your Current Reminders:*\n\n",
        Lang::Ar => "🕌 *تذكيرتك الحالية:*\n\n",
    };

    let lines: Vec<String> = reminders
        .iter()
        .map(|r| match lang {
            Lang::En => format!(
                "⏰ {}: *{}* minutes before Azan",
                prayer_name(lang, r.prayer),
                r.offset_minutes
            ),
            Lang::Ar => format!(
                "⏰ {}: *{}* دقيقة قبل الأذان",
                prayer_name(lang, r.prayer),
                arabic_numerals(&r.offset_minutes.to_string())
            ),
        })
        .collect();

    format!("{}{}", header, lines.join("\n\n"))
}

pub fn azan_message(lang: Lang, prayer: Prayer, local_time: &str) -> String {
    match lang {
        Lang::En => format!(
            "🕌 *It's time for {} Azan*\n\n⏰ Current time: {}\n\n📱 Azan Reminder",
            prayer_name(Lang::En, prayer),
            local_time
        ),
        Lang::Ar => format!(
            "🕌 *حان الآن موعد آذان {}*\n\n⏰ الوقت الآن: {}\n\n📱 منبه الأذان",
            prayer_name(Lang::Ar, prayer),
            local_time
        ),
    }
}

pub fn upcoming_message(lang: Lang, prayer: Prayer, offset: i64) -> String {
    match lang {
        Lang::En => format!(
            "🕌 *Prayer Time Reminder*\n\n⏰ *{}* minutes until {} Azan\n\n📱 Azan Reminder",
            offset,
            prayer_name(Lang::En, prayer)
        ),
        Lang::Ar => format!(
            "🕌 *تذكير بموعد الصلاة*\n\n⏰ باقي *{}* دقائق على آذان {}\n\n📱 منبه الأذان",
            arabic_numerals(&offset.to_string()),
            prayer_name(Lang::Ar, prayer)
        ),
    }
}

/// Map Western digits to Arabic-Indic ones, leaving everything else alone.
pub fn arabic_numerals(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '0' => '٠',
            '1' => '١',
            '2' => '٢',
            '3' => '٣',
            '4' => '٤',
            '5' => '٥',
            '6' => '٦',
            '7' => '٧',
            '8' => '٨',
            '9' => '٩',
            other => other,
        })
        .collect()
}

/// 12-hour wall-clock rendering of an instant already shifted into the
/// user's timezone. Arabic output uses Arabic-Indic digits and ص/م markers.
pub fn format_time(time: &DateTime<Tz>, lang: Lang) -> String {
    let (is_pm, hour12) = time.hour12();
    let plain = format!("{}:{:02}", hour12, time.minute());
    match lang {
        Lang::En => format!("{} {}", plain, if is_pm { "PM" } else { "AM" }),
        Lang::Ar => format!("{} {}", arabic_numerals(&plain), if is_pm { "م" } else { "ص" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Lang, Prayer, ReminderEntry};

    #[test]
    fn arabic_numerals_map_digits_only() {
        assert_eq!(arabic_numerals("15"), "١٥");
        assert_eq!(arabic_numerals("5:00 x"), "٥:٠٠ x");
    }

    #[test]
    fn reminders_list_empty_says_none() {
        assert_eq!(reminders_list(Lang::En, &[]), "No reminders set yet.");
    }

    #[test]
    fn reminders_list_renders_one_line_per_entry() {
        let reminders = vec![
            ReminderEntry { prayer: Prayer::Fajr, offset_minutes: 10 },
            ReminderEntry { prayer: Prayer::Isha, offset_minutes: 5 },
        ];
        let en = reminders_list(Lang::En, &reminders);
        assert!(en.contains("FAJR: *10* minutes before Azan"));
        assert!(en.contains("ISHA: *5* minutes before Azan"));

        let ar = reminders_list(Lang::Ar, &reminders);
        assert!(ar.contains("الفجر"));
        assert!(ar.contains("١٠"));
    }
}
