//! The conversation state machine, independent of the transport.
//!
//! Every transition is a function over (state, chat identity, input) that
//! reads and writes the store and returns the outbound replies. The teloxide
//! handlers are thin glue around these, which keeps the whole
//! language → city → confirmation → prayer → offset loop testable without a
//! live bot.

use chrono::{DateTime, Utc};
use teloxide::types::InlineKeyboardMarkup;

use crate::error::BotError;
use crate::keyboard;
use crate::locale;
use crate::praytime;
use crate::state::BotState;
use crate::types::{
    ChatIdentity, ConversationStep, Lang, PendingLocation, Prayer, ReminderTarget, Session,
};

/// One outbound message.
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
    pub markdown: bool,
}

impl Reply {
    fn plain(text: impl Into<String>) -> Self {
        Reply { text: text.into(), keyboard: None, markdown: false }
    }

    fn with_keyboard(text: impl Into<String>, keyboard: InlineKeyboardMarkup) -> Self {
        Reply { text: text.into(), keyboard: Some(keyboard), markdown: false }
    }

    fn markdown(text: impl Into<String>) -> Self {
        Reply { text: text.into(), keyboard: None, markdown: true }
    }
}

/// Largest accepted lead time: one day. Anything beyond that is treated the
/// same as unparseable input.
const MAX_OFFSET_MINUTES: i64 = 24 * 60;

fn prayer_menu(lang: Lang) -> Reply {
    Reply::with_keyboard(locale::select_prayer(lang), keyboard::prayer_keyboard(lang))
}

/// `/start`: language prompt. Touches no state.
pub fn start() -> Vec<Reply> {
    vec![Reply::with_keyboard(locale::welcome(), keyboard::language_keyboard())]
}

/// `lang_en` / `lang_ar` buttons.
pub async fn select_language(
    state: &BotState,
    chat: &ChatIdentity,
    code: &str,
) -> Result<Vec<Reply>, BotError> {
    let Some(lang) = Lang::from_code(code) else {
        log::warn!("unsupported language code {:?} from {}", code, chat.telegram_id);
        return Ok(vec![Reply::plain(locale::invalid_language())]);
    };

    let mut session = state.session_or_default(chat.telegram_id).await?;
    session.lang = lang;
    session.step = ConversationStep::AwaitingCity;
    state.store.upsert_session(chat.telegram_id, &session).await?;

    Ok(vec![Reply::plain(locale::city_prompt(lang))])
}

/// `change_lang` button: flip between the two supported languages.
pub async fn toggle_language(
    state: &BotState,
    chat: &ChatIdentity,
) -> Result<Vec<Reply>, BotError> {
    let mut session = state.session_or_default(chat.telegram_id).await?;
    session.lang = session.lang.toggled();
    let lang = session.lang;
    state.store.upsert_session(chat.telegram_id, &session).await?;

    Ok(vec![Reply::plain(locale::language_changed(lang)), prayer_menu(lang)])
}

/// `change_city` button: back to the city prompt without touching reminders.
pub async fn request_city_change(
    state: &BotState,
    chat: &ChatIdentity,
) -> Result<Vec<Reply>, BotError> {
    let mut session = state.session_or_default(chat.telegram_id).await?;
    session.step = ConversationStep::AwaitingCity;
    let lang = session.lang;
    state.store.upsert_session(chat.telegram_id, &session).await?;

    Ok(vec![Reply::plain(locale::city_prompt(lang))])
}

/// Free text. The session step says what it means: a city query while no
/// location is confirmed, an offset while one is pending, otherwise a nudge
/// back to the menu.
pub async fn handle_text(
    state: &BotState,
    chat: &ChatIdentity,
    text: &str,
) -> Result<Vec<Reply>, BotError> {
    let text = text.trim();
    let session = state.session_or_default(chat.telegram_id).await?;
    let user = state.store.user_by_telegram_id(chat.telegram_id).await?;

    match (session.step.clone(), user) {
        (ConversationStep::AwaitingOffsetSelection { target }, Some(user)) => {
            let lang = session.lang;
            match text.parse::<i64>() {
                Ok(offset) => apply_offset(state, chat, session, user.id, target, offset).await,
                Err(_) => Ok(vec![Reply::plain(locale::invalid_offset(lang))]),
            }
        }
        (ConversationStep::AwaitingCity, _)
        | (ConversationStep::AwaitingLocationConfirmation { .. }, _) => {
            lookup_city(state, chat, session, text).await
        }
        // A user with no confirmed row always falls back to the city query,
        // whatever the step claims.
        (_, None) => lookup_city(state, chat, session, text).await,
        (_, Some(_)) => Ok(vec![prayer_menu(session.lang)]),
    }
}

async fn lookup_city(
    state: &BotState,
    chat: &ChatIdentity,
    mut session: Session,
    city: &str,
) -> Result<Vec<Reply>, BotError> {
    let lang = session.lang;
    let Some(found) = state.resolver.geocode(city).await? else {
        return Ok(vec![Reply::plain(locale::city_not_found(lang))]);
    };

    let timezone = state.resolver.timezone_for(found.latitude, found.longitude).await?;

    let pending = PendingLocation {
        city: city.to_string(),
        latitude: found.latitude,
        longitude: found.longitude,
        timezone,
        display_name: found.display_name,
    };
    let prompt = locale::confirm_location(lang, &pending.display_name);
    session.step = ConversationStep::AwaitingLocationConfirmation { pending };
    state.store.upsert_session(chat.telegram_id, &session).await?;

    Ok(vec![Reply::with_keyboard(prompt, keyboard::location_confirm_keyboard(lang))])
}

/// `confirm_location`: upsert the User row from the staged location. With
/// nothing staged this is a no-op that re-prompts for a city.
pub async fn confirm_location(
    state: &BotState,
    chat: &ChatIdentity,
) -> Result<Vec<Reply>, BotError> {
    let mut session = state.session_or_default(chat.telegram_id).await?;
    let lang = session.lang;

    let ConversationStep::AwaitingLocationConfirmation { pending } = session.step.clone() else {
        return Ok(vec![Reply::plain(locale::city_prompt(lang))]);
    };

    state
        .store
        .upsert_user(chat.telegram_id, &pending, &chat.full_name(), chat.username.as_deref())
        .await?;

    session.step = ConversationStep::AwaitingPrayerSelection;
    state.store.upsert_session(chat.telegram_id, &session).await?;

    Ok(vec![Reply::plain(locale::city_changed(lang)), prayer_menu(lang)])
}

/// `reject_location`: drop the staged location, back to the city prompt.
pub async fn reject_location(
    state: &BotState,
    chat: &ChatIdentity,
) -> Result<Vec<Reply>, BotError> {
    let mut session = state.session_or_default(chat.telegram_id).await?;
    session.step = ConversationStep::AwaitingCity;
    let lang = session.lang;
    state.store.upsert_session(chat.telegram_id, &session).await?;

    Ok(vec![Reply::plain(locale::city_prompt(lang))])
}

/// `prayer_<id>` buttons. Only stages the target; no reminder rows move
/// until an offset arrives.
pub async fn select_prayer(
    state: &BotState,
    chat: &ChatIdentity,
    prayer_id: &str,
) -> Result<Vec<Reply>, BotError> {
    let mut session = state.session_or_default(chat.telegram_id).await?;
    let lang = session.lang;

    let target = if prayer_id == "all" {
        ReminderTarget::All
    } else if let Some(prayer) = Prayer::parse(prayer_id) {
        ReminderTarget::Single(prayer)
    } else {
        log::warn!("unknown prayer id {:?} from {}", prayer_id, chat.telegram_id);
        return Ok(vec![prayer_menu(lang)]);
    };

    session.step = ConversationStep::AwaitingOffsetSelection { target };
    state.store.upsert_session(chat.telegram_id, &session).await?;

    Ok(vec![Reply::with_keyboard(
        locale::enter_offset(lang, target),
        keyboard::minute_keyboard(lang),
    )])
}

/// `minutes_<n>` buttons. Needs a confirmed user and a staged target,
/// otherwise falls back to the prayer menu.
pub async fn select_minutes(
    state: &BotState,
    chat: &ChatIdentity,
    minutes: i64,
) -> Result<Vec<Reply>, BotError> {
    let session = state.session_or_default(chat.telegram_id).await?;
    let user = state.store.user_by_telegram_id(chat.telegram_id).await?;

    match (session.step.clone(), user) {
        (ConversationStep::AwaitingOffsetSelection { target }, Some(user)) => {
            apply_offset(state, chat, session, user.id, target, minutes).await
        }
        (_, _) => Ok(vec![prayer_menu(session.lang)]),
    }
}

/// Replace the targeted reminder rows, refresh the session cache, and loop
/// back to the prayer menu.
async fn apply_offset(
    state: &BotState,
    chat: &ChatIdentity,
    mut session: Session,
    user_id: i64,
    target: ReminderTarget,
    offset: i64,
) -> Result<Vec<Reply>, BotError> {
    if !(0..=MAX_OFFSET_MINUTES).contains(&offset) {
        return Ok(vec![Reply::plain(locale::invalid_offset(session.lang))]);
    }

    match target {
        ReminderTarget::All => state.store.replace_all_reminders(user_id, offset).await?,
        ReminderTarget::Single(prayer) => {
            state.store.replace_reminder(user_id, prayer, offset).await?
        }
    }

    session.reminders = state.store.reminders_for_user(user_id).await?;
    session.step = ConversationStep::AwaitingPrayerSelection;
    let lang = session.lang;
    state.store.upsert_session(chat.telegram_id, &session).await?;

    Ok(vec![Reply::plain(locale::reminder_set(lang, target, offset)), prayer_menu(lang)])
}

/// `finish`: read-only listing of the stored reminders.
pub async fn finish(state: &BotState, chat: &ChatIdentity) -> Result<Vec<Reply>, BotError> {
    let mut session = state.session_or_default(chat.telegram_id).await?;
    let lang = session.lang;

    let Some(user) = state.store.user_by_telegram_id(chat.telegram_id).await? else {
        return Ok(vec![Reply::plain(locale::city_prompt(lang))]);
    };

    let reminders = state.store.reminders_for_user(user.id).await?;
    session.reminders = reminders.clone();
    state.store.upsert_session(chat.telegram_id, &session).await?;

    Ok(vec![Reply::markdown(locale::reminders_list(lang, &reminders))])
}

/// `delete_all`: drop every reminder for the user.
pub async fn delete_all(state: &BotState, chat: &ChatIdentity) -> Result<Vec<Reply>, BotError> {
    let mut session = state.session_or_default(chat.telegram_id).await?;
    let lang = session.lang;

    let Some(user) = state.store.user_by_telegram_id(chat.telegram_id).await? else {
        return Ok(vec![prayer_menu(lang)]);
    };

    state.store.delete_all_reminders(user.id).await?;
    session.reminders.clear();
    state.store.upsert_session(chat.telegram_id, &session).await?;

    Ok(vec![Reply::plain(locale::delete_all_success(lang)), prayer_menu(lang)])
}

/// `show_times`: today's six instants rendered in the user's timezone.
pub async fn show_times(
    state: &BotState,
    chat: &ChatIdentity,
    now: DateTime<Utc>,
) -> Result<Vec<Reply>, BotError> {
    let session = state.session_or_default(chat.telegram_id).await?;
    let lang = session.lang;

    let Some(user) = state.store.user_by_telegram_id(chat.telegram_id).await? else {
        return Ok(vec![Reply::plain(locale::city_prompt(lang))]);
    };

    let times = praytime::compute(user.latitude, user.longitude, now.date_naive())?;
    let tz = user.tz();

    let lines: Vec<String> = times
        .iter()
        .map(|(prayer, at)| {
            format!(
                "{}: {}",
                locale::prayer_name(lang, prayer),
                locale::format_time(&at.with_timezone(&tz), lang)
            )
        })
        .collect();

    Ok(vec![Reply::plain(format!(
        "{}{}",
        locale::prayer_times_header(lang, &user.city),
        lines.join("\n")
    ))])
}
