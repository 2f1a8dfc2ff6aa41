//! The once-per-minute notification sweep.
//!
//! Each tick recomputes every user's prayer times for today and fires two
//! kinds of messages: azan-exact and "N minutes before". Both checks convert
//! the candidate instant and `now` into the user's timezone and compare
//! wall-clock hour and minute only; the one-minute tick cadence is the sole
//! de-duplication, so there is no catch-up for missed ticks.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use chrono_tz::Tz;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::error::BotError;
use crate::locale;
use crate::praytime::{self, PrayerTimesSet};
use crate::state::BotState;
use crate::types::{Prayer, ReminderEntry, User};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Notification {
    /// The azan for this prayer is now.
    Azan { prayer: Prayer },
    /// `offset_minutes` of lead time before this prayer's azan.
    Upcoming { prayer: Prayer, offset_minutes: i64 },
}

pub async fn start_scheduler(bot: Bot, state: Arc<BotState>) {
    log::info!("Starting notification scheduler...");
    let mut ticker = interval(Duration::from_secs(60));
    // No catch-up: a paused process skips those minutes entirely.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let now = Utc::now();
        if let Err(error) = sweep(&bot, &state, now).await {
            log::error!("scheduler sweep failed: {}", error);
        }
    }
}

/// Evaluate every user for this minute. One user's failure is logged and
/// must never starve the rest of their minute-exact check.
async fn sweep(bot: &Bot, state: &BotState, now: DateTime<Utc>) -> Result<(), BotError> {
    let users = state.store.list_users().await?;
    log::debug!("scheduler tick at {}: {} users", now, users.len());

    for user in users {
        if let Err(error) = notify_user(bot, state, &user, now).await {
            log::error!("scheduler: user {}: {}", user.telegram_id, error);
        }
    }
    Ok(())
}

async fn notify_user(
    bot: &Bot,
    state: &BotState,
    user: &User,
    now: DateTime<Utc>,
) -> Result<(), BotError> {
    let times = praytime::compute(user.latitude, user.longitude, now.date_naive())?;
    let reminders = state.store.reminders_for_user(user.id).await?;
    let lang = state
        .store
        .session_for(user.telegram_id)
        .await?
        .map(|session| session.lang)
        .unwrap_or_default();
    let tz = user.tz();

    for notification in due_notifications(&times, &reminders, now, tz) {
        let text = match notification {
            Notification::Azan { prayer } => {
                let local = times.get(prayer).with_timezone(&tz);
                locale::azan_message(lang, prayer, &locale::format_time(&local, lang))
            }
            Notification::Upcoming { prayer, offset_minutes } => {
                locale::upcoming_message(lang, prayer, offset_minutes)
            }
        };

        // A failed send must not drop the user's remaining notifications.
        if let Err(error) = bot
            .send_message(ChatId(user.telegram_id), text)
            .parse_mode(ParseMode::Markdown)
            .await
        {
            log::error!("failed to notify user {}: {}", user.telegram_id, error);
        }
    }
    Ok(())
}

/// Which notifications fire at `now` for one user. Pure so the minute
/// matching can be tested with constructed instants.
pub fn due_notifications(
    times: &PrayerTimesSet,
    reminders: &[ReminderEntry],
    now: DateTime<Utc>,
    tz: Tz,
) -> Vec<Notification> {
    let now_local = now.with_timezone(&tz);
    let same_minute = |instant: DateTime<Utc>| {
        let local = instant.with_timezone(&tz);
        local.hour() == now_local.hour() && local.minute() == now_local.minute()
    };

    let mut due = Vec::new();
    for (prayer, instant) in times.iter() {
        if same_minute(instant) {
            due.push(Notification::Azan { prayer });
        }
    }
    for reminder in reminders {
        // A stored offset outside chrono's representable range must skip
        // this reminder, not unwind the whole scheduler task.
        let Some(lead) = ChronoDuration::try_minutes(reminder.offset_minutes) else {
            log::warn!("skipping unrepresentable reminder offset {}", reminder.offset_minutes);
            continue;
        };
        let Some(notify_at) = times.get(reminder.prayer).checked_sub_signed(lead) else {
            continue;
        };
        if same_minute(notify_at) {
            due.push(Notification::Upcoming {
                prayer: reminder.prayer,
                offset_minutes: reminder.offset_minutes,
            });
        }
    }
    due
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 24, h, m, 0).unwrap()
    }

    /// Fixture in UTC instants; the test timezone is UTC+3 (Riyadh), so
    /// e.g. fajr at 02:00 UTC is 05:00 local.
    fn times() -> PrayerTimesSet {
        PrayerTimesSet {
            fajr: utc(2, 0),
            sunrise: utc(3, 21),
            dhuhr: utc(9, 30),
            asr: utc(13, 2),
            maghrib: utc(15, 40),
            isha: utc(17, 10),
        }
    }

    fn riyadh() -> Tz {
        "Asia/Riyadh".parse().unwrap()
    }

    #[test]
    fn azan_fires_exactly_at_the_local_minute() {
        let due = due_notifications(&times(), &[], utc(2, 0), riyadh());
        assert_eq!(due, vec![Notification::Azan { prayer: Prayer::Fajr }]);
    }

    #[test]
    fn azan_does_not_fire_a_minute_early_or_late() {
        assert!(due_notifications(&times(), &[], utc(1, 59), riyadh()).is_empty());
        assert!(due_notifications(&times(), &[], utc(2, 1), riyadh()).is_empty());
    }

    #[test]
    fn seconds_within_the_minute_are_ignored() {
        let now = Utc.with_ymd_and_hms(2024, 8, 24, 2, 0, 59).unwrap();
        let due = due_notifications(&times(), &[], now, riyadh());
        assert_eq!(due, vec![Notification::Azan { prayer: Prayer::Fajr }]);
    }

    #[test]
    fn reminder_fires_offset_minutes_before_azan() {
        // Dhuhr at 12:30 local; a 15-minute reminder fires at 12:15 local
        // (09:15 UTC) and only then.
        let reminders = vec![ReminderEntry { prayer: Prayer::Dhuhr, offset_minutes: 15 }];

        let due = due_notifications(&times(), &reminders, utc(9, 15), riyadh());
        assert_eq!(
            due,
            vec![Notification::Upcoming { prayer: Prayer::Dhuhr, offset_minutes: 15 }]
        );

        assert!(due_notifications(&times(), &reminders, utc(9, 14), riyadh()).is_empty());
        assert!(due_notifications(&times(), &reminders, utc(9, 16), riyadh()).is_empty());
    }

    #[test]
    fn azan_and_zero_offset_reminder_fire_together() {
        let reminders = vec![ReminderEntry { prayer: Prayer::Dhuhr, offset_minutes: 0 }];
        let due = due_notifications(&times(), &reminders, utc(9, 30), riyadh());
        assert_eq!(
            due,
            vec![
                Notification::Azan { prayer: Prayer::Dhuhr },
                Notification::Upcoming { prayer: Prayer::Dhuhr, offset_minutes: 0 },
            ]
        );
    }

    #[test]
    fn extreme_stored_offset_is_skipped_without_panicking() {
        // An offset beyond chrono's Duration range must neither fire nor
        // unwind; other reminders in the same sweep still fire.
        let reminders = vec![
            ReminderEntry { prayer: Prayer::Fajr, offset_minutes: i64::MAX },
            ReminderEntry { prayer: Prayer::Isha, offset_minutes: i64::MIN },
            ReminderEntry { prayer: Prayer::Dhuhr, offset_minutes: 15 },
        ];
        let due = due_notifications(&times(), &reminders, utc(9, 15), riyadh());
        assert_eq!(
            due,
            vec![Notification::Upcoming { prayer: Prayer::Dhuhr, offset_minutes: 15 }]
        );
    }

    #[test]
    fn each_reminder_is_evaluated_independently() {
        let reminders = vec![
            ReminderEntry { prayer: Prayer::Dhuhr, offset_minutes: 15 },
            ReminderEntry { prayer: Prayer::Asr, offset_minutes: 30 },
        ];
        // Asr at 16:02 local minus 30 = 15:32 local = 12:32 UTC.
        let due = due_notifications(&times(), &reminders, utc(12, 32), riyadh());
        assert_eq!(
            due,
            vec![Notification::Upcoming { prayer: Prayer::Asr, offset_minutes: 30 }]
        );
    }
}
