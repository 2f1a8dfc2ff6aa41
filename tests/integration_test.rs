#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use azan_reminder_bot::error::BotError;
    use azan_reminder_bot::flow;
    use azan_reminder_bot::location::{GeocodedCity, Resolver};
    use azan_reminder_bot::state::BotState;
    use azan_reminder_bot::store::Store;
    use azan_reminder_bot::types::{
        ChatIdentity, ConversationStep, Lang, Prayer, ReminderEntry, ReminderTarget, Session,
    };
    use tempfile::TempDir;

    struct StubResolver;

    #[async_trait]
    impl Resolver for StubResolver {
        async fn geocode(&self, city: &str) -> Result<Option<GeocodedCity>, BotError> {
            if city == "Cairo" {
                Ok(Some(GeocodedCity {
                    latitude: 30.0444,
                    longitude: 31.2357,
                    display_name: "Cairo, Cairo Governorate, Egypt".to_string(),
                }))
            } else {
                Ok(None)
            }
        }

        async fn timezone_for(&self, _lat: f64, _lon: f64) -> Result<String, BotError> {
            Ok("Africa/Cairo".to_string())
        }
    }

    async fn test_state() -> (Arc<BotState>, TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::open(dir.path().join("test.db")).await.expect("open store");
        let state = Arc::new(BotState::new(store, Arc::new(StubResolver)));
        (state, dir)
    }

    fn chat() -> ChatIdentity {
        ChatIdentity {
            telegram_id: 12345,
            first_name: "Test".to_string(),
            last_name: Some("User".to_string()),
            username: Some("testuser".to_string()),
        }
    }

    /// Walk a fresh user through language, city, confirmation, prayer, and
    /// offset, then check what Finish shows.
    async fn register_cairo_user(state: &BotState, chat: &ChatIdentity) {
        let replies = flow::select_language(state, chat, "en").await.unwrap();
        assert_eq!(replies.len(), 1);

        let replies = flow::handle_text(state, chat, "Cairo").await.unwrap();
        assert!(replies[0].text.contains("Cairo, Cairo Governorate, Egypt"));
        assert!(replies[0].keyboard.is_some());

        let session = state.store.session_for(chat.telegram_id).await.unwrap().unwrap();
        assert!(matches!(session.step, ConversationStep::AwaitingLocationConfirmation { .. }));

        let replies = flow::confirm_location(state, chat).await.unwrap();
        assert_eq!(replies.len(), 2);
    }

    #[tokio::test]
    async fn end_to_end_registration_and_single_reminder() {
        let (state, _dir) = test_state().await;
        let chat = chat();
        register_cairo_user(&state, &chat).await;

        let user = state.store.user_by_telegram_id(chat.telegram_id).await.unwrap().unwrap();
        assert_eq!(user.city, "Cairo");
        assert_eq!(user.timezone, "Africa/Cairo");
        assert_eq!(user.full_name.as_deref(), Some("Test User"));

        let replies = flow::select_prayer(&state, &chat, "fajr").await.unwrap();
        assert!(replies[0].keyboard.is_some());

        let replies = flow::select_minutes(&state, &chat, 10).await.unwrap();
        assert!(replies[0].text.contains("FAJR"));
        assert!(replies[0].text.contains("10"));

        let replies = flow::finish(&state, &chat).await.unwrap();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].markdown);
        assert!(replies[0].text.contains("FAJR"));
        assert!(replies[0].text.contains("*10*"));
        // Exactly one reminder line.
        assert_eq!(replies[0].text.matches("before Azan").count(), 1);
    }

    #[tokio::test]
    async fn unknown_city_stays_on_city_prompt() {
        let (state, _dir) = test_state().await;
        let chat = chat();
        flow::select_language(&state, &chat, "en").await.unwrap();

        let replies = flow::handle_text(&state, &chat, "Atlantis").await.unwrap();
        assert_eq!(replies[0].text, "City not found.");

        let session = state.store.session_for(chat.telegram_id).await.unwrap().unwrap();
        assert_eq!(session.step, ConversationStep::AwaitingCity);
    }

    #[tokio::test]
    async fn unsupported_language_leaves_session_untouched() {
        let (state, _dir) = test_state().await;
        let chat = chat();

        let replies = flow::select_language(&state, &chat, "fr").await.unwrap();
        assert!(replies[0].text.contains("Invalid language"));
        assert!(state.store.session_for(chat.telegram_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn select_all_replaces_every_prior_reminder() {
        let (state, _dir) = test_state().await;
        let chat = chat();
        register_cairo_user(&state, &chat).await;
        let user = state.store.user_by_telegram_id(chat.telegram_id).await.unwrap().unwrap();

        flow::select_prayer(&state, &chat, "fajr").await.unwrap();
        flow::select_minutes(&state, &chat, 10).await.unwrap();

        flow::select_prayer(&state, &chat, "all").await.unwrap();
        flow::select_minutes(&state, &chat, 5).await.unwrap();

        let reminders = state.store.reminders_for_user(user.id).await.unwrap();
        assert_eq!(reminders.len(), 6);
        assert!(reminders.iter().all(|r| r.offset_minutes == 5));
    }

    #[tokio::test]
    async fn reselecting_a_prayer_replaces_its_reminder() {
        let (state, _dir) = test_state().await;
        let chat = chat();
        register_cairo_user(&state, &chat).await;
        let user = state.store.user_by_telegram_id(chat.telegram_id).await.unwrap().unwrap();

        flow::select_prayer(&state, &chat, "dhuhr").await.unwrap();
        flow::select_minutes(&state, &chat, 10).await.unwrap();
        flow::select_prayer(&state, &chat, "dhuhr").await.unwrap();
        flow::select_minutes(&state, &chat, 25).await.unwrap();

        let reminders = state.store.reminders_for_user(user.id).await.unwrap();
        assert_eq!(
            reminders,
            vec![ReminderEntry { prayer: Prayer::Dhuhr, offset_minutes: 25 }]
        );
    }

    #[tokio::test]
    async fn repeated_location_confirmation_upserts_one_user_row() {
        let (state, _dir) = test_state().await;
        let chat = chat();
        register_cairo_user(&state, &chat).await;

        // Run the whole city flow again; the upsert must not duplicate.
        flow::request_city_change(&state, &chat).await.unwrap();
        flow::handle_text(&state, &chat, "Cairo").await.unwrap();
        flow::confirm_location(&state, &chat).await.unwrap();

        assert_eq!(state.store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn confirm_without_pending_location_reprompts_for_city() {
        let (state, _dir) = test_state().await;
        let chat = chat();
        flow::select_language(&state, &chat, "en").await.unwrap();

        let replies = flow::confirm_location(&state, &chat).await.unwrap();
        assert_eq!(replies[0].text, "Please send your city name.");
        assert!(state.store.user_by_telegram_id(chat.telegram_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn session_upsert_round_trips() {
        let (state, _dir) = test_state().await;

        let session = Session {
            lang: Lang::Ar,
            step: ConversationStep::AwaitingOffsetSelection { target: ReminderTarget::All },
            reminders: vec![ReminderEntry { prayer: Prayer::Isha, offset_minutes: 20 }],
        };
        state.store.upsert_session(777, &session).await.unwrap();
        assert_eq!(state.store.session_for(777).await.unwrap().unwrap(), session);

        // A second upsert supersedes the first wholesale.
        let replacement = Session::default();
        state.store.upsert_session(777, &replacement).await.unwrap();
        assert_eq!(state.store.session_for(777).await.unwrap().unwrap(), replacement);

        state.store.delete_session(777).await.unwrap();
        assert!(state.store.session_for(777).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn typed_offset_zero_is_valid_and_abc_is_rejected() {
        let (state, _dir) = test_state().await;
        let chat = chat();
        register_cairo_user(&state, &chat).await;
        let user = state.store.user_by_telegram_id(chat.telegram_id).await.unwrap().unwrap();

        flow::select_prayer(&state, &chat, "maghrib").await.unwrap();

        let replies = flow::handle_text(&state, &chat, "abc").await.unwrap();
        assert!(replies[0].text.contains("valid number of minutes"));
        assert!(state.store.reminders_for_user(user.id).await.unwrap().is_empty());

        let replies = flow::handle_text(&state, &chat, "0").await.unwrap();
        assert!(replies[0].text.contains("set 0 mins"));
        assert_eq!(
            state.store.reminders_for_user(user.id).await.unwrap(),
            vec![ReminderEntry { prayer: Prayer::Maghrib, offset_minutes: 0 }]
        );
    }

    #[tokio::test]
    async fn out_of_range_offsets_are_rejected() {
        let (state, _dir) = test_state().await;
        let chat = chat();
        register_cairo_user(&state, &chat).await;
        let user = state.store.user_by_telegram_id(chat.telegram_id).await.unwrap().unwrap();

        flow::select_prayer(&state, &chat, "maghrib").await.unwrap();

        // i64::MAX parses as an integer but is far past any sane lead time;
        // negatives are rejected the same way.
        for text in ["9223372036854775807", "1441", "-5"] {
            let replies = flow::handle_text(&state, &chat, text).await.unwrap();
            assert!(replies[0].text.contains("valid number of minutes"), "accepted {}", text);
        }
        assert!(state.store.reminders_for_user(user.id).await.unwrap().is_empty());

        let replies = flow::select_minutes(&state, &chat, i64::MAX).await.unwrap();
        assert!(replies[0].text.contains("valid number of minutes"));
        assert!(state.store.reminders_for_user(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn text_after_registration_reshows_prayer_menu() {
        let (state, _dir) = test_state().await;
        let chat = chat();
        register_cairo_user(&state, &chat).await;

        let replies = flow::handle_text(&state, &chat, "hello there").await.unwrap();
        assert_eq!(replies[0].text, "Please select a prayer first:");
        assert!(replies[0].keyboard.is_some());
    }

    #[tokio::test]
    async fn language_toggle_keeps_reminders_and_renders_arabic() {
        let (state, _dir) = test_state().await;
        let chat = chat();
        register_cairo_user(&state, &chat).await;

        flow::select_prayer(&state, &chat, "fajr").await.unwrap();
        flow::select_minutes(&state, &chat, 10).await.unwrap();
        flow::select_prayer(&state, &chat, "isha").await.unwrap();
        flow::select_minutes(&state, &chat, 5).await.unwrap();

        let replies = flow::toggle_language(&state, &chat).await.unwrap();
        assert!(replies[0].text.contains("بنجاح"));

        let session = state.store.session_for(chat.telegram_id).await.unwrap().unwrap();
        assert_eq!(session.lang, Lang::Ar);
        assert_eq!(session.reminders.len(), 2);

        let replies = flow::finish(&state, &chat).await.unwrap();
        assert!(replies[0].text.contains("الفجر"));
        assert!(replies[0].text.contains("١٠"));
        assert!(replies[0].text.contains("العشاء"));
        assert!(replies[0].text.contains("٥"));
    }

    #[tokio::test]
    async fn delete_all_clears_store_and_session_cache() {
        let (state, _dir) = test_state().await;
        let chat = chat();
        register_cairo_user(&state, &chat).await;
        let user = state.store.user_by_telegram_id(chat.telegram_id).await.unwrap().unwrap();

        flow::select_prayer(&state, &chat, "all").await.unwrap();
        flow::select_minutes(&state, &chat, 15).await.unwrap();
        assert_eq!(state.store.reminders_for_user(user.id).await.unwrap().len(), 6);

        let replies = flow::delete_all(&state, &chat).await.unwrap();
        assert!(replies[0].text.contains("deleted successfully"));

        assert!(state.store.reminders_for_user(user.id).await.unwrap().is_empty());
        let session = state.store.session_for(chat.telegram_id).await.unwrap().unwrap();
        assert!(session.reminders.is_empty());
    }

    #[tokio::test]
    async fn show_times_lists_all_six_prayers_in_local_time() {
        let (state, _dir) = test_state().await;
        let chat = chat();
        register_cairo_user(&state, &chat).await;

        let now = chrono::Utc::now();
        let replies = flow::show_times(&state, &chat, now).await.unwrap();
        assert_eq!(replies.len(), 1);
        let text = &replies[0].text;
        assert!(text.contains("Prayer Times for Cairo"));
        for name in ["FAJR", "SUNRISE", "DHUHR", "ASR", "MAGHRIB", "ISHA"] {
            assert!(text.contains(name), "missing {} in {:?}", name, text);
        }
    }
}
