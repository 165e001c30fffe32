use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use time::{Date, OffsetDateTime};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use crate::dispatch::App;
use crate::oil::oil_alert;

const TICK: Duration = Duration::from_secs(30);

pub const HEADER: &str = " ```       🔔 MANUTENÇÃO POPzinha 🔔```";

/// A slot that already fired: the day plus its `(hour, minute)`.
pub type Fired = (Date, (u8, u8));

/// Returns the slot to fire at `now`, if `now` is on one of `targets` and it has not fired today.
pub fn due_slot(now: OffsetDateTime, targets: &[(u8, u8)], last_fired: Option<Fired>) -> Option<Fired> {
    let slot = (now.hour(), now.minute());
    if !targets.contains(&slot) {
        return None;
    }
    let candidate = (now.date(), slot);
    if last_fired == Some(candidate) {
        return None;
    }
    Some(candidate)
}

/// The scheduled advisory text, or `None` when there is nothing to say.
pub async fn advisory(app: &App) -> Option<String> {
    let doc = app.db.snapshot().await;
    let current_km = doc.last_km();
    if current_km <= 0 {
        debug!("notifier: no km recorded, skipping");
        return None;
    }
    oil_alert(&doc, current_km).map(|alert| format!("{}\n{}", HEADER, alert.message()))
}

/// Checks the clock every tick and pushes the oil advisory at each configured time.
/// A minute missed while the process was paused is skipped, not caught up.
pub async fn run_notifier(bot: Bot, app: Arc<App>, chat_id: ChatId, targets: Vec<(u8, u8)>) {
    info!(chat_id = %chat_id, ?targets, "Notifier started");
    let mut last_fired: Option<Fired> = None;
    let mut ticker = interval(TICK);
    loop {
        ticker.tick().await;
        let now = app.now();
        let Some(slot) = due_slot(now, &targets, last_fired) else {
            continue;
        };
        last_fired = Some(slot);
        if let Err(err) = notify(&bot, &app, chat_id).await {
            warn!(error = %err, "notifier: send failed");
        }
    }
}

async fn notify(bot: &Bot, app: &App, chat_id: ChatId) -> Result<()> {
    let Some(text) = advisory(app).await else {
        info!("notifier: no active alert");
        return Ok(());
    };
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Markdown)
        .await?;
    info!(chat_id = %chat_id, "notifier: advisory sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::MemoryBackend;
    use crate::db::Db;
    use crate::model::{Document, MaintenanceEvent, OdometerReading};
    use time::macros::{date, datetime, offset};

    const TARGETS: [(u8, u8); 2] = [(8, 0), (14, 0)];

    #[test]
    fn fires_only_on_target_minutes() {
        assert_eq!(
            due_slot(datetime!(2025-03-05 08:00:10 -3), &TARGETS, None),
            Some((date!(2025-03-05), (8, 0)))
        );
        assert_eq!(due_slot(datetime!(2025-03-05 08:01 -3), &TARGETS, None), None);
        assert_eq!(due_slot(datetime!(2025-03-05 13:59:59 -3), &TARGETS, None), None);
    }

    #[test]
    fn fires_once_per_slot_per_day() {
        let first = due_slot(datetime!(2025-03-05 14:00:05 -3), &TARGETS, None);
        assert!(first.is_some());
        assert_eq!(due_slot(datetime!(2025-03-05 14:00:35 -3), &TARGETS, first), None);
        assert!(due_slot(datetime!(2025-03-06 14:00:05 -3), &TARGETS, first).is_some());
    }

    async fn app_with(doc: Document) -> App {
        App {
            db: Arc::new(Db::open(Arc::new(MemoryBackend::with(doc))).await),
            delete_password: None,
            notification_chat: Some(42),
            utc_offset: offset!(-3),
        }
    }

    #[tokio::test]
    async fn advisory_needs_a_km_reading() {
        assert_eq!(advisory(&app_with(Document::default()).await).await, None);
    }

    #[tokio::test]
    async fn advisory_carries_header_and_alert() {
        let mut doc = Document::default();
        doc.manu.push(MaintenanceEvent {
            desc: "Troca de óleo".to_string(),
            date: "01/03/25 às 10:00".to_string(),
            km: 10000,
            price: None,
        });
        doc.km.push(OdometerReading { km: 10750, date: "05/03/25 às 10:00".to_string() });
        let text = advisory(&app_with(doc).await).await.unwrap();
        assert!(text.starts_with(HEADER));
        assert!(text.contains("*250KM* PARA TROCAR"));
    }
}
