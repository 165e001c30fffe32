use std::fmt::Write as _;

use time::OffsetDateTime;

use crate::dates::{format_clock, month_name};
use crate::model::{Document, FuelPurchase, MaintenanceEvent, OdometerReading};
use crate::oil::{last_oil_change_km, oil_alert, OIL_CHANGE_INTERVAL_KM};
use crate::stats::{maintenance_total, spend_this_month, spend_total};

/// Entries per category in the chat summary.
pub const SUMMARY_LIMIT: usize = 4;

pub const EMPTY_SECTION: &str = "Nenhum registro";

/// Liters the way people write them: `10.0`, `7.5`, `3.25`.
pub fn fmt_liters(liters: f64) -> String {
    if liters.fract() == 0.0 {
        format!("{:.1}", liters)
    } else {
        format!("{}", liters)
    }
}

pub(crate) fn km_line(index: usize, reading: &OdometerReading) -> String {
    format!("{}. {} Km |{}|", index, reading.km, reading.date)
}

pub(crate) fn fuel_line(index: usize, purchase: &FuelPurchase) -> String {
    format!(
        "{}. {}L por R${:.2} |{}|",
        index,
        fmt_liters(purchase.liters),
        purchase.price,
        purchase.date
    )
}

pub(crate) fn manu_line(index: usize, event: &MaintenanceEvent) -> String {
    format!(
        "{}. {} | R$ {:.2} | {} Km |{}|",
        index,
        event.desc,
        event.price.unwrap_or(0.0),
        event.km,
        event.date
    )
}

/// Pairs each entry with its 1-based insertion index and sorts ascending by `key`.
/// The sort is stable, so equal keys keep insertion order.
pub(crate) fn indexed_by_km<T>(items: &[T], key: impl Fn(&T) -> i64) -> Vec<(usize, &T)> {
    let mut indexed: Vec<(usize, &T)> = items.iter().enumerate().map(|(i, t)| (i + 1, t)).collect();
    indexed.sort_by_key(|(_, item)| key(item));
    indexed
}

fn tail<T>(items: Vec<T>, limit: usize) -> impl Iterator<Item = T> {
    let skip = items.len().saturating_sub(limit);
    items.into_iter().skip(skip)
}

/// Short Markdown summary for the chat. Indices shown are the ones `/del` accepts.
pub fn summary(doc: &Document, now: OffsetDateTime) -> String {
    let mut msg = String::from("🏍️ *RELATÓRIO*\n\n");

    let _ = writeln!(msg, "📏 *KM (últimos {}):*", SUMMARY_LIMIT);
    if doc.km.is_empty() {
        let _ = writeln!(msg, "{}", EMPTY_SECTION);
    }
    for (index, reading) in tail(indexed_by_km(&doc.km, |r| r.km), SUMMARY_LIMIT) {
        let _ = writeln!(msg, "{}", km_line(index, reading));
    }

    let _ = writeln!(msg, "\n🧰 *Manutenções (últimas {}):*", SUMMARY_LIMIT);
    if doc.manu.is_empty() {
        let _ = writeln!(msg, "{}", EMPTY_SECTION);
    }
    for (index, event) in tail(indexed_by_km(&doc.manu, |e| e.km), SUMMARY_LIMIT) {
        let _ = writeln!(msg, "{}", manu_line(index, event));
    }

    let _ = writeln!(msg, "\n⛽ *Abastecimentos (últimos {}):*", SUMMARY_LIMIT);
    if doc.fuel.is_empty() {
        let _ = writeln!(msg, "{}", EMPTY_SECTION);
    }
    let fuel: Vec<(usize, &FuelPurchase)> =
        doc.fuel.iter().enumerate().map(|(i, f)| (i + 1, f)).collect();
    for (index, purchase) in tail(fuel, SUMMARY_LIMIT) {
        let _ = writeln!(msg, "{}", fuel_line(index, purchase));
    }

    let _ = write!(
        msg,
        "\n💰 *GASTO MENSAL COMBUSTÍVEL*\n📅*Período:*({})\nTotal: R$ {:.2}\n\n",
        month_name(u8::from(now.month())),
        spend_this_month(doc, now)
    );
    let _ = write!(msg, "💰 *GASTO TOTAL COMBUSTÍVEL*\nTotal: R$ {:.2}\n\n", spend_total(doc));
    let _ = write!(msg, "💰 *GASTO TOTAL MANUTENÇÃO*\nTotal: R$ {:.2}", maintenance_total(doc));

    msg
}

/// Oil-change status for `/statusoleo`.
pub fn oil_status(doc: &Document) -> String {
    let current_km = doc.last_km();
    let last_oil = last_oil_change_km(doc);
    let mut msg = String::from("🛢️ *STATUS DO ÓLEO*\n\n");
    let _ = writeln!(msg, "• KM atual: {}", current_km);
    if last_oil == 0 {
        let _ = writeln!(msg, "• Última troca: não registrada");
    } else {
        let since = current_km.saturating_sub(last_oil);
        let _ = writeln!(msg, "• Última troca: {} Km", last_oil);
        let _ = writeln!(msg, "• Rodados desde a troca: {} Km", since);
        let next = last_oil.saturating_add(OIL_CHANGE_INTERVAL_KM);
        let _ = writeln!(msg, "• Próxima troca: {} Km", next);
    }
    if let Some(alert) = oil_alert(doc, current_km) {
        let _ = write!(msg, "\n{}", alert.message());
    }
    msg
}

/// Diagnostics for `/debug`.
pub fn debug_info(
    doc: &Document,
    notification_chat: Option<i64>,
    storage: &str,
    now: OffsetDateTime,
) -> String {
    let current_km = doc.last_km();
    let alert = oil_alert(doc, current_km)
        .map(|alert| alert.message())
        .unwrap_or_else(|| "Nenhum".to_string());
    let chat = notification_chat
        .map(|id| id.to_string())
        .unwrap_or_else(|| "❌ Não configurado".to_string());

    format!(
        "🔍 *DEBUG INFO*\n\n\
         *Configurações:*\n\
         • NOTIFICATION_CHAT_ID: {}\n\
         • Armazenamento: {}\n\
         • KM atual: {}\n\
         • Alertas ativos: {}\n\n\
         *Dados:*\n\
         • KM registros: {}\n\
         • Abastecimentos: {}\n\
         • Manutenções: {}\n\n\
         *Horário atual:* {}",
        chat,
        storage,
        current_km,
        alert,
        doc.km.len(),
        doc.fuel.len(),
        doc.manu.len(),
        format_clock(now)
    )
}
