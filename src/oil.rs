use crate::model::Document;

/// Distance between two oil changes.
pub const OIL_CHANGE_INTERVAL_KM: i64 = 1000;

/// Matched against the lower-cased description.
const OIL_KEYWORDS: [&str; 5] = ["óleo", "oleo", "OLEO", "ÓLEO", "Óleo"];

/// Whether the quiet tier (more than 500 km remaining) still yields a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPolicy {
    /// Always report, falling back to a status line.
    Always,
    /// Stay silent while more than 500 km remain.
    QuietAboveReminder,
}

pub const ALERT_POLICY: AlertPolicy = AlertPolicy::Always;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OilAlert {
    NeverRegistered,
    Overdue { since: i64 },
    Critical { remaining: i64 },
    Warning { remaining: i64 },
    Reminder { remaining: i64 },
    Status { since: i64, remaining: i64 },
}

impl OilAlert {
    /// Markdown text sent to the chat.
    pub fn message(&self) -> String {
        match *self {
            OilAlert::NeverRegistered => {
                "⚠️ *ALERTA:* NENHUMA TROCA DE ÓLEO REGISTRADA AINDA!".to_string()
            }
            OilAlert::Overdue { since } => format!(
                "* LASCOU - {}KM RODADOS*!\n        🚨TROQUE O ÓLEO AGORA!🚨",
                since
            ),
            OilAlert::Critical { remaining } => {
                format!("🔴*ALERTA CRÍTICO*🔴\n*{}KM* PARA TROCAR DE ÓLEO!", remaining)
            }
            OilAlert::Warning { remaining } => {
                format!("🟡*ALERTA*🟡\n*{}KM* PARA TROCAR DE ÓLEO", remaining)
            }
            OilAlert::Reminder { remaining } => {
                format!("🔵*LEMBRETE*🔵\n*{}KM* PARA TROCAR DE ÓLEO", remaining)
            }
            OilAlert::Status { since, remaining } => format!(
                "⚪*STATUS ÓLEO*⚪\n*{}KM* RODADOS | *{}KM* RESTANTES",
                since, remaining
            ),
        }
    }
}

pub fn is_oil_change(desc: &str) -> bool {
    let lowered = desc.to_lowercase();
    OIL_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(&keyword.to_lowercase()))
}

/// Km of the most recent oil change, scanning newest first. 0 means never.
pub fn last_oil_change_km(doc: &Document) -> i64 {
    doc.manu
        .iter()
        .rev()
        .find(|event| is_oil_change(&event.desc))
        .map(|event| event.km)
        .unwrap_or(0)
}

pub fn oil_alert(doc: &Document, current_km: i64) -> Option<OilAlert> {
    oil_alert_with(ALERT_POLICY, last_oil_change_km(doc), current_km)
}

/// Classifies the distance since the last oil change. `last_oil_km == 0` means never changed.
pub fn oil_alert_with(policy: AlertPolicy, last_oil_km: i64, current_km: i64) -> Option<OilAlert> {
    if last_oil_km == 0 {
        return Some(OilAlert::NeverRegistered);
    }

    // Stored km values are not bounded, so the arithmetic saturates.
    let since = current_km.saturating_sub(last_oil_km);
    let remaining = OIL_CHANGE_INTERVAL_KM.saturating_sub(since);

    let alert = if since >= OIL_CHANGE_INTERVAL_KM {
        OilAlert::Overdue { since }
    } else if remaining <= 100 {
        OilAlert::Critical { remaining }
    } else if remaining <= 300 {
        OilAlert::Warning { remaining }
    } else if remaining <= 500 {
        OilAlert::Reminder { remaining }
    } else {
        match policy {
            AlertPolicy::Always => OilAlert::Status { since, remaining },
            AlertPolicy::QuietAboveReminder => return None,
        }
    };
    Some(alert)
}
