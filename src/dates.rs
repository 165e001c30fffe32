use time::OffsetDateTime;

const MONTH_NAMES: [&str; 12] = [
    "Janeiro", "Fevereiro", "Março", "Abril", "Maio", "Junho",
    "Julho", "Agosto", "Setembro", "Outubro", "Novembro", "Dezembro",
];

/// Separator between the date and time halves of a stamp.
const STAMP_SEPARATOR: &str = " às ";

/// Day, month and full year recovered from a stored stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayStamp {
    pub day: u8,
    pub month: u8,
    pub year: i32,
}

/// Formats `now` as `DD/MM/YY às HH:MM`, the form every record is stored with.
pub fn format_stamp(now: OffsetDateTime) -> String {
    format!(
        "{:02}/{:02}/{:02}{}{:02}:{:02}",
        now.day(),
        u8::from(now.month()),
        now.year().rem_euclid(100),
        STAMP_SEPARATOR,
        now.hour(),
        now.minute()
    )
}

/// Reverse of [`format_stamp`] for the date half. Two-digit years map to 2000 + yy.
pub fn parse_stamp(raw: &str) -> Option<DayStamp> {
    let date = raw.split(STAMP_SEPARATOR).next()?.trim();
    let mut parts = date.split('/');
    let day: u8 = parts.next()?.trim().parse().ok()?;
    let month: u8 = parts.next()?.trim().parse().ok()?;
    let year: i32 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    let year = if year < 100 { 2000 + year } else { year };
    Some(DayStamp { day, month, year })
}

/// Portuguese month name for `month` in 1..=12.
pub fn month_name(month: u8) -> &'static str {
    MONTH_NAMES
        .get(usize::from(month).wrapping_sub(1))
        .copied()
        .unwrap_or("Mês Atual")
}

/// `DD/MM/YYYY HH:MM:SS`, used in diagnostics.
pub fn format_clock(now: OffsetDateTime) -> String {
    format!(
        "{:02}/{:02}/{} {:02}:{:02}:{:02}",
        now.day(),
        u8::from(now.month()),
        now.year(),
        now.hour(),
        now.minute(),
        now.second()
    )
}
