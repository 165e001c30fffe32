use time::OffsetDateTime;

use crate::dates::parse_stamp;
use crate::model::Document;

/// Fuel spend for the calendar month of `today`. Entries whose stamp does not parse are skipped.
pub fn spend_this_month(doc: &Document, today: OffsetDateTime) -> f64 {
    let month = u8::from(today.month());
    let year = today.year();
    doc.fuel
        .iter()
        .filter(|purchase| {
            parse_stamp(&purchase.date)
                .map(|stamp| stamp.month == month && stamp.year == year)
                .unwrap_or(false)
        })
        .map(|purchase| purchase.price)
        .sum()
}

pub fn spend_total(doc: &Document) -> f64 {
    doc.fuel.iter().map(|purchase| purchase.price).sum()
}

/// Fuel spend per month of `year`, January first.
pub fn spend_by_month(doc: &Document, year: i32) -> [f64; 12] {
    let mut totals = [0.0; 12];
    for purchase in &doc.fuel {
        let Some(stamp) = parse_stamp(&purchase.date) else {
            continue;
        };
        if stamp.year == year {
            totals[usize::from(stamp.month) - 1] += purchase.price;
        }
    }
    totals
}

pub fn liters_total(doc: &Document) -> f64 {
    doc.fuel.iter().map(|purchase| purchase.liters).sum()
}

/// Maintenance spend; events recorded without a price count as zero.
pub fn maintenance_total(doc: &Document) -> f64 {
    doc.manu.iter().map(|event| event.price.unwrap_or(0.0)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FuelPurchase, MaintenanceEvent};
    use time::macros::datetime;

    fn fuel(price: f64, date: &str) -> FuelPurchase {
        FuelPurchase { liters: 5.0, price, date: date.to_string() }
    }

    fn sample() -> Document {
        let mut doc = Document::default();
        doc.fuel.push(fuel(30.0, "02/03/25 às 09:00"));
        doc.fuel.push(fuel(25.5, "28/03/25 às 18:40"));
        doc.fuel.push(fuel(40.0, "10/04/25 às 07:15"));
        doc.fuel.push(fuel(12.0, "15/03/24 às 12:00"));
        doc.fuel.push(fuel(99.0, "data inválida"));
        doc
    }

    #[test]
    fn month_spend_matches_month_and_year() {
        let doc = sample();
        let today = datetime!(2025-03-30 12:00 -3);
        assert_eq!(spend_this_month(&doc, today), 55.5);
        let april = datetime!(2025-04-01 00:00 -3);
        assert_eq!(spend_this_month(&doc, april), 40.0);
    }

    #[test]
    fn total_spend_counts_every_entry() {
        assert_eq!(spend_total(&sample()), 206.5);
        assert_eq!(spend_total(&Document::default()), 0.0);
        assert_eq!(liters_total(&sample()), 25.0);
    }

    #[test]
    fn monthly_breakdown_for_year() {
        let months = spend_by_month(&sample(), 2025);
        assert_eq!(months[2], 55.5);
        assert_eq!(months[3], 40.0);
        assert_eq!(months.iter().sum::<f64>(), 95.5);
    }

    #[test]
    fn maintenance_without_price_counts_zero() {
        let mut doc = Document::default();
        for price in [Some(80.0), None, Some(20.5)] {
            doc.manu.push(MaintenanceEvent {
                desc: "Revisão".to_string(),
                date: "01/01/25 às 10:00".to_string(),
                km: 1000,
                price,
            });
        }
        assert_eq!(maintenance_total(&doc), 100.5);
    }
}
