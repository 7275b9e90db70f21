use serde::Serialize;

use crate::errors::AgriError;
use crate::render::{Badge, Card, ListStyle, Section, Tone};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRow {
    pub crop: &'static str,
    pub price: u32,
    pub unit: &'static str,
    pub change_percent: f32,
    pub trend: Trend,
    pub location: &'static str,
}

const fn row(crop: &'static str, price: u32, unit: &'static str, change_percent: f32) -> PriceRow {
    PriceRow {
        crop,
        price,
        unit,
        change_percent,
        trend: if change_percent >= 0.0 {
            Trend::Up
        } else {
            Trend::Down
        },
        location: "Delhi",
    }
}

pub static PRICES: [PriceRow; 6] = [
    row("Wheat", 2450, "per quintal", 2.5),
    row("Rice", 3200, "per quintal", -1.2),
    row("Tomato", 25, "per kg", 15.3),
    row("Onion", 18, "per kg", -5.8),
    row("Potato", 12, "per kg", 3.2),
    row("Cotton", 5800, "per quintal", 8.7),
];

/// `(id, display name)`
pub const LOCATIONS: [(&str, &str); 5] = [
    ("delhi", "Delhi"),
    ("mumbai", "Mumbai"),
    ("kolkata", "Kolkata"),
    ("chennai", "Chennai"),
    ("bangalore", "Bangalore"),
];

const TRADING_TIPS: [&str; 3] = [
    "Cotton prices are rising due to export demand - consider selling if you have stock",
    "Tomato prices expected to stabilize after current seasonal high",
    "Good time to buy onion seeds for next season planting",
];

pub fn location_name(id: &str) -> Result<&'static str, AgriError> {
    LOCATIONS
        .iter()
        .find(|(loc, _)| loc.eq_ignore_ascii_case(id.trim()))
        .map(|(_, name)| *name)
        .ok_or_else(|| AgriError::BadRequest(format!("Unknown market location: {}", id)))
}

/// Case-insensitive substring match on the crop name; an empty query keeps every row.
pub fn filter_rows(query: &str) -> Vec<&'static PriceRow> {
    let query = query.trim().to_lowercase();
    PRICES
        .iter()
        .filter(|r| query.is_empty() || r.crop.to_lowercase().contains(&query))
        .collect()
}

/// `1234567` → `12,34,567` (Indian digit grouping)
fn format_rupees(amount: u32) -> String {
    let digits = amount.to_string();
    if digits.len() <= 3 {
        return format!("₹{}", digits);
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (left, right) = rest.split_at(rest.len() - 2);
        groups.push(right);
        rest = left;
    }
    groups.push(rest);
    groups.reverse();
    format!("₹{},{}", groups.join(","), tail)
}

pub fn render(query: &str, location: &str) -> Vec<Section> {
    let rising: Vec<&str> = PRICES
        .iter()
        .filter(|r| r.trend == Trend::Up)
        .map(|r| r.crop)
        .collect();
    let falling: Vec<&str> = PRICES
        .iter()
        .filter(|r| r.trend == Trend::Down)
        .map(|r| r.crop)
        .collect();

    vec![
        Section::Cards {
            title: format!("Market Prices - {}", location),
            cards: filter_rows(query)
                .into_iter()
                .map(|r| {
                    let (arrow, tone) = match r.trend {
                        Trend::Up => ("📈", Tone::Success),
                        Trend::Down => ("📉", Tone::Danger),
                    };
                    Card {
                        title: r.crop.to_string(),
                        subtitle: Some(format!(
                            "{} {} · {}",
                            format_rupees(r.price),
                            r.unit,
                            r.location
                        )),
                        badge: Some(Badge::new(
                            format!("{} {:+.1}%", arrow, r.change_percent),
                            tone,
                        )),
                    }
                })
                .collect(),
        },
        Section::Cards {
            title: "Price Trends".to_string(),
            cards: vec![
                Card {
                    title: "Rising Prices".to_string(),
                    subtitle: Some(format!("{} showing upward trend", rising.join(", "))),
                    badge: None,
                },
                Card {
                    title: "Falling Prices".to_string(),
                    subtitle: Some(format!("{} prices declining this week", falling.join(", "))),
                    badge: None,
                },
            ],
        },
        Section::List {
            title: "Trading Tips".to_string(),
            style: ListStyle::Bullet,
            items: TRADING_TIPS.iter().map(|s| s.to_string()).collect(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_filter_is_case_insensitive_substring() {
        let rows = filter_rows("TO");
        let crops: Vec<&str> = rows.iter().map(|r| r.crop).collect();
        assert_eq!(crops, vec!["Tomato", "Potato", "Cotton"]);
        assert_eq!(filter_rows("").len(), 6);
        assert!(filter_rows("barley").is_empty());
    }

    #[test]
    fn locations_resolve_by_id() {
        assert_eq!(location_name("Mumbai").unwrap(), "Mumbai");
        assert!(location_name("paris").is_err());
    }

    #[test]
    fn prices_use_indian_grouping() {
        assert_eq!(format_rupees(25), "₹25");
        assert_eq!(format_rupees(2450), "₹2,450");
        assert_eq!(format_rupees(1234567), "₹12,34,567");
    }

    #[test]
    fn trend_badges_show_signed_change() {
        let sections = render("rice", "Delhi");
        let Section::Cards { cards, .. } = &sections[0] else {
            panic!("expected cards");
        };
        assert_eq!(cards.len(), 1);
        let badge = cards[0].badge.as_ref().unwrap();
        assert_eq!(badge.text, "📉 -1.2%");
        assert_eq!(badge.tone, Tone::Danger);
        assert_eq!(cards[0].subtitle.as_deref(), Some("₹3,200 per quintal · Delhi"));
    }
}
