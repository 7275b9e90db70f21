use crate::errors::AgriError;
use crate::render::{Badge, Card, Section, Tone};

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropActivity {
    pub crop: &'static str,
    pub activity: &'static str,
    pub icon: &'static str,
}

const fn act(crop: &'static str, activity: &'static str, icon: &'static str) -> CropActivity {
    CropActivity {
        crop,
        activity,
        icon,
    }
}

const JANUARY: &[CropActivity] = &[
    act("Wheat", "Harvesting", "🌾"),
    act("Mustard", "Flowering", "🌻"),
    act("Potato", "Harvesting", "🥔"),
];

const FEBRUARY: &[CropActivity] = &[
    act("Tomato", "Transplanting", "🍅"),
    act("Onion", "Planting", "🧅"),
    act("Carrot", "Sowing", "🥕"),
];

const MARCH: &[CropActivity] = &[
    act("Rice", "Land Preparation", "🌾"),
    act("Cotton", "Sowing", "🌱"),
    act("Sugarcane", "Planting", "🎋"),
];

const SEASONS: [(&str, &str, &str); 4] = [
    ("🌱", "Spring", "Planting Season"),
    ("☀️", "Summer", "Growth & Care"),
    ("🍂", "Monsoon", "Main Crops"),
    ("❄️", "Winter", "Harvest Time"),
];

/// Zero-based month index.
pub fn activities_for(month: usize) -> &'static [CropActivity] {
    match month {
        0 => JANUARY,
        1 => FEBRUARY,
        2 => MARCH,
        _ => &[],
    }
}

/// Accepts `1`–`12` or an English month name (any case, three-letter prefix ok).
pub fn parse_month(raw: &str) -> Result<usize, AgriError> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<usize>() {
        return (1..=12)
            .contains(&n)
            .then(|| n - 1)
            .ok_or_else(|| AgriError::BadRequest(format!("Month out of range: {}", n)));
    }

    let lower = raw.to_lowercase();
    MONTH_NAMES
        .iter()
        .position(|name| {
            let name = name.to_lowercase();
            name == lower || (lower.len() >= 3 && name.starts_with(&lower))
        })
        .ok_or_else(|| AgriError::BadRequest(format!("Unknown month: {}", raw)))
}

pub fn render(month: usize, year: i32) -> Vec<Section> {
    vec![
        Section::Cards {
            title: format!("Activities for {} {}", MONTH_NAMES[month % 12], year),
            cards: activities_for(month)
                .iter()
                .map(|a| Card {
                    title: format!("{} {}", a.icon, a.crop),
                    subtitle: Some(a.activity.to_string()),
                    badge: Some(Badge::new(a.activity, Tone::Neutral)),
                })
                .collect(),
        },
        Section::Cards {
            title: "Yearly Overview".to_string(),
            cards: SEASONS
                .iter()
                .map(|(icon, season, focus)| Card {
                    title: format!("{} {}", icon, season),
                    subtitle: Some(focus.to_string()),
                    badge: None,
                })
                .collect(),
        },
    ]
}
