use crate::render::{Badge, Card, ListStyle, Section, Tone};

pub const DEFAULT_LOCATION: &str = "New Delhi, India";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forecast {
    pub day: &'static str,
    pub temp_c: i32,
    pub condition: &'static str,
    pub icon: &'static str,
    pub rain_percent: u8,
}

const fn day(
    day: &'static str,
    temp_c: i32,
    condition: &'static str,
    icon: &'static str,
    rain_percent: u8,
) -> Forecast {
    Forecast {
        day,
        temp_c,
        condition,
        icon,
        rain_percent,
    }
}

pub const FORECAST: [Forecast; 5] = [
    day("Today", 28, "Partly Cloudy", "⛅", 10),
    day("Tomorrow", 30, "Sunny", "☀️", 0),
    day("Day 3", 26, "Rainy", "🌧️", 80),
    day("Day 4", 25, "Cloudy", "☁️", 20),
    day("Day 5", 29, "Sunny", "☀️", 5),
];

const HUMIDITY_PERCENT: u8 = 65;
const WIND_KMH: u8 = 12;

/// Rain chance at which a forecast day is highlighted.
const HEAVY_RAIN_PERCENT: u8 = 70;

const FARMING_ADVICE: [&str; 4] = [
    "Good conditions for field work today",
    "Consider irrigation before the rain on Day 3",
    "Perfect weather for harvesting this week",
    "Monitor crops for fungal diseases after rain",
];

pub fn render(location: &str) -> Vec<Section> {
    let location = match location.trim() {
        "" => DEFAULT_LOCATION,
        other => other,
    };
    let today = &FORECAST[0];

    vec![
        Section::Summary {
            title: format!("Current Weather - {}", location),
            headline: format!("{} {}°C {}", today.icon, today.temp_c, today.condition),
            badges: vec![
                Badge::new(format!("Humidity: {}%", HUMIDITY_PERCENT), Tone::Info),
                Badge::new(format!("Wind: {} km/h", WIND_KMH), Tone::Neutral),
                Badge::new("Farm Conditions: Good", Tone::Success),
            ],
            description: None,
        },
        Section::Cards {
            title: "5-Day Forecast".to_string(),
            cards: FORECAST
                .iter()
                .map(|f| Card {
                    title: format!("{} {}", f.day, f.icon),
                    subtitle: Some(format!("{}°C · {}", f.temp_c, f.condition)),
                    badge: Some(
                        Badge::new(format!("Rain: {}%", f.rain_percent), Tone::Info)
                            .emphasized(f.rain_percent >= HEAVY_RAIN_PERCENT),
                    ),
                })
                .collect(),
        },
        Section::List {
            title: "Farming Advice".to_string(),
            style: ListStyle::Checklist,
            items: FARMING_ADVICE.iter().map(|s| s.to_string()).collect(),
        },
    ]
}
