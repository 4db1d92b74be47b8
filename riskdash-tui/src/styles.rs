use crate::present::Tier;
use ratatui::style::{Color, Modifier, Style};
use riskdash_verify::RiskLevel;

pub fn title() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

pub fn label() -> Style {
    Style::default().fg(Color::Gray)
}

pub fn required_mark() -> Style {
    Style::default().fg(Color::Red)
}

pub fn value() -> Style {
    Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

pub fn focused() -> Style {
    Style::default().fg(Color::Yellow)
}

pub fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn error() -> Style {
    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
}

pub fn button(enabled: bool) -> Style {
    if enabled {
        Style::default()
            .fg(Color::White)
            .bg(Color::Blue)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Black).bg(Color::DarkGray)
    }
}

pub fn tier(tier: Tier) -> Style {
    let color = match tier {
        Tier::HighAlert => Color::Red,
        Tier::Caution => Color::Yellow,
        Tier::Nominal => Color::Green,
    };
    Style::default().fg(color).bg(Color::Black)
}

/// Risk level badge. Unknown levels get a neutral gray.
pub fn badge(level: RiskLevel) -> Style {
    let (fg, bg) = match level {
        RiskLevel::High => (Color::Black, Color::LightRed),
        RiskLevel::Medium => (Color::Black, Color::LightYellow),
        RiskLevel::Low => (Color::Black, Color::LightGreen),
        RiskLevel::Unrecognized => (Color::Black, Color::Gray),
    };
    Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD)
}

pub fn busy() -> Style {
    Style::default().fg(Color::Yellow)
}

pub fn idle() -> Style {
    Style::default().fg(Color::Green)
}
