use std::io::Write;

use chrono::Local;
use serde_json::{json, Value};
use tracing::warn;

use crate::monitor::{ImpactObserver, ImpactUpdate};

const UNIT: &str = "gCO₂eq";

pub fn session_label(grams: f64) -> String {
    format!("Session: {:.2} {}", grams, UNIT)
}

pub fn lifetime_label(grams: f64) -> String {
    format!("Lifetime: {:.2} {}", grams, UNIT)
}

/// "do not charge" while the grid is high or very high, "charge" otherwise.
pub fn indicator(update: &ImpactUpdate) -> &'static str {
    if update.band.discourages_charging() {
        "do not charge"
    } else {
        "charge"
    }
}

pub fn render_lines(update: &ImpactUpdate) -> Vec<String> {
    vec![
        session_label(update.session_grams),
        lifetime_label(update.lifetime_grams),
        format!("Current intensity: {}", update.band),
        update
            .advice
            .map(|a| a.message().to_string())
            .unwrap_or_else(|| "Forecast unavailable".to_string()),
        format!("Status: {}", indicator(update)),
    ]
}

pub fn to_json(update: &ImpactUpdate) -> Value {
    json!({
        "polled_at": update.polled_at.to_rfc3339(),
        "scope": update.scope.label(),
        "charging": update.charging,
        "draw_watts": update.draw_watts,
        "intensity": update.intensity,
        "band": update.band,
        "session_grams": update.session_grams,
        "lifetime_grams": update.lifetime_grams,
        "advice": update.advice.map(|a| a.message()),
        "indicator": indicator(update),
    })
}

/// Writes the labels for every update, headed by the local time and scope.
pub struct TextPresenter<W> {
    out: W,
}

impl<W: Write> TextPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn write_update(&mut self, update: &ImpactUpdate) -> std::io::Result<()> {
        let when = update.polled_at.with_timezone(&Local).format("%H:%M:%S");
        let power = if update.charging {
            format!("charging at {:.1}W", update.draw_watts)
        } else {
            "on battery".to_string()
        };
        writeln!(self.out, "[{}] {} ({})", when, update.scope.label(), power)?;
        for line in render_lines(update) {
            writeln!(self.out, "  {}", line)?;
        }
        self.out.flush()
    }
}

impl<W: Write> ImpactObserver for TextPresenter<W> {
    fn on_impact_updated(&mut self, update: &ImpactUpdate) {
        if let Err(e) = self.write_update(update) {
            warn!(error = %e, "Failed to write update");
        }
    }
}
