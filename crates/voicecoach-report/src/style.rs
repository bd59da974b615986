//! Colour and glyph lookups shared by the renderers.

use voicecoach_core::statistics::ScoreBand;

/// Hex colour for a score band.
pub fn band_color(band: ScoreBand) -> &'static str {
    match band {
        ScoreBand::Excellent => "#10b981",
        ScoreBand::Good => "#f59e0b",
        ScoreBand::NeedsWork => "#ef4444",
    }
}

/// CSS class for a score band.
pub fn band_class(band: ScoreBand) -> &'static str {
    match band {
        ScoreBand::Excellent => "excellent",
        ScoreBand::Good => "good",
        ScoreBand::NeedsWork => "needs-work",
    }
}

/// Plain-text marker used where colour is unavailable.
pub fn band_marker(band: ScoreBand) -> &'static str {
    match band {
        ScoreBand::Excellent => "●",
        ScoreBand::Good => "◐",
        ScoreBand::NeedsWork => "○",
    }
}

/// Visual category for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleAccent {
    Management,
    Leadership,
    Engineering,
    Sales,
    Neutral,
}

impl RoleAccent {
    /// Map a role id to its accent. Unknown ids get [`RoleAccent::Neutral`].
    pub fn for_role(role_id: &str) -> Self {
        match role_id.to_ascii_lowercase().as_str() {
            "pm" | "project_manager" | "product_manager" => RoleAccent::Management,
            "tl" | "team_lead" | "tech_lead" | "manager" => RoleAccent::Leadership,
            "swe" | "engineer" | "software_engineer" | "developer" => RoleAccent::Engineering,
            "sales" | "account_executive" | "sdr" => RoleAccent::Sales,
            _ => RoleAccent::Neutral,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            RoleAccent::Management => "#3b82f6",
            RoleAccent::Leadership => "#8b5cf6",
            RoleAccent::Engineering => "#14b8a6",
            RoleAccent::Sales => "#f97316",
            RoleAccent::Neutral => "#6b7280",
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            RoleAccent::Management => "📋",
            RoleAccent::Leadership => "👥",
            RoleAccent::Engineering => "💻",
            RoleAccent::Sales => "📈",
            RoleAccent::Neutral => "🎯",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_colors_follow_thresholds() {
        assert_eq!(band_color(ScoreBand::classify(8.0)), "#10b981");
        assert_eq!(band_color(ScoreBand::classify(6.0)), "#f59e0b");
        assert_eq!(band_color(ScoreBand::classify(5.9)), "#ef4444");
    }

    #[test]
    fn role_accent_lookup() {
        assert_eq!(RoleAccent::for_role("pm"), RoleAccent::Management);
        assert_eq!(RoleAccent::for_role("Team_Lead"), RoleAccent::Leadership);
        assert_eq!(RoleAccent::for_role("astronaut"), RoleAccent::Neutral);
        assert_eq!(RoleAccent::for_role("astronaut").color(), "#6b7280");
    }
}
