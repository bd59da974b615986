//! voicecoach-report: Dashboard rendering.
//!
//! Turns computed `DashboardStats` and role histories into Markdown, HTML
//! and JSON. Renderers are pure; the `write_*` helpers add the filesystem
//! step.

pub mod html;
pub mod json;
pub mod markdown;
pub mod style;
