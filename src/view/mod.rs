pub mod dashboard;
pub mod screens;

use std::fmt;
use std::str::FromStr;

pub use screens::ScreenContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Dashboard,
    Chat,
    Reminders,
    Reports,
    Devices,
    Settings,
}

impl View {
    pub const ALL: [View; 6] = [
        View::Dashboard,
        View::Chat,
        View::Reminders,
        View::Reports,
        View::Devices,
        View::Settings,
    ];

    /// Sidebar label.
    pub fn label(&self) -> &'static str {
        match self {
            View::Dashboard => "Dashboard",
            View::Chat => "AI Consultation",
            View::Reminders => "Reminders",
            View::Reports => "Medical Reports",
            View::Devices => "Devices",
            View::Settings => "Settings",
        }
    }

    /// Header title.
    pub fn title(&self) -> &'static str {
        match self {
            View::Dashboard => "Health Overview",
            View::Chat => "Medico Assistant",
            View::Reminders => "Medication & Reminders",
            View::Reports => "Report Analysis",
            View::Devices => "Connected Devices",
            View::Settings => "Settings",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dashboard" => Ok(View::Dashboard),
            "chat" => Ok(View::Chat),
            "reminders" => Ok(View::Reminders),
            "reports" => Ok(View::Reports),
            "devices" => Ok(View::Devices),
            "settings" => Ok(View::Settings),
            _ => Err(format!("Unknown view: '{}'", s)),
        }
    }
}

/// Tracks the selected screen and renders exactly that one.
#[derive(Debug, Default)]
pub struct ViewRouter {
    current: View,
}

impl ViewRouter {
    pub fn navigate(&mut self, view: View) {
        self.current = view;
    }

    pub fn current(&self) -> View {
        self.current
    }

    pub fn render(&self, ctx: &ScreenContext<'_>) -> String {
        let body = match self.current {
            View::Dashboard => screens::dashboard(ctx),
            View::Chat => screens::chat(ctx),
            View::Reminders => screens::reminders(ctx),
            View::Reports => screens::reports(ctx),
            View::Devices => screens::devices(ctx),
            View::Settings => screens::settings(ctx),
        };
        format!("== {} ==\n{}", self.current.title(), body)
    }
}
