pub mod chat;
pub mod health;
pub mod reminder;
pub mod user;

pub use chat::{ Attachment, ChatMode, Message, Role };
pub use health::{
    HealthMetric,
    HealthRiskAnalysis,
    HealthRiskProfile,
    HealthStats,
    VitalSign,
    VitalStatus,
    VitalsHistoryPoint,
};
pub use reminder::{ Reminder, ReminderCategory };
pub use user::UserData;
