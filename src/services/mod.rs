pub mod daily_tip;
pub mod hours;
pub mod icons;
pub mod itinerary;
pub mod quality;
pub mod session_history;
pub mod time_context;
pub mod variation;
