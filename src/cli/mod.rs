pub mod calc;
pub mod history;
pub mod rate;
pub mod setup;
pub mod ui;
