pub mod analytics;
pub mod appointments;
pub mod auth;
pub mod communications;
pub mod health;
pub mod patients;
pub mod root;
pub mod settings;
pub mod templates;
pub mod users;
pub mod webhooks;
