//! Hanuman Finance loan application intake.
//!
//! Receives the application form (applicant details plus PAN and bank
//! statement uploads), forwards it as an email with attachments through the
//! Brevo transactional API, and answers with a confirmation or error page.
//!
//! ## Architecture
//!
//! ```text
//! Browser → POST /submit → staging → validation → mail::compose → Brevo
//!                                   ↘ cleanup of staged files on every path
//! ```

pub mod config;
pub mod error;
pub mod mail;
pub mod render;
pub mod staging;
pub mod submission;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use error::SubmitError;
pub use mail::{BrevoMailer, Delivery, DeliveryError, Mailer, NotificationPayload};
pub use web::{router, AppState};
