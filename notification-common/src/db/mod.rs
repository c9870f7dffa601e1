//! Storage abstraction: one trait per stateful responsibility (`client`), an
//! in-memory reference implementation (`memory`), and — behind the
//! `postgres` feature — the concrete deadpool/tokio-postgres backend
//! (`postgres`).
pub mod client;
pub mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use client::{
    DeviceToken, DeviceTokenRepository, NotificationListFilter, NotificationPage,
    NotificationRepository, PreferenceRepository, QuietHoursRepository, StoredPreferences,
};
pub use error::{DbError, DbResult};
