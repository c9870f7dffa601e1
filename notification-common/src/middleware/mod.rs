pub mod sentry;

pub use self::sentry::{SentryWrapper, SentryWrapperMiddleware};
