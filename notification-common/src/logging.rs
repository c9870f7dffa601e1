use std::io;

use slog::Drain;
use slog_mozlog_json::MozLogJson;

use crate::errors::ApiResult;

pub fn init_logging(json: bool) -> ApiResult<()> {
    let logger = if json {
        let hostname = gethostname::gethostname()
            .into_string()
            .expect("Could not parse logging hostname");

        let drain = MozLogJson::new(io::stdout())
            .logger_name(format!(
                "{}-{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .msg_type(format!("{}:log", env!("CARGO_PKG_NAME")))
            .hostname(hostname)
            .build()
            .fuse();
        let drain = slog_async::Async::new(drain).build().fuse();
        slog::Logger::root(drain, o!())
    } else {
        let decorator = slog_term::TermDecorator::new().build();
        let drain = slog_term::FullFormat::new(decorator).build().fuse();
        let drain = slog_async::Async::new(drain).build().fuse();
        slog::Logger::root(drain, o!())
    };
    // slog_scope's NoGlobalLoggerSet guard is cancelled here since tests set
    // and reset the global logger repeatedly; reset_logging() below restores
    // a discarding logger on shutdown instead.
    slog_scope::set_global_logger(logger).cancel_reset();
    slog_stdlog::init().ok();
    Ok(())
}

pub fn reset_logging() {
    let logger = slog::Logger::root(slog::Discard, o!());
    slog_scope::set_global_logger(logger).cancel_reset();
}
