//! Cadence metrics client construction, shared by every RPC handler and the
//! per-channel adapters for send-count/latency counters.
use std::net::UdpSocket;

use cadence::{BufferedUdpMetricSink, NopMetricSink, QueuingMetricSink, StatsdClient};

use crate::errors::ApiResult;

/// Builds a `StatsdClient` pointed at `host:port`, or a no-op sink when
/// `host` is absent (local dev / tests).
pub fn new_metrics(host: Option<String>, port: u16, prefix: &str) -> ApiResult<StatsdClient> {
    let builder = if let Some(statsd_host) = host.as_ref() {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;

        let host = (statsd_host.as_str(), port);
        let udp_sink = BufferedUdpMetricSink::from(host, socket)?;
        let sink = QueuingMetricSink::from(udp_sink);
        StatsdClient::builder(prefix, sink)
    } else {
        StatsdClient::builder(prefix, NopMetricSink)
    };
    Ok(builder
        .with_error_handler(|err| error!("Metrics send error: {}", err))
        .build())
}
