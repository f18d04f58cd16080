use std::io::{self, Write};
use tokio::sync::mpsc::UnboundedSender;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

struct ChannelWriter {
    tx: UnboundedSender<String>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf).to_string();
        let _ = self.tx.send(s);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Initialize logging at `level` unless `RUST_LOG` says otherwise. If a channel
/// is provided, log output is forwarded to the channel instead of standard
/// output.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_logging(level: &str, forward: Option<UnboundedSender<String>>) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);
    if let Some(tx) = forward {
        let layer = fmt::layer()
            .with_ansi(false)
            .with_writer(move || ChannelWriter { tx: tx.clone() });
        registry.with(layer).try_init().is_ok()
    } else {
        registry.with(fmt::layer()).try_init().is_ok()
    }
}
