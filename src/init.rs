use crate::event::LogLevel;
use crate::layer::EventLayer;
use crate::sink::LogEventSink;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the `tracing` bridge.
///
/// **Fields**
/// - `min_level`: least severe level that is turned into a
///   [`LogEvent`](crate::event::LogEvent) and emitted into the sink.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   installed next to [`EventLayer`] and every event is also printed to the
///   console.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub min_level: LogLevel,
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            enable_stdout: true,
        }
    }
}

/// Initialize the global `tracing` subscriber using the provided sink and
/// [`LayerConfig`].
///
/// **Parameters**
/// - `sink`: implementation of [`LogEventSink`] that will receive the
///   converted events. Wrap it in
///   [`CopyingSink`](crate::copying::CopyingSink) if it mutates events.
/// - `config`: [`LayerConfig`] controlling filtering and console output.
///
/// **Returns**
/// - `Err(..)` if a global subscriber was already installed.
pub fn init_tracing_with_config<S>(sink: S, config: LayerConfig) -> Result<(), SetGlobalDefaultError>
where
    S: LogEventSink + 'static,
{
    let layer = EventLayer::new(sink, config.min_level);

    // Both arms build differently typed subscribers, so install each one
    // separately.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)
    }
}

/// Initialize tracing with sensible defaults.
///
/// Equivalent to calling [`init_tracing_with_config`] with
/// [`LayerConfig::default`].
pub fn init_tracing<S>(sink: S) -> Result<(), SetGlobalDefaultError>
where
    S: LogEventSink + 'static,
{
    init_tracing_with_config(sink, LayerConfig::default())
}
