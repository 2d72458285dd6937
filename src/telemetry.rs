use tracing::subscriber::set_global_default;
use tracing::Subscriber;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, EnvFilter, Registry};

/// Composes multiple layers into a `tracing` Subscriber.
///
/// # Arguments
/// - `name`: name of the app
/// - `fallback_env_filter`: filter level for traces if the RUST_LOG env variable has not been set
/// - `sink`: to what the traces will be outputted
///
/// # Returns
/// Using `impl Subscriber` as return type to avoid having to spell out
/// the actual type of the returned subscriber, which is quite complex.
pub fn get_tracing_subscriber<Sink>(
    name: String,
    fallback_env_filter: String,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    // The Sink implements the `MakeWriter` trait for all choices of the lifetime parameter `'a`
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    // Falls back to printing all spans at `fallback_env_filter` level
    // if the RUST_LOG environment variable has not been set.
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_env_filter));

    // Outputs log records in "bunyan"-compatible JSON format
    let formatting_layer = BunyanFormattingLayer::new(name, sink);

    Registry::default()
        .with(env_filter)
        // Stores span data in an easy-to-consume JSON format for downstream layers,
        // and propagates context from parent spans to their children.
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

/// Registers a tracing Subscriber as the global default to process span data.
///
/// It should only be called once
pub fn init_tracing_subscriber(subscriber: impl Subscriber + Send + Sync) {
    // Redirects all `log`'s events to our subscriber
    LogTracer::init().expect("Failed to set logger");

    set_global_default(subscriber).expect("Failed to set subscriber");
}
