use color_eyre::Result;
use color_eyre::eyre::Context;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber: pretty console output filtered by
/// `filter` (an `EnvFilter` directive such as `info` or
/// `mediathek2rss=debug,tower_http=info`), plus span export over OTLP when
/// an endpoint is given.
///
/// The returned provider has to be shut down before exit to flush spans.
pub fn init_tracing(
    service_name: &str,
    otlp_endpoint: Option<&str>,
    filter: &str,
) -> Result<Option<SdkTracerProvider>> {
    let (telemetry_layer, tracer_provider) = match otlp_endpoint {
        Some(endpoint) => {
            let resource = Resource::builder()
                .with_attributes(vec![KeyValue::new(
                    opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                    service_name.to_string(),
                )])
                .build();

            let otlp_exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .build()
                .wrap_err("Failed to create OTLP span exporter")?;

            let tracer_provider = SdkTracerProvider::builder()
                .with_batch_exporter(otlp_exporter)
                .with_resource(resource)
                .build();
            opentelemetry::global::set_tracer_provider(tracer_provider.clone());

            let tracer = opentelemetry::global::tracer(service_name.to_string());
            (
                Some(tracing_opentelemetry::layer().with_tracer(tracer)),
                Some(tracer_provider),
            )
        }
        None => (None, None),
    };

    let fmt_layer = tracing_subscriber::fmt::layer().pretty();
    let filter_layer = EnvFilter::try_new(filter).wrap_err("Failed to create tracing filter")?;

    // Option<Layer> is itself a layer that does nothing when None
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(telemetry_layer)
        .init();

    Ok(tracer_provider)
}
