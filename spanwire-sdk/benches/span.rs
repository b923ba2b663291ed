use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use futures_util::future::BoxFuture;
use spanwire::propagation::TextMapPropagator;
use spanwire::trace::{SpanContext, SpanKind, TraceId};
use spanwire::KeyValue;
use spanwire_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use spanwire_sdk::propagation::TraceContextPropagator;
use spanwire_sdk::trace::{should_sample, Tracer, TracerConfig};
use std::collections::HashMap;

fn criterion_benchmark(c: &mut Criterion) {
    span_builder_benchmark_group(c);
    propagation_benchmark_group(c);
    c.bench_function("should_sample", |b| {
        let trace_id = TraceId::from_u128(0x4bf9_2f35_77b3_4da6_a3ce_929d_0e0e_4736);
        b.iter(|| should_sample(trace_id, 0.5))
    });
}

fn span_builder_benchmark_group(c: &mut Criterion) {
    let mut group = c.benchmark_group("span_builder");
    for (name, ratio) in [("not_sampled", 0.0), ("sampled", 1.0)] {
        group.bench_function(BenchmarkId::new("simplest", name), |b| {
            let tracer = tracer(ratio);
            b.iter(|| {
                let mut span = tracer
                    .start_span("span", SpanKind::Internal, vec![], None)
                    .unwrap();
                span.end();
            })
        });
        group.bench_function(BenchmarkId::new("with_attributes_4", name), |b| {
            let tracer = tracer(ratio);
            b.iter(|| {
                let mut span = tracer
                    .start_span(
                        "span",
                        SpanKind::Internal,
                        vec![
                            KeyValue::new(MAP_KEYS[0], "value"),
                            KeyValue::new(MAP_KEYS[1], "value"),
                            KeyValue::new(MAP_KEYS[2], "value"),
                            KeyValue::new(MAP_KEYS[3], "value"),
                        ],
                        None,
                    )
                    .unwrap();
                span.end();
            })
        });
    }
    group.finish();
}

fn propagation_benchmark_group(c: &mut Criterion) {
    let mut group = c.benchmark_group("trace_context");
    let propagator = TraceContextPropagator::new();
    let mut carrier = HashMap::new();
    carrier.insert(
        "traceparent".to_string(),
        "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01".to_string(),
    );
    carrier.insert("tracestate".to_string(), "congo=t61rcWkgMzE".to_string());

    group.bench_function("extract", |b| b.iter(|| propagator.extract(&carrier)));
    group.bench_function("inject", |b| {
        let span_context = propagator.extract(&carrier).unwrap_or_else(SpanContext::empty_context);
        b.iter(|| {
            let mut headers: HashMap<String, String> = HashMap::new();
            propagator.inject(&span_context, &mut headers);
            headers
        })
    });
    group.finish();
}

fn tracer(ratio: f64) -> Tracer {
    let tracer = Tracer::new();
    tracer
        .initialize(
            TracerConfig::builder("bench").with_sampling_ratio(ratio).build(),
            NoopExporter,
        )
        .unwrap();
    tracer
}

#[derive(Debug)]
struct NoopExporter;

impl SpanExporter for NoopExporter {
    fn export(&mut self, _spans: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        Box::pin(futures_util::future::ready(Ok(())))
    }
}

const MAP_KEYS: [&str; 4] = ["key1", "key2", "key3", "key4"];

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
