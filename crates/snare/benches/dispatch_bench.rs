use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use futures::executor::block_on;
use snare::{HttpTransport, Method, Mock, MockConfig, Request, RouteOptions, UrlPattern};

fn literal_mock(count: usize) -> Mock {
    let mock = Mock::with_config(MockConfig::new().assert_all_called(false));
    for i in 0..count {
        mock.get(
            format!("https://api.example.org/v1/endpoint{i}/"),
            RouteOptions::new().content("ok"),
        )
        .unwrap();
    }
    mock
}

fn regex_mock(count: usize) -> Mock {
    let mock = Mock::with_config(MockConfig::new().assert_all_called(false));
    for i in 0..count {
        mock.get(
            UrlPattern::regex(&format!(r"^https://api\.example\.org/v\d+/endpoint{i}/(?P<id>\d+)/$"))
                .unwrap(),
            RouteOptions::new().content("ok"),
        )
        .unwrap();
    }
    mock
}

fn request(url: &str) -> Request {
    Request::new(Method::GET, url).unwrap()
}

fn bench_literal_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("literal_dispatch");
    let transport = HttpTransport::new();

    for route_count in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(1));

        let first = request("https://api.example.org/v1/endpoint0/");
        group.bench_with_input(BenchmarkId::new("match_first", route_count), route_count, |b, &n| {
            b.iter_batched(
                || literal_mock(n),
                |mock| block_on(mock.dispatch(black_box(first.clone()), &transport)),
                BatchSize::SmallInput,
            );
        });

        let last = request(&format!("https://api.example.org/v1/endpoint{}/", route_count - 1));
        group.bench_with_input(BenchmarkId::new("match_last", route_count), route_count, |b, &n| {
            b.iter_batched(
                || literal_mock(n),
                |mock| block_on(mock.dispatch(black_box(last.clone()), &transport)),
                BatchSize::SmallInput,
            );
        });

        // Unmatched requests are rejected without recording, so one mock serves every iteration
        let mock = literal_mock(*route_count);
        let none = request("https://api.example.org/not/found/");
        group.bench_with_input(BenchmarkId::new("match_none", route_count), route_count, |b, _| {
            b.iter(|| block_on(mock.dispatch(black_box(none.clone()), &transport)));
        });
    }

    group.finish();
}

fn bench_regex_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("regex_dispatch");
    let transport = HttpTransport::new();

    for route_count in [10, 50, 100].iter() {
        let middle = request(&format!(
            "https://api.example.org/v2/endpoint{}/123/",
            route_count / 2
        ));

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("match_middle", route_count), route_count, |b, &n| {
            b.iter_batched(
                || regex_mock(n),
                |mock| block_on(mock.dispatch(black_box(middle.clone()), &transport)),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_pattern_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern_eval");

    let literal = UrlPattern::from("https://api.example.org/v1/test/");
    let regex = UrlPattern::regex(r"^https://api\.example\.org/v1/(?P<name>\w+)/$").unwrap();
    let url = "https://api.example.org/v1/test/";

    group.throughput(Throughput::Elements(1));
    group.bench_function("literal", |b| b.iter(|| literal.matches(black_box(url))));
    group.bench_function("regex_captures", |b| b.iter(|| regex.matches(black_box(url))));

    group.finish();
}

criterion_group!(
    benches,
    bench_literal_dispatch,
    bench_regex_dispatch,
    bench_pattern_evaluation
);
criterion_main!(benches);
