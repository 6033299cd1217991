use criterion::{criterion_group, criterion_main};

mod network;

criterion_group!(
    benches,
    network::at::bench_classify,
    network::at::bench_command_round_trip,
    network::at::bench_ipd_coalesce,
    network::at::bench_http_body
);
criterion_main!(benches);
