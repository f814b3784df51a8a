use criterion::{criterion_group, criterion_main};


criterion_group!(
    benches,
    packet::bench_encode_publish,
    packet::bench_decode_publish,
    packet::bench_encode_connect
);
criterion_main!(benches);
