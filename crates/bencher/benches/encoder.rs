use std::hint::black_box;
use bytes::{Bytes, BytesMut};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use gateway_wire::buffer::{FrameAllocator, Region};
use gateway_wire::codec::MessageEncoder;
use gateway_wire::protocol::{Content, HttpMessage, ResponseHead, TransferCoding};
use http::StatusCode;
use tokio_util::codec::Encoder;

const SIZES: [usize; 3] = [64, 4096, 70000];

fn chunked_response(content: Region) -> HttpMessage {
    ResponseHead::new(StatusCode::OK)
        .with_transfer_coding(TransferCoding::Chunked)
        .with_content(Content::complete(content))
        .into()
}

/// Allocator regions are framed in place, shared ones are copied once.
fn benchmark_chunked_frames(criterion: &mut Criterion) {
    let allocator = FrameAllocator::new();
    let mut group = criterion.benchmark_group("chunked_encode_frames");

    for size in SIZES {
        let payload = vec![b'x'; size];
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("in_place", size), &payload, |b, payload| {
            let mut encoder = MessageEncoder::new();
            let mut frames = Vec::with_capacity(2);
            b.iter_batched(
                || chunked_response(allocator.allocate_from(payload)),
                |message| {
                    encoder.encode_frames(message, &mut frames).expect("response should be encodable");
                    black_box(frames.drain(..).count());
                },
                BatchSize::SmallInput,
            );
        });

        let shared = Bytes::from(payload);
        group.bench_with_input(BenchmarkId::new("copied", size), &shared, |b, shared| {
            let mut encoder = MessageEncoder::new();
            let mut frames = Vec::with_capacity(2);
            b.iter_batched(
                || chunked_response(Region::shared(shared.clone())),
                |message| {
                    encoder.encode_frames(message, &mut frames).expect("response should be encodable");
                    black_box(frames.drain(..).count());
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_tokio_encoder(criterion: &mut Criterion) {
    let allocator = FrameAllocator::new();
    let mut group = criterion.benchmark_group("tokio_encoder");
    group.throughput(Throughput::Bytes(4096));
    group.bench_function("chunked_4096", |b| {
        let mut encoder = MessageEncoder::new();
        let mut dst = BytesMut::with_capacity(8 * 1024);
        b.iter_batched(
            || chunked_response(allocator.allocate(4096)),
            |message| {
                encoder.encode(message, &mut dst).expect("response should be encodable");
                black_box(dst.split());
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(encoder, benchmark_chunked_frames, benchmark_tokio_encoder);
criterion_main!(encoder);
