//! Benchmarks for incremental versus from-scratch rendering.

#![allow(clippy::format_push_string)] // Benchmark setup code, performance not critical

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use tailmd_renderer::{PlainHighlighter, RenderOptions, Renderer};
use tailmd_stream::StreamSession;

/// Generate markdown resembling a long generated answer.
fn generate_markdown(sections: usize) -> String {
    let mut md = String::from("# Answer\n\n");
    for i in 0..sections {
        md.push_str(&format!("## Step {i}\n\n"));
        md.push_str(&format!(
            "This is step {i}. It has **bold**, *italic* and `code` spans.\n\n"
        ));
        md.push_str("- first point\n- second point\n\n");
        md.push_str(&format!("```rust\nfn step_{i}() -> u32 {{ {i} }}\n```\n\n"));
        md.push_str("| key | value |\n|---|---|\n| a | 1 |\n\n");
    }
    md
}

fn renderer() -> Arc<Renderer> {
    let options = RenderOptions::default().with_streaming(true);
    Arc::new(Renderer::new(options).with_highlighter(PlainHighlighter))
}

/// Split `text` into chunks of roughly `size` bytes on char boundaries.
fn chunks(text: &str, size: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + size).min(text.len());
        while !text.is_char_boundary(end) {
            end += 1;
        }
        out.push(&text[start..end]);
        start = end;
    }
    out
}

fn bench_stream_vs_full(c: &mut Criterion) {
    let renderer = renderer();
    let mut group = c.benchmark_group("stream_by_size");

    for sections in [5, 20] {
        let markdown = generate_markdown(sections);
        let pieces = chunks(&markdown, 16);
        group.throughput(Throughput::Bytes(markdown.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("incremental", sections),
            &pieces,
            |b, pieces| {
                b.iter(|| {
                    let mut session = StreamSession::new(Arc::clone(&renderer));
                    for piece in pieces {
                        session.push(piece);
                    }
                    session.finish()
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("full_rerender", sections),
            &pieces,
            |b, pieces| {
                b.iter(|| {
                    let mut buffer = String::new();
                    let mut html = String::new();
                    for piece in pieces {
                        buffer.push_str(piece);
                        html = renderer.render(&buffer);
                    }
                    html
                });
            },
        );
    }

    group.finish();
}

fn bench_render_once(c: &mut Criterion) {
    let renderer = renderer();
    let markdown = generate_markdown(20);
    c.bench_function("render_20_sections", |b| {
        b.iter(|| renderer.render(&markdown));
    });
}

criterion_group!(benches, bench_stream_vs_full, bench_render_once);
criterion_main!(benches);
