//! Benchmarks do parser de saída estruturada e da extração de contatos.
//!
//! Testa performance de:
//! - Seções do contrato de análise
//! - Batch de ratings do ranking
//! - Contatos por regex em páginas grandes
//!
//! Executar: `cargo bench --bench parser_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use research_pipeline::analyzer::extract_contacts;
use research_pipeline::parser::{
    extract_quoted, parse_bullet_list, parse_rating_batch, parse_sections, ANALYSIS_CONTRACT,
};

const ANALYSIS_REPLY: &str = "**SUMMARY:**\nThe Berliner Mieterverein offers legal advice for tenants.\nOffices in every district.\n\n**RELEVANCE:** Very relevant\n\n**RELEVANCE EXPLANATION:**\nOfficial organisation with direct contact options.\n\n**NEXT ACTIONS:**\n- Call the hotline\n- Book an appointment\n- Check membership fees\n";

fn rating_reply(items: usize) -> String {
    (1..=items)
        .map(|i| {
            format!(
                "{}. RATING: {}\nEXPLANATION: Result {} covers part of the query.\nIt also mentions opening hours.",
                i,
                ["Very relevant", "relevant", "somewhat relevant", "not relevant"][i % 4],
                i
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// BENCHMARK: Parser
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn bench_sections(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_sections");

    group.bench_function("analysis_contract", |bencher| {
        bencher.iter(|| black_box(parse_sections(black_box(ANALYSIS_REPLY), &ANALYSIS_CONTRACT)))
    });

    group.bench_function("bullet_list", |bencher| {
        bencher.iter(|| black_box(parse_bullet_list(black_box("- a\n* b\n• c\n1. d\n2) e\n\n"))))
    });

    group.bench_function("extract_quoted", |bencher| {
        let text = "\"Mieterverein Berlin\"\n\"Mieterberatung\"\n“Mietrecht Hilfe”\n\"Wohnungsamt\"";
        bencher.iter(|| black_box(extract_quoted(black_box(text))))
    });

    group.finish();
}

fn bench_rating_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_rating_batch");

    for items in [10, 40, 100] {
        let reply = rating_reply(items);
        group.bench_with_input(BenchmarkId::from_parameter(items), &reply, |bencher, reply| {
            bencher.iter(|| black_box(parse_rating_batch(reply, items)))
        });
    }

    group.finish();
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// BENCHMARK: Contatos
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn bench_contacts(c: &mut Criterion) {
    let mut group = c.benchmark_group("contact_extraction");

    for words in [1_000, 10_000] {
        let mut text = "Lorem ipsum dolor sit amet ".repeat(words / 5);
        text.push_str("info@mieterverein.de +49 030-226-2600 https://www.facebook.com/mieterverein");
        group.bench_with_input(BenchmarkId::from_parameter(words), &text, |bencher, text| {
            bencher.iter(|| black_box(extract_contacts(text)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sections, bench_rating_batch, bench_contacts);
criterion_main!(benches);
