use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ghosttype::config::MatcherConfig;
use ghosttype::diff::build_operations;
use ghosttype::matcher::{
    levenshtein, match_cached, trigram_similarity, FillInSuggestion, SuggestionHistory,
};
use ghosttype::parse::{ParseMode, StreamParser};

fn synthetic_snapshot(lines: usize, salt: usize) -> String {
    (0..lines)
        .map(|i| {
            if (i + salt) % 17 == 0 {
                format!("    let value_{i} = compute_{salt}({i});")
            } else {
                format!("    let value_{i} = compute({i});")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn synthetic_history(entries: usize) -> SuggestionHistory {
    let mut history = SuggestionHistory::new(entries);
    for i in 0..entries {
        history.record(FillInSuggestion::new(
            format!("completion_{i}(arg_{i});"),
            format!("fn handler_{i}() {{\n    let state = load_{i}();\n    "),
            "\n}",
        ));
    }
    history
}

fn bench_similarity(c: &mut Criterion) {
    let a = "let account_balance = fetch_balance_for(user_id);";
    let b = "let account_balnce = fetch_balance_for(user.id);";

    c.bench_function("levenshtein_50_chars", |bench| {
        bench.iter(|| black_box(levenshtein(black_box(a), black_box(b))));
    });

    c.bench_function("trigram_similarity_3_lines", |bench| {
        let left = synthetic_snapshot(3, 0);
        let right = synthetic_snapshot(3, 1);
        bench.iter(|| black_box(trigram_similarity(black_box(&left), black_box(&right))));
    });
}

fn bench_matcher_query(c: &mut Criterion) {
    let history = synthetic_history(16);
    let config = MatcherConfig::default();
    // Worst case: nothing matches exactly, every heuristic runs.
    let prefix = "fn handler_miss() {\n    let state = reload();\n    ";

    c.bench_function("matcher_query_full_history", |b| {
        b.iter(|| {
            black_box(match_cached(
                black_box(&history),
                black_box(prefix),
                black_box("\n}"),
                &config,
            ))
        });
    });
}

fn bench_snapshot_diff(c: &mut Criterion) {
    let before = synthetic_snapshot(400, 0);
    let after = synthetic_snapshot(400, 3);

    c.bench_function("diff_400_line_snapshots", |b| {
        b.iter(|| black_box(build_operations(black_box(&before), black_box(&after), 0)));
    });
}

fn bench_stream_parse(c: &mut Criterion) {
    let response: String = (0..20)
        .map(|i| {
            format!(
                "<change><search><![CDATA[    let value_{i} = compute({i});]]></search>\
                 <replace><![CDATA[    let value_{i} = compute_cached({i});]]></replace></change>\n"
            )
        })
        .collect();
    let chunks: Vec<&str> = response
        .as_bytes()
        .chunks(64)
        .map(|c| std::str::from_utf8(c).unwrap())
        .collect();

    c.bench_function("parse_20_units_64_byte_chunks", |b| {
        b.iter(|| {
            let mut parser = StreamParser::new(ParseMode::SearchReplace);
            for chunk in &chunks {
                parser.parse_chunk(chunk);
            }
            black_box(parser.finish_stream());
        });
    });
}

criterion_group!(
    perf_core,
    bench_similarity,
    bench_matcher_query,
    bench_snapshot_diff,
    bench_stream_parse
);
criterion_main!(perf_core);
