use cluster_console::system::row::Row;
use cluster_console::system::schema::{can_drill_down, infer_schema};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};

fn create_level(rows: usize, columns: usize) -> Vec<Row> {
    (0..rows)
        .map(|i| {
            let mut row = Row::new();
            row.insert("Label".to_string(), json!(format!("label_{}", i)));
            for c in 0..columns {
                row.insert(format!("Column{}", c), json!(i * c));
            }
            row.insert("TransactionId".to_string(), json!(format!("{}", 5000 + i)));
            row.insert("ErrMsg".to_string(), Value::Null);
            row
        })
        .collect()
}

fn benchmark_schema_inference(c: &mut Criterion) {
    let mut group = c.benchmark_group("schema_inference");

    for &(rows, columns) in &[(100, 8), (10_000, 8), (10_000, 64)] {
        let level = create_level(rows, columns);
        group.bench_function(format!("{}x{}", rows, columns), |b| {
            b.iter(|| {
                infer_schema(
                    black_box(&level),
                    can_drill_down(black_box("transactions")),
                    true,
                )
            })
        });
    }

    group.finish();
}

fn benchmark_level_decode(c: &mut Criterion) {
    let body = serde_json::to_string(&json!({
        "function_name": "transactions",
        "data": create_level(5_000, 16),
        "total_count": 5_000
    }))
    .unwrap_or_default();

    c.bench_function("decode_level_5000", |b| {
        b.iter(|| {
            let level: cluster_console::api_client::LevelResponse =
                serde_json::from_str(black_box(&body)).unwrap_or_default();
            level.data.len()
        })
    });
}

criterion_group!(benches, benchmark_schema_inference, benchmark_level_decode);
criterion_main!(benches);
