use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use fluentdb::render::{self, InsertRow};
use fluentdb::{Condition, Direction, Order, QueryState, TableRef, Value};

/// A SELECT with `n` bound WHERE predicates plus GROUP/HAVING/ORDER/LIMIT.
fn build_state(n: usize) -> QueryState {
    let mut state = QueryState::new();
    state.tables.push(TableRef::root("orders", Some("o".to_string())));
    for i in 0..n {
        state
            .wheres
            .push(Condition::compare(format!("o.col{i}"), "=", i as i64));
    }
    state.groups.push(Order::new("o.user_id", None));
    state.havings.push(Condition::compare("SUM(o.total)", ">", 100));
    state.orders.push(Order::new("o.id", Some(Direction::Desc)));
    state.limit = Some(20);
    state
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/select");

    for n in [1, 5, 10, 50, 100] {
        let state = build_state(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &state, |b, state| {
            b.iter(|| black_box(render::select(state).unwrap()));
        });
    }

    group.finish();
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/insert");
    let fields = ["name", "age", "email"];
    let mut state = QueryState::new();
    state.tables.push(TableRef::root("user", None));

    for rows in [1, 10, 100, 1000] {
        let data: Vec<InsertRow> = (0..rows)
            .map(|i| {
                InsertRow::from([
                    ("name".to_string(), Value::from(format!("user{i}"))),
                    ("age".to_string(), Value::from(i as i64)),
                ])
            })
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(rows), &data, |b, data| {
            b.iter(|| black_box(render::insert(&state, &fields, data).unwrap()));
        });
    }

    group.finish();
}

fn bench_debug_sql(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/debug_sql");

    for n in [1, 10, 100] {
        let stmt = render::select(&build_state(n)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &stmt, |b, stmt| {
            b.iter(|| black_box(stmt.to_debug_sql()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_select, bench_insert, bench_debug_sql);
criterion_main!(benches);
