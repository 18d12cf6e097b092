use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use litorm::{
    Clause, ClauseGroup, ColumnDef, CompositeClause, FieldValue, Model, QueryPart, Registry,
    SqlType, StatementBuilder, TableDef,
};

struct Wide {
    values: Vec<i64>,
}

impl Model for Wide {
    fn field(&self, name: &str) -> FieldValue<'_> {
        name.strip_prefix("col")
            .and_then(|i| i.parse::<usize>().ok())
            .and_then(|i| self.values.get(i))
            .map_or(FieldValue::Missing, |v| FieldValue::value(*v))
    }
}

/// Registry with one table of `n` integer columns; `col0` is the primary key.
fn wide_registry(n: usize) -> Registry {
    let mut table = TableDef::new("t");
    for i in 0..n {
        let mut column = ColumnDef::new(format!("col{i}"), SqlType::Integer);
        if i == 0 {
            column = column.primary_key();
        }
        table = table.column(column);
    }
    let mut registry = Registry::new();
    registry
        .register::<Wide>(table)
        .expect("benchmark table is valid");
    registry
}

/// `col0 = ? AND col1 = ? ...`
fn build_where_part(n: usize) -> QueryPart {
    let mut group = ClauseGroup::and();
    for i in 0..n {
        group.push(Clause::eq(format!("col{i}"), i as i64));
    }
    group.render()
}

fn bench_group_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/group_render");

    for n in [1, 5, 10, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| black_box(build_where_part(n)));
        });
    }

    group.finish();
}

fn bench_push_bind_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/push_bind_list");

    for n in [5, 20, 100, 500] {
        let values: Vec<i64> = (0..n).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, values| {
            b.iter(|| {
                let mut part = QueryPart::new("SELECT * FROM t WHERE id IN ");
                part.push_bind_list(values.iter().copied());
                black_box(part);
            });
        });
    }

    group.finish();
}

fn bench_nested_composite(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/nested_composite");

    for depth in [1, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| {
                let mut acc = ClauseGroup::and().add(Clause::eq("col0", 0));
                for i in 0..depth {
                    let right = ClauseGroup::or()
                        .add(Clause::gt("col1", i as i64))
                        .add(Clause::is_null("col1"));
                    acc = ClauseGroup::and().add(CompositeClause::or(acc, right));
                }
                black_box(acc.render());
            });
        });
    }

    group.finish();
}

fn bench_update_instance(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/update_instance");

    for n in [2, 10, 50] {
        let registry = wide_registry(n);
        let model = Wide {
            values: (0..n as i64).collect(),
        };
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let stmt = registry
                    .update_instance(&model)
                    .build()
                    .expect("update builds");
                black_box(stmt);
            });
        });
    }

    group.finish();
}

fn bench_select_value_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/select_filter");

    for n in [1, 10, 50] {
        let registry = wide_registry(n);
        let filter: Vec<(String, i64)> = (0..n).map(|i| (format!("col{i}"), i as i64)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &filter, |b, filter| {
            b.iter(|| {
                let stmt = registry
                    .select::<Wide>()
                    .filter(filter.clone())
                    .limit(10)
                    .build()
                    .expect("select builds");
                black_box(stmt);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_group_render,
    bench_push_bind_list,
    bench_nested_composite,
    bench_update_instance,
    bench_select_value_map
);
criterion_main!(benches);
