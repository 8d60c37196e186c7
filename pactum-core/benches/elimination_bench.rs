use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pactum_core::{MinilpOracle, Term, TermList, Var};

/// `x0 <= x1 <= ... <= xn` with both ends bounded
fn chain(length: usize) -> TermList {
    let mut terms = Vec::with_capacity(length + 2);
    for i in 0..length {
        let (a, b) = (format!("x{}", i), format!("x{}", i + 1));
        terms.push(Term::le([(a, 1.0), (b, -1.0)], 0.0).unwrap());
    }
    terms.push(Term::le([("x0", -1.0)], 0.0).unwrap());
    terms.push(Term::le([(format!("x{}", length), 1.0)], 100.0).unwrap());
    TermList::new(terms)
}

fn elimination_benchmarks(c: &mut Criterion) {
    let oracle = MinilpOracle::new();
    let mut group = c.benchmark_group("elimination");

    for length in [4usize, 8, 16] {
        let list = chain(length);
        let inner: Vec<Var> = (1..length).map(|i| Var::new(format!("x{}", i))).collect();

        group.bench_with_input(BenchmarkId::new("fourier_motzkin", length), &list, |b, list| {
            b.iter(|| black_box(list.eliminate_vars(inner.clone(), &oracle).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("simplify", length), &list, |b, list| {
            b.iter(|| black_box(list.simplify(None, &oracle).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, elimination_benchmarks);
criterion_main!(benches);
