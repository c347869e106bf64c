//! Matching benchmarks using Criterion.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure:
//! - First-order matching over targets of growing size
//! - Occurrence selection when many nodes are equal
//! - The higher-order fallback through a canonical structure

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use occmatch::{
    parser::TermReader, symbol::SymbolStore, term::TermId, term::TermStore, Ctx, Engine, Env,
    EvarMap, MatchConfig, OccSpec,
};

struct Stores {
    terms: TermStore,
    symbols: SymbolStore,
    env: Env,
    config: MatchConfig,
    evars: EvarMap,
    reader: TermReader,
}

impl Stores {
    fn new() -> Self {
        Self {
            terms: TermStore::new(),
            symbols: SymbolStore::new(),
            env: Env::new(),
            config: MatchConfig::default(),
            evars: EvarMap::new(),
            reader: TermReader::new(),
        }
    }

    fn read(&mut self, src: &str) -> TermId {
        self.reader
            .read(src, &self.terms, &self.symbols, &mut self.evars)
            .expect("benchmark term parses")
    }
}

/// Right comb `(plus x0 (plus x1 (.. (plus xn z))))` with `leaf(i)` leaves.
fn comb(n: usize, leaf: impl Fn(usize) -> String) -> String {
    let mut s = "z".to_string();
    for i in (0..n).rev() {
        s = format!("(plus {} {})", leaf(i), s);
    }
    s
}

/// Benchmark matching a pattern whose only occurrence is the innermost node.
fn bench_first_order_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_order_depth");

    for n in [8, 32, 128] {
        group.bench_with_input(BenchmarkId::new("n", n), &n, |b, &n| {
            let mut stores = Stores::new();
            let target = stores.read(&comb(n, |i| format!("(s{} a)", i)));
            let scope = stores.evars.checkpoint();
            let pattern = stores.read("(plus _ z)");

            b.iter(|| {
                let mut evars = stores.evars.clone();
                let cx = Ctx::new(&stores.terms, &stores.env, &stores.config);
                black_box(Engine::new(cx).fill_any(
                    &mut evars,
                    scope,
                    pattern,
                    &OccSpec::all(),
                    target,
                ))
            });
        });
    }

    group.finish();
}

/// Benchmark abstracting every copy of a repeated subterm.
fn bench_equal_occurrences(c: &mut Criterion) {
    let mut group = c.benchmark_group("equal_occurrences");

    for n in [8, 32, 128] {
        group.bench_with_input(BenchmarkId::new("n", n), &n, |b, &n| {
            let mut stores = Stores::new();
            let target = stores.read(&comb(n, |_| "(f a b)".to_string()));
            let scope = stores.evars.checkpoint();
            let pattern = stores.read("(f a _)");

            b.iter(|| {
                let mut evars = stores.evars.clone();
                let cx = Ctx::new(&stores.terms, &stores.env, &stores.config);
                black_box(Engine::new(cx).fill_any(
                    &mut evars,
                    scope,
                    pattern,
                    &OccSpec::all(),
                    target,
                ))
            });
        });
    }

    group.finish();
}

/// Benchmark the higher-order pass resolving a projection through a
/// canonical instance.
fn bench_canonical_fallback(c: &mut Criterion) {
    let mut stores = Stores::new();
    for (name, ty) in [
        ("nat", "Type"),
        ("monoid", "(forall (T Type) Type)"),
        ("natMonoid", "(monoid nat)"),
        ("op", "(forall (T Type) (m (monoid T)) (x T) (y T) T)"),
        ("natadd", "(forall (x nat) (y nat) nat)"),
        ("plus", "(forall (x nat) (y nat) nat)"),
        ("a", "nat"),
        ("b", "nat"),
        ("z", "nat"),
    ] {
        let ty = stores.read(ty);
        let c = stores.symbols.intern(name);
        stores.env.declare(c, ty);
    }
    let op = stores.symbols.intern("op");
    let natadd = stores.symbols.intern("natadd");
    let instance = stores.read("natMonoid");
    stores.env.register_projection(op, 2);
    stores.env.register_canonical(op, natadd, instance, 0);

    let target = stores.read(&comb(16, |_| "a".to_string()).replace("z)", "(natadd a b))"));
    let scope = stores.evars.checkpoint();
    let pattern = stores.read("(op nat natMonoid a _)");

    c.bench_function("canonical_fallback", |b| {
        b.iter(|| {
            let mut evars = stores.evars.clone();
            let cx = Ctx::new(&stores.terms, &stores.env, &stores.config);
            black_box(Engine::new(cx).fill_any(
                &mut evars,
                scope,
                pattern,
                &OccSpec::all(),
                target,
            ))
        });
    });
}

criterion_group!(
    benches,
    bench_first_order_depth,
    bench_equal_occurrences,
    bench_canonical_fallback
);
criterion_main!(benches);
