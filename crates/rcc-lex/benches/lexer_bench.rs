use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rcc_lex::tokenize;
use rcc_util::FileId;

const SMALL_PROGRAM: &str = r#"
int fib(int n) {
    if (n < 2) {
        return n;
    }
    return fib(n - 1) + fib(n - 2);
}

int main() {
    int i;
    int total = 0;
    for (i = 0; i < 10; i++) {
        total = total + fib(i);
    }
    return total;
}
"#;

fn bench_lexer(c: &mut Criterion) {
    c.bench_function("lex_small_program", |b| {
        b.iter(|| tokenize(black_box(SMALL_PROGRAM), FileId(0)).unwrap())
    });

    let large: String = SMALL_PROGRAM.repeat(100);
    c.bench_function("lex_large_program", |b| {
        b.iter(|| tokenize(black_box(&large), FileId(0)).unwrap())
    });
}

criterion_group!(benches, bench_lexer);
criterion_main!(benches);
