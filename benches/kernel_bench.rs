use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mumps_core::runtime::{equals, idiv, Mval, Number, PoolOptions, StringPool};
use mumps_core::{CompileOptions, Compiler, Scanner};

fn lexer_benchmark(c: &mut Criterion) {
    let source = r#"SET ^X($$F(A,.B))=$P(Y,",",2)_"abc",(C,D)=7\2,$PIECE(Z,";",I,J)=1"#;

    c.bench_function("tokenize SET line", |b| {
        b.iter(|| {
            let mut scanner = Scanner::new(black_box(source));
            scanner.scan_tokens().unwrap()
        })
    });
}

fn compiler_benchmark(c: &mut Criterion) {
    let compiler = Compiler::new(CompileOptions::default());
    let source = r#"SET ^X($$F(A,.B))=$P(Y,",",2)_"abc",(C,D)=7\2,$PIECE(Z,";",I,J)=1"#;

    c.bench_function("compile SET line", |b| {
        b.iter(|| compiler.compile_line(black_box(source)).unwrap())
    });
}

fn kernel_benchmark(c: &mut Criterion) {
    let u = Number::parse(b"123456789.987654321").unwrap();
    let v = Number::parse(b"3.7").unwrap();
    c.bench_function("decimal integer division", |b| {
        b.iter(|| idiv(black_box(u), black_box(v)).unwrap())
    });

    let mut pool = StringPool::new(PoolOptions::default()).unwrap();
    let mut s = Mval::from_bytes(&mut pool, b"123456789").unwrap();
    let mut n = Mval::int(123_456_789);
    c.bench_function("equality string vs number", |b| {
        b.iter(|| equals(black_box(&mut s), black_box(&mut n), &mut pool).unwrap())
    });
}

criterion_group!(benches, lexer_benchmark, compiler_benchmark, kernel_benchmark);
criterion_main!(benches);
