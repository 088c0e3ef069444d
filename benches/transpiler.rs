mod common;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use pygo::transpiler::Transpiler;
use pygo::{lexer, parser};

fn bench_transpiler(c: &mut Criterion) {
    let source = common::load_source(common::WORKLOAD);
    let program = common::load_program(common::WORKLOAD);

    c.bench_function("transpiler_codegen_only", |b| {
        let transpiler = Transpiler;
        b.iter(|| {
            let output = transpiler
                .transpile(black_box(&program))
                .expect("transpile");
            black_box(output);
        })
    });

    c.bench_function("transpiler_frontend_and_codegen", |b| {
        let transpiler = Transpiler;
        b.iter(|| {
            let tokens = lexer::tokenize(black_box(&source)).expect("tokenize");
            let program = parser::parse_tokens(tokens).expect("parse");
            let output = transpiler.transpile(&program).expect("transpile");
            black_box(output);
        })
    });
}

criterion_group!(benches, bench_transpiler);
criterion_main!(benches);
