use beanforge_bytecode::{modifiers, ClassDef, ClassFile, ClassFileWriter, ExpressionDef, FieldDef, MethodDef, TypeDef};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn wide_class(methods: usize) -> ClassDef {
    let mut builder = ClassDef::builder("bench.$Wide$Definition");
    for i in 0..methods {
        builder.add_field(
            FieldDef::builder(format!("field{}", i), TypeDef::string())
                .add_modifiers(modifiers::PRIVATE)
                .initializer(ExpressionDef::string(format!("value{}", i)))
                .build(),
        );
        builder.add_method(
            MethodDef::builder(format!("method{}", i))
                .add_modifiers(modifiers::PUBLIC)
                .add_parameter("value", TypeDef::object())
                .returns(TypeDef::object())
                .build_with(|params| params[0].clone().cast(TypeDef::string()).returning()),
        );
    }
    builder.build()
}

fn bench_encode(c: &mut Criterion) {
    let class = wide_class(200);
    c.bench_function("encode_200_methods", |b| {
        b.iter(|| ClassFileWriter::write(black_box(&class)))
    });
}

fn bench_decode(c: &mut Criterion) {
    let bytes = ClassFileWriter::write(&wide_class(200)).unwrap_or_default();
    c.bench_function("decode_200_methods", |b| b.iter(|| ClassFile::decode(black_box(&bytes))));
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
