use criterion::{black_box, criterion_group, criterion_main, Criterion};
use netweave::prelude::*;
use netweave::serializer::to_json;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// One MCU-like part with 40 supply balls plus 199 decoupling capacitors.
fn decoupled_board() -> Design {
    let mut design = Design::with_name("bench");
    let pins = (1..=40)
        .map(|i| {
            let label = if i % 2 == 0 { "VSS" } else { "VDD" };
            PinSpec::new(i.to_string(), label, PinFunction::PowerIn)
        })
        .collect();
    let soc = design.define_template("SOC", "Package_BGA:BGA-40", pins).unwrap();
    let cap = design
        .define_template(
            "C_Small",
            "Capacitor_SMD:C_0402_1005Metric",
            vec![
                PinSpec::new("1", "~", PinFunction::Passive),
                PinSpec::new("2", "~", PinFunction::Passive),
            ],
        )
        .unwrap();

    design.instantiate(soc, "U1", None).unwrap();
    design.declare_power_net("VDD").unwrap();
    design.declare_power_net("GND").unwrap();
    design.bind_label("VDD", "U1", "VDD").unwrap();
    design.bind_label("GND", "U1", "VSS").unwrap();

    for _ in 0..199 {
        let reference = design
            .instantiate_auto(cap, "C", Some("0.1uF".to_string()))
            .unwrap()
            .reference()
            .to_string();
        design.bind("VDD", &reference, "1").unwrap();
        design.bind("GND", &reference, "2").unwrap();
    }
    design
}

fn bench_build_in_code(c: &mut Criterion) {
    c.bench_function("build_200_parts", |b| {
        b.iter(|| {
            let closed = decoupled_board().close();
            let artifact = serialize(black_box(&closed), SerializePolicy::Strict).unwrap();
            to_json(&artifact).unwrap()
        });
    });
}

fn bench_build_file(c: &mut Criterion) {
    let options = BuildOptions::default();
    c.bench_function("build_file_sexp", |b| {
        b.iter(|| {
            NetweaveCore::build_file(
                black_box(&fixture_path("sensor_node.sexp")),
                black_box(&options),
            )
        });
    });
}

criterion_group!(benches, bench_build_in_code, bench_build_file);
criterion_main!(benches);
