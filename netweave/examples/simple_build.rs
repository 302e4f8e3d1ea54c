//! Simple build example: assemble a small design in code, check it, print the netlist.
//! Run with: cargo run --example simple_build [--sexp]

use netweave::prelude::*;
use netweave::serializer::{to_json, to_sexp};

fn main() -> Result<(), NetweaveError> {
    let as_sexp = std::env::args().any(|a| a == "--sexp");

    let mut design = Design::with_name("led_driver");
    let mcu = design.define_template(
        "ATtiny85",
        "Package_SO:SOIC-8_3.9x4.9mm_P1.27mm",
        vec![
            PinSpec::new("1", "RESET", PinFunction::Bidirectional),
            PinSpec::new("2", "PB3", PinFunction::Bidirectional),
            PinSpec::new("3", "PB4", PinFunction::Bidirectional),
            PinSpec::new("4", "GND", PinFunction::PowerIn),
            PinSpec::new("5", "PB0", PinFunction::Output),
            PinSpec::new("6", "PB1", PinFunction::NoConnect),
            PinSpec::new("7", "PB2", PinFunction::NoConnect),
            PinSpec::new("8", "VCC", PinFunction::PowerIn),
        ],
    )?;
    let r = design.define_template(
        "R",
        "Resistor_SMD:R_0603_1608Metric",
        vec![
            PinSpec::new("1", "~", PinFunction::Passive),
            PinSpec::new("2", "~", PinFunction::Passive),
        ],
    )?;
    let led = design.define_template(
        "LED",
        "LED_SMD:LED_0603_1608Metric",
        vec![
            PinSpec::new("1", "K", PinFunction::Passive),
            PinSpec::new("2", "A", PinFunction::Passive),
        ],
    )?;
    let src = design.define_template(
        "PWR",
        "Connector_PinHeader_2.54mm:PinHeader_1x02_P2.54mm_Vertical",
        vec![
            PinSpec::new("1", "VCC", PinFunction::PowerOut),
            PinSpec::new("2", "GND", PinFunction::PowerOut),
        ],
    )?;

    design.instantiate(src, "J1", None)?;
    design.instantiate(mcu, "U1", None)?;
    design.instantiate_auto(r, "R", Some("10k".to_string()))?;
    design.instantiate_auto(r, "R", Some("330".to_string()))?;
    design.instantiate(led, "D1", Some("red".to_string()))?;

    design.declare_power_net("VCC")?;
    design.declare_power_net("GND")?;
    design.bind("VCC", "J1", "1")?;
    design.bind_label("VCC", "U1", "VCC")?;
    design.bind("GND", "J1", "2")?;
    design.bind_label("GND", "U1", "GND")?;

    // Reset pull-up, and the two spare I/Os tied together as a loopback.
    design.bind("RESET", "U1", "1")?;
    design.bind("RESET", "R1", "1")?;
    design.bind("VCC", "R1", "2")?;
    design.connect(&PinRef::new("U1", "2"), &PinRef::new("U1", "3"))?;

    design.bind("LED_DRV", "U1", "5")?;
    design.bind("LED_DRV", "R2", "1")?;
    design.connect(&PinRef::new("R2", "2"), &PinRef::new("D1", "2"))?;
    design.bind("GND", "D1", "1")?;

    let closed = design.close();
    for d in closed.report().diagnostics() {
        eprintln!("{}[{}] {}", d.severity, d.rule, d.message);
    }

    let artifact = serialize(&closed, SerializePolicy::Default)?;
    if as_sexp {
        print!("{}", to_sexp(&artifact));
    } else {
        print!("{}", to_json(&artifact)?);
    }
    Ok(())
}
