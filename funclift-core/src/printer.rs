//! Deterministic Java rendering of a synthesized unit

use crate::synth::SynthesizedUnit;

/// Default indentation width, in spaces
pub const DEFAULT_INDENT: usize = 4;

/// Render `unit` as a compilation unit
pub fn print(unit: &SynthesizedUnit, indent: usize) -> String {
    let one = " ".repeat(indent);
    let two = " ".repeat(indent * 2);
    let mut output = String::new();

    if let Some(package) = &unit.header.package {
        output.push_str(&format!("package {};\n\n", package));
    }
    if !unit.header.imports.is_empty() {
        for import in &unit.header.imports {
            output.push_str(import);
            output.push('\n');
        }
        output.push('\n');
    }

    let parameters = unit
        .parameters
        .iter()
        .map(|parameter| format!("{} {}", parameter.ty, parameter.name))
        .collect::<Vec<_>>()
        .join(", ");

    output.push_str(&format!("{}\n", unit.annotation));
    output.push_str(&format!(
        "public class {} implements {} {{\n",
        unit.name, unit.interface
    ));
    output.push_str(&format!(
        "{}public {} {}({}) {{\n",
        one, unit.return_type, unit.method, parameters
    ));

    // Continuation lines keep their indentation relative to the first line
    let mut lines = unit.body.lines();
    let first = lines.next().unwrap_or_default();
    output.push_str(&format!("{}return {}", two, first));
    for line in lines {
        output.push('\n');
        if !line.is_empty() {
            output.push_str(&two);
            output.push_str(line);
        }
    }
    output.push_str(";\n");

    output.push_str(&format!("{}}}\n", one));
    output.push_str("}\n");
    output
}
