use rtlsim::*;

// Three registers, two of them in loops through combinational logic.
fn run() -> Result<CircuitGraph, Error> {
    let mut g = CircuitGraph::new();
    let r1 = g.reg("R1", Value::One)?;
    let r2 = g.reg("R2", Value::One)?;
    let r3 = g.reg("R3", Value::One)?;
    let input = g.input("in", Value::One)?;
    let out = g.output("out")?;
    let a = g.and2(r1.bit(), input.bit(), "A")?;
    let b = g.or2(r2.bit(), a, "B")?;
    let c = g.and2(b, r3.bit(), "C")?;
    let d = g.not1(r3.bit(), "D")?;
    let e = g.not1(r3.bit(), "E")?;
    g.connect(c, r3.bit())?;
    g.connect(d, out.bit())?;
    g.connect(e, r2.bit())?;

    let schedule = std::sync::Arc::new(build_schedule(&g)?);
    for (depth, level) in schedule.levels().iter().enumerate() {
        let names: Vec<&str> = level.iter().map(|n| schedule.name(*n)).collect();
        println!("level {}: {:?}", depth, names);
    }

    let mut sim = Simulation::new(schedule);
    sim.set_input(input, Value::Zero);
    for _ in 0..4 {
        sim.tick()?;
        println!(
            "cycle {}: out={} R2={} R3={}",
            sim.cycle() - 1,
            sim.output(out),
            sim.value(r2),
            sim.value(r3)
        );
    }

    Ok(g)
}

fn main() {
    let g = run().unwrap();
    g.dump_dot("feedback.dot").unwrap();
}
