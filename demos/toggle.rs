use rtlsim::*;

fn main() {
    let mut g = CircuitGraph::new();
    let r = g.reg("toggle", Value::Zero).unwrap();
    let n = g.not1(r.bit(), "next").unwrap();
    g.connect(n, r.bit()).unwrap();
    let out = g.output1(r.bit(), "out").unwrap();

    print!("{}", g);

    let mut sim = Simulation::from_graph(&g).unwrap();
    for _ in 0..8 {
        let snapshot = sim.tick().unwrap();
        println!("cycle {}: out={}", snapshot.cycle(), out.value(snapshot));
    }
}
