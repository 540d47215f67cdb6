use rtlsim::*;

// Writes a pattern into a 3 cycle latency sram, then streams it back out.
fn main() {
    let latency = 3;
    let size = 8;
    let pattern = [1, 0, 1, 1, 0, 0, 1, 0];

    let mut g = CircuitGraph::new();
    let data = g.input("data", Value::Unknown).unwrap();
    let mem = g.sram("mem", SramConfig::unknown(size, latency)).unwrap();
    g.connect(data.bit(), mem.bit()).unwrap();
    let out = g.output1(mem.bit(), "out").unwrap();

    let mut sim = Simulation::from_graph(&g).unwrap();
    for (addr, bit) in pattern.iter().enumerate() {
        sim.set_input(data, (*bit == 1).into());
        sim.set_write_addr(mem, Some(addr));
        sim.tick().unwrap();
    }
    sim.set_write_addr(mem, None);
    println!("memory: {:?}", sim.memory(mem));

    let mut read = String::new();
    for cycle in 0..size + latency {
        sim.set_read_addr(mem, if cycle < size { Some(cycle) } else { None });
        sim.tick().unwrap();
        read.push_str(&sim.output(out).to_string());
    }
    println!("read back: {}", read);

    sim.set_read_addr(mem, Some(size));
    match sim.tick() {
        Ok(_) => unreachable!(),
        Err(e) => println!("{}", e),
    }
}
