//! Traffic Light
//!
//! The smallest useful statechart: three states under the root, a final
//! state, and a listener printing what the engine does.
//!
//! Run with: cargo run --example traffic_light

use statree::builder::transition_to;
use statree::notify::{EntryCtx, ExitCtx, LifecycleCtx};
use statree::{Event, MachineBuilder, MachineListener};

struct Narrator;

impl MachineListener for Narrator {
    fn on_entry(&mut self, ctx: &mut EntryCtx) {
        println!("  -> entered {}", ctx.state.display());
    }

    fn on_exit(&mut self, ctx: &mut ExitCtx) {
        println!("  <- exited {}", ctx.state.display());
    }

    fn on_finished(&mut self, ctx: &mut LifecycleCtx) {
        println!("  == {} finished", ctx.machine);
    }
}

fn main() {
    println!("=== Traffic Light ===\n");

    let mut b = MachineBuilder::new("traffic");
    let green = b.add_state(b.root(), "Green").unwrap();
    let yellow = b.add_state(b.root(), "Yellow").unwrap();
    let red = b.add_final_state(b.root(), "Red").unwrap();
    b.set_initial(b.root(), green).unwrap();
    b.transition(transition_to(green, "Advance", yellow)).unwrap();
    b.transition(transition_to(yellow, "Advance", red)).unwrap();

    let mut machine = b.build().unwrap();
    machine.add_listener(Box::new(Narrator));

    machine.start().unwrap();
    println!("started; active leaf: Green\n");

    for step in 1..=2 {
        println!("processing Advance ({step})");
        machine.process_event(Event::new("Advance")).unwrap();
    }

    println!("\nfinished: {}", machine.is_finished());
    println!("journal entries: {}", machine.journal().len());
    let _ = red;
}
