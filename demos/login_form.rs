//! Login Form
//!
//! A data-carrying state: the session state holds the logged-in user name
//! while active, populated by the payload of the `LogIn` event.
//!
//! Run with: cargo run --example login_form

use statree::{Event, MachineBuilder, TransitionBuilder};

fn main() {
    println!("=== Login Form ===\n");

    let mut b = MachineBuilder::new("login");
    let idle = b.add_state(b.root(), "Idle").unwrap();
    let session = b.add_data_state::<String>(b.root(), "Session").unwrap();
    b.set_initial(b.root(), idle).unwrap();
    b.transition(
        TransitionBuilder::new()
            .from(idle)
            .on("LogIn")
            .to(session)
            .carries::<String>()
            .named("log-in"),
    )
    .unwrap();
    b.transition(
        TransitionBuilder::new()
            .from(session)
            .on("LogOut")
            .to(idle)
            .named("log-out"),
    )
    .unwrap();

    let mut machine = b.build().unwrap();
    machine.start().unwrap();

    println!("logging in as 'alice'");
    machine
        .process_event(Event::with_payload("LogIn", String::from("alice")))
        .unwrap();
    println!(
        "session user: {:?}",
        machine.active_data::<String>(session)
    );

    println!("logging out");
    machine.process_event(Event::new("LogOut")).unwrap();
    println!(
        "session user after logout: {:?}\n",
        machine.active_data::<String>(session)
    );

    println!("structure export:\n{}", machine.describe().to_json().unwrap());
}
