//! Media Player
//!
//! Parallel regions: audio and subtitle settings evolve independently
//! while playback runs, and one cross-level transition tears the whole
//! parallel block down.
//!
//! Run with: cargo run --example media_player

use statree::builder::transition_to;
use statree::{Event, Logger, MachineBuilder};

fn main() {
    println!("=== Media Player ===\n");

    let mut b = MachineBuilder::new("player");
    let stopped = b.add_state(b.root(), "Stopped").unwrap();
    let playing = b.add_parallel_state(b.root(), "Playing").unwrap();

    let audio = b.add_state(playing, "Audio").unwrap();
    let loud = b.add_state(audio, "Loud").unwrap();
    let muted = b.add_state(audio, "Muted").unwrap();
    b.set_initial(audio, loud).unwrap();

    let subtitles = b.add_state(playing, "Subtitles").unwrap();
    let hidden = b.add_state(subtitles, "Hidden").unwrap();
    let shown = b.add_state(subtitles, "Shown").unwrap();
    b.set_initial(subtitles, hidden).unwrap();

    b.set_initial(b.root(), stopped).unwrap();
    b.transition(transition_to(stopped, "Media.Play", playing)).unwrap();
    b.transition(transition_to(loud, "Media.Mute", muted)).unwrap();
    b.transition(transition_to(muted, "Media.Mute", loud)).unwrap();
    b.transition(transition_to(hidden, "Media.Subtitles", shown)).unwrap();
    b.transition(transition_to(playing, "Media.Stop", stopped)).unwrap();
    b.with_logger(Logger::sink(|line| println!("  [engine] {line}")));

    let mut machine = b.build().unwrap();
    machine.start().unwrap();

    let show = |machine: &statree::StateMachine| {
        let names: Vec<String> = machine
            .active_leaves()
            .into_iter()
            .map(|id| machine.tree().display_name(id))
            .collect();
        println!("active leaves: {}\n", names.join(", "));
    };

    show(&machine);

    for kind in ["Media.Play", "Media.Mute", "Media.Subtitles", "Media.Stop"] {
        println!("processing {kind}");
        machine.process_event(Event::new(kind)).unwrap();
        show(&machine);
    }
}
