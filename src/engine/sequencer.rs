//! Entry/exit sequencing.
//!
//! Given a firing transition with a resolved target, the sequencer
//! computes the transition domain (least common ancestor, with the
//! self-transition and parallel-block adjustments), exits the domain's
//! active descendants deepest-first, dispatches the firing notification,
//! and enters the path toward the target ancestor-first — descending into
//! designated initial children and fanning out across parallel regions.
//!
//! All active-flag and data-slot mutation in the crate happens here, under
//! control of the event processing core.

use crate::core::{
    ArgValue, ChildMode, DataKind, Event, StateId, StateTree, Transition,
};
use crate::engine::error::DataBindingError;
use crate::engine::log::Logger;
use crate::notify::{EventSink, StateRef};
use crate::notify::ListenerSet;

/// Borrowed view of the machine parts the sequencer is allowed to touch.
pub(crate) struct Sequencer<'a> {
    pub tree: &'a mut StateTree,
    pub listeners: &'a mut ListenerSet,
    pub logger: &'a Logger,
    pub sink: &'a mut EventSink,
}

impl Sequencer<'_> {
    fn state_ref(&self, id: StateId) -> StateRef {
        StateRef {
            id,
            name: self.tree.name(id).map(str::to_owned),
        }
    }

    /// A `stay` firing: notification only, no state change.
    pub fn apply_stay(&mut self, transition: &Transition, event: &Event, argument: Option<&ArgValue>) {
        let source = self.state_ref(transition.source());
        self.logger.log(|| {
            format!(
                "{}: '{}' stays on {}",
                transition.label(),
                source.display(),
                event.kind()
            )
        });
        self.listeners
            .notify_transition(&source, None, event, argument, self.sink);
    }

    /// Apply a firing with a resolved target: ordered exits, the firing
    /// notification, then ordered entries with data binding.
    pub fn apply_transition(
        &mut self,
        transition: &Transition,
        target: StateId,
        event: &Event,
        argument: Option<&ArgValue>,
    ) -> Result<(), DataBindingError> {
        let source = transition.source();
        let domain = self.domain(source, target);

        for id in self.tree.active_descendants_postorder(domain) {
            let state = self.state_ref(id);
            self.listeners
                .notify_exit(&state, Some(event), argument, self.sink);
            self.tree.deactivate(id);
        }

        let source_ref = self.state_ref(source);
        let target_ref = self.state_ref(target);
        self.logger.log(|| {
            format!(
                "{}: '{}' -> '{}' on {}",
                transition.label(),
                source_ref.display(),
                target_ref.display(),
                event.kind()
            )
        });
        let transition_argument = self.listeners.notify_transition(
            &source_ref,
            Some(&target_ref),
            event,
            argument,
            self.sink,
        );

        let entries = plan_entries(self.tree, domain, target);
        self.enter(
            &entries,
            Some((transition, target)),
            Some(event),
            argument,
            transition_argument.as_ref(),
        )
    }

    /// The implicit start entry: activate the root and descend defaults,
    /// or the seeded path when a test harness starts from a known state.
    pub fn apply_start(&mut self, seed: Option<StateId>) -> Result<(), DataBindingError> {
        let root = self.tree.root();
        self.tree.activate(root);
        let entries = plan_entries(self.tree, root, seed.unwrap_or(root));
        self.enter(&entries, None, None, None, None)
    }

    fn enter(
        &mut self,
        entries: &[StateId],
        firing: Option<(&Transition, StateId)>,
        event: Option<&Event>,
        argument: Option<&ArgValue>,
        transition_argument: Option<&ArgValue>,
    ) -> Result<(), DataBindingError> {
        for &id in entries {
            if let Some(declared) = self.tree.data_kind(id).copied() {
                // Validated before the node's entry notification; a failure
                // here aborts sequencing with prior exits left applied.
                let payload = self.bindable_payload(id, declared, firing, event)?;
                self.tree.activate(id);
                self.tree.bind_data(id, payload);
            } else {
                self.tree.activate(id);
            }
            let state = self.state_ref(id);
            self.listeners
                .notify_entry(&state, event, argument, transition_argument, self.sink);
        }
        Ok(())
    }

    /// The payload a data-carrying node must receive, or why it cannot.
    fn bindable_payload(
        &self,
        id: StateId,
        declared: DataKind,
        firing: Option<(&Transition, StateId)>,
        event: Option<&Event>,
    ) -> Result<ArgValue, DataBindingError> {
        let state = self.tree.display_name(id);
        let expected = declared.type_name();

        let implicit = match firing {
            None => true,
            Some((transition, target)) => target != id || transition.data_kind() != Some(&declared),
        };
        if implicit {
            return Err(DataBindingError::ImplicitEntry { state, expected });
        }

        let Some(event) = event else {
            return Err(DataBindingError::ImplicitEntry { state, expected });
        };
        match (event.payload_value(), event.payload_kind()) {
            (Some(value), Some(got)) if got.type_id == declared.type_id => Ok(value.clone()),
            (Some(_), Some(got)) => Err(DataBindingError::PayloadMismatch {
                state,
                expected,
                got: got.type_name(),
            }),
            _ => Err(DataBindingError::MissingPayload { state, expected }),
        }
    }

    /// Transition domain: the node whose active subtree turns over.
    ///
    /// LCA of source and target; a self-transition uses the source's
    /// parent so the source exits and re-enters; a parallel domain lifts
    /// to its parent so regions always enter and exit as a block.
    fn domain(&self, source: StateId, target: StateId) -> StateId {
        let root = self.tree.root();
        let mut domain = if source == target {
            self.tree.parent(source).unwrap_or(root)
        } else {
            self.tree.lca(source, target)
        };
        while self.tree.mode(domain) == ChildMode::Parallel {
            match self.tree.parent(domain) {
                Some(parent) => domain = parent,
                None => break,
            }
        }
        domain
    }
}

/// Ordered entry list from `domain` (exclusive) to `target` and beyond:
/// explicit path first, then designated-initial chains, with parallel
/// nodes fanning out into every region.
fn plan_entries(tree: &StateTree, domain: StateId, target: StateId) -> Vec<StateId> {
    let path = tree.path_from(domain, target);
    let mut out = Vec::new();
    match path.first() {
        Some(&head) => descend_toward(tree, head, &path, &mut out),
        None => descend_defaults(tree, domain, &mut out),
    }
    out
}

fn descend_toward(tree: &StateTree, node: StateId, path: &[StateId], out: &mut Vec<StateId>) {
    out.push(node);
    match tree.mode(node) {
        ChildMode::Parallel => {
            for &child in tree.children(node) {
                if path.contains(&child) {
                    descend_toward(tree, child, path, out);
                } else {
                    enter_defaults(tree, child, out);
                }
            }
        }
        ChildMode::Sequential => {
            match tree.children(node).iter().find(|c| path.contains(*c)) {
                Some(&next) => descend_toward(tree, next, path, out),
                None => descend_defaults(tree, node, out),
            }
        }
    }
}

/// Default entries below `node` (which is already entered).
fn descend_defaults(tree: &StateTree, node: StateId, out: &mut Vec<StateId>) {
    match tree.mode(node) {
        ChildMode::Parallel => {
            for &child in tree.children(node) {
                enter_defaults(tree, child, out);
            }
        }
        ChildMode::Sequential => {
            if let Some(initial) = tree.initial(node) {
                enter_defaults(tree, initial, out);
            }
        }
    }
}

/// Enter `node` itself, then defaults below it.
fn enter_defaults(tree: &StateTree, node: StateId, out: &mut Vec<StateId>) {
    out.push(node);
    descend_defaults(tree, node, out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DirectionResolver, EventKind, KindOrSubkind, NodeKind};
    use crate::engine::policy::PendingEventPolicy;
    use crate::notify::{EntryCtx, ExitCtx, MachineListener, TransitionCtx};
    use std::sync::{Arc, Mutex};

    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl MachineListener for Recorder {
        fn on_entry(&mut self, ctx: &mut EntryCtx) {
            self.0.lock().unwrap().push(format!("enter {}", ctx.state.display()));
        }

        fn on_exit(&mut self, ctx: &mut ExitCtx) {
            self.0.lock().unwrap().push(format!("exit {}", ctx.state.display()));
        }

        fn on_transition(&mut self, ctx: &mut TransitionCtx) {
            let target = ctx
                .target
                .as_ref()
                .map_or("(stay)".to_owned(), StateRef::display);
            self.0
                .lock()
                .unwrap()
                .push(format!("fire {} -> {}", ctx.source.display(), target));
        }
    }

    struct Harness {
        tree: StateTree,
        listeners: ListenerSet,
        logger: Logger,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Harness {
        fn new(tree: StateTree) -> Self {
            let log = Arc::new(Mutex::new(Vec::new()));
            let mut listeners = ListenerSet::new();
            listeners.add(Box::new(Recorder(Arc::clone(&log))));
            Self {
                tree,
                listeners,
                logger: Logger::off(),
                log,
            }
        }

        fn run<R>(&mut self, op: impl FnOnce(&mut Sequencer) -> R) -> R {
            let mut sink = EventSink::new(PendingEventPolicy::Fail);
            let mut seq = Sequencer {
                tree: &mut self.tree,
                listeners: &mut self.listeners,
                logger: &self.logger,
                sink: &mut sink,
            };
            op(&mut seq)
        }

        fn notifications(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    fn transition_to(source: StateId, kind: &'static str, target: StateId) -> Transition {
        Transition {
            source,
            matcher: Box::new(KindOrSubkind(EventKind::from_static(kind))),
            guard: None,
            direction: DirectionResolver::To(target),
            data_kind: None,
            name: None,
        }
    }

    fn add(tree: &mut StateTree, parent: StateId, name: &str) -> StateId {
        tree.add_child(parent, Some(name.into()), ChildMode::Sequential, NodeKind::Plain)
    }

    /// root { p { a1, a2 }, q { b1 } }, initials chained, p/a1 active.
    fn cross_level_tree() -> (StateTree, StateId, StateId, StateId, StateId) {
        let mut tree = StateTree::new("m");
        let root = tree.root();
        let p = add(&mut tree, root, "p");
        let a1 = add(&mut tree, p, "a1");
        let a2 = add(&mut tree, p, "a2");
        let q = add(&mut tree, root, "q");
        let b1 = add(&mut tree, q, "b1");
        tree.set_initial(root, p);
        tree.set_initial(p, a1);
        tree.set_initial(q, b1);
        for id in [root, p, a1] {
            tree.activate(id);
        }
        let _ = a2;
        (tree, p, a1, q, b1)
    }

    #[test]
    fn cross_level_exit_then_entry_order() {
        let (tree, _, a1, q, b1) = cross_level_tree();
        let mut h = Harness::new(tree);

        let t = transition_to(a1, "Jump", b1);
        h.run(|seq| seq.apply_transition(&t, b1, &Event::new("Jump"), None))
            .unwrap();

        assert_eq!(
            h.notifications(),
            vec!["exit a1", "exit p", "fire a1 -> b1", "enter q", "enter b1"]
        );
        assert_eq!(h.tree.active_leaves(), vec![b1]);
        assert!(h.tree.is_active(q));
        assert!(!h.tree.is_active(a1));
    }

    #[test]
    fn composite_target_descends_initial_chain() {
        let (tree, _, a1, q, b1) = cross_level_tree();
        let mut h = Harness::new(tree);

        let t = transition_to(a1, "Jump", q);
        h.run(|seq| seq.apply_transition(&t, q, &Event::new("Jump"), None))
            .unwrap();

        assert_eq!(h.tree.active_leaves(), vec![b1]);
        assert!(h.notifications().contains(&"enter b1".to_owned()));
    }

    #[test]
    fn sibling_transition_keeps_common_ancestor_active() {
        let (tree, p, a1, _, _) = cross_level_tree();
        let a2 = tree.children(p)[1];
        let mut h = Harness::new(tree);

        let t = transition_to(a1, "Step", a2);
        h.run(|seq| seq.apply_transition(&t, a2, &Event::new("Step"), None))
            .unwrap();

        // p never exits: the domain is p itself.
        assert_eq!(
            h.notifications(),
            vec!["exit a1", "fire a1 -> a2", "enter a2"]
        );
        assert!(h.tree.is_active(p));
    }

    #[test]
    fn self_transition_exits_and_reenters() {
        let (tree, _, a1, _, _) = cross_level_tree();
        let mut h = Harness::new(tree);

        let t = transition_to(a1, "Again", a1);
        h.run(|seq| seq.apply_transition(&t, a1, &Event::new("Again"), None))
            .unwrap();

        assert_eq!(
            h.notifications(),
            vec!["exit a1", "fire a1 -> a1", "enter a1"]
        );
        assert!(h.tree.is_active(a1));
    }

    #[test]
    fn stay_fires_notification_without_state_change() {
        let (tree, _, a1, _, _) = cross_level_tree();
        let before = tree.active_states();
        let mut h = Harness::new(tree);

        let t = Transition {
            direction: DirectionResolver::Stay,
            ..transition_to(a1, "Noop", a1)
        };
        h.run(|seq| seq.apply_stay(&t, &Event::new("Noop"), None));

        assert_eq!(h.notifications(), vec!["fire a1 -> (stay)"]);
        assert_eq!(h.tree.active_states(), before);
    }

    /// root { x, par [ r1 { r1a, r1b }, r2 { r2a } ], out }
    fn parallel_tree() -> (StateTree, Vec<StateId>) {
        let mut tree = StateTree::new("m");
        let root = tree.root();
        let x = add(&mut tree, root, "x");
        let par = tree.add_child(root, Some("par".into()), ChildMode::Parallel, NodeKind::Plain);
        let r1 = add(&mut tree, par, "r1");
        let r1a = add(&mut tree, r1, "r1a");
        let r1b = add(&mut tree, r1, "r1b");
        let r2 = add(&mut tree, par, "r2");
        let r2a = add(&mut tree, r2, "r2a");
        let out = add(&mut tree, root, "out");
        tree.set_initial(root, x);
        tree.set_initial(r1, r1a);
        tree.set_initial(r2, r2a);
        (tree, vec![root, x, par, r1, r1a, r1b, r2, r2a, out])
    }

    #[test]
    fn entering_parallel_activates_every_region() {
        let (mut tree, ids) = parallel_tree();
        let (root, x, par, r1, r1a, _, r2, r2a, _) = (
            ids[0], ids[1], ids[2], ids[3], ids[4], ids[5], ids[6], ids[7], ids[8],
        );
        for id in [root, x] {
            tree.activate(id);
        }
        let mut h = Harness::new(tree);

        let t = transition_to(x, "Go", par);
        h.run(|seq| seq.apply_transition(&t, par, &Event::new("Go"), None))
            .unwrap();

        assert_eq!(
            h.notifications(),
            vec![
                "exit x",
                "fire x -> par",
                "enter par",
                "enter r1",
                "enter r1a",
                "enter r2",
                "enter r2a",
            ]
        );
        assert_eq!(h.tree.active_leaves(), vec![r1a, r2a]);
        assert!(h.tree.is_active(r1) && h.tree.is_active(r2));
    }

    #[test]
    fn escaping_parallel_exits_every_region_deepest_first() {
        let (mut tree, ids) = parallel_tree();
        let (root, par, r1, r1a, r2, r2a, out) =
            (ids[0], ids[2], ids[3], ids[4], ids[6], ids[7], ids[8]);
        for id in [root, par, r1, r1a, r2, r2a] {
            tree.activate(id);
        }
        let mut h = Harness::new(tree);

        let t = transition_to(par, "Escape", out);
        h.run(|seq| seq.apply_transition(&t, out, &Event::new("Escape"), None))
            .unwrap();

        assert_eq!(
            h.notifications(),
            vec![
                "exit r1a",
                "exit r1",
                "exit r2a",
                "exit r2",
                "exit par",
                "fire par -> out",
                "enter out",
            ]
        );
        assert_eq!(h.tree.active_leaves(), vec![out]);
    }

    #[test]
    fn region_local_transition_leaves_siblings_untouched() {
        let (mut tree, ids) = parallel_tree();
        let (root, par, r1, r1a, r1b, r2, r2a) =
            (ids[0], ids[2], ids[3], ids[4], ids[5], ids[6], ids[7]);
        for id in [root, par, r1, r1a, r2, r2a] {
            tree.activate(id);
        }
        let mut h = Harness::new(tree);

        let t = transition_to(r1a, "Step", r1b);
        h.run(|seq| seq.apply_transition(&t, r1b, &Event::new("Step"), None))
            .unwrap();

        assert_eq!(
            h.notifications(),
            vec!["exit r1a", "fire r1a -> r1b", "enter r1b"]
        );
        assert!(h.tree.is_active(r2a));
        assert_eq!(h.tree.active_leaves(), vec![r1b, r2a]);
    }

    #[test]
    fn start_descends_defaults() {
        let (mut tree, p, a1, _, _) = cross_level_tree();
        tree.deactivate_all();
        let mut h = Harness::new(tree);

        h.run(|seq| seq.apply_start(None)).unwrap();

        assert_eq!(h.notifications(), vec!["enter p", "enter a1"]);
        assert!(h.tree.is_active(p));
        assert_eq!(h.tree.active_leaves(), vec![a1]);
    }

    #[test]
    fn seeded_start_enters_the_requested_state() {
        let (mut tree, _, _, q, b1) = cross_level_tree();
        tree.deactivate_all();
        let mut h = Harness::new(tree);

        h.run(|seq| seq.apply_start(Some(q))).unwrap();

        assert_eq!(h.notifications(), vec!["enter q", "enter b1"]);
        assert_eq!(h.tree.active_leaves(), vec![b1]);
    }

    fn data_tree() -> (StateTree, StateId, StateId) {
        let mut tree = StateTree::new("m");
        let root = tree.root();
        let idle = add(&mut tree, root, "idle");
        let form = add(&mut tree, root, "form");
        tree.set_initial(root, idle);
        tree.set_data_kind(form, DataKind::of::<String>());
        for id in [root, idle] {
            tree.activate(id);
        }
        (tree, idle, form)
    }

    #[test]
    fn data_state_binds_the_event_payload() {
        let (tree, idle, form) = data_tree();
        let mut h = Harness::new(tree);

        let t = Transition {
            data_kind: Some(DataKind::of::<String>()),
            ..transition_to(idle, "Submit", form)
        };
        let event = Event::with_payload("Submit", String::from("alice"));
        h.run(|seq| seq.apply_transition(&t, form, &event, None))
            .unwrap();

        let bound = h.tree.data(form).and_then(|v| v.downcast_ref::<String>());
        assert_eq!(bound.map(String::as_str), Some("alice"));
    }

    #[test]
    fn data_state_rejects_missing_payload() {
        let (tree, idle, form) = data_tree();
        let mut h = Harness::new(tree);

        let t = Transition {
            data_kind: Some(DataKind::of::<String>()),
            ..transition_to(idle, "Submit", form)
        };
        let err = h
            .run(|seq| seq.apply_transition(&t, form, &Event::new("Submit"), None))
            .unwrap_err();

        assert!(matches!(err, DataBindingError::MissingPayload { .. }));
        // Exits already ran; the failing node was never notified as entered.
        assert_eq!(h.notifications(), vec!["exit idle", "fire idle -> form"]);
        assert!(!h.tree.is_active(form));
    }

    #[test]
    fn data_state_rejects_mismatched_payload() {
        let (tree, idle, form) = data_tree();
        let mut h = Harness::new(tree);

        let t = Transition {
            data_kind: Some(DataKind::of::<String>()),
            ..transition_to(idle, "Submit", form)
        };
        let event = Event::with_payload("Submit", 42u32);
        let err = h
            .run(|seq| seq.apply_transition(&t, form, &event, None))
            .unwrap_err();

        assert!(matches!(err, DataBindingError::PayloadMismatch { .. }));
    }

    #[test]
    fn implicit_entry_of_data_state_fails() {
        let (tree, idle, form) = data_tree();
        let mut h = Harness::new(tree);

        // A transition that does not declare the data kind cannot feed the
        // data state, even with a compatible payload on the event.
        let t = transition_to(idle, "Submit", form);
        let event = Event::with_payload("Submit", String::from("alice"));
        let err = h
            .run(|seq| seq.apply_transition(&t, form, &event, None))
            .unwrap_err();

        assert!(matches!(err, DataBindingError::ImplicitEntry { .. }));
    }

    #[test]
    fn start_through_a_data_state_fails() {
        let (mut tree, _, form) = data_tree();
        tree.deactivate_all();
        tree.set_initial(tree.root(), form);
        let mut h = Harness::new(tree);

        let err = h.run(|seq| seq.apply_start(None)).unwrap_err();
        assert!(matches!(err, DataBindingError::ImplicitEntry { .. }));
    }

    #[test]
    fn transition_argument_reaches_entry_notifications() {
        struct Tagger(Arc<Mutex<Option<u32>>>);
        impl MachineListener for Tagger {
            fn on_transition(&mut self, ctx: &mut TransitionCtx) {
                ctx.set_transition_argument(Arc::new(99u32));
            }

            fn on_entry(&mut self, ctx: &mut EntryCtx) {
                *self.0.lock().unwrap() = ctx
                    .transition_argument
                    .and_then(|a| a.downcast_ref::<u32>().copied());
            }
        }

        let (tree, _, a1, _, b1) = cross_level_tree();
        let seen = Arc::new(Mutex::new(None));
        let mut listeners = ListenerSet::new();
        listeners.add(Box::new(Tagger(Arc::clone(&seen))));
        let logger = Logger::off();
        let mut sink = EventSink::new(PendingEventPolicy::Fail);
        let mut tree = tree;
        let mut seq = Sequencer {
            tree: &mut tree,
            listeners: &mut listeners,
            logger: &logger,
            sink: &mut sink,
        };

        let t = transition_to(a1, "Jump", b1);
        seq.apply_transition(&t, b1, &Event::new("Jump"), None).unwrap();

        assert_eq!(*seen.lock().unwrap(), Some(99));
    }
}
