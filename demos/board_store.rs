//! A project-board store: named wires, hydration from fetched payloads and
//! a persisted UI preference.

use serde_json::json;
use std::sync::Arc;
use wirestore::{
    create_persisted_wire, MemoryBackend, Runtime, Selector, Storage, StoreRegistry, Wire,
};

fn main() {
    let rt = Runtime::new();
    let storage = Storage::new(Arc::new(MemoryBackend::new()), "tracker");

    let teams: Wire<Vec<String>> = Wire::new(&rt, Vec::new());
    let tasks: Wire<Vec<String>> = Wire::new(&rt, Vec::new());
    let collapsed = create_persisted_wire(&rt, &storage, "collapsedLanes", Vec::<String>::new());

    let registry = StoreRegistry::builder()
        .register("teams", teams.clone())
        .register("tasks", tasks.clone())
        .register("collapsedLanes", collapsed.clone())
        .build();

    let visible = Selector::new(&rt, {
        let (tasks, collapsed) = (tasks.clone(), collapsed.clone());
        move |scope| {
            let hidden = scope.get(&collapsed);
            scope
                .get(&tasks)
                .into_iter()
                .filter(|t| !hidden.contains(t))
                .collect::<Vec<_>>()
        }
    });

    // One hydrate call per fetched data slice, as a render pass would issue.
    registry.hydrate("teams", json!(["core"]), false).unwrap();
    registry
        .hydrate("tasks", json!(["triage", "review", "ship"]), false)
        .unwrap();

    println!("teams:   {:?}", teams.get());
    println!("visible: {:?}", visible.get().unwrap());

    collapsed.set(vec!["review".to_string()]);
    println!("visible after collapsing `review`: {:?}", visible.get().unwrap());

    // A falsy payload is guarded: the wire keeps its value.
    registry.hydrate("tasks", json!(null), false).unwrap();
    println!("tasks after guarded hydrate: {:?}", tasks.get());

    println!(
        "persisted `collapsedLanes`: {:?}",
        storage.read("collapsedLanes").unwrap()
    );
}
