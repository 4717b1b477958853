//! Wires and selectors working together in a small counter.

use wirestore::{Runtime, Selector, Wire};

fn main() {
    let rt = Runtime::new();

    let count = Wire::new(&rt, 0);
    let step = Wire::new(&rt, 1);

    let next = Selector::new(&rt, {
        let (count, step) = (count.clone(), step.clone());
        move |scope| scope.get(&count) + scope.get(&step)
    });

    count
        .subscribe(|v| println!("count is now {v}"))
        .detach();

    println!("count = {}", count.get());
    println!("next  = {}", next.get().unwrap());

    count.set(5);
    println!("next  = {}", next.get().unwrap());

    step.set(10);
    println!("next  = {}", next.get().unwrap());

    // Equal writes still notify: no value deduplication.
    count.set(5);
    count.set(5);
}
