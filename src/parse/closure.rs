// src/parse/closure.rs
//! Transitive dependency closure over routines and classes of one file.
//!
//! Routines reach routines through calls and classes through references;
//! classes reach their methods and their user-defined base. The closure is
//! a layered worklist with a visited set, bounded by `MAX_ITERATIONS`.

use super::types::{ClassDef, Routine};
use crate::error::{Result, UnicityError};
use std::collections::{BTreeMap, BTreeSet};

pub const MAX_ITERATIONS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Node {
    Routine(String),
    Class(String),
}

/// Dependencies reachable from one starting set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Closure {
    pub routines: BTreeSet<String>,
    pub classes: BTreeSet<String>,
}

/// Fills `dependencies` and `class_dependencies` of every routine.
///
/// # Errors
/// Returns `ClosureDepth` if some closure has not converged after
/// `MAX_ITERATIONS` layers.
pub fn resolve_all(
    routines: &mut BTreeMap<String, Routine>,
    classes: &BTreeMap<String, ClassDef>,
) -> Result<()> {
    let mut computed = Vec::with_capacity(routines.len());
    for (name, routine) in routines.iter() {
        let closure = compute(
            name,
            &routine.local_callees,
            &routine.classes,
            routines,
            classes,
        )?;
        computed.push((name.clone(), closure));
    }
    for (name, closure) in computed {
        if let Some(r) = routines.get_mut(&name) {
            r.dependencies = closure.routines;
            r.class_dependencies = closure.classes;
        }
    }
    Ok(())
}

/// Closure of the given direct routine and class references. `origin` is
/// excluded from the result and named in errors.
///
/// # Errors
/// Returns `ClosureDepth` when the iteration guard fires.
pub fn compute(
    origin: &str,
    direct_routines: &BTreeSet<String>,
    direct_classes: &BTreeSet<String>,
    routines: &BTreeMap<String, Routine>,
    classes: &BTreeMap<String, ClassDef>,
) -> Result<Closure> {
    let mut visited: BTreeSet<Node> = BTreeSet::new();
    let mut frontier: Vec<Node> = direct_routines
        .iter()
        .filter(|r| routines.contains_key(*r))
        .map(|r| Node::Routine(r.clone()))
        .chain(
            direct_classes
                .iter()
                .filter(|c| classes.contains_key(*c))
                .map(|c| Node::Class(c.clone())),
        )
        .collect();
    visited.extend(frontier.iter().cloned());

    let mut iterations = 0;
    while !frontier.is_empty() {
        iterations += 1;
        if iterations > MAX_ITERATIONS {
            return Err(UnicityError::ClosureDepth(origin.to_string()));
        }
        let mut next = Vec::new();
        for node in &frontier {
            for neighbour in neighbours(node, routines, classes) {
                if visited.insert(neighbour.clone()) {
                    next.push(neighbour);
                }
            }
        }
        frontier = next;
    }

    let mut closure = Closure::default();
    for node in visited {
        match node {
            Node::Routine(r) if r != origin => {
                closure.routines.insert(r);
            }
            Node::Class(c) if c != origin => {
                closure.classes.insert(c);
            }
            _ => {}
        }
    }
    Ok(closure)
}

fn neighbours(
    node: &Node,
    routines: &BTreeMap<String, Routine>,
    classes: &BTreeMap<String, ClassDef>,
) -> Vec<Node> {
    match node {
        Node::Routine(name) => routines.get(name).map_or_else(Vec::new, |r| {
            r.local_callees
                .iter()
                .filter(|c| routines.contains_key(*c))
                .map(|c| Node::Routine(c.clone()))
                .chain(
                    r.classes
                        .iter()
                        .filter(|c| classes.contains_key(*c))
                        .map(|c| Node::Class(c.clone())),
                )
                .collect()
        }),
        Node::Class(name) => classes.get(name).map_or_else(Vec::new, |c| {
            let base = c
                .base
                .name()
                .filter(|b| classes.contains_key(*b))
                .map(|b| Node::Class(b.to_string()));
            c.methods
                .iter()
                .map(|m| Node::Routine(m.clone()))
                .chain(base)
                .collect()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::types::ClassBase;

    fn routine(name: &str, calls: &[&str], classes: &[&str]) -> Routine {
        Routine {
            name: name.to_string(),
            first_line: 0,
            last_line: 0,
            docstring: String::new(),
            span: 0..0,
            keywords: Vec::new(),
            callees: BTreeSet::new(),
            local_callees: calls.iter().map(|s| (*s).to_string()).collect(),
            classes: classes.iter().map(|s| (*s).to_string()).collect(),
            imports: Vec::new(),
            dependencies: BTreeSet::new(),
            class_dependencies: BTreeSet::new(),
        }
    }

    fn class(name: &str, base: ClassBase, methods: &[&str]) -> ClassDef {
        ClassDef {
            name: name.to_string(),
            base,
            first_line: 0,
            last_line: 0,
            docstring: String::new(),
            methods: methods.iter().map(|s| (*s).to_string()).collect(),
            span: 0..0,
            keywords: Vec::new(),
        }
    }

    fn table(list: Vec<Routine>) -> BTreeMap<String, Routine> {
        list.into_iter().map(|r| (r.name.clone(), r)).collect()
    }

    #[test]
    fn chains_through_calls_and_class_methods() {
        let mut routines = table(vec![
            routine("main", &["helper"], &[]),
            routine("helper", &[], &["Shape"]),
            routine("Shape.area", &["square"], &[]),
            routine("square", &[], &[]),
            routine("unused", &[], &[]),
        ]);
        let classes: BTreeMap<_, _> = [
            ("Base".to_string(), class("Base", ClassBase::Classic, &[])),
            (
                "Shape".to_string(),
                class("Shape", ClassBase::Named("Base".into()), &["Shape.area"]),
            ),
        ]
        .into_iter()
        .collect();

        resolve_all(&mut routines, &classes).unwrap();
        let main = &routines["main"];
        let deps: Vec<_> = main.dependencies.iter().map(String::as_str).collect();
        assert_eq!(deps, vec!["Shape.area", "helper", "square"]);
        let cls: Vec<_> = main.class_dependencies.iter().map(String::as_str).collect();
        assert_eq!(cls, vec!["Base", "Shape"]);
        assert!(routines["unused"].dependencies.is_empty());
    }

    #[test]
    fn recursion_terminates_and_excludes_self() {
        let mut routines = table(vec![
            routine("a", &["b"], &[]),
            routine("b", &["a"], &[]),
        ]);
        resolve_all(&mut routines, &BTreeMap::new()).unwrap();
        assert_eq!(routines["a"].dependencies.len(), 1);
        assert!(routines["a"].dependencies.contains("b"));
    }

    #[test]
    fn long_chain_trips_the_guard() {
        let names: Vec<String> = (0..=MAX_ITERATIONS + 1).map(|i| format!("f{i}")).collect();
        let list = names
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let next = names.get(i + 1).map(String::as_str);
                routine(n, next.as_slice(), &[])
            })
            .collect();
        let mut routines = table(list);
        let err = resolve_all(&mut routines, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, UnicityError::ClosureDepth(_)));
    }
}
