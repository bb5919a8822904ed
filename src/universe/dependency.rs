//! Dependency resolver (C3).
//!
//! Depth-first closure computation per spec §4.3: "perform a depth-first
//! traversal from `code`; on cycle detection, fail with
//! `CyclicUniverse(path)`". Each attribute's dependencies appear in the
//! output before the attribute itself.

use super::{Universe, UniverseError};

/// Computes the transitive closure of `code`'s dependencies, topologically
/// ordered (dependencies first), with `code` itself appended last.
pub fn closure(universe: &Universe, code: &str) -> Result<Vec<String>, UniverseError> {
    let mut visited = std::collections::HashSet::new();
    let mut on_stack = Vec::new();
    let mut order = Vec::new();
    visit(universe, code, &mut visited, &mut on_stack, &mut order)?;
    Ok(order)
}

fn visit(
    universe: &Universe,
    code: &str,
    visited: &mut std::collections::HashSet<String>,
    on_stack: &mut Vec<String>,
    order: &mut Vec<String>,
) -> Result<(), UniverseError> {
    if visited.contains(code) {
        return Ok(());
    }
    if let Some(pos) = on_stack.iter().position(|c| c == code) {
        let mut path: Vec<String> = on_stack[pos..].to_vec();
        path.push(code.to_string());
        return Err(UniverseError::CyclicUniverse(path));
    }

    let attr = universe
        .attributes_raw()
        .get(code)
        .ok_or_else(|| UniverseError::UnknownAttribute(code.to_string()))?;

    on_stack.push(code.to_string());
    for dep in attr.direct_dependencies() {
        if !universe.attributes_raw().contains_key(&dep) {
            return Err(UniverseError::UnknownAttribute(dep));
        }
        visit(universe, &dep, visited, on_stack, order)?;
    }
    on_stack.pop();

    visited.insert(code.to_string());
    order.push(code.to_string());
    Ok(())
}
