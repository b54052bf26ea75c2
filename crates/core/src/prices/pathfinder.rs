//! Exchange-rate path search over a single day's rate table.

use std::collections::{HashMap, HashSet};

use log::{debug, trace};

use super::prices_model::RateTable;

const UNREACHABLE: usize = usize::MAX;

struct Distance<'a> {
    hops: usize,
    path: Vec<&'a str>,
}

/// Finds a chain of assets linking `start` to `target` through known rates.
///
/// The search walks greedily from `start`, always moving to the nearest
/// neighbor it just relaxed, and remembers every node with more than one
/// unvisited neighbor on a branch stack. When a walk dead-ends without having
/// reached `target`, it resumes from the most recent branch. Neighbors are
/// tried in the table's discovery order and a path is only replaced by a
/// strictly shorter one, so results are reproducible for a given table.
///
/// Returns the path including both ends, or an empty vector when the assets
/// are not connected.
pub fn find_path<'a>(table: &'a RateTable, start: &'a str, target: &'a str) -> Vec<String> {
    let mut unvisited: HashSet<&str> = table.nodes().collect();
    if !unvisited.contains(start) || !unvisited.contains(target) {
        trace!("{} to {} exchange rate is unavailable", target, start);
        return Vec::new();
    }

    let mut distances: HashMap<&str, Distance> = unvisited
        .iter()
        .map(|node| {
            let hops = if *node == start { 0 } else { UNREACHABLE };
            (*node, Distance { hops, path: vec![start] })
        })
        .collect();

    let mut branches: Vec<&str> = Vec::new();
    let mut current = start;
    let mut path_to_current: Vec<&str> = vec![start];
    loop {
        let neighbors: Vec<&str> = table
            .neighbors(current)
            .into_iter()
            .filter(|node| unvisited.contains(node))
            .collect();
        trace!("Checking unvisited neighbors of {}: {:?}", current, neighbors);
        if !branches.contains(&current) && neighbors.len() > 1 {
            trace!("New branch set at {}", current);
            branches.push(current);
        }

        let mut closest: Option<(&str, usize)> = None;
        for neighbor in neighbors {
            let Some(distance) = distances.get_mut(neighbor) else {
                continue;
            };
            let hops = path_to_current.len();
            if hops < distance.hops {
                distance.hops = hops;
                distance.path = path_to_current.iter().copied().chain([neighbor]).collect();
            }
            if closest.map_or(true, |(_, best)| distance.hops < best) {
                closest = Some((neighbor, distance.hops));
            }
        }
        unvisited.remove(current);

        let next = match closest {
            Some((node, hops)) if hops != UNREACHABLE => node,
            _ => {
                if let Some(found) = distances.get(target).filter(|d| d.hops != UNREACHABLE) {
                    path_to_current = found.path.clone();
                    break;
                }
                if unvisited.is_empty() {
                    debug!("No exchange-rate path exists between {} and {}", start, target);
                    return Vec::new();
                }
                match branches.pop() {
                    Some(branch) => {
                        trace!("Returning to previous branch at {}", branch);
                        branch
                    }
                    None => {
                        debug!("No exchange-rate path exists between {} and {}", start, target);
                        return Vec::new();
                    }
                }
            }
        };

        path_to_current = distances
            .get(next)
            .map(|d| d.path.clone())
            .unwrap_or_else(|| vec![next]);
        if next == target {
            break;
        }
        current = next;
    }

    debug!("Found a path from {} to {}: {}", start, target, path_to_current.join(" -> "));
    path_to_current.into_iter().map(str::to_string).collect()
}
