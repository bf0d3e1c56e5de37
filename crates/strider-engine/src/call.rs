//! Phase call resolution.
//!
//! Ordered phases (update and postcalc) resolve `run_first` dependencies by
//! an on-demand depth-first visit: before a module runs, every module
//! registered to run before it is forced to complete the same phase. No
//! schedule is precomputed, so dependency edges may change between ticks.

use strider_core::{ModuleError, Phase};

use crate::node::{Dispatch, Mark};

/// Complete `phase` for `node` unless it already has in this sweep.
///
/// Returns `Ok(())` both when the hook ran and when the call was deferred
/// because a dependency is still executing. Any failure is recorded in
/// the simulator's error log and reported as [`ModuleError::Aborted`].
pub(crate) fn call(node: &dyn Dispatch, phase: Phase) -> Result<(), ModuleError> {
    let header = node.header();
    let sim = &header.sim;
    if sim.has_error() {
        return Err(ModuleError::Aborted);
    }
    let Some(slot) = phase.lifecycle_slot() else {
        return Ok(());
    };
    let mark = &header.marks[slot];
    match mark.get() {
        Mark::Done => return Ok(()),
        // Reached from a hook while this module's own dependency walk is
        // further down the stack: the caller proceeds with current values.
        Mark::Resolving => return Ok(()),
        Mark::Running => {
            let err = ModuleError::CircularDependency {
                module: header.name(),
                phase,
            };
            return Err(sim.fail(header, phase, err));
        }
        Mark::Unvisited => {}
    }

    if phase.is_ordered() {
        mark.set(Mark::Resolving);
        header.resolve_depth.set(sim.hook_depth.get());
        for dep in header.run_first_live() {
            let dep_header = dep.dispatch().header();
            let dep_mark = &dep_header.marks[slot];
            match dep_mark.get() {
                Mark::Done => continue,
                Mark::Running => {
                    mark.set(Mark::Unvisited);
                    return Ok(());
                }
                Mark::Resolving => {
                    mark.set(Mark::Unvisited);
                    // No hook started since the dependency began resolving,
                    // so the walk itself closed a loop.
                    if dep_header.resolve_depth.get() == sim.hook_depth.get() {
                        let err = ModuleError::CircularDependency {
                            module: header.name(),
                            phase,
                        };
                        return Err(sim.fail(header, phase, err));
                    }
                    return Ok(());
                }
                Mark::Unvisited => {
                    if let Err(e) = call(dep.dispatch(), phase) {
                        mark.set(Mark::Unvisited);
                        return Err(e);
                    }
                    if dep_mark.get() != Mark::Done {
                        mark.set(Mark::Unvisited);
                        return Ok(());
                    }
                }
            }
        }
    }

    mark.set(Mark::Running);
    let result = if header.frozen.get() {
        Ok(())
    } else {
        sim.hook_depth.set(sim.hook_depth.get() + 1);
        let result = node.run_hook(phase);
        sim.hook_depth.set(sim.hook_depth.get() - 1);
        result
    };
    mark.set(Mark::Done);

    match result {
        Ok(()) => Ok(()),
        Err(ModuleError::Aborted) if sim.has_error() => Err(ModuleError::Aborted),
        Err(e) => Err(sim.fail(header, phase, e)),
    }
}
