//! Per-directory reconciliation decisions
//!
//! [`plan_level`] looks at one directory of the source and the matching
//! directory of the replica and says what has to happen, in order:
//!
//! 1. copy files that are missing from the replica or strictly newer in the source
//! 2. create missing subdirectories and descend into every source subdirectory
//! 3. delete replica files with no source counterpart
//! 4. delete replica directories with no source counterpart
//!
//! Copy-down before delete-up means a rename (seen as a new name plus a missing
//! one) converges within a single pass. When a name is a file on one side and a
//! directory on the other, the stale replica entry is removed right before the
//! source entry takes its place.

use std::ffi::{OsStr, OsString};

use mirror_fs::{DirSnapshot, EntryKind};

/// One step of a directory-level plan. Names are relative to the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CopyFile(OsString),
    CreateDir(OsString),
    Descend(OsString),
    RemoveFile(OsString),
    RemoveDir(OsString),
    /// Source entry that is neither a file nor a directory
    Skip(OsString),
}

/// Decide what one directory level needs. Pure: no filesystem access.
pub fn plan_level(source: &DirSnapshot, replica: &DirSnapshot) -> Vec<Action> {
    let mut actions = Vec::new();

    for (name, entry) in source.iter().filter(|(_, e)| e.is_file()) {
        match replica.get(name) {
            None => actions.push(Action::CopyFile(name.into())),
            Some(existing) if existing.is_file() => {
                // Equal timestamps count as already in sync
                if entry.modified > existing.modified {
                    actions.push(Action::CopyFile(name.into()));
                }
            }
            Some(existing) => {
                actions.push(removal(name.into(), existing.kind));
                actions.push(Action::CopyFile(name.into()));
            }
        }
    }

    for (name, _) in source.iter().filter(|(_, e)| e.is_dir()) {
        match replica.get(name) {
            Some(existing) if existing.is_dir() => {}
            Some(existing) => {
                actions.push(removal(name.into(), existing.kind));
                actions.push(Action::CreateDir(name.into()));
            }
            None => actions.push(Action::CreateDir(name.into())),
        }
        actions.push(Action::Descend(name.into()));
    }

    for (name, entry) in source.iter() {
        if entry.kind == EntryKind::Other {
            actions.push(Action::Skip(name.into()));
        }
    }

    // Names the source still has were either kept or replaced above
    let in_source = |name: &OsStr| source.get(name).is_some_and(|e| e.kind != EntryKind::Other);

    for (name, _) in replica.iter().filter(|(_, e)| !e.is_dir()) {
        if !in_source(name) {
            actions.push(Action::RemoveFile(name.into()));
        }
    }

    for (name, _) in replica.iter().filter(|(_, e)| e.is_dir()) {
        if !in_source(name) {
            actions.push(Action::RemoveDir(name.into()));
        }
    }

    actions
}

fn removal(name: OsString, kind: EntryKind) -> Action {
    match kind {
        EntryKind::Dir => Action::RemoveDir(name),
        EntryKind::File | EntryKind::Other => Action::RemoveFile(name),
    }
}
