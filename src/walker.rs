//! Cycle-safe traversal of a document's indirect object graph.
//!
//! Direct objects are owned by their parent, so the only nodes that can be
//! shared or form cycles are indirect objects. The walker keys its visited set
//! on [`ObjectId`] and keeps pending references on an explicit stack, so neither
//! cycles nor very deep reference chains are a problem.

use log::debug;
use lopdf::{Document, Object, ObjectId, Stream};
use std::collections::HashSet;

/// Hooks invoked by [`walk_document`] and [`walk_from`].
///
/// All dispatch over object variants happens inside the walker; a visitor only
/// sees the nodes it asked for.
pub trait ObjectVisitor {
    /// Called once for every resolved indirect object, before its contents are scanned.
    fn visit_object(&mut self, _id: ObjectId, _object: &Object) {}

    /// Called for every stream inside the indirect object `owner`, after the
    /// stream's dictionary has been scanned for references.
    fn visit_stream(&mut self, _owner: ObjectId, _stream: &mut Stream) {}
}

/// Counts gathered while walking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub objects_visited: usize,
    /// References whose target is missing from the cross-reference table.
    pub dangling_references: usize,
}

/// Visit every object in the document's cross-reference table exactly once.
pub fn walk_document<V: ObjectVisitor + ?Sized>(doc: &mut Document, visitor: &mut V) -> WalkSummary {
    let roots: Vec<ObjectId> = doc.objects.keys().copied().collect();
    walk_from(doc, roots, visitor)
}

/// Visit every object reachable from `roots` exactly once.
pub fn walk_from<V, I>(doc: &mut Document, roots: I, visitor: &mut V) -> WalkSummary
where
    V: ObjectVisitor + ?Sized,
    I: IntoIterator<Item = ObjectId>,
{
    let mut visited: HashSet<ObjectId> = HashSet::new();
    let mut pending: Vec<ObjectId> = Vec::new();
    let mut summary = WalkSummary::default();

    for root in roots {
        pending.push(root);

        while let Some(id) = pending.pop() {
            if !visited.insert(id) {
                continue;
            }

            let Some(object) = doc.objects.get_mut(&id) else {
                debug!("Skipping dangling reference {} {} R", id.0, id.1);
                summary.dangling_references += 1;
                continue;
            };
            if let Object::Null = object {
                continue;
            }

            summary.objects_visited += 1;
            visitor.visit_object(id, object);
            scan(id, vec![object], visitor, &mut pending);
        }
    }

    debug!(
        "Walked {} objects ({} dangling references)",
        summary.objects_visited, summary.dangling_references
    );
    summary
}

/// Scan a tree of direct values, queueing references and reporting streams.
fn scan<'a, V: ObjectVisitor + ?Sized>(
    owner: ObjectId,
    mut stack: Vec<&'a mut Object>,
    visitor: &mut V,
    pending: &mut Vec<ObjectId>,
) {
    while let Some(object) = stack.pop() {
        match object {
            Object::Reference(target) => pending.push(*target),
            Object::Array(items) => stack.extend(items.iter_mut()),
            Object::Dictionary(dict) => stack.extend(dict.iter_mut().map(|(_, value)| value)),
            Object::Stream(stream) => {
                // A stream dictionary can reference other objects, e.g. /Length or /SMask.
                let entries = stream.dict.iter_mut().map(|(_, value)| value).collect();
                scan(owner, entries, visitor, pending);
                visitor.visit_stream(owner, stream);
            }
            _ => {}
        }
    }
}
