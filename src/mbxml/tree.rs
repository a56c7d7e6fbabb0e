//! Conversion between an [`Element`] tree and the flat pool + record form.
//!
//! Encoding walks the tree in pre-order, so a record's index is its discovery
//! number. Decoding is two-pass: every record is materialized as a childless
//! element first, then children are moved into their parents by index.

use log::{debug, trace, warn};

use crate::mbxml::format::strings::StringPool;
use crate::mbxml::types::error::{MbxmlError, Result};
use crate::mbxml::types::models::{Element, NodeRecord, RootPolicy};

/// String pool and record table built from one tree.
///
/// Owned by a single encode call and dropped when it returns.
#[derive(Debug, Default)]
pub struct EncodedTree {
    pub pool: StringPool,
    pub records: Vec<NodeRecord>,
}

impl EncodedTree {
    /// Record `index` as written to the table.
    pub fn record(&self, index: u32) -> Option<&NodeRecord> {
        self.records.get(index as usize)
    }

    /// Interns the strings of `element` and appends its childless record.
    fn push_record(&mut self, element: &Element, parent: Option<u32>) -> u32 {
        let pool = &mut self.pool;
        let tag = pool.intern(&element.tag);
        let attributes = element
            .attributes
            .iter()
            .map(|(name, value)| (pool.intern(name), pool.intern(value)))
            .collect();
        let text = element.text.as_deref().map(|t| pool.intern(t));

        let index = self.records.len() as u32;
        self.records.push(NodeRecord {
            tag,
            text,
            parent,
            attributes,
            children: Vec::new(),
        });
        index
    }
}

/// Flattens `root` into a fresh pool and record table in pre-order.
pub fn flatten(root: &Element) -> EncodedTree {
    let mut encoded = EncodedTree::default();

    // Children are pushed in reverse so they pop in document order, and a
    // whole subtree is numbered before its next sibling.
    let mut pending: Vec<(&Element, Option<u32>)> = vec![(root, None)];
    while let Some((element, parent)) = pending.pop() {
        let index = encoded.push_record(element, parent);
        if let Some(parent) = parent {
            encoded.records[parent as usize].children.push(index);
        }
        pending.extend(element.children.iter().rev().map(|child| (child, Some(index))));
    }

    debug!(
        "Flattened tree: {} records, {} unique strings",
        encoded.records.len(),
        encoded.pool.len()
    );
    encoded
}

/// Rebuilds the element tree described by `records`.
///
/// # Errors
/// - `IndexOutOfRange` for a string, child or parent index that addresses nothing
/// - `BrokenTree` when a record is claimed by two parents, its parent field
///   disagrees with the record that lists it as a child, or it cannot be
///   reached from a parentless record (detached, or part of a cycle)
/// - `NoRootNode` when no record is parentless
/// - `MultipleRoots` when several are and `policy` is [`RootPolicy::Unique`]
pub fn assemble(
    pool: &StringPool,
    records: &[NodeRecord],
    policy: RootPolicy,
) -> Result<Element> {
    // Pass 1: materialize every node without children.
    let mut slots = records
        .iter()
        .map(|record| materialize(pool, record).map(Some))
        .collect::<Result<Vec<Option<Element>>>>()?;

    validate_links(records)?;
    let root = find_root(records, policy)?;
    ensure_reachable(records)?;

    // Pass 2: move children into their parents, deepest first.
    let root_element = take_slot(&mut slots, root)?;
    let mut stack: Vec<(Element, usize, usize)> = vec![(root_element, root, 0)];
    loop {
        let Some((_, index, next_child)) = stack.last_mut() else {
            break;
        };
        let children = &records[*index].children;
        if *next_child < children.len() {
            let child = children[*next_child] as usize;
            *next_child += 1;
            let element = take_slot(&mut slots, child)?;
            stack.push((element, child, 0));
            continue;
        }

        let Some((done, _, _)) = stack.pop() else {
            break;
        };
        match stack.last_mut() {
            Some((parent, _, _)) => parent.children.push(done),
            None => return Ok(done),
        }
    }

    Err(MbxmlError::NoRootNode)
}

fn materialize(pool: &StringPool, record: &NodeRecord) -> Result<Element> {
    let tag = pool.resolve(record.tag, "tag")?.to_string();
    let text = match record.text {
        Some(id) => Some(pool.resolve(id, "text")?.to_string()),
        None => None,
    };
    let attributes = record
        .attributes
        .iter()
        .map(|&(name, value)| {
            Ok((
                pool.resolve(name, "attribute name")?.to_string(),
                pool.resolve(value, "attribute value")?.to_string(),
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Element {
        tag,
        text,
        attributes,
        children: Vec::with_capacity(record.children.len()),
    })
}

/// Checks child and parent indices before any element is moved.
fn validate_links(records: &[NodeRecord]) -> Result<()> {
    let len = records.len();
    let mut claimed_by: Vec<Option<usize>> = vec![None; len];

    for (index, record) in records.iter().enumerate() {
        if let Some(parent) = record.parent {
            if parent as usize >= len {
                return Err(MbxmlError::IndexOutOfRange {
                    kind: "parent",
                    index: parent as i64,
                    len,
                });
            }
        }

        for &child in &record.children {
            let child = child as usize;
            if child >= len {
                return Err(MbxmlError::IndexOutOfRange {
                    kind: "child",
                    index: child as i64,
                    len,
                });
            }
            if let Some(other) = claimed_by[child] {
                return Err(MbxmlError::BrokenTree(format!(
                    "record {} is a child of both record {} and record {}",
                    child, other, index
                )));
            }
            if records[child].parent != Some(index as u32) {
                return Err(MbxmlError::BrokenTree(format!(
                    "record {} is listed as a child of record {} but declares parent {:?}",
                    child, index, records[child].parent
                )));
            }
            claimed_by[child] = Some(index);
        }
    }

    trace!("Validated child links of {} records", len);
    Ok(())
}

/// Every record must descend from some parentless record. With link
/// validation done, anything left over is detached or sits on a cycle.
fn ensure_reachable(records: &[NodeRecord]) -> Result<()> {
    let mut reached = vec![false; records.len()];
    let mut pending: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.parent.is_none())
        .map(|(index, _)| index)
        .collect();

    while let Some(index) = pending.pop() {
        if std::mem::replace(&mut reached[index], true) {
            return Err(MbxmlError::BrokenTree(format!(
                "record {} is reached more than once",
                index
            )));
        }
        pending.extend(records[index].children.iter().map(|&child| child as usize));
    }

    match reached.iter().position(|&r| !r) {
        Some(index) => Err(MbxmlError::BrokenTree(format!(
            "record {} is not reachable from a root (detached or part of a cycle)",
            index
        ))),
        None => Ok(()),
    }
}

fn find_root(records: &[NodeRecord], policy: RootPolicy) -> Result<usize> {
    let mut roots = records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.parent.is_none())
        .map(|(index, _)| index);

    let first = roots.next().ok_or(MbxmlError::NoRootNode)?;
    if let Some(second) = roots.next() {
        match policy {
            RootPolicy::Unique => return Err(MbxmlError::MultipleRoots { first, second }),
            RootPolicy::First => warn!(
                "Multiple parentless records (first {}, next {}), using the first",
                first, second
            ),
        }
    }
    Ok(first)
}

fn take_slot(slots: &mut [Option<Element>], index: usize) -> Result<Element> {
    let len = slots.len();
    slots
        .get_mut(index)
        .ok_or(MbxmlError::IndexOutOfRange {
            kind: "child",
            index: index as i64,
            len,
        })?
        .take()
        .ok_or_else(|| {
            MbxmlError::BrokenTree(format!("record {} is reached more than once", index))
        })
}
