//! Prefix tree of coding paths.
//!
//! Every field contributes its path; intermediate segments become keyed
//! containers and the last segment holds the value. The tree rejects
//! layouts where a value would also have to be a container.

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::{FieldDescriptor, FieldId, Requirement, SchemaError, StructSchema, trace};

/// A keyed container: the root of a schema or of one sequence element, or
/// an intermediate node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTree {
    /// Merge of the requirements of every field below this container.
    pub requirement: Requirement,
    /// Children in first-insertion order.
    pub children: IndexMap<String, PathNode>,
}

/// A child of a [`PathTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathNode {
    /// A nested keyed container.
    Node(PathTree),
    /// A single value.
    Leaf(FieldId),
    /// A sequence of keyed element containers shared by one or more fields.
    SequenceLeaf(SequenceLeaf),
}

/// Fields sharing one sequence path, each reading one value per element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceLeaf {
    /// Fields in declaration order.
    pub fields: Vec<FieldId>,
    /// Merge of the fields' requirements; governs the sequence container.
    pub requirement: Requirement,
    /// Layout of one element container.
    pub element: PathTree,
}

/// A failed insertion, before field names are attached.
struct Conflict {
    existing: FieldId,
    path: Vec<String>,
    in_element: bool,
}

struct Insertion<'a> {
    field: FieldId,
    path: &'a [String],
    requirement: Requirement,
    element: Option<(&'a [String], Requirement)>,
}

impl Default for PathTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTree {
    /// An empty container. `AllowAll` is the identity of requirement merge.
    pub fn new() -> Self {
        Self {
            requirement: Requirement::AllowAll,
            children: IndexMap::new(),
        }
    }

    /// Builds the tree of every field accepted by `include`, in declaration
    /// order.
    pub fn build(
        schema: &StructSchema,
        include: impl Fn(&FieldDescriptor) -> bool,
    ) -> Result<Self, SchemaError> {
        let mut tree = PathTree::new();
        for (id, field) in schema.iter().filter(|(_, f)| include(f)) {
            let path = field.resolved_path(schema.key_case);
            let element = field
                .sequence
                .as_ref()
                .map(|spec| (spec.path.as_slice(), spec.policy().effective_requirement()));
            let insertion = Insertion {
                field: id,
                path: &path,
                requirement: field.policy().effective_requirement(),
                element,
            };
            trace!(
                "inserting {}.{} at {:?} ({})",
                schema.type_name,
                field.name,
                path,
                insertion.requirement
            );
            tree.insert(&insertion).map_err(|conflict| {
                let first = schema.get(conflict.existing).name.clone();
                let second = field.name.clone();
                let type_name = schema.type_name.clone();
                let path = conflict.path.join(".");
                if conflict.in_element {
                    SchemaError::SequencePathConflict {
                        type_name,
                        first,
                        second,
                        path,
                    }
                } else {
                    SchemaError::PathCollision {
                        type_name,
                        first,
                        second,
                        path,
                    }
                }
            })?;
        }
        Ok(tree)
    }

    fn insert(&mut self, insertion: &Insertion<'_>) -> Result<(), Conflict> {
        let Some((last, parents)) = insertion.path.split_last() else {
            return Ok(());
        };
        let requirement = insertion.requirement;

        let mut tree = self;
        tree.requirement = tree.requirement | requirement;
        for (depth, segment) in parents.iter().enumerate() {
            let child = tree
                .children
                .entry(segment.clone())
                .or_insert_with(|| PathNode::Node(PathTree::new()));
            match child {
                PathNode::Node(sub) => {
                    sub.requirement = sub.requirement | requirement;
                    tree = sub;
                }
                other => {
                    return Err(Conflict {
                        existing: other.first_field(),
                        path: insertion.path[..=depth].to_vec(),
                        in_element: false,
                    });
                }
            }
        }

        match tree.children.entry(last.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(PathNode::new_leaf(insertion)?);
                Ok(())
            }
            Entry::Occupied(mut slot) => match (slot.get_mut(), insertion.element) {
                (PathNode::SequenceLeaf(leaf), Some((element_path, element_requirement))) => {
                    trace!("sharing sequence at {:?}", insertion.path);
                    leaf.element
                        .insert_element(insertion.field, element_path, element_requirement)?;
                    leaf.fields.push(insertion.field);
                    leaf.requirement = leaf.requirement | requirement;
                    Ok(())
                }
                (existing, _) => Err(Conflict {
                    existing: existing.first_field(),
                    path: insertion.path.to_vec(),
                    in_element: false,
                }),
            },
        }
    }

    fn insert_element(
        &mut self,
        field: FieldId,
        path: &[String],
        requirement: Requirement,
    ) -> Result<(), Conflict> {
        self.insert(&Insertion {
            field,
            path,
            requirement,
            element: None,
        })
        .map_err(|conflict| Conflict {
            in_element: true,
            ..conflict
        })
    }

    /// Whether the container must be present and well-formed.
    pub fn is_required(&self) -> bool {
        self.requirement.is_required()
    }

    /// The node at `path`, relative to this container.
    pub fn get(&self, path: &[String]) -> Option<&PathNode> {
        let (first, rest) = path.split_first()?;
        let node = self.children.get(first)?;
        if rest.is_empty() {
            return Some(node);
        }
        match node {
            PathNode::Node(sub) => sub.get(rest),
            _ => None,
        }
    }

    /// Every field below this container, depth first.
    pub fn fields(&self) -> Vec<FieldId> {
        let mut out = Vec::new();
        let mut stack: Vec<&PathNode> = self.children.values().rev().collect();
        while let Some(node) = stack.pop() {
            match node {
                PathNode::Node(sub) => stack.extend(sub.children.values().rev()),
                PathNode::Leaf(id) => out.push(*id),
                PathNode::SequenceLeaf(leaf) => out.extend(&leaf.fields),
            }
        }
        out
    }
}

impl PathNode {
    fn new_leaf(insertion: &Insertion<'_>) -> Result<Self, Conflict> {
        let Some((element_path, element_requirement)) = insertion.element else {
            return Ok(PathNode::Leaf(insertion.field));
        };
        let mut element = PathTree::new();
        element.insert_element(insertion.field, element_path, element_requirement)?;
        Ok(PathNode::SequenceLeaf(SequenceLeaf {
            fields: vec![insertion.field],
            requirement: Requirement::AllowAll | insertion.requirement,
            element,
        }))
    }

    /// The earliest-declared field at or below this node.
    pub fn first_field(&self) -> FieldId {
        match self {
            PathNode::Leaf(id) => *id,
            PathNode::SequenceLeaf(leaf) => leaf.fields.iter().copied().min().unwrap_or(FieldId(0)),
            PathNode::Node(sub) => sub.fields().into_iter().min().unwrap_or(FieldId(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldDescriptor, SequenceElementSpec};
    use keyplan_value::{FieldType, ValueKind};

    fn string_at(name: &str, path: &[&str]) -> FieldDescriptor {
        FieldDescriptor::new(name, ValueKind::String).coded_at(path.iter().copied())
    }

    fn build(fields: Vec<FieldDescriptor>) -> Result<PathTree, SchemaError> {
        let schema = fields
            .into_iter()
            .fold(StructSchema::new("T"), StructSchema::field);
        PathTree::build(&schema, |f| !f.ignored)
    }

    #[test]
    fn nests_shared_prefixes() {
        let tree = build(vec![
            string_at("name", &["user", "name"]),
            string_at("email", &["user", "contact", "email"]),
            string_at("id", &["id"]),
        ])
        .unwrap();

        assert_eq!(tree.children.keys().collect::<Vec<_>>(), ["user", "id"]);
        let Some(PathNode::Node(user)) = tree.get(&["user".into()]) else {
            panic!("user should be a container");
        };
        assert_eq!(user.children.keys().collect::<Vec<_>>(), ["name", "contact"]);
        assert_eq!(tree.fields(), [FieldId(0), FieldId(1), FieldId(2)]);
    }

    #[test]
    fn prefix_collision_cites_both_fields_in_either_order() {
        let forward = build(vec![
            string_at("a", &["user"]),
            string_at("b", &["user", "name"]),
        ]);
        let backward = build(vec![
            string_at("b", &["user", "name"]),
            string_at("a", &["user"]),
        ]);

        assert_eq!(
            forward,
            Err(SchemaError::PathCollision {
                type_name: "T".into(),
                first: "a".into(),
                second: "b".into(),
                path: "user".into(),
            })
        );
        assert_eq!(
            backward,
            Err(SchemaError::PathCollision {
                type_name: "T".into(),
                first: "b".into(),
                second: "a".into(),
                path: "user".into(),
            })
        );
    }

    #[test]
    fn equal_paths_collide() {
        let err = build(vec![string_at("a", &["x", "y"]), string_at("b", &["x", "y"])]);
        assert!(matches!(
            err,
            Err(SchemaError::PathCollision { first, second, path, .. })
                if first == "a" && second == "b" && path == "x.y"
        ));
    }

    #[test]
    fn requirements_merge_up_the_tree() {
        let tree = build(vec![
            string_at("a", &["opt", "a"]).default_if_missing(""),
            string_at("b", &["opt", "b"]).default_for_errors(""),
            string_at("c", &["strict", "c"]),
            FieldDescriptor::new("d", FieldType::optional(ValueKind::Int)).coded_at(["nil", "d"]),
        ])
        .unwrap();

        let requirement = |key: &str| match tree.get(&[key.to_string()]) {
            Some(PathNode::Node(sub)) => sub.requirement,
            other => panic!("expected a container, got {other:?}"),
        };
        assert_eq!(requirement("opt"), Requirement::AllowAll);
        assert_eq!(requirement("strict"), Requirement::Always);
        assert_eq!(requirement("nil"), Requirement::AllowMissing);
        assert_eq!(tree.requirement, Requirement::Always);
    }

    #[test]
    fn sequence_fields_share_one_leaf() {
        let tree = build(vec![
            FieldDescriptor::new("xs", ValueKind::array_of(ValueKind::Int))
                .coded_at(["points"])
                .sequence(SequenceElementSpec::new(["x"], ValueKind::Int)),
            FieldDescriptor::new("ys", ValueKind::array_of(ValueKind::Int))
                .coded_at(["points"])
                .sequence(SequenceElementSpec::new(["y"], ValueKind::Int).default_value(0)),
        ])
        .unwrap();

        let Some(PathNode::SequenceLeaf(leaf)) = tree.get(&["points".into()]) else {
            panic!("points should be a sequence");
        };
        assert_eq!(leaf.fields, [FieldId(0), FieldId(1)]);
        assert_eq!(leaf.requirement, Requirement::Always);
        assert_eq!(leaf.element.requirement, Requirement::Always);
        assert_eq!(leaf.element.children.keys().collect::<Vec<_>>(), ["x", "y"]);
    }

    #[test]
    fn sequence_element_paths_must_not_collide() {
        let err = build(vec![
            FieldDescriptor::new("xs", ValueKind::array_of(ValueKind::Int))
                .coded_at(["points"])
                .sequence(SequenceElementSpec::new(["p"], ValueKind::Int)),
            FieldDescriptor::new("ys", ValueKind::array_of(ValueKind::Int))
                .coded_at(["points"])
                .sequence(SequenceElementSpec::new(["p", "y"], ValueKind::Int)),
        ]);
        assert_eq!(
            err,
            Err(SchemaError::SequencePathConflict {
                type_name: "T".into(),
                first: "xs".into(),
                second: "ys".into(),
                path: "p".into(),
            })
        );
    }

    #[test]
    fn plain_and_sequence_fields_collide() {
        let err = build(vec![
            string_at("label", &["points"]),
            FieldDescriptor::new("xs", ValueKind::array_of(ValueKind::Int))
                .coded_at(["points"])
                .sequence(SequenceElementSpec::new(["x"], ValueKind::Int)),
        ]);
        assert!(matches!(err, Err(SchemaError::PathCollision { .. })));
    }

    #[test]
    fn ignored_fields_are_left_out() {
        let tree = build(vec![
            string_at("a", &["x"]),
            string_at("b", &["x"]).ignore(Some("".into())),
        ])
        .unwrap();
        assert_eq!(tree.fields(), [FieldId(0)]);
    }
}
