//! Linear step plans compiled from path trees.

use core::fmt;
use std::collections::HashMap;

use crate::tree::{PathNode, PathTree, SequenceLeaf};
use crate::{FieldDescriptor, FieldId, Requirement, SchemaError, StructSchema, debug};

/// Identifier of a keyed container, derived from its position in a
/// depth-first walk of the schema's path tree. Ids are unique within one
/// plan; each sequence element plan has its own id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(pub u32);

impl ContainerId {
    /// The root container.
    pub const ROOT: ContainerId = ContainerId(0);

    /// Position in [`StructPlan::containers`] or [`ElementPlan::containers`].
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The keys a container may hold, in first-declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: Vec<String>,
}

impl KeySet {
    /// Whether `key` belongs to the set.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// The keys in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for KeySet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut keys: Vec<String> = Vec::new();
        for key in iter {
            let key = key.into();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        Self { keys }
    }
}

/// The key set of one container, with where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerKeys {
    /// The container.
    pub id: ContainerId,
    /// Path from the root; empty for the root.
    pub path: Vec<String>,
    /// Every key coded inside the container, in either direction.
    pub keys: KeySet,
}

/// Which way a plan runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Reading a record from a decoder.
    Decode,
    /// Writing a record to an encoder.
    Encode,
}

/// One entry of a linear plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Opens a keyed container. The root has no parent.
    EnterContainer {
        /// The container opened.
        id: ContainerId,
        /// Whether failing to open it is fatal.
        required: bool,
        /// The failures tolerated when `required` is false.
        requirement: Requirement,
        /// Enclosing container and the key this one lives under.
        parent: Option<(ContainerId, String)>,
    },
    /// Ends a decode region that is skipped when its container cannot be
    /// entered.
    ExitOptionalContainer {
        /// The container whose region ends.
        id: ContainerId,
    },
    /// Closes a container opened while encoding.
    ExitContainer {
        /// The container closed.
        id: ContainerId,
    },
    /// Reads one field.
    DecodeValue {
        /// The field assigned.
        field: FieldId,
        /// Innermost enclosing container.
        container: ContainerId,
        /// Key inside `container`.
        key: String,
    },
    /// Writes one field.
    EncodeValue {
        /// The field written.
        field: FieldId,
        /// Innermost enclosing container.
        container: ContainerId,
        /// Key inside `container`.
        key: String,
    },
    /// Reads every field sharing a sequence.
    DecodeSequence(SequenceStep),
    /// Writes every field sharing a sequence.
    EncodeSequence(SequenceStep),
}

/// A sequence of element containers, read or written as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceStep {
    /// Innermost enclosing container.
    pub container: ContainerId,
    /// Key of the sequence inside `container`.
    pub key: String,
    /// Fields sharing the sequence, in declaration order.
    pub fields: Vec<FieldId>,
    /// Failures tolerated when the sequence itself cannot be opened.
    pub requirement: Requirement,
    /// Plan run once per element.
    pub element: ElementPlan,
}

/// The plan of one element container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementPlan {
    /// Key sets, indexed by element container id.
    pub containers: Vec<ContainerKeys>,
    /// Steps rooted at the element container.
    pub steps: Vec<Step>,
}

impl ElementPlan {
    /// Failures tolerated when an element container cannot be entered.
    pub fn requirement(&self) -> Requirement {
        match self.steps.first() {
            Some(Step::EnterContainer { requirement, .. }) => *requirement,
            _ => Requirement::AllowAll,
        }
    }

    /// The root key set of an element.
    pub fn root_keys(&self) -> &KeySet {
        &self.containers[0].keys
    }
}

/// Container ids assigned over a full tree, looked up by path.
struct ContainerIndex {
    containers: Vec<ContainerKeys>,
    by_path: HashMap<Vec<String>, ContainerId>,
    trees: HashMap<Vec<String>, PathTree>,
}

impl ContainerIndex {
    fn new(full: &PathTree) -> Self {
        let mut index = ContainerIndex {
            containers: Vec::new(),
            by_path: HashMap::new(),
            trees: HashMap::new(),
        };
        let mut stack: Vec<(Vec<String>, &PathTree)> = vec![(Vec::new(), full)];
        while let Some((path, tree)) = stack.pop() {
            let id = ContainerId(index.containers.len() as u32);
            index.by_path.insert(path.clone(), id);
            index.containers.push(ContainerKeys {
                id,
                path: path.clone(),
                keys: tree.children.keys().cloned().collect(),
            });
            for (key, child) in tree.children.iter().rev() {
                let mut child_path = path.clone();
                child_path.push(key.clone());
                match child {
                    PathNode::Node(sub) => stack.push((child_path, sub)),
                    PathNode::SequenceLeaf(leaf) => {
                        index.trees.insert(child_path, leaf.element.clone());
                    }
                    PathNode::Leaf(_) => {}
                }
            }
        }
        index
    }

    fn id(&self, path: &[String]) -> ContainerId {
        self.by_path.get(path).copied().unwrap_or(ContainerId::ROOT)
    }

    /// The full element tree of the sequence at `path`.
    fn element(&self, path: &[String]) -> Option<&PathTree> {
        self.trees.get(path)
    }
}

enum Frame<'a> {
    Enter {
        tree: &'a PathTree,
        path: Vec<String>,
        parent: Option<(ContainerId, String)>,
    },
    Child {
        node: &'a PathNode,
        path: Vec<String>,
        container: ContainerId,
        key: String,
    },
    Exit {
        id: ContainerId,
        required: bool,
    },
}

/// Walks `tree` depth first and emits its steps for `direction`.
///
/// `full` is the tree of every coded field, which fixes container ids and
/// key sets so that both directions agree on them.
pub fn linearize(
    tree: &PathTree,
    full: &PathTree,
    direction: Direction,
) -> (Vec<Step>, Vec<ContainerKeys>) {
    let index = ContainerIndex::new(full);
    let steps = linearize_with(tree, &index, direction);
    (steps, index.containers)
}

fn linearize_with(tree: &PathTree, index: &ContainerIndex, direction: Direction) -> Vec<Step> {
    let mut steps = Vec::new();
    let mut stack = vec![Frame::Enter {
        tree,
        path: Vec::new(),
        parent: None,
    }];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter { tree, path, parent } => {
                let id = index.id(&path);
                let required = tree.is_required();
                steps.push(Step::EnterContainer {
                    id,
                    required,
                    requirement: tree.requirement,
                    parent,
                });
                stack.push(Frame::Exit { id, required });
                for (key, node) in tree.children.iter().rev() {
                    let mut child_path = path.clone();
                    child_path.push(key.clone());
                    stack.push(Frame::Child {
                        node,
                        path: child_path,
                        container: id,
                        key: key.clone(),
                    });
                }
            }
            Frame::Child {
                node,
                path,
                container,
                key,
            } => match node {
                PathNode::Node(sub) => stack.push(Frame::Enter {
                    tree: sub,
                    path,
                    parent: Some((container, key)),
                }),
                PathNode::Leaf(field) => steps.push(match direction {
                    Direction::Decode => Step::DecodeValue {
                        field: *field,
                        container,
                        key,
                    },
                    Direction::Encode => Step::EncodeValue {
                        field: *field,
                        container,
                        key,
                    },
                }),
                PathNode::SequenceLeaf(leaf) => {
                    let step = sequence_step(leaf, index.element(&path), container, key, direction);
                    steps.push(match direction {
                        Direction::Decode => Step::DecodeSequence(step),
                        Direction::Encode => Step::EncodeSequence(step),
                    });
                }
            },
            Frame::Exit { id, required } => match direction {
                Direction::Decode if !required => steps.push(Step::ExitOptionalContainer { id }),
                Direction::Decode => {}
                Direction::Encode => steps.push(Step::ExitContainer { id }),
            },
        }
    }
    steps
}

fn sequence_step(
    leaf: &SequenceLeaf,
    full_element: Option<&PathTree>,
    container: ContainerId,
    key: String,
    direction: Direction,
) -> SequenceStep {
    let full_element = full_element.unwrap_or(&leaf.element);
    let index = ContainerIndex::new(full_element);
    let steps = linearize_with(&leaf.element, &index, direction);
    SequenceStep {
        container,
        key,
        fields: leaf.fields.clone(),
        requirement: leaf.requirement,
        element: ElementPlan {
            containers: index.containers,
            steps,
        },
    }
}

/// A compiled struct schema: container key sets plus one step list per
/// direction. Immutable once built and safe to share between threads.
#[derive(Debug, Clone)]
pub struct StructPlan {
    schema: StructSchema,
    paths: Vec<Vec<String>>,
    containers: Vec<ContainerKeys>,
    decode_steps: Vec<Step>,
    encode_steps: Vec<Step>,
}

impl StructPlan {
    /// Validates `schema` and compiles it.
    pub fn compile(schema: StructSchema) -> Result<Self, SchemaError> {
        schema.validate_fields()?;

        let full = PathTree::build(&schema, |f| !f.ignored)?;
        let decode = PathTree::build(&schema, FieldDescriptor::is_decoded)?;
        let encode = PathTree::build(&schema, FieldDescriptor::is_encoded)?;

        let index = ContainerIndex::new(&full);
        let decode_steps = linearize_with(&decode, &index, Direction::Decode);
        let encode_steps = linearize_with(&encode, &index, Direction::Encode);
        let paths = schema
            .fields
            .iter()
            .map(|f| f.resolved_path(schema.key_case))
            .collect();

        debug!(
            "compiled {}: {} containers, {} decode steps, {} encode steps",
            schema.type_name,
            index.containers.len(),
            decode_steps.len(),
            encode_steps.len()
        );

        Ok(Self {
            schema,
            paths,
            containers: index.containers,
            decode_steps,
            encode_steps,
        })
    }

    /// The schema the plan was compiled from.
    pub fn schema(&self) -> &StructSchema {
        &self.schema
    }

    /// Name of the record type.
    pub fn type_name(&self) -> &str {
        &self.schema.type_name
    }

    /// A field's descriptor.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not come from the compiled schema.
    pub fn field(&self, id: FieldId) -> &FieldDescriptor {
        self.schema.get(id)
    }

    /// A field's resolved coding path.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not come from the compiled schema.
    pub fn path(&self, id: FieldId) -> &[String] {
        &self.paths[id.index()]
    }

    /// Key sets, indexed by container id.
    pub fn containers(&self) -> &[ContainerKeys] {
        &self.containers
    }

    /// The key set of one container.
    pub fn container(&self, id: ContainerId) -> &ContainerKeys {
        &self.containers[id.index()]
    }

    /// The steps of one direction.
    pub fn steps(&self, direction: Direction) -> &[Step] {
        match direction {
            Direction::Decode => &self.decode_steps,
            Direction::Encode => &self.encode_steps,
        }
    }

    /// Steps that read a record.
    pub fn decode_steps(&self) -> &[Step] {
        &self.decode_steps
    }

    /// Steps that write a record.
    pub fn encode_steps(&self) -> &[Step] {
        &self.encode_steps
    }
}

fn display_path(path: &[String]) -> String {
    if path.is_empty() {
        "$".to_string()
    } else {
        path.join(".")
    }
}

fn write_containers(
    f: &mut fmt::Formatter<'_>,
    containers: &[ContainerKeys],
    indent: usize,
) -> fmt::Result {
    for container in containers {
        let keys = container.keys.iter().collect::<Vec<_>>().join(", ");
        writeln!(
            f,
            "{:indent$}{} {} {{{keys}}}",
            "",
            container.id,
            display_path(&container.path)
        )?;
    }
    Ok(())
}

fn write_steps(
    f: &mut fmt::Formatter<'_>,
    schema: &StructSchema,
    steps: &[Step],
    indent: usize,
) -> fmt::Result {
    let name = |id: &FieldId| schema.get(*id).name.as_str();
    for step in steps {
        write!(f, "{:indent$}", "")?;
        match step {
            Step::EnterContainer {
                id,
                requirement,
                parent,
                ..
            } => {
                write!(f, "enter {id}")?;
                if let Some((parent, key)) = parent {
                    write!(f, " at {parent}.{key}")?;
                }
                writeln!(f, " ({requirement})")?;
            }
            Step::ExitOptionalContainer { id } => writeln!(f, "exit optional {id}")?,
            Step::ExitContainer { id } => writeln!(f, "exit {id}")?,
            Step::DecodeValue {
                field,
                container,
                key,
            } => writeln!(f, "read {} <- {container}.{key}", name(field))?,
            Step::EncodeValue {
                field,
                container,
                key,
            } => writeln!(f, "write {} -> {container}.{key}", name(field))?,
            Step::DecodeSequence(seq) | Step::EncodeSequence(seq) => {
                let fields = seq.fields.iter().map(name).collect::<Vec<_>>().join(", ");
                writeln!(
                    f,
                    "sequence [{fields}] at {}.{} ({})",
                    seq.container, seq.key, seq.requirement
                )?;
                write_containers(f, &seq.element.containers, indent + 2)?;
                write_steps(f, schema, &seq.element.steps, indent + 2)?;
            }
        }
    }
    Ok(())
}

impl fmt::Display for StructPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "plan {}", self.schema.type_name)?;
        writeln!(f, "containers:")?;
        write_containers(f, &self.containers, 2)?;
        writeln!(f, "decode:")?;
        write_steps(f, &self.schema, &self.decode_steps, 2)?;
        writeln!(f, "encode:")?;
        write_steps(f, &self.schema, &self.encode_steps, 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SequenceElementSpec;
    use keyplan_value::{FieldType, ValueKind};

    fn user_plan() -> StructPlan {
        StructSchema::new("User")
            .field(FieldDescriptor::new("name", ValueKind::String).coded_at(["user", "name"]))
            .field(
                FieldDescriptor::new("nickname", FieldType::optional(ValueKind::String))
                    .coded_at(["user", "profile", "nick"]),
            )
            .field(FieldDescriptor::new("id", ValueKind::Int))
            .compile()
            .unwrap()
    }

    #[test]
    fn container_ids_follow_depth_first_order() {
        let plan = user_plan();
        let paths: Vec<_> = plan
            .containers()
            .iter()
            .map(|c| (c.id.0, display_path(&c.path)))
            .collect();
        assert_eq!(
            paths,
            [
                (0, "$".to_string()),
                (1, "user".to_string()),
                (2, "user.profile".to_string())
            ]
        );
        assert!(plan.container(ContainerId(1)).keys.contains("profile"));
    }

    #[test]
    fn optional_regions_close_on_decode_only() {
        let plan = user_plan();
        let exits = |steps: &[Step]| {
            steps
                .iter()
                .filter(|s| matches!(s, Step::ExitOptionalContainer { .. }))
                .count()
        };
        assert_eq!(exits(plan.decode_steps()), 1);
        assert_eq!(exits(plan.encode_steps()), 0);
        assert!(matches!(
            plan.decode_steps()[3],
            Step::EnterContainer {
                id: ContainerId(2),
                required: false,
                requirement: Requirement::AllowMissing,
                ..
            }
        ));
    }

    #[test]
    fn dumps_both_directions() {
        insta::assert_snapshot!(user_plan().to_string(), @r"
        plan User
        containers:
          #0 $ {user, id}
          #1 user {name, profile}
          #2 user.profile {nick}
        decode:
          enter #0 (required)
          enter #1 at #0.user (required)
          read name <- #1.name
          enter #2 at #1.profile (allow-missing)
          read nickname <- #2.nick
          exit optional #2
          read id <- #0.id
        encode:
          enter #0 (required)
          enter #1 at #0.user (required)
          write name -> #1.name
          enter #2 at #1.profile (allow-missing)
          write nickname -> #2.nick
          exit #2
          exit #1
          write id -> #0.id
          exit #0
        ");
    }

    #[test]
    fn sequences_carry_their_element_plan() {
        let plan = StructSchema::new("Scores")
            .field(
                FieldDescriptor::new("scores", ValueKind::array_of(ValueKind::Int))
                    .coded_at(["items"])
                    .sequence(SequenceElementSpec::new(["v"], ValueKind::Int).default_for_errors(0)),
            )
            .compile()
            .unwrap();

        let Step::DecodeSequence(seq) = &plan.decode_steps()[1] else {
            panic!("expected a sequence step");
        };
        assert_eq!(seq.key, "items");
        assert_eq!(seq.fields, [FieldId(0)]);
        assert_eq!(seq.element.requirement(), Requirement::AllowMismatch);
        assert_eq!(seq.element.root_keys().iter().collect::<Vec<_>>(), ["v"]);
        assert!(matches!(
            &seq.element.steps[1],
            Step::DecodeValue { key, .. } if key == "v"
        ));
    }

    #[test]
    fn constants_are_encoded_but_not_decoded() {
        let plan = StructSchema::new("Header")
            .field(FieldDescriptor::new("version", ValueKind::Int).constant(2))
            .field(FieldDescriptor::new("body", ValueKind::String))
            .compile()
            .unwrap();
        let decoded: Vec<_> = plan
            .decode_steps()
            .iter()
            .filter_map(|s| match s {
                Step::DecodeValue { key, .. } => Some(key.as_str()),
                _ => None,
            })
            .collect();
        let encoded: Vec<_> = plan
            .encode_steps()
            .iter()
            .filter_map(|s| match s {
                Step::EncodeValue { key, .. } => Some(key.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(decoded, ["body"]);
        assert_eq!(encoded, ["version", "body"]);
    }

    #[test]
    #[should_panic]
    fn path_of_a_foreign_id_panics() {
        let plan = user_plan();
        let _ = plan.path(FieldId(plan.schema().iter().count()));
    }

    #[test]
    fn compile_reports_collisions() {
        let err = StructSchema::new("T")
            .field(FieldDescriptor::new("a", ValueKind::Int).coded_at(["x", "y"]))
            .field(FieldDescriptor::new("b", ValueKind::Int).coded_at(["x"]))
            .compile()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "T: fields `a` and `b` collide at path `x`; a value cannot also be a container"
        );
    }
}
