use std::collections::HashSet;

use crate::{FieldDescriptor, FieldId, KeyCase, SchemaError, StructPlan};

/// A record type described as a flat list of coded fields.
#[derive(Debug, Clone)]
pub struct StructSchema {
    /// Name used in errors.
    pub type_name: String,
    /// How default paths are derived from field names.
    pub key_case: KeyCase,
    /// Fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
}

impl StructSchema {
    /// An empty schema for `type_name`.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            key_case: KeyCase::AsIs,
            fields: Vec::new(),
        }
    }

    /// Sets the key case applied to default paths.
    pub fn key_case(mut self, case: KeyCase) -> Self {
        self.key_case = case;
        self
    }

    /// Appends a field.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Compiles the schema into an executable plan.
    pub fn compile(self) -> Result<StructPlan, SchemaError> {
        StructPlan::compile(self)
    }

    /// Looks up a field by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not come from this schema.
    pub fn get(&self, id: FieldId) -> &FieldDescriptor {
        &self.fields[id.index()]
    }

    /// Fields with their ids, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &FieldDescriptor)> {
        self.fields
            .iter()
            .enumerate()
            .map(|(i, field)| (FieldId(i), field))
    }

    /// Checks every per-field rule. Path collisions are detected by the
    /// tree builder.
    pub fn validate_fields(&self) -> Result<(), SchemaError> {
        let mut names = HashSet::new();
        for field in &self.fields {
            if !names.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    type_name: self.type_name.clone(),
                    field: field.name.clone(),
                });
            }
            self.validate_field(field)?;
        }
        Ok(())
    }

    fn validate_field(&self, field: &FieldDescriptor) -> Result<(), SchemaError> {
        let type_name = || self.type_name.clone();
        let name = || field.name.clone();

        if let Some(constant) = &field.constant {
            let conflicting = [
                &field.initializer,
                &field.fallback_on_missing,
                &field.fallback_on_mismatch,
            ]
            .into_iter()
            .flatten()
            .any(|v| v != constant);
            if conflicting {
                return Err(SchemaError::ConflictingConstantDefault {
                    type_name: type_name(),
                    field: name(),
                });
            }
        }

        let excluded_from_decoding = field.ignored || field.ignore_decoding;
        if excluded_from_decoding && field.constant.is_none() && field.undecoded_value().is_none()
        {
            return Err(SchemaError::NotIgnorable {
                type_name: type_name(),
                field: name(),
            });
        }
        if field.ignored {
            return Ok(());
        }

        let path = field.resolved_path(self.key_case);
        if path.is_empty() || path.iter().any(String::is_empty) {
            return Err(SchemaError::EmptyPath {
                type_name: type_name(),
                field: name(),
            });
        }

        if field.is_decoded() {
            if let Some(class) = field.policy().uncovered_class() {
                return Err(SchemaError::MissingFallback {
                    type_name: type_name(),
                    field: name(),
                    class,
                    element: false,
                });
            }
            if let Some(spec) = &field.sequence {
                if let Some(class) = spec.policy().uncovered_class() {
                    return Err(SchemaError::MissingFallback {
                        type_name: type_name(),
                        field: name(),
                        class,
                        element: true,
                    });
                }
            }
        }

        if let Some(spec) = &field.sequence {
            if spec.path.is_empty() || spec.path.iter().any(String::is_empty) {
                return Err(SchemaError::EmptyPath {
                    type_name: type_name(),
                    field: name(),
                });
            }
        }

        Ok(())
    }
}
