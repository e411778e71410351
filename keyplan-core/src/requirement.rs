use core::fmt;
use core::ops::BitOr;

use keyplan_value::{FieldType, Value};

/// The two recoverable classes of decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// The key or container is absent.
    Missing,
    /// The value is present but has the wrong type or shape.
    Mismatch,
}

impl FailureClass {
    /// The other class.
    pub const fn other(self) -> Self {
        match self {
            FailureClass::Missing => FailureClass::Mismatch,
            FailureClass::Mismatch => FailureClass::Missing,
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureClass::Missing => f.write_str("missing"),
            FailureClass::Mismatch => f.write_str("mismatch"),
        }
    }
}

/// Which decode failures a field or container tolerates by falling back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Requirement {
    /// Every failure propagates.
    #[default]
    Always,
    /// An absent key falls back.
    AllowMissing,
    /// A wrong-typed value falls back.
    AllowMismatch,
    /// Either failure falls back.
    AllowAll,
}

impl Requirement {
    /// Builds the requirement that tolerates exactly the given classes.
    pub const fn from_classes(missing: bool, mismatch: bool) -> Self {
        match (missing, mismatch) {
            (false, false) => Requirement::Always,
            (true, false) => Requirement::AllowMissing,
            (false, true) => Requirement::AllowMismatch,
            (true, true) => Requirement::AllowAll,
        }
    }

    /// Whether a failure of `class` may fall back.
    pub const fn allows(self, class: FailureClass) -> bool {
        matches!(
            (self, class),
            (Requirement::AllowAll, _)
                | (Requirement::AllowMissing, FailureClass::Missing)
                | (Requirement::AllowMismatch, FailureClass::Mismatch)
        )
    }

    /// Whether no failure is tolerated.
    pub const fn is_required(self) -> bool {
        matches!(self, Requirement::Always)
    }

    /// Container combination of two requirements.
    ///
    /// `Always` absorbs everything, `AllowAll` is the identity, and the two
    /// single-class requirements combine to `AllowAll`. A container is only
    /// optional when nothing below it is strictly required.
    pub const fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Requirement::Always, _) | (_, Requirement::Always) => Requirement::Always,
            (Requirement::AllowAll, x) | (x, Requirement::AllowAll) => x,
            (Requirement::AllowMissing, Requirement::AllowMissing) => Requirement::AllowMissing,
            (Requirement::AllowMismatch, Requirement::AllowMismatch) => {
                Requirement::AllowMismatch
            }
            _ => Requirement::AllowAll,
        }
    }

    /// Union of the tolerated classes of both requirements.
    pub const fn widen(self, other: Self) -> Self {
        Requirement::from_classes(
            self.allows(FailureClass::Missing) || other.allows(FailureClass::Missing),
            self.allows(FailureClass::Mismatch) || other.allows(FailureClass::Mismatch),
        )
    }
}

impl BitOr for Requirement {
    type Output = Requirement;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.merge(rhs)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Always => f.write_str("required"),
            Requirement::AllowMissing => f.write_str("allow-missing"),
            Requirement::AllowMismatch => f.write_str("allow-mismatch"),
            Requirement::AllowAll => f.write_str("allow-all"),
        }
    }
}

/// The fallback rules of one coded value: a field, or one element position
/// of a sequence-coded field.
#[derive(Debug, Clone, Copy)]
pub struct ValuePolicy<'a> {
    /// Declared type of the value.
    pub ty: &'a FieldType,
    /// Declared requirement.
    pub requirement: Requirement,
    /// Fallback used when the value is absent.
    pub on_missing: Option<&'a Value>,
    /// Fallback used when the value has the wrong type.
    pub on_mismatch: Option<&'a Value>,
}

impl ValuePolicy<'_> {
    /// The requirement after nullability: a nullable value always tolerates
    /// being absent.
    pub const fn effective_requirement(&self) -> Requirement {
        if self.ty.nullable {
            self.requirement.widen(Requirement::AllowMissing)
        } else {
            self.requirement
        }
    }

    fn explicit(&self, class: FailureClass) -> Option<&Value> {
        match class {
            FailureClass::Missing => self.on_missing,
            FailureClass::Mismatch => self.on_mismatch,
        }
    }

    /// The value to use when decoding failed with `class`, or `None` if the
    /// failure must propagate.
    pub fn fallback_for(&self, class: FailureClass) -> Option<Value> {
        if !self.effective_requirement().allows(class) {
            return None;
        }
        self.explicit(class)
            .cloned()
            .or_else(|| self.ty.nullable.then_some(Value::Null))
    }

    /// The value to use when an enclosing optional container failed with
    /// `class`: the matching fallback, else any static fallback, else null.
    pub fn static_fallback(&self, class: FailureClass) -> Option<Value> {
        self.explicit(class)
            .or_else(|| self.explicit(class.other()))
            .cloned()
            .or_else(|| self.ty.nullable.then_some(Value::Null))
    }

    /// The first failure class the policy tolerates without having a value
    /// to fall back to.
    pub fn uncovered_class(&self) -> Option<FailureClass> {
        [FailureClass::Missing, FailureClass::Mismatch]
            .into_iter()
            .find(|&class| {
                self.requirement.allows(class)
                    && self.explicit(class).is_none()
                    && !self.ty.nullable
            })
    }
}

#[cfg(test)]
mod tests {
    use super::Requirement::*;
    use super::*;
    use keyplan_value::ValueKind;

    #[test]
    fn merge_follows_the_container_table() {
        assert_eq!(Always | AllowAll, Always);
        assert_eq!(AllowMissing | Always, Always);
        assert_eq!(AllowAll | AllowMissing, AllowMissing);
        assert_eq!(AllowMismatch | AllowAll, AllowMismatch);
        assert_eq!(AllowMissing | AllowMismatch, AllowAll);
        assert_eq!(AllowMissing | AllowMissing, AllowMissing);
        assert_eq!(AllowAll | AllowAll, AllowAll);
    }

    #[test]
    fn widen_unions_classes() {
        assert_eq!(Always.widen(AllowMissing), AllowMissing);
        assert_eq!(AllowMismatch.widen(AllowMissing), AllowAll);
        assert_eq!(Always.widen(Always), Always);
    }

    #[test]
    fn nullable_values_tolerate_absence() {
        let ty = FieldType::optional(ValueKind::Int);
        let policy = ValuePolicy {
            ty: &ty,
            requirement: Always,
            on_missing: None,
            on_mismatch: None,
        };
        assert_eq!(policy.effective_requirement(), AllowMissing);
        assert_eq!(policy.fallback_for(FailureClass::Missing), Some(Value::Null));
        assert_eq!(policy.fallback_for(FailureClass::Mismatch), None);
    }

    #[test]
    fn static_fallback_uses_any_declared_default() {
        let ty = FieldType::required(ValueKind::Int);
        let zero = Value::from(0);
        let policy = ValuePolicy {
            ty: &ty,
            requirement: AllowMismatch,
            on_missing: None,
            on_mismatch: Some(&zero),
        };
        assert_eq!(policy.fallback_for(FailureClass::Missing), None);
        assert_eq!(policy.static_fallback(FailureClass::Missing), Some(zero.clone()));
        assert_eq!(policy.uncovered_class(), None);
    }
}
